use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::{
    configuration::ApplicationSettings,
    database::CustomerRepository,
    models::{CustomerId, CustomerPayload, NewCustomer, Page},
    ClienteleError, Result,
};

/// Query string accepted by `GET /customer`
#[derive(Debug, Default, Deserialize)]
pub struct CustomerQueryParams {
    pub id: Option<String>,
    pub s: Option<String>,
    pub pno: Option<String>,
}

/// The single lookup a list request resolves to
#[derive(Debug, PartialEq)]
pub enum CustomerQuery<'a> {
    ById(&'a str),
    Search(&'a str),
    Page(&'a str),
    All,
}

type Matcher = for<'a> fn(&'a CustomerQueryParams) -> Option<CustomerQuery<'a>>;

/// Evaluated in order, the first match wins
const MATCHERS: [Matcher; 3] = [by_id, by_search_term, by_page_number];

fn by_id(params: &CustomerQueryParams) -> Option<CustomerQuery<'_>> {
    // Present but empty still selects the lookup so it can fail as a missing id
    params.id.as_deref().map(CustomerQuery::ById)
}

fn by_search_term(params: &CustomerQueryParams) -> Option<CustomerQuery<'_>> {
    params
        .s
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(CustomerQuery::Search)
}

fn by_page_number(params: &CustomerQueryParams) -> Option<CustomerQuery<'_>> {
    params
        .pno
        .as_deref()
        .filter(|pno| !pno.is_empty())
        .map(CustomerQuery::Page)
}

impl CustomerQueryParams {
    pub fn resolve(&self) -> CustomerQuery<'_> {
        MATCHERS
            .iter()
            .find_map(|matcher| matcher(self))
            .unwrap_or(CustomerQuery::All)
    }
}

#[derive(Debug, Deserialize)]
pub struct IdParams {
    pub id: Option<String>,
}

fn required_id(raw: Option<&str>) -> Result<CustomerId> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => CustomerId::parse(raw),
        _ => Err(ClienteleError::missing_id()),
    }
}

#[tracing::instrument(name = "get_customers", skip(repository, settings))]
pub async fn get_customers(
    params: web::Query<CustomerQueryParams>,
    repository: web::Data<dyn CustomerRepository>,
    settings: web::Data<ApplicationSettings>,
) -> Result<HttpResponse> {
    match params.resolve() {
        CustomerQuery::ById(raw) => {
            let id = required_id(Some(raw))?;
            let customer = repository.find_by_id(&id).await?;
            Ok(HttpResponse::Ok().json(customer))
        }
        CustomerQuery::Search(term) => {
            let customers = repository.search(term).await?;
            Ok(HttpResponse::Ok().json(customers))
        }
        CustomerQuery::Page(raw) => {
            let page = Page::parse(raw, settings.page_size)?;
            let customers = repository.paginate(page).await?;
            Ok(HttpResponse::Ok().json(customers))
        }
        CustomerQuery::All => {
            let customers = repository.find_all().await?;
            Ok(HttpResponse::Ok().json(customers))
        }
    }
}

#[tracing::instrument(name = "get_customer", skip(repository))]
pub async fn get_customer(
    path: web::Path<String>,
    repository: web::Data<dyn CustomerRepository>,
) -> Result<HttpResponse> {
    let id = CustomerId::parse(&path.into_inner())?;
    let customer = repository.find_by_id(&id).await?;
    Ok(HttpResponse::Ok().json(customer))
}

#[tracing::instrument(name = "create_customer", skip(body, repository))]
pub async fn create_customer(
    body: web::Json<CustomerPayload>,
    repository: web::Data<dyn CustomerRepository>,
) -> Result<HttpResponse> {
    let new_customer = NewCustomer::try_from(body.into_inner())?;
    let customer = repository.create(new_customer).await?;
    Ok(HttpResponse::Created().json(customer))
}

/// Handles both `PUT` and `PATCH`, only the fields present in the body change
#[tracing::instrument(name = "update_customer", skip(body, repository))]
pub async fn update_customer(
    body: web::Json<CustomerPayload>,
    repository: web::Data<dyn CustomerRepository>,
) -> Result<HttpResponse> {
    let (id, update) = body.into_inner().into_update()?;
    let customer = repository.update(&id, update).await?;
    Ok(HttpResponse::Ok().json(customer))
}

#[tracing::instrument(name = "delete_customer", skip(repository))]
pub async fn delete_customer(
    params: web::Query<IdParams>,
    repository: web::Data<dyn CustomerRepository>,
) -> Result<HttpResponse> {
    let id = required_id(params.id.as_deref())?;
    let customer = repository.delete_by_id(&id).await?;
    Ok(HttpResponse::Ok().json(customer))
}

#[tracing::instrument(name = "delete_customer_by_path", skip(repository))]
pub async fn delete_customer_by_path(
    path: web::Path<String>,
    repository: web::Data<dyn CustomerRepository>,
) -> Result<HttpResponse> {
    let id = CustomerId::parse(&path.into_inner())?;
    let customer = repository.delete_by_id(&id).await?;
    Ok(HttpResponse::Ok().json(customer))
}

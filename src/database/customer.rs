use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use futures::TryStreamExt;
use mongodb::{
    options::{
        ClientOptions, FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument,
    },
    Client, Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    database::{Connect, ConnectionManager},
    models::{Customer, CustomerId, CustomerUpdate, NewCustomer, Page},
    ClienteleError, Result,
};

pub const CUSTOMER_COLLECTION: &str = "customers";

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Customer>;
    /// Every customer, ascending by member number
    async fn find_all(&self) -> Result<Vec<Customer>>;
    /// Case-insensitive substring match on name or interests, ascending by member number
    async fn search(&self, term: &str) -> Result<Vec<Customer>>;
    async fn paginate(&self, page: Page) -> Result<Vec<Customer>>;
    async fn create(&self, customer: NewCustomer) -> Result<Customer>;
    /// Overwrites the provided fields and returns the stored result
    async fn update(&self, id: &CustomerId, update: CustomerUpdate) -> Result<Customer>;
    async fn delete_by_id(&self, id: &CustomerId) -> Result<Customer>;
}

/// Shape of a customer inside MongoDB
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    date_of_birth: bson::DateTime,
    member_number: i64,
    interests: String,
}

impl From<CustomerDocument> for Customer {
    fn from(document: CustomerDocument) -> Self {
        Customer {
            id: document.id.into(),
            name: document.name,
            date_of_birth: document.date_of_birth.to_chrono(),
            member_number: document.member_number,
            interests: document.interests,
        }
    }
}

impl From<&Customer> for CustomerDocument {
    fn from(customer: &Customer) -> Self {
        CustomerDocument {
            id: customer.id.as_object_id(),
            name: customer.name.clone(),
            date_of_birth: bson::DateTime::from_chrono(customer.date_of_birth),
            member_number: customer.member_number,
            interests: customer.interests.clone(),
        }
    }
}

/// Opens a MongoDB database and makes sure the member number index exists
pub struct MongoConnector {
    pub database_name: String,
    pub connect_timeout: Duration,
}

#[async_trait]
impl Connect for MongoConnector {
    type Connection = Database;

    async fn connect(&self, uri: &str) -> Result<Database> {
        let mut options = ClientOptions::parse(uri).await?;
        options.app_name = Some(env!("CARGO_PKG_NAME").to_owned());
        options.connect_timeout = Some(self.connect_timeout);
        options.server_selection_timeout = Some(self.connect_timeout);

        let client = Client::with_options(options)?;
        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(&self.database_name));

        // The driver connects lazily, so force a round trip here
        database.run_command(doc! { "ping": 1 }, None).await?;

        let unique_member_number = IndexModel::builder()
            .keys(doc! { "memberNumber": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        database
            .collection::<CustomerDocument>(CUSTOMER_COLLECTION)
            .create_index(unique_member_number, None)
            .await?;

        Ok(database)
    }
}

/// Literal, case-insensitive substring match on name or interests
fn search_filter(term: &str) -> Document {
    let pattern = regex::escape(term);
    doc! {
        "$or": [
            { "name": { "$regex": pattern.clone(), "$options": "i" } },
            { "interests": { "$regex": pattern, "$options": "i" } },
        ]
    }
}

/// `$set` of the provided fields, `None` when there is nothing to change
fn update_document(update: CustomerUpdate) -> Option<Document> {
    if update.is_empty() {
        return None;
    }

    let mut fields = Document::new();
    if let Some(name) = update.name {
        fields.insert("name", name);
    }
    if let Some(date_of_birth) = update.date_of_birth {
        fields.insert("dateOfBirth", bson::DateTime::from_chrono(date_of_birth));
    }
    if let Some(member_number) = update.member_number {
        fields.insert("memberNumber", member_number);
    }
    if let Some(interests) = update.interests {
        fields.insert("interests", interests);
    }
    Some(doc! { "$set": fields })
}

pub struct CustomerDatabase {
    connection: ConnectionManager<MongoConnector>,
}

impl CustomerDatabase {
    pub fn new(connection: ConnectionManager<MongoConnector>) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &ConnectionManager<MongoConnector> {
        &self.connection
    }

    async fn customers(&self) -> Result<Collection<CustomerDocument>> {
        let database = self.connection.acquire().await?;
        Ok(database.collection(CUSTOMER_COLLECTION))
    }

    async fn find_sorted(
        &self,
        filter: Option<Document>,
        skip: Option<u64>,
        limit: Option<i64>,
    ) -> Result<Vec<Customer>> {
        let options = FindOptions::builder()
            .sort(doc! { "memberNumber": 1 })
            .skip(skip)
            .limit(limit)
            .build();
        let customers: Vec<Customer> = self
            .customers()
            .await?
            .find(filter, options)
            .await?
            .map_ok(Customer::from)
            .try_collect()
            .await?;
        Ok(customers)
    }
}

#[async_trait]
impl CustomerRepository for CustomerDatabase {
    #[tracing::instrument(skip(self), fields(repository = "customer"))]
    async fn find_by_id(&self, id: &CustomerId) -> Result<Customer> {
        self.customers()
            .await?
            .find_one(doc! { "_id": id.as_object_id() }, None)
            .await?
            .map(Customer::from)
            .ok_or(ClienteleError::NotFound)
    }

    #[tracing::instrument(skip(self), fields(repository = "customer"))]
    async fn find_all(&self) -> Result<Vec<Customer>> {
        self.find_sorted(None, None, None).await
    }

    #[tracing::instrument(skip(self), fields(repository = "customer"))]
    async fn search(&self, term: &str) -> Result<Vec<Customer>> {
        self.find_sorted(Some(search_filter(term)), None, None).await
    }

    #[tracing::instrument(skip(self), fields(repository = "customer"))]
    async fn paginate(&self, page: Page) -> Result<Vec<Customer>> {
        self.find_sorted(None, Some(page.skip()), Some(page.size() as i64))
            .await
    }

    #[tracing::instrument(skip(self, customer), fields(repository = "customer"))]
    async fn create(&self, customer: NewCustomer) -> Result<Customer> {
        let customer = customer.into_customer(CustomerId::new());
        self.customers()
            .await?
            .insert_one(CustomerDocument::from(&customer), None)
            .await?;
        Ok(customer)
    }

    #[tracing::instrument(skip(self, update), fields(repository = "customer"))]
    async fn update(&self, id: &CustomerId, update: CustomerUpdate) -> Result<Customer> {
        let changes = match update_document(update) {
            Some(changes) => changes,
            None => return self.find_by_id(id).await,
        };

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.customers()
            .await?
            .find_one_and_update(
                doc! { "_id": id.as_object_id() },
                changes,
                options,
            )
            .await?
            .map(Customer::from)
            .ok_or(ClienteleError::NotFound)
    }

    #[tracing::instrument(skip(self), fields(repository = "customer"))]
    async fn delete_by_id(&self, id: &CustomerId) -> Result<Customer> {
        self.customers()
            .await?
            .find_one_and_delete(doc! { "_id": id.as_object_id() }, None)
            .await?
            .map(Customer::from)
            .ok_or(ClienteleError::NotFound)
    }
}

use actix_cors::Cors;
use actix_web::{
    dev::Server,
    error::{JsonPayloadError, QueryPayloadError},
    http::header::CONTENT_TYPE,
    web, App, HttpRequest, HttpServer,
};
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use crate::{
    configuration::ApplicationSettings, database::CustomerRepository, routes::*, ClienteleError,
};

const CORS_MAX_AGE_SECONDS: usize = 60 * 60;

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ClienteleError::BadRequest(err.to_string()).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ClienteleError::BadRequest(err.to_string()).into()
}

pub fn build_app(
    listener: TcpListener,
    repository: Arc<dyn CustomerRepository>,
    settings: ApplicationSettings,
) -> Result<Server, std::io::Error> {
    let repository = web::Data::from(repository);
    let settings = web::Data::new(settings);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(
                Cors::default()
                    .allowed_origin_fn(|origin, _req_head| {
                        origin.as_bytes().starts_with(b"http://localhost")
                            || origin.as_bytes().starts_with(b"http://127.0.0.1")
                    })
                    .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
                    .allowed_header(CONTENT_TYPE)
                    .max_age(CORS_MAX_AGE_SECONDS),
            )
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::QueryConfig::default().error_handler(query_error))
            .app_data(repository.clone())
            .app_data(settings.clone())
            .service(
                web::resource("/customer")
                    .route(web::get().to(get_customers))
                    .route(web::post().to(create_customer))
                    .route(web::put().to(update_customer))
                    .route(web::patch().to(update_customer))
                    .route(web::delete().to(delete_customer)),
            )
            .service(
                web::resource("/customer/{id}")
                    .route(web::get().to(get_customer))
                    .route(web::delete().to(delete_customer_by_path)),
            )
            .route("/health_check", web::get().to(health_check))
    })
    .listen(listener)?
    .run();

    Ok(server)
}

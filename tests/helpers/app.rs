use anyhow::Result;
use reqwest::{Client, Response};
use serde_json::Value;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use clientele::{
    configuration::{ApplicationSettings, Backend, DatabaseSettings},
    database::{
        build_repository, ConnectionManager, CustomerDatabase, CustomerRepository, MongoConnector,
    },
};
use mongodb::bson::oid::ObjectId;

use crate::helpers::{build_http_client, customer_body, TRACING};

pub struct TestApp {
    pub address: String,
    pub repository: Arc<dyn CustomerRepository>,
    pub client: Client,
    mongo: Option<Arc<CustomerDatabase>>,
}

/// Spawns the app on a random port
///
/// With `MONGODB_URI` (or `MONGODB_URL`) set, every app gets its own MongoDB
/// database, otherwise the in-memory store is used. The URI should not name a
/// database itself, as one named there wins over the per-test name.
pub async fn spawn_app() -> TestApp {
    let mut configuration = clientele::get_configuration().expect("failed to read configuration");

    if DatabaseSettings::connection_string_from_env().is_some() {
        configuration.set_backend(Backend::Mongo);
        configuration.set_database_name(format!("clientele-test-{}", ObjectId::new()));
    } else {
        configuration.set_backend(Backend::Memory);
    }

    let repository = build_repository(&configuration.database);
    serve(configuration.application, repository, None)
}

/// Spawns the app against a MongoDB address nothing listens on
pub async fn spawn_app_without_store() -> TestApp {
    let configuration = clientele::get_configuration().expect("failed to read configuration");

    let connector = MongoConnector {
        database_name: "unreachable".into(),
        connect_timeout: Duration::from_secs(1),
    };
    let connection = ConnectionManager::new(connector, "mongodb://127.0.0.1:1/unreachable");
    let database = Arc::new(CustomerDatabase::new(connection));

    serve(configuration.application, database.clone(), Some(database))
}

fn serve(
    settings: ApplicationSettings,
    repository: Arc<dyn CustomerRepository>,
    mongo: Option<Arc<CustomerDatabase>>,
) -> TestApp {
    lazy_static::initialize(&TRACING);

    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let server = clientele::build_app(listener, repository.clone(), settings)
        .expect("failed to bind address");

    let _ = tokio::spawn(server);
    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        repository,
        client: build_http_client().expect("failed to build http client"),
        mongo,
    }
}

impl TestApp {
    /// MongoDB handshakes started so far, `None` for apps built by `spawn_app`
    pub fn connection_attempts(&self) -> Option<u64> {
        self.mongo
            .as_ref()
            .map(|database| database.connection().attempts())
    }

    pub fn customer_url(&self) -> String {
        format!("{}/customer", self.address)
    }

    pub async fn get_customers(&self, query: &[(&str, &str)]) -> Result<Response> {
        let response = self
            .client
            .get(&self.customer_url())
            .query(query)
            .send()
            .await?;
        Ok(response)
    }

    pub async fn post_customer(&self, body: &Value) -> Result<Response> {
        let response = self
            .client
            .post(&self.customer_url())
            .json(body)
            .send()
            .await?;
        Ok(response)
    }

    pub async fn put_customer(&self, body: &Value) -> Result<Response> {
        let response = self
            .client
            .put(&self.customer_url())
            .json(body)
            .send()
            .await?;
        Ok(response)
    }

    pub async fn patch_customer(&self, body: &Value) -> Result<Response> {
        let response = self
            .client
            .patch(&self.customer_url())
            .json(body)
            .send()
            .await?;
        Ok(response)
    }

    pub async fn delete_customer(&self, query: &[(&str, &str)]) -> Result<Response> {
        let response = self
            .client
            .delete(&self.customer_url())
            .query(query)
            .send()
            .await?;
        Ok(response)
    }

    /// Creates a customer and returns the stored json, `_id` included
    pub async fn create_customer(
        &self,
        member_number: i64,
        name: &str,
        interests: &str,
    ) -> Result<Value> {
        let response = self
            .post_customer(&customer_body(member_number, name, interests))
            .await?;
        anyhow::ensure!(
            response.status().is_success(),
            "create failed with {}",
            response.status()
        );
        Ok(response.json::<Value>().await?)
    }

    /// Stores members `1..=count` in reverse order
    pub async fn seed(&self, count: i64) -> Result<()> {
        for member_number in (1..=count).rev() {
            self.create_customer(
                member_number,
                &format!("Member {}", member_number),
                "reading, hiking",
            )
            .await?;
        }
        Ok(())
    }
}

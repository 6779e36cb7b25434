mod connection;
mod customer;
mod memory;

pub use connection::{redact_credentials, Connect, ConnectionManager};
pub use customer::{CustomerDatabase, CustomerRepository, MongoConnector, CUSTOMER_COLLECTION};
pub use memory::InMemoryCustomerDatabase;

use std::sync::Arc;
use tracing::info;

use crate::configuration::{Backend, DatabaseSettings};

/// Builds the configured repository without touching the store
///
/// For MongoDB the connection is only established on first use
pub fn build_repository(settings: &DatabaseSettings) -> Arc<dyn CustomerRepository> {
    match settings.backend {
        Backend::Mongo => {
            let connector = MongoConnector {
                database_name: settings.database_name.clone(),
                connect_timeout: settings.connect_timeout(),
            };
            let connection = ConnectionManager::new(connector, settings.connection_string());
            Arc::new(CustomerDatabase::new(connection))
        }
        Backend::Memory => {
            info!("using in-memory customer store");
            Arc::new(InMemoryCustomerDatabase::new())
        }
    }
}

mod build_app;
pub mod configuration;
pub mod database;
mod error;
pub mod models;
pub mod routes;
pub mod telemetry;

#[cfg(test)]
mod test_helpers;

pub use build_app::build_app;
pub use configuration::get_configuration;
pub use error::ClienteleError;

pub type Result<T> = std::result::Result<T, ClienteleError>;

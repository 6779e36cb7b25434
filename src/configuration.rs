use config::{Config, File};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use std::env::var;
use std::fmt;
use std::time::Duration;
use tracing::warn;

/// Used when neither the environment nor the configuration files name a store
pub const DEFAULT_DATABASE_URI: &str = "mongodb://localhost:27017/next-mongo";

/// Environment variables checked, in order, for the store connection string
pub const CONNECTION_STRING_VARS: [&str; 2] = ["MONGODB_URI", "MONGODB_URL"];

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    #[serde(
        default = "default_page_size",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub page_size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub uri: Option<String>,
    pub database_name: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Mongo,
    Memory,
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Mongo
    }
}

#[derive(Debug)]
pub enum Environment {
    Local,
    CI,
    Production,
}

fn default_page_size() -> u64 {
    10
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let mut settings = Config::default();
    let base_path = std::env::current_dir().expect("failed to determine current directory");
    let configuration_directory = base_path.join("configuration");

    settings.merge(File::from(configuration_directory.join("base")).required(true))?;

    let environment: Environment = var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .expect("failed to parse APP_ENVIRONMENT");

    settings
        .merge(File::from(configuration_directory.join(environment.as_str())).required(true))?;

    settings.merge(config::Environment::with_prefix("app").separator("__"))?;

    settings.try_into()
}

impl Settings {
    pub fn set_backend(&mut self, backend: Backend) {
        self.database.backend = backend;
    }

    pub fn set_database_name(&mut self, database_name: String) {
        self.database.database_name = database_name;
    }
}

impl DatabaseSettings {
    /// Whether a connection string was supplied through the environment
    pub fn connection_string_from_env() -> Option<String> {
        CONNECTION_STRING_VARS
            .iter()
            .find_map(|key| var(key).ok().filter(|value| !value.trim().is_empty()))
    }

    /// The connection string for the document store
    ///
    /// `MONGODB_URI` (or `MONGODB_URL`) wins over `database.uri`, which wins
    /// over [`DEFAULT_DATABASE_URI`]
    pub fn connection_string(&self) -> String {
        resolve_connection_string(Self::connection_string_from_env(), self.uri.clone())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

fn resolve_connection_string(from_env: Option<String>, configured: Option<String>) -> String {
    from_env.or(configured).unwrap_or_else(|| {
        warn!(
            vars = ?CONNECTION_STRING_VARS,
            default = DEFAULT_DATABASE_URI,
            "no connection string configured, using default"
        );
        DEFAULT_DATABASE_URI.to_owned()
    })
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::CI => "ci",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "ci" => Ok(Self::CI),
            "production" => Ok(Self::Production),
            other => Err(format!("{} is not a supported environment", other)),
        }
    }
}

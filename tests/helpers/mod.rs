#![allow(dead_code)]
mod app;
mod reqwest;

pub use self::reqwest::*;
pub use app::{spawn_app, spawn_app_without_store, TestApp};

use lazy_static::lazy_static;
use serde_json::{json, Value};

use clientele::telemetry::{generate_subscriber, init_subscriber};

lazy_static! {
    /// To ensure logs are only outputted in tests when required, by default
    /// tests run with no logs being captured
    ///
    /// In order to set logs to be captured during tests run them with:
    /// `TEST_LOG=true cargo test | bunyan`
    pub static ref TRACING: () = {
        if std::env::var("TEST_LOG").is_ok() {
            init_subscriber(generate_subscriber("test".into(), "debug".into(), std::io::stdout));
        } else {
            init_subscriber(generate_subscriber("test".into(), "debug".into(), std::io::sink));
        }
    };

    pub static ref DEFAULT_CUSTOMER: Value = customer_body(1, "Ada Lovelace", "Mathematics, Poetry");
}

pub fn customer_body(member_number: i64, name: &str, interests: &str) -> Value {
    json!({
        "name": name,
        "dateOfBirth": "1990-01-01",
        "memberNumber": member_number,
        "interests": interests
    })
}

/// Member numbers from a list response, in response order
pub fn member_numbers(customers: &Value) -> Vec<i64> {
    customers
        .as_array()
        .expect("expected a json array")
        .iter()
        .map(|customer| customer["memberNumber"].as_i64().expect("memberNumber"))
        .collect()
}

/// An id that is well formed but never handed out
pub const UNKNOWN_ID: &str = "000000000000000000000000";

use clientele::{
    build_app, database::build_repository, get_configuration,
    telemetry::{generate_subscriber, init_subscriber},
};
use std::net::TcpListener;

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    let subscriber = generate_subscriber(
        String::from("clientele"),
        String::from("info"),
        std::io::stdout,
    );
    init_subscriber(subscriber);

    let configuration = get_configuration().expect("failed to read configuration");

    // MongoDB is only contacted when the first request needs it
    let repository = build_repository(&configuration.database);

    let addr = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(addr)?;

    build_app(listener, repository, configuration.application)?.await
}

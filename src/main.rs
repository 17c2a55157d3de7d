//! Gatehouse server binary
//!
//! Loads configuration, initializes tracing, and serves the gatekeeper
//! with the in-memory session store and the fixed-credential demo login
//! service. Applications embedding gatehouse build their own state with
//! real `SessionStore`/`LoginService` implementations instead.

use std::sync::Arc;

use gatehouse::auth::FixedCredentials;
use gatehouse::config::GatehouseConfig;
use gatehouse::session::MemorySessionStore;
use gatehouse::state::GatehouseState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gatehouse::observability::init()?;

    let config = GatehouseConfig::load()?;
    let addr = format!("{}:{}", config.service.host, config.service.port);

    let login = Arc::new(FixedCredentials::new(
        config.auth.username.clone(),
        config.auth.password.clone(),
    ));
    let state = GatehouseState::new(config, Arc::new(MemorySessionStore::new()), login);
    let app = gatehouse::router::build(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "gatehouse listening");
    axum::serve(listener, app).await?;

    Ok(())
}

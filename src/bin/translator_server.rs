//! Identifier Translator REST API Server
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/identifiers cargo run --bin translator_server --features server
//!
//! curl 'http://localhost:8080/translate?uri=info:doi:10.11647/obp.0001&filter=uri_scheme:urn:isbn'
//! curl 'http://localhost:8080/translate?title=open%20access&strict=true'
//! curl 'http://localhost:8080/works?filter=work_type:monograph&sort=title&order=desc'
//! ```
//!
//! Configuration comes from the environment (or a `.env` file):
//! `DATABASE_URL` or `IDENTIFIERSDB_HOST/USER/PASS/DB`, `DATABASE_POOL_SIZE`,
//! `BIND_ADDR` and `API_DEBUG`.

use std::sync::Arc;

use anyhow::Context;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use identifier_translator::{
    create_translator_router, telemetry, PgWorkStore, Translator, TranslatorConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = TranslatorConfig::from_env().context("loading configuration")?;
    telemetry::init(config.debug);

    info!("Starting Identifier Translator API");

    let store = PgWorkStore::connect(&config.database)
        .await
        .context("connecting to database")?;
    let translator = Arc::new(Translator::new(Arc::new(store)));

    let app = create_translator_router(translator).layer(
        ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        ),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!("Server running on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

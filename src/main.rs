use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use std::sync::Arc;

mod api;
mod config;
mod db;
mod docs;
mod errors;
mod model;
mod routes;
mod scan;
mod store;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::api_doc;
use crate::scan::{capture, decoder::TokenDecoder, dispatcher::ScanDispatcher};
use crate::store::{identity::IdentityStore, ledger::AttendanceLedger};
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "QR attendance ledger"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "attendance.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(offset = %config.utc_offset, "Server starting...");

    let pool = init_db(&config.database_url, config.db_max_connections).await?;

    let identities = IdentityStore::new(pool.clone(), config.identity_cache_capacity);
    let ledger = AttendanceLedger::new(pool, config.utc_offset);
    let dispatcher = ScanDispatcher::new(Arc::new(TokenDecoder), identities.clone(), ledger.clone());

    if config.scanner_stdin {
        let dispatcher = dispatcher.clone();
        actix_web::rt::spawn(async move {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            if let Err(e) = capture::run_line_capture(stdin, dispatcher).await {
                error!(error = %e, "Scanner input loop stopped");
            }
        });
        info!("Reading scanner input from stdin");
    }

    let server_addr = config.server_addr.clone();
    let openapi = api_doc(&config.api_prefix);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", openapi.clone()),
            )
            .app_data(Data::new(identities.clone()))
            .app_data(Data::new(ledger.clone()))
            .app_data(Data::new(dispatcher.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config))
    })
    .bind(&server_addr)
    .with_context(|| format!("failed to bind {server_addr}"))?
    .run()
    .await
    .context("server error")
}

use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod jobs;
mod model;
mod models;
mod routes;
mod utils;

use config::Config;
use db::{init_db, seed_admin};
use routes::Limiters;

use crate::docs::ApiDoc;
use crate::utils::username_index;
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "sighr.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await?;

    if let Some(seed) = &config.seed_admin {
        seed_admin(&pool, seed, config.vacation_initial_days).await?;
    }

    let pool_for_warmup = pool.clone();
    actix_web::rt::spawn(async move {
        // All usernames go to the filter, the last 30 days of logins to the cache
        if let Err(e) = username_index::warmup(&pool_for_warmup, 250, 30).await {
            error!(error = ?e, "Failed to warm up username index");
        }
    });

    jobs::vacation_renewal::spawn(pool.clone(), config.vacation_annual_credit);

    let limiters = Limiters::from_config(&config)?;
    let server_addr = config.server_addr.clone();
    info!(%server_addr, "Listening");

    HttpServer::new(move || {
        let config = config.clone();
        let limiters = limiters.clone();
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .configure(|cfg| routes::configure(cfg, &config, &limiters))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use relationship_service::config::{Config, StoreBackend, SERVICE_NAME};
use relationship_service::metrics::serve_metrics;
use relationship_service::repository::{GraphStore, MemoryGraphStore, PgGraphStore};
use relationship_service::RelationshipGraph;

async fn ready(graph: web::Data<RelationshipGraph>) -> impl Responder {
    match graph.ping().await {
        Ok(()) => HttpResponse::Ok().body("READY"),
        Err(e) => {
            error!("Readiness check failed: {}", e);
            HttpResponse::ServiceUnavailable().body(format!("store unavailable: {}", e))
        }
    }
}

fn init_tracing(env: &str) {
    let json = env.eq_ignore_ascii_case("production");
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relationship_service=debug,sqlx=warn".into()),
        )
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .init();
}

async fn build_store(config: &Config) -> Result<Arc<dyn GraphStore>> {
    match config.graph.store {
        StoreBackend::Postgres => {
            let db_config = config
                .database
                .clone()
                .context("DATABASE_URL is required for the postgres store")?;
            db_config.log_config();

            let pool = db_pool::create_pool(db_config)
                .await
                .context("Failed to connect to database")?;
            info!("Database pool created and verified");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;
            info!("Database migrations completed");

            Ok(Arc::new(PgGraphStore::new(pool)))
        }
        StoreBackend::Memory => {
            info!("Using in-memory graph store; state is lost on restart");
            Ok(Arc::new(MemoryGraphStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config.app.env);

    info!(
        "Starting {}: env={}, store={:?}, text_update_policy={:?}",
        SERVICE_NAME, config.app.env, config.graph.store, config.graph.text_update_policy
    );

    let store = build_store(&config).await?;
    let graph = web::Data::new(RelationshipGraph::new(store, &config.graph));

    let http_addr = format!("{}:{}", config.app.host, config.app.http_port);
    info!("HTTP health and metrics listening on http://{}", http_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(graph.clone())
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/ready", web::get().to(ready))
            .route("/metrics", web::get().to(serve_metrics))
    })
    .bind(&http_addr)
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server error")?;

    info!("{} shutting down", SERVICE_NAME);
    Ok(())
}

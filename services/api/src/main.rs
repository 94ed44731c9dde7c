use anyhow::Result;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod email;
mod error;
mod jwt;
mod llm;
mod middleware;
mod models;
mod policy;
mod repositories;
mod routes;
mod state;
mod validation;

use common::database::{DatabaseConfig, init_pool, init_schema};
use tokio::net::TcpListener;

use crate::{
    email::Mailer,
    jwt::{JwtConfig, JwtService},
    llm::{CompletionClient, ConversationStore},
    repositories::{ChatRepository, TaskRepository, UserRepository},
    state::AppState,
};

/// Build the CORS layer from the comma-separated `ALLOWED_ORIGINS`
/// variable, defaulting to the dev client host
fn cors_layer_from_env() -> Result<CorsLayer> {
    let raw =
        std::env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".to_string());

    let origins = raw
        .split(',')
        .map(|origin| {
            origin
                .trim()
                .parse::<HeaderValue>()
                .map_err(|e| anyhow::anyhow!("Invalid origin '{}': {}", origin, e))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting task-management API service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    // Create tables and indexes if missing
    init_schema(&pool).await?;
    info!("Database schema ready");

    // Initialize JWT service
    let jwt_config = JwtConfig::from_env()?;
    let jwt_service = JwtService::new(&jwt_config);

    let user_repository = UserRepository::new(pool.clone());
    let task_repository = TaskRepository::new(pool.clone());
    let chat_repository = ChatRepository::new(pool.clone());

    let app_state = AppState {
        jwt_service,
        user_repository,
        task_repository,
        chat_repository,
        mailer: Mailer::from_env(),
        completion_client: CompletionClient::from_env(),
        conversations: ConversationStore::from_env(),
    };

    // Start the web server
    let cors = cors_layer_from_env()?;
    let app = routes::create_router(app_state, cors);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Task-management API listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

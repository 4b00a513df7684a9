use axum::{Router, routing::get};
use mentorlink::{AppState, chat, connections, db, engagement, matching, meetings, requests};
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mentorlink=info".into()),
        )
        .init();

    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(dotenv::var("DATABASE_URL")?.as_str())
        .await?;
    db::init(&db_pool).await?;

    let app_state = AppState {
        db_pool,
        // Delivery fan-out for the external messaging transport.
        delivery: broadcast::channel(256).0,
    };

    let app = Router::new()
        .route("/health", get(health))
        .nest("/requests", requests::router())
        .nest("/follows", connections::router())
        .nest("/chats", chat::router())
        .nest("/meetings", meetings::router())
        .nest("/mentoring", matching::router())
        .nest("/dashboard", engagement::router())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qbank::{config, db, handlers, state::AppState};

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "qbank=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let settings = config::load();

  let pool = db::init_db(&settings.database_path).expect("Failed to initialize database");

  if let Some(seed_file) = &settings.seed_file {
    let conn = pool.lock().expect("Database lock failed during startup");
    if let Err(e) = db::seed_questions(&conn, seed_file) {
      tracing::warn!("Failed to seed questions from {}: {}", seed_file.display(), e);
    }
  }

  let app = handlers::router(AppState::new(pool.clone()));

  let bind_addr = settings.bind_addr();
  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Server running on http://localhost:{}", settings.server_port);

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server failed to start");

  // Router and its state are gone once serve returns; this is the last handle
  drop(pool);
  tracing::info!("Server stopped, database connection closed");
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!("Failed to listen for shutdown signal: {}", e);
    std::future::pending::<()>().await;
  }
  tracing::info!("Shutdown signal received");
}

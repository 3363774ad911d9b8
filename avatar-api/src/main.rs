use std::str::FromStr;

use axum::http::HeaderName;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use avatar_api::{app_state::AppState, config, factory, router};

#[tokio::main]
async fn main() {
    dotenvy::from_filename("./avatar-api/.env.local").ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "avatar_api=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::read_config().expect("Failed to read configuration");

    let connection_pool = PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect_lazy_with(config.database.with_db());

    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to run migrations");

    let components = factory::build_avatar_components(connection_pool, &config)
        .await
        .expect("Failed to initialize avatar storage");

    // Keep the logger alive for the lifetime of the server.
    let _event_logger = components.events.spawn_logger();

    let identity_header = HeaderName::from_str(&config.auth.identity_header)
        .expect("Invalid auth.identity_header");
    let app_state = AppState::new(
        components.service,
        identity_header,
        config.avatar.max_size,
    );

    let app = router::create(app_state, &config);

    let addr = format!("{}:{}", config.application.host, config.application.port);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Failed to bind address");
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await.expect("Server error");
}

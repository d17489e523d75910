use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use redis::Client as RedisClient;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carelink_api::{config::Config, db, middleware::auth::JwtSecret, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let redis_client = RedisClient::open(config.redis_url.as_str())?;
    let redis_conn = redis_client.get_multiplexed_async_connection().await?;
    info!("Redis connected");

    let state = AppState {
        db: pool,
        redis: redis_conn,
        redis_client: redis_client.clone(),
        config: config.clone(),
    };

    // CORS: allow the configured app origin; localhost always passes for
    // local development.
    let base_url = config.app_base_url.clone();
    let cors_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let o = match origin.to_str() {
            Ok(s) => s,
            Err(_) => return false,
        };
        if o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1") {
            return true;
        }
        o == base_url
    });

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(cors_origin);

    let jwt_secret = JwtSecret(config.jwt_secret.clone());

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        // Auth
        .route("/auth/signup", post(routes::auth::signup))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh_token))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/me", get(routes::auth::me))
        .route("/auth/change-password", post(routes::auth::change_password))
        // Staff administration
        .route("/users", get(routes::users::list_users))
        .route("/users/{id}/role", put(routes::users::set_role))
        .route("/users/{id}", delete(routes::users::deactivate_user))
        // Students
        .route("/students", get(routes::students::list_students).post(routes::students::create_student))
        .route("/students/{id}", put(routes::students::update_student).delete(routes::students::remove_student))
        // Announcements
        .route("/announcements", get(routes::announcements::list_announcements).post(routes::announcements::create_announcement))
        .route("/announcements/{id}", put(routes::announcements::update_announcement).delete(routes::announcements::delete_announcement))
        // Contact book
        .route("/contact-book", get(routes::contact_book::load_for_date).put(routes::contact_book::save_entry))
        .route("/contact-book/bulk-apply", post(routes::contact_book::bulk_apply))
        .route("/contact-book/{student_id}/sign", post(routes::contact_book::sign_entry))
        .route("/contact-book/{student_id}/photos", post(routes::contact_book::upload_photos))
        .route("/photos/{*path}", get(routes::photos::serve_photo))
        // Leave requests
        .route("/leaves", get(routes::leaves::list_leaves).post(routes::leaves::create_leave))
        .route("/leaves/calendar", get(routes::leaves::leave_calendar))
        .route("/leaves/{id}/decide", post(routes::leaves::decide_leave))
        // Pickup queue
        .route("/pickup", get(routes::pickup::board).post(routes::pickup::enqueue))
        .route("/pickup/{id}/advance", post(routes::pickup::advance))
        // Chat
        .route("/messages", get(routes::messages::list_messages).post(routes::messages::send_message))
        // Reports
        .route("/reports/kpi", get(routes::reports::kpi_report))
        // Audit log
        .route("/audit-log", get(routes::audit_log::list_audit_log))
        // WebSocket
        .route("/ws", get(routes::websocket::ws_handler))
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Covers multi-image contact book uploads
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024))
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("carelink API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

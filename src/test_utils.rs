#[cfg(test)]
pub mod test_utils {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::{HashingSettings, Settings};
    use crate::realtime::ChangeHub;
    use crate::router::create_router;
    use crate::schemas::{ApiResponse, AppState};
    use axum::Router;
    use axum::http::{HeaderName, HeaderValue, header::AUTHORIZATION};
    use axum_test::TestServer;
    use compute::DayOverflow;
    use migration::{Migrator, MigratorTrait};
    use moka::future::Cache;
    use sea_orm::{Database, DatabaseConnection};
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        // Run migrations
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    /// Settings with hashing costs low enough for tests
    pub fn test_settings() -> Settings {
        Settings {
            database_url: "sqlite::memory:".to_string(),
            bind_address: "127.0.0.1:0".to_string(),
            session_ttl_hours: 1,
            cache_ttl_seconds: 60,
            currency: "BRL".to_string(),
            day_overflow: DayOverflow::Clamp,
            realtime_buffer: 64,
            hashing: HashingSettings {
                salt_length: 16,
                hash_length: 32,
                iterations: 1,
                mem_cost_kib: 1024,
                threads: 1,
            },
        }
    }

    /// Create AppState for testing
    pub async fn setup_test_app_state() -> AppState {
        let db = setup_test_db().await;
        let settings = test_settings();

        AppState {
            db,
            cache: Cache::builder().max_capacity(100).build(),
            changes: ChangeHub::new(settings.realtime_buffer),
            settings: Arc::new(settings),
        }
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level is determined by the RUST_LOG environment variable,
    /// defaulting to WARN if not set.
    ///
    /// # Returns
    ///
    /// A guard that will clean up the subscriber when dropped.
    pub fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| match level.to_uppercase().as_str() {
                "ERROR" => Some(Level::ERROR),
                "WARN" => Some(Level::WARN),
                "INFO" => Some(Level::INFO),
                "DEBUG" => Some(Level::DEBUG),
                "TRACE" => Some(Level::TRACE),
                _ => None,
            })
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Create axum app for testing
    pub async fn setup_test_app() -> Router {
        create_router(setup_test_app_state().await)
    }

    pub async fn setup_test_server() -> TestServer {
        TestServer::new(setup_test_app().await).unwrap()
    }

    /// Registers an account and returns its user id and session token.
    pub async fn sign_up(server: &TestServer, email: &str) -> (i64, String) {
        let response = server
            .post("/api/v1/auth/sign-up")
            .json(&serde_json::json!({ "email": email, "password": "segredo123" }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let body: ApiResponse<serde_json::Value> = response.json();
        let user_id = body.data["user"]["id"].as_i64().unwrap();
        let token = body.data["access_token"].as_str().unwrap().to_string();
        (user_id, token)
    }

    /// `Authorization` header carrying `token`.
    pub fn bearer(token: &str) -> (HeaderName, HeaderValue) {
        (
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        )
    }

    /// Waits long enough for a published event to be observable.
    pub const EVENT_TIMEOUT: Duration = Duration::from_secs(2);
}

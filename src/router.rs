use crate::handlers::{
    analysis::get_analysis,
    auth::{get_session, sign_in, sign_out, sign_up, update_password},
    categories::get_categories,
    health::health_check,
    realtime::subscribe_changes,
    recurring_expenses::{
        create_recurring_expense, delete_recurring_expense, generate_month,
        get_recurring_expense, get_recurring_expenses, update_recurring_expense,
    },
    summary::get_monthly_summary,
    transactions::{
        create_transaction, delete_transaction, get_transaction, get_transactions,
        update_transaction,
    },
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    Router,
    routing::{get, post, put},
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Auth routes
        .route("/api/v1/auth/sign-up", post(sign_up))
        .route("/api/v1/auth/sign-in", post(sign_in))
        .route("/api/v1/auth/sign-out", post(sign_out))
        .route("/api/v1/auth/session", get(get_session))
        .route("/api/v1/auth/password", put(update_password))
        // Transaction CRUD routes
        .route(
            "/api/v1/transactions",
            post(create_transaction).get(get_transactions),
        )
        .route(
            "/api/v1/transactions/:transaction_id",
            get(get_transaction)
                .put(update_transaction)
                .delete(delete_transaction),
        )
        // Recurring expense routes
        .route(
            "/api/v1/recurring-expenses",
            post(create_recurring_expense).get(get_recurring_expenses),
        )
        .route("/api/v1/recurring-expenses/generate", post(generate_month))
        .route(
            "/api/v1/recurring-expenses/:recurring_expense_id",
            get(get_recurring_expense)
                .put(update_recurring_expense)
                .delete(delete_recurring_expense),
        )
        // Reports
        .route("/api/v1/summary", get(get_monthly_summary))
        .route("/api/v1/analysis", get(get_analysis))
        .route("/api/v1/categories", get(get_categories))
        // Change feed
        .route("/api/v1/realtime", get(subscribe_changes))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // The recorder is process global, so metrics stay off in tests
    #[cfg(not(test))]
    let router = {
        let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();
        router
            .route("/metrics", get(move || async move { metric_handle.render() }))
            .layer(prometheus_layer)
    };

    router
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

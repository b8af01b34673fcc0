#[cfg(test)]
mod integration_tests {
    use std::str::FromStr;

    use crate::handlers::recurring_expenses::CreateRecurringExpenseRequest;
    use crate::handlers::transactions::CreateTransactionRequest;
    use crate::realtime::{ChangeAction, ChangeTopic, FeedItem};
    use crate::router::create_router;
    use crate::schemas::{ApiResponse, CachedData, ErrorResponse};
    use crate::test_utils::test_utils::{
        EVENT_TIMEOUT, bearer, init_test_tracing, setup_test_app_state, setup_test_server, sign_up,
    };
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use chrono::{TimeZone, Utc};
    use common::{TrendWindow, YearMonth};
    use compute::analyze;
    use model::entities::transaction::TransactionKind;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};

    fn transaction_request(name: &str, amount: Decimal, kind: TransactionKind) -> CreateTransactionRequest {
        CreateTransactionRequest {
            name: name.to_string(),
            amount,
            kind: Some(kind),
            category: None,
            is_paid: None,
            created_at: None,
        }
    }

    fn recurring_request(name: &str, amount: Decimal, day: i32) -> CreateRecurringExpenseRequest {
        CreateRecurringExpenseRequest {
            name: name.to_string(),
            amount,
            category: None,
            day,
        }
    }

    fn amount_of(value: &Value) -> Decimal {
        Decimal::from_str(value["amount"].as_str().unwrap()).unwrap()
    }

    fn assert_close(actual: &Value, expected: f64) {
        let actual = actual.as_f64().unwrap();
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    async fn create_transaction(server: &TestServer, token: &str, request: &CreateTransactionRequest) -> Value {
        let (name, value) = bearer(token);
        let response = server
            .post("/api/v1/transactions")
            .add_header(name, value)
            .json(request)
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<Value> = response.json();
        body.data
    }

    async fn create_recurring(server: &TestServer, token: &str, request: &CreateRecurringExpenseRequest) -> Value {
        let (name, value) = bearer(token);
        let response = server
            .post("/api/v1/recurring-expenses")
            .add_header(name, value)
            .json(request)
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<Value> = response.json();
        body.data
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = setup_test_server().await;

        let response = server.get("/health").await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_metrics_endpoint_disabled_in_tests() {
        let server = setup_test_server().await;

        let response = server.get("/metrics").await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_openapi_document_lists_routes() {
        let server = setup_test_server().await;

        let response = server.get("/api-docs/openapi.json").await;

        response.assert_status(StatusCode::OK);
        let doc: Value = response.json();
        assert_eq!(doc["info"]["title"], "Fluxo API");
        for path in [
            "/api/v1/auth/sign-up",
            "/api/v1/transactions",
            "/api/v1/recurring-expenses/generate",
            "/api/v1/analysis",
            "/api/v1/realtime",
        ] {
            assert!(doc["paths"].get(path).is_some(), "missing {}", path);
        }
        assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
    }

    #[tokio::test]
    async fn test_sign_up_and_session() {
        let server = setup_test_server().await;
        let (user_id, token) = sign_up(&server, "Ana@Example.com").await;
        assert!(user_id > 0);
        assert_eq!(token.len(), 64);

        let (name, value) = bearer(&token);
        let response = server.get("/api/v1/auth/session").add_header(name, value).await;

        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Value> = response.json();
        assert!(body.success);
        assert_eq!(body.data["user"]["email"], "ana@example.com");
        assert_eq!(body.data["access_token"], token.as_str());
    }

    #[tokio::test]
    async fn test_sign_up_duplicate_email() {
        let server = setup_test_server().await;
        sign_up(&server, "ana@example.com").await;

        let response = server
            .post("/api/v1/auth/sign-up")
            .json(&json!({ "email": "ANA@example.com", "password": "outrasenha" }))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        let body: ErrorResponse = response.json();
        assert!(!body.success);
        assert_eq!(body.code, "EMAIL_ALREADY_EXISTS");
    }

    #[tokio::test]
    async fn test_sign_up_rejects_short_password_and_bad_email() {
        let server = setup_test_server().await;

        let short = server
            .post("/api/v1/auth/sign-up")
            .json(&json!({ "email": "ana@example.com", "password": "12345" }))
            .await;
        short.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(short.json::<ErrorResponse>().code, "VALIDATION_ERROR");

        let bad_email = server
            .post("/api/v1/auth/sign-up")
            .json(&json!({ "email": "not-an-email", "password": "segredo123" }))
            .await;
        bad_email.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sign_in_with_wrong_password() {
        let server = setup_test_server().await;
        sign_up(&server, "ana@example.com").await;

        let response = server
            .post("/api/v1/auth/sign-in")
            .json(&json!({ "email": "ana@example.com", "password": "errada" }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<ErrorResponse>().code, "INVALID_CREDENTIALS");

        let unknown = server
            .post("/api/v1/auth/sign-in")
            .json(&json!({ "email": "bruno@example.com", "password": "segredo123" }))
            .await;
        unknown.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.json::<ErrorResponse>().code, "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn test_sign_out_revokes_session() {
        let server = setup_test_server().await;
        sign_up(&server, "ana@example.com").await;

        let response = server
            .post("/api/v1/auth/sign-in")
            .json(&json!({ "email": "ana@example.com", "password": "segredo123" }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Value> = response.json();
        let token = body.data["access_token"].as_str().unwrap().to_string();

        let (name, value) = bearer(&token);
        server
            .post("/api/v1/auth/sign-out")
            .add_header(name, value)
            .await
            .assert_status(StatusCode::OK);

        let (name, value) = bearer(&token);
        let response = server.get("/api/v1/auth/session").add_header(name, value).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<ErrorResponse>().code, "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_update_password_flow() {
        let server = setup_test_server().await;
        let (_, token) = sign_up(&server, "ana@example.com").await;

        let (name, value) = bearer(&token);
        let mismatch = server
            .put("/api/v1/auth/password")
            .add_header(name, value)
            .json(&json!({
                "current_password": "segredo123",
                "new_password": "novasenha",
                "confirm_password": "novasenhax"
            }))
            .await;
        mismatch.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(mismatch.json::<ErrorResponse>().code, "PASSWORD_MISMATCH");

        let (name, value) = bearer(&token);
        let too_short = server
            .put("/api/v1/auth/password")
            .add_header(name, value)
            .json(&json!({
                "current_password": "segredo123",
                "new_password": "abc",
                "confirm_password": "abc"
            }))
            .await;
        too_short.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(too_short.json::<ErrorResponse>().code, "VALIDATION_ERROR");

        let (name, value) = bearer(&token);
        let wrong_current = server
            .put("/api/v1/auth/password")
            .add_header(name, value)
            .json(&json!({
                "current_password": "chute",
                "new_password": "novasenha",
                "confirm_password": "novasenha"
            }))
            .await;
        wrong_current.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_current.json::<ErrorResponse>().code, "INVALID_CREDENTIALS");

        let (name, value) = bearer(&token);
        server
            .put("/api/v1/auth/password")
            .add_header(name, value)
            .json(&json!({
                "current_password": "segredo123",
                "new_password": "novasenha",
                "confirm_password": "novasenha"
            }))
            .await
            .assert_status(StatusCode::OK);

        server
            .post("/api/v1/auth/sign-in")
            .json(&json!({ "email": "ana@example.com", "password": "segredo123" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .post("/api/v1/auth/sign-in")
            .json(&json!({ "email": "ana@example.com", "password": "novasenha" }))
            .await
            .assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_data_routes_require_session() {
        let server = setup_test_server().await;

        for path in [
            "/api/v1/transactions",
            "/api/v1/recurring-expenses",
            "/api/v1/summary",
            "/api/v1/analysis",
            "/api/v1/realtime",
        ] {
            let response = server.get(path).await;
            response.assert_status(StatusCode::UNAUTHORIZED);
            assert_eq!(response.json::<ErrorResponse>().code, "UNAUTHORIZED");
        }

        let (name, value) = bearer("not-a-real-token");
        server
            .get("/api/v1/transactions")
            .add_header(name, value)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_transaction_crud() {
        let server = setup_test_server().await;
        let (_, token) = sign_up(&server, "ana@example.com").await;

        let mut request = transaction_request("Mercado", dec!(152.37), TransactionKind::Variable);
        request.category = Some("food".to_string());
        let created = create_transaction(&server, &token, &request).await;
        let id = created["id"].as_i64().unwrap();
        assert_eq!(created["name"], "Mercado");
        assert_eq!(created["kind"], "variable");
        assert_eq!(created["category"], "food");
        assert_eq!(created["is_paid"], true);
        assert_eq!(amount_of(&created), dec!(152.37));

        let (name, value) = bearer(&token);
        let response = server
            .get(&format!("/api/v1/transactions/{}", id))
            .add_header(name, value)
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.message, "Transaction retrieved successfully");

        let (name, value) = bearer(&token);
        let response = server
            .put(&format!("/api/v1/transactions/{}", id))
            .add_header(name, value)
            .json(&json!({ "amount": "160.00", "is_paid": false }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Value> = response.json();
        assert_eq!(amount_of(&body.data), dec!(160));
        assert_eq!(body.data["is_paid"], false);
        assert_eq!(body.data["name"], "Mercado");

        let (name, value) = bearer(&token);
        server
            .delete(&format!("/api/v1/transactions/{}", id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::OK);

        let (name, value) = bearer(&token);
        let response = server
            .get(&format!("/api/v1/transactions/{}", id))
            .add_header(name, value)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<ErrorResponse>().code, "TRANSACTION_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_create_transaction_validation() {
        let server = setup_test_server().await;
        let (_, token) = sign_up(&server, "ana@example.com").await;

        for payload in [
            json!({ "name": "", "amount": "10" }),
            json!({ "name": "   ", "amount": "10" }),
            json!({ "name": "Taxi", "amount": "-10" }),
            json!({ "name": "Taxi", "amount": "10", "category": "unknown" }),
            json!({ "name": "Taxi", "amount": "10", "kind": "bogus" }),
            json!({ "name": "Taxi" }),
        ] {
            let (name, value) = bearer(&token);
            let response = server
                .post("/api/v1/transactions")
                .add_header(name, value)
                .json(&payload)
                .await;
            response.assert_status(StatusCode::BAD_REQUEST);
            assert_eq!(response.json::<ErrorResponse>().code, "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_malformed_bodies_use_error_shape() {
        let server = setup_test_server().await;
        let (_, token) = sign_up(&server, "ana@example.com").await;

        let (name, value) = bearer(&token);
        let response = server
            .post("/api/v1/transactions")
            .add_header(name, value)
            .add_header(
                axum::http::header::CONTENT_TYPE,
                axum::http::HeaderValue::from_static("application/json"),
            )
            .bytes("{\"name\": \"Taxi\",".into())
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<ErrorResponse>().code, "VALIDATION_ERROR");

        let response = server
            .post("/api/v1/auth/sign-in")
            .json(&json!({ "email": "ana@example.com" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<ErrorResponse>().code, "VALIDATION_ERROR");

        let response = server
            .get("/api/v1/categories")
            .add_query_param("kind", "bogus")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<ErrorResponse>().code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_blank_names_are_rejected_on_every_write() {
        let server = setup_test_server().await;
        let (_, token) = sign_up(&server, "ana@example.com").await;
        let created = create_transaction(
            &server,
            &token,
            &transaction_request("Mercado", dec!(80), TransactionKind::Variable),
        )
        .await;
        let template = create_recurring(&server, &token, &recurring_request("Netflix", dec!(39.90), 10)).await;

        let writes = [
            ("post", "/api/v1/recurring-expenses".to_string(), json!({ "name": "  ", "amount": "10", "day": 5 })),
            ("put", format!("/api/v1/transactions/{}", created["id"]), json!({ "name": " \t " })),
            ("put", format!("/api/v1/recurring-expenses/{}", template["id"]), json!({ "name": "   " })),
        ];
        for (method, path, payload) in writes {
            let (name, value) = bearer(&token);
            let request = match method {
                "post" => server.post(&path),
                _ => server.put(&path),
            };
            let response = request.add_header(name, value).json(&payload).await;
            response.assert_status(StatusCode::BAD_REQUEST);
            assert_eq!(response.json::<ErrorResponse>().code, "VALIDATION_ERROR");
        }

        let (name, value) = bearer(&token);
        let response = server
            .get(&format!("/api/v1/recurring-expenses/{}", template["id"]))
            .add_header(name, value)
            .await;
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["name"], "Netflix");
    }

    #[tokio::test]
    async fn test_transactions_are_scoped_to_their_owner() {
        let server = setup_test_server().await;
        let (_, ana) = sign_up(&server, "ana@example.com").await;
        let (_, bruno) = sign_up(&server, "bruno@example.com").await;

        let created = create_transaction(
            &server,
            &ana,
            &transaction_request("Salário", dec!(3000), TransactionKind::Income),
        )
        .await;
        let id = created["id"].as_i64().unwrap();

        let (name, value) = bearer(&bruno);
        server
            .get(&format!("/api/v1/transactions/{}", id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let (name, value) = bearer(&bruno);
        server
            .put(&format!("/api/v1/transactions/{}", id))
            .add_header(name, value)
            .json(&json!({ "amount": "1" }))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let (name, value) = bearer(&bruno);
        server
            .delete(&format!("/api/v1/transactions/{}", id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let (name, value) = bearer(&bruno);
        let response = server.get("/api/v1/transactions").add_header(name, value).await;
        let body: ApiResponse<Vec<Value>> = response.json();
        assert!(body.data.is_empty());

        let (name, value) = bearer(&ana);
        let response = server.get("/api/v1/transactions").add_header(name, value).await;
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 1);
    }

    #[tokio::test]
    async fn test_list_transactions_filters_and_order() {
        let server = setup_test_server().await;
        let (_, token) = sign_up(&server, "ana@example.com").await;

        let dated = |name: &str, amount: Decimal, kind: TransactionKind, day: u32| {
            let mut request = transaction_request(name, amount, kind);
            request.created_at = Some(Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap());
            request
        };
        for request in [
            dated("Salário", dec!(3000), TransactionKind::Income, 1),
            dated("Aluguel", dec!(1200), TransactionKind::Fixed, 5),
            dated("Mercado", dec!(800), TransactionKind::Variable, 12),
            dated("Cinema", dec!(40), TransactionKind::Variable, 20),
        ] {
            create_transaction(&server, &token, &request).await;
        }

        let list = |query: Vec<(&'static str, &'static str)>| {
            let (name, value) = bearer(&token);
            let mut request = server.get("/api/v1/transactions").add_header(name, value);
            for (key, val) in query {
                request = request.add_query_param(key, val);
            }
            request
        };

        let response = list(vec![]).await;
        let body: ApiResponse<Vec<Value>> = response.json();
        let names: Vec<&str> = body.data.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Cinema", "Mercado", "Aluguel", "Salário"]);

        let response = list(vec![("order", "asc")]).await;
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data[0]["name"], "Salário");

        let response = list(vec![("filter", "expense")]).await;
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 3);
        assert!(body.data.iter().all(|t| t["kind"] != "income"));

        let response = list(vec![("filter", "income")]).await;
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 1);

        let response = list(vec![("filter", "fixed")]).await;
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 1);
        assert_eq!(body.data[0]["name"], "Aluguel");

        // Both bounds are inclusive
        let response = list(vec![("start", "2024-05-05"), ("end", "2024-05-12")]).await;
        let body: ApiResponse<Vec<Value>> = response.json();
        let names: Vec<&str> = body.data.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Mercado", "Aluguel"]);

        let response = list(vec![("limit", "3"), ("page", "2")]).await;
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 1);
        assert_eq!(body.data[0]["name"], "Salário");

        let response = list(vec![("start", "2024-05-20"), ("end", "2024-05-01")]).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<ErrorResponse>().code, "INVALID_PERIOD");

        for query in [vec![("limit", "0")], vec![("filter", "nope")], vec![("start", "maio")]] {
            let response = list(query).await;
            response.assert_status(StatusCode::BAD_REQUEST);
            let body: ErrorResponse = response.json();
            assert!(!body.success);
            assert_eq!(body.code, "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_recurring_expense_crud() {
        let server = setup_test_server().await;
        let (_, token) = sign_up(&server, "ana@example.com").await;

        let netflix = create_recurring(&server, &token, &recurring_request("Netflix", dec!(39.90), 10)).await;
        assert_eq!(netflix["category"], "bills");
        let rent = create_recurring(&server, &token, &recurring_request("Aluguel", dec!(1200), 5)).await;

        let (name, value) = bearer(&token);
        let response = server.get("/api/v1/recurring-expenses").add_header(name, value).await;
        let body: ApiResponse<Vec<Value>> = response.json();
        let names: Vec<&str> = body.data.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Aluguel", "Netflix"]);

        let (name, value) = bearer(&token);
        let response = server
            .put(&format!("/api/v1/recurring-expenses/{}", rent["id"]))
            .add_header(name, value)
            .json(&json!({ "day": 28, "category": "housing" }))
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["day"], 28);
        assert_eq!(body.data["category"], "housing");
        assert_eq!(amount_of(&body.data), dec!(1200));

        let (name, value) = bearer(&token);
        server
            .delete(&format!("/api/v1/recurring-expenses/{}", netflix["id"]))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::OK);

        let (name, value) = bearer(&token);
        let response = server
            .get(&format!("/api/v1/recurring-expenses/{}", netflix["id"]))
            .add_header(name, value)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(
            response.json::<ErrorResponse>().code,
            "RECURRING_EXPENSE_NOT_FOUND"
        );
    }

    #[tokio::test]
    async fn test_recurring_expense_day_must_be_within_month() {
        let server = setup_test_server().await;
        let (_, token) = sign_up(&server, "ana@example.com").await;

        for day in [0, 32] {
            let (name, value) = bearer(&token);
            let response = server
                .post("/api/v1/recurring-expenses")
                .add_header(name, value)
                .json(&recurring_request("Academia", dec!(99.90), day))
                .await;
            response.assert_status(StatusCode::BAD_REQUEST);
            assert_eq!(response.json::<ErrorResponse>().code, "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_generate_month_requires_confirmation() {
        let server = setup_test_server().await;
        let (_, token) = sign_up(&server, "ana@example.com").await;
        create_recurring(&server, &token, &recurring_request("Netflix", dec!(39.90), 10)).await;

        let (name, value) = bearer(&token);
        let response = server
            .post("/api/v1/recurring-expenses/generate")
            .add_header(name, value)
            .json(&json!({ "year": 2024, "month": 5 }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<ErrorResponse>().code, "CONFIRMATION_REQUIRED");

        let (name, value) = bearer(&token);
        let response = server
            .post("/api/v1/recurring-expenses/generate")
            .add_header(name, value)
            .json(&json!({ "year": 2024, "month": 13, "confirm": true }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<ErrorResponse>().code, "INVALID_PERIOD");
    }

    #[tokio::test]
    async fn test_generate_month_without_templates() {
        let server = setup_test_server().await;
        let (_, token) = sign_up(&server, "ana@example.com").await;

        let (name, value) = bearer(&token);
        let response = server
            .post("/api/v1/recurring-expenses/generate")
            .add_header(name, value)
            .json(&json!({ "year": 2024, "month": 5, "confirm": true }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<ErrorResponse>().code, "NO_TEMPLATES");
    }

    #[tokio::test]
    async fn test_generate_month_is_idempotent() {
        let _guard = init_test_tracing();
        let server = setup_test_server().await;
        let (_, token) = sign_up(&server, "ana@example.com").await;
        let netflix = create_recurring(&server, &token, &recurring_request("Netflix", dec!(39.90), 10)).await;
        create_recurring(&server, &token, &recurring_request("Aluguel", dec!(1200), 5)).await;

        let generate = || {
            let (name, value) = bearer(&token);
            server
                .post("/api/v1/recurring-expenses/generate")
                .add_header(name, value)
                .json(&json!({ "year": 2024, "month": 5, "confirm": true }))
        };

        let response = generate().await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["period"], "2024-05");
        assert_eq!(body.data["created_count"], 2);
        assert_eq!(body.data["skipped_count"], 0);

        let transactions = body.data["transactions"].as_array().unwrap();
        let dates: Vec<&str> = transactions
            .iter()
            .map(|t| t["created_at"].as_str().unwrap())
            .collect();
        assert!(dates.iter().any(|d| d.starts_with("2024-05-05T12:00:00")));
        assert!(dates.iter().any(|d| d.starts_with("2024-05-10T12:00:00")));
        assert!(transactions.iter().all(|t| t["is_paid"] == false && t["kind"] == "variable"));

        let summary = &body.data["summary"];
        assert_close(&summary["expense"], 1239.90);
        assert_close(&summary["income"], 0.0);
        assert_close(&summary["pending"], 1239.90);
        assert_eq!(summary["pending_count"], 2);

        let response = generate().await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["created_count"], 0);
        assert_eq!(body.data["skipped_count"], 2);
        assert_close(&body.data["summary"]["expense"], 1239.90);

        // Generated rows outlive their template
        let (name, value) = bearer(&token);
        server
            .delete(&format!("/api/v1/recurring-expenses/{}", netflix["id"]))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::OK);

        let (name, value) = bearer(&token);
        let response = server
            .get("/api/v1/transactions")
            .add_header(name, value)
            .add_query_param("start", "2024-05-01")
            .add_query_param("end", "2024-05-31")
            .await;
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 2);
    }

    #[tokio::test]
    async fn test_monthly_summary() {
        let server = setup_test_server().await;
        let (_, token) = sign_up(&server, "ana@example.com").await;

        let dated = |name: &str, amount: Decimal, kind: TransactionKind, day: u32, paid: bool| {
            let mut request = transaction_request(name, amount, kind);
            request.created_at = Some(Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap());
            request.is_paid = Some(paid);
            request
        };
        for request in [
            dated("Salário", dec!(3000), TransactionKind::Income, 1, true),
            dated("Aluguel", dec!(1200), TransactionKind::Fixed, 5, false),
            dated("Mercado", dec!(800), TransactionKind::Variable, 12, true),
            dated("Cinema", dec!(40), TransactionKind::Variable, 20, true),
        ] {
            create_transaction(&server, &token, &request).await;
        }
        // Outside the month
        let mut june = transaction_request("Bônus", dec!(500), TransactionKind::Income);
        june.created_at = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        create_transaction(&server, &token, &june).await;

        let (name, value) = bearer(&token);
        let response = server
            .get("/api/v1/summary")
            .add_header(name, value)
            .add_query_param("year", 2024)
            .add_query_param("month", 5)
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Value> = response.json();

        assert_eq!(body.data["period"], "2024-05");
        assert_eq!(body.data["label"], "mai/24");
        let summary = &body.data["summary"];
        assert_close(&summary["income"], 3000.0);
        assert_close(&summary["expense"], 2040.0);
        assert_close(&summary["balance"], 960.0);
        assert_close(&summary["fixed"], 1200.0);
        assert_close(&summary["variable"], 840.0);
        assert_close(&summary["pending"], 1200.0);
        assert_eq!(summary["pending_count"], 1);
        assert_eq!(summary["transaction_count"], 4);

        let recent: Vec<&str> = body.data["recent"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(recent, vec!["Cinema", "Mercado", "Aluguel"]);

        let (name, value) = bearer(&token);
        server
            .get("/api/v1/summary")
            .add_header(name, value)
            .add_query_param("month", 13)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analysis_report_and_cache_invalidation() {
        let server = setup_test_server().await;
        let (_, token) = sign_up(&server, "ana@example.com").await;

        create_transaction(
            &server,
            &token,
            &transaction_request("Salário", dec!(3000), TransactionKind::Income),
        )
        .await;
        let mut food = transaction_request("Mercado", dec!(800), TransactionKind::Variable);
        food.category = Some("food".to_string());
        create_transaction(&server, &token, &food).await;

        let analysis = |months: &'static str| {
            let (name, value) = bearer(&token);
            server
                .get("/api/v1/analysis")
                .add_header(name, value)
                .add_query_param("months", months)
        };

        let response = analysis("3").await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["trend"].as_array().unwrap().len(), 3);
        assert_close(&body.data["total_expense"], 800.0);
        assert_close(&body.data["total_saved"], 2200.0);
        let categories = body.data["categories"].as_array().unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0]["key"], "food");
        assert_close(&categories[0]["percent"], 100.0);

        // A new transaction drops the cached report
        let mut rent = transaction_request("Aluguel", dec!(1200), TransactionKind::Fixed);
        rent.category = Some("housing".to_string());
        create_transaction(&server, &token, &rent).await;

        let response = analysis("3").await;
        let body: ApiResponse<Value> = response.json();
        assert_close(&body.data["total_expense"], 2000.0);
        assert_close(&body.data["total_saved"], 1000.0);
        let current = body.data["trend"].as_array().unwrap().last().unwrap().clone();
        assert_close(&current["balance"], 1000.0);
        assert_eq!(body.data["categories"][0]["key"], "housing");

        let response = analysis("12").await;
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["trend"].as_array().unwrap().len(), 12);

        let response = analysis("5").await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<ErrorResponse>().code, "INVALID_PERIOD");
    }

    #[tokio::test]
    async fn test_analysis_computed_before_a_change_is_not_served_after_it() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();
        let (user_id, token) = sign_up(&server, "ana@example.com").await;
        let user_id = user_id as i32;

        // A request takes its key, then a change lands before it stores the report
        let stale_key = state.current_analysis_key(user_id, TrendWindow::Quarter, YearMonth::current());
        create_transaction(
            &server,
            &token,
            &transaction_request("Aluguel", dec!(1200), TransactionKind::Fixed),
        )
        .await;
        state
            .cache
            .insert(
                stale_key,
                CachedData::Analysis(analyze(&[], TrendWindow::Quarter, YearMonth::current())),
            )
            .await;

        let (name, value) = bearer(&token);
        let response = server
            .get("/api/v1/analysis")
            .add_header(name, value)
            .add_query_param("months", "3")
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Value> = response.json();
        assert_close(&body.data["total_expense"], 1200.0);
    }

    #[tokio::test]
    async fn test_categories_by_kind() {
        let server = setup_test_server().await;

        let response = server.get("/api/v1/categories").await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 13);

        let response = server
            .get("/api/v1/categories")
            .add_query_param("kind", "income")
            .await;
        let body: ApiResponse<Vec<Value>> = response.json();
        let keys: Vec<&str> = body.data.iter().map(|c| c["key"].as_str().unwrap()).collect();
        assert_eq!(keys, vec!["salary", "investment", "extra", "others"]);
    }

    #[tokio::test]
    async fn test_mutations_reach_the_owners_change_feed() {
        let state = setup_test_app_state().await;
        let server = TestServer::new(create_router(state.clone())).unwrap();
        let (ana_id, ana) = sign_up(&server, "ana@example.com").await;
        let (bruno_id, bruno) = sign_up(&server, "bruno@example.com").await;

        let mut ana_feed = state.changes.subscribe(ana_id as i32);
        let mut bruno_feed = state.changes.subscribe(bruno_id as i32);

        create_transaction(
            &server,
            &bruno,
            &transaction_request("Uber", dec!(23.50), TransactionKind::Variable),
        )
        .await;
        let created = create_transaction(
            &server,
            &ana,
            &transaction_request("Padaria", dec!(12), TransactionKind::Variable),
        )
        .await;

        let item = tokio::time::timeout(EVENT_TIMEOUT, ana_feed.next())
            .await
            .unwrap()
            .unwrap();
        match item {
            FeedItem::Change(event) => {
                assert_eq!(event.user_id, ana_id as i32);
                assert_eq!(event.topic, ChangeTopic::Transactions);
                assert_eq!(event.action, ChangeAction::Insert);
                assert_eq!(event.record_id, created["id"].as_i64().map(|id| id as i32));
            }
            other => panic!("unexpected feed item {:?}", other),
        }

        let (name, value) = bearer(&ana);
        server
            .post("/api/v1/auth/sign-out")
            .add_header(name, value)
            .await
            .assert_status(StatusCode::OK);
        let item = tokio::time::timeout(EVENT_TIMEOUT, ana_feed.next())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            item,
            FeedItem::Change(ref event) if event.action == ChangeAction::SignedOut
        ));

        let item = tokio::time::timeout(EVENT_TIMEOUT, bruno_feed.next())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            item,
            FeedItem::Change(ref event) if event.user_id == bruno_id as i32
        ));
    }
}

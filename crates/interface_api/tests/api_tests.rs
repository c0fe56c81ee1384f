//! HTTP tests for the ledger API over in-memory adapters

use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::{TestResponse, TestServer};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

use interface_api::auth::{create_token, permissions};
use interface_api::config::ApiConfig;
use interface_api::create_router;
use test_utils::{LedgerEntryBuilder, TestLedger};

struct Api {
    server: TestServer,
    ledger: TestLedger,
    config: ApiConfig,
}

impl Api {
    fn new() -> Self {
        let ledger = TestLedger::new();
        let config = ApiConfig::default();
        let server = TestServer::new(create_router(ledger.service.clone(), config.clone())).unwrap();
        Self { server, ledger, config }
    }

    fn base(&self) -> String {
        format!("/api/v1/distributors/{}/ledger", self.ledger.distributor.as_uuid())
    }

    fn bearer(&self, roles: &[&str]) -> HeaderValue {
        let token = create_token(
            "admin-1",
            roles.iter().map(|r| r.to_string()).collect(),
            &self.config.jwt_secret,
            self.config.jwt_expiration_secs,
        )
        .unwrap();
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
    }

    fn admin(&self) -> HeaderValue {
        self.bearer(&["admin"])
    }

    async fn get(&self, path: &str, auth: HeaderValue) -> TestResponse {
        self.server
            .get(&format!("{}{}", self.base(), path))
            .add_header(AUTHORIZATION, auth)
            .await
    }

    async fn post(&self, path: &str, auth: HeaderValue, body: Value) -> TestResponse {
        self.server
            .post(&format!("{}{}", self.base(), path))
            .add_header(AUTHORIZATION, auth)
            .json(&body)
            .await
    }

    fn revert_body(&self, quantity: u32) -> Value {
        json!({
            "product_id": self.ledger.product.id.as_uuid(),
            "variant_id": self.ledger.variant.id.as_uuid(),
            "product_name": self.ledger.product.name,
            "variant_name": self.ledger.variant.name,
            "quantity": quantity,
        })
    }
}

fn amount(money: &Value) -> Decimal {
    money["amount"].as_str().unwrap().parse().unwrap()
}

fn transfer_body(amount: &str) -> Value {
    json!({
        "amount": amount,
        "description": "Transferencia de 2 x Pantalón Sendero (Negro/M)",
        "source_id": Uuid::new_v4(),
    })
}

mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_is_public() {
        let api = Api::new();
        let response = api.server.get("/health").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["status"], "healthy");

        let ready = api.server.get("/health/ready").await;
        assert_eq!(ready.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let api = Api::new();
        let response = api.server.get(&api.base()).await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["error"], "unauthorized");
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_rejected() {
        let api = Api::new();
        let token = create_token("admin-1", vec!["admin".to_string()], "other-secret", 60).unwrap();
        let response = api
            .get("", HeaderValue::from_str(&format!("Bearer {}", token)).unwrap())
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_read_only_token_cannot_write() {
        let api = Api::new();
        let response = api
            .post("/debits", api.bearer(&[permissions::LEDGER_READ]), transfer_body("25.00"))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        assert!(api.ledger.ledger.is_empty().await);
    }

    #[tokio::test]
    async fn test_writer_cannot_revert() {
        let api = Api::new();
        let response = api
            .post("/reverts", api.bearer(&[permissions::LEDGER_WRITE]), api.revert_body(1))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(api.ledger.inventory.calls(), 0);
    }
}

mod ledger_tests {
    use super::*;

    #[tokio::test]
    async fn test_register_debit_and_list() {
        let api = Api::new();
        let auth = api.bearer(&[permissions::LEDGER_READ, permissions::LEDGER_WRITE]);

        let created = api.post("/debits", auth.clone(), transfer_body("25.00")).await;
        assert_eq!(created.status_code(), StatusCode::CREATED);
        let debit = created.json::<Value>();
        assert_eq!(debit["entry_type"], "debit");
        assert_eq!(debit["created_by"], "admin-1");
        assert_eq!(debit["tracking"]["payment_status"], "pending");

        let listed = api.get("", auth).await;
        assert_eq!(listed.status_code(), StatusCode::OK);
        let body = listed.json::<Value>();
        assert_eq!(body["total"], 1);
        assert_eq!(body["entries"][0]["id"], debit["id"]);
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_unprocessable() {
        let api = Api::new();
        let response = api.post("/debits", api.admin(), transfer_body("0")).await;
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = response.json::<Value>();
        assert_eq!(body["error"], "validation_error");
        assert!(body["details"][0].as_str().unwrap().starts_with("amount"));
    }

    #[tokio::test]
    async fn test_pay_debit_partially() {
        let api = Api::new();
        let debit = api.ledger.transfer(2, dec!(25.00)).await;

        let response = api
            .post(
                &format!("/debits/{}/pay", debit.id.as_uuid()),
                api.admin(),
                json!({ "amount": "10.00", "payment_method": "cash", "notes": "abono" }),
            )
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let receipt = response.json::<Value>();
        assert_eq!(receipt["debit"]["tracking"]["payment_status"], "partial");
        assert_eq!(amount(&receipt["debit"]["tracking"]["remaining_amount"]), dec!(15.00));
        assert_eq!(receipt["credit"]["source_type"], "manual_payment");
        assert_eq!(receipt["credit"]["settles_debit_id"], receipt["debit"]["id"]);
    }

    #[tokio::test]
    async fn test_overpaying_debit_is_rejected() {
        let api = Api::new();
        let debit = api.ledger.transfer(2, dec!(25.00)).await;

        let response = api
            .post(
                &format!("/debits/{}/pay", debit.id.as_uuid()),
                api.admin(),
                json!({ "amount": "30.00", "payment_method": "cash" }),
            )
            .await;
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api.ledger.ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_paying_unknown_debit_is_not_found() {
        let api = Api::new();
        let response = api
            .post(
                &format!("/debits/{}/pay", Uuid::new_v4()),
                api.admin(),
                json!({ "amount": "5.00", "payment_method": "cash" }),
            )
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_payment_on_account() {
        let api = Api::new();
        let response = api
            .post(
                "/payments",
                api.admin(),
                json!({ "amount": "40.00", "payment_method": "bank_transfer", "bank_reference": "REF-991" }),
            )
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        let body = response.json::<Value>();
        assert_eq!(body["kind"], "on_account");
        assert_eq!(body["credit"]["entry_type"], "credit");
        assert_eq!(body["credit"]["payment_details"]["bank_reference"], "REF-991");
    }

    #[tokio::test]
    async fn test_summary_reflects_payments_and_returns() {
        let api = Api::new();
        let debit = api.ledger.transfer(2, dec!(28.75)).await;
        api.ledger
            .seed(LedgerEntryBuilder::payment().amount(dec!(10.00)).settles(&debit))
            .await;

        let response = api.get("/summary", api.bearer(&[permissions::LEDGER_READ])).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body = response.json::<Value>();
        assert_eq!(amount(&body["summary"]["total_debit"]), dec!(28.75));
        assert_eq!(amount(&body["summary"]["total_credit"]), dec!(10.00));
        assert_eq!(amount(&body["summary"]["balance"]), dec!(18.75));
        assert_eq!(body["summary"]["total_transactions"], 2);
        assert_eq!(body["debits"].as_array().unwrap().len(), 1);
    }
}

mod revert_tests {
    use super::*;

    #[tokio::test]
    async fn test_check_revert_quotes_without_moving_stock() {
        let api = Api::new();
        let debit = api.ledger.transfer(2, dec!(28.75)).await;

        let response = api.post("/reverts/check", api.admin(), api.revert_body(2)).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let quote = response.json::<Value>();
        assert_eq!(amount(&quote["return_value"]), dec!(28.75));
        assert_eq!(quote["settling_debit_id"], json!(debit.id));
        assert_eq!(api.ledger.inventory.calls(), 0);
    }

    #[tokio::test]
    async fn test_revert_without_debt_is_conflict() {
        let api = Api::new();
        let response = api.post("/reverts", api.admin(), api.revert_body(1)).await;
        assert_eq!(response.status_code(), StatusCode::CONFLICT);
        let body = response.json::<Value>();
        assert_eq!(body["error"], "insufficient_balance");
        assert_eq!(api.ledger.inventory.calls(), 0);
    }

    #[tokio::test]
    async fn test_completed_revert() {
        let api = Api::new();
        let debit = api.ledger.transfer(2, dec!(28.75)).await;

        let response = api.post("/reverts", api.admin(), api.revert_body(2)).await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        let body = response.json::<Value>();
        assert_eq!(body["status"], "completed");
        let credits = body["credits"].as_array().unwrap();
        assert_eq!(credits.len(), 1);
        assert_eq!(credits[0]["source_type"], "stock_return");
        assert_eq!(credits[0]["settles_debit_id"], json!(debit.id));
        assert_eq!(amount(&credits[0]["amount"]), dec!(28.75));
        assert!(body.get("warning").is_none());
        assert_eq!(api.ledger.inventory.returned_units(api.ledger.variant.id).await, 2);
    }

    #[tokio::test]
    async fn test_revert_across_debits_books_one_credit_each() {
        let api = Api::new();
        let first = api.ledger.transfer(1, dec!(10.00)).await;
        let second = api.ledger.transfer(1, dec!(10.00)).await;

        let quote = api.post("/reverts/check", api.admin(), api.revert_body(1)).await.json::<Value>();
        assert_eq!(quote["allocations"].as_array().unwrap().len(), 2);
        assert!(quote["settling_debit_id"].is_null());

        let response = api.post("/reverts", api.admin(), api.revert_body(1)).await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        let credits = response.json::<Value>()["credits"].as_array().unwrap().clone();
        assert_eq!(credits[0]["settles_debit_id"], json!(first.id));
        assert_eq!(amount(&credits[0]["amount"]), dec!(10.00));
        assert_eq!(credits[1]["settles_debit_id"], json!(second.id));
        assert_eq!(amount(&credits[1]["amount"]), dec!(4.38));

        let summary = api.get("/summary", api.bearer(&[permissions::LEDGER_READ])).await.json::<Value>();
        assert_eq!(amount(&summary["summary"]["balance"]), dec!(5.62));
        assert_eq!(amount(&summary["summary"]["pending_amount"]), dec!(5.62));
    }

    #[tokio::test]
    async fn test_ledger_outage_after_stock_moved_is_degraded() {
        let api = Api::new();
        api.ledger.transfer(2, dec!(28.75)).await;
        api.ledger.ledger.set_fail_writes(true);

        let response = api.post("/reverts", api.admin(), api.revert_body(2)).await;
        assert_eq!(response.status_code(), StatusCode::ACCEPTED);
        let body = response.json::<Value>();
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["stock_returned"], 2);
        assert!(body["booked"].as_array().unwrap().is_empty());
        assert_eq!(body["pending_credits"].as_array().unwrap().len(), 1);
        assert!(body["warning"].as_str().unwrap().contains("not recorded"));
        assert_eq!(api.ledger.ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_inventory_outage_is_bad_gateway() {
        let api = Api::new();
        api.ledger.transfer(2, dec!(28.75)).await;
        api.ledger.inventory.set_failing(true);

        let response = api.post("/reverts", api.admin(), api.revert_body(2)).await;
        assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(api.ledger.ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_zero_quantity_is_unprocessable() {
        let api = Api::new();
        let response = api.post("/reverts", api.admin(), api.revert_body(0)).await;
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}

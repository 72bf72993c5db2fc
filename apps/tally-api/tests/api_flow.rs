//! End-to-end HTTP tests against an in-memory database.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use tally_api::auth::JwtManager;
use tally_api::{build_router, ApiConfig, AppState};
use tally_core::{new_id, Actor, PaymentMethod, Product, ProductStatus};
use tally_db::{Database, DbConfig};

struct TestApp {
    router: Router,
    db: Database,
    jwt: JwtManager,
}

impl TestApp {
    async fn new() -> Self {
        let config = ApiConfig::from_lookup(|_| None).unwrap();
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        for (id, name) in [("cash", "Cash"), ("mpesa", "M-Pesa"), ("credit", "Credit")] {
            db.payment_methods()
                .insert(&PaymentMethod {
                    id: id.to_string(),
                    name: name.to_string(),
                    description: None,
                    is_active: true,
                })
                .await
                .unwrap();
        }

        TestApp {
            router: build_router(AppState::new(db.clone(), &config)),
            jwt: JwtManager::new(&config.jwt_secret),
            db,
        }
    }

    async fn product(&self, stock: i64, price_cents: i64) -> Product {
        let now = Utc::now();
        self.db
            .products()
            .insert(&Product {
                id: new_id(),
                name: "Cooking Oil 1L".to_string(),
                selling_price_cents: price_cents,
                buying_price_cents: Some(price_cents / 2),
                current_stock: stock,
                reorder_level: 5,
                status: ProductStatus::Active,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap()
    }

    fn token(&self, actor: &Actor) -> String {
        self.jwt.generate_token(actor, 3600).unwrap()
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.call(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_missing_or_bad_token_is_unauthorized() {
    let app = TestApp::new().await;

    let (status, body) = app.call(Method::GET, "/api/v1/till/status", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let (status, _) = app
        .call(Method::GET, "/api/v1/till/status", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sale_without_open_till_is_locked() {
    let app = TestApp::new().await;
    let product = app.product(10, 10_000).await;
    let token = app.token(&Actor::cashier("cashier-1", "Ann"));

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/sales",
            Some(&token),
            Some(json!({
                "product_id": product.id,
                "quantity": 1,
                "unit_price": 10_000,
                "payment_method_id": "cash",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "TILL_LOCKED");
}

#[tokio::test]
async fn test_full_shift_flow() {
    let app = TestApp::new().await;
    let product = app.product(10, 10_000).await;
    let ann = app.token(&Actor::cashier("cashier-1", "Ann"));
    let admin = app.token(&Actor::administrator("admin-1", "Boss"));

    // Open
    let (status, shift) = app
        .call(
            Method::POST,
            "/api/v1/till/open",
            Some(&ann),
            Some(json!({ "shift_type": "day", "opening_cash_float": 500_000 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(shift["status"], "open");
    let shift_id = shift["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/till/open",
            Some(&ann),
            Some(json!({ "shift_type": "night", "opening_cash_float": 500_000 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_OPEN");

    let (_, till) = app.call(Method::GET, "/api/v1/till/status", Some(&ann), None).await;
    assert_eq!(till["is_open"], true);
    assert_eq!(till["till_id"], shift_id.as_str());

    // Simple sale: 3 x 100.00
    let (status, sale) = app
        .call(
            Method::POST,
            "/api/v1/sales",
            Some(&ann),
            Some(json!({
                "product_id": product.id,
                "quantity": 3,
                "unit_price": 10_000,
                "payment_method_id": "cash",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sale["total_amount_cents"], 30_000);

    // Oversell
    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/sales",
            Some(&ann),
            Some(json!({
                "product_id": product.id,
                "quantity": 8,
                "unit_price": 10_000,
                "payment_method_id": "cash",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");

    // Split sale with a customer leaves a debt
    let (status, receipt) = app
        .call(
            Method::POST,
            "/api/v1/sales/multi-payment",
            Some(&ann),
            Some(json!({
                "product_id": product.id,
                "quantity": 1,
                "unit_price": 10_000,
                "total_amount": 10_000,
                "customer_name": "Jane",
                "payments": [
                    { "payment_method_id": "cash", "amount": 6_000 },
                    { "payment_method_id": "mpesa", "amount": 3_000, "reference_number": "QK12" },
                ],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["debt"]["balance_cents"], 1_000);
    assert_eq!(receipt["debt"]["status"], "pending");
    let split_id = receipt["sale"]["id"].as_str().unwrap().to_string();

    let (status, payments) = app
        .call(
            Method::GET,
            &format!("/api/v1/sales/{}/payments", split_id),
            Some(&ann),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payments.as_array().unwrap().len(), 2);

    let stored = app.db.products().get_by_id(&product.id).await.unwrap().unwrap();
    assert_eq!(stored.current_stock, 6);

    // Close
    let (status, closed) = app
        .call(
            Method::POST,
            "/api/v1/till/close",
            Some(&ann),
            Some(json!({ "closing_cash_float": 536_000 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["status"], "closed");

    // Expected: cash 300.00 + 60.00, mpesa 30.00
    let (status, counts) = app
        .call(Method::GET, "/api/v1/till/system-counts", Some(&ann), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(counts["till_shift_id"], shift_id.as_str());
    let methods = counts["payment_methods"].as_array().unwrap();
    let cash = methods
        .iter()
        .find(|m| m["payment_method_id"] == "cash")
        .unwrap();
    assert_eq!(cash["system_count_cents"], 36_000);

    // Reconcile 200.00 short on cash
    let (status, outcome) = app
        .call(
            Method::POST,
            "/api/v1/till/reconcile",
            Some(&ann),
            Some(json!({ "physical_counts": { "cash": 16_000, "mpesa": 3_000 } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["total_variance_cents"], -20_000);
    assert_eq!(outcome["variance_type"], "shortage");
    assert_eq!(outcome["alert_raised"], true);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/till/reconcile",
            Some(&ann),
            Some(json!({ "physical_counts": { "cash": 16_000 } })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_RECONCILED");

    // Report
    let (status, report) = app
        .call(Method::GET, "/api/v1/till/variances?limit=10", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["count"], 1);
    assert_eq!(report["total_shortage_cents"], 20_000);
    assert_eq!(report["data"][0]["cashier_name"], "Ann");

    let (status, summary) = app
        .call(
            Method::GET,
            &format!("/api/v1/till/shifts/{}/summary", shift_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_transactions"], 2);
    assert_eq!(summary["variance"]["variance_type"], "shortage");
}

#[tokio::test]
async fn test_void_and_delete_are_admin_only() {
    let app = TestApp::new().await;
    let product = app.product(5, 2_000).await;
    let ann = app.token(&Actor::cashier("cashier-1", "Ann"));
    let admin = app.token(&Actor::administrator("admin-1", "Boss"));

    app.call(
        Method::POST,
        "/api/v1/till/open",
        Some(&ann),
        Some(json!({ "shift_type": "night", "opening_cash_float": 0 })),
    )
    .await;

    let (_, sale) = app
        .call(
            Method::POST,
            "/api/v1/sales",
            Some(&ann),
            Some(json!({
                "product_id": product.id,
                "quantity": 2,
                "unit_price": 2_000,
                "payment_method_id": "cash",
            })),
        )
        .await;
    let sale_id = sale["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/v1/sales/{}/void", sale_id),
            Some(&ann),
            Some(json!({ "reason": "Customer changed mind" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, voided) = app
        .call(
            Method::POST,
            &format!("/api/v1/sales/{}/void", sale_id),
            Some(&admin),
            Some(json!({ "reason": "Customer changed mind" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(voided["voided"], true);

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/sales/{}/void", sale_id),
            Some(&admin),
            Some(json!({ "reason": "again" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_VOIDED");

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/v1/sales/{}", sale_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let stored = app.db.products().get_by_id(&product.id).await.unwrap().unwrap();
    assert_eq!(stored.current_stock, 5);

    let (status, body) = app
        .call(Method::DELETE, &format!("/api/v1/sales/{}", sale_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_payment_methods_listed() {
    let app = TestApp::new().await;
    let token = app.token(&Actor::cashier("cashier-1", "Ann"));

    let (status, body) = app
        .call(Method::GET, "/api/v1/payment-methods", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Cash", "Credit", "M-Pesa"]);
}

#[tokio::test]
async fn test_sales_history_and_detail() {
    let app = TestApp::new().await;
    let product = app.product(20, 1_500).await;
    let ann = app.token(&Actor::cashier("cashier-1", "Ann"));
    let bob = app.token(&Actor::cashier("cashier-2", "Bob"));
    let admin = app.token(&Actor::administrator("admin-1", "Boss"));

    app.call(
        Method::POST,
        "/api/v1/till/open",
        Some(&ann),
        Some(json!({ "shift_type": "day", "opening_cash_float": 0 })),
    )
    .await;

    let mut sale_ids = Vec::new();
    for (token, method) in [(&ann, "cash"), (&ann, "mpesa"), (&bob, "cash")] {
        let (status, sale) = app
            .call(
                Method::POST,
                "/api/v1/sales",
                Some(token),
                Some(json!({
                    "product_id": product.id,
                    "quantity": 1,
                    "unit_price": 1_500,
                    "payment_method_id": method,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        sale_ids.push(sale["id"].as_str().unwrap().to_string());
    }

    let (status, page) = app.call(Method::GET, "/api/v1/sales", Some(&ann), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 2);

    let (_, page) = app
        .call(Method::GET, "/api/v1/sales?payment_method_id=mpesa", Some(&admin), None)
        .await;
    assert_eq!(page["count"], 1);
    assert_eq!(page["data"][0]["id"], sale_ids[1].as_str());

    let (_, page) = app
        .call(Method::GET, "/api/v1/sales?cashier_id=cashier-2&limit=1", Some(&admin), None)
        .await;
    assert_eq!(page["count"], 1);
    assert_eq!(page["data"][0]["created_by_id"], "cashier-2");

    let (status, body) = app
        .call(
            Method::GET,
            "/api/v1/sales?start_date=2026-02-01&end_date=2026-01-01",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, detail) = app
        .call(Method::GET, &format!("/api/v1/sales/{}", sale_ids[0]), Some(&ann), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["sale"]["id"], sale_ids[0].as_str());
    assert_eq!(detail["payments"], json!([]));
    assert_eq!(detail["debt"], Value::Null);

    let (status, _) = app
        .call(Method::GET, &format!("/api/v1/sales/{}", sale_ids[0]), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Method::GET, "/api/v1/sales/unknown-sale", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

//! Flows that need Postgres. Each test gets a fresh database with the
//! migrations applied; run with `DATABASE_URL` set and `--ignored`.

use std::collections::HashMap;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use readymix_storefront::config::AppConfig;
use readymix_storefront::db::{self, RepositoryError};
use readymix_storefront::domain::aggregates::OrderStatus;
use readymix_storefront::domain::value_objects::Volume;
use readymix_storefront::services::events::EventPublisher;
use readymix_storefront::services::payments::signature_header;
use readymix_storefront::{router, AppState};

const JWT_SECRET: &str = "db-flow-secret";
const WEBHOOK_SECRET: &str = "whsec_db_flows";
const INTENT_ID: &str = "pi_flow_1";

struct Shop {
    app: Router,
    pool: PgPool,
    // Keeps the payment provider mock alive for the test.
    _payments: MockServer,
    staff: String,
}

async fn shop(pool: PgPool) -> Shop {
    let payments = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payment_intents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": INTENT_ID,
            "client_secret": "pi_flow_1_secret_abc",
            "status": "requires_payment_method"
        })))
        .mount(&payments)
        .await;

    let api_base = payments.uri();
    let vars: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "postgres://unused"),
        ("AUTH_JWT_SECRET", JWT_SECRET),
        ("STORE_DELIVERY_FEE", "150"),
        ("STRIPE_SECRET_KEY", "sk_test_flows"),
        ("STRIPE_WEBHOOK_SECRET", WEBHOOK_SECRET),
        ("STRIPE_API_BASE", api_base.as_str()),
    ]);
    let config = AppConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
    let app = router(AppState::new(pool.clone(), config, EventPublisher::disabled()).unwrap());
    Shop { app, pool, _payments: payments, staff: token(Uuid::now_v7(), "staff") }
}

fn token(sub: Uuid, role: &str) -> String {
    let claims = json!({
        "sub": sub,
        "email": "site-office@builder.test",
        "role": role,
        "exp": chrono::Utc::now().timestamp() + 600,
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes())).unwrap()
}

impl Shop {
    async fn call(&self, method: &str, uri: &str, bearer: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri).header(header::AUTHORIZATION, format!("Bearer {bearer}"));
        let request = match body {
            Some(body) => builder.header(header::CONTENT_TYPE, "application/json").body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        read(self.app.clone().oneshot(request).await.unwrap()).await
    }

    async fn create_product(&self, stock: &str) -> Uuid {
        let body = json!({
            "name": "Ready Mix N20",
            "grade": "N20",
            "prices": { "normal": "220", "pump": "250", "tremie": "265" },
            "stock_m3": stock,
            "publish": true
        });
        let (status, product) = self.call("POST", "/api/v1/admin/products", &self.staff, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{product}");
        product["id"].as_str().unwrap().parse().unwrap()
    }

    async fn add_to_cart(&self, customer: &str, product_id: Uuid, quantity: &str) -> (StatusCode, Value) {
        let body = json!({ "product_id": product_id, "delivery_method": "pump", "quantity": quantity });
        self.call("POST", "/api/v1/cart/items", customer, Some(body)).await
    }

    /// Puts 3 m³ of pumped N20 in the cart and checks out. Returns the order id.
    async fn place_order(&self, customer: &str, product_id: Uuid) -> Uuid {
        let (status, _) = self.add_to_cart(customer, product_id, "3").await;
        assert_eq!(status, StatusCode::CREATED);
        let address = json!({
            "recipient": "Site Office",
            "phone": "0123456789",
            "line1": "Lot 5, Jalan Industri 3",
            "city": "Shah Alam",
            "postcode": "40000"
        });
        let (status, address) = self.call("POST", "/api/v1/addresses", customer, Some(address)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, order) = self.call("POST", "/api/v1/checkout", customer, Some(json!({ "address_id": address["id"] }))).await;
        assert_eq!(status, StatusCode::CREATED, "{order}");
        assert_eq!(order["client_secret"], "pi_flow_1_secret_abc");
        order["order"]["id"].as_str().unwrap().parse().unwrap()
    }

    async fn payment_webhook(&self, event_id: &str, event_type: &str) -> Value {
        let payload = json!({ "id": event_id, "type": event_type, "data": { "object": { "id": INTENT_ID } } }).to_string();
        let signature = signature_header(payload.as_bytes(), &SecretString::from(WEBHOOK_SECRET), chrono::Utc::now().timestamp()).unwrap();
        let request = Request::post("/api/v1/webhooks/payments")
            .header("stripe-signature", signature)
            .body(Body::from(payload))
            .unwrap();
        let (status, body) = read(self.app.clone().oneshot(request).await.unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    async fn stock(&self, product_id: Uuid) -> Decimal {
        db::products::get(&self.pool, product_id).await.unwrap().stock_m3
    }
}

async fn read(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

#[sqlx::test]
#[ignore = "requires a Postgres database (DATABASE_URL)"]
async fn checkout_stores_order_and_clears_cart(pool: PgPool) {
    let shop = shop(pool).await;
    let alice = token(Uuid::now_v7(), "customer");
    let product_id = shop.create_product("10").await;

    let order_id = shop.place_order(&alice, product_id).await;

    let order = db::orders::get(&shop.pool, order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_intent_id.as_deref(), Some(INTENT_ID));
    // 3 m³ at the pump price plus the flat delivery fee.
    assert_eq!(order.total, Decimal::new(900, 0));
    let lines = db::orders::lines(&shop.pool, order_id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].unit_price, Decimal::new(250, 0));

    let (status, cart) = shop.call("GET", "/api/v1/cart", &alice, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["lines"], json!([]));
    // Stock is only taken once payment succeeds.
    assert_eq!(shop.stock(product_id).await, Decimal::new(10, 0));
}

#[sqlx::test]
#[ignore = "requires a Postgres database (DATABASE_URL)"]
async fn payment_success_takes_stock_once(pool: PgPool) {
    let shop = shop(pool).await;
    let alice = token(Uuid::now_v7(), "customer");
    let product_id = shop.create_product("10").await;
    let order_id = shop.place_order(&alice, product_id).await;

    let first = shop.payment_webhook("evt_paid_1", "payment_intent.succeeded").await;
    assert_eq!(first, json!({ "received": true, "applied": true }));
    let order = db::orders::get(&shop.pool, order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    assert!(order.paid_at.is_some());
    assert_eq!(shop.stock(product_id).await, Decimal::new(7, 0));

    let retry = shop.payment_webhook("evt_paid_1", "payment_intent.succeeded").await;
    assert_eq!(retry, json!({ "received": true, "applied": false }));
    assert_eq!(shop.stock(product_id).await, Decimal::new(7, 0));
}

#[sqlx::test]
#[ignore = "requires a Postgres database (DATABASE_URL)"]
async fn paid_order_with_stock_shortfall_stays_paid(pool: PgPool) {
    let shop = shop(pool).await;
    let alice = token(Uuid::now_v7(), "customer");
    let product_id = shop.create_product("10").await;
    let order_id = shop.place_order(&alice, product_id).await;
    db::products::set_stock(&shop.pool, product_id, Decimal::ONE).await.unwrap();

    let body = shop.payment_webhook("evt_paid_2", "payment_intent.succeeded").await;
    assert_eq!(body["applied"], true);
    assert_eq!(db::orders::get(&shop.pool, order_id).await.unwrap().status, OrderStatus::Paid);
    assert_eq!(shop.stock(product_id).await, Decimal::ONE);
}

#[sqlx::test]
#[ignore = "requires a Postgres database (DATABASE_URL)"]
async fn orders_are_private_to_their_customer(pool: PgPool) {
    let shop = shop(pool).await;
    let alice = token(Uuid::now_v7(), "customer");
    let bob = token(Uuid::now_v7(), "customer");
    let product_id = shop.create_product("10").await;
    let order_id = shop.place_order(&alice, product_id).await;

    let (status, _) = shop.call("GET", &format!("/api/v1/orders/{order_id}"), &bob, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = shop.call("POST", &format!("/api/v1/orders/{order_id}/cancel"), &bob, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, listed) = shop.call("GET", "/api/v1/orders", &bob, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], 0);

    let (status, order) = shop.call("GET", &format!("/api/v1/orders/{order_id}"), &alice, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["lines"].as_array().unwrap().len(), 1);
}

#[sqlx::test]
#[ignore = "requires a Postgres database (DATABASE_URL)"]
async fn cancelled_unpaid_order_cannot_be_refunded(pool: PgPool) {
    let shop = shop(pool).await;
    let alice = token(Uuid::now_v7(), "customer");
    let product_id = shop.create_product("10").await;
    let order_id = shop.place_order(&alice, product_id).await;

    let (status, order) = shop.call("POST", &format!("/api/v1/orders/{order_id}/cancel"), &alice, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "cancelled");

    let uri = format!("/api/v1/admin/orders/{order_id}/status");
    let (status, _) = shop.call("PUT", &uri, &shop.staff, Some(json!({ "status": "refunded" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(db::orders::get(&shop.pool, order_id).await.unwrap().status, OrderStatus::Cancelled);
}

#[sqlx::test]
#[ignore = "requires a Postgres database (DATABASE_URL)"]
async fn stale_status_write_is_rejected(pool: PgPool) {
    let shop = shop(pool).await;
    let alice = token(Uuid::now_v7(), "customer");
    let product_id = shop.create_product("10").await;
    let order_id = shop.place_order(&alice, product_id).await;

    // A customer cancel reads the order, then payment lands before it writes.
    let mut stale = db::orders::get(&shop.pool, order_id).await.unwrap();
    shop.payment_webhook("evt_paid_3", "payment_intent.succeeded").await;
    assert!(stale.cancel_by_customer().unwrap());

    let err = db::orders::update_status(&shop.pool, &stale, OrderStatus::Pending).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));
    assert_eq!(db::orders::get(&shop.pool, order_id).await.unwrap().status, OrderStatus::Paid);
}

#[sqlx::test]
#[ignore = "requires a Postgres database (DATABASE_URL)"]
async fn adding_the_same_line_merges_quantity(pool: PgPool) {
    let shop = shop(pool).await;
    let alice = token(Uuid::now_v7(), "customer");
    let product_id = shop.create_product("10").await;

    shop.add_to_cart(&alice, product_id, "2").await;
    let (status, cart) = shop.add_to_cart(&alice, product_id, "1.5").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(cart["lines"].as_array().unwrap().len(), 1);

    let stored: Vec<(Decimal,)> = sqlx::query_as("SELECT quantity_m3 FROM cart_items").fetch_all(&shop.pool).await.unwrap();
    assert_eq!(stored, vec![(Decimal::new(35, 1),)]);

    let (status, _) = shop.add_to_cart(&alice, product_id, "7").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test]
#[ignore = "requires a Postgres database (DATABASE_URL)"]
async fn product_edit_without_stock_keeps_stock(pool: PgPool) {
    let shop = shop(pool).await;
    let product_id = shop.create_product("10").await;
    db::products::decrement_stock(&shop.pool, product_id, Volume::new(Decimal::new(4, 0)).unwrap()).await.unwrap();

    let edit = json!({
        "name": "Ready Mix N20 Structural",
        "grade": "N20",
        "prices": { "normal": "225", "pump": "255", "tremie": "270" }
    });
    let (status, _) = shop.call("PUT", &format!("/api/v1/admin/products/{product_id}"), &shop.staff, Some(edit)).await;
    assert_eq!(status, StatusCode::OK);
    let product = db::products::get(&shop.pool, product_id).await.unwrap();
    assert_eq!(product.name, "Ready Mix N20 Structural");
    assert_eq!(product.stock_m3, Decimal::new(6, 0));
}

#[sqlx::test]
#[ignore = "requires a Postgres database (DATABASE_URL)"]
async fn banned_customer_is_suspended_until_lifted(pool: PgPool) {
    let shop = shop(pool).await;
    let customer_id = Uuid::now_v7();
    let alice = token(customer_id, "customer");

    let uri = format!("/api/v1/admin/customers/{customer_id}/ban");
    let (status, _) = shop.call("POST", &uri, &shop.staff, Some(json!({ "reason": "repeated chargebacks" }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = shop.call("GET", "/api/v1/cart", &alice, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "account suspended");

    let (status, _) = shop.call("DELETE", &uri, &shop.staff, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = shop.call("GET", "/api/v1/cart", &alice, None).await;
    assert_eq!(status, StatusCode::OK);
}

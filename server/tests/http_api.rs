//! HTTP-level API tests
//!
//! Drives the full router (auth middleware, admin gate, webhook endpoint)
//! against an in-memory database.

mod common;

use axum::Router;
use axum::body::Body;
use hmac::{Hmac, Mac};
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use sha2::Sha256;
use tower::ServiceExt;

use common::{seed_category, seed_product, seed_user, test_pool};
use lusac_server::auth::create_token;
use lusac_server::payos::PayOsClient;
use lusac_server::{AppState, api, db};
use shared::models::{CreateOrderItem, OrderStatus, ProductStatus, ProductUpdate, UserRole};

const JWT_SECRET: &str = "integration-test-secret-32-chars!!";
const CHECKSUM_KEY: &str = "integration-test-checksum-key";

fn build_app_with_gateway(pool: sqlx::SqlitePool, api_base: &str) -> Router {
    let state = AppState {
        pool,
        jwt_secret: JWT_SECRET.to_string(),
        payos: PayOsClient::new(
            "test-client-id".into(),
            "test-api-key".into(),
            CHECKSUM_KEY.into(),
            api_base.to_string(),
        ),
        web_url: "http://localhost:3000".into(),
    };
    api::create_router(state)
}

fn build_app(pool: sqlx::SqlitePool) -> Router {
    // Gateway base never reached by tests that use this constructor
    build_app_with_gateway(pool, "http://127.0.0.1:9")
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Signed webhook payload the way the gateway builds it: HMAC-SHA256 over
/// the alphabetically sorted key=value pairs of `data`
fn webhook_payload(order_code: i64, code: &str) -> String {
    let canonical = format!("amount=10000&code={code}&desc=ok&orderCode={order_code}");
    let mut mac = Hmac::<Sha256>::new_from_slice(CHECKSUM_KEY.as_bytes()).unwrap();
    mac.update(canonical.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    serde_json::json!({
        "code": code,
        "desc": "ok",
        "success": code == "00",
        "data": {
            "amount": 10000,
            "code": code,
            "desc": "ok",
            "orderCode": order_code,
        },
        "signature": signature,
    })
    .to_string()
}

fn webhook_request(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/orders/payment/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn register_login_me_flow() {
    let pool = test_pool().await;
    let app = build_app(pool);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            serde_json::json!({
                "email": "An@Example.com",
                "password": "password123",
                "name": "An",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert!(body["token"].as_str().is_some());
    // Email is normalized on the way in
    assert_eq!(body["user"]["email"], "an@example.com");
    assert_eq!(body["user"]["role"], "USER");

    // Duplicate registration is a conflict
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            serde_json::json!({
                "email": "an@example.com",
                "password": "password123",
                "name": "An",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            serde_json::json!({ "email": "an@example.com", "password": "password123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let token = response_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(authed_request("GET", "/api/auth/me", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["email"], "an@example.com");

    // Wrong password: unified invalid-credentials response
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            serde_json::json!({ "email": "an@example.com", "password": "wrong-password" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let pool = test_pool().await;
    let app = build_app(pool);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/orders/my")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(authed_request("GET", "/api/orders/my", "not-a-jwt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_reject_non_admins() {
    let pool = test_pool().await;
    let user = seed_user(&pool, "user@example.com", UserRole::User).await;
    let admin = seed_user(&pool, "admin@example.com", UserRole::Admin).await;
    let app = build_app(pool);

    let user_token = create_token(&user.id, &user.email, user.role, JWT_SECRET).unwrap();
    let admin_token = create_token(&admin.id, &admin.email, admin.role, JWT_SECRET).unwrap();

    let response = app
        .clone()
        .oneshot(authed_request("GET", "/api/orders", &user_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(authed_request("GET", "/api/orders", &admin_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn public_listing_shows_only_active_products() {
    let pool = test_pool().await;
    let category = seed_category(&pool, "Vases").await;
    let active = seed_product(&pool, &category.id, "Celadon Vase", 10000.0, 5).await;
    let hidden = seed_product(&pool, &category.id, "Hidden Vase", 10000.0, 5).await;
    db::products::update(
        &pool,
        &hidden.id,
        ProductUpdate {
            status: Some(ProductStatus::Hide),
            name: None,
            description: None,
            price: None,
            quantity: None,
            image_url: None,
            thumbnail_image: None,
            gallery_images: None,
            glb_url: None,
            category_id: None,
        },
    )
    .await
    .unwrap();
    let app = build_app(pool);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/products/public")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], active.id.as_str());
    assert_eq!(body["meta"]["total"], 1);

    // Hidden products 404 on the public detail route
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/products/public/{}", hidden.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn users_cannot_read_each_others_orders() {
    let pool = test_pool().await;
    let owner = seed_user(&pool, "owner@example.com", UserRole::User).await;
    let other = seed_user(&pool, "other@example.com", UserRole::User).await;
    let admin = seed_user(&pool, "admin@example.com", UserRole::Admin).await;
    let category = seed_category(&pool, "Vases").await;
    let product = seed_product(&pool, &category.id, "Celadon Vase", 10000.0, 5).await;

    let order = db::orders::create_order(
        &pool,
        &owner.id,
        &[CreateOrderItem {
            product_id: product.id.clone(),
            quantity: 1,
        }],
    )
    .await
    .unwrap();
    let app = build_app(pool);

    let owner_token = create_token(&owner.id, &owner.email, owner.role, JWT_SECRET).unwrap();
    let other_token = create_token(&other.id, &other.email, other.role, JWT_SECRET).unwrap();
    let admin_token = create_token(&admin.id, &admin.email, admin.role, JWT_SECRET).unwrap();
    let uri = format!("/api/orders/{}", order.id);

    let response = app
        .clone()
        .oneshot(authed_request("GET", &uri, &owner_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(authed_request("GET", &uri, &other_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Admin can view any order
    let response = app
        .oneshot(authed_request("GET", &uri, &admin_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

/// In-process stand-in for the gateway API: answers the payment-request
/// endpoint with a canned success and forwards each received body for
/// assertions.
async fn spawn_fake_gateway() -> (String, tokio::sync::mpsc::UnboundedReceiver<serde_json::Value>)
{
    use axum::Json;
    use axum::routing::post;

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<serde_json::Value>();
    let gateway = Router::new().route(
        "/v2/payment-requests",
        post(move |Json(body): Json<serde_json::Value>| {
            let tx = tx.clone();
            async move {
                tx.send(body).ok();
                Json(serde_json::json!({
                    "code": "00",
                    "desc": "success",
                    "data": {
                        "checkoutUrl": "https://pay.example.com/web/abc123",
                        "paymentLinkId": "plink_abc123",
                    },
                }))
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, gateway).await.unwrap();
    });
    (format!("http://{addr}"), rx)
}

#[tokio::test]
async fn payment_link_request_calls_gateway_and_stores_reference() {
    let pool = test_pool().await;
    let user = seed_user(&pool, "buyer@example.com", UserRole::User).await;
    let category = seed_category(&pool, "Vases").await;
    let product = seed_product(&pool, &category.id, "Celadon Vase", 10000.0, 5).await;

    let order = db::orders::create_order(
        &pool,
        &user.id,
        &[CreateOrderItem {
            product_id: product.id.clone(),
            quantity: 1,
        }],
    )
    .await
    .unwrap();

    let (gateway_base, mut gateway_rx) = spawn_fake_gateway().await;
    let app = build_app_with_gateway(pool.clone(), &gateway_base);
    let token = create_token(&user.id, &user.email, user.role, JWT_SECRET).unwrap();

    let response = app
        .oneshot(authed_request(
            "POST",
            &format!("/api/orders/{}/payment", order.id),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["checkout_url"], "https://pay.example.com/web/abc123");
    assert_eq!(body["payment_link_id"], "plink_abc123");

    // Gateway was called exactly once, with the rounded integer amount
    let request = gateway_rx.recv().await.expect("gateway must be called");
    assert_eq!(request["amount"], 10000);
    assert_eq!(request["items"][0]["name"], "Celadon Vase");
    assert_eq!(request["items"][0]["quantity"], 1);
    assert!(gateway_rx.try_recv().is_err(), "gateway called more than once");

    // Link id and reference were persisted before the response was returned
    let reloaded = db::orders::find_by_id(&pool, &order.id).await.unwrap().unwrap();
    assert_eq!(reloaded.payment_link_id.as_deref(), Some("plink_abc123"));
    let reference = reloaded.payment_reference.expect("reference must be stored");
    assert_eq!(
        reference,
        request["orderCode"].as_i64().unwrap().to_string()
    );
}

#[tokio::test]
async fn webhook_settles_pending_order_exactly_once() {
    let pool = test_pool().await;
    let user = seed_user(&pool, "buyer@example.com", UserRole::User).await;
    let category = seed_category(&pool, "Vases").await;
    let product = seed_product(&pool, &category.id, "Celadon Vase", 10000.0, 5).await;

    let order = db::orders::create_order(
        &pool,
        &user.id,
        &[CreateOrderItem {
            product_id: product.id.clone(),
            quantity: 1,
        }],
    )
    .await
    .unwrap();
    db::orders::set_payment_info(&pool, &order.id, "pl_123", "729555001")
        .await
        .unwrap();
    let app = build_app(pool.clone());

    // First delivery: order becomes PAID
    let response = app
        .clone()
        .oneshot(webhook_request(webhook_payload(729555001, "00")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let reloaded = db::orders::find_by_id(&pool, &order.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, OrderStatus::Paid);

    // Identical redelivery: acknowledged, still PAID, no error
    let response = app
        .clone()
        .oneshot(webhook_request(webhook_payload(729555001, "00")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let reloaded = db::orders::find_by_id(&pool, &order.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, OrderStatus::Paid);
}

#[tokio::test]
async fn webhook_rejects_bad_signatures_and_ignores_unknown_orders() {
    let pool = test_pool().await;
    let user = seed_user(&pool, "buyer@example.com", UserRole::User).await;
    let category = seed_category(&pool, "Vases").await;
    let product = seed_product(&pool, &category.id, "Celadon Vase", 10000.0, 5).await;

    let order = db::orders::create_order(
        &pool,
        &user.id,
        &[CreateOrderItem {
            product_id: product.id.clone(),
            quantity: 1,
        }],
    )
    .await
    .unwrap();
    db::orders::set_payment_info(&pool, &order.id, "pl_123", "729555002")
        .await
        .unwrap();
    let app = build_app(pool.clone());

    // Tampered signature: rejected, no state change
    let mut tampered: serde_json::Value =
        serde_json::from_str(&webhook_payload(729555002, "00")).unwrap();
    tampered["data"]["amount"] = serde_json::json!(999999);
    let response = app
        .clone()
        .oneshot(webhook_request(tampered.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Properly signed event for an unknown order code: acknowledged no-op
    let response = app
        .clone()
        .oneshot(webhook_request(webhook_payload(111111111, "00")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Non-success result code: acknowledged, order stays PENDING
    let response = app
        .oneshot(webhook_request(webhook_payload(729555002, "01")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let reloaded = db::orders::find_by_id(&pool, &order.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, OrderStatus::Pending);
}

use axum::http::HeaderValue;
use chrono::{Duration as ChronoDuration, Utc};
use fablab_api::app::AppServices;
use fablab_auth::{JwtClaims, Role};
use fablab_core::UserId;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(AppServices::in_memory(false).await.unwrap()).await
    }

    async fn spawn_seeded() -> Self {
        Self::spawn_with(AppServices::in_memory(true).await.unwrap()).await
    }

    async fn spawn_with(services: AppServices) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = fablab_api::app::build_app(
            JWT_SECRET.to_string(),
            HeaderValue::from_static("http://localhost:5173"),
            services,
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt_for(sub: UserId, role: Role, lifetime: ChronoDuration) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub,
        email: "someone@fablab.com".to_string(),
        role,
        issued_at: now - ChronoDuration::minutes(1),
        expires_at: now + lifetime,
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn mint_jwt(role: Role) -> String {
    mint_jwt_for(UserId::new(), role, ChronoDuration::minutes(10))
}

fn drill(item_id: &str, quantity: i64, min_stock: i64) -> Value {
    json!({
        "itemId": item_id,
        "name": "Cordless Drill",
        "type": "TOOLS",
        "price": 25.5,
        "quantity": quantity,
        "minStock": min_stock,
        "status": "IN_STOCK",
        "notes": "Bosch 18V",
    })
}

async fn create(client: &reqwest::Client, srv: &TestServer, token: &str, body: &Value) -> Value {
    let res = client
        .post(srv.url("/api/inventory"))
        .bearer_auth(token)
        .json(body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    created["data"].clone()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);

    let res = reqwest::get(srv.url("/api/nothing-here")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for path in ["/whoami", "/api/inventory", "/api/inventory/stats"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{path}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "unauthorized");
    }
}

#[tokio::test]
async fn expired_or_foreign_tokens_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let expired = mint_jwt_for(UserId::new(), Role::Admin, ChronoDuration::seconds(-30));
    let res = client
        .get(srv.url("/api/inventory"))
        .bearer_auth(expired)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(),
        email: "intruder@example.com".to_string(),
        role: Role::Admin,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(5),
    };
    let forged = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"some-other-secret"),
    )
    .unwrap();
    let res = client
        .get(srv.url("/api/inventory"))
        .bearer_auth(forged)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tokens_with_unknown_roles_are_rejected() {
    let srv = TestServer::spawn().await;
    let now = Utc::now().timestamp();
    let claims = json!({
        "sub": UserId::new(),
        "email": "guest@fablab.com",
        "role": "GUEST",
        "iat": now - 60,
        "exp": now + 600,
    });
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let res = reqwest::Client::new()
        .get(srv.url("/api/inventory"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn identity_service_tokens_carry_user_id() {
    let srv = TestServer::spawn().await;
    let user = UserId::new();
    let now = Utc::now().timestamp();
    let claims = json!({
        "userId": user,
        "email": "instructor@fablab.com",
        "role": "INSTRUCTOR",
        "iat": now - 60,
        "exp": now + 600,
    });
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let res = reqwest::Client::new()
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["userId"].as_str().unwrap(), user.to_string());
    assert_eq!(body["role"], "INSTRUCTOR");
}

#[tokio::test]
async fn principal_is_derived_from_token() {
    let srv = TestServer::spawn().await;
    let sub = UserId::new();
    let token = mint_jwt_for(sub, Role::Staff, ChronoDuration::minutes(10));

    let res = reqwest::Client::new()
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["userId"].as_str().unwrap(), sub.to_string());
    assert_eq!(body["role"], "STAFF");
    assert!(
        body["permissions"]
            .as_array()
            .unwrap()
            .iter()
            .any(|p| p == "inventory.adjust")
    );
}

#[tokio::test]
async fn inventory_lifecycle_create_adjust_update_delete() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = mint_jwt(Role::Staff);

    let created = create(&client, &srv, &token, &drill("TOOL-001", 10, 5)).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["itemId"], "TOOL-001");
    assert_eq!(created["type"], "TOOLS");
    assert_eq!(created["price"], 25.5);

    // Adjust down into LOW_STOCK.
    let res = client
        .patch(srv.url(&format!("/api/inventory/{id}/stock")))
        .bearer_auth(&token)
        .json(&json!({ "quantity": -7, "notes": "workshop" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let adjusted: Value = res.json().await.unwrap();
    assert_eq!(adjusted["data"]["quantity"], 3);
    assert_eq!(adjusted["data"]["status"], "LOW_STOCK");

    // Alerts and stats see it.
    let alerts: Value = client
        .get(srv.url("/api/inventory/alerts"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(alerts["data"].as_array().unwrap().len(), 1);

    let stats: Value = client
        .get(srv.url("/api/inventory/stats"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["data"]["total"], 1);
    assert_eq!(stats["data"]["lowStock"], 1);
    assert_eq!(stats["data"]["totalQuantity"], 3);

    // Update merges fields; itemId is untouched.
    let res = client
        .put(srv.url(&format!("/api/inventory/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "name": "Impact Drill" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["data"]["name"], "Impact Drill");
    assert_eq!(updated["data"]["itemId"], "TOOL-001");
    assert_eq!(updated["data"]["quantity"], 3);

    // Detail carries history newest first.
    let detail: Value = client
        .get(srv.url(&format!("/api/inventory/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let logs = detail["data"]["logs"].as_array().unwrap();
    let actions: Vec<&str> = logs.iter().map(|l| l["action"].as_str().unwrap()).collect();
    assert_eq!(actions, vec!["UPDATED", "STOCK_REMOVED", "CREATED"]);
    assert_eq!(logs[1]["quantity"], 7);
    assert_eq!(logs[1]["notes"], "workshop");

    // Delete, then the item is gone.
    let res = client
        .delete(srv.url(&format!("/api/inventory/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url(&format!("/api/inventory/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn insufficient_stock_is_a_bad_request() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = mint_jwt(Role::Admin);

    let created = create(&client, &srv, &token, &drill("TOOL-002", 2, 1)).await;
    let id = created["id"].as_str().unwrap();

    let res = client
        .patch(srv.url(&format!("/api/inventory/{id}/stock")))
        .bearer_auth(&token)
        .json(&json!({ "quantity": -3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");

    let detail: Value = client
        .get(srv.url(&format!("/api/inventory/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["data"]["quantity"], 2);
    assert_eq!(detail["data"]["logs"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_item_id_conflicts() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = mint_jwt(Role::Admin);

    create(&client, &srv, &token, &drill("TOOL-003", 1, 0)).await;
    let res = client
        .post(srv.url("/api/inventory"))
        .bearer_auth(&token)
        .json(&drill("TOOL-003", 9, 0))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "duplicate_key");
}

#[tokio::test]
async fn invalid_payloads_and_ids_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = mint_jwt(Role::Admin);

    let mut bad_type = drill("TOOL-004", 1, 0);
    bad_type["type"] = json!("CANDY");
    let mut bad_price = drill("TOOL-005", 1, 0);
    bad_price["price"] = json!(0);
    let mut bad_url = drill("TOOL-006", 1, 0);
    bad_url["imageUrl"] = json!("not a url");
    let mut huge_price = drill("TOOL-007", 1, 0);
    huge_price["price"] = json!(123_456_789.5);

    for body in [bad_type, bad_price, bad_url, huge_price] {
        let res = client
            .post(srv.url("/api/inventory"))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{body}");
        let err: Value = res.json().await.unwrap();
        assert_eq!(err["error"], "validation_error");
    }

    let res = client
        .get(srv.url("/api/inventory/not-a-uuid"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(srv.url("/api/inventory?page=abc"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn instructors_can_read_but_not_write() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = mint_jwt(Role::Admin);
    let instructor = mint_jwt(Role::Instructor);

    let created = create(&client, &srv, &admin, &drill("TOOL-007", 4, 1)).await;
    let id = created["id"].as_str().unwrap();

    let res = client
        .get(srv.url(&format!("/api/inventory/{id}")))
        .bearer_auth(&instructor)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .patch(srv.url(&format!("/api/inventory/{id}/stock")))
        .bearer_auth(&instructor)
        .json(&json!({ "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(srv.url("/api/inventory"))
        .bearer_auth(&instructor)
        .json(&drill("TOOL-008", 1, 0))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn list_filters_and_paginates_seeded_inventory() {
    let srv = TestServer::spawn_seeded().await;
    let client = reqwest::Client::new();
    let token = mint_jwt(Role::Instructor);

    let page: Value = client
        .get(srv.url("/api/inventory?page=2&limit=4"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["data"]["pagination"]["total"], 6);
    assert_eq!(page["data"]["pagination"]["pages"], 2);

    let chocolate: Value = client
        .get(srv.url("/api/inventory?type=CHOCOLATE&search=white"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let items = chocolate["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["itemId"], "CHOC-002");
    assert_eq!(chocolate["data"]["pagination"]["total"], 1);

    let alerts: Value = client
        .get(srv.url("/api/inventory/alerts"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let alerts = alerts["data"].as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["itemId"], "MAT-001");
}

#[tokio::test]
async fn history_resolves_the_acting_user() {
    let srv = TestServer::spawn_seeded().await;
    let client = reqwest::Client::new();
    let admin_id = UserId::from_uuid(fablab_infra::seed::DEMO_ADMIN_ID);
    let token = mint_jwt_for(admin_id, Role::Admin, ChronoDuration::minutes(10));

    let list: Value = client
        .get(srv.url("/api/inventory?search=PINS-001"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = list["data"]["items"][0]["id"].as_str().unwrap().to_string();

    let res = client
        .patch(srv.url(&format!("/api/inventory/{id}/stock")))
        .bearer_auth(&token)
        .json(&json!({ "quantity": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let detail: Value = client
        .get(srv.url(&format!("/api/inventory/{id}?history=1")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let logs = detail["data"]["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["action"], "STOCK_REMOVED");
    assert_eq!(logs[0]["user"]["email"], "admin@fablab.com");
    assert_eq!(logs[0]["user"]["firstName"], "Admin");
}

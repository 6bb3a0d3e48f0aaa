use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use vocalyx_api::app::{self, AppServices};
use vocalyx_core::UserId;
use vocalyx_infra::config::AppConfig;
use vocalyx_infra::directory::InMemoryDirectory;
use vocalyx_infra::mail::RecordingMailer;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    mailer: Arc<RecordingMailer>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over an in-memory directory and a recording mailer.
        let config = AppConfig {
            jwt_secret: JWT_SECRET.to_string(),
            jwt_secret_is_default: false,
            ..AppConfig::default()
        };
        let mailer = Arc::new(RecordingMailer::new());
        let services = AppServices::new(&config, InMemoryDirectory::arc(), mailer.clone());
        let app = app::router(Arc::new(services));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}/api/users", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            mailer,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut req = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn delete(&self, path: &str, token: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn register(&self, first: &str, email: &str, password: &str) -> Value {
        let (status, body) = self
            .post(
                "/register",
                None,
                json!({ "firstName": first, "lastName": "Tester", "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .post("/login", None, json!({ "email": email, "password": password }))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Register, create a company, and return a session carrying the company.
    async fn company_admin(&self, email: &str, company: &str) -> (Value, String) {
        self.register("Admin", email, "secret-pw").await;
        let token = self.login(email, "secret-pw").await;
        let (status, user) = self
            .post("/create-company", Some(&token), json!({ "companyName": company }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create-company failed: {user}");
        (user, self.login(email, "secret-pw").await)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(secret: &str, issued_at: i64, expires_at: i64) -> String {
    let claims = json!({
        "sub": "mallory@evil.test",
        "userId": UserId::new().to_string(),
        "firstName": "Mallory",
        "lastName": "Forger",
        "role": "ADMIN",
        "permissions": {},
        "iat": issued_at,
        "exp": expires_at,
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn reset_token_from(body: &str) -> String {
    body.split("token=")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .expect("reset mail carries a token")
        .to_string()
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/me")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "missing_token");

    let health = srv
        .client
        .get(srv.base_url.replace("/api/users", "/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn forged_and_expired_tokens_are_rejected() {
    let srv = TestServer::spawn().await;
    let now = Utc::now();

    let forged = mint_jwt(
        "some-other-secret",
        now.timestamp(),
        (now + ChronoDuration::minutes(10)).timestamp(),
    );
    let (status, body) = srv.get("/me", &forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");

    let expired = mint_jwt(
        JWT_SECRET,
        (now - ChronoDuration::hours(2)).timestamp(),
        (now - ChronoDuration::hours(1)).timestamp(),
    );
    let (status, body) = srv.get("/me", &expired).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "expired_token");
}

#[tokio::test]
async fn login_failures_are_uniform() {
    let srv = TestServer::spawn().await;
    srv.register("Alice", "alice@acme.com", "secret-pw").await;

    let (status, unknown) = srv
        .post("/login", None, json!({ "email": "ghost@acme.com", "password": "secret-pw" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, wrong) = srv
        .post("/login", None, json!({ "email": "alice@acme.com", "password": "nope" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, wrong);
    assert_eq!(wrong["error"], "invalid_credentials");
}

#[tokio::test]
async fn sales_rep_role_lifecycle_over_http() {
    let srv = TestServer::spawn().await;
    let (alice, admin_token) = srv.company_admin("alice@acme.com", "Acme").await;
    assert_eq!(alice["companyName"], "Acme");

    let (status, claims) = srv.get("/me", &admin_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(claims["companyName"], "Acme");

    let (status, bob) = srv
        .post(
            "/invite",
            Some(&admin_token),
            json!({ "email": "bob@acme.com", "tempPassword": "temp123" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "invite failed: {bob}");
    assert_eq!(bob["role"], "USER");
    assert_eq!(bob["workspaceId"], alice["workspaceId"]);
    let invite = srv.mailer.last_to("bob@acme.com").expect("invitation mailed");
    assert!(invite.body.contains("temp123"));

    let (status, role) = srv
        .post(
            "/roles",
            Some(&admin_token),
            json!({
                "roleName": "Sales Rep",
                "permissions": [{ "permissionName": "view_orders", "hasAccess": true }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "create role failed: {role}");
    assert_eq!(role["permissions"][0]["hasAccess"], true);
    let role_id = role["id"].as_str().unwrap().to_string();
    let bob_id = bob["id"].as_str().unwrap().to_string();

    let (status, assigned) = srv
        .post(
            &format!("/{bob_id}/assign-role"),
            Some(&admin_token),
            json!({ "customRoleId": role_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(assigned["customRoleName"], "Sales Rep");

    let bob_token = srv.login("bob@acme.com", "temp123").await;
    let (_, bob_claims) = srv.get("/me", &bob_token).await;
    assert_eq!(bob_claims["customRoleName"], "Sales Rep");
    assert_eq!(bob_claims["permissions"], json!({ "view_orders": true }));

    let (_, check) = srv.get("/me/permissions/view_orders", &bob_token).await;
    assert_eq!(check["granted"], true);
    let (_, check) = srv.get("/me/permissions/delete_orders", &bob_token).await;
    assert_eq!(check["granted"], false);
    assert_eq!(check["defined"], false);

    let (status, body) = srv.delete(&format!("/roles/{role_id}"), &admin_token).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "role_in_use");

    let (status, _) = srv
        .post(
            &format!("/{bob_id}/assign-role"),
            Some(&admin_token),
            json!({ "customRoleId": null }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = srv.delete(&format!("/roles/{role_id}"), &admin_token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, users) = srv.get("/workspace-users", &admin_token).await;
    assert_eq!(users.as_array().unwrap().len(), 2);
    assert!(users.as_array().unwrap().iter().all(|u| u.get("passwordHash").is_none()));
}

#[tokio::test]
async fn tenant_isolation_blocks_cross_company_access() {
    let srv = TestServer::spawn().await;
    let (alice, acme_token) = srv.company_admin("alice@acme.com", "Acme").await;
    let (_, globex_token) = srv.company_admin("carol@globex.com", "Globex").await;

    let (_, role) = srv
        .post(
            "/roles",
            Some(&acme_token),
            json!({ "roleName": "Acme Only", "permissions": [] }),
        )
        .await;
    let role_id = role["id"].as_str().unwrap().to_string();
    let alice_id = alice["id"].as_str().unwrap().to_string();

    let (_, globex_roles) = srv.get("/roles", &globex_token).await;
    assert!(globex_roles.as_array().unwrap().is_empty());

    let (status, body) = srv.delete(&format!("/roles/{role_id}"), &globex_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "cross_tenant_access");

    let (status, _) = srv.delete(&format!("/{alice_id}"), &globex_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = srv.delete(&format!("/{alice_id}"), &acme_token).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "self_delete_forbidden");

    let (status, body) = srv.delete("/not-a-uuid", &acme_token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");
}

#[tokio::test]
async fn unscoped_admin_gets_no_tenant() {
    let srv = TestServer::spawn().await;
    srv.register("Solo", "solo@nowhere.io", "secret-pw").await;
    let token = srv.login("solo@nowhere.io", "secret-pw").await;

    let (status, body) = srv.get("/workspace-users", &token).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "no_tenant");
}

#[tokio::test]
async fn password_reset_over_http() {
    let srv = TestServer::spawn().await;
    srv.register("Alice", "alice@acme.com", "secret-pw").await;

    let (status, _) = srv
        .post("/forgot-password", None, json!({ "email": "ghost@acme.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(srv.mailer.sent().is_empty());

    let (status, _) = srv
        .post("/forgot-password", None, json!({ "email": "alice@acme.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let mail = srv.mailer.last_to("alice@acme.com").expect("reset mailed");
    let token = reset_token_from(&mail.body);

    let (status, body) = srv
        .post(
            "/perform-reset",
            None,
            json!({ "token": token, "newPassword": "fresh-pw", "confirmPassword": "other" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "password_mismatch");

    let (status, _) = srv
        .post(
            "/perform-reset",
            None,
            json!({ "token": token, "newPassword": "fresh-pw", "confirmPassword": "fresh-pw" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    srv.login("alice@acme.com", "fresh-pw").await;

    let (status, body) = srv
        .post(
            "/perform-reset",
            None,
            json!({ "token": token, "newPassword": "again-pw", "confirmPassword": "again-pw" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_or_expired_token");
}

#[tokio::test]
async fn change_password_requires_current_password() {
    let srv = TestServer::spawn().await;
    srv.register("Alice", "alice@acme.com", "secret-pw").await;
    let token = srv.login("alice@acme.com", "secret-pw").await;

    let (status, body) = srv
        .post(
            "/reset-password",
            Some(&token),
            json!({ "currentPassword": "wrong", "newPassword": "n3w", "confirmPassword": "n3w" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");

    let (status, _) = srv
        .post(
            "/reset-password",
            Some(&token),
            json!({ "currentPassword": "secret-pw", "newPassword": "n3w", "confirmPassword": "n3w" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    srv.login("alice@acme.com", "n3w").await;
}

//! Shared harness: the full HTTP app on a random port, backed by in-memory
//! stores and fake email/assistant servers.

#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::Algorithm;
use mektep::assistant::AssistantClient;
use mektep::auth::{
    AuthService, InMemoryRevocationStore, PasswordHasher, TokenCodec, TokenLifetimes,
};
use mektep::configuration::AssistantSettings;
use mektep::email_client::{EmailClient, SenderEmail};
use mektep::startup::run;
use mektep::users::{InMemoryUserDirectory, NewUser, Role, UserDirectory};
use serde_json::{json, Value};
use wiremock::MockServer;

pub const TEST_SECRET: &[u8] = b"integration-test-secret-key-32-bytes!";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub email_server: MockServer,
    pub assistant_server: MockServer,
    pub users: InMemoryUserDirectory,
    pub revoked: InMemoryRevocationStore,
    pub codec: TokenCodec,
}

pub fn assistant_settings(endpoint: String) -> AssistantSettings {
    AssistantSettings {
        endpoint,
        api_key: "test-key".to_string(),
        api_version: "2024-05-01-preview".to_string(),
        assistant_id: "asst_test".to_string(),
        poll_interval_milliseconds: 10,
        max_polls: 3,
    }
}

pub async fn spawn_app() -> TestApp {
    let email_server = MockServer::start().await;
    let assistant_server = MockServer::start().await;

    let users = InMemoryUserDirectory::new();
    let revoked = InMemoryRevocationStore::new();
    let codec = TokenCodec::new(TEST_SECRET, Algorithm::HS256).expect("Failed to build codec");

    let auth = AuthService::new(
        Arc::new(users.clone()),
        Arc::new(revoked.clone()),
        PasswordHasher::new(4).expect("Invalid bcrypt cost"),
        codec.clone(),
        TokenLifetimes {
            access: Duration::minutes(60),
            refresh: Duration::days(30),
            recovery: Duration::minutes(30),
        },
    );
    let email_client = EmailClient::new(
        email_server.uri(),
        SenderEmail::parse("no-reply@mektep.kz".to_string()).expect("Invalid sender"),
        "https://app.mektep.kz/reset".to_string(),
        reqwest::Client::new(),
    );
    let assistant = AssistantClient::new(
        &assistant_settings(assistant_server.uri()),
        reqwest::Client::new(),
    );

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let server =
        run(listener, auth, email_client, assistant).expect("Failed to create server");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        email_server,
        assistant_server,
        users,
        revoked,
        codec,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_bearer(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get_bearer(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Register a user and return the token response body
    pub async fn register(&self, email: &str, phone: &str, password: &str) -> Value {
        let response = self
            .post_json(
                "/v1/auth/register",
                &json!({
                    "email": email,
                    "phone_number": phone,
                    "password": password,
                }),
            )
            .await;
        assert_eq!(200, response.status().as_u16(), "registration of {} failed", email);
        response.json().await.expect("Failed to parse response")
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_json(
            "/v1/auth/login",
            &json!({ "username": email, "password": password }),
        )
        .await
    }

    /// Create an administrator directly in the store and log it in
    pub async fn admin_access_token(&self) -> String {
        let password_hash = PasswordHasher::new(4).unwrap().hash("admin-pw").unwrap();
        self.users
            .create(NewUser {
                email: "admin@x.com".to_string(),
                phone_number: "+77019999999".to_string(),
                first_name: None,
                last_name: None,
                password_hash,
                role: Role::Admin,
            })
            .await
            .expect("Failed to create admin");

        let body: Value = self.login("admin@x.com", "admin-pw").await.json().await.unwrap();
        body["access_token"].as_str().unwrap().to_string()
    }
}

pub fn token(body: &Value, field: &str) -> String {
    body[field]
        .as_str()
        .unwrap_or_else(|| panic!("{} missing in {}", field, body))
        .to_string()
}

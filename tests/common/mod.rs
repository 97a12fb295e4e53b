//! Shared utilities for integration tests.
//!
//! `TestApp::spawn` runs the real server on an ephemeral port with an
//! in-memory store and a `MemoryMailer`, so activation tokens can be read
//! back out of the "sent" mail.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use blog_backend::config::AppConfig;
use blog_backend::database::SqliteDatabase;
use blog_backend::http::{AppState, HttpServer};
use blog_backend::lifecycle::Shutdown;
use blog_backend::mailer::MemoryMailer;

pub const PASSWORD: &str = "pa55word-long";

pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub mailer: MemoryMailer,
    shutdown: Shutdown,
}

impl TestApp {
    /// Start with defaults and rate limiting off.
    pub async fn spawn() -> Self {
        let mut config = AppConfig::default();
        config.limiter.enabled = false;
        Self::spawn_with(config).await
    }

    pub async fn spawn_with(config: AppConfig) -> Self {
        let db = SqliteDatabase::in_memory().await.unwrap();
        let mailer = MemoryMailer::new();
        let state = AppState::new(config, Arc::new(db), Arc::new(mailer.clone()));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();

        let server = HttpServer::new(state);
        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = server.run(listener, server_shutdown).await;
        });

        let client = Client::builder()
            .pool_max_idle_per_host(0)
            .no_proxy()
            .build()
            .unwrap();

        Self {
            addr,
            client,
            mailer,
            shutdown,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Response {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.unwrap()
    }

    pub async fn send_json(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
        body: Value,
    ) -> Response {
        let mut request = self.client.request(method, self.url(path)).json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.unwrap()
    }

    pub async fn register(&self, name: &str, email: &str) -> Response {
        self.send_json(
            reqwest::Method::POST,
            "/api/v1/auth/register",
            None,
            json!({ "name": name, "email": email, "password": PASSWORD }),
        )
        .await
    }

    /// Wait for the welcome mail to `email` and pull the token out of it.
    pub async fn activation_token(&self, email: &str) -> String {
        for _ in 0..100 {
            let found = self
                .mailer
                .sent()
                .into_iter()
                .rev()
                .find(|mail| mail.to == email);
            if let Some(mail) = found {
                return extract_token(&mail.body);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("no welcome mail sent to {email}");
    }

    pub async fn activate(&self, token: &str) -> Response {
        self.send_json(
            reqwest::Method::PUT,
            "/api/v1/auth/activate",
            None,
            json!({ "token": token }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.send_json(
            reqwest::Method::POST,
            "/api/v1/auth/login",
            None,
            json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Register and log in without activating. Returns the bearer token.
    pub async fn inactive_user(&self, name: &str, email: &str) -> String {
        assert_eq!(self.register(name, email).await.status(), 202);
        self.login_token(email).await
    }

    /// Register, activate and log in. Returns the bearer token.
    pub async fn activated_user(&self, name: &str, email: &str) -> String {
        assert_eq!(self.register(name, email).await.status(), 202);
        let token = self.activation_token(email).await;
        assert_eq!(self.activate(&token).await.status(), 200);
        self.login_token(email).await
    }

    async fn login_token(&self, email: &str) -> String {
        let response = self.login(email, PASSWORD).await;
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.unwrap();
        body["authentication_token"]["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Create a post as `token` and return its JSON.
    pub async fn create_post(&self, token: &str, title: &str) -> Value {
        let response = self
            .send_json(
                reqwest::Method::POST,
                "/api/v1/post",
                Some(token),
                json!({
                    "title": title,
                    "postText": "Some words about things.",
                    "readTime": "4 mins",
                    "img": "https://example.com/cover.png",
                }),
            )
            .await;
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.unwrap();
        body["post"].clone()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

fn extract_token(body: &str) -> String {
    let marker = "{\"token\": \"";
    let start = body.find(marker).expect("mail carries a token") + marker.len();
    body[start..start + 26].to_string()
}

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Duration;
use jsonwebtoken::Algorithm;
use recruit_api::{build_router, models, AppState, AuthService, MemoryStore, Store, TokenService};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const SECRET: &str = "integration-secret";

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub www_authenticate: Option<String>,
    pub body: Value,
}

pub fn app() -> TestApp {
    let store = MemoryStore::new();
    let shared: Arc<dyn Store> = Arc::new(store.clone());
    let registry = Arc::new(models::registry().unwrap());
    let tokens = TokenService::new(SECRET, Algorithm::HS256, Duration::minutes(120));
    let auth = AuthService::new(shared.clone(), registry.clone(), tokens, 4);
    let state = AppState::new(shared, registry, auth);
    let router = build_router(state, &["http://localhost:3000".to_string()]).unwrap();
    TestApp { router, store }
}

pub fn tokens() -> TokenService {
    TokenService::new(SECRET, Algorithm::HS256, Duration::minutes(120))
}

impl TestApp {
    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let www_authenticate = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse {
            status,
            www_authenticate,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn signup(&self, email: &str, password: &str) -> TestResponse {
        self.send(
            Method::POST,
            "/auth/signup",
            None,
            Some(json!({"email": email, "password": password})),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": email, "password": password})),
        )
        .await
    }

    /// Sign up a fresh user and return a bearer token for it.
    pub async fn token(&self) -> String {
        let created = self.signup("tester@x.com", "pw").await;
        assert_eq!(created.status, StatusCode::CREATED);
        let logged_in = self.login("tester@x.com", "pw").await;
        assert_eq!(logged_in.status, StatusCode::OK);
        logged_in.body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn create_candidate(&self, token: &str, body: Value) -> Value {
        let response = self.post("/candidates/", token, body).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }
}

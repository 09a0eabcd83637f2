use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use blogger::settings::Settings;
use blogger::web::{self, AppState};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use super::TestDb;

/// In-process application driven request by request, no listener involved
pub struct TestApp {
    pub db: TestDb,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = TestDb::new().await;
        let state = AppState {
            settings: Arc::new(Settings::default()),
            db: db.connection().clone(),
        };
        let router = web::router(state);
        Self { db, router }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible")
    }

    /// Send a request with an optional JSON body and session cookie
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("Failed to build request"))
            .await
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.request(Method::GET, uri, None, cookie).await
    }

    /// POST the login form and return the raw response
    pub async fn post_login(
        &self,
        username: &str,
        password: &str,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let form = format!("username={}&password={}", username, password);
        self.send(builder.body(Body::from(form)).expect("Failed to build request"))
            .await
    }

    /// Log in and return the `Cookie` header value for the new session
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self.post_login(username, password, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "login failed");
        session_cookie(&response).expect("Login did not set a session cookie")
    }
}

/// Extract `blogger_session=<id>` from a response's Set-Cookie header
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with("blogger_session=") && pair.len() > "blogger_session=".len())
        .map(str::to_string)
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).expect("Body is not JSON")
}

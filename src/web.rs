//! HTTP surface: router assembly, the session-backed login/logout flow and
//! the landing page. The REST endpoints live in [`crate::api`].
use crate::api;
use crate::errors::BlogError;
use crate::permissions::Actor;
use crate::session::SessionCookie;
use crate::settings::Settings;
use crate::storage;
use axum::body::Body;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use miette::IntoDiagnostic;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db: DatabaseConnection,
}

// Security headers middleware
async fn security_headers(request: Request<Body>, next: Next) -> impl IntoResponse {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    // X-Frame-Options: Prevent clickjacking
    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );

    // X-Content-Type-Options: Prevent MIME sniffing
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );

    // Content-Security-Policy: the login page only needs its inline styles
    headers.insert(
        HeaderName::from_static("content-security-policy"),
        HeaderValue::from_static(
            "default-src 'self'; style-src 'self' 'unsafe-inline'; form-action 'self'",
        ),
    );

    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    response
}

/// Full application router, state applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", get(logout))
        .nest("/api", api::router())
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(settings: Settings, db: DatabaseConnection) -> miette::Result<()> {
    let state = AppState {
        settings: Arc::new(settings),
        db,
    };

    let addr: SocketAddr = format!(
        "{}:{}",
        state.settings.server.host, state.settings.server.port
    )
    .parse()
    .map_err(|e| miette::miette!("bad listen addr: {e}"))?;

    let app = router(state);

    tracing::info!(%addr, "Blog API listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .into_diagnostic()?;
    axum::serve(listener, app).await.into_diagnostic()?;
    Ok(())
}

/// Resolve the request's actor from its session cookie.
///
/// Missing, expired or dangling sessions and inactive accounts all resolve to
/// [`Actor::Anonymous`].
pub async fn current_actor(state: &AppState, headers: &HeaderMap) -> Result<Actor, BlogError> {
    let Some(cookie) = SessionCookie::from_headers(headers) else {
        return Ok(Actor::Anonymous);
    };
    let Some(session) = storage::get_session(&state.db, &cookie.session_id).await? else {
        return Ok(Actor::Anonymous);
    };

    match storage::get_user_by_id(&state.db, session.user_id).await? {
        Some(user) if user.is_active => Ok(Actor::User(user.into())),
        _ => Ok(Actor::Anonymous),
    }
}

fn redirect_to_landing(state: &AppState) -> Response {
    Redirect::to(&state.settings.site.landing_path).into_response()
}

async fn home(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, BlogError> {
    let greeting = match current_actor(&state, &headers).await? {
        Actor::User(identity) => format!(
            "<p>Signed in as <strong>{}</strong>. <a href=\"/logout\">Log out</a></p>",
            html_escape(&identity.username)
        ),
        Actor::Anonymous => "<p><a href=\"/login\">Log in</a> to write articles.</p>".to_string(),
    };

    Ok(Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Blogger</title></head>
<body>
    <h1>Blogger</h1>
    {greeting}
    <ul>
        <li><a href="/api/categories/">Categories</a></li>
        <li><a href="/api/articles/">Articles</a></li>
        <li><a href="/api/authors/">Authors</a></li>
    </ul>
</body>
</html>
"#
    )))
}

const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";
const REQUIRED: &str = "This field is required.";

#[derive(Debug, Default, Deserialize)]
struct LoginForm {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default)]
struct LoginErrors {
    form: Option<&'static str>,
    username: Option<&'static str>,
    password: Option<&'static str>,
}

fn render_login(username: &str, errors: &LoginErrors) -> Html<String> {
    let error_html = |message: Option<&str>| {
        message
            .map(|m| format!("<p class=\"error\">{}</p>", html_escape(m)))
            .unwrap_or_default()
    };
    let form_error = error_html(errors.form);
    let username_error = error_html(errors.username);
    let password_error = error_html(errors.password);
    let username = html_escape(username);

    Html(format!(
        r#"
        <!DOCTYPE html>
        <html>
        <head>
            <title>Login - Blogger</title>
            <style>
                body {{ font-family: Arial, sans-serif; max-width: 400px; margin: 100px auto; padding: 20px; }}
                h1 {{ color: #333; }}
                label {{ display: block; margin-top: 10px; }}
                input[type="text"], input[type="password"] {{ width: 100%; padding: 8px; margin-top: 5px; box-sizing: border-box; }}
                button {{ margin-top: 20px; padding: 10px 20px; background-color: #007bff; color: white; border: none; cursor: pointer; }}
                button:hover {{ background-color: #0056b3; }}
                .error {{ color: red; }}
            </style>
        </head>
        <body>
            <h1>Login</h1>
            {form_error}
            <form method="POST" action="/login">
                <label>
                    Username:
                    <input type="text" id="username" name="username" value="{username}" required autofocus>
                </label>
                {username_error}
                <label>
                    Password:
                    <input type="password" name="password" required>
                </label>
                {password_error}
                <button type="submit">Login</button>
            </form>
        </body>
        </html>
    "#
    ))
}

async fn login_page(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, BlogError> {
    if current_actor(&state, &headers).await?.is_authenticated() {
        return Ok(redirect_to_landing(&state));
    }
    Ok(render_login("", &LoginErrors::default()).into_response())
}

async fn login_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Response, BlogError> {
    if current_actor(&state, &headers).await?.is_authenticated() {
        return Ok(redirect_to_landing(&state));
    }

    let form = form.map(|Form(f)| f).unwrap_or_default();
    let username = form.username.unwrap_or_default();
    let password = form.password.unwrap_or_default();

    let mut errors = LoginErrors::default();
    if username.trim().is_empty() {
        errors.username = Some(REQUIRED);
    }
    if password.is_empty() {
        errors.password = Some(REQUIRED);
    }
    if errors.username.is_some() || errors.password.is_some() {
        return Ok(render_login(&username, &errors).into_response());
    }

    let Some(user) =
        storage::verify_user_password(&state.db, username.trim(), &password).await?
    else {
        tracing::info!(username = %username.trim(), "failed login attempt");
        errors.form = Some(INVALID_LOGIN);
        return Ok(render_login(&username, &errors).into_response());
    };

    // A leftover cookie is replaced, never reused
    if let Some(stale) = SessionCookie::from_headers(&headers) {
        if let Err(e) = storage::delete_session(&state.db, &stale.session_id).await {
            tracing::warn!(error = %e, "failed to delete stale session on login");
        }
    }

    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(String::from);

    let session =
        storage::create_session(&state.db, user.id, state.settings.session.ttl_secs, user_agent)
            .await?;
    tracing::info!(user_id = user.id, username = %user.username, "user logged in");

    let cookie = SessionCookie::new(session.session_id);

    Ok((
        StatusCode::SEE_OTHER,
        [
            (
                axum::http::header::SET_COOKIE,
                cookie.to_cookie_header(&state.settings),
            ),
            (
                axum::http::header::LOCATION,
                state.settings.site.landing_path.clone(),
            ),
        ],
    )
        .into_response())
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(cookie) = SessionCookie::from_headers(&headers) {
        if let Err(e) = storage::delete_session(&state.db, &cookie.session_id).await {
            tracing::warn!(error = %e, "failed to delete session on logout");
        }
    }

    (
        StatusCode::SEE_OTHER,
        [
            (
                axum::http::header::SET_COOKIE,
                SessionCookie::delete_cookie_header(),
            ),
            (
                axum::http::header::LOCATION,
                state.settings.site.landing_path.clone(),
            ),
        ],
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_render_login_shows_errors_and_keeps_username() {
        let errors = LoginErrors {
            form: Some(INVALID_LOGIN),
            ..Default::default()
        };
        let Html(page) = render_login("<alice>", &errors);

        assert!(page.contains("Please enter a correct username and password."));
        assert!(page.contains("value=\"&lt;alice&gt;\""));
        assert!(!page.contains(REQUIRED));
    }
}

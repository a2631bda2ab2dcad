//! HTTP API: routes, shared state, CORS and serving

mod error;
mod handlers;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::ai::ChatService;
use crate::config::{Config, Environment, ServerConfig};
use crate::constants::BODY_LIMIT_BYTES;
use crate::mail::{self, ContactMailer};
use crate::portfolio::Portfolio;

/// Shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub portfolio: Arc<Portfolio>,
    pub chat: Arc<ChatService>,
    pub mailer: Arc<dyn ContactMailer>,
    pub environment: Environment,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let portfolio = Arc::new(load_portfolio(&config.server)?);
        let chat = Arc::new(ChatService::new(config, portfolio.clone())?);
        let mailer = mail::mailer_from_config(&config.mail, &portfolio.email)?;

        Ok(Self {
            portfolio,
            chat,
            mailer,
            environment: config.server.environment,
        })
    }
}

pub fn load_portfolio(config: &ServerConfig) -> Result<Portfolio> {
    match &config.portfolio_path {
        Some(path) => Portfolio::load(path),
        None => Portfolio::builtin(),
    }
}

/// Build the application router
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let api = Router::new()
        .route(
            "/health",
            get(handlers::health).fallback(handlers::method_not_allowed),
        )
        .route(
            "/portfolio",
            get(handlers::portfolio).fallback(handlers::method_not_allowed),
        )
        .route(
            "/chat",
            post(handlers::chat).fallback(handlers::method_not_allowed),
        )
        .route(
            "/contact",
            post(handlers::contact).fallback(handlers::method_not_allowed),
        )
        .fallback(handlers::not_found);

    let app = Router::new().nest("/api", api);

    let app = match &config.static_dir {
        Some(dir) => {
            tracing::info!("Serving frontend from {}", dir.display());
            let spa = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
            app.fallback_service(spa)
        }
        None => app.fallback(handlers::not_found),
    };

    app.layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors_layer(config.origins()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: Vec<String>) -> CorsLayer {
    let origins = Arc::new(origins);
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .is_ok_and(|origin| origin_allowed(&origins, origin))
            },
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
}

/// Configured origins, any localhost port, and Vercel preview deployments
fn origin_allowed(origins: &[String], origin: &str) -> bool {
    if origins.iter().any(|o| o == origin) {
        return true;
    }

    let lower = origin.to_ascii_lowercase();
    if lower.ends_with(".vercel.app") {
        return true;
    }

    let Some(rest) = lower
        .strip_prefix("http://")
        .or_else(|| lower.strip_prefix("https://"))
    else {
        return false;
    };
    let (host, port) = match rest.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (rest, None),
    };
    matches!(host, "localhost" | "127.0.0.1")
        && port.is_none_or(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

/// Bind, serve until Ctrl-C / SIGTERM
pub async fn serve(config: Config) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let app = router(state, &config.server);

    let addr = config.server.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(
        "Listening on http://{} ({})",
        listener.local_addr()?,
        config.server.environment.as_str()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::ContactMessage;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use futures::future::BoxFuture;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<ContactMessage>>,
        fail: bool,
    }

    impl ContactMailer for RecordingMailer {
        fn send<'a>(&'a self, contact: &'a ContactMessage) -> BoxFuture<'a, Result<()>> {
            Box::pin(async move {
                if self.fail {
                    anyhow::bail!("relay refused connection");
                }
                self.sent.lock().unwrap().push(contact.clone());
                Ok(())
            })
        }
    }

    fn app_with(mailer: Arc<RecordingMailer>, config: &Config) -> Router {
        let portfolio = Arc::new(Portfolio::builtin().unwrap());
        let state = AppState {
            chat: Arc::new(ChatService::new(config, portfolio.clone()).unwrap()),
            portfolio,
            mailer,
            environment: config.server.environment,
        };
        router(state, &config.server)
    }

    fn app() -> Router {
        app_with(Arc::new(RecordingMailer::default()), &Config::default())
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_origin_allowed() {
        let origins = Config::default().server.origins();
        for origin in [
            "http://localhost:5173",
            "https://oladayo.vercel.app",
            "https://preview-abc.VERCEL.app",
            "http://127.0.0.1:8080",
            "https://localhost",
        ] {
            assert!(origin_allowed(&origins, origin), "expected allowed: {}", origin);
        }
        for origin in [
            "https://evil.example.com",
            "http://localhost.evil.com",
            "http://localhost:",
            "ftp://localhost",
            "https://vercel.app.evil.com",
        ] {
            assert!(!origin_allowed(&origins, origin), "expected rejected: {}", origin);
        }
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(app(), Request::get("/api/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["environment"], "production");
        assert!(body["timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_portfolio() {
        let (status, body) =
            send(app(), Request::get("/api/portfolio").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["name"], "Oladayo Alabi");
        assert_eq!(body["data"]["experience"][3]["company"], "TotalEnergies");
    }

    #[tokio::test]
    async fn test_wrong_method_is_json() {
        for uri in ["/api/health", "/api/portfolio"] {
            let (status, body) = send(app(), post_json(uri, json!({}))).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{}", uri);
            assert_eq!(body, json!({ "error": "Method not allowed" }), "{}", uri);
        }
        for uri in ["/api/chat", "/api/contact"] {
            let request = Request::get(uri).body(Body::empty()).unwrap();
            let (status, body) = send(app(), request).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{}", uri);
            assert_eq!(body, json!({ "error": "Method not allowed" }), "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, body) =
            send(app(), Request::get("/api/nope").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Endpoint not found" }));

        let (status, _) = send(app(), Request::get("/about").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_chat_greeting_and_validation() {
        let (status, body) = send(app(), post_json("/api/chat", json!({ "message": "hi!" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["model"], "local-greeting");
        assert_eq!(body["provider"], "On-device");
        assert_eq!(body["metadata"]["runtime"]["tokens_per_second"], Value::Null);
        assert!(body["metadata"].get("timestamp").is_none());

        let (status, body) = send(app(), post_json("/api/chat", json!({ "message": "  " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Message cannot be empty" }));

        let (status, body) = send(
            app(),
            post_json("/api/chat", json!({ "message": "What are his skills?" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "AI service not configured" }));
    }

    #[tokio::test]
    async fn test_chat_rejects_malformed_history() {
        let request = post_json(
            "/api/chat",
            json!({
                "message": "Tell me more",
                "conversationHistory": [{ "role": "wizard", "content": "?" }],
            }),
        );
        let (status, body) = send(app(), request).await;
        assert!(status.is_client_error());
        assert!(body["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_contact_forwarded() {
        let mailer = Arc::new(RecordingMailer::default());
        let app = app_with(mailer.clone(), &Config::default());

        let (status, body) = send(
            app,
            post_json(
                "/api/contact",
                json!({
                    "name": "Ada",
                    "email": "ada@example.com",
                    "subject": "Role",
                    "message": "Are you available?",
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "message": "Email sent successfully" }));
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Role");
    }

    #[tokio::test]
    async fn test_contact_accepts_url_encoded_form() {
        let mailer = Arc::new(RecordingMailer::default());
        let app = app_with(mailer.clone(), &Config::default());

        let request = Request::post("/api/contact")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(
                "name=Ada+Lovelace&email=ada%40example.com&subject=Role&message=Are+you+available%3F",
            ))
            .unwrap();
        let (status, body) = send(app.clone(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "message": "Email sent successfully" }));
        let sent = mailer.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].name, "Ada Lovelace");
        assert_eq!(sent[0].email, "ada@example.com");
        assert_eq!(sent[0].message, "Are you available?");

        let request = Request::post("/api/contact")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("name=Ada&email=ada%40example.com"))
            .unwrap();
        let (status, body) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "All fields are required" }));

        let request = Request::post("/api/contact")
            .header("content-type", "text/plain")
            .body(Body::from("hello"))
            .unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(body["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_contact_validation() {
        let (status, body) = send(
            app(),
            post_json("/api/contact", json!({ "name": "Ada", "email": "ada@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "All fields are required" }));

        let (status, body) = send(
            app(),
            post_json(
                "/api/contact",
                json!({ "name": "Ada", "email": "nope", "subject": "s", "message": "m" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid email address" }));
    }

    #[tokio::test]
    async fn test_contact_send_failure() {
        let mailer = Arc::new(RecordingMailer {
            fail: true,
            ..RecordingMailer::default()
        });
        let form = json!({ "name": "Ada", "email": "ada@example.com", "subject": "s", "message": "m" });

        let (status, body) = send(
            app_with(mailer.clone(), &Config::default()),
            post_json("/api/contact", form.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "success": false, "error": "Internal server error" }));

        let mut config = Config::default();
        config.server.environment = Environment::Development;
        let (_, body) = send(app_with(mailer, &config), post_json("/api/contact", form)).await;
        assert_eq!(body["error"], "relay refused connection");
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/chat")
            .header("origin", "http://localhost:5173")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        let headers = response.headers();
        assert_eq!(
            headers["access-control-allow-origin"],
            "http://localhost:5173"
        );
        assert_eq!(headers["access-control-allow-credentials"], "true");

        let request = Request::get("/api/health")
            .header("origin", "https://evil.example.com")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn test_static_dir_serves_spa() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>spa</html>").unwrap();

        let mut config = Config::default();
        config.server.static_dir = Some(dir.path().to_path_buf());
        let app = app_with(Arc::new(RecordingMailer::default()), &config);

        let response = app
            .clone()
            .oneshot(Request::get("/projects").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"<html>spa</html>");

        let (status, _) = send(app, Request::get("/api/missing").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod core;

use std::sync::Arc;

use axum::extract::{RawQuery, State};
use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::core::feed::fetcher::{build_client, FetchError};
use crate::core::shelf::params::ShelfParams;
use crate::core::shelf::render_shelf;

pub use crate::core::config::{ConfigError, ServiceConfig};

const CACHE_MINUTES: u64 = 15;
const JSON_CONTENT_TYPE: &str = "application/json";
const INVALID_REQUEST_BODY: &str = r#"{"error":"Please provide a userId and shelf in the query parameters","exampleRequest":"/?userId=982451924&shelf=test"}"#;
const UNEXPECTED_ERROR_BODY: &str = r#"{"error":"Unexpected error occured"}"#;

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("http client setup failed: {0}")]
    Client(#[from] FetchError),
    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
struct SharedState {
    client: reqwest::Client,
    upstream: Arc<str>,
}

async fn shelf_feed(State(state): State<SharedState>, RawQuery(query): RawQuery) -> Response {
    let params = match ShelfParams::from_query(query.as_deref()) {
        Ok(params) => params,
        Err(error) => {
            tracing::debug!(%error, "rejecting shelf request");
            return error_response(INVALID_REQUEST_BODY);
        }
    };

    match render_shelf(&state.client, &state.upstream, &params).await {
        Ok((count, body)) => {
            tracing::debug!(user_id = %params.user_id, shelf = %params.shelf, count, "served shelf");
            (
                StatusCode::OK,
                [
                    (CONTENT_TYPE, JSON_CONTENT_TYPE.to_string()),
                    (CACHE_CONTROL, cache_control()),
                ],
                body,
            )
                .into_response()
        }
        Err(error) => {
            tracing::warn!(
                user_id = %params.user_id,
                shelf = %params.shelf,
                stage = error.stage(),
                %error,
                "shelf request failed"
            );
            error_response(UNEXPECTED_ERROR_BODY)
        }
    }
}

// Errors never carry a cache directive.
fn error_response(body: &'static str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        [(CONTENT_TYPE, JSON_CONTENT_TYPE)],
        body,
    )
        .into_response()
}

fn cache_control() -> String {
    format!("public, max-age={}", CACHE_MINUTES * 60)
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .fallback(shelf_feed)
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

pub async fn run(config: ServiceConfig) -> Result<(), ServeError> {
    config.validate()?;
    let state = SharedState {
        client: build_client(config.timeout())?,
        upstream: Arc::from(config.upstream.trim()),
    };

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!(addr = %config.bind, upstream = %state.upstream, "shelf feed listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shelf feed stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query};
    use axum::routing::get;
    use std::collections::HashMap;
    use std::time::Duration;

    const FIXTURE: &str = include_str!("../fixtures/goodreads/shelf.rss.xml");
    const BOOK_WITHOUT_PAGES: &str = r#"<?xml version="1.0"?>
        <rss version="2.0"><channel><title>odd</title>
          <item><title>Odd</title><book id="1"></book></item>
        </channel></rss>"#;

    async fn upstream_feed(
        Path(user_id): Path<String>,
        Query(query): Query<HashMap<String, String>>,
    ) -> Response {
        let shelf = query.get("shelf").map(String::as_str).unwrap_or_default();
        match (user_id.as_str(), shelf) {
            ("98245", "test") => FIXTURE.into_response(),
            ("1", "empty") => r#"<?xml version="1.0"?><rss version="2.0"><channel><title>none</title></channel></rss>"#
                .into_response(),
            ("500", _) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            ("garbage", _) => "<html><body>not a feed</body></html>".into_response(),
            ("odd", _) => BOOK_WITHOUT_PAGES.into_response(),
            _ => StatusCode::NOT_FOUND.into_response(),
        }
    }

    async fn spawn(app: Router) -> (String, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let address = listener.local_addr().expect("local addr should exist");
        let join_handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server should run");
        });
        (format!("http://{address}"), join_handle)
    }

    async fn spawn_app(upstream: &str) -> (String, tokio::task::JoinHandle<()>) {
        let state = SharedState {
            client: build_client(Duration::from_secs(5)).expect("client should build"),
            upstream: Arc::from(upstream),
        };
        spawn(build_router(state)).await
    }

    async fn spawn_stack() -> (String, Vec<tokio::task::JoinHandle<()>>) {
        let upstream_router =
            Router::new().route("/review/list_rss/{user_id}", get(upstream_feed));
        let (upstream_url, upstream_task) = spawn(upstream_router).await;
        let (app_url, app_task) = spawn_app(&upstream_url).await;
        (app_url, vec![upstream_task, app_task])
    }

    fn header<'a>(response: &'a reqwest::Response, name: &str) -> Option<&'a str> {
        response
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    #[tokio::test]
    async fn serves_normalized_shelf_with_cache_header() {
        let (app_url, tasks) = spawn_stack().await;

        let response = reqwest::get(format!("{app_url}/?userId=98&userId=245&shelf=test"))
            .await
            .expect("request should complete");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, "access-control-allow-origin"), Some("*"));
        assert_eq!(header(&response, "content-type"), Some("application/json"));
        assert_eq!(
            header(&response, "cache-control"),
            Some("public, max-age=900")
        );

        let body: serde_json::Value = response.json().await.expect("body should be json");
        let items = body["items"].as_array().expect("items should be an array");
        assert_eq!(body["count"], 3);
        assert_eq!(items.len(), 3);

        let titles: Vec<_> = items.iter().map(|item| item["title"].as_str()).collect();
        assert_eq!(
            titles,
            vec![Some("The Hobbit"), Some("Dune"), Some("Untracked Pamphlet")]
        );

        assert_eq!(items[0]["id"], "5907");
        assert_eq!(items[0]["isbn"], "0618260307");
        assert_eq!(items[0]["author"], "J.R.R. Tolkien");
        assert_eq!(items[0]["published"], "1937");
        assert_eq!(items[0]["rating"], 4.29);
        assert_eq!(items[0]["pages"], 366);
        assert_eq!(
            items[0]["image"]["large"],
            "https://images.example.com/books/5907l.jpg"
        );

        assert_eq!(items[1]["isbn"], "");
        assert_eq!(items[1]["pages"], 658);

        assert_eq!(items[2]["description"], "");
        assert_eq!(items[2]["author"], "");
        assert_eq!(items[2]["image"]["small"], "");
        assert_eq!(items[2]["rating"], serde_json::Value::Null);
        assert_eq!(items[2]["pages"], 0);
        assert!(items[2].get("isbn").is_none());
        assert!(items[2].get("published").is_none());

        tasks.iter().for_each(|task| task.abort());
    }

    #[tokio::test]
    async fn empty_shelf_has_zero_count() {
        let (app_url, tasks) = spawn_stack().await;

        let response = reqwest::get(format!("{app_url}/?userId=1&shelf=empty"))
            .await
            .expect("request should complete");
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = response.json().await.expect("body should be json");
        assert_eq!(body, serde_json::json!({ "count": 0, "items": [] }));

        tasks.iter().for_each(|task| task.abort());
    }

    #[tokio::test]
    async fn missing_params_get_the_invalid_request_payload() {
        let (app_url, tasks) = spawn_stack().await;
        let client = reqwest::Client::new();

        for path in ["/", "/?shelf=test", "/?userId=982451924", "/?userId=&shelf=test"] {
            let response = client
                .get(format!("{app_url}{path}"))
                .send()
                .await
                .expect("request should complete");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "path {path}");
            assert_eq!(header(&response, "access-control-allow-origin"), Some("*"));
            assert_eq!(header(&response, "content-type"), Some("application/json"));
            assert_eq!(header(&response, "cache-control"), None);
            let body = response.text().await.expect("body should be text");
            assert_eq!(body, INVALID_REQUEST_BODY);
        }

        let response = client
            .post(format!("{app_url}/any/path?userId=1"))
            .send()
            .await
            .expect("request should complete");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.text().await.expect("body should be text"),
            INVALID_REQUEST_BODY
        );

        tasks.iter().for_each(|task| task.abort());
    }

    #[tokio::test]
    async fn processing_failures_collapse_into_one_payload() {
        let (app_url, tasks) = spawn_stack().await;
        let client = reqwest::Client::new();

        for user_id in ["500", "404", "garbage", "odd"] {
            let response = client
                .get(format!("{app_url}/?userId={user_id}&shelf=test"))
                .send()
                .await
                .expect("request should complete");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "user {user_id}");
            assert_eq!(header(&response, "access-control-allow-origin"), Some("*"));
            assert_eq!(header(&response, "content-type"), Some("application/json"));
            assert_eq!(header(&response, "cache-control"), None);
            let body = response.text().await.expect("body should be text");
            assert_eq!(body, UNEXPECTED_ERROR_BODY);
        }

        tasks.iter().for_each(|task| task.abort());
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_processing_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let dead_address = listener.local_addr().expect("local addr should exist");
        drop(listener);
        let (app_url, app_task) = spawn_app(&format!("http://{dead_address}")).await;

        let response = reqwest::get(format!("{app_url}/?userId=1&shelf=test"))
            .await
            .expect("request should complete");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.text().await.expect("body should be text"),
            UNEXPECTED_ERROR_BODY
        );

        app_task.abort();
    }

    #[test]
    fn fixed_payloads_are_valid_json() {
        let invalid: serde_json::Value =
            serde_json::from_str(INVALID_REQUEST_BODY).expect("payload should be json");
        assert_eq!(invalid["exampleRequest"], "/?userId=982451924&shelf=test");
        let unexpected: serde_json::Value =
            serde_json::from_str(UNEXPECTED_ERROR_BODY).expect("payload should be json");
        assert_eq!(unexpected["error"], "Unexpected error occured");
        assert_eq!(cache_control(), "public, max-age=900");
    }
}

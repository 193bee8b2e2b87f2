//! The request pipeline wrapped around the whole router.
//!
//! Outermost first: recovery, CORS, logging, request timeout. A request
//! passes through each stage in that order and the response comes back the
//! opposite way.

use axum::extract::Request;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use openbpl_types::api::Envelope;
use std::any::Any;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;
use uuid::Uuid;

use crate::errors::INTERNAL_ERROR_MESSAGE;

/// Applies the pipeline once to a fully built router (routes, nested
/// services and fallback included). A request still unanswered after
/// `request_timeout` is cut off with `408 Request Timeout`.
pub fn wrap(router: Router, request_timeout: Duration) -> Router {
    // axum runs the last layer added first, so add innermost first.
    router
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(make_span)
                .on_request(on_request)
                .on_response(on_response),
        )
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::custom(recover))
}

fn make_span(request: &Request) -> Span {
    let request_id = Uuid::new_v4();
    tracing::info_span!(
        "http_request",
        %request_id,
        method = %request.method(),
        path = %request.uri().path()
    )
}

fn on_request(request: &Request, span: &Span) {
    tracing::info!(
        parent: span,
        method = %request.method(),
        uri = %request.uri(),
        "request"
    );
}

/// `latency` is measured up to the response head; body streaming time is
/// not included.
fn on_response(response: &Response, latency: Duration, span: &Span) {
    tracing::info!(
        parent: span,
        status = %response.status(),
        latency_ms = %latency.as_millis(),
        "response"
    );
}

/// Turns a panic inside the pipeline into a 500 for that request only.
///
/// The panic unwinds past the CORS stage, so the permissive origin header
/// is set here as well.
fn recover(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "non-string panic payload"
    };
    tracing::error!(panic = %detail, "recovered from panic while handling request");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        )],
        Json(Envelope::<()>::error(INTERNAL_ERROR_MESSAGE)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use axum::routing::get;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    async fn boom() -> &'static str {
        panic!("handler exploded");
    }

    async fn slow() -> &'static str {
        tokio::time::sleep(Duration::from_secs(5)).await;
        "late"
    }

    fn app() -> Router {
        wrap(
            Router::new()
                .route("/ok", get(|| async { "ok" }))
                .route("/boom", get(boom))
                .route("/slow", get(slow)),
            Duration::from_millis(100),
        )
    }

    /// Collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test]
    async fn panic_becomes_500_with_cors_header() {
        let resp = app()
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            HeaderValue::from_static("*")
        );
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], INTERNAL_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn normal_response_carries_cors_header() {
        let resp = app()
            .oneshot(
                Request::builder()
                    .uri("/ok")
                    .header(header::ORIGIN, "https://dashboard.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            HeaderValue::from_static("*")
        );
    }

    #[tokio::test]
    async fn preflight_short_circuits() {
        let resp = app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/boom")
                    .header(header::ORIGIN, "https://dashboard.example")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        // Never reaches the panicking handler.
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());

        // Any OPTIONS is answered as a preflight, request-method header or not.
        let resp = app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/boom")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            HeaderValue::from_static("*")
        );
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn slow_request_is_cut_off() {
        let started = std::time::Instant::now();
        let resp = app()
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::REQUEST_TIMEOUT);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            HeaderValue::from_static("*")
        );
    }

    #[tokio::test]
    async fn logs_method_path_status_and_latency() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .finish();
        // Current-thread runtime: the default stays in place across awaits.
        let _guard = tracing::subscriber::set_default(subscriber);

        let resp = app()
            .oneshot(
                Request::builder()
                    .uri("/ok?verbose=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let logs = captured.contents();
        assert!(logs.contains("http_request"), "{logs}");
        assert!(logs.contains("request_id="), "{logs}");
        assert!(logs.contains("method=GET"), "{logs}");
        assert!(logs.contains("path=/ok"), "{logs}");
        assert!(logs.contains("uri=/ok?verbose=1"), "{logs}");
        assert!(logs.contains("status=200 OK"), "{logs}");
        assert!(logs.contains("latency_ms="), "{logs}");
    }
}

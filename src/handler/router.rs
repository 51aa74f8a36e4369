//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method and path dispatch,
//! body size guard, and access logging.

use crate::config::AppState;
use crate::handler::archive;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, SERVER};
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

pub const ARCHIVE_PATH: &str = "/archive";
pub const LIVENESS_PATH: &str = "/healthz";
pub const READINESS_PATH: &str = "/readyz";

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let mut entry = access_entry(&req, peer_addr);

    let mut response = route_request(req, &state).await;

    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server);
    }

    if state.config.logging.access_log {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Dispatch on path, then method
async fn route_request<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match req.uri().path() {
        ARCHIVE_PATH => {
            if req.method() != Method::POST {
                return http::build_405_response("POST");
            }
            if let Some(resp) = check_body_size(&req, state.config.http.max_body_size) {
                return resp;
            }
            archive::handle_archive(req, &state.archiver, state.config.http.max_body_size).await
        }
        LIVENESS_PATH => match *req.method() {
            Method::GET | Method::HEAD => http::build_health_response(StatusCode::OK, "ok"),
            _ => http::build_405_response("GET, HEAD"),
        },
        READINESS_PATH => match *req.method() {
            Method::GET | Method::HEAD => readiness(state),
            _ => http::build_405_response("GET, HEAD"),
        },
        _ => http::build_404_response(),
    }
}

/// Ready when the archiver executable can be found
fn readiness(state: &AppState) -> Response<Full<Bytes>> {
    if state.archiver.is_available() {
        http::build_health_response(StatusCode::OK, "ok")
    } else {
        logger::log_warning(&format!(
            "Readiness check failed: archiver '{}' not found",
            state.archiver.program().display()
        ));
        http::build_health_response(StatusCode::SERVICE_UNAVAILABLE, "archiver unavailable")
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get("content-length")?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_warning(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

fn access_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = format!("{:?}", req.version())
        .trim_start_matches("HTTP/")
        .to_string();
    entry.user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archiver::Archiver;
    use crate::config::Config;

    fn state_with(program: &str) -> Arc<AppState> {
        let mut config = Config::defaults();
        config.logging.access_log = false;
        config.http.max_body_size = 128;
        Arc::new(AppState::with_archiver(
            &config,
            Archiver::with_leading_args(program, Vec::new()),
        ))
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    fn request(method: &str, path: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(path)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    async fn send(state: &Arc<AppState>, req: Request<Full<Bytes>>) -> Response<Full<Bytes>> {
        handle_request(req, Arc::clone(state), peer()).await.unwrap()
    }

    #[tokio::test]
    async fn test_unknown_path_404() {
        let state = state_with("/nonexistent/archiver");
        let resp = send(&state, request("GET", "/nope")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_archive_requires_post() {
        let state = state_with("/nonexistent/archiver");
        let resp = send(&state, request("GET", ARCHIVE_PATH)).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["Allow"], "POST");
    }

    #[tokio::test]
    async fn test_declared_length_over_limit() {
        let state = state_with("/nonexistent/archiver");
        let req = Request::builder()
            .method("POST")
            .uri(ARCHIVE_PATH)
            .header("Content-Type", "application/json")
            .header("Content-Length", "4096")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let resp = send(&state, req).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_missing_source_through_router() {
        let state = state_with("/nonexistent/archiver");
        let req = Request::builder()
            .method("POST")
            .uri(ARCHIVE_PATH)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(r#"{"url":"  "}"#)))
            .unwrap();
        let resp = send(&state, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_liveness() {
        let state = state_with("/nonexistent/archiver");
        let resp = send(&state, request("GET", LIVENESS_PATH)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Server"], "archive-gateway");
    }

    #[tokio::test]
    async fn test_readiness_without_archiver() {
        let state = state_with("/nonexistent/archiver");
        let resp = send(&state, request("GET", READINESS_PATH)).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_readiness_with_archiver() {
        let state = state_with("sh");
        let resp = send(&state, request("HEAD", READINESS_PATH)).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_access_entry_fields() {
        let req = Request::builder()
            .method("POST")
            .uri("/archive?debug=1")
            .header("User-Agent", "curl/8.5")
            .body(())
            .unwrap();
        let entry = access_entry(&req, peer());
        assert_eq!(entry.remote_addr, "127.0.0.1");
        assert_eq!(entry.path, "/archive");
        assert_eq!(entry.query.as_deref(), Some("debug=1"));
        assert_eq!(entry.http_version, "1.1");
        assert_eq!(entry.user_agent.as_deref(), Some("curl/8.5"));
    }
}

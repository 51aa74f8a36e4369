//! Archive endpoint
//!
//! Decodes the JSON request, runs the archiver and maps the outcome to a
//! response. Nothing is spawned for a request that fails validation.

use crate::archiver::{ArchiveError, ArchiveRequest, Archiver};
use crate::http::{self, Problem};
use crate::logger;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Request, Response, StatusCode};

/// `POST /archive`
pub async fn handle_archive<B>(
    req: Request<B>,
    archiver: &Archiver,
    max_body_size: u64,
) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if !is_json_content_type(&req) {
        return http::build_415_response();
    }

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let body = match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_warning(&format!("Request body exceeds {max_body_size} bytes"));
            return http::build_413_response();
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            return http::build_400_response("Failed to read request body");
        }
    };

    let request: ArchiveRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            logger::log_warning(&format!("Invalid archive request JSON: {e}"));
            return http::build_400_response(&format!("Invalid JSON: {e}"));
        }
    };

    handle(&request, archiver).await
}

/// Run one archive request and build the response for it
pub async fn handle(request: &ArchiveRequest, archiver: &Archiver) -> Response<Full<Bytes>> {
    match archiver.archive(request).await {
        Ok(doc) => http::build_document_response(doc.body, doc.content_type),
        Err(ArchiveError::Invalid(e)) => {
            logger::log_warning(&format!("Rejected archive request: {e}"));
            http::build_400_response(&e.to_string())
        }
        Err(ArchiveError::Launch(e)) => {
            logger::log_error(&format!(
                "Failed to run archiver '{}': {e}",
                archiver.program().display()
            ));
            http::build_problem_response(
                &Problem::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to run archiver")
                    .with_detail(e.to_string()),
            )
        }
        Err(ArchiveError::Failed(result)) => {
            logger::log_warning(&format!(
                "Archiver exited with code {}: {}",
                result.exit_code,
                result.stderr.trim()
            ));
            http::build_problem_response(
                &Problem::new(StatusCode::INTERNAL_SERVER_ERROR, "Archiving failed")
                    .with_detail(result.stderr)
                    .with_exit_code(result.exit_code),
            )
        }
    }
}

/// Missing content type is accepted; anything else must be JSON
fn is_json_content_type<B>(req: &Request<B>) -> bool {
    req.headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_none_or(|ct| {
            let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
}

//! Admission gate for the `/api/v1` routes.
//!
//! Runs the [`AdmissionPipeline`](crate::admission::AdmissionPipeline) in
//! front of every utility handler. The body is only read once the caller is
//! authenticated and counted; the validated payload then travels to the
//! handler as a request extension.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use multer::{Constraints, Multipart, SizeLimit};

use crate::admission::Admission;
use crate::http::request::request_id;
use crate::http::response::{append_quota_headers, ApiError};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::validation::{EndpointId, FieldError, RawPayload, Upload};

pub async fn admission_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let start = Instant::now();

    let Some(endpoint) = EndpointId::from_path(request.uri().path()) else {
        return next.run(request).await;
    };

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let fingerprint = state.fingerprints.extract(request.headers(), peer);
    let request_id = request_id(&request).to_owned();

    let (mut parts, body) = request.into_parts();
    let secret = parts
        .headers
        .get(&state.secret_header)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let method = parts.method.clone();
    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let query = parts.uri.query().map(str::to_owned);
    let body_limit = state.body_limit;

    let outcome = state
        .pipeline
        .admit(&fingerprint, secret.as_deref(), endpoint, || {
            read_payload(method, content_type, query, body, body_limit)
        })
        .await;

    let response = match outcome {
        Ok(Admission { quota, payload }) => {
            parts.extensions.insert(payload);
            let mut response = next.run(Request::from_parts(parts, Body::empty())).await;
            append_quota_headers(response.headers_mut(), &quota);
            response
        }
        Err(rejection) => {
            tracing::info!(
                request_id = %request_id,
                client = %fingerprint,
                endpoint = %endpoint,
                reason = rejection.reason().as_str(),
                "Request not admitted"
            );
            ApiError::from(rejection).into_response()
        }
    };

    metrics::record_request(endpoint.as_str(), response.status().as_u16(), start);
    response
}

/// Read the request into the shape the validator expects.
async fn read_payload(
    method: Method,
    content_type: Option<String>,
    query: Option<String>,
    body: Body,
    limit: usize,
) -> Result<RawPayload, FieldError> {
    if method == Method::GET {
        let params = url::form_urlencoded::parse(query.unwrap_or_default().as_bytes())
            .into_owned()
            .collect();
        return Ok(RawPayload::Query(params));
    }

    if let Some(boundary) = content_type.as_deref().and_then(|ct| multer::parse_boundary(ct).ok()) {
        return read_multipart(body, boundary, limit).await;
    }

    axum::body::to_bytes(body, limit)
        .await
        .map(RawPayload::Json)
        .map_err(|e| {
            tracing::debug!(error = %e, "Failed to read request body");
            FieldError::new("body", "Request body could not be read")
        })
}

async fn read_multipart(body: Body, boundary: String, limit: usize) -> Result<RawPayload, FieldError> {
    let constraints = Constraints::new().size_limit(SizeLimit::new().whole_stream(limit as u64));
    let mut multipart = Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_owned();
        let filename = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(|m| m.to_string());
        let bytes = field.bytes().await.map_err(multipart_error)?;
        uploads.push(Upload { field: name, filename, content_type, bytes });
    }

    Ok(RawPayload::Multipart(uploads))
}

fn multipart_error(e: multer::Error) -> FieldError {
    tracing::debug!(error = %e, "Malformed multipart body");
    FieldError::new("body", format!("Invalid multipart body: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_reads_query() {
        let raw = read_payload(
            Method::GET,
            None,
            Some("url=https%3A%2F%2Fexample.com%2Fa%3Fb%3D1".into()),
            Body::empty(),
            1024,
        )
        .await
        .unwrap();

        let RawPayload::Query(params) = raw else { panic!("expected query") };
        assert_eq!(params["url"], "https://example.com/a?b=1");
    }

    #[tokio::test]
    async fn test_post_reads_json_bytes() {
        let raw = read_payload(
            Method::POST,
            Some("application/json".into()),
            None,
            Body::from(r#"{"text":"hi"}"#),
            1024,
        )
        .await
        .unwrap();

        let RawPayload::Json(bytes) = raw else { panic!("expected json") };
        assert_eq!(&bytes[..], br#"{"text":"hi"}"#);
    }

    #[tokio::test]
    async fn test_oversized_body_is_field_error() {
        let err = read_payload(Method::POST, None, None, Body::from(vec![b'x'; 64]), 16)
            .await
            .unwrap_err();
        assert_eq!(err.field, "body");
    }

    #[tokio::test]
    async fn test_multipart_parts_collected() {
        let body = "--XYZ\r\n\
                    Content-Disposition: form-data; name=\"file\"; filename=\"dot.png\"\r\n\
                    Content-Type: image/png\r\n\r\n\
                    PNGDATA\r\n\
                    --XYZ--\r\n";
        let raw = read_payload(
            Method::POST,
            Some("multipart/form-data; boundary=XYZ".into()),
            None,
            Body::from(body),
            1024,
        )
        .await
        .unwrap();

        let RawPayload::Multipart(parts) = raw else { panic!("expected multipart") };
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].field, "file");
        assert_eq!(parts[0].filename.as_deref(), Some("dot.png"));
        assert_eq!(parts[0].content_type.as_deref(), Some("image/png"));
        assert_eq!(&parts[0].bytes[..], b"PNGDATA");
    }

    #[tokio::test]
    async fn test_truncated_multipart_rejected() {
        let err = read_payload(
            Method::POST,
            Some("multipart/form-data; boundary=XYZ".into()),
            None,
            Body::from("--XYZ\r\nContent-Disposition: form-data; name=\"file\"\r\n\r\nno end"),
            1024,
        )
        .await
        .unwrap_err();
        assert_eq!(err.field, "body");
    }
}

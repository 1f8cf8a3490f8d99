//! Response mapping and diagnostic pages.
//!
//! # Responsibilities
//! - Map an invocation result onto an HTTP response, defaulting missing fields
//! - Render the "handler not available" page
//! - Render the handler error page (trace text only in development)
//!
//! # Design Decisions
//! - No content-type inference; the handler's headers are written as given
//! - Results that HTTP cannot carry (bad status, bad header) become errors

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::Response,
};

use crate::handler::{InvocationError, InvocationResult};

/// Build the client response for a successful invocation.
pub fn result_to_response(result: InvocationResult) -> Result<Response, InvocationError> {
    let status_code = result.status_or_default();
    let status = StatusCode::from_u16(status_code).map_err(|_| {
        InvocationError::MalformedResult(format!("invalid status code {}", status_code))
    })?;

    let mut response = Response::new(Body::from(result.body.unwrap_or_default()));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for (name, value) in result.headers.unwrap_or_default() {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            InvocationError::MalformedResult(format!("invalid header name '{}'", name))
        })?;
        let header_value = HeaderValue::from_str(&value).map_err(|_| {
            InvocationError::MalformedResult(format!("invalid value for header '{}'", name))
        })?;
        headers.append(header_name, header_value);
    }

    Ok(response)
}

/// 500 page shown when no handler could be loaded.
pub fn unavailable_page(artifact_path: &str, watch_command: &str) -> Response {
    html_error(format!(
        r#"<!DOCTYPE html>
<html>
  <head><title>Dev Server Error</title></head>
  <body>
    <h1>Lambda Handler Not Available</h1>
    <p>Make sure the lambda build is running:</p>
    <pre>{}</pre>
    <p>And that the compiled file exists at: <code>{}</code></p>
    <p><a href="javascript:location.reload()">Reload</a></p>
  </body>
</html>
"#,
        escape_html(watch_command),
        escape_html(artifact_path)
    ))
}

/// 500 page shown when the handler failed.
///
/// With `expose_errors` off the trace is withheld.
pub fn handler_error_page(error: &InvocationError, expose_errors: bool) -> Response {
    let detail = if expose_errors {
        format!("<pre>{}</pre>", escape_html(&error.trace_text()))
    } else {
        "<p>The request could not be completed.</p>".to_string()
    };

    html_error(format!(
        r#"<!DOCTYPE html>
<html>
  <head><title>Lambda Error</title></head>
  <body>
    <h1>Lambda Handler Error</h1>
    {}
    <p><a href="javascript:location.reload()">Reload</a></p>
  </body>
</html>
"#,
        detail
    ))
}

fn html_error(page: String) -> Response {
    let mut response = Response::new(Body::from(page));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
    response
}

/// Escape text placed inside an element. Quotes are left alone; they only
/// matter in attribute values.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerError;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_result_defaults() {
        let response = result_to_response(InvocationResult::default()).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().is_empty());
        assert_eq!(body_text(response).await, "");
    }

    #[tokio::test]
    async fn test_result_is_written_as_given() {
        let result = InvocationResult::ok("<h1>Not here</h1>")
            .with_status(404)
            .with_header("Content-Type", "text/html; charset=utf-8")
            .with_header("cache-control", "no-store");
        let response = result_to_response(result).unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["content-type"], "text/html; charset=utf-8");
        assert_eq!(response.headers()["cache-control"], "no-store");
        assert_eq!(body_text(response).await, "<h1>Not here</h1>");
    }

    #[test]
    fn test_invalid_status_is_malformed() {
        let result = InvocationResult::default().with_status(42);
        assert!(matches!(
            result_to_response(result),
            Err(InvocationError::MalformedResult(_))
        ));
    }

    #[test]
    fn test_invalid_header_is_malformed() {
        let result = InvocationResult::default().with_header("bad header", "x");
        assert!(matches!(
            result_to_response(result),
            Err(InvocationError::MalformedResult(_))
        ));
    }

    #[tokio::test]
    async fn test_unavailable_page_names_artifact_and_command() {
        let response = unavailable_page("target/lambda/handler.wasm", "cargo run --bin lambda-watch");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["content-type"], "text/html");

        let body = body_text(response).await;
        assert!(body.contains("Lambda Handler Not Available"));
        assert!(body.contains("target/lambda/handler.wasm"));
        assert!(body.contains("cargo run --bin lambda-watch"));
    }

    #[tokio::test]
    async fn test_unavailable_page_keeps_quotes_in_path() {
        let path = "/home/o'neil/\"blog\"/handler.wasm";
        let body = body_text(unavailable_page(path, "cargo run --bin lambda-watch")).await;
        assert!(body.contains(path));
    }

    #[tokio::test]
    async fn test_error_page_escapes_trace() {
        let error = InvocationError::Threw(HandlerError::with_trace("x", "Error: <script>alert(1)</script>"));
        let body = body_text(handler_error_page(&error, true)).await;
        assert!(body.contains("&lt;script&gt;"));
        assert!(!body.contains("<script>"));
    }

    #[tokio::test]
    async fn test_error_page_hides_trace_outside_development() {
        let error = InvocationError::Failed(HandlerError::new("database password is hunter2"));
        let body = body_text(handler_error_page(&error, false)).await;
        assert!(body.contains("Lambda Handler Error"));
        assert!(!body.contains("hunter2"));
    }
}

//! HTTP request → invocation event/context translation.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::http::{header, HeaderMap, Request};
use chrono::{SecondsFormat, Utc};
use rand::Rng;
use url::Url;

use crate::config::FunctionConfig;
use crate::event::types::{HttpContext, InvocationContext, InvocationEvent, RequestContext};

/// Authority used when the request carries no usable `Host` header.
pub const FALLBACK_AUTHORITY: &str = "localhost";

const REQUEST_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const REQUEST_ID_LEN: usize = 9;

/// Build the invocation event for an inbound request.
pub fn to_invocation_event<B>(request: &Request<B>, peer: Option<SocketAddr>) -> InvocationEvent {
    let (path, raw_query, query) = match resolve_url(request) {
        Some(url) => (
            url.path().to_string(),
            url.query().unwrap_or_default().to_string(),
            url.query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect::<BTreeMap<_, _>>(),
        ),
        None => ("/".to_string(), String::new(), BTreeMap::new()),
    };
    let method = request.method().as_str().to_string();

    let headers = flatten_headers(request.headers());
    let user_agent = headers.get(header::USER_AGENT.as_str()).cloned();

    InvocationEvent {
        raw_path: Some(path.clone()),
        raw_query_string: Some(raw_query),
        headers,
        request_context: Some(RequestContext {
            http: HttpContext {
                method: method.clone(),
                path: path.clone(),
                protocol: format!("{:?}", request.version()),
                source_ip: peer.map(|addr| addr.ip().to_string()),
                user_agent,
            },
        }),
        path,
        http_method: method,
        query_string_parameters: Some(query),
        body: None,
        is_base64_encoded: Some(false),
    }
}

/// Build a fresh invocation context for the configured function.
pub fn to_invocation_context(function: &FunctionConfig) -> InvocationContext {
    InvocationContext::new(
        function.name.clone(),
        function.version.clone(),
        format!(
            "arn:aws:lambda:{}:{}:function:{}",
            function.region, function.account_id, function.name
        ),
        function.memory_limit_mb.to_string(),
        generate_request_id(),
        format!("/aws/lambda/{}", function.name),
        log_stream_name(),
        function.remaining_time_ms,
    )
}

/// Resolve the request target to an absolute URL.
///
/// `None` only for targets no authority can make sense of (e.g. `OPTIONS *`).
fn resolve_url<B>(request: &Request<B>) -> Option<Url> {
    let uri = request.uri();
    if uri.scheme().is_some() {
        if let Ok(url) = Url::parse(&uri.to_string()) {
            return Some(url);
        }
    }

    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let authority = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or(FALLBACK_AUTHORITY);

    Url::parse(&format!("http://{}{}", authority, target))
        .or_else(|_| Url::parse(&format!("http://{}{}", FALLBACK_AUTHORITY, target)))
        .ok()
}

fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = match value.to_str() {
            Ok(v) => v.to_string(),
            Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
        };
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    flat
}

fn generate_request_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..REQUEST_ID_LEN)
        .map(|_| REQUEST_ID_ALPHABET[rng.gen_range(0..REQUEST_ID_ALPHABET.len())] as char)
        .collect();
    format!("dev-{}", suffix)
}

fn log_stream_name() -> String {
    Utc::now()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

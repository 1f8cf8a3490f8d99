//! Invocation event and context value objects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The synthetic event handed to the handler for one request.
///
/// Carries the HTTP API (v2) fields and the REST API (v1) fields side by side.
/// The v2 fields are absent on literal events built by the test harness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvocationEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_query_string: Option<String>,

    /// Lowercase header names; repeated headers joined with ", ".
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_context: Option<RequestContext>,

    pub path: String,

    pub http_method: String,

    /// Decoded query parameters, last value wins on duplicate keys.
    pub query_string_parameters: Option<BTreeMap<String, String>>,

    pub body: Option<String>,

    /// Always `Some(false)` on HTTP events; omitted on literal events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_base64_encoded: Option<bool>,
}

impl InvocationEvent {
    /// A bare v1 event for a GET of `path`, as the test harness sends it.
    pub fn literal(path: &str) -> Self {
        Self {
            raw_path: None,
            raw_query_string: None,
            headers: BTreeMap::new(),
            request_context: None,
            path: path.to_string(),
            http_method: "GET".to_string(),
            query_string_parameters: None,
            body: None,
            is_base64_encoded: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestContext {
    pub http: HttpContext,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HttpContext {
    pub method: String,
    pub path: String,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Invocation metadata handed to the handler alongside the event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvocationContext {
    pub callback_waits_for_empty_event_loop: bool,
    pub function_name: String,
    pub function_version: String,
    pub invoked_function_arn: String,
    #[serde(rename = "memoryLimitInMB")]
    pub memory_limit_in_mb: String,
    pub aws_request_id: String,
    pub log_group_name: String,
    pub log_stream_name: String,
    remaining_time_in_millis: u64,
}

impl InvocationContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        function_name: String,
        function_version: String,
        invoked_function_arn: String,
        memory_limit_in_mb: String,
        aws_request_id: String,
        log_group_name: String,
        log_stream_name: String,
        remaining_time_in_millis: u64,
    ) -> Self {
        Self {
            callback_waits_for_empty_event_loop: false,
            function_name,
            function_version,
            invoked_function_arn,
            memory_limit_in_mb,
            aws_request_id,
            log_group_name,
            log_stream_name,
            remaining_time_in_millis,
        }
    }

    /// Time the handler may assume it has left. Constant; nothing enforces it.
    pub fn remaining_time_in_millis(&self) -> u64 {
        self.remaining_time_in_millis
    }
}

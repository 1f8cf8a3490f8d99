//! The value a handler completes with.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// HTTP-shaped invocation result. Every field is optional; the adapter
/// substitutes 200, no headers and an empty body for whatever is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InvocationResult {
    pub status_code: Option<u16>,
    pub headers: Option<BTreeMap<String, String>>,
    pub body: Option<String>,
    /// Passed through untouched; the body is written as given.
    pub is_base64_encoded: Option<bool>,
}

impl InvocationResult {
    /// A 200 result with the given body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status_code: Some(200),
            body: Some(body.into()),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn status_or_default(&self) -> u16 {
        self.status_code.unwrap_or(200)
    }

    pub fn body_or_default(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }
}

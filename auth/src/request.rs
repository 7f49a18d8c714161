//! Framework-independent view of an inbound request.
//!
//! Host adapters copy the parsed body, query string and path parameters of
//! their native request type into an [`AuthRequest`]. The strategy only ever
//! reads fields from it.

use crate::lookup::lookup_present;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a field was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Request body.
    Body,
    /// Query string.
    Query,
    /// Path parameters.
    Params,
}

/// Inbound request fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthRequest {
    /// Parsed request body (JSON or form fields).
    #[serde(default)]
    pub body: Value,

    /// Parsed query string.
    #[serde(default)]
    pub query: Value,

    /// Route path parameters.
    #[serde(default)]
    pub params: Value,
}

impl AuthRequest {
    /// Create an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set body fields.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Set query fields.
    #[must_use]
    pub fn with_query(mut self, query: Value) -> Self {
        self.query = query;
        self
    }

    /// Set path parameters.
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// Look up `field` in the given sources, in order.
    ///
    /// Missing fields, JSON `null` and empty strings are skipped so that a
    /// later source can still provide the value.
    #[must_use]
    pub fn field(&self, field: &str, sources: &[FieldSource]) -> Option<&Value> {
        sources
            .iter()
            .find_map(|source| lookup_present(self.source(*source), field))
    }

    /// Like [`field`](Self::field), but only string values count.
    ///
    /// A non-string value in one source does not hide a string in a later
    /// one.
    #[must_use]
    pub fn string_field(&self, field: &str, sources: &[FieldSource]) -> Option<&str> {
        sources.iter().find_map(|source| {
            lookup_present(self.source(*source), field).and_then(Value::as_str)
        })
    }

    const fn source(&self, source: FieldSource) -> &Value {
        match source {
            FieldSource::Body => &self.body,
            FieldSource::Query => &self.query,
            FieldSource::Params => &self.params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_priority() {
        let request = AuthRequest::new()
            .with_body(json!({ "token": "from-body" }))
            .with_query(json!({ "token": "from-query" }))
            .with_params(json!({ "token": "from-params" }));

        let all = [FieldSource::Body, FieldSource::Query, FieldSource::Params];
        assert_eq!(request.field("token", &all), Some(&json!("from-body")));

        let no_body = [FieldSource::Query, FieldSource::Params];
        assert_eq!(request.field("token", &no_body), Some(&json!("from-query")));
    }

    #[test]
    fn test_null_falls_through() {
        let request = AuthRequest::new()
            .with_body(json!({ "email": null }))
            .with_query(json!({ "email": "a@b.com" }));

        assert_eq!(
            request.field("email", &[FieldSource::Body, FieldSource::Query]),
            Some(&json!("a@b.com"))
        );
    }

    #[test]
    fn test_empty_string_falls_through() {
        let request = AuthRequest::new()
            .with_body(json!({ "email": "" }))
            .with_query(json!({ "email": "a@b.com" }));

        assert_eq!(
            request.field("email", &[FieldSource::Body, FieldSource::Query]),
            Some(&json!("a@b.com"))
        );
        assert_eq!(request.field("email", &[FieldSource::Body]), None);
    }

    #[test]
    fn test_string_field_skips_non_strings() {
        let request = AuthRequest::new()
            .with_body(json!({ "token": 42 }))
            .with_query(json!({ "token": "" }))
            .with_params(json!({ "token": "abc" }));

        let all = [FieldSource::Body, FieldSource::Query, FieldSource::Params];
        assert_eq!(request.string_field("token", &all), Some("abc"));
        assert_eq!(
            request.string_field("token", &[FieldSource::Body, FieldSource::Query]),
            None
        );
    }

    #[test]
    fn test_missing_everywhere() {
        let request = AuthRequest::new().with_query(json!({ "other": 1 }));
        assert_eq!(
            request.field("email", &[FieldSource::Body, FieldSource::Query]),
            None
        );
    }
}

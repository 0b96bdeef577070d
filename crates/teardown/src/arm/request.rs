//! Raw ARM request and response types

use super::error::{ProviderError, classify_response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// HTTP verbs used against Resource Manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Patch,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }

    /// True for verbs that change provider state
    pub fn is_mutation(self) -> bool {
        !matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single versioned request against a resource path
#[derive(Debug, Clone, PartialEq)]
pub struct ArmRequest {
    pub method: Method,
    /// Path below the endpoint, without query string
    pub path: String,
    /// Extra query parameters (api-version is added separately)
    pub query: Vec<(String, String)>,
    pub api_version: String,
    pub body: Option<Value>,
}

impl ArmRequest {
    pub fn new(method: Method, path: impl Into<String>, api_version: &str) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            api_version: api_version.to_string(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>, api_version: &str) -> Self {
        Self::new(Method::Get, path, api_version)
    }

    pub fn delete(path: impl Into<String>, api_version: &str) -> Self {
        Self::new(Method::Delete, path, api_version)
    }

    pub fn put(path: impl Into<String>, api_version: &str, body: Value) -> Self {
        Self::new(Method::Put, path, api_version).with_body(body)
    }

    pub fn patch(path: impl Into<String>, api_version: &str, body: Value) -> Self {
        Self::new(Method::Patch, path, api_version).with_body(body)
    }

    pub fn post(path: impl Into<String>, api_version: &str) -> Self {
        Self::new(Method::Post, path, api_version)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    /// Value of a query parameter, if set
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Status and decoded JSON body of an ARM response
#[derive(Debug, Clone, PartialEq)]
pub struct ArmResponse {
    pub status: u16,
    pub body: Value,
    /// `Azure-AsyncOperation` URL, or `Location` when that is absent
    pub operation: Option<String>,
}

impl ArmResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            operation: None,
        }
    }

    pub fn with_operation(mut self, url: impl Into<String>) -> Self {
        self.operation = Some(url.into());
        self
    }

    /// Operation to track when the provider accepted the request asynchronously
    pub fn pending_operation(&self) -> Option<&str> {
        match self.status {
            201 | 202 => self.operation.as_deref(),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Convert a non-success response into a classified error
    pub fn error(&self, path: &str) -> ProviderError {
        classify_response(self.status, &self.body, path)
    }

    /// Body of a 2xx response, or the classified error
    pub fn into_result(self, path: &str) -> Result<Value, ProviderError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(self.error(path))
        }
    }

    /// 2xx body, `None` for 404, error otherwise
    pub fn into_optional(self, path: &str) -> Result<Option<Value>, ProviderError> {
        if self.is_not_found() {
            return Ok(None);
        }
        let body = self.into_result(path)?;
        Ok(Some(body))
    }
}

/// Deserialize a response body into a typed payload
pub fn decode<T: DeserializeOwned>(body: Value, path: &str) -> Result<T, ProviderError> {
    serde_json::from_value(body).map_err(|source| ProviderError::Decode {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_range() {
        assert!(ArmResponse::new(200, Value::Null).is_success());
        assert!(ArmResponse::new(204, Value::Null).is_success());
        assert!(!ArmResponse::new(404, Value::Null).is_success());
    }

    #[test]
    fn test_into_optional_maps_404_to_none() {
        let res = ArmResponse::new(404, Value::Null);
        assert!(res.into_optional("/x").unwrap().is_none());

        let res = ArmResponse::new(200, json!({"id": "/x"}));
        assert_eq!(res.into_optional("/x").unwrap(), Some(json!({"id": "/x"})));
    }

    #[test]
    fn test_into_result_surfaces_provider_error() {
        let res = ArmResponse::new(
            400,
            json!({"error": {"code": "InvalidTemplate", "message": "bad"}}),
        );
        let err = res.into_result("/x").unwrap_err();
        assert_eq!(err.code(), Some("InvalidTemplate"));
    }

    #[test]
    fn test_operation_tracked_only_when_accepted() {
        let url = "https://management.azure.com/operations/op1?api-version=2024-04-01";
        let accepted = ArmResponse::new(202, Value::Null).with_operation(url);
        assert_eq!(accepted.pending_operation(), Some(url));

        let done = ArmResponse::new(200, Value::Null).with_operation(url);
        assert!(done.pending_operation().is_none());
        assert!(ArmResponse::new(202, Value::Null).pending_operation().is_none());
    }

    #[test]
    fn test_query_builder() {
        let req = ArmRequest::delete("/x", "2024-01-01").with_query("force", "true");
        assert_eq!(req.query_value("force"), Some("true"));
        assert!(req.method.is_mutation());
    }
}

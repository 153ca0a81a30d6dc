use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;

use crate::error::PortalError;

/// A request issued through [`AuthClient::send`](super::AuthClient::send).
///
/// `path` is relative to the configured base URL. The retry marker is internal:
/// the client sets it when it replays the request after a refresh, and a
/// marked request is never replayed again.
///
/// # Example
/// ```
/// use hackportal::http::RequestDescriptor;
/// use serde_json::json;
///
/// let request = RequestDescriptor::post("/teams")
///     .with_json(&json!({ "name": "Rustaceans" }))?
///     .with_query("event", "spring-2026");
/// assert!(!request.is_retried());
/// # Ok::<(), hackportal::error::PortalError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub headers: HeaderMap,
    retried: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, PortalError> {
        Ok(self.with_body(serde_json::to_value(body)?))
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, PortalError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| PortalError::InvalidArgument(format!("header name {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| PortalError::InvalidArgument(format!("header {name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Whether this request has already been replayed after a refresh.
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn constructors_set_method_and_path() {
        let request = RequestDescriptor::delete("/appeals/3");
        assert_eq!(request.method, Method::DELETE);
        assert_eq!(request.path, "/appeals/3");
        assert!(request.body.is_none());
        assert!(!request.is_retried());
    }

    #[test]
    fn with_json_serializes_body() {
        #[derive(Serialize)]
        struct Score {
            team: u32,
            points: u32,
        }
        let request = RequestDescriptor::post("/scores")
            .with_json(&Score { team: 4, points: 87 })
            .unwrap();
        assert_eq!(request.body, Some(json!({"team": 4, "points": 87})));
    }

    #[test]
    fn with_header_rejects_invalid_values() {
        let result = RequestDescriptor::get("/me").with_header("x-trace", "bad\nvalue");
        assert!(matches!(result, Err(PortalError::InvalidArgument(_))));
    }

    #[test]
    fn retry_marker_survives_clone() {
        let mut request = RequestDescriptor::get("/me");
        request.mark_retried();
        assert!(request.clone().is_retried());
    }
}

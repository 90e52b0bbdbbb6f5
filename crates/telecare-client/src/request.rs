//! Transport independent description of a gateway call

use http::Method;
use serde_json::Value;
use std::fmt;

/// A single call against the admin API
///
/// Paths are relative to the configured base URL and always start with `/`.
/// Query pairs keep their insertion order and empty values are sent as-is,
/// so `?month=&year=` reaches the server the same way the web client sends it.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Path relative to the base URL
    pub path: String,
    /// Ordered query parameters
    pub query: Vec<(String, String)>,
    /// JSON body
    pub body: Option<Value>,
    /// Extra request headers
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    /// Create a request for `method` and `path`
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    /// GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// POST request
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// PATCH request
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// DELETE request
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append a query parameter only when `value` is present
    #[must_use]
    pub fn query_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Append `page` and `limit`
    #[must_use]
    pub fn page(self, page: u32, limit: u32) -> Self {
        self.query("page", page).query("limit", limit)
    }

    /// Attach a JSON body
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Append a header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Value of the first query parameter named `key`
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of the first header named `name`, case-insensitive
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        for (i, (key, value)) in self.query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_builder_keeps_order_and_empty_values() {
        let request = ApiRequest::get("/admin/trends/consultations")
            .query("month", "")
            .query("year", "2024");

        assert_eq!(request.method, Method::GET);
        assert_eq!(request.query_value("month"), Some(""));
        assert_eq!(request.query_value("year"), Some("2024"));
        assert_eq!(
            request.to_string(),
            "GET /admin/trends/consultations?month=&year=2024"
        );
    }

    #[test]
    fn test_query_opt_and_page() {
        let request = ApiRequest::get("/admin/users")
            .query_opt("isActive", None::<bool>)
            .query_opt("role", Some("doctor"))
            .page(2, 10);

        assert_eq!(
            request.query,
            vec![
                ("role".to_string(), "doctor".to_string()),
                ("page".to_string(), "2".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
        assert_eq!(request.query_value("isActive"), None);
    }

    #[test]
    fn test_json_body_and_headers() {
        let request = ApiRequest::patch("/admin/users/7/status")
            .json(json!({"isActive": false}))
            .header("DeviceUniqueId", "abc");

        assert_eq!(request.body, Some(json!({"isActive": false})));
        assert_eq!(request.header_value("deviceuniqueid"), Some("abc"));
        assert_eq!(request.to_string(), "PATCH /admin/users/7/status");
    }
}

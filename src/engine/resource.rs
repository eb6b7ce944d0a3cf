//! Resource request and synthetic response types

/// A resource load the browser engine is about to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    uri: String,
}

impl ResourceRequest {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    /// Full request URI, scheme included
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

/// Payload produced by a scheme handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeResponse {
    pub body: Vec<u8>,
    pub content_type: String,
}

impl SchemeResponse {
    pub fn new(body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
        }
    }
}

/// Response handed back to the browser engine in place of a network load.
/// Always `200 OK`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceResponse {
    content_type: String,
    body: Vec<u8>,
}

impl ResourceResponse {
    /// `200 OK` carrying `body` tagged with `content_type`
    pub fn ok(body: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            body,
        }
    }

    pub fn status(&self) -> u16 {
        200
    }

    pub fn reason(&self) -> &str {
        "OK"
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Value of the `Content-Type` header
    pub fn content_type(&self) -> Option<&str> {
        Some(&self.content_type)
    }
}

impl From<SchemeResponse> for ResourceResponse {
    fn from(response: SchemeResponse) -> Self {
        Self::ok(response.body, response.content_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_payload_becomes_ok_response() {
        let response = ResourceResponse::from(SchemeResponse::new("{}", "application/json"));
        assert_eq!(response.status(), 200);
        assert_eq!(response.reason(), "OK");
        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(response.body(), b"{}");
    }
}

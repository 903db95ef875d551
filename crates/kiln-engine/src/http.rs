//! Transport-neutral request and response values.
//!
//! The engine never binds a socket. A host adapter (the CLI's axum server,
//! a test, an embedding application) converts its own request type into a
//! [`Request`] and writes the returned [`Response`] back out.

use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use url::Url;

/// An incoming request. Only `method` and `url` are ever inspected.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Absolute URL.
    pub url: Url,
    pub headers: HeaderMap,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
        }
    }

    /// `GET` request for an absolute URL string.
    pub fn get(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Method::GET, Url::parse(url)?))
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Key under which the response cache stores this request.
    pub fn cache_key(&self) -> String {
        format!("{}|{}", self.method, self.url)
    }
}

/// A produced response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    /// Empty response with `status`.
    pub fn status(status: StatusCode) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        Self {
            status,
            headers,
            body: Vec::new(),
        }
    }

    /// `200 OK` with a body of `content_type`.
    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        let mut response = Self::status(StatusCode::OK);
        let value = HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
        response.headers.insert(CONTENT_TYPE, value);
        response.body = body.into();
        response
    }

    pub fn not_found() -> Self {
        Self::status(StatusCode::NOT_FOUND)
    }

    pub fn internal_error() -> Self {
        Self::status(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn unavailable() -> Self {
        Self::status(StatusCode::SERVICE_UNAVAILABLE)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

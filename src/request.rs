//! Incoming HTTP request type.

use bytes::Bytes;
use http::{Extensions, HeaderMap, Method, Uri};
use http_body_util::BodyExt;

/// An incoming HTTP request.
///
/// Owned by exactly one in-flight invocation: hyper hands us the raw
/// request, the server collects the body, and the resulting `Request` moves
/// through the middleware chain into the handler. Nothing is shared between
/// concurrent requests.
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    extensions: Extensions,
    body: Bytes,
}

impl Request {
    /// Builds a `Request` from hyper's wire form, buffering the full body.
    ///
    /// Fails only if the client dies mid-body; the server maps that to
    /// `400 Bad Request`.
    pub(crate) async fn from_hyper(
        req: hyper::Request<hyper::body::Incoming>,
    ) -> Result<Self, hyper::Error> {
        let (parts, body) = req.into_parts();
        let body = body.collect().await?.to_bytes();
        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            extensions: parts.extensions,
            body,
        })
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Returns `None` for absent headers
    /// and for values that are not valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Reads a value from the request-scoped context.
    ///
    /// The context is keyed by **type**, so unrelated metadata cannot
    /// collide: define a newtype per concern and look it up by that type.
    /// Values live exactly as long as this request.
    ///
    /// ```rust
    /// use lamina::Request;
    /// use lamina::middleware::RequestId;
    ///
    /// fn correlation(req: &Request) -> Option<&str> {
    ///     req.context::<RequestId>().map(RequestId::as_str)
    /// }
    /// ```
    pub fn context<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    /// Stores a value in the request-scoped context, returning the value it
    /// displaced (if any). Middleware calls this before delegating; the
    /// augmented request is what the next stage sees.
    pub fn set_context<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.extensions.insert(value)
    }
}

#[cfg(test)]
impl Request {
    /// Bare request for unit tests — no headers, empty body.
    pub(crate) fn with_method(method: Method, path: &str) -> Self {
        Self {
            method,
            uri: path.parse().expect("test uri"),
            headers: HeaderMap::new(),
            extensions: Extensions::new(),
            body: Bytes::new(),
        }
    }

    pub(crate) fn get(path: &str) -> Self {
        Self::with_method(Method::GET, path)
    }

    pub(crate) fn insert_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.insert(name, value.parse().expect("test header value"));
        self
    }
}

use std::fmt;
use std::sync::Arc;

use crate::handler::BoxFuture;
use crate::request::Request;

use super::{BoxedMiddleware, ErasedMiddleware, Middleware, Next, private};

/// A per-request identifier stored in the request context.
///
/// The context is keyed by type, so `RequestId` can never collide with
/// values other middleware stores, whatever their shape. Read it back
/// anywhere downstream:
///
/// ```rust
/// use lamina::middleware::RequestId;
/// use lamina::Request;
///
/// fn correlation(req: &Request) -> Option<&str> {
///     req.context::<RequestId>().map(RequestId::as_str)
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Middleware that stamps every request with a [`RequestId`] before
/// delegating.
///
/// Each request gets its own stamp; concurrent requests never observe one
/// another's. Where the id comes from is the caller's choice:
///
/// ```rust
/// use lamina::middleware::{Pipeline, RequestId, SetRequestId};
/// use lamina::{Request, Response};
///
/// async fn whoami(req: Request) -> Response {
///     match req.context::<RequestId>() {
///         Some(id) => Response::text(format!("you are {id}")),
///         None => Response::text("you are nobody"),
///     }
/// }
///
/// let app = Pipeline::new()
///     .with(SetRequestId::fixed("12345"))
///     .around(whoami);
/// ```
pub struct SetRequestId {
    source: Arc<dyn Fn() -> String + Send + Sync>,
}

impl SetRequestId {
    /// Stamps every request with the same literal id. Handy in examples
    /// and tests, where reproducibility beats uniqueness.
    pub fn fixed(id: impl Into<String>) -> Self {
        let id = id.into();
        Self { source: Arc::new(move || id.clone()) }
    }

    /// Calls `source` once per request and stamps its return value.
    pub fn from_fn(source: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self { source: Arc::new(source) }
    }
}

impl private::Sealed for SetRequestId {}

impl Middleware for SetRequestId {
    fn into_boxed_middleware(self) -> BoxedMiddleware {
        Arc::new(self)
    }
}

impl ErasedMiddleware for SetRequestId {
    fn call(&self, mut req: Request, next: Next) -> BoxFuture {
        req.set_context(RequestId((self.source)()));
        Box::pin(next.run(req))
    }
}

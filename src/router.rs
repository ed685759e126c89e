//! Exact-match request router.
//!
//! One flat table per HTTP method. No patterns, no path parameters, no
//! tree, no reflection. You register a path, you get a handler. That is
//! all — cross-cutting behavior belongs in the
//! [middleware pipeline](crate::middleware), not here.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler, private};
use crate::request::Request;
use crate::response::Response;

/// The application route table.
///
/// Build it once at startup; hand it to [`Server::serve`](crate::Server::serve)
/// — or wrap it in a [`Pipeline`](crate::middleware::Pipeline) first. Each
/// [`Router::on`] call returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, HashMap<String, BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Paths match byte-for-byte: `/users` and `/users/` are two different
    /// routes.
    ///
    /// ```rust,no_run
    /// # use lamina::{Method, Request, Response, Router};
    /// # async fn list_users(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,  "/users", list_users)
    ///     .on(Method::POST, "/users", create_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the same method + path pair is registered twice.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        let table = self.routes.entry(method.clone()).or_default();
        if table.insert(path.to_owned(), handler.into_boxed_handler()).is_some() {
            panic!("duplicate route `{method} {path}`");
        }
        self
    }

    pub(crate) fn lookup(&self, method: &Method, path: &str) -> Match {
        match self.routes.get(method).and_then(|table| table.get(path)) {
            Some(handler) => Match::Found(Arc::clone(handler)),
            None if self.path_known(path) => Match::WrongMethod,
            None => Match::NotFound,
        }
    }

    fn path_known(&self, path: &str) -> bool {
        self.routes.values().any(|table| table.contains_key(path))
    }
}

/// Outcome of a route lookup.
pub(crate) enum Match {
    Found(BoxedHandler),
    /// The path is registered, but not for this method.
    WrongMethod,
    NotFound,
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

// ── Router as a handler ───────────────────────────────────────────────────────
//
// Dispatching is just another way of turning a request into a response, so
// the router erases to the same interface as any handler. That is what lets
// a pipeline wrap it without knowing it routes.

impl private::Sealed for Router {}

impl Handler for Router {
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(self)
    }
}

impl ErasedHandler for Router {
    fn call(&self, req: Request) -> BoxFuture {
        match self.lookup(req.method(), req.path()) {
            Match::Found(handler) => handler.call(req),
            Match::WrongMethod => {
                Box::pin(async { Response::status(StatusCode::METHOD_NOT_ALLOWED) })
            }
            Match::NotFound => Box::pin(async { Response::status(StatusCode::NOT_FOUND) }),
        }
    }
}

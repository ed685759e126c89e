//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: request logging, request-id injection, and
//! authentication-header inspection. The whole layer is one idea applied
//! twice:
//!
//! - a **handler** turns a request into a response;
//! - a **middleware** wraps a handler and yields a new handler.
//!
//! A [`Pipeline`] holds middleware in the order you declare it and composes
//! it around a terminal handler. Declaration order is execution order: the
//! first middleware is the outermost wrapper — first to see the request,
//! last to see the response.
//!
//! ```text
//! Pipeline::new().with(a).with(b).around(t)
//!
//! request  ──▶ a ──▶ b ──▶ t
//! response ◀── a ◀── b ◀───┘
//! ```
//!
//! ## Writing middleware
//!
//! Any `async fn (Request, Next) -> impl IntoResponse` is a middleware.
//! Everything before `next.run(req).await` sees the request on the way in;
//! everything after sees the response on the way out:
//!
//! ```rust
//! use lamina::middleware::{Next, Pipeline};
//! use lamina::{Request, Response};
//!
//! async fn frame(req: Request, next: Next) -> Response {
//!     // request side: inspect or rewrite `req` here
//!     let res = next.run(req).await;
//!     // response side: inspect or rewrite `res` here
//!     res
//! }
//!
//! let pipeline = Pipeline::new().with(frame);
//! ```
//!
//! [`Next::run`] consumes the `Next`, so a middleware delegates at most
//! once. Returning without calling it short-circuits the chain — the shape
//! an auth guard takes. The built-ins ([`Log`], [`SetRequestId`]) always
//! delegate.

use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::request::Request;
use crate::response::{IntoResponse, Response};

mod log;
mod request_id;

pub use log::Log;
pub use request_id::{RequestId, SetRequestId};

// ── Next ─────────────────────────────────────────────────────────────────────

/// The rest of the pipeline, handed to each middleware as a value.
///
/// A fresh `Next` is created per invocation — concurrent requests never
/// share one. `run` consumes it: delegate once, or drop it to answer the
/// request yourself.
pub struct Next {
    inner: BoxedHandler,
}

impl Next {
    /// Hands the request to the next stage and resolves to its response.
    pub async fn run(self, req: Request) -> Response {
        self.inner.call(req).await
    }
}

// ── Public Middleware trait ───────────────────────────────────────────────────

/// Implemented for every value that can wrap a handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(req: Request, next: Next) -> impl IntoResponse
/// ```
///
/// Sealed, exactly like [`Handler`]: the closure blanket impl and the
/// built-ins in this module are the only implementors.
pub trait Middleware: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_middleware(self) -> BoxedMiddleware;
}

/// Sealing module for [`Middleware`]; `pub(crate)` so the built-in
/// middleware files can seal their types.
pub(crate) mod private {
    pub trait Sealed {}
}

// ── Type erasure ─────────────────────────────────────────────────────────────
//
// Same bridge as `handler::ErasedHandler`, one parameter wider.

/// Internal dispatch interface.
#[doc(hidden)]
pub trait ErasedMiddleware {
    fn call(&self, req: Request, next: Next) -> BoxFuture;
}

/// A heap-allocated, type-erased middleware shared by every composition
/// that includes it.
#[doc(hidden)]
pub type BoxedMiddleware = Arc<dyn ErasedMiddleware + Send + Sync + 'static>;

/// Implement the sealing trait for any function with the right signature.
impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

/// Implement `Middleware` for any function with the right signature.
impl<F, Fut, R> Middleware for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_middleware(self) -> BoxedMiddleware {
        Arc::new(FnMiddleware(self))
    }
}

/// Newtype bridging a concrete middleware function to the trait-object
/// world, mirroring `handler::FnHandler`.
struct FnMiddleware<F>(F);

impl<F, Fut, R> ErasedMiddleware for FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let fut = (self.0)(req, next);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

/// An ordered middleware sequence, composed around a terminal handler with
/// [`around`](Pipeline::around).
///
/// Build it once at startup; it is immutable afterwards. `around` borrows,
/// so one pipeline can wrap any number of terminals.
pub struct Pipeline {
    stack: Vec<BoxedMiddleware>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    /// Appends a middleware. The first `with` is the outermost wrapper.
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.stack.push(middleware.into_boxed_middleware());
        self
    }

    pub fn len(&self) -> usize { self.stack.len() }
    pub fn is_empty(&self) -> bool { self.stack.is_empty() }

    /// Composes the pipeline around `terminal`.
    ///
    /// Folds right-to-left so the first-declared middleware ends up
    /// outermost: `[a, b]` around `t` behaves as `a(b(t))`. With no
    /// middleware the terminal is returned unchanged.
    ///
    /// Composition only builds the wrap chain: no side effects, and the
    /// same inputs always produce the same wrap order.
    pub fn around(&self, terminal: impl Handler) -> Composed {
        let mut handler = terminal.into_boxed_handler();
        for middleware in self.stack.iter().rev() {
            handler = Arc::new(Wrap {
                middleware: Arc::clone(middleware),
                next: handler,
            });
        }
        Composed { inner: handler }
    }
}

impl Default for Pipeline {
    fn default() -> Self { Self::new() }
}

/// One stage of a composed chain: a middleware plus everything inside it.
struct Wrap {
    middleware: BoxedMiddleware,
    next: BoxedHandler,
}

impl ErasedHandler for Wrap {
    fn call(&self, req: Request) -> BoxFuture {
        let next = Next { inner: Arc::clone(&self.next) };
        self.middleware.call(req, next)
    }
}

// ── Composed ─────────────────────────────────────────────────────────────────

/// The product of [`Pipeline::around`]: a fully composed handler.
///
/// Itself a [`Handler`], so it goes straight into
/// [`Server::serve`](crate::Server::serve) — or nests inside another
/// pipeline. [`handle`](Composed::handle) drives it in-process, no socket
/// required.
#[derive(Clone)]
pub struct Composed {
    inner: BoxedHandler,
}

impl Composed {
    /// Runs one request through the composed chain.
    pub async fn handle(&self, req: Request) -> Response {
        self.inner.call(req).await
    }
}

impl crate::handler::private::Sealed for Composed {}

impl Handler for Composed {
    fn into_boxed_handler(self) -> BoxedHandler {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use http::StatusCode;

    use super::*;

    async fn terminal(_req: Request) -> Response {
        Response::text("Hello, World!")
    }

    /// Middleware that journals its enter/leave effects, for order checks.
    fn recording(tag: &'static str, journal: Arc<Mutex<Vec<String>>>) -> impl Middleware {
        move |req: Request, next: Next| {
            let journal = Arc::clone(&journal);
            async move {
                journal.lock().unwrap().push(format!("{tag}:enter"));
                let res = next.run(req).await;
                journal.lock().unwrap().push(format!("{tag}:leave"));
                res
            }
        }
    }

    #[tokio::test]
    async fn first_declared_runs_first_in_and_last_out() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let journal_terminal = Arc::clone(&journal);

        let pipeline = Pipeline::new()
            .with(recording("outer", Arc::clone(&journal)))
            .with(recording("mid", Arc::clone(&journal)))
            .with(recording("inner", Arc::clone(&journal)));
        assert_eq!(pipeline.len(), 3);

        let app = pipeline.around(move |_req: Request| {
            let journal = Arc::clone(&journal_terminal);
            async move {
                journal.lock().unwrap().push("terminal".to_owned());
                Response::text("ok")
            }
        });

        let res = app.handle(Request::get("/")).await;
        assert_eq!(res.status_code(), StatusCode::OK);

        let events = journal.lock().unwrap().clone();
        assert_eq!(
            events,
            [
                "outer:enter", "mid:enter", "inner:enter",
                "terminal",
                "inner:leave", "mid:leave", "outer:leave",
            ]
        );
    }

    #[tokio::test]
    async fn empty_pipeline_is_the_terminal_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = Arc::clone(&calls);

        let pipeline = Pipeline::new();
        assert!(pipeline.is_empty());

        let app = pipeline.around(move |_req: Request| {
            let calls = Arc::clone(&calls_in);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Response::text("Hello, World!")
            }
        });

        let res = app.handle(Request::get("/")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"Hello, World!");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn composing_twice_yields_identical_behavior() {
        let journal = Arc::new(Mutex::new(Vec::new()));

        let pipeline = Pipeline::new()
            .with(recording("a", Arc::clone(&journal)))
            .with(recording("b", Arc::clone(&journal)));

        let first = pipeline.around(terminal);
        let second = pipeline.around(terminal);

        let res_first = first.handle(Request::get("/")).await;
        let events_first = {
            let mut j = journal.lock().unwrap();
            let events = j.clone();
            j.clear();
            events
        };

        let res_second = second.handle(Request::get("/")).await;
        let events_second = journal.lock().unwrap().clone();

        assert_eq!(res_first.status_code(), res_second.status_code());
        assert_eq!(res_first.body(), res_second.body());
        assert_eq!(events_first, events_second);
        assert_eq!(events_first, ["a:enter", "b:enter", "b:leave", "a:leave"]);
    }

    #[tokio::test]
    async fn dropping_next_short_circuits_the_chain() {
        let reached = Arc::new(AtomicUsize::new(0));
        let reached_in = Arc::clone(&reached);

        let guard =
            |_req: Request, _next: Next| async move { Response::status(StatusCode::UNAUTHORIZED) };

        let app = Pipeline::new().with(guard).around(move |_req: Request| {
            let reached = Arc::clone(&reached_in);
            async move {
                reached.fetch_add(1, Ordering::SeqCst);
                Response::text("never")
            }
        });

        let res = app.handle(Request::get("/")).await;
        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(reached.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn request_changes_flow_downstream() {
        #[derive(Clone, Debug, PartialEq)]
        struct Stamp(&'static str);

        let stamping = |mut req: Request, next: Next| async move {
            req.set_context(Stamp("stamped"));
            next.run(req).await
        };

        let observing = |req: Request, next: Next| async move {
            assert_eq!(req.context::<Stamp>(), Some(&Stamp("stamped")));
            next.run(req).await
        };

        let app = Pipeline::new()
            .with(stamping)
            .with(observing)
            .around(|req: Request| async move {
                match req.context::<Stamp>() {
                    Some(stamp) => Response::text(stamp.0),
                    None => Response::status(StatusCode::INTERNAL_SERVER_ERROR),
                }
            });

        let res = app.handle(Request::get("/")).await;
        assert_eq!(res.body(), b"stamped");
    }

    #[tokio::test]
    async fn response_changes_happen_on_the_unwind() {
        let tagging = |req: Request, next: Next| async move {
            let res = next.run(req).await;
            Response::builder()
                .status(res.status_code())
                .header("x-pipeline", "seen")
                .text(String::from_utf8_lossy(res.body()).into_owned())
        };

        let app = Pipeline::new().with(tagging).around(terminal);

        let res = app.handle(Request::get("/")).await;
        assert_eq!(res.header("x-pipeline"), Some("seen"));
        assert_eq!(res.body(), b"Hello, World!");
    }

    #[tokio::test]
    async fn composed_pipelines_nest() {
        let journal = Arc::new(Mutex::new(Vec::new()));

        let inner = Pipeline::new()
            .with(recording("inner", Arc::clone(&journal)))
            .around(terminal);
        let outer = Pipeline::new()
            .with(recording("outer", Arc::clone(&journal)))
            .around(inner);

        let res = outer.handle(Request::get("/")).await;
        assert_eq!(res.body(), b"Hello, World!");

        let events = journal.lock().unwrap().clone();
        assert_eq!(events, ["outer:enter", "inner:enter", "inner:leave", "outer:leave"]);
    }
}

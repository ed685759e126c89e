//! HTTP server.
//!
//! [`Server::bind`] holds an address; [`Server::serve`] binds it and then
//! accepts connections for the life of the process. Every accepted
//! connection runs on its own tokio task, so a slow client never stalls the
//! others. Binding the listener is the only failure `serve` surfaces;
//! everything past that point is logged and contained per connection.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use lamina::Server;
    /// let server = Server::bind("0.0.0.0:8080");
    /// ```
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr }
    }

    /// Binds the listener and serves `app` until the process exits.
    ///
    /// `app` is any [`Handler`]: a bare [`Router`](crate::Router), a
    /// composed pipeline, or a single async function. Returns early only
    /// when the listener cannot be bound; from then on every failure is
    /// scoped to the connection it happened on.
    pub async fn serve(self, app: impl Handler) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;

        info!(addr = %self.addr, "listening");

        accept_loop(listener, app.into_boxed_handler()).await;
        Ok(())
    }
}

// ── Accept loop ───────────────────────────────────────────────────────────────

/// Accepts connections forever, one tokio task per connection.
///
/// Split out of [`Server::serve`] so tests can drive an already-bound
/// listener directly.
pub(crate) async fn accept_loop(listener: TcpListener, app: BoxedHandler) {
    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("accept error: {e}");
                continue;
            }
        };

        let app = Arc::clone(&app);
        // TokioIo adapts tokio's AsyncRead/AsyncWrite to the hyper IO traits.
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            // `service_fn` turns a plain async function into a hyper
            // `Service`. The closure runs once per request on the
            // connection, not once per connection.
            let svc = service_fn(move |req| {
                let app = Arc::clone(&app);
                async move { dispatch(app, req).await }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, svc).await {
                error!(peer = %remote_addr, "connection error: {e}");
            }
        });
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Core hot path: runs one request through the application handler.
///
/// The error type is [`Infallible`] — every failure becomes a response
/// (400 for an unreadable body, 404/405 from routing) so hyper never sees
/// an error.
async fn dispatch(
    app: BoxedHandler,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<http_body_util::Full<bytes::Bytes>>, Infallible> {
    let response = match Request::from_hyper(req).await {
        Ok(request) => app.call(request).await,
        Err(e) => {
            debug!("unreadable request body: {e}");
            Response::status(http::StatusCode::BAD_REQUEST)
        }
    };

    Ok(response.into_http())
}

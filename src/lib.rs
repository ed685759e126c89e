//! # lamina
//!
//! A minimal HTTP framework built around an ordered middleware pipeline.
//! Nothing more. Nothing less.
//!
//! ## The contract
//!
//! One idea carries the whole framework: an application is a terminal
//! handler wrapped in an ordered stack of middleware. Declaration order is
//! execution order. The first middleware declared is the first to see every
//! request and the last to see every response.
//!
//! What lamina ships:
//!
//! - **Composition** — [`middleware::Pipeline`] wraps middleware around any
//!   handler, deterministically, as many times as you like
//! - **Built-in middleware** — request logging ([`middleware::Log`]) and
//!   request-id stamping ([`middleware::SetRequestId`])
//! - **Routing** — an exact-match method and path table, [`Router`]
//! - **Async I/O** — tokio and hyper, HTTP/1.1
//!
//! What lamina leaves to the reverse proxy in front of it, on purpose:
//! TLS termination, rate limiting, body-size limits, slow-client
//! protection.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use lamina::middleware::{Log, Pipeline, SetRequestId};
//! use lamina::{Method, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::new().on(Method::GET, "/", hello);
//!
//!     let app = Pipeline::new()
//!         .with(Log::new())
//!         .with(SetRequestId::fixed("12345"))
//!         .around(router);
//!
//!     println!("Starting server on :8080");
//!     if let Err(e) = Server::bind("0.0.0.0:8080").serve(app).await {
//!         println!("Error starting server: {e}");
//!     }
//! }
//!
//! async fn hello(_req: Request) -> Response {
//!     Response::text("Hello, World!")
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use error::Error;
pub use handler::Handler;
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response};
pub use router::Router;
pub use server::Server;

pub use http::{Method, StatusCode};

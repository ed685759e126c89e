//! The pipeline in one file — logging, a request id, one route.
//!
//! Run with:
//!   cargo run --example hello
//!
//! Try:
//!   curl http://localhost:8080/
//!
//! Every request prints one `[<timestamp>] <path>` line to stdout.

use lamina::middleware::{Log, Pipeline, SetRequestId};
use lamina::{Method, Request, Response, Router, Server};

#[tokio::main]
async fn main() {
    // Operational logs go to stderr; stdout belongs to the Log middleware.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let router = Router::new().on(Method::GET, "/", hello);

    // First declared runs first: Log sees the request before SetRequestId
    // stamps it, and sees the response after everything else is done.
    let app = Pipeline::new()
        .with(Log::new())
        .with(SetRequestId::fixed("12345"))
        .around(router);

    println!("Starting server on :8080");
    if let Err(e) = Server::bind("0.0.0.0:8080").serve(app).await {
        println!("Error starting server: {e}");
    }
}

async fn hello(_req: Request) -> Response {
    Response::text("Hello, World!")
}

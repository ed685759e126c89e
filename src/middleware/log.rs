use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use chrono::{Local, SecondsFormat};

use crate::handler::BoxFuture;
use crate::request::Request;

use super::{BoxedMiddleware, ErasedMiddleware, Middleware, Next, private};

/// Request-logging middleware.
///
/// Writes one line per request to standard output, then delegates:
///
/// ```text
/// [2026-08-25T09:15:02+02:00] /widgets
/// ```
///
/// The timestamp is local time in RFC 3339 at second precision. The rest of
/// the line is the request path, query string excluded. All requests share
/// one sink, so concurrent lines never interleave.
pub struct Log {
    sink: Arc<Mutex<dyn Write + Send>>,
}

impl Log {
    /// A `Log` that writes to standard output.
    pub fn new() -> Self {
        Self { sink: Arc::new(Mutex::new(io::stdout())) }
    }

    /// Same middleware, caller-chosen sink.
    #[cfg(test)]
    pub(crate) fn with_sink(sink: Arc<Mutex<dyn Write + Send>>) -> Self {
        Self { sink }
    }
}

impl Default for Log {
    fn default() -> Self {
        Self::new()
    }
}

impl private::Sealed for Log {}

impl Middleware for Log {
    fn into_boxed_middleware(self) -> BoxedMiddleware {
        Arc::new(self)
    }
}

impl ErasedMiddleware for Log {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let sink = Arc::clone(&self.sink);
        Box::pin(async move {
            let line = format!(
                "[{}] {}\n",
                Local::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                req.path(),
            );
            // A failed or poisoned sink skips the line, never the request.
            if let Ok(mut sink) = sink.lock() {
                let _ = sink.write_all(line.as_bytes());
            }
            next.run(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use http::StatusCode;

    use crate::middleware::Pipeline;
    use crate::response::Response;

    use super::*;

    fn buffer_sink() -> (Arc<Mutex<Vec<u8>>>, Log) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        // Method-call clone keeps the concrete type; the annotated `let`
        // unsizes it to the sink's trait object.
        let sink: Arc<Mutex<dyn Write + Send>> = buffer.clone();
        (buffer, Log::with_sink(sink))
    }

    fn lines(buffer: &Arc<Mutex<Vec<u8>>>) -> Vec<String> {
        String::from_utf8(buffer.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[tokio::test]
    async fn logs_timestamp_and_path() {
        let (buffer, log) = buffer_sink();
        let app = Pipeline::new()
            .with(log)
            .around(|_req: Request| async { Response::text("ok") });

        let res = app.handle(Request::get("/widgets")).await;
        assert_eq!(res.status_code(), StatusCode::OK);

        let lines = lines(&buffer);
        assert_eq!(lines.len(), 1);

        let line = &lines[0];
        let (stamp, path) = line
            .strip_prefix('[')
            .and_then(|rest| rest.split_once("] "))
            .expect("line shaped as `[<timestamp>] <path>`");
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok(), "bad timestamp: {stamp}");
        assert_eq!(path, "/widgets");
    }

    #[tokio::test]
    async fn logs_path_without_query() {
        let (buffer, log) = buffer_sink();
        let app = Pipeline::new()
            .with(log)
            .around(|_req: Request| async { Response::text("ok") });

        app.handle(Request::get("/widgets?page=2")).await;

        let lines = lines(&buffer);
        assert!(lines[0].ends_with("] /widgets"), "unexpected line: {}", lines[0]);
    }

    #[tokio::test]
    async fn line_is_written_before_the_handler_runs() {
        let (buffer, log) = buffer_sink();
        let buffer_in_handler = Arc::clone(&buffer);
        let bytes_at_handler = Arc::new(AtomicUsize::new(0));
        let bytes_in_handler = Arc::clone(&bytes_at_handler);

        let app = Pipeline::new().with(log).around(move |_req: Request| {
            let buffer = Arc::clone(&buffer_in_handler);
            let bytes = Arc::clone(&bytes_in_handler);
            async move {
                bytes.store(buffer.lock().unwrap().len(), Ordering::SeqCst);
                Response::text("ok")
            }
        });

        app.handle(Request::get("/")).await;

        assert!(bytes_at_handler.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn full_pipeline_logs_and_stamps_one_request() {
        use http::Method;

        use crate::middleware::{RequestId, SetRequestId};
        use crate::router::Router;

        let (buffer, log) = buffer_sink();

        let router = Router::new().on(Method::GET, "/", |req: Request| async move {
            match req.context::<RequestId>().map(RequestId::as_str) {
                Some("12345") => Response::text("Hello, World!"),
                _ => Response::status(StatusCode::INTERNAL_SERVER_ERROR),
            }
        });

        let app = Pipeline::new()
            .with(log)
            .with(SetRequestId::fixed("12345"))
            .around(router);

        let res = app.handle(Request::get("/")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"Hello, World!");

        let lines = lines(&buffer);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("] /"), "unexpected line: {}", lines[0]);
    }

    #[tokio::test]
    async fn one_line_per_request_in_order() {
        let (buffer, log) = buffer_sink();
        let app = Pipeline::new()
            .with(log)
            .around(|_req: Request| async { Response::text("ok") });

        app.handle(Request::get("/first")).await;
        app.handle(Request::get("/second")).await;

        let lines = lines(&buffer);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("] /first"));
        assert!(lines[1].ends_with("] /second"));
    }
}

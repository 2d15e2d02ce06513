//! Demonstration host for the core agent client.
//!
//! Serves a hello-world endpoint whose requests are reported to the core
//! agent, and provides a mock agent that logs whatever it receives.

mod mock_agent;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use coreagent::{Id, IdSource, Reporter, RequestTrace};
use std::future::Future;
use std::sync::Arc;

pub use crate::mock_agent::MockAgent;

/// Shared handler state: the reporter is injected here, never global
#[derive(Clone)]
pub struct AppState {
    pub reporter: Arc<dyn Reporter + Send + Sync>,
    pub id_source: IdSource,
}

impl AppState {
    pub fn new(reporter: Arc<dyn Reporter + Send + Sync>) -> Self {
        Self {
            reporter,
            id_source: Id::generate,
        }
    }
}

/// Router with every route reported to the core agent
pub fn router(reporter: Arc<dyn Reporter + Send + Sync>) -> Router {
    router_with_state(AppState::new(reporter))
}

pub fn router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/hello", get(hello))
        .layer(middleware::from_fn_with_state(state.clone(), report_request))
        .with_state(state)
}

pub async fn run_server(
    listen: &str,
    reporter: Arc<dyn Reporter + Send + Sync>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    tracing::info!("🌐 Listening on http://{}", listener.local_addr()?);
    tracing::info!("  - GET /hello → Hello World!");

    axum::serve(listener, router(reporter))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn hello() -> &'static str {
    "Hello World!"
}

/// Wrap a request in StartRequest/FinishRequest with one Controller span.
///
/// The agent needs at least one span per transaction whose operation starts
/// with `Controller`.
async fn report_request(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let operation = format!("Controller{}", req.uri().path());
    let reporter = state.reporter.as_ref();

    let trace = match RequestTrace::start_with(reporter, state.id_source) {
        Ok(trace) => trace,
        Err(e) => {
            tracing::warn!("not tracing {}: {}", operation, e);
            return next.run(req).await;
        }
    };

    let span = match trace.span(&operation) {
        Ok(span) => Some(span),
        Err(e) => {
            tracing::warn!("no span for {}: {}", operation, e);
            None
        }
    };

    let response = next.run(req).await;

    drop(span);
    trace.finish();
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use coreagent::{ClientError, IdError, Message};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    #[derive(Default)]
    struct Recorder {
        messages: Mutex<Vec<Message>>,
    }

    impl Reporter for Recorder {
        fn send(&self, message: &Message) -> Result<(), ClientError> {
            self.messages.lock().push(message.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_hello_is_reported() {
        let recorder = Arc::new(Recorder::default());
        let app = router(recorder.clone());

        let response = app
            .oneshot(axum::http::Request::get("/hello").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Hello World!");

        let messages = recorder.messages.lock().clone();
        let names: Vec<&str> = messages.iter().map(|m| m.name()).collect();
        assert_eq!(names, ["StartRequest", "StartSpan", "StopSpan", "FinishRequest"]);

        let Message::StartSpan(start) = &messages[1] else {
            panic!("expected StartSpan, got {:?}", messages[1]);
        };
        assert_eq!(start.operation, "Controller/hello");
        assert_eq!(messages[0], Message::start_request(start.request_id.clone()));
        assert_eq!(
            messages[2],
            Message::stop_span(start.request_id.clone(), start.span_id.clone())
        );
        assert_eq!(messages[3], Message::finish_request(start.request_id.clone()));
    }

    fn no_entropy() -> Result<Id, IdError> {
        Id::generate_with(|_| Err(getrandom::Error::UNSUPPORTED))
    }

    async fn get_hello(app: Router) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(axum::http::Request::get("/hello").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_request_served_without_randomness() {
        let recorder = Arc::new(Recorder::default());
        let app = router_with_state(AppState {
            reporter: recorder.clone(),
            id_source: no_entropy,
        });

        let (status, body) = get_hello(app).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"Hello World!");
        assert!(recorder.messages.lock().is_empty());
    }

    #[tokio::test]
    async fn test_request_reported_without_span_id() {
        static ISSUED: AtomicUsize = AtomicUsize::new(0);
        fn request_id_only() -> Result<Id, IdError> {
            match ISSUED.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(Id::from("r1")),
                _ => no_entropy(),
            }
        }

        let recorder = Arc::new(Recorder::default());
        let app = router_with_state(AppState {
            reporter: recorder.clone(),
            id_source: request_id_only,
        });

        let (status, body) = get_hello(app).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"Hello World!");
        assert_eq!(
            recorder.messages.lock().clone(),
            vec![Message::start_request("r1"), Message::finish_request("r1")]
        );
    }

    #[tokio::test]
    async fn test_each_request_gets_its_own_id() {
        let recorder = Arc::new(Recorder::default());
        let app = router(recorder.clone());

        for _ in 0..2 {
            app.clone()
                .oneshot(axum::http::Request::get("/hello").body(Body::empty()).unwrap())
                .await
                .unwrap();
        }

        let messages = recorder.messages.lock().clone();
        let request_ids: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                Message::StartRequest(start) => Some(start.request_id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(request_ids.len(), 2);
        assert_ne!(request_ids[0], request_ids[1]);
    }
}

//! HTTP server setup and the request → handler adapter.
//!
//! # Responsibilities
//! - Create Axum Router with a catch-all handler route
//! - Wire up middleware (request ID, tracing)
//! - Per request: obtain handler, build event/context, invoke, map result
//! - Render diagnostic pages for unavailable and failing handlers
//! - Stop accepting on shutdown and drain in-flight responses
//!
//! # Request States
//! ```text
//! RECEIVED → LOADING_HANDLER → UNAVAILABLE                (500 page)
//!                            → INVOKING → RESPONDING      (handler result)
//!                                       → FAILED          (500 page)
//! ```

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{DevConfig, FunctionConfig};
use crate::event::{to_invocation_context, to_invocation_event};
use crate::handler::{invoke, InvocationError};
use crate::http::response::{handler_error_page, result_to_response, unavailable_page};
use crate::loader::HandlerLoader;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub loader: Arc<HandlerLoader>,
    pub function: FunctionConfig,
    /// Artifact path as configured, shown on the unavailable page.
    pub artifact_path: String,
    pub watch_command: String,
    pub expose_errors: bool,
}

/// HTTP server adapting requests onto the loaded handler.
pub struct DevServer {
    router: Router,
    config: DevConfig,
}

impl DevServer {
    /// Create a new server that serves whatever `loader` currently provides.
    pub fn new(config: DevConfig, loader: Arc<HandlerLoader>) -> Self {
        let state = AppState {
            loader,
            function: config.function.clone(),
            artifact_path: config.artifact.path.clone(),
            watch_command: config.artifact.watch_command.clone(),
            expose_errors: config.server.expose_errors,
        };

        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(lambda_handler))
            .route("/", any(lambda_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server until a shutdown signal arrives, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            artifact = %self.config.artifact.path,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Adapter handler: every method, every path.
async fn lambda_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    tracing::info!(
        request_id = %request_id,
        "{} {}",
        request.method(),
        request.uri()
    );

    let handler = match state.loader.obtain().await {
        Ok(handler) => handler,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Handler not available");
            metrics::record_request(500);
            return unavailable_page(&state.artifact_path, &state.watch_command);
        }
    };

    let event = to_invocation_event(&request, Some(peer));
    let context = to_invocation_context(&state.function);
    tracing::debug!(
        request_id = %request_id,
        aws_request_id = %context.aws_request_id,
        "Invoking handler"
    );

    let start = Instant::now();
    let outcome = invoke(handler, event, context).await.and_then(result_to_response);
    metrics::record_invocation(start);

    match outcome {
        Ok(response) => {
            metrics::record_request(response.status().as_u16());
            response
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "❌ Lambda handler error");
            metrics::record_invocation_failure(failure_kind(&e));
            metrics::record_request(500);
            handler_error_page(&e, state.expose_errors)
        }
    }
}

fn failure_kind(error: &InvocationError) -> &'static str {
    match error {
        InvocationError::Threw(_) => "threw",
        InvocationError::Failed(_) => "failed",
        InvocationError::Panicked(_) => "panicked",
        InvocationError::Abandoned => "abandoned",
        InvocationError::MalformedResult(_) => "malformed_result",
    }
}

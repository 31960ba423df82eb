//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Assemble the admission pipeline and utility toolkit from config
//! - Build the Axum router and wire up tower-http layers
//! - Serve plain HTTP or TLS with graceful shutdown
//! - Run the background sweep of stale rate-limit windows

use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::connect_info::IntoMakeServiceWithConnectInfo,
    http::{HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{self, AllowOrigin, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admission::AdmissionPipeline;
use crate::config::{CorsConfig, ServiceConfig, TlsConfig, VaultConfig};
use crate::http::handlers::{health, root, run_utility};
use crate::http::middleware::admission_gate;
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::http::response::ApiError;
use crate::security::headers::apply_security_headers;
use crate::security::{
    Clock, CredentialValidator, EgressPolicy, FingerprintExtractor, PatternBudget, RateLimiter, SweepService,
    SystemClock,
};
use crate::utilities::{Toolkit, UtilityError};
use crate::validation::{EndpointId, InputValidator};

const TLS_DRAIN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("invalid secret header name '{0}'")]
    InvalidHeader(String),

    #[error("utility setup failed: {0}")]
    Toolkit(#[from] UtilityError),
}

/// Application state injected into the gate and handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: Arc<AdmissionPipeline>,
    pub fingerprints: FingerprintExtractor,
    pub toolkit: Arc<Toolkit>,
    pub secret_header: HeaderName,
    pub body_limit: usize,
    pub service: Arc<ServiceConfig>,
}

pub struct HttpServer {
    router: Router,
    config: VaultConfig,
    limiter: Arc<RateLimiter>,
}

impl HttpServer {
    pub fn new(config: VaultConfig) -> Result<Self, ServerError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build the server around an explicit clock.
    pub fn with_clock(config: VaultConfig, clock: Arc<dyn Clock>) -> Result<Self, ServerError> {
        let secret_header = HeaderName::try_from(config.auth.header.as_str())
            .map_err(|_| ServerError::InvalidHeader(config.auth.header.clone()))?;

        let limiter = Arc::new(RateLimiter::new(&config.rate_limit, clock));
        let validator = InputValidator::new(
            EgressPolicy::new(config.fetch.allow_private_networks),
            PatternBudget::default(),
        );
        let pipeline = AdmissionPipeline::new(
            CredentialValidator::from_config(&config.auth),
            Arc::clone(&limiter),
            validator,
        );

        let state = AppState {
            pipeline: Arc::new(pipeline),
            fingerprints: FingerprintExtractor::new(config.proxy.trust_forwarded_headers),
            toolkit: Arc::new(Toolkit::new(&config)?),
            secret_header,
            body_limit: config.security.max_body_size,
            service: Arc::new(config.service.clone()),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config, limiter })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &VaultConfig, state: AppState) -> Router {
        let api = EndpointId::ALL
            .into_iter()
            .fold(Router::<AppState>::new(), |router, endpoint| {
                let handler = match endpoint {
                    EndpointId::WordCounter => post(run_utility).get(run_utility),
                    _ => post(run_utility),
                };
                router.route(endpoint.path(), handler)
            })
            .route_layer(from_fn_with_state(state.clone(), admission_gate));

        let router = api
            .route("/", get(root))
            .route("/health", get(health))
            .with_state(state);

        apply_security_headers(router)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(cors_layer(&config.cors))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(CatchPanicLayer::custom(panic_response))
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn limiter(&self) -> Arc<RateLimiter> {
        Arc::clone(&self.limiter)
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;

        let mut sweeper = SweepService::new(Arc::clone(&self.limiter), self.config.rate_limit.sweep_interval_secs);
        sweeper.start();

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let result = match &self.config.listener.tls {
            Some(tls) => serve_tls(listener, app, tls, shutdown).await,
            None => {
                tracing::info!(address = %addr, "HTTP server starting");
                axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown)
                    .await
                    .map_err(ServerError::from)
            }
        };

        sweeper.stop();
        tracing::info!("HTTP server stopped");
        result
    }
}

async fn serve_tls<F>(
    listener: TcpListener,
    app: IntoMakeServiceWithConnectInfo<Router, SocketAddr>,
    tls: &TlsConfig,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .map_err(|e| ServerError::Tls(format!("{}: {e}", tls.cert_path)))?;

    let addr = listener.local_addr()?;
    let handle = Handle::new();
    let signal = handle.clone();
    tokio::spawn(async move {
        shutdown.await;
        signal.graceful_shutdown(Some(TLS_DRAIN_GRACE));
    });

    tracing::info!(address = %addr, "HTTPS server starting");
    axum_server::from_tcp_rustls(listener.into_std()?, rustls)
        .handle(handle)
        .serve(app)
        .await?;
    Ok(())
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(cors::Any);

    if config.allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(cors::Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "Handler panicked");
    ApiError::internal().into_response()
}

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use kubebuild_controller::{Controller, Reconciler};
use kubebuild_db_memory::InMemoryStore;
use kubebuild_storage::DynStore;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::{
    apps,
    config::AppConfig,
    handlers,
    state::AppState,
    webhook::{self, admission, conversion},
};

pub struct KubebuildServer {
    addr: SocketAddr,
    app: Router,
    store: DynStore,
    controller: Controller,
}

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;
    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        // Webhooks
        .route(webhook::MUTATE_PATH, post(admission::mutate_handler))
        .route(webhook::VALIDATE_PATH, post(admission::validate_handler))
        .route(webhook::CONVERT_PATH, post(conversion::convert_handler))
        // App API
        .route(apps::APPS_PATH, get(apps::list_apps))
        .route(apps::APP_PATH, get(apps::get_app).put(apps::put_app))
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        span.record("http.status_code", tracing::field::display(res.status().as_u16()));
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    store: Option<DynStore>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            store: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Use `store` instead of a fresh in-memory store.
    pub fn with_store(mut self, store: DynStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> KubebuildServer {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryStore::new()) as DynStore);

        let reconciler = Reconciler::new(
            store.clone(),
            self.config.renderer(),
            self.config.reconcile_options(),
        );
        let controller = Controller::new(
            Arc::new(reconciler),
            store.clone(),
            self.config.controller_config(),
        );

        let state = AppState::new(store.clone(), controller.handle(), self.config);
        let app = build_app(state);

        KubebuildServer {
            addr: self.addr,
            app,
            store,
            controller,
        }
    }
}

impl KubebuildServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn store(&self) -> DynStore {
        self.store.clone()
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `signal` resolves, then stop the controller.
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let controller = tokio::spawn(self.controller.run(shutdown_rx));

        tracing::info!("listening on {}", listener.local_addr()?);
        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(signal)
            .await;

        let _ = shutdown_tx.send(true);
        if let Err(e) = controller.await {
            tracing::warn!(error = %e, "controller task ended abnormally");
        }

        served?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

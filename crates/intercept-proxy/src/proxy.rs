use arc_swap::ArcSwap;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, Response, StatusCode};
use axum::routing::any;
use axum::Router;
use generation_cache::CacheStorage;
use http_body_util::BodyExt;
use intercept_layer::{HttpFetcher, InterceptConfig, InterceptError, InterceptLayer, Intercepted};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

pub type ProxyLayer = InterceptLayer<CacheStorage, HttpFetcher>;

/// Shared application state passed to all handlers.
pub struct AppState {
    /// Layer currently in control. Swapped when a new version takes over.
    pub layer: ArcSwap<ProxyLayer>,
    pub storage: Arc<CacheStorage>,
    pub fetcher: Arc<HttpFetcher>,
    /// Held for a whole deploy, so one redeploy's activation cannot delete
    /// the generation another is still installing into.
    deploy_lock: Mutex<()>,
}

impl AppState {
    pub fn new(layer: Arc<ProxyLayer>) -> Self {
        Self {
            storage: Arc::clone(layer.store()),
            fetcher: layer.fetcher(),
            layer: ArcSwap::from(layer),
            deploy_lock: Mutex::new(()),
        }
    }
}

/// Result of deploying a new layer next to a running one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
    /// Installed, activated and swapped in.
    Activated,
    /// Installed but the seed failed, so there is no eager takeover; the
    /// current layer keeps control.
    Waiting,
}

/// Install and activate the first layer. Nothing else controls clients yet,
/// so activation proceeds even when seeding failed.
pub async fn start_layer(
    config: InterceptConfig,
    storage: Arc<CacheStorage>,
    fetcher: Arc<HttpFetcher>,
) -> Result<Arc<ProxyLayer>, InterceptError> {
    let layer = InterceptLayer::new(config, storage, fetcher)?;

    let install = layer.on_install().await?;
    if !install.skip_waiting {
        tracing::warn!(version = %layer.version(), "seed failed, starting with an empty cache");
    }
    let activate = layer.on_activate().await?;
    tracing::info!(
        version = %layer.version(),
        seeded = install.seeded,
        deleted = ?activate.deleted,
        "intercept layer active"
    );

    Ok(Arc::new(layer))
}

/// Deploy a new layer over the shared storage. With eager takeover the new
/// layer is activated (deleting every other generation) and swapped in.
/// Deploys run one at a time, in the order they reach the lock.
pub async fn deploy_layer(state: &AppState, config: InterceptConfig) -> Result<Deployment, InterceptError> {
    let _deploying = state.deploy_lock.lock().await;
    let layer = InterceptLayer::new(config, Arc::clone(&state.storage), Arc::clone(&state.fetcher))?;

    let install = layer.on_install().await?;
    if !install.skip_waiting {
        tracing::warn!(
            version = %layer.version(),
            current = %state.layer.load().version(),
            "new layer installed without takeover, current layer keeps control"
        );
        return Ok(Deployment::Waiting);
    }

    layer.on_activate().await?;
    let previous = state.layer.swap(Arc::new(layer));
    previous.settle().await;
    Ok(Deployment::Activated)
}

pub fn proxy_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/{*path}", any(proxy_handler))
        .route("/", any(proxy_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Main proxy handler. Hands every request to the active intercept layer.
pub async fn proxy_handler(State(state): State<Arc<AppState>>, req: Request<Body>) -> Response<Body> {
    let start = Instant::now();
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::error!(error = %e, "failed to read request body");
            return plain(StatusCode::BAD_REQUEST, "Bad Request");
        }
    };
    let request = Request::from_parts(parts, body);
    let method = request.method().clone();
    let uri = request.uri().clone();

    let layer = state.layer.load_full();
    match layer.on_request(request).await {
        Ok(Intercepted { response, source }) => {
            tracing::debug!(
                method = %method,
                uri = %uri,
                status = response.status().as_u16(),
                source = source.as_str(),
                latency_us = start.elapsed().as_micros(),
                "request handled"
            );

            let mut response = response.map(Body::from);
            response
                .headers_mut()
                .insert("x-cache", HeaderValue::from_static(source.as_str()));
            response
        }
        Err(e) => {
            tracing::error!(error = %e, method = %method, uri = %uri, "network request failed");
            plain(StatusCode::BAD_GATEWAY, "Bad Gateway")
        }
    }
}

fn plain(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
}

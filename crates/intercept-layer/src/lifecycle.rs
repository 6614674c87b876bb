//! The intercept layer's lifecycle: install, activate, then intercept.

use crate::capture::ResponseCapture;
use crate::config::InterceptConfig;
use crate::error::InterceptError;
use crate::fetch::Fetcher;
use crate::policy::{self, AllowList, Origin, Route};
use bytes::Bytes;
use generation_cache::{CacheStore, CachedResponse, RequestKey};
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, Request, Response, StatusCode, Uri};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::task::TaskTracker;

/// Lifecycle phase of one layer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Parsed => "parsed",
            Phase::Installing => "installing",
            Phase::Installed => "installed",
            Phase::Activating => "activating",
            Phase::Activated => "activated",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// Entries written by the seed step.
    pub seeded: usize,
    /// Promote to active without waiting for old clients to go away.
    pub skip_waiting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateOutcome {
    /// Stale generations removed.
    pub deleted: Vec<String>,
}

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Network,
    /// Synthesized because the network was unreachable.
    Offline,
    /// Not intercepted at all.
    Bypass,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Cache => "HIT",
            Source::Network => "MISS",
            Source::Offline => "OFFLINE",
            Source::Bypass => "BYPASS",
        }
    }
}

#[derive(Debug)]
pub struct Intercepted {
    pub response: Response<Bytes>,
    pub source: Source,
}

/// Cache-first intercept layer for one origin and one cache version.
///
/// Driven by its host through [`on_install`](Self::on_install),
/// [`on_activate`](Self::on_activate) and [`on_request`](Self::on_request).
/// Storage is shared: several layer instances (an old and a new version) may
/// hold the same store, and activation of the newer one removes the
/// generations of every other version.
pub struct InterceptLayer<S, F> {
    config: InterceptConfig,
    origin: Origin,
    allowed: AllowList,
    seeds: Vec<Uri>,
    store: Arc<S>,
    fetcher: Arc<F>,
    phase: Mutex<Phase>,
    skip_waiting: AtomicBool,
    controlling: AtomicBool,
    persist_tasks: TaskTracker,
}

impl<S, F> InterceptLayer<S, F>
where
    S: CacheStore + 'static,
    F: Fetcher + 'static,
{
    pub fn new(config: InterceptConfig, store: Arc<S>, fetcher: Arc<F>) -> Result<Self, InterceptError> {
        let origin = Origin::parse(&config.origin)?;
        let allowed = AllowList::new(&config.allowed_hosts);
        let seeds = config
            .seed_paths
            .iter()
            .map(|path| {
                path.parse::<Uri>()
                    .map(|uri| origin.resolve(&uri))
                    .map_err(|e| InterceptError::InvalidSeedPath(format!("{path}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            config,
            origin,
            allowed,
            seeds,
            store,
            fetcher,
            phase: Mutex::new(Phase::Parsed),
            skip_waiting: AtomicBool::new(false),
            controlling: AtomicBool::new(false),
            persist_tasks: TaskTracker::new(),
        })
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn config(&self) -> &InterceptConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn fetcher(&self) -> Arc<F> {
        Arc::clone(&self.fetcher)
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    pub fn skip_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::Acquire)
    }

    /// Whether clients have been claimed and requests are intercepted.
    pub fn is_controlling(&self) -> bool {
        self.controlling.load(Ordering::Acquire)
    }

    fn transition(&self, expected: Phase, next: Phase) -> Result<(), InterceptError> {
        let mut phase = self.phase.lock();
        if *phase != expected {
            return Err(InterceptError::InvalidPhase {
                expected,
                actual: *phase,
            });
        }
        *phase = next;
        Ok(())
    }

    fn set_phase(&self, next: Phase) {
        *self.phase.lock() = next;
    }

    /// Create the current generation and pre-populate it with the seed set.
    ///
    /// A failed seed is logged and absorbed: the layer still reaches
    /// `Installed`, only without eager takeover.
    pub async fn on_install(&self) -> Result<InstallOutcome, InterceptError> {
        self.transition(Phase::Parsed, Phase::Installing)?;
        tracing::info!(version = %self.config.version, "installing");

        let outcome = match self.seed().await {
            Ok(seeded) => {
                self.skip_waiting.store(true, Ordering::Release);
                tracing::info!(seeded, version = %self.config.version, "installation complete");
                InstallOutcome {
                    seeded,
                    skip_waiting: true,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, version = %self.config.version, "installation failed");
                InstallOutcome {
                    seeded: 0,
                    skip_waiting: false,
                }
            }
        };

        self.set_phase(Phase::Installed);
        Ok(outcome)
    }

    /// All-or-nothing: every seed must come back 2xx before anything is stored.
    async fn seed(&self) -> Result<usize, InterceptError> {
        self.store.open(&self.config.version)?;

        let fetches = self.seeds.iter().map(|url| async move {
            let request = Request::builder()
                .method(Method::GET)
                .uri(policy::origin_form(url))
                .body(Bytes::new())
                .map_err(|e| InterceptError::InvalidSeedPath(e.to_string()))?;

            let response = self
                .fetcher
                .fetch(request)
                .await
                .map_err(|source| InterceptError::SeedFetch {
                    url: url.to_string(),
                    source,
                })?;

            if !response.status().is_success() {
                return Err(InterceptError::SeedStatus {
                    url: url.to_string(),
                    status: response.status(),
                });
            }
            Ok::<_, InterceptError>((
                RequestKey::new(&Method::GET, url),
                CachedResponse::from_response(&response),
            ))
        });
        let fetched = futures_util::future::try_join_all(fetches).await?;

        let seeded = fetched.len();
        for (key, response) in fetched {
            self.store.put(&self.config.version, key, response)?;
        }
        Ok(seeded)
    }

    /// Delete every generation but the current one, then claim clients.
    pub async fn on_activate(&self) -> Result<ActivateOutcome, InterceptError> {
        self.transition(Phase::Installed, Phase::Activating)?;
        tracing::info!(version = %self.config.version, "activating");

        let names = self.store.keys().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to list cache generations");
            Vec::new()
        });

        let mut deleted = Vec::new();
        for name in names.into_iter().filter(|n| *n != self.config.version) {
            match self.store.delete(&name) {
                Ok(true) => {
                    tracing::info!(generation = %name, "deleted old cache generation");
                    metrics::counter!("intercept_generations_deleted_total").increment(1);
                    deleted.push(name);
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(error = %e, generation = %name, "failed to delete cache generation");
                }
            }
        }

        self.claim();
        self.set_phase(Phase::Activated);
        tracing::info!(version = %self.config.version, "activation complete");
        Ok(ActivateOutcome { deleted })
    }

    fn claim(&self) {
        self.controlling.store(true, Ordering::Release);
        tracing::debug!(version = %self.config.version, "clients claimed");
    }

    /// Handle one outgoing request.
    ///
    /// Errors only when a request that is not served cache-first fails at
    /// the network; cache-first failures become the synthetic offline
    /// response instead.
    pub async fn on_request(&self, request: Request<Bytes>) -> Result<Intercepted, InterceptError> {
        if !self.is_controlling() {
            tracing::debug!(uri = %request.uri(), "not controlling, passing through");
            return self.pass_through(request).await;
        }

        let route = policy::classify(&request, &self.origin, &self.allowed);
        metrics::counter!("intercept_requests_total", "route" => route.as_str()).increment(1);

        match route {
            Route::External => {
                tracing::debug!(uri = %request.uri(), "allowing external resource");
                self.pass_through(request).await
            }
            Route::NonRead => {
                tracing::debug!(method = %request.method(), uri = %request.uri(), "skipping non-read request");
                self.pass_through(request).await
            }
            Route::CacheFirst => Ok(self.cache_first(request).await),
            Route::PassThrough => self.pass_through(request).await,
        }
    }

    async fn pass_through(&self, mut request: Request<Bytes>) -> Result<Intercepted, InterceptError> {
        if self.origin.is_same(request.uri()) {
            *request.uri_mut() = policy::origin_form(request.uri());
        }
        let response = self.fetcher.fetch(request).await?;
        Ok(Intercepted {
            response,
            source: Source::Bypass,
        })
    }

    async fn cache_first(&self, mut request: Request<Bytes>) -> Intercepted {
        let url = self.origin.resolve(request.uri());
        let key = RequestKey::new(request.method(), &url);

        match self.store.match_request(&key) {
            Ok(Some(cached)) => {
                tracing::debug!(key = %key, "serving from cache");
                metrics::counter!("intercept_cache_hits_total").increment(1);
                return Intercepted {
                    response: cached.to_response(),
                    source: Source::Cache,
                };
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "cache lookup failed, treating as miss");
            }
        }
        metrics::counter!("intercept_cache_misses_total").increment(1);

        *request.uri_mut() = policy::origin_form(&url);
        match self.fetcher.fetch(request).await {
            Ok(response) if response.status() == StatusCode::OK => {
                let (live, copy) = ResponseCapture::new(response).tee();
                self.persist(key, copy);
                Intercepted {
                    response: live,
                    source: Source::Network,
                }
            }
            Ok(response) => Intercepted {
                response,
                source: Source::Network,
            },
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "network unavailable, serving offline response");
                metrics::counter!("intercept_offline_total").increment(1);
                Intercepted {
                    response: self.offline_response(),
                    source: Source::Offline,
                }
            }
        }
    }

    /// Store the copy in the background. The caller's response never waits
    /// on, or fails because of, this write.
    ///
    /// The write goes only into a generation that still exists. Once a newer
    /// version has deleted this one, the put fails with `UnknownGeneration`
    /// and is dropped.
    fn persist(&self, key: RequestKey, copy: CachedResponse) {
        let store = Arc::clone(&self.store);
        let version = self.config.version.clone();

        self.persist_tasks.spawn(async move {
            match store.put(&version, key.clone(), copy) {
                Ok(()) => tracing::debug!(key = %key, generation = %version, "cached response"),
                Err(e) => tracing::warn!(error = %e, key = %key, "cache put failed"),
            }
        });
    }

    fn offline_response(&self) -> Response<Bytes> {
        let mut response = Response::new(Bytes::from(self.config.offline_body.clone()));
        *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        response
    }

    /// Wait for every in-flight cache write to finish.
    pub async fn settle(&self) {
        self.persist_tasks.close();
        self.persist_tasks.wait().await;
        self.persist_tasks.reopen();
    }
}

//! SDK Loader
//!
//! Makes a streaming-client factory available, trying delivery sources in
//! priority order. The loaded factory lives in an [`SdkRegistry`]: shared,
//! process-wide state that is written at most once and read by every later
//! bootstrap. It is only reset by discarding the registry (a page reload).

use crate::client::StreamingClient;
use crate::credentials::SessionToken;
use crate::error::{BootstrapError, ClientError};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Builds streaming clients. This is what the SDK exports.
pub trait ClientFactory: Send + Sync {
    fn create(&self, token: &SessionToken) -> Result<Arc<dyn StreamingClient>, ClientError>;
}

struct RegistryInner {
    factory: OnceLock<Arc<dyn ClientFactory>>,
    load_guard: Mutex<()>,
}

/// The slot holding the loaded SDK factory. Cloning shares the slot.
#[derive(Clone)]
pub struct SdkRegistry {
    inner: Arc<RegistryInner>,
}

static GLOBAL_REGISTRY: OnceLock<SdkRegistry> = OnceLock::new();

impl Default for SdkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SdkRegistry {
    /// An empty, private registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                factory: OnceLock::new(),
                load_guard: Mutex::new(()),
            }),
        }
    }

    /// The process-wide registry.
    pub fn global() -> SdkRegistry {
        GLOBAL_REGISTRY.get_or_init(SdkRegistry::new).clone()
    }

    pub fn get(&self) -> Option<Arc<dyn ClientFactory>> {
        self.inner.factory.get().cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.factory.get().is_some()
    }

    /// Publishes a factory. The first write wins; the winning factory is returned.
    pub fn install(&self, factory: Arc<dyn ClientFactory>) -> Arc<dyn ClientFactory> {
        if self.is_loaded() {
            debug!("SDK factory already installed, keeping the first one");
        }
        self.inner.factory.get_or_init(|| factory).clone()
    }
}

/// What a source produced once its load finished.
pub enum Delivery {
    /// A module import that yields the factory directly.
    Module(Arc<dyn ClientFactory>),
    /// An injected script. It publishes into the registry on its own,
    /// possibly some time after the load event.
    Script,
}

/// One place the SDK can be delivered from.
#[async_trait]
pub trait SdkSource: Send + Sync {
    fn name(&self) -> &str;

    /// Resolves on the load event, fails on the error event.
    async fn deliver(&self, registry: &SdkRegistry) -> Result<Delivery>;
}

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const POLL_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SdkLoader {
    sources: Vec<Arc<dyn SdkSource>>,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl SdkLoader {
    pub fn new(sources: Vec<Arc<dyn SdkSource>>) -> Self {
        Self {
            sources,
            poll_interval: POLL_INTERVAL,
            poll_timeout: POLL_TIMEOUT,
        }
    }

    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_timeout = timeout;
        self
    }

    /// Returns the factory, loading it if no earlier call has.
    ///
    /// Concurrent callers wait on the same load; once the factory is
    /// present no source is touched again.
    #[instrument(skip_all)]
    pub async fn load(&self, registry: &SdkRegistry) -> Result<Arc<dyn ClientFactory>, BootstrapError> {
        if let Some(factory) = registry.get() {
            return Ok(factory);
        }

        let _guard = registry.inner.load_guard.lock().await;
        if let Some(factory) = registry.get() {
            debug!("SDK was loaded by a concurrent caller");
            return Ok(factory);
        }

        for source in &self.sources {
            let name = source.name();
            debug!(source = %name, "Trying SDK source");
            match source.deliver(registry).await {
                Ok(Delivery::Module(factory)) => {
                    info!(source = %name, "SDK loaded from module");
                    return Ok(registry.install(factory));
                }
                Ok(Delivery::Script) => match self.wait_for_factory(registry).await {
                    Some(factory) => {
                        info!(source = %name, "SDK loaded from script");
                        return Ok(factory);
                    }
                    None => warn!(
                        source = %name,
                        timeout_ms = self.poll_timeout.as_millis() as u64,
                        "Script loaded but never published the SDK"
                    ),
                },
                Err(e) => warn!(source = %name, error = %e, "SDK source failed"),
            }
        }

        Err(BootstrapError::SdkLoadFailed)
    }

    async fn wait_for_factory(&self, registry: &SdkRegistry) -> Option<Arc<dyn ClientFactory>> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        tokio::time::timeout(self.poll_timeout, async {
            loop {
                ticker.tick().await;
                if let Some(factory) = registry.get() {
                    return factory;
                }
            }
        })
        .await
        .ok()
    }
}

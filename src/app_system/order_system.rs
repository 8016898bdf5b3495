use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::broker::{EventNotifier, Subscription, TopicExchange, EVENTS_EXCHANGE};
use crate::cache::{CacheActor, CacheStore, ListCache};
use crate::clients::{Catalog, HttpCatalog};
use crate::config::Config;
use crate::context::RequestContext;
use crate::resolver::ProductResolver;
use crate::service::OrderService;
use crate::store::{OrderStore, OrderStoreActor, PgOrderStore};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const ACTOR_BUFFER: usize = 256;

/// Cache lifetimes and the request and detached-work bounds.
#[derive(Debug, Clone)]
pub struct SystemSettings {
    pub product_cache_ttl: Duration,
    pub order_list_cache_ttl: Duration,
    pub background_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            product_cache_ttl: ProductResolver::DEFAULT_TTL,
            order_list_cache_ttl: ListCache::DEFAULT_TTL,
            background_timeout: OrderService::DEFAULT_BACKGROUND_TIMEOUT,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&Config> for SystemSettings {
    fn from(config: &Config) -> Self {
        Self {
            product_cache_ttl: config.product_cache_ttl,
            order_list_cache_ttl: config.order_list_cache_ttl,
            background_timeout: config.background_timeout,
            request_timeout: config.request_timeout,
        }
    }
}

/// The running service: shared clients wired into one [`OrderService`].
///
/// Responsible for starting the cache and store actors, binding the event audit
/// consumer, and draining everything on shutdown.
pub struct OrderSystem {
    service: OrderService,
    events: TopicExchange,
    request_timeout: Duration,
    handles: Vec<JoinHandle<()>>,
}

impl OrderSystem {
    /// Starts with the in-process order store.
    pub fn new(catalog: Arc<dyn Catalog>, settings: SystemSettings) -> Self {
        let (store_actor, store_client) = OrderStoreActor::new(ACTOR_BUFFER);
        let store_handle = tokio::spawn(store_actor.run());
        let mut system = Self::with_store(catalog, Arc::new(store_client), settings);
        system.handles.push(store_handle);
        system
    }

    pub fn with_store(catalog: Arc<dyn Catalog>, store: Arc<dyn OrderStore>, settings: SystemSettings) -> Self {
        let (cache_actor, cache_client) = CacheActor::new(ACTOR_BUFFER);
        let cache_handle = tokio::spawn(cache_actor.run());
        let cache: Arc<dyn CacheStore> = Arc::new(cache_client);

        let events = TopicExchange::new(EVENTS_EXCHANGE);
        let audit_handle = tokio::spawn(audit_events(events.bind("order.*")));

        let service = OrderService::new(
            ProductResolver::new(cache.clone(), catalog, settings.product_cache_ttl),
            store,
            ListCache::new(cache, settings.order_list_cache_ttl),
            EventNotifier::new(Arc::new(events.clone())),
            settings.background_timeout,
        );

        Self {
            service,
            events,
            request_timeout: settings.request_timeout,
            handles: vec![cache_handle, audit_handle],
        }
    }

    /// Connects the collaborators named in `config`: the HTTP catalog, and Postgres
    /// when a database is configured.
    pub async fn from_config(config: &Config) -> Result<Self, BoxError> {
        let catalog = Arc::new(HttpCatalog::new(&config.product_service_url, config.catalog_timeout)?);
        let settings = SystemSettings::from(config);

        match &config.database {
            Some(options) => {
                let store = PgOrderStore::connect(options.clone(), &config.postgres).await?;
                store.ensure_schema().await?;
                Ok(Self::with_store(catalog, Arc::new(store), settings))
            }
            None => {
                info!("No database configured, using in-process order store");
                Ok(Self::new(catalog, settings))
            }
        }
    }

    pub fn service(&self) -> &OrderService {
        &self.service
    }

    /// Context for one inbound request, bounded by the configured request timeout.
    pub fn request_context(&self) -> RequestContext {
        RequestContext::with_timeout(self.request_timeout)
    }

    /// The `events` topic exchange, for binding additional consumers.
    pub fn events(&self) -> &TopicExchange {
        &self.events
    }

    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");
        self.service.shutdown().await;

        // Actors stop once every client handle is gone.
        drop(self.service);
        drop(self.events);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(format!("Actor task failed: {:?}", e));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}

#[instrument(name = "event_audit", skip(subscription))]
async fn audit_events(mut subscription: Subscription) {
    while let Some(delivery) = subscription.recv().await {
        info!(
            routing_key = %delivery.routing_key,
            body = %String::from_utf8_lossy(&delivery.body),
            "Event published"
        );
    }
}

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use super::CacheStore;
use crate::context::RequestContext;
use crate::error::CacheError;
use crate::messages::CacheRequest;

/// Expired entries are swept after this many writes.
const SWEEP_EVERY: usize = 256;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process TTL cache. Expired entries read as misses and are dropped lazily.
pub struct CacheActor {
    receiver: mpsc::Receiver<CacheRequest>,
    entries: HashMap<String, Entry>,
    writes_since_sweep: usize,
}

impl CacheActor {
    pub fn new(buffer_size: usize) -> (Self, CacheClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            entries: HashMap::new(),
            writes_since_sweep: 0,
        };
        (actor, CacheClient::new(sender))
    }

    #[instrument(name = "cache", skip(self))]
    pub async fn run(mut self) {
        info!("Cache starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                CacheRequest::Get { key, respond_to } => {
                    let _ = respond_to.send(Ok(self.live_value(&key)));
                }
                CacheRequest::Set { key, value, ttl, respond_to } => {
                    self.handle_set(key, value, ttl);
                    let _ = respond_to.send(Ok(()));
                }
                CacheRequest::Delete { key, respond_to } => {
                    let removed = self
                        .entries
                        .remove(&key)
                        .is_some_and(|entry| entry.expires_at > Instant::now());
                    let _ = respond_to.send(Ok(removed));
                }
                #[cfg(test)]
                CacheRequest::Len { respond_to } => {
                    let _ = respond_to.send(Ok(self.entries.len()));
                }
            }
        }
        info!("Cache stopped");
    }

    fn live_value(&mut self, key: &str) -> Option<String> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                debug!(key, "Entry expired");
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn handle_set(&mut self, key: String, value: String, ttl: Duration) {
        self.entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        self.writes_since_sweep += 1;
        if self.writes_since_sweep >= SWEEP_EVERY {
            let now = Instant::now();
            self.entries.retain(|_, entry| entry.expires_at > now);
            self.writes_since_sweep = 0;
        }
    }
}

/// Handle to a [`CacheActor`].
#[derive(Clone)]
pub struct CacheClient {
    sender: mpsc::Sender<CacheRequest>,
}

impl CacheClient {
    pub fn new(sender: mpsc::Sender<CacheRequest>) -> Self {
        Self { sender }
    }
}

client_method!(CacheClient => fn get_entry(key: String) -> Option<String> as CacheRequest::Get, Error = CacheError);
client_method!(CacheClient => fn set_entry(key: String, value: String, ttl: Duration) -> () as CacheRequest::Set, Error = CacheError);
client_method!(CacheClient => fn delete_entry(key: String) -> bool as CacheRequest::Delete, Error = CacheError);
#[cfg(test)]
client_method!(CacheClient => fn len() -> usize as CacheRequest::Len, Error = CacheError);

#[async_trait]
impl CacheStore for CacheClient {
    async fn get(&self, ctx: &RequestContext, key: &str) -> Result<Option<String>, CacheError> {
        ctx.run(self.get_entry(key.to_string())).await?
    }

    async fn set(&self, ctx: &RequestContext, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        ctx.run(self.set_entry(key.to_string(), value, ttl)).await?
    }

    async fn delete(&self, ctx: &RequestContext, key: &str) -> Result<bool, CacheError> {
        ctx.run(self.delete_entry(key.to_string())).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_cache() -> CacheClient {
        let (actor, client) = CacheActor::new(16);
        tokio::spawn(actor.run());
        client
    }

    #[tokio::test]
    async fn set_get_delete() {
        let cache = spawn_cache();
        let ctx = RequestContext::new();

        assert_eq!(cache.get(&ctx, "k").await, Ok(None));
        cache.set(&ctx, "k", "v".into(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get(&ctx, "k").await, Ok(Some("v".into())));

        assert_eq!(cache.delete(&ctx, "k").await, Ok(true));
        assert_eq!(cache.delete(&ctx, "k").await, Ok(false));
        assert_eq!(cache.get(&ctx, "k").await, Ok(None));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = spawn_cache();
        let ctx = RequestContext::new();
        cache.set(&ctx, "k", "v".into(), Duration::from_secs(300)).await.unwrap();

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get(&ctx, "k").await, Ok(Some("v".into())));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(&ctx, "k").await, Ok(None));
        assert_eq!(cache.len().await, Ok(0));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_drops_expired_entries() {
        let cache = spawn_cache();
        let ctx = RequestContext::new();
        cache.set(&ctx, "old", "v".into(), Duration::from_secs(1)).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        for i in 0..SWEEP_EVERY {
            cache.set(&ctx, &format!("k{i}"), "v".into(), Duration::from_secs(60)).await.unwrap();
        }
        assert_eq!(cache.len().await, Ok(SWEEP_EVERY));
    }

    #[tokio::test]
    async fn overwrite_replaces_value() {
        let cache = spawn_cache();
        let ctx = RequestContext::new();
        cache.set(&ctx, "k", "a".into(), Duration::from_secs(60)).await.unwrap();
        cache.set(&ctx, "k", "b".into(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get(&ctx, "k").await, Ok(Some("b".into())));
    }
}

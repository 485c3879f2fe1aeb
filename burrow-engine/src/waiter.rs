//! Per-`"account/queue"` rendezvous registry.
//!
//! `notify` wakes every waiter parked on a key at the moment it runs, not
//! just one: each call that observes N currently parked waiters delivers N
//! wake tokens, one per waiter. It is edge-triggered — a `notify` with
//! nobody parked is simply lost, there is no payload and no queued-up
//! backlog of tokens for a later `wait` call.

use std::{collections::HashMap, sync::Mutex, time::Duration};
use tokio::{sync::Notify, time::timeout};

struct Entry {
    notify: std::sync::Arc<Notify>,
    parked: usize,
}

#[derive(Default)]
pub struct WaiterRegistry {
    entries: Mutex<HashMap<String, Entry>>,
}

impl WaiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(account: &str, queue: &str) -> String {
        format!("{}/{}", account, queue)
    }

    /// Wake every waiter currently parked on `account/queue`. No-op if
    /// nobody is parked there.
    pub fn notify(&self, account: &str, queue: &str) {
        let key = Self::key(account, queue);
        let entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get(&key) {
            for _ in 0..entry.parked {
                entry.notify.notify_one();
            }
        }
    }

    /// Park on `account/queue` until woken by `notify` or until `duration`
    /// elapses, whichever comes first. Creates the rendezvous entry if
    /// absent, and removes it again if this was the last parked waiter.
    pub async fn wait(&self, account: &str, queue: &str, duration: Duration) {
        let key = Self::key(account, queue);
        let notify = {
            let mut entries = self.entries.lock().unwrap();
            let entry = entries.entry(key.clone()).or_insert_with(|| Entry {
                notify: std::sync::Arc::new(Notify::new()),
                parked: 0,
            });
            entry.parked += 1;
            entry.notify.clone()
        };

        let _ = timeout(duration, notify.notified()).await;

        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(&key) {
            entry.parked -= 1;
            if entry.parked == 0 {
                entries.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn notify_with_no_waiter_is_lost() {
        let registry = WaiterRegistry::new();
        registry.notify("a", "q");
        // does not panic, does not block; nothing to observe
    }

    #[tokio::test]
    async fn notify_wakes_every_parked_waiter() {
        let registry = Arc::new(WaiterRegistry::new());
        let mut handles = Vec::new();
        for _ in 0..3 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.wait("a", "q", Duration::from_secs(5)).await;
            }));
        }
        // give the spawned tasks a chance to park
        tokio::time::sleep(Duration::from_millis(50)).await;
        registry.notify("a", "q");
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .expect("waiter should have woken promptly")
                .unwrap();
        }
    }

    #[tokio::test]
    async fn wait_times_out_without_notify() {
        let registry = WaiterRegistry::new();
        let start = tokio::time::Instant::now();
        registry.wait("a", "q", Duration::from_millis(20)).await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}

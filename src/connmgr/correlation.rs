//! Command/response correlation: a monotonic id counter plus a single-slot
//! waiter per in-flight command, per connection.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::wire::CommandResponse;

/// Registers waiters for one connection's outbound commands and resolves
/// them as responses arrive off the read path.
#[derive(Default)]
pub struct Correlator {
    next_id: AtomicU64,
    waiters: DashMap<u64, oneshot::Sender<CommandResponse>>,
}

impl Correlator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next command id and registers a waiter for it.
    #[must_use]
    pub fn register(&self) -> (u64, oneshot::Receiver<CommandResponse>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = oneshot::channel();
        self.waiters.insert(id, tx);
        (id, rx)
    }

    /// Delivers a response to its waiter, if one is still registered.
    /// Returns `true` if a waiter consumed it (meaning the read path should
    /// NOT forward this frame as data).
    pub fn resolve(&self, id: u64, response: CommandResponse) -> bool {
        if let Some((_, tx)) = self.waiters.remove(&id) {
            let _ = tx.send(response);
            true
        } else {
            false
        }
    }

    /// Drops a waiter without resolving it, used on timeout/cancel cleanup.
    pub fn forget(&self, id: u64) {
        self.waiters.remove(&id);
    }

    /// Waits for a response with the given deadline, converting the
    /// `CommandResponse` into a `Result<(sid, channel)>` for a subscribe.
    pub async fn await_subscribe(
        &self,
        id: u64,
        rx: oneshot::Receiver<CommandResponse>,
        deadline: std::time::Duration,
    ) -> Result<(i64, String)> {
        match timeout(deadline, rx).await {
            Ok(Ok(CommandResponse::Subscribed { sid, channel })) => Ok((sid, channel)),
            Ok(Ok(CommandResponse::Error { code, message })) => {
                Err(Error::CommandRejected { code, message })
            }
            Ok(Ok(CommandResponse::Unsubscribed)) => {
                Err(Error::CommandRejected {
                    code: "unexpected".into(),
                    message: "expected subscribed, got unsubscribed".into(),
                })
            }
            Ok(Err(_)) => Err(Error::NotConnected),
            Err(_) => {
                self.forget(id);
                Err(Error::Timeout)
            }
        }
    }

    /// Waits for a response to an unsubscribe command: any ack is success,
    /// only a server-reported error is surfaced.
    pub async fn await_unsubscribe(
        &self,
        id: u64,
        rx: oneshot::Receiver<CommandResponse>,
        deadline: std::time::Duration,
    ) -> Result<()> {
        match timeout(deadline, rx).await {
            Ok(Ok(CommandResponse::Unsubscribed | CommandResponse::Subscribed { .. })) => Ok(()),
            Ok(Ok(CommandResponse::Error { code, message })) => {
                Err(Error::CommandRejected { code, message })
            }
            Ok(Err(_)) => Err(Error::NotConnected),
            Err(_) => {
                self.forget(id);
                Err(Error::Timeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_delivers_to_registered_waiter() {
        let correlator = Correlator::new();
        let (id, rx) = correlator.register();
        assert!(correlator.resolve(
            id,
            CommandResponse::Subscribed {
                sid: 7,
                channel: "orderbook_delta".into()
            }
        ));
        let result = correlator.await_subscribe(id, rx, std::time::Duration::from_secs(1)).await;
        assert_eq!(result.unwrap(), (7, "orderbook_delta".to_string()));
    }

    #[tokio::test]
    async fn timeout_forgets_the_waiter() {
        let correlator = Correlator::new();
        let (id, rx) = correlator.register();
        let result = correlator
            .await_subscribe(id, rx, std::time::Duration::from_millis(10))
            .await;
        assert!(matches!(result, Err(Error::Timeout)));
        assert!(!correlator.resolve(id, CommandResponse::Unsubscribed));
    }

    #[test]
    fn resolve_unknown_id_returns_false() {
        let correlator = Correlator::new();
        assert!(!correlator.resolve(999, CommandResponse::Unsubscribed));
    }

    #[test]
    fn ids_are_monotonic() {
        let correlator = Correlator::new();
        let (id1, _) = correlator.register();
        let (id2, _) = correlator.register();
        assert!(id2 > id1);
    }
}

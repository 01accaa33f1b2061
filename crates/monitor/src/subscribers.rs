use schema::FreezeStatus;
use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

pub type SubscriberId = u64;

/// Registered freeze-status listeners. Each gets a bounded channel; delivery
/// never waits on a subscriber.
#[derive(Debug, Default)]
pub(crate) struct Subscribers {
    next_id: SubscriberId,
    senders: HashMap<SubscriberId, mpsc::Sender<FreezeStatus>>,
}

impl Subscribers {
    pub(crate) fn register(
        &mut self,
        capacity: usize,
    ) -> (SubscriberId, mpsc::Receiver<FreezeStatus>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let id = self.next_id;
        self.next_id += 1;
        self.senders.insert(id, tx);
        (id, rx)
    }

    pub(crate) fn remove(&mut self, id: SubscriberId) -> bool {
        self.senders.remove(&id).is_some()
    }

    pub(crate) fn snapshot(&self) -> Vec<(SubscriberId, mpsc::Sender<FreezeStatus>)> {
        self.senders
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.senders.len()
    }
}

/// Send `status` to every target; returns the ids that are closed or full.
pub(crate) fn deliver(
    targets: Vec<(SubscriberId, mpsc::Sender<FreezeStatus>)>,
    status: &FreezeStatus,
) -> Vec<SubscriberId> {
    let mut failed = Vec::new();
    for (id, tx) in targets {
        match tx.try_send(status.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(subscriber = id, "Freeze subscriber lagging, dropping it");
                failed.push(id);
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(subscriber = id, "Freeze subscriber gone");
                failed.push(id);
            }
        }
    }
    failed
}

// src/engine/observers.rs

//! Replay-latest-then-live subscription feeds.
//!
//! A subscriber is bound to one chain record:
//! - it first receives the current snapshot of the chain (`changed = None`)
//! - then every update of that record, in the order it was produced
//! - its feed is closed right after the terminal update
//!
//! Subscribing to a name with no record yet binds to the next record
//! started under that name. A subscriber whose receiver is gone is dropped.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::chain::{ChainSnapshot, ChainUpdate};

#[derive(Debug)]
struct Subscriber {
    /// Record this feed follows; `None` until the first record shows up.
    record: Option<u64>,
    feed: mpsc::UnboundedSender<ChainUpdate>,
}

#[derive(Debug, Default)]
pub struct ObserverRegistry {
    subscribers: HashMap<String, Vec<Subscriber>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feed for `chain`, replaying `current` first if there is one.
    pub fn subscribe(
        &mut self,
        chain: &str,
        feed: mpsc::UnboundedSender<ChainUpdate>,
        current: Option<ChainSnapshot>,
    ) {
        let record = match current {
            Some(snapshot) => {
                let record = snapshot.record;
                let terminal = snapshot.terminal;
                let replay = ChainUpdate {
                    changed: None,
                    snapshot,
                };
                if feed.send(replay).is_err() {
                    warn!(chain = %chain, "observer went away before the replay; dropping it");
                    return;
                }
                if terminal {
                    debug!(chain = %chain, record, "chain already finished; feed completed");
                    return;
                }
                Some(record)
            }
            None => None,
        };

        debug!(chain = %chain, ?record, "observer subscribed");
        self.subscribers
            .entry(chain.to_string())
            .or_default()
            .push(Subscriber { record, feed });
    }

    /// Deliver an update to every subscriber of its chain record.
    pub fn publish(&mut self, update: &ChainUpdate) {
        let chain = update.snapshot.chain.as_str();
        let record = update.snapshot.record;
        let Some(subscribers) = self.subscribers.get_mut(chain) else {
            return;
        };

        subscribers.retain_mut(|sub| {
            let bound = *sub.record.get_or_insert(record);
            if bound != record {
                debug!(chain = %chain, bound, record, "observer followed a superseded record");
                return false;
            }
            if sub.feed.send(update.clone()).is_err() {
                warn!(chain = %chain, record, "observer feed closed; dropping subscription");
                return false;
            }
            !update.snapshot.terminal
        });

        if subscribers.is_empty() {
            self.subscribers.remove(chain);
        }
    }
}

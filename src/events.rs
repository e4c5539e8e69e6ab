//! Change notifications published by the save manager.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::error;

use crate::schema::{CatchLogEntry, SaveDataV1};

#[derive(Clone, Debug, PartialEq)]
pub enum SaveEvent {
    /// The in-memory profile changed. Published before any disk write.
    DataChanged {
        revision: u64,
        snapshot: Arc<SaveDataV1>,
    },
    CatchRecorded(CatchLogEntry),
    LevelChanged {
        previous: i32,
        current: i32,
    },
    TripCompleted {
        total_trips: i32,
    },
    PurchaseRecorded {
        item_id: String,
        price_copecs: i64,
        total_purchases: i32,
    },
}

impl SaveEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SaveEvent::DataChanged { .. } => "data_changed",
            SaveEvent::CatchRecorded(_) => "catch_recorded",
            SaveEvent::LevelChanged { .. } => "level_changed",
            SaveEvent::TripCompleted { .. } => "trip_completed",
            SaveEvent::PurchaseRecorded { .. } => "purchase_recorded",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&SaveEvent)>;

#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&SaveEvent) + 'static) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` when `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Delivers `event` to every listener in subscription order. A panicking
    /// listener is logged and skipped; the rest still run.
    pub fn emit(&mut self, event: &SaveEvent) {
        for (id, listener) in &mut self.listeners {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(event)));
            if let Err(payload) = outcome {
                error!(
                    listener = id.0,
                    event = event.name(),
                    reason = panic_message(payload.as_ref()),
                    "save event listener panicked"
                );
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

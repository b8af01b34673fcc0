//! In-process change feed. Every mutation publishes a [`ChangeEvent`]; the SSE
//! endpoint hands each subscriber only the events of its own user. Clients are
//! expected to re-fetch on any event rather than patch local state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{trace, warn};
use utoipa::ToSchema;

/// The logical table (or the auth system) an event originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTopic {
    Transactions,
    RecurringExpenses,
    Auth,
}

impl ChangeTopic {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeTopic::Transactions => "transactions",
            ChangeTopic::RecurringExpenses => "recurring_expenses",
            ChangeTopic::Auth => "auth",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
    SignedIn,
    SignedOut,
    PasswordUpdated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChangeEvent {
    pub user_id: i32,
    pub topic: ChangeTopic,
    pub action: ChangeAction,
    /// Affected row, absent for batch inserts and auth events.
    pub record_id: Option<i32>,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(user_id: i32, topic: ChangeTopic, action: ChangeAction, record_id: Option<i32>) -> Self {
        Self {
            user_id,
            topic,
            action,
            record_id,
            at: Utc::now(),
        }
    }
}

/// What a subscriber gets out of its feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedItem {
    Change(ChangeEvent),
    /// The subscriber fell behind and this many events were dropped.
    Resync(u64),
}

/// Broadcast hub shared through the application state.
///
/// Besides fanning events out it counts them per user. The count is the
/// user's data revision: anything derived from the user's rows and tagged
/// with an older revision is stale.
#[derive(Debug, Clone)]
pub struct ChangeHub {
    sender: broadcast::Sender<ChangeEvent>,
    revisions: Arc<Mutex<HashMap<i32, u64>>>,
}

impl ChangeHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            revisions: Arc::default(),
        }
    }

    /// Number of events published so far for the user.
    pub fn revision(&self, user_id: i32) -> u64 {
        let revisions = self.revisions.lock().unwrap_or_else(PoisonError::into_inner);
        revisions.get(&user_id).copied().unwrap_or(0)
    }

    /// Bumps the user's revision, then broadcasts the event. Returns the
    /// number of subscribers the event reached.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        trace!(user_id = event.user_id, topic = event.topic.as_str(), "Publishing change event");
        {
            let mut revisions = self.revisions.lock().unwrap_or_else(PoisonError::into_inner);
            *revisions.entry(event.user_id).or_insert(0) += 1;
        }
        // no subscribers is not an error, events are fire and forget
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self, user_id: i32) -> UserFeed {
        UserFeed {
            user_id,
            receiver: self.sender.subscribe(),
        }
    }
}

/// Receiving side filtered to a single user.
#[derive(Debug)]
pub struct UserFeed {
    user_id: i32,
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl UserFeed {
    /// Waits for the next event of this user. `None` once the hub is gone.
    pub async fn next(&mut self) -> Option<FeedItem> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.user_id == self.user_id => return Some(FeedItem::Change(event)),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(user_id = self.user_id, skipped, "Realtime subscriber lagged");
                    return Some(FeedItem::Resync(skipped));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

//! Messages between sessions, background requests and the list owner.
//!
//! Sessions publish confirmed records on [`UserEvents`]; the list owner
//! subscribes once at startup and applies what it drains. Request tasks
//! report back to the UI loop with [`TaskResult`].

use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::api::{UserId, UserRecord};
use crate::error::StoreResult;
use crate::state::DeleteTicket;

const EVENT_CAPACITY: usize = 64;

/// A server-confirmed change to the user collection.
#[derive(Clone, Debug, PartialEq)]
pub enum UserEvent {
    Loaded(Vec<UserRecord>),
    Created(UserRecord),
    Updated(UserRecord),
}

/// Publish/subscribe hub for [`UserEvent`]s.
#[derive(Clone, Debug)]
pub struct UserEvents {
    tx: broadcast::Sender<UserEvent>,
}

impl UserEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UserEvent> {
        self.tx.subscribe()
    }

    /// Returns the number of subscribers that will see the event.
    pub fn publish(&self, event: UserEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(broadcast::error::SendError(event)) => {
                debug!(?event, "no subscribers for user event");
                0
            }
        }
    }
}

impl Default for UserEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a request that ran off the UI loop.
#[derive(Debug)]
pub enum TaskResult {
    Loaded(StoreResult<Vec<UserRecord>>),
    Committed {
        /// Record being edited; `None` for a create.
        target: Option<UserId>,
        result: StoreResult<UserRecord>,
    },
    Deleted {
        ticket: DeleteTicket,
        result: StoreResult<u16>,
    },
}

impl TaskResult {
    /// Record the result concerns, when there is exactly one.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            TaskResult::Deleted { ticket, .. } => Some(ticket.id()),
            TaskResult::Committed { target, result } => {
                target.or_else(|| result.as_ref().ok().map(|r| r.id))
            }
            TaskResult::Loaded(_) => None,
        }
    }
}

pub type TaskSender = mpsc::UnboundedSender<TaskResult>;
pub type TaskReceiver = mpsc::UnboundedReceiver<TaskResult>;

pub fn task_channel() -> (TaskSender, TaskReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_reaches_every_subscriber() {
        let events = UserEvents::new();
        let mut a = events.subscribe();
        let mut b = events.subscribe();
        let rec = UserRecord::new(11, "A", "a", "a@x.com", "NY");
        assert_eq!(events.publish(UserEvent::Created(rec.clone())), 2);
        assert_eq!(a.try_recv().unwrap(), UserEvent::Created(rec.clone()));
        assert_eq!(b.try_recv().unwrap(), UserEvent::Created(rec));
    }

    #[test]
    fn publish_without_subscribers_is_harmless() {
        let events = UserEvents::new();
        assert_eq!(events.publish(UserEvent::Loaded(vec![])), 0);
    }
}

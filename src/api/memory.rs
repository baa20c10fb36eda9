use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{Draft, UserId, UserRecord, UserStore};
use crate::error::{StoreError, StoreResult};

/// Which store call a scripted failure applies to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Create,
    Update,
    Delete,
}

/// A scripted answer for the next call to an [`Operation`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Failure {
    /// Answer with this HTTP status. Delete reports it as `Ok(status)`.
    Status(u16),
    /// Fail as if the server were unreachable.
    Transport(String),
}

impl From<u16> for Failure {
    fn from(status: u16) -> Self {
        Failure::Status(status)
    }
}

impl Failure {
    fn into_error(self) -> StoreError {
        match self {
            Failure::Status(status) => StoreError::Status { status },
            Failure::Transport(reason) => StoreError::Connection(reason),
        }
    }
}

/// In-process [`UserStore`]. Clones share state, so a test can keep a
/// handle while the code under test owns another.
#[derive(Clone, Debug, Default)]
pub struct MemoryUserStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    users: Vec<UserRecord>,
    failures: HashMap<Operation, VecDeque<Failure>>,
    calls: Vec<Operation>,
    latency: Option<Duration>,
}

impl MemoryUserStore {
    pub fn new(users: Vec<UserRecord>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                users,
                ..Inner::default()
            })),
        }
    }

    /// A small fixed data set for running without a server.
    pub fn seeded() -> Self {
        Self::new(vec![
            UserRecord::new(1, "Leanne Graham", "Bret", "Sincere@april.biz", "Gwenborough"),
            UserRecord::new(2, "Ervin Howell", "Antonette", "Shanna@melissa.tv", "Wisokyburgh"),
            UserRecord::new(3, "Clementine Bauch", "Samantha", "Nathan@yesenia.net", "McKenziehaven"),
            UserRecord::new(4, "Patricia Lebsack", "Karianne", "Julianne.OConner@kory.org", "South Elvis"),
            UserRecord::new(5, "Chelsey Dietrich", "Kamren", "Lucio_Hettinger@annie.ca", "Roscoeview"),
        ])
    }

    /// Delay every call by `latency` before it touches the data.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.write().latency = Some(latency);
        self
    }

    /// Make the next call to `op` fail instead of succeeding. A bare `u16`
    /// is taken as a status.
    pub fn fail_next(&self, op: Operation, failure: impl Into<Failure>) {
        self.write().failures.entry(op).or_default().push_back(failure.into());
    }

    pub fn users(&self) -> Vec<UserRecord> {
        self.read().users.clone()
    }

    /// Calls served so far, in order.
    pub fn calls(&self) -> Vec<Operation> {
        self.read().calls.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Record the call, wait out any latency, and pop a scripted failure.
    async fn enter(&self, op: Operation) -> Option<Failure> {
        let latency = {
            let mut inner = self.write();
            inner.calls.push(op);
            inner.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let failure = self.write().failures.get_mut(&op).and_then(VecDeque::pop_front);
        if let Some(failure) = &failure {
            debug!(?op, ?failure, "scripted failure");
        }
        failure
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list(&self) -> StoreResult<Vec<UserRecord>> {
        if let Some(failure) = self.enter(Operation::List).await {
            return Err(failure.into_error());
        }
        Ok(self.users())
    }

    async fn create(&self, draft: &Draft) -> StoreResult<UserRecord> {
        if let Some(failure) = self.enter(Operation::Create).await {
            return Err(failure.into_error());
        }
        let mut inner = self.write();
        let id = inner.users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        let record = UserRecord::new(id, &draft.name, &draft.username, &draft.email, &draft.city);
        inner.users.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: UserId, record: &UserRecord) -> StoreResult<UserRecord> {
        if let Some(failure) = self.enter(Operation::Update).await {
            return Err(failure.into_error());
        }
        let mut inner = self.write();
        let slot = inner
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound(id))?;
        *slot = UserRecord {
            id,
            ..record.clone()
        };
        Ok(slot.clone())
    }

    async fn delete(&self, id: UserId) -> StoreResult<u16> {
        match self.enter(Operation::Delete).await {
            Some(Failure::Status(status)) => return Ok(status),
            Some(failure) => return Err(failure.into_error()),
            None => {}
        }
        let mut inner = self.write();
        let before = inner.users.len();
        inner.users.retain(|u| u.id != id);
        Ok(if inner.users.len() < before { 200 } else { 404 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Field;

    #[tokio::test]
    async fn create_assigns_next_id() {
        let store = MemoryUserStore::seeded();
        let draft = Draft::default().with_field(Field::Name, "A");
        let created = store.create(&draft).await.unwrap();
        assert_eq!(created.id, 6);
        assert_eq!(store.users().len(), 6);
    }

    #[tokio::test]
    async fn scripted_delete_failure_is_a_status_not_an_error() {
        let store = MemoryUserStore::seeded();
        store.fail_next(Operation::Delete, 500);
        assert_eq!(store.delete(1).await.unwrap(), 500);
        assert_eq!(store.users().len(), 5);
        assert_eq!(store.delete(1).await.unwrap(), 200);
        assert_eq!(store.calls(), vec![Operation::Delete, Operation::Delete]);
    }

    #[tokio::test]
    async fn scripted_transport_failure_is_an_error_for_every_call() {
        let store = MemoryUserStore::seeded();
        store.fail_next(Operation::Delete, Failure::Transport("reset".into()));
        store.fail_next(Operation::List, Failure::Transport("timed out".into()));

        let err = store.delete(1).await.unwrap_err();
        assert!(matches!(err, StoreError::Connection(ref r) if r == "reset"));
        assert!(err.is_transport());
        assert_eq!(store.users().len(), 5);
        assert!(store.list().await.unwrap_err().is_transport());
        assert_eq!(store.list().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let store = MemoryUserStore::new(vec![]);
        let record = UserRecord::new(9, "x", "x", "x", "x");
        assert!(matches!(store.update(9, &record).await, Err(StoreError::NotFound(9))));
    }
}

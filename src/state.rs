//! In-memory mirror of the remote user collection.
//!
//! Mutations that need the server are split in two phases so the caller
//! can await the request wherever it likes: `begin_*` marks the record as
//! pending (and, for delete, removes it right away), then `settle_*` /
//! [`UserList::release`] reconciles. A record with a pending marker
//! refuses a second mutation with [`StoreError::Busy`].

use std::collections::HashMap;

use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{info, warn};

use crate::api::{UserId, UserRecord, UserStore, is_success};
use crate::error::{StoreError, StoreResult};
use crate::events::UserEvent;
use crate::notice::{Notice, NoticeKind};

/// Kind of unreconciled operation on a record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PendingOp {
    Update,
    Delete,
}

/// Everything needed to undo an optimistic delete.
#[derive(Debug)]
pub struct DeleteTicket {
    record: UserRecord,
    index: usize,
    snapshot: Vec<UserRecord>,
    revision: u64,
}

impl DeleteTicket {
    pub fn id(&self) -> UserId {
        self.record.id
    }

    pub fn record(&self) -> &UserRecord {
        &self.record
    }
}

/// Ordered collection, unique by id, in arrival order.
#[derive(Debug, Default)]
pub struct UserList {
    users: Vec<UserRecord>,
    pending: HashMap<UserId, PendingOp>,
    revision: u64,
}

impl UserList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(users: Vec<UserRecord>) -> Self {
        let mut list = Self::new();
        list.set_all(users);
        list
    }

    pub fn users(&self) -> &[UserRecord] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn get(&self, id: UserId) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn position(&self, id: UserId) -> Option<usize> {
        self.users.iter().position(|u| u.id == id)
    }

    pub fn pending(&self, id: UserId) -> Option<PendingOp> {
        self.pending.get(&id).copied()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Fetch the full list and replace the collection with it. On failure
    /// the collection is left as it was.
    pub async fn load(&mut self, store: &dyn UserStore) -> StoreResult<usize> {
        match store.list().await {
            Ok(users) => {
                let n = users.len();
                self.set_all(users);
                Ok(n)
            }
            Err(err) => {
                warn!(error = %err, "loading users failed");
                Err(err)
            }
        }
    }

    /// Replace the whole collection. Later duplicates of an id are dropped.
    pub fn set_all(&mut self, users: Vec<UserRecord>) {
        let mut seen = std::collections::HashSet::with_capacity(users.len());
        let before = users.len();
        self.users = users.into_iter().filter(|u| seen.insert(u.id)).collect();
        if self.users.len() < before {
            warn!(dropped = before - self.users.len(), "duplicate ids in user list");
        }
        self.revision += 1;
        info!(count = self.users.len(), "user list loaded");
    }

    /// Add `record` at the tail. An existing record with the same id is
    /// removed first.
    pub fn append(&mut self, record: UserRecord) {
        if let Some(pos) = self.position(record.id) {
            warn!(id = record.id, "appended id already present; moving to tail");
            self.users.remove(pos);
        }
        self.users.push(record);
        self.revision += 1;
    }

    /// Swap in `updated` where its id sits. Returns false when the id is unknown.
    pub fn replace(&mut self, updated: UserRecord) -> bool {
        match self.users.iter_mut().find(|u| u.id == updated.id) {
            Some(slot) => {
                *slot = updated;
                self.revision += 1;
                true
            }
            None => {
                warn!(id = updated.id, "update for a user not in the list");
                false
            }
        }
    }

    pub fn apply(&mut self, event: &UserEvent) {
        match event {
            UserEvent::Loaded(users) => self.set_all(users.clone()),
            UserEvent::Created(record) => self.append(record.clone()),
            UserEvent::Updated(record) => {
                self.replace(record.clone());
            }
        }
    }

    /// Apply every event waiting on `rx`. Returns how many were applied.
    pub fn drain(&mut self, rx: &mut broadcast::Receiver<UserEvent>) -> usize {
        let mut applied = 0;
        loop {
            match rx.try_recv() {
                Ok(event) => {
                    self.apply(&event);
                    applied += 1;
                }
                Err(TryRecvError::Lagged(missed)) => {
                    warn!(missed, "user event subscriber lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        applied
    }

    /// Optimistically remove `id` and hand back what is needed to undo it.
    pub fn begin_delete(&mut self, id: UserId) -> StoreResult<DeleteTicket> {
        if self.pending.contains_key(&id) {
            return Err(StoreError::Busy(id));
        }
        let index = self.position(id).ok_or(StoreError::NotFound(id))?;
        let snapshot = self.users.clone();
        let record = self.users.remove(index);
        self.revision += 1;
        self.pending.insert(id, PendingOp::Delete);
        Ok(DeleteTicket {
            record,
            index,
            snapshot,
            revision: self.revision,
        })
    }

    /// Reconcile an optimistic delete with the server's answer. Anything but
    /// a 2xx status puts the record back.
    pub fn settle_delete(
        &mut self,
        ticket: DeleteTicket,
        result: StoreResult<u16>,
    ) -> Result<(), Notice> {
        let id = ticket.id();
        self.pending.remove(&id);

        let err = match result {
            Ok(status) if is_success(status) => {
                info!(id, status, "user deleted");
                return Ok(());
            }
            Ok(status) => StoreError::Rejected { status },
            Err(err) => err,
        };

        warn!(id, error = %err, "delete failed; rolling back");
        if self.revision == ticket.revision {
            self.users = ticket.snapshot;
        } else if self.position(id).is_none() {
            let index = ticket.index.min(self.users.len());
            self.users.insert(index, ticket.record);
        }
        self.revision += 1;
        Err(Notice::from_error(NoticeKind::DeleteFailed, &err))
    }

    /// Remove `id` locally, ask the server, and roll back if it refuses.
    pub async fn delete(&mut self, store: &dyn UserStore, id: UserId) -> Result<(), Notice> {
        let ticket = self
            .begin_delete(id)
            .map_err(|e| Notice::from_error(NoticeKind::DeleteFailed, &e))?;
        let result = store.delete(id).await;
        self.settle_delete(ticket, result)
    }

    /// Mark `id` as being updated.
    pub fn begin_update(&mut self, id: UserId) -> StoreResult<()> {
        if self.pending.contains_key(&id) {
            return Err(StoreError::Busy(id));
        }
        if self.position(id).is_none() {
            return Err(StoreError::NotFound(id));
        }
        self.pending.insert(id, PendingOp::Update);
        Ok(())
    }

    /// Clear the pending marker on `id`.
    pub fn release(&mut self, id: UserId) {
        self.pending.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> UserList {
        UserList::from_records(vec![
            UserRecord::new(1, "Leanne Graham", "Bret", "a@x", "Gwenborough"),
            UserRecord::new(2, "Ervin Howell", "Antonette", "b@x", "Wisokyburgh"),
            UserRecord::new(3, "Clementine Bauch", "Samantha", "c@x", "McKenziehaven"),
        ])
    }

    fn ids(list: &UserList) -> Vec<UserId> {
        list.users().iter().map(|u| u.id).collect()
    }

    #[test]
    fn append_keeps_ids_unique_and_moves_to_tail() {
        let mut list = sample();
        list.append(UserRecord::new(1, "Again", "again", "", ""));
        assert_eq!(ids(&list), vec![2, 3, 1]);
        assert_eq!(list.get(1).unwrap().name, "Again");
    }

    #[test]
    fn replace_is_in_place() {
        let mut list = sample();
        assert!(list.replace(UserRecord::new(2, "Ervin H.", "Antonette", "b@x", "X")));
        assert_eq!(ids(&list), vec![1, 2, 3]);
        assert_eq!(list.users()[1].name, "Ervin H.");
        assert!(!list.replace(UserRecord::new(9, "", "", "", "")));
    }

    #[test]
    fn set_all_drops_duplicate_ids() {
        let list = UserList::from_records(vec![
            UserRecord::new(1, "a", "", "", ""),
            UserRecord::new(1, "b", "", "", ""),
        ]);
        assert_eq!(list.len(), 1);
        assert_eq!(list.users()[0].name, "a");
    }

    #[test]
    fn failed_delete_restores_exact_snapshot() {
        let mut list = sample();
        let ticket = list.begin_delete(2).unwrap();
        assert_eq!(ids(&list), vec![1, 3]);
        assert_eq!(list.pending(2), Some(PendingOp::Delete));

        let notice = list.settle_delete(ticket, Ok(500)).unwrap_err();
        assert_eq!(notice.kind, NoticeKind::DeleteFailed);
        assert_eq!(ids(&list), vec![1, 2, 3]);
        assert_eq!(list.pending(2), None);
    }

    #[test]
    fn successful_delete_stands() {
        let mut list = sample();
        let ticket = list.begin_delete(1).unwrap();
        list.settle_delete(ticket, Ok(200)).unwrap();
        assert_eq!(ids(&list), vec![2, 3]);
        assert!(!list.has_pending());
    }

    #[test]
    fn rollback_after_concurrent_append_keeps_both() {
        let mut list = sample();
        let ticket = list.begin_delete(2).unwrap();
        list.append(UserRecord::new(11, "New", "new", "", ""));
        list.settle_delete(ticket, Err(StoreError::Status { status: 503 })).unwrap_err();
        assert_eq!(ids(&list), vec![1, 2, 3, 11]);
    }

    #[test]
    fn second_mutation_on_pending_record_is_refused() {
        let mut list = sample();
        list.begin_update(3).unwrap();
        assert!(matches!(list.begin_delete(3), Err(StoreError::Busy(3))));
        assert!(matches!(list.begin_update(3), Err(StoreError::Busy(3))));
        list.release(3);
        assert!(list.begin_delete(3).is_ok());
    }

    #[test]
    fn begin_on_unknown_id_is_not_found() {
        let mut list = sample();
        assert!(matches!(list.begin_delete(42), Err(StoreError::NotFound(42))));
        assert!(matches!(list.begin_update(42), Err(StoreError::NotFound(42))));
    }

    #[test]
    fn drain_applies_published_events() {
        let events = crate::events::UserEvents::new();
        let mut rx = events.subscribe();
        let mut list = sample();
        events.publish(UserEvent::Created(UserRecord::new(11, "A", "a", "", "NY")));
        events.publish(UserEvent::Updated(UserRecord::new(1, "L", "Bret", "", "")));
        assert_eq!(list.drain(&mut rx), 2);
        assert_eq!(ids(&list), vec![1, 2, 3, 11]);
        assert_eq!(list.users()[0].name, "L");
    }
}

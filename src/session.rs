//! Create/edit sessions: the draft behind the form modal.
//!
//! A session never touches the list directly. On a confirmed commit it
//! publishes a [`UserEvent`] and the list owner picks it up. The only list
//! access is the pending marker that keeps a second edit of the same
//! record from overlapping the first.

use tracing::{debug, info, warn};

use crate::api::{Draft, Field, UserId, UserRecord, UserStore};
use crate::error::StoreResult;
use crate::events::{UserEvent, UserEvents};
use crate::notice::{Notice, NoticeKind};
use crate::state::UserList;

#[derive(Clone, Debug, PartialEq)]
pub enum SessionKind {
    Create,
    /// Editing a copy of this record as it was when the session opened.
    Edit(UserRecord),
}

/// The remote call a commit turns into.
#[derive(Clone, Debug, PartialEq)]
pub enum CommitRequest {
    Create(Draft),
    Update(UserId, UserRecord),
}

impl CommitRequest {
    pub async fn send(&self, store: &dyn UserStore) -> StoreResult<UserRecord> {
        match self {
            CommitRequest::Create(draft) => store.create(draft).await,
            CommitRequest::Update(id, record) => store.update(*id, record).await,
        }
    }
}

#[derive(Clone, Debug)]
pub struct EditSession {
    kind: SessionKind,
    draft: Draft,
    saving: bool,
}

impl EditSession {
    pub fn open_create() -> Self {
        Self {
            kind: SessionKind::Create,
            draft: Draft::default(),
            saving: false,
        }
    }

    pub fn open_edit(record: &UserRecord) -> Self {
        Self {
            kind: SessionKind::Edit(record.clone()),
            draft: Draft::from_record(record),
            saving: false,
        }
    }

    pub fn kind(&self) -> &SessionKind {
        &self.kind
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn target_id(&self) -> Option<UserId> {
        match &self.kind {
            SessionKind::Create => None,
            SessionKind::Edit(record) => Some(record.id),
        }
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        self.draft = std::mem::take(&mut self.draft).with_field(field, value);
    }

    /// Discard the draft. No remote call is made.
    pub fn cancel(self) {
        debug!(target_id = ?self.target_id(), "session cancelled");
    }

    pub fn request(&self) -> CommitRequest {
        match &self.kind {
            SessionKind::Create => CommitRequest::Create(self.draft.clone()),
            SessionKind::Edit(source) => {
                CommitRequest::Update(source.id, self.draft.apply_to(source))
            }
        }
    }

    fn failure_kind(&self) -> NoticeKind {
        match self.kind {
            SessionKind::Create => NoticeKind::CreateFailed,
            SessionKind::Edit(_) => NoticeKind::UpdateFailed,
        }
    }

    /// Enter the saving state and return the request to send. Edits mark
    /// their record pending; a record that already is refuses.
    pub fn begin(&mut self, list: &mut UserList) -> Result<CommitRequest, Notice> {
        if let Some(id) = self.target_id() {
            list.begin_update(id)
                .map_err(|e| Notice::from_error(self.failure_kind(), &e))?;
        }
        self.saving = true;
        Ok(self.request())
    }

    /// Reconcile the server's answer. On success the confirmed record is
    /// published and the caller should drop the session; on failure the
    /// draft is kept for another try.
    pub fn finish(
        &mut self,
        list: &mut UserList,
        result: StoreResult<UserRecord>,
        events: &UserEvents,
    ) -> Result<UserRecord, Notice> {
        self.saving = false;
        if let Some(id) = self.target_id() {
            list.release(id);
        }
        match result {
            Ok(record) => {
                let event = match self.kind {
                    SessionKind::Create => UserEvent::Created(record.clone()),
                    SessionKind::Edit(_) => UserEvent::Updated(record.clone()),
                };
                info!(id = record.id, "user saved");
                events.publish(event);
                Ok(record)
            }
            Err(err) => {
                warn!(error = %err, "saving user failed");
                Err(Notice::from_error(self.failure_kind(), &err))
            }
        }
    }

    pub async fn commit(
        &mut self,
        store: &dyn UserStore,
        list: &mut UserList,
        events: &UserEvents,
    ) -> Result<UserRecord, Notice> {
        let request = self.begin(list)?;
        let result = request.send(store).await;
        self.finish(list, result, events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryUserStore;
    use crate::api::Operation;

    #[test]
    fn open_edit_prefills_and_nests_city() {
        let rec = UserRecord::new(1, "Leanne Graham", "Bret", "Sincere@april.biz", "Gwenborough");
        let session = EditSession::open_edit(&rec);
        assert_eq!(session.draft().get(Field::City), "Gwenborough");
        assert_eq!(session.target_id(), Some(1));
        match session.request() {
            CommitRequest::Update(1, record) => assert_eq!(record, rec),
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[test]
    fn set_field_leaves_other_fields() {
        let mut session = EditSession::open_create();
        session.set_field(Field::Name, "A");
        session.set_field(Field::Email, "a@x.com");
        assert_eq!(session.draft().name, "A");
        assert_eq!(session.draft().email, "a@x.com");
        assert_eq!(session.draft().username, "");
    }

    #[tokio::test]
    async fn failed_create_keeps_draft() {
        let store = MemoryUserStore::seeded();
        store.fail_next(Operation::Create, 500);
        let events = UserEvents::new();
        let mut rx = events.subscribe();
        let mut list = UserList::from_records(store.users());

        let mut session = EditSession::open_create();
        session.set_field(Field::Name, "A");
        let notice = session.commit(&store, &mut list, &events).await.unwrap_err();

        assert_eq!(notice.kind, NoticeKind::CreateFailed);
        assert_eq!(session.draft().name, "A");
        assert!(!session.is_saving());
        assert_eq!(list.drain(&mut rx), 0);
        assert_eq!(list.len(), 5);
    }

    #[tokio::test]
    async fn edit_of_busy_record_is_refused_without_a_call() {
        let store = MemoryUserStore::seeded();
        let events = UserEvents::new();
        let mut list = UserList::from_records(store.users());
        list.begin_update(2).unwrap();
        let mut session = EditSession::open_edit(list.get(2).unwrap());

        let notice = session.commit(&store, &mut list, &events).await.unwrap_err();
        assert_eq!(notice.kind, NoticeKind::Busy);
        assert!(store.calls().is_empty());
    }
}

//! User-facing failure notices.

use std::fmt;

use crate::error::StoreError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    LoadFailed,
    CreateFailed,
    UpdateFailed,
    DeleteFailed,
    /// A mutation was refused because the record still has one in flight.
    Busy,
}

impl NoticeKind {
    pub fn headline(self) -> &'static str {
        match self {
            NoticeKind::LoadFailed => "loading users failed",
            NoticeKind::CreateFailed => "creation failed",
            NoticeKind::UpdateFailed => "update failed",
            NoticeKind::DeleteFailed => "deletion failed",
            NoticeKind::Busy => "still saving",
        }
    }
}

/// A failure the user must acknowledge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub detail: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn from_error(kind: NoticeKind, err: &StoreError) -> Self {
        let kind = match err {
            StoreError::Busy(_) => NoticeKind::Busy,
            _ => kind,
        };
        Self::new(kind, err.to_string())
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            f.write_str(self.kind.headline())
        } else {
            write!(f, "{}: {}", self.kind.headline(), self.detail)
        }
    }
}

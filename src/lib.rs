//! Library crate for usrapi-manager.
//!
//! This crate exposes the building blocks of the TUI:
//! - Remote user store and its wire types (`api`)
//! - The list state with optimistic delete and per-record locking (`state`)
//! - Create/edit sessions (`session`) and the event bus they publish on (`events`)
//! - In-memory search helpers (`search`)
//! - Application state, keymap and update loop (`app`) and rendering (`ui`)
//! - Error, notice, config and logging plumbing
//!
//! It is used by the `usrapi-manager` binary and by tests.
#![doc = include_str!("../README.md")]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod notice;
pub mod search;
pub mod session;
pub mod state;
pub mod ui;

// Re-export commonly used items at the crate root for convenience
/// Convenient error and result types shared across the crate.
pub use error::{DynError, Result, StoreError, StoreResult};

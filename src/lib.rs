//! Authoritative in-memory event guest list with live queries and SQLite row
//! persistence.
//!
//! # Examples
//!
//! In-memory usage with [`core::store::GuestStore`]:
//! ```
//! use doorlist::{core::store::GuestStore, guest::GuestDraft};
//!
//! let mut store = GuestStore::new();
//! let (id, _op) = store.add(GuestDraft {
//!     name: "Ann".to_string(),
//!     surname: "Lee".to_string(),
//!     photo_ref: String::new(),
//!     event_name: "Gala".to_string(),
//! }).expect("add");
//! assert_eq!(id, 1);
//! assert!(!store.get(id).expect("record").checked_in);
//! ```
//!
//! Runtime usage with a SQLite sink and a live filtered view:
//! ```no_run
//! use doorlist::{
//!     core::store::GuestStore,
//!     guest::GuestDraft,
//!     persist::sqlite::SqliteGuestStore,
//!     runtime::handle::{spawn_guestlist, RuntimeConfig},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sink = SqliteGuestStore::open("guests.db").expect("open sqlite");
//! let handle = spawn_guestlist(GuestStore::new(), Some(Box::new(sink)), RuntimeConfig::default());
//!
//! let id = handle.add(GuestDraft {
//!     name: "Ann".to_string(),
//!     surname: "Lee".to_string(),
//!     photo_ref: String::new(),
//!     event_name: "Gala".to_string(),
//! }).await.expect("add");
//!
//! let mut view = handle.filtered_roster();
//! view.set_search("gala");
//! assert_eq!(view.current()[0].id, id);
//!
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![deny(missing_docs)]

/// Core in-memory store and index helpers.
pub mod core;
/// Guest domain records and drafts.
pub mod guest;
/// Mutation op model handed to persistence.
pub mod op;
/// Persistence abstraction and SQLite implementation.
pub mod persist;
/// Photo blob storage and best-effort cleanup.
pub mod photo;
/// Search filter and live roster views.
pub mod query;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Shared primitive types.
pub mod types;

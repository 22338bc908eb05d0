//! quicklaunch - a searchable index of launchable commands
//!
//! Commands are registered with a name, optional metadata, an action and an
//! optional validation callback. Free-text queries rank them with a fuzzy
//! relevance scorer, usage history boosts frequent picks, and every
//! host-supplied callback runs behind a gateway that contains failures.

pub mod catalog;
pub mod config;
pub mod debouncer;
pub mod error;
pub mod event_loop;
pub mod gateway;
pub mod logging;
pub mod manifest;
pub mod protocol;
pub mod scorer;
pub mod tracking;

pub use catalog::{CatalogIndex, CommandId, QueryResult, RawDescriptor};
pub use error::{IndexError, Result};
pub use scorer::{score, Scorer};

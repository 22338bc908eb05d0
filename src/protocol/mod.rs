//! JSONL protocol between the index and a presentation layer.
//!
//! Each line is one JSON object tagged by `type`.
//!
//! # Requests
//! - `lookUp` `{text, maxResults?}` → `results`
//! - `execute` `{id}` → `executed`
//! - `getEntries` `{ids}` / `getAll` → `entries`
//! - `loadTracking` `{counts}` → `trackingLoaded`
//! - `tracking` → `tracking`
//! - `recent` → `recent`
//! - `missing` → `missing`
//!
//! Malformed requests (text not a string, `maxResults` not a non-negative
//! integer, an id that is not a fingerprint) are answered with an `error`
//! response; the stream keeps going.
//!
//! # Module Structure
//!
//! - `message`: `Request`, `Response` and `EntryInfo`
//! - `dispatch`: typed request → response against a `CatalogIndex`
//! - `io`: graceful parsing, serialization, the serve loop

mod dispatch;
mod io;
mod message;

pub use dispatch::dispatch;
pub use io::{
    handle_line, log_preview, parse_request, parse_request_graceful, serialize_response, serve,
    ParseResult,
};
pub use message::{EntryInfo, Request, Response};

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;

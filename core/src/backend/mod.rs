//! Chat Backend
//!
//! Streaming transport to the model endpoint. The [`ChatBackend`] trait
//! keeps the core independent of any particular provider; [`HttpBackend`]
//! is the one shipped implementation, speaking the relay endpoint's
//! JSON-in / plain-text-stream-out protocol.

mod http;
mod traits;

pub use http::HttpBackend;
pub use traits::{ChatBackend, ChatRequest, HistoryEntry, HistoryPart, StreamEvent, TransportError};

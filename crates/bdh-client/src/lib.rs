//! HTTP and SSE clients for the BeadHub coordination service.
//!
//! Everything the wrapper says to the server goes through [`BeadHubClient`]:
//! typed JSON request/response pairs with bearer auth, a 10-second
//! per-request deadline, and a hard cap on response size so a hostile or
//! buggy server cannot balloon memory. The one long-lived connection — the
//! chat event stream — uses the separate [`SseClient`], which has no request
//! timeout but bounds every line and event it parses.

pub mod api;
mod error;
mod http;
pub mod sse;

pub use error::ApiError;
pub use http::{BeadHubClient, MAX_RESPONSE_BYTES, REQUEST_TIMEOUT};
pub use sse::{SseClient, SseEvent};
pub use tokio_util::sync::CancellationToken;

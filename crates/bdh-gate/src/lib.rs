//! Command gating for the bd wrapper.
//!
//! The gate never prevents the tracker from running: the server advises,
//! the tracker is the source of truth. What the gate controls is the
//! wrapper's own exit status and the notifications printed after the
//! tracker finishes.

pub mod classifier;
pub mod notifications;
pub mod preflight;
pub mod presence;

pub use classifier::{JUMP_IN_FLAG, classify_subcommand, is_mutating, strip_jump_in};
pub use notifications::Notifications;
pub use preflight::{PreflightOutcome, preflight};
pub use presence::{PRESENCE_TTL_SECS, PresenceContext, refresh_presence};

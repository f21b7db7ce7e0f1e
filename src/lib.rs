//! bdh — coordination wrapper around the bd issue tracker.
//!
//! bdh runs the tracker verbatim and, around it, keeps a BeadHub server's
//! view of the issue store current: pre-flight advice before mutating
//! commands, a presence heartbeat, and an incremental content-hash sync
//! after anything that touched the store. If the server is unreachable the
//! tracker still runs; sync simply retries on the next invocation.

pub mod cli;
pub mod commands;
pub mod invoke;
pub mod tracker;

pub use invoke::run_bd;

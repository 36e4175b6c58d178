//! linkwatch library crate.
//!
//! Connectivity monitoring with ordered, retrying notification delivery over
//! email, chat bot and webhook channels, plus an independent liveness
//! heartbeat. The binary wires these together; the library is exposed for
//! integration testing and embedding.

pub mod config;
pub mod connectivity;
pub mod error;
pub mod heartbeat;
pub mod logging;
pub mod notification;
pub mod utils;

pub use error::{Error, Result};

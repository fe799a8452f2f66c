//! Caption-to-speech synchronization
//!
//! - `locator`: sampled time → active caption
//! - `sampler`: periodic clock reads and the session's task handle
//! - `voice`: voice, rate and volume for an utterance
//! - `coordinator`: the speak / wait / pause state machine
//! - `session`: one active track session per page

pub mod coordinator;
pub mod locator;
pub mod sampler;
pub mod session;
pub mod voice;

pub use session::{SessionDeps, SessionManager};

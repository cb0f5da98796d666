//! Conversational session engine
//!
//! - `event`: inbound event shapes and parsing
//! - `routing`: dispatch precedence (meta guard, universal commands, state table, fallbacks)
//! - `controller`: dialog handlers for every route
//! - `recovery`: meta-states for backend faults and unknown commands
//! - `outbound`: transport independent replies
//! - `engine`: glue running one complete turn

pub mod controller;
pub mod engine;
pub mod event;
pub mod outbound;
pub mod recovery;
pub mod routing;

pub use controller::{Controller, Turn};
pub use engine::SessionEngine;
pub use event::{CallbackAction, Command, Event, RawEvent, SettingsFlag};
pub use outbound::{Button, ButtonLabel, Outbound, Reply};
pub use recovery::RecoveryManager;
pub use routing::{classify, Dispatch, Route};

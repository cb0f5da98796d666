//! Bot module for handling Telegram interactions
//!
//! The transport only converts Telegram updates into raw events and renders
//! the replies; every dialog decision happens in the session engine.
//! - `message_handler`: text messages and commands
//! - `callback_handler`: inline keyboard callback queries
//! - `ui_builder`: message text and keyboards

pub mod callback_handler;
pub mod message_handler;
pub mod ui_builder;

pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

//! # Lexicon Telegram Bot
//!
//! A Telegram bot for learning foreign vocabulary with spaced repetition.
//! The conversational session engine drives multi-step dialogs (language
//! selection, settings, study, hints), recovers from backend failures through
//! meta-states and keeps every user's session in its own worker task.

pub mod backend;
pub mod bot;
pub mod config;
pub mod dialogue;
pub mod dispatcher;
pub mod errors;
pub mod fsm;
pub mod localization;
pub mod scheduler;
pub mod session;
pub mod word_model;
pub mod word_queue;

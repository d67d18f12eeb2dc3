//! Shared domain types for Chatvault.
//!
//! Chats, messages, archived (cold-tier) records, the error taxonomy, and
//! the storage configuration structs. This crate has no I/O dependencies.

pub mod chat;
pub mod config;
pub mod error;
pub mod user;

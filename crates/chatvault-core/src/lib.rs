//! Store traits and migration logic for Chatvault.
//!
//! This crate defines the "ports" (the `HotStore`/`ColdStore` repository
//! traits and the codec traits) that the infrastructure layer implements,
//! plus the `MigrationService` that relocates chats from the hot tier to
//! the cold tier. It depends only on `chatvault-types` -- never on
//! `chatvault-infra` or any database/IO crate.

pub mod codec;
pub mod migration;
pub mod repository;

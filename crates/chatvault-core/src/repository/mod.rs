//! Repository trait definitions for the two storage tiers.

pub mod cold;
pub mod hot;

pub use cold::ColdStore;
pub use hot::HotStore;

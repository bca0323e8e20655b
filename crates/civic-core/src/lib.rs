//! Proposition lifecycle: creation, moderation scoring, publication,
//! voting and commenting rules, independent of any transport or database.

pub mod access;
pub mod error;
pub mod lifecycle;
pub mod moderation;
pub mod store;

#[cfg(test)]
mod testing;

pub use access::{Actor, Operation};
pub use error::{CoreError, CoreResult, StoreError, StoreResult};
pub use lifecycle::Lifecycle;
pub use moderation::{ModerationOutcome, ModerationVerdict, Moderator};
pub use store::Store;

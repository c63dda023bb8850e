pub mod character;
pub mod combat;
pub mod corporation;
pub mod event;
pub mod garrison;
pub mod salvage;
pub mod sector;
pub mod ship;

pub use character::*;
pub use combat::*;
pub use corporation::*;
pub use event::*;
pub use garrison::*;
pub use salvage::*;
pub use sector::*;
pub use ship::*;

use serde::{Deserialize, Serialize};

/// Wraps repository-loaded data with the timestamp it was last written,
/// mirrored from the teacher's `models::WithTimestamp<T>` which serves the
/// same "when was this last observed/persisted" role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithTimestamp<T> {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub data: T,
}

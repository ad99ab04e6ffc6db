//! Shared-state services of the Lectern scheduling core: the rolling
//! availability cache and the live session membership tracker.

pub mod cache;
pub mod error;
pub mod session;
pub mod source;

pub use cache::{AvailabilityCacheBuilder, AvailabilityCacheEntry};
pub use error::{ServiceError, ServiceResult};
pub use session::SessionMembershipStore;
pub use source::AvailabilitySource;

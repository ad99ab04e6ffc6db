//! Pure availability engine for the Lectern scheduling core.
//!
//! Unpacks recurring availability rules into concrete free time intervals,
//! net of existing bookings, and validates candidate bookings against them.
//! Everything in this crate is a pure function over its inputs: no I/O, no
//! shared state, safe to call concurrently from any number of tasks.
//!
//! ## Modules
//!
//! - [`interval`]: half-open UTC interval primitive with subtraction
//! - [`rule`]: recurrence rules and occurrence expansion
//! - [`slots`]: free-interval unpacking (occurrences minus bookings)
//! - [`validate`]: candidate booking fit check
//! - [`error`]: error types

pub mod error;
pub mod interval;
pub mod rule;
pub mod slots;
pub mod validate;

pub use error::{EngineError, EngineResult};
pub use interval::TimeInterval;
pub use rule::{RecurrenceRule, Repeat, TimeOfDay};
pub use slots::{BookedInterval, unpack};
pub use validate::can_book;

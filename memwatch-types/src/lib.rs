//! # memwatch-types
//!
//! Core types for process memory and resource lifecycle monitoring. This
//! crate defines the schema shared between the memwatch SDK and anything
//! that consumes its samples, alerts, and reports.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any
//!   serialization framework
//! - **Optional serialization**: Enable the `serde` feature as needed
//! - **Runtime agnostic**: No I/O, no locking, no clocks beyond timestamp
//!   capture; all collection machinery lives in `memwatch-sdk`
//!
//! ## Example
//!
//! ```rust
//! use memwatch_types::{MemorySample, ResourceCounts};
//!
//! let counts = ResourceCounts {
//!     timers: 2,
//!     intervals: 1,
//!     ..Default::default()
//! };
//! let sample = MemorySample::new(64 << 20, 128 << 20, 96 << 20, counts);
//!
//! assert_eq!(sample.heap_utilization, 0.75);
//! ```

mod alert;
mod gc;
mod options;
mod report;
mod sample;

pub use alert::*;
pub use gc::*;
pub use options::*;
pub use report::*;
pub use sample::*;

/// Get the current timestamp in milliseconds since the Unix epoch.
///
/// Shared by every type that stamps itself at construction. Falls back
/// to 0 if the system clock is before the epoch.
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

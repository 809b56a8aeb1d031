//! Metric primitives used by the chihaya tracker.
//!
//! Two instrument types, both lock-free:
//!
//! - [`Counter`]: a monotonically increasing value.
//! - [`Gauge`]: a value that can be set to an arbitrary point, used for the
//!   periodically aggregated storage totals.
//!
//! The [`prometheus`] module renders instruments into the Prometheus text
//! exposition format for the metrics endpoint.
pub mod counter;
pub mod gauge;
pub mod prometheus;

pub use counter::Counter;
pub use gauge::Gauge;

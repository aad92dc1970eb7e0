//! Tools for sweeping a GPU benchmark over problem sizes and summarizing the speedups it reports.
//!
//! The benchmark prints a line announcing each problem size followed by the speedups it measured
//! there. Those lines are grouped by problem size and summarized:
//!
//! ```
//! let log = "\
//! /* Expanded genome set built (size: 1024) */
//! ~*~*~*~* GPU speed up: 2.5 *~*~*~*~
//! ~*~*~*~* GPU speed up: 3.5 *~*~*~*~
//! /* Expanded genome set built (size: 2048) */
//! ~*~*~*~* GPU speed up: 6.0 *~*~*~*~
//! ";
//! let stats = speedup::aggregate_str(log).unwrap();
//! assert_eq!(stats.len(), 2);
//! assert_eq!((stats[0].size, stats[0].mean, stats[0].stddev), (1024, 3.0, 0.5));
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications,
    missing_copy_implementations,
    missing_debug_implementations,
    clippy::cognitive_complexity,
    clippy::missing_const_for_fn,
    clippy::needless_borrow
)]

pub mod aggregate;
#[cfg(feature = "plot")]
pub mod plot;
pub mod record;
pub mod sweep;

pub use aggregate::{aggregate_file, aggregate_reader, aggregate_str, Aggregator, GroupStatistic};
pub use record::{LogLine, ParseError};
pub use sweep::{Invocation, Sweep, SweepReport};

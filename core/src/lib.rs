//! cohort-core: signup-cohort retention and value tables.
//!
//! Users are grouped by signup month. Each cohort's later investment
//! activity is aligned on a months-since-signup axis and aggregated as
//! investor headcount or deployed capital, optionally split by product
//! or acquisition channel.

pub mod attribution;
pub mod builder;
pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod metric;
pub mod month;
pub mod records;
pub mod report;
pub mod store;
pub mod table;
pub mod types;

pub use builder::{build, CohortQuery};
pub use error::{CohortError, CohortResult};
pub use metric::Metric;
pub use month::YearMonth;
pub use table::{CellValue, CohortTable, Column};

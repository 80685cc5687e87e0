//! Duplicate-report detection and crowd-sourced priority for civic issue
//! reports. Persistence is supplied by the caller through [`ReportStore`].

pub mod candidates;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod geo;
pub mod priority;
pub mod service;
pub mod severity;
pub mod similarity;
pub mod store;

#[cfg(test)]
mod memory;

pub use config::CoreConfig;
pub use error::{CoreError, Result, StoreError};
pub use service::CivicCore;
pub use store::{ReportFilter, ReportStore, VoteTransaction};

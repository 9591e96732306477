//! Terminal activity timer. Pick an activity from a fixed catalog, time it with pauses, get
//! alerted once it runs past a threshold, then export the ledger as JSON or write a report.
//!

pub mod catalog;
pub mod cli;
pub mod export;
pub mod fs;
pub mod ledger;
pub mod session;
pub mod timer;
pub mod utils;
pub mod wallclock;

//! Prices crafting and processing recipes against a live market snapshot and
//! ranks them by a weighted mix of margin, total margin, time and throughput.

pub mod app;
pub mod domain;
pub mod infra;
pub mod logging;
pub mod util;

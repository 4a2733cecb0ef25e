//! Background Tasks Module
//!
//! # Tasks
//! - Expiry sweep: removes stale cache entries at a configured interval

mod sweep;

pub use sweep::spawn_sweep_task;

//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache is open.
//!
//! # Tasks
//! - Expiration sweep: removes expired entries at the configured interval

mod sweeper;

pub use sweeper::{Sweeper, SweeperState};

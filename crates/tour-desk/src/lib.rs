//! Tour-request scheduling core for the rental listing platform.
//!
//! The crate owns the draft selection state machine, priority ranking,
//! contact validation, conflict checks, and the submission pipeline that
//! turns a draft into a persisted [`workflows::tours::TourRequest`]. Storage,
//! user profiles, and cache invalidation are consumed through traits so the
//! core can be exercised without any backend.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;

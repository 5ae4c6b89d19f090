//! Behavioural step helpers for fixture lifecycle scenarios.

mod assertions;
mod steps;

pub use state::{FixtureLifecycleState, fixture_lifecycle_state};

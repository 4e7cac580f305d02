//! Duplicate resolution for vidupe.
//!
//! A [`DeletionPlan`] keeps the largest member of every group (the first
//! encountered on ties) and schedules the rest. [`DuplicateResolver`] then
//! removes them one at a time, permanently or via the system trash, or just
//! reports what it would do.

mod plan;
mod resolver;

pub use plan::{DeletionPlan, PlanEntry};
pub use resolver::{
    DuplicateResolver, RemovalError, RemovalMode, ResolutionOutcome, select_for_resolution,
};

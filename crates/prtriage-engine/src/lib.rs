//! Pull request triage engine.
//!
//! Query building, filtering, fair review assignment, naming checks, QA
//! queue ranking and message rendering. External services are reached only
//! through the traits in [`source`].

pub mod allocator;
pub mod filter;
pub mod linked_issue;
pub mod message;
pub mod naming;
pub mod outbox;
pub mod pool;
pub mod query;
pub mod ranking;
pub mod report;
pub mod rules;
pub mod run;
pub mod source;
pub mod version;

#![deny(warnings)]

//! Investment behaviour of producer agents.
//!
//! Screens catalog technologies with the eligibility rules, keeps the
//! valued survivors on a per-(agent, tick) scoring board and picks at most
//! one of them under the policy the agent's traits call for.

pub mod eligibility;
pub mod policy;
pub mod scoring;

pub use eligibility::{check_eligibility, CapacityOutlook, EligibilityLimits, Ineligibility};
pub use policy::{own_share, resolve_policy, select, SelectionError, SelectionPolicy};
pub use scoring::{ScoredCandidate, ScoringBoard};

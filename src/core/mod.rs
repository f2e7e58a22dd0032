//! Core batch subsystem

pub mod eligibility;
pub mod import;
pub mod jobs;
pub mod spapi;

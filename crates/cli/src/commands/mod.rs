//! Command implementations

pub mod analytics;
pub mod config;
pub mod doctor;
pub mod integrations;
pub mod ledger;
pub mod run;
pub mod scheduler;

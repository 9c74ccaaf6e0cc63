//! Warden - a safety gate for LLM-generated SQL.
//!
//! Two components, strictly ordered: the validator (`safety`) decides
//! whether a generated statement may run at all, and the guarded executor
//! (`query`) runs accepted statements read-only under a row cap and a
//! timeout. The `gate` module ties both to one database.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod gate;
pub mod logging;
pub mod query;
pub mod safety;

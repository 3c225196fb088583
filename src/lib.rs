//! Larch - nearby settlement survey over a national grid
//!
//! This library provides the border filter, settlement matcher and report
//! assembly used by the survey binary.

pub mod geodesy;
pub mod input;
pub mod matcher;
pub mod models;
pub mod overpass;
pub mod pip;
pub mod pipeline;
pub mod report;

pub use models::{CandidateRecord, GeoPoint, MatchResult, ReportRow, Settlement, SettlementKind};

//! Core data models for the survey pipeline.

pub mod place;
pub mod report;

pub use place::{
    CandidateRecord, GeoPoint, MatchResult, RawSettlementRecord, Settlement, SettlementKind,
};
pub use report::ReportRow;

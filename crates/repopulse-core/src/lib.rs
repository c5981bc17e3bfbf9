//! Core types, configuration, and error handling for the Repopulse engine.
//!
//! This crate provides the shared foundation used by all other Repopulse
//! crates:
//! - [`PulseError`] — unified error type using `thiserror`
//! - [`RepopulseConfig`] — configuration loaded from `.repopulse.toml`
//! - The canonical data model: [`CommitRecord`], [`EnrichedCommit`],
//!   [`MergeStatus`], [`BranchReport`], [`ContributorProfile`],
//!   [`DetectedPattern`], [`TimelinePoint`] and their enums

mod config;
mod error;
mod types;

pub use config::{BranchConfig, GitConfig, RepopulseConfig};
pub use error::PulseError;
pub use types::{
    unix_epoch, AnomalySeverity, BranchReport, BranchStatus, BranchesReport, ChangeType,
    CommitRecord, CommitSizeCategory, ContributorProfile, DeletabilityCategory, DetectedPattern,
    EnrichedCommit, FileChange, MergeStatus, MergeType, TimelinePoint, WorkPattern,
};

/// A convenience `Result` type for Repopulse operations.
pub type Result<T> = std::result::Result<T, PulseError>;

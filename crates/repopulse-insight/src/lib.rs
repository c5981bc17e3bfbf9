//! Commit-stream analytics: enrichment, contributors, anomaly patterns,
//! and timelines.
//!
//! Everything here is a pure function over [`repopulse_core::CommitRecord`]
//! streams — no subprocess calls, no I/O. The harvesting side lives in
//! `repopulse-git`; this crate turns its output into derived intelligence:
//! - [`enrich`] — per-commit classification, streaks, churn percentiles
//! - [`contributors`] — profiles with alias merging, work patterns
//! - [`patterns`] — a fixed chain of 14 anomaly detectors
//! - [`timeline`] — LOC, per-language, and team-growth series

pub mod contributors;
pub mod enrich;
pub mod patterns;
pub mod timeline;

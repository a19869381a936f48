// Copyright (c) 2026 Edgeprint Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Edgeprint - Error Types
 * Classified failures for configuration and transport setup
 *
 * @copyright 2026 Edgeprint Oy
 * @license Proprietary
 */

use thiserror::Error;

/// Errors that can abort a run before any probe is sent.
///
/// Per-request transport failures are never surfaced through this type:
/// they are absorbed into `Observation` records (status 0, error text set)
/// so the analysis pipeline sees them as ordinary data.
#[derive(Error, Debug)]
pub enum EdgeprintError {
    /// Target URL failed validation
    #[error("Invalid target URL '{url}': {reason}")]
    InvalidTarget { url: String, reason: String },

    /// Jitter bounds are inverted
    #[error("Invalid jitter bounds: min {min}ms > max {max}ms")]
    InvalidJitter { min: u64, max: u64 },

    /// HTTP client construction failed
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// Report could not be written to the requested path
    #[error("Failed to write report to '{path}': {source}")]
    ReportWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

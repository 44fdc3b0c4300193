//! Layered error definitions
//!
//! Categorized by source: config / timing / alignment / store / limits

use thiserror::Error;

/// Unified error type
///
/// Every variant is terminal for the current analysis request.
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Timing Errors =====
    /// A required timing table is empty
    #[error("timing table '{table}' is empty")]
    MissingTable { table: String },

    /// A timing row holds a non-finite value where one is required
    #[error("timing table '{table}' row {row}: {field} must be finite, got {value}")]
    InvalidTimingRow {
        table: String,
        row: usize,
        field: String,
        value: f64,
    },

    /// No lap has a positive finite duration
    #[error("no valid lap found in {lap_count} timing rows")]
    NoValidLap { lap_count: usize },

    /// Explicit lap index is out of bounds
    #[error("lap index {index} out of range (session has {lap_count} laps)")]
    InvalidLapIndex { index: usize, lap_count: usize },

    // ===== Alignment Errors =====
    /// Mandatory channel slice is empty after fetch
    #[error("channel '{channel}' returned no samples for the lap window")]
    EmptyChannel { channel: String },

    /// Mandatory channel holds a missing or non-finite reading
    #[error("channel '{channel}' sample {index} must be finite, got {value}")]
    InvalidSample {
        channel: String,
        index: usize,
        value: f64,
    },

    /// Lap time window cannot be mapped onto sample indices
    #[error("invalid time window [{start_time}, {end_time}]: {message}")]
    InvalidWindow {
        start_time: f64,
        end_time: f64,
        message: String,
    },

    /// Stored channel length disagrees with its declared rate
    #[error(
        "channel '{channel}' covers {actual_s:.3}s but the reference covers {expected_s:.3}s"
    )]
    RateMismatch {
        channel: String,
        expected_s: f64,
        actual_s: f64,
    },

    // ===== Resource Errors =====
    /// A per-request resource ceiling was exceeded
    #[error("resource limit exceeded for '{resource}': requested {requested}, limit {limit}")]
    ResourceLimit {
        resource: String,
        requested: u64,
        limit: u64,
    },

    /// Wall-clock budget exhausted
    #[error("analysis exceeded its time budget of {budget_ms}ms")]
    Timeout { budget_ms: u64 },

    // ===== Store Errors =====
    /// Session store access failed
    #[error("session store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid timing row error
    pub fn invalid_row(
        table: impl Into<String>,
        row: usize,
        field: impl Into<String>,
        value: f64,
    ) -> Self {
        Self::InvalidTimingRow {
            table: table.into(),
            row,
            field: field.into(),
            value,
        }
    }

    /// Create empty channel error
    pub fn empty_channel(channel: impl Into<String>) -> Self {
        Self::EmptyChannel {
            channel: channel.into(),
        }
    }

    /// Create store error without an underlying source
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Create store error wrapping the driver error
    pub fn store_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Stable label for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigParse { .. } => "config_parse",
            Self::ConfigValidation { .. } => "config_validation",
            Self::MissingTable { .. } => "missing_table",
            Self::InvalidTimingRow { .. } => "invalid_timing_row",
            Self::NoValidLap { .. } => "no_valid_lap",
            Self::InvalidLapIndex { .. } => "invalid_lap_index",
            Self::EmptyChannel { .. } => "empty_channel",
            Self::InvalidSample { .. } => "invalid_sample",
            Self::InvalidWindow { .. } => "invalid_window",
            Self::RateMismatch { .. } => "rate_mismatch",
            Self::ResourceLimit { .. } => "resource_limit",
            Self::Timeout { .. } => "timeout",
            Self::Store { .. } => "store",
            Self::Io(_) => "io",
        }
    }
}

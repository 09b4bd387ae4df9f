//! # Error Handling
//!
//! Error types for the send and receive pipelines, built around one hierarchical
//! error enum with rich context and classification traits.
//!
//! ## Architecture
//!
//! - **Error Types**: [`ShareError`] variants per failure domain (configuration,
//!   geometry, frame sources, rendering, sinks, I/O)
//! - **Error Context**: timestamp, recovery suggestion, severity and free-form
//!   metadata carried by every variant
//! - **Error Traits**: [`Retryable`], [`Recoverable`], [`HasSeverity`] and
//!   [`HasRecoverySuggestion`]; [`classify`] turns them into the skip and retry
//!   decisions the session loops act on
//!
//! ## Fatal vs. Recoverable
//!
//! The codec itself has a single fatal class: `InvalidGeometry`, raised when a raster
//! or viewport cannot hold the grid. Classification never fails; a badly lit frame
//! just decodes to the wrong bytes. Frame-source and sink failures belong to the
//! boundary and are usually worth skipping or retrying.
//!
//! ## Usage
//!
//! ```rust
//! use lightshare::error::{classify, HasRecoverySuggestion, ShareError};
//!
//! let error = ShareError::frame_source("camera", "frame buffer truncated")
//!     .with_context("reading NV21 frame 12")
//!     .with_recovery_suggestion("Check the declared frame size");
//!
//! assert!(classify::can_skip(&error));
//! assert!(classify::retry_after(&error, 1).is_some());
//! assert_eq!(error.recovery_suggestion(), Some("Check the declared frame size"));
//! ```

use std::{error::Error as StdError, fmt, time::SystemTime};

use grid_codec::CodecError;

use crate::session::MAX_CONSECUTIVE_SOURCE_ERRORS;

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational errors
    Info,
    /// Warnings that may indicate potential issues
    Warning,
    /// Errors that affect operation but can be recovered from
    Error,
    /// Fatal errors that cannot be recovered from
    Fatal,
}

/// Metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// Additional context about the error
    pub context: Option<String>,
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
    /// Additional metadata as key-value pairs
    pub metadata: std::collections::HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            context: None,
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
            metadata: std::collections::HashMap::new(),
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.recovery_suggestion = Some(suggestion.into());
        self
    }
}

/// Base error type for the lightshare pipelines
#[derive(Debug)]
pub enum ShareError {
    /// Configuration validation errors
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// Raster or viewport too small for the grid
    InvalidGeometry {
        width: u32,
        height: u32,
        grid_size: u32,
        reason: String,
        context: ErrorContext,
    },
    /// Codec buffer errors other than geometry
    Codec {
        operation: String,
        source: CodecError,
        context: ErrorContext,
    },
    /// Frame acquisition failures
    FrameSource {
        source_name: String,
        reason: String,
        context: ErrorContext,
    },
    /// Failures presenting a grid on a surface
    Render {
        target: String,
        reason: String,
        context: ErrorContext,
    },
    /// Payload delivery failures
    Sink {
        target: String,
        reason: String,
        context: ErrorContext,
    },
    /// I/O errors
    Io {
        operation: String,
        path: Option<String>,
        source: std::io::Error,
        context: ErrorContext,
    },
    /// External library errors
    External {
        library: String,
        source: Box<dyn StdError + Send + Sync>,
        context: ErrorContext,
    },
    /// Validation errors
    Validation {
        field: String,
        constraint: String,
        value: String,
        context: ErrorContext,
    },
    /// State errors (invalid state transitions)
    State {
        current_state: String,
        attempted_operation: String,
        reason: String,
        context: ErrorContext,
    },
}

impl ShareError {
    /// Create a configuration error
    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a geometry error. Always fatal.
    pub fn invalid_geometry(width: u32, height: u32, grid_size: u32) -> Self {
        Self::InvalidGeometry {
            width,
            height,
            grid_size,
            reason: format!("image cannot hold a {}x{} grid", grid_size, grid_size),
            context: ErrorContext::new()
                .with_severity(ErrorSeverity::Fatal)
                .with_recovery_suggestion(
                    "Use a larger image or viewport, or a smaller grid size",
                ),
        }
    }

    /// Create a geometry error for a region that does not fit its frame. Always fatal.
    pub fn invalid_region(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            width,
            height,
            grid_size: 0,
            reason: reason.into(),
            context: ErrorContext::new()
                .with_severity(ErrorSeverity::Fatal)
                .with_recovery_suggestion(
                    "Pick a crop region inside the frame and at least as large as the grid",
                ),
        }
    }

    /// Create a codec error
    pub fn codec(operation: impl Into<String>, source: CodecError) -> Self {
        Self::Codec {
            operation: operation.into(),
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create a frame source error
    pub fn frame_source(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FrameSource {
            source_name: source_name.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a render error
    pub fn render(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Render {
            target: target.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a sink error
    pub fn sink(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Sink {
            target: target.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an I/O error tied to a path
    pub fn io_at(
        operation: impl Into<String>,
        path: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            operation: operation.into(),
            path: Some(path.into()),
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an external library error
    pub fn external(
        library: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            library: library.into(),
            source: Box::new(source),
            context: ErrorContext::new(),
        }
    }

    /// Create a validation error
    pub fn validation(
        field: impl Into<String>,
        constraint: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
            value: value.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a state error
    pub fn state(
        current_state: impl Into<String>,
        attempted_operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::State {
            current_state: current_state.into(),
            attempted_operation: attempted_operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    /// Add recovery suggestion
    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_mut().metadata.insert(key.into(), value.into());
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::InvalidGeometry { context, .. } => context,
            Self::Codec { context, .. } => context,
            Self::FrameSource { context, .. } => context,
            Self::Render { context, .. } => context,
            Self::Sink { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::External { context, .. } => context,
            Self::Validation { context, .. } => context,
            Self::State { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::InvalidGeometry { context, .. } => context,
            Self::Codec { context, .. } => context,
            Self::FrameSource { context, .. } => context,
            Self::Render { context, .. } => context,
            Self::Sink { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::External { context, .. } => context,
            Self::Validation { context, .. } => context,
            Self::State { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::InvalidGeometry { .. } => "invalid_geometry",
            Self::Codec { .. } => "codec",
            Self::FrameSource { .. } => "frame_source",
            Self::Render { .. } => "render",
            Self::Sink { .. } => "sink",
            Self::Io { .. } => "io",
            Self::External { .. } => "external",
            Self::Validation { .. } => "validation",
            Self::State { .. } => "state",
        }
    }
}

impl fmt::Display for ShareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShareError::Config {
                field,
                value,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Configuration error in '{}': {} (value: {})",
                    field, reason, value
                )
            }
            ShareError::InvalidGeometry {
                width,
                height,
                reason,
                ..
            } => {
                write!(f, "Invalid geometry for {}x{}: {}", width, height, reason)
            }
            ShareError::Codec {
                operation, source, ..
            } => {
                write!(f, "Codec error during {}: {}", operation, source)
            }
            ShareError::FrameSource {
                source_name,
                reason,
                ..
            } => {
                write!(f, "Frame source '{}' failed: {}", source_name, reason)
            }
            ShareError::Render { target, reason, .. } => {
                write!(f, "Rendering to {} failed: {}", target, reason)
            }
            ShareError::Sink { target, reason, .. } => {
                write!(f, "Delivering payload to {} failed: {}", target, reason)
            }
            ShareError::Io {
                operation,
                path,
                source,
                ..
            } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "I/O error during {} on '{}': {}",
                        operation, path, source
                    )
                } else {
                    write!(f, "I/O error during {}: {}", operation, source)
                }
            }
            ShareError::External {
                library, source, ..
            } => {
                write!(f, "External library error in {}: {}", library, source)
            }
            ShareError::Validation {
                field,
                constraint,
                value,
                ..
            } => {
                write!(
                    f,
                    "Validation failed for '{}': {} (value: {})",
                    field, constraint, value
                )
            }
            ShareError::State {
                current_state,
                attempted_operation,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Invalid state '{}' when attempting '{}': {}",
                    current_state, attempted_operation, reason
                )
            }
        }
    }
}

impl StdError for ShareError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Codec { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::External { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type ShareResult<T> = Result<T, ShareError>;

/// Errors worth attempting again after a short wait.
pub trait Retryable {
    fn is_retryable(&self) -> bool;

    /// Wait before the next attempt, in milliseconds.
    fn retry_delay_ms(&self) -> Option<u64> {
        None
    }
}

impl Retryable for ShareError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::FrameSource { .. } | Self::Sink { .. })
    }

    fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            Self::FrameSource { .. } => Some(100), // one idle-animation tick
            Self::Sink { .. } => Some(250),
            _ => None,
        }
    }
}

/// Errors a running session can survive.
pub trait Recoverable {
    fn is_recoverable(&self) -> bool;

    /// What the session may do instead of stopping, in order of preference.
    fn recovery_strategies(&self) -> Vec<RecoveryStrategy>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Attempt the operation again, at most `max_attempts` failures in a row.
    Retry { max_attempts: u32 },
    /// Drop the current frame or grid and carry on with the next one.
    Skip { reason: String },
}

impl Recoverable for ShareError {
    fn is_recoverable(&self) -> bool {
        !classify::is_fatal(self) && !self.recovery_strategies().is_empty()
    }

    fn recovery_strategies(&self) -> Vec<RecoveryStrategy> {
        match self {
            Self::FrameSource { .. } => vec![
                RecoveryStrategy::Skip {
                    reason: "drop the unreadable frame".to_string(),
                },
                RecoveryStrategy::Retry {
                    max_attempts: MAX_CONSECUTIVE_SOURCE_ERRORS,
                },
            ],
            Self::Sink { .. } => vec![RecoveryStrategy::Retry { max_attempts: 1 }],
            Self::Render { .. } => vec![RecoveryStrategy::Skip {
                reason: "keep the previously presented grid".to_string(),
            }],
            _ => vec![],
        }
    }
}

pub trait HasSeverity {
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for ShareError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

pub trait HasRecoverySuggestion {
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for ShareError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

/// Decisions the session loops make from an error.
pub mod classify {
    use std::time::Duration;

    use super::*;

    /// Errors no amount of waiting fixes.
    pub fn is_fatal(error: &ShareError) -> bool {
        matches!(
            error,
            ShareError::Config { .. }
                | ShareError::InvalidGeometry { .. }
                | ShareError::Validation { .. }
        ) || error.severity() == ErrorSeverity::Fatal
    }

    /// Whether the failed frame or grid can be dropped without stopping.
    pub fn can_skip(error: &ShareError) -> bool {
        error.is_recoverable()
            && error
                .recovery_strategies()
                .iter()
                .any(|s| matches!(s, RecoveryStrategy::Skip { .. }))
    }

    /// Wait before another attempt after `attempt` failures in a row, or `None`
    /// once the error's retry budget is spent.
    pub fn retry_after(error: &ShareError, attempt: u32) -> Option<Duration> {
        if !error.is_retryable() || !error.is_recoverable() {
            return None;
        }
        error.recovery_strategies().iter().find_map(|s| match s {
            RecoveryStrategy::Retry { max_attempts } if attempt <= *max_attempts => Some(
                Duration::from_millis(error.retry_delay_ms().unwrap_or_default()),
            ),
            _ => None,
        })
    }

    /// First [`ShareError`] in an error chain.
    pub fn find(error: &anyhow::Error) -> Option<&ShareError> {
        error.chain().find_map(|e| e.downcast_ref::<ShareError>())
    }
}

/// Error conversion implementations
impl From<std::io::Error> for ShareError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<serde_json::Error> for ShareError {
    fn from(error: serde_json::Error) -> Self {
        Self::external("serde_json", error)
    }
}

impl From<image::ImageError> for ShareError {
    fn from(error: image::ImageError) -> Self {
        Self::external("image", error)
    }
}

impl From<CodecError> for ShareError {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::InvalidGeometry {
                width,
                height,
                grid,
            } => Self::invalid_geometry(width, height, grid),
            other => Self::codec("codec", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_error_creation() {
        let error = ShareError::config("grid_size", "15", "must be even");
        assert_eq!(error.category(), "config");
        assert!(!error.is_retryable());
        assert!(!error.is_recoverable());
        assert!(classify::is_fatal(&error));
    }

    #[test]
    fn test_error_with_context() {
        let error = ShareError::sink("payload.bin", "disk full")
            .with_context("writing frame 3")
            .with_recovery_suggestion("free some space")
            .with_metadata("frame", "3");

        assert_eq!(error.category(), "sink");
        assert!(error.is_retryable());
        assert!(error.is_recoverable());
        assert!(!classify::can_skip(&error));
        assert_eq!(error.recovery_suggestion(), Some("free some space"));
        assert_eq!(error.context().metadata.get("frame").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_geometry_from_codec_is_fatal() {
        let error: ShareError = CodecError::InvalidGeometry {
            width: 0,
            height: 480,
            grid: 16,
        }
        .into();

        assert_eq!(error.category(), "invalid_geometry");
        assert_eq!(error.severity(), ErrorSeverity::Fatal);
        assert!(classify::is_fatal(&error));
        assert!(!classify::can_skip(&error));
        assert_eq!(classify::retry_after(&error, 1), None);
        assert!(error.recovery_suggestion().is_some());
        assert!(error.to_string().contains("0x480"));
    }

    #[test]
    fn test_other_codec_errors_keep_source() {
        let error: ShareError = CodecError::BufferTooSmall {
            expected: 12,
            actual: 4,
        }
        .into();
        assert_eq!(error.category(), "codec");
        assert!(error.source().is_some());
    }

    #[test]
    fn test_source_errors_skip_within_budget() {
        let error = ShareError::frame_source("camera", "timeout");
        assert!(classify::can_skip(&error));
        assert_eq!(classify::retry_after(&error, 1), Some(Duration::from_millis(100)));
        assert_eq!(
            classify::retry_after(&error, MAX_CONSECUTIVE_SOURCE_ERRORS),
            Some(Duration::from_millis(100))
        );
        assert_eq!(classify::retry_after(&error, MAX_CONSECUTIVE_SOURCE_ERRORS + 1), None);
    }

    #[test]
    fn test_sink_errors_retry_once() {
        let error = ShareError::sink("json", "broken pipe");
        assert_eq!(classify::retry_after(&error, 1), Some(Duration::from_millis(250)));
        assert_eq!(classify::retry_after(&error, 2), None);
    }

    #[test]
    fn test_render_errors_skip_without_retry() {
        let error = ShareError::render("grid.png", "surface closed");
        assert!(classify::can_skip(&error));
        assert_eq!(classify::retry_after(&error, 1), None);
    }

    #[test]
    fn test_find_through_context() {
        let error = anyhow::Error::from(ShareError::invalid_geometry(8, 8, 16))
            .context("decoding frame 0");
        let share = classify::find(&error).unwrap();
        assert_eq!(share.category(), "invalid_geometry");
        assert!(classify::find(&anyhow::anyhow!("plain")).is_none());
    }
}

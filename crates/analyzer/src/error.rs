//! # Analysis Error Types
//!
//! Programmatic failures of the analyzer. User-facing problems
//! in the analyzed program are reported as [`crate::diagnostics::Diagnostic`]s
//! instead; these errors are the `Result` side of the engine's own operations.

use thiserror::Error;

/// Main error type for analyzer operations
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A template was bound twice to different types inside one unification
    #[error("Unification conflict: template {template} bound to {bound}, cannot rebind to {attempted}")]
    UnificationConflict {
        template: String,
        bound: String,
        attempted: String,
    },

    /// No version of a callable accepts the given arguments
    #[error("No version of {callable} accepts ({arguments})")]
    Unresolvable {
        callable: String,
        arguments: String,
        #[source]
        conflict: Option<Box<AnalysisError>>,
    },

    /// Invalid analyzer configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl AnalysisError {
    pub fn unification_conflict(
        template: impl Into<String>,
        bound: impl Into<String>,
        attempted: impl Into<String>,
    ) -> Self {
        Self::UnificationConflict {
            template: template.into(),
            bound: bound.into(),
            attempted: attempted.into(),
        }
    }

    pub fn unresolvable(
        callable: impl Into<String>,
        arguments: impl Into<String>,
        conflict: Option<AnalysisError>,
    ) -> Self {
        Self::Unresolvable {
            callable: callable.into(),
            arguments: arguments.into(),
            conflict: conflict.map(Box::new),
        }
    }

    /// The unification conflict behind this error, if any
    pub fn conflict(&self) -> Option<&AnalysisError> {
        match self {
            AnalysisError::UnificationConflict { .. } => Some(self),
            AnalysisError::Unresolvable { conflict, .. } => conflict.as_deref(),
            _ => None,
        }
    }
}

/// Result type alias for analyzer operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

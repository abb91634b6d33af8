//! Error types for view rendering.
//!
//! [`RenderError`] is what callers of [`ViewRenderer::render`](crate::ViewRenderer::render)
//! see. Its variants keep three failure families apart:
//!
//! - the view type could not be configured ([`RenderError::Configuration`]),
//! - the view could not be rendered (template lookup, loading or evaluation),
//! - the rendered output could not be delivered ([`RenderError::Io`]).
//!
//! Encoding detection never fails from the caller's point of view; an
//! unreadable or inconclusive sample falls back to the default encoding table.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure while building a [`TemplateConfiguration`](crate::TemplateConfiguration).
///
/// Build failures are never cached: the next render of the same view type
/// attempts the build again.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The view type's template namespace does not exist or cannot be read.
    #[error("template source unavailable ({location}): {source}")]
    SourceUnavailable {
        location: String,
        #[source]
        source: io::Error,
    },

    /// The template syntax could not be configured on the engine.
    #[error("invalid template syntax configuration: {0}")]
    Syntax(#[source] minijinja::Error),
}

/// Error type for view rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The template configuration for the view type could not be built.
    #[error("cannot configure templates for view `{view}`: {source}")]
    Configuration {
        view: &'static str,
        #[source]
        source: BuildError,
    },

    /// No template (or locale variant) with this name exists.
    #[error("template not found: {name} (locale {locale})")]
    TemplateNotFound { name: String, locale: String },

    /// The template exists but could not be read.
    #[error("failed to read template {name}: {source}")]
    TemplateLoad {
        name: String,
        #[source]
        source: io::Error,
    },

    /// Template syntax or evaluation error reported by the engine.
    #[error("template error: {0}")]
    Template(#[source] minijinja::Error),

    /// Writing to the output sink failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl RenderError {
    /// Returns true when the view rendered but its output could not be delivered.
    pub fn is_output_failure(&self) -> bool {
        matches!(self, RenderError::Io(_))
    }
}

/// Error type for renderer configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read renderer config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid renderer config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("concurrency must be a power of two greater than one, got {0}")]
    Concurrency(usize),

    #[error("template suffix must not be empty")]
    EmptySuffix,

    #[error("sample limit must be at least one byte")]
    SampleLimit,

    /// The shared cache builds with different detection or wrapping settings.
    #[error("renderer config does not match the build settings of the shared cache")]
    CachePolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RenderError::TemplateNotFound {
            name: "missing.ftl".to_string(),
            locale: "en-US".to_string(),
        };
        assert!(err.to_string().contains("template not found"));
        assert!(err.to_string().contains("missing.ftl"));
    }

    #[test]
    fn test_io_error_is_transparent() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        let err: RenderError = io_err.into();
        assert!(err.is_output_failure());
        assert_eq!(err.to_string(), "pipe closed");
    }

    #[test]
    fn test_configuration_error_names_view() {
        let err = RenderError::Configuration {
            view: "app::Greeting",
            source: BuildError::SourceUnavailable {
                location: "/nowhere".to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such directory"),
            },
        };
        assert!(!err.is_output_failure());
        assert!(err.to_string().contains("app::Greeting"));
        assert!(err.to_string().contains("/nowhere"));
    }
}

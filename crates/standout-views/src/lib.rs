//! # Standout Views - Cached Template Rendering for View Types
//!
//! `standout-views` renders data-bearing view values with templates that live
//! next to the view type. The expensive part of preparing a view type's
//! templates (sniffing the template encoding, wiring the loader, configuring
//! the engine) happens once per type and is cached for the life of the
//! renderer.
//!
//! ## Core Concepts
//!
//! - [`View`]: a value naming its template; its type names the
//!   [`TemplateSource`] templates are read from
//! - [`ViewIdentity`]: cache key made of a view type and an instance, equal
//!   by type only
//! - [`EncodingDetector`]: best-effort charset sniffing of template resources
//! - [`EncodingTable`]: per-locale template encodings, with a built-in table
//!   and UTF-8 default when detection is inconclusive
//! - [`ConfigurationBuilder`]: builds a [`TemplateConfiguration`] for a type
//! - [`ConfigurationCache`]: one build per view type, shared by all renders
//! - [`ViewRenderer`]: renderability check and streaming render
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use serde::Serialize;
//! use standout_views::{EmbeddedSource, TemplateSource, View, ViewRenderer};
//!
//! #[derive(Serialize)]
//! struct Order {
//!     id: u32,
//!     items: Vec<String>,
//! }
//!
//! impl View for Order {
//!     fn template_name(&self) -> &str {
//!         "order.ftl"
//!     }
//!
//!     fn template_source() -> Arc<dyn TemplateSource> {
//!         Arc::new(EmbeddedSource::new().with(
//!             "order.ftl",
//!             "Order #${id}:{% for item in items %} ${item}{% endfor %}",
//!         ))
//!     }
//! }
//!
//! let renderer = ViewRenderer::new();
//! let order = Order { id: 7, items: vec!["tea".into(), "scones".into()] };
//!
//! let mut out = Vec::new();
//! renderer.render(&order, &"en-GB".parse().unwrap(), &mut out).unwrap();
//! assert_eq!(String::from_utf8(out).unwrap(), "Order #7: tea scones");
//! ```
//!
//! ## Template Syntax
//!
//! Templates use `${ expr }` for interpolation, `{% ... %}` for control flow
//! and `{# ... #}` for comments. Everything else (filters, loops, includes,
//! macros) is MiniJinja.
//!
//! ## Encodings
//!
//! The template named by the first view of a type is sampled to detect its
//! encoding. A detected encoding applies to every locale. When detection is
//! inconclusive (plain ASCII, empty or unreadable template) the built-in
//! locale table is used, with UTF-8 for locales it does not list. Output is
//! written in the encoding the template was read with.
//!
//! ## Logging
//!
//! Configuration builds and detection fallbacks are reported through
//! [`tracing`] at debug level and cache hits at trace level. The crate never
//! installs a subscriber.

mod config;
pub mod configuration;
pub mod encoding;
mod error;
pub mod locale;
mod renderer;
pub mod source;
mod view;

pub use config::{RendererConfig, DEFAULT_SUFFIX};
pub use configuration::{
    ConfigurationBuilder, ConfigurationCache, LocatedTemplate, ObjectWrapper, PreparedTemplate,
    TemplateConfiguration, DEFAULT_CONCURRENCY,
};
pub use encoding::{EncodingDetector, EncodingOrigin, EncodingTable, EncodingWriter};
pub use error::{BuildError, ConfigError, RenderError};
pub use renderer::ViewRenderer;
pub use source::{DirectorySource, EmbeddedSource, TemplateSource};
pub use view::{View, ViewClass, ViewIdentity};

// Re-exported so callers can name locales without adding the dependency.
pub use unic_langid::LanguageIdentifier;

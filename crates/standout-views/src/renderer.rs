//! Rendering views through their cached template configuration.
//!
//! [`ViewRenderer`] is the entry point used by the surrounding framework:
//!
//! 1. [`is_renderable`](ViewRenderer::is_renderable) tells a dispatcher
//!    whether the renderer claims a view (by template suffix).
//! 2. [`render`](ViewRenderer::render) fetches (or builds, once per view
//!    type) the [`TemplateConfiguration`], takes the template prepared for
//!    the requested locale (compiling it on first use) and streams the output,
//!    encoded in the template's encoding, to the sink.
//!
//! ```rust
//! use std::sync::Arc;
//! use serde::Serialize;
//! use standout_views::{EmbeddedSource, TemplateSource, View, ViewRenderer};
//!
//! #[derive(Serialize)]
//! struct Greeting { name: String }
//!
//! impl View for Greeting {
//!     fn template_name(&self) -> &str { "greeting.ftl" }
//!     fn template_source() -> Arc<dyn TemplateSource> {
//!         Arc::new(EmbeddedSource::new().with("greeting.ftl", "Hello, ${name}!"))
//!     }
//! }
//!
//! let renderer = ViewRenderer::new();
//! let view = Greeting { name: "World".into() };
//! assert!(renderer.is_renderable(&view));
//!
//! let mut out = Vec::new();
//! renderer.render(&view, &"en-US".parse().unwrap(), &mut out).unwrap();
//! assert_eq!(out, b"Hello, World!");
//! ```

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use unic_langid::LanguageIdentifier;

use crate::config::RendererConfig;
use crate::configuration::{ConfigurationBuilder, ConfigurationCache, TemplateConfiguration};
use crate::encoding::EncodingWriter;
use crate::error::{ConfigError, RenderError};
use crate::view::{View, ViewIdentity};

/// Renders views with templates from their type's template source.
///
/// The configuration cache can be shared between renderers with
/// [`with_cache`](Self::with_cache); by default each renderer owns one. The
/// cache decides how configurations are built, so renderers sharing it also
/// share its detection and wrapping settings.
#[derive(Debug)]
pub struct ViewRenderer {
    cache: Arc<ConfigurationCache>,
    suffix: String,
}

impl Default for ViewRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewRenderer {
    /// Creates a renderer with the default [`RendererConfig`].
    pub fn new() -> Self {
        let config = RendererConfig::default();
        Self {
            cache: Arc::new(cache_for(&config)),
            suffix: config.suffix,
        }
    }

    /// Creates a renderer from validated settings, with its own cache.
    pub fn with_config(config: RendererConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let cache = Arc::new(cache_for(&config));
        Self::with_cache(config, cache)
    }

    /// Creates a renderer that stores configurations in `cache`.
    ///
    /// `config.concurrency` is ignored; the cache was sized when it was made.
    ///
    /// # Errors
    ///
    /// [`ConfigError::CachePolicy`] when `config` asks for a sample limit or
    /// object wrapper other than the ones `cache` builds with.
    pub fn with_cache(
        config: RendererConfig,
        cache: Arc<ConfigurationCache>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if ConfigurationBuilder::from_config(&config) != *cache.builder() {
            return Err(ConfigError::CachePolicy);
        }
        Ok(Self {
            cache,
            suffix: config.suffix,
        })
    }

    /// The configuration cache.
    pub fn cache(&self) -> &Arc<ConfigurationCache> {
        &self.cache
    }

    /// The template suffix this renderer claims.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Whether this renderer handles `view`: its template name ends with the
    /// configured suffix.
    pub fn is_renderable(&self, view: &dyn View) -> bool {
        view.template_name().ends_with(self.suffix.as_str())
    }

    /// The configuration of `view`'s type, built on first use.
    pub fn configuration<V: View + 'static>(
        &self,
        view: &V,
    ) -> Result<Arc<TemplateConfiguration>, RenderError> {
        let identity = ViewIdentity::of(view);
        self.cache
            .configuration(&identity)
            .map_err(|source| RenderError::Configuration {
                view: identity.class().name(),
                source,
            })
    }

    /// Renders `view` for `locale` into `output`.
    ///
    /// Output is written as it is produced, in the encoding of the resolved
    /// template. Errors from `output` are returned as [`RenderError::Io`];
    /// template problems as [`RenderError::TemplateNotFound`],
    /// [`RenderError::TemplateLoad`] or [`RenderError::Template`].
    pub fn render<V, W>(
        &self,
        view: &V,
        locale: &LanguageIdentifier,
        output: W,
    ) -> Result<(), RenderError>
    where
        V: View + Serialize + 'static,
        W: Write,
    {
        let configuration = self.configuration(view)?;
        let prepared = configuration.prepare(view.template_name(), locale)?;
        let template = prepared.template().map_err(RenderError::Template)?;

        let mut writer = EncodingWriter::new(output, prepared.encoding());
        let context = configuration.object_wrapper().wrap(view);
        if let Err(err) = template.render_captured_to(context, &mut writer) {
            return Err(match writer.take_failure() {
                Some(io) => RenderError::Io(io),
                None => RenderError::Template(err),
            });
        }
        writer.finish()?;
        Ok(())
    }
}

fn cache_for(config: &RendererConfig) -> ConfigurationCache {
    ConfigurationCache::with_builder(config.concurrency, ConfigurationBuilder::from_config(config))
}

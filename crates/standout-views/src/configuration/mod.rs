//! Per-view-type template configuration.
//!
//! A [`TemplateConfiguration`] bundles everything needed to instantiate the
//! templates of one view type: the encoding table, the template source the
//! type declared, the object-wrapping policy and a configured engine
//! environment. Building one is comparatively expensive (it samples the
//! template to detect its encoding), so configurations are built once per view
//! type by [`ConfigurationBuilder`] and memoized in [`ConfigurationCache`].
//!
//! Configurations are shared between concurrent renders through `Arc`. Their
//! settings never change after the build; the only thing that grows is the
//! set of [`PreparedTemplate`]s, one per template name and locale, compiled on
//! first render.

mod builder;
mod cache;

use std::fmt;
use std::io;
use std::sync::Arc;

use dashmap::DashMap;
use encoding_rs::Encoding;
use minijinja::{Environment, Template, UndefinedBehavior, Value};
use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::encoding::EncodingTable;
use crate::error::RenderError;
use crate::locale::localized_names;
use crate::source::TemplateSource;
use crate::view::ViewClass;

pub use builder::{ConfigurationBuilder, BLOCK_DELIMITERS, COMMENT_DELIMITERS, VARIABLE_DELIMITERS};
pub use cache::{ConfigurationCache, DEFAULT_CONCURRENCY};

/// How view values are exposed to templates.
///
/// Views are wrapped through their `serde::Serialize` implementation in both
/// modes. The modes differ in how templates treat names the view does not
/// provide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectWrapper {
    /// Missing fields render as empty output.
    #[default]
    Lenient,
    /// Referencing a missing field is a template error.
    Strict,
}

impl ObjectWrapper {
    /// Wraps a view into a template context value.
    pub fn wrap<T: Serialize + ?Sized>(&self, view: &T) -> Value {
        Value::from_serialize(view)
    }

    pub(crate) fn undefined_behavior(self) -> UndefinedBehavior {
        match self {
            ObjectWrapper::Lenient => UndefinedBehavior::Lenient,
            ObjectWrapper::Strict => UndefinedBehavior::Strict,
        }
    }
}

/// Resolved template settings for one view type.
pub struct TemplateConfiguration {
    class: ViewClass,
    encodings: EncodingTable,
    source: Arc<dyn TemplateSource>,
    wrapper: ObjectWrapper,
    env: Environment<'static>,
    prepared: DashMap<(String, String), Arc<PreparedTemplate>>,
}

impl TemplateConfiguration {
    pub(crate) fn new(
        class: ViewClass,
        encodings: EncodingTable,
        source: Arc<dyn TemplateSource>,
        wrapper: ObjectWrapper,
        env: Environment<'static>,
    ) -> Self {
        Self {
            class,
            encodings,
            source,
            wrapper,
            env,
            prepared: DashMap::new(),
        }
    }

    /// The view type this configuration was built for.
    pub fn view_class(&self) -> ViewClass {
        self.class
    }

    /// Encoding used for locales without an entry in the encoding table.
    pub fn default_encoding(&self) -> &'static Encoding {
        self.encodings.default_encoding()
    }

    /// The full encoding table.
    pub fn encodings(&self) -> &EncodingTable {
        &self.encodings
    }

    /// The template namespace of the view type.
    pub fn source(&self) -> &dyn TemplateSource {
        self.source.as_ref()
    }

    /// The object-wrapping policy.
    pub fn object_wrapper(&self) -> ObjectWrapper {
        self.wrapper
    }

    /// The configured engine environment.
    ///
    /// Includes resolved through it are decoded with the default encoding and
    /// are not localized; [`prepare`](Self::prepare) sets up both per locale.
    pub fn environment(&self) -> &Environment<'static> {
        &self.env
    }

    /// Returns the compiled template `name` for `locale`, preparing it on
    /// first use.
    ///
    /// The template is located and decoded as by [`template`](Self::template)
    /// and compiled into its own environment, whose include loader uses the
    /// encoding and locale variants of `locale`. Prepared templates are kept
    /// for the life of the configuration; failures are not, so a template
    /// deployed after a failed lookup is picked up by the next call.
    pub fn prepare(
        &self,
        name: &str,
        locale: &LanguageIdentifier,
    ) -> Result<Arc<PreparedTemplate>, RenderError> {
        let key = (name.to_string(), locale.to_string());
        if let Some(prepared) = self.prepared.get(&key) {
            return Ok(Arc::clone(prepared.value()));
        }

        let located = self.template(name, locale)?;
        let mut env = self.env.clone();
        env.set_loader(builder::include_loader(
            Arc::clone(&self.source),
            Some(locale.clone()),
            self.encodings.for_locale(locale),
        ));
        env.add_template_owned(located.name.clone(), located.source)
            .map_err(RenderError::Template)?;

        let prepared = Arc::new(PreparedTemplate {
            name: located.name,
            encoding: located.encoding,
            env,
        });
        Ok(Arc::clone(self.prepared.entry(key).or_insert(prepared).value()))
    }

    /// Number of prepared templates.
    pub fn prepared_templates(&self) -> usize {
        self.prepared.len()
    }

    /// Locates the template `name` for `locale` and decodes it.
    ///
    /// Locale variants are tried from most to least specific (see
    /// [`localized_names`]). The template is decoded with the encoding the
    /// table assigns to `locale`, unless the resource starts with a
    /// byte-order mark.
    ///
    /// # Errors
    ///
    /// [`RenderError::TemplateNotFound`] when no candidate exists, and
    /// [`RenderError::TemplateLoad`] when a candidate exists but cannot be read.
    pub fn template(
        &self,
        name: &str,
        locale: &LanguageIdentifier,
    ) -> Result<LocatedTemplate, RenderError> {
        for candidate in localized_names(name, locale) {
            match self.source.read(&candidate) {
                Ok(bytes) => {
                    let (text, encoding, _) = self.encodings.for_locale(locale).decode(&bytes);
                    return Ok(LocatedTemplate {
                        name: candidate,
                        source: text.into_owned(),
                        encoding,
                    });
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => {
                    return Err(RenderError::TemplateLoad {
                        name: candidate,
                        source: err,
                    })
                }
            }
        }
        Err(RenderError::TemplateNotFound {
            name: name.to_string(),
            locale: locale.to_string(),
        })
    }
}

impl fmt::Debug for TemplateConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateConfiguration")
            .field("class", &self.class)
            .field("default_encoding", &self.default_encoding().name())
            .field("origin", &self.encodings.origin())
            .field("source", &self.source.location())
            .field("wrapper", &self.wrapper)
            .field("prepared", &self.prepared.len())
            .finish()
    }
}

/// A template resolved for a locale, decoded and ready to compile.
#[derive(Debug, Clone)]
pub struct LocatedTemplate {
    name: String,
    source: String,
    encoding: &'static Encoding,
}

impl LocatedTemplate {
    /// The resource name that was found (possibly a locale variant).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decoded template text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Encoding the template was stored in; output is written in it too.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }
}

/// A template compiled for one locale, with its own include loader.
pub struct PreparedTemplate {
    name: String,
    encoding: &'static Encoding,
    env: Environment<'static>,
}

impl PreparedTemplate {
    /// The resource name that was found (possibly a locale variant).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Encoding the template was stored in; output is written in it too.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// The compiled template.
    pub fn template(&self) -> Result<Template<'_, '_>, minijinja::Error> {
        self.env.get_template(&self.name)
    }
}

impl fmt::Debug for PreparedTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedTemplate")
            .field("name", &self.name)
            .field("encoding", &self.encoding.name())
            .finish()
    }
}

//! Building template configurations on cache misses.

use std::io;
use std::sync::Arc;

use encoding_rs::Encoding;
use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, Error, ErrorKind};
use unic_langid::LanguageIdentifier;

use super::{ObjectWrapper, TemplateConfiguration};
use crate::config::RendererConfig;
use crate::encoding::{EncodingDetector, EncodingTable};
use crate::error::BuildError;
use crate::locale::localized_names;
use crate::source::TemplateSource;
use crate::view::ViewIdentity;

/// Delimiters of control blocks: `{% if admin %}`.
pub const BLOCK_DELIMITERS: (&str, &str) = ("{%", "%}");

/// Delimiters of interpolations: `${ user.name }`.
pub const VARIABLE_DELIMITERS: (&str, &str) = ("${", "}");

/// Delimiters of comments: `{# note #}`.
pub const COMMENT_DELIMITERS: (&str, &str) = ("{#", "#}");

/// Produces the [`TemplateConfiguration`] of a view type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigurationBuilder {
    detector: EncodingDetector,
    wrapper: ObjectWrapper,
}

impl ConfigurationBuilder {
    pub fn new(detector: EncodingDetector, wrapper: ObjectWrapper) -> Self {
        Self { detector, wrapper }
    }

    pub fn from_config(config: &RendererConfig) -> Self {
        Self::new(
            EncodingDetector::new(config.sample_limit),
            config.object_wrapper,
        )
    }

    /// Builds the configuration for the view type of `identity`.
    ///
    /// The bound view is only consulted for its template name, which is
    /// sampled to detect the encoding. When detection is inconclusive the
    /// built-in locale table applies with UTF-8 as default.
    pub fn build(&self, identity: &ViewIdentity<'_>) -> Result<TemplateConfiguration, BuildError> {
        let class = identity.class();
        let source = class.template_source();
        source
            .ensure_available()
            .map_err(|err| BuildError::SourceUnavailable {
                location: source.location(),
                source: err,
            })?;

        let template_name = identity.view().template_name();
        let detected = self.detector.detect(source.as_ref(), template_name);
        let encodings = EncodingTable::from_detection(detected);
        tracing::debug!(
            view = class.name(),
            template = template_name,
            encoding = encodings.default_encoding().name(),
            origin = ?encodings.origin(),
            "built template configuration"
        );

        let env = self.environment(Arc::clone(&source), encodings.default_encoding())?;
        Ok(TemplateConfiguration::new(
            class,
            encodings,
            source,
            self.wrapper,
            env,
        ))
    }

    fn environment(
        &self,
        source: Arc<dyn TemplateSource>,
        encoding: &'static Encoding,
    ) -> Result<Environment<'static>, BuildError> {
        let mut env = Environment::new();
        env.set_syntax(template_syntax()?);
        env.set_keep_trailing_newline(true);
        env.set_undefined_behavior(self.wrapper.undefined_behavior());
        env.set_loader(include_loader(source, None, encoding));
        Ok(env)
    }
}

fn template_syntax() -> Result<SyntaxConfig, BuildError> {
    SyntaxConfig::builder()
        .block_delimiters(BLOCK_DELIMITERS.0, BLOCK_DELIMITERS.1)
        .variable_delimiters(VARIABLE_DELIMITERS.0, VARIABLE_DELIMITERS.1)
        .comment_delimiters(COMMENT_DELIMITERS.0, COMMENT_DELIMITERS.1)
        .build()
        .map_err(BuildError::Syntax)
}

/// Loader for `{% include %}` and `{% import %}`.
///
/// Included templates are decoded with `encoding` and, when a locale is
/// given, looked up through the same locale variants as the main template.
pub(super) fn include_loader(
    source: Arc<dyn TemplateSource>,
    locale: Option<LanguageIdentifier>,
    encoding: &'static Encoding,
) -> impl Fn(&str) -> Result<Option<String>, Error> + Send + Sync + 'static {
    move |name| {
        let candidates = match &locale {
            Some(locale) => localized_names(name, locale),
            None => vec![name.to_string()],
        };
        for candidate in candidates {
            match source.read(&candidate) {
                Ok(bytes) => return Ok(Some(encoding.decode(&bytes).0.into_owned())),
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => {
                    return Err(Error::new(
                        ErrorKind::InvalidOperation,
                        format!("failed to read template {}", candidate),
                    )
                    .with_source(err))
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::EncodingOrigin;
    use crate::source::{DirectorySource, EmbeddedSource};
    use crate::view::View;
    use encoding_rs::{SHIFT_JIS, UTF_8};

    struct Plain;

    impl View for Plain {
        fn template_name(&self) -> &str {
            "plain.ftl"
        }

        fn template_source() -> Arc<dyn TemplateSource> {
            Arc::new(
                EmbeddedSource::new()
                    .with("plain.ftl", "Hello, ${name}!")
                    .with("header.ftl", "== ${title} =="),
            )
        }
    }

    struct Japanese;

    impl View for Japanese {
        fn template_name(&self) -> &str {
            "ja.ftl"
        }

        fn template_source() -> Arc<dyn TemplateSource> {
            let text = "こんにちは、${name}さん。きょうはとてもいいてんきですね。\
                        わたしたちはあなたのおとずれをこころからおまちしておりました。";
            let (bytes, _, _) = SHIFT_JIS.encode(text);
            Arc::new(EmbeddedSource::new().with("ja.ftl", bytes.into_owned()))
        }
    }

    struct Homeless;

    impl View for Homeless {
        fn template_name(&self) -> &str {
            "homeless.ftl"
        }

        fn template_source() -> Arc<dyn TemplateSource> {
            Arc::new(DirectorySource::new("/definitely/not/a/template/root"))
        }
    }

    #[test]
    fn test_inconclusive_detection_uses_fallback_table() {
        let config = ConfigurationBuilder::default()
            .build(&ViewIdentity::of(&Plain))
            .unwrap();
        assert_eq!(config.encodings().origin(), EncodingOrigin::Fallback);
        assert_eq!(config.default_encoding(), UTF_8);
        assert!(config.encodings().locale_entries() > 0);
    }

    #[test]
    fn test_detected_encoding_becomes_default() {
        let config = ConfigurationBuilder::default()
            .build(&ViewIdentity::of(&Japanese))
            .unwrap();
        assert_eq!(config.encodings().origin(), EncodingOrigin::Detected);
        assert_eq!(config.default_encoding(), SHIFT_JIS);
        assert_eq!(config.encodings().locale_entries(), 0);
    }

    #[test]
    fn test_missing_source_fails_the_build() {
        let err = ConfigurationBuilder::default()
            .build(&ViewIdentity::of(&Homeless))
            .unwrap_err();
        assert!(matches!(err, BuildError::SourceUnavailable { .. }));
        assert!(err.to_string().contains("/definitely/not/a/template/root"));
    }

    #[test]
    fn test_environment_uses_interpolation_syntax_and_includes() {
        let config = ConfigurationBuilder::default()
            .build(&ViewIdentity::of(&Plain))
            .unwrap();
        let env = config.environment();
        let output = env
            .render_str(
                "{% include 'header.ftl' %}\n{# hidden #}${ items | join(', ') }",
                minijinja::context! { title => "Report", items => vec!["a", "b"] },
            )
            .unwrap();
        assert_eq!(output, "== Report ==\na, b");
    }

    #[test]
    fn test_strict_wrapper_rejects_missing_fields() {
        let builder = ConfigurationBuilder::new(EncodingDetector::default(), ObjectWrapper::Strict);
        let config = builder.build(&ViewIdentity::of(&Plain)).unwrap();
        assert_eq!(config.object_wrapper(), ObjectWrapper::Strict);
        let result = config
            .environment()
            .render_str("${ missing }", minijinja::context! {});
        assert!(result.is_err());
    }
}

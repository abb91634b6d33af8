//! Views and their class identity.
//!
//! A view is a value that names the template rendering it and carries the
//! data that template reads. The view's *type* decides where templates come
//! from ([`View::template_source`]) and which cached configuration is used.
//!
//! # Identity
//!
//! [`ViewIdentity`] pairs a view type with one instance of it. Only the type
//! takes part in equality and hashing; the instance is carried along so the
//! configuration builder can read its template name on a cache miss. Two
//! greetings with different names therefore share one identity:
//!
//! ```rust
//! use std::sync::Arc;
//! use standout_views::{EmbeddedSource, TemplateSource, View, ViewIdentity};
//!
//! struct Greeting { name: String }
//!
//! impl View for Greeting {
//!     fn template_name(&self) -> &str { "greeting.ftl" }
//!     fn template_source() -> Arc<dyn TemplateSource> {
//!         Arc::new(EmbeddedSource::new().with("greeting.ftl", "Hello, ${name}!"))
//!     }
//! }
//!
//! let a = Greeting { name: "Ada".into() };
//! let b = Greeting { name: "Grace".into() };
//! assert_eq!(ViewIdentity::of(&a), ViewIdentity::of(&b));
//! ```

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::source::TemplateSource;

/// A renderable value bound to a template.
///
/// Implementors are usually also [`serde::Serialize`]; serialization is how
/// their fields reach the template.
pub trait View {
    /// Name of the template rendering this view, relative to the type's
    /// template source (for example `"greeting.ftl"`).
    fn template_name(&self) -> &str;

    /// The namespace templates for this view type are resolved from.
    ///
    /// Called once per view type, when its configuration is first built.
    fn template_source() -> Arc<dyn TemplateSource>
    where
        Self: Sized;
}

/// Class token of a view type.
///
/// Compares and hashes by [`TypeId`] only. The type name is kept for
/// diagnostics and the source function for configuration builds.
#[derive(Clone, Copy)]
pub struct ViewClass {
    id: TypeId,
    name: &'static str,
    source: fn() -> Arc<dyn TemplateSource>,
}

impl ViewClass {
    /// The class token of `V`.
    pub fn of<V: View + 'static>() -> Self {
        Self {
            id: TypeId::of::<V>(),
            name: std::any::type_name::<V>(),
            source: V::template_source,
        }
    }

    /// Fully qualified type name of the view.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Resolves the template source declared by the view type.
    pub fn template_source(&self) -> Arc<dyn TemplateSource> {
        (self.source)()
    }
}

impl PartialEq for ViewClass {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ViewClass {}

impl Hash for ViewClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ViewClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ViewClass").field(&self.name).finish()
    }
}

/// Cache identity of a render request: a view type plus the instance being
/// rendered.
///
/// Equality and hashing consider the [`ViewClass`] only. The bound view is
/// read solely while building a configuration (for its template name) and
/// never affects which cache entry is used.
#[derive(Clone, Copy)]
pub struct ViewIdentity<'v> {
    class: ViewClass,
    view: &'v dyn View,
}

impl<'v> ViewIdentity<'v> {
    /// Identity of `view`, keyed by its concrete type.
    pub fn of<V: View + 'static>(view: &'v V) -> Self {
        Self {
            class: ViewClass::of::<V>(),
            view,
        }
    }

    /// The view type.
    pub fn class(&self) -> ViewClass {
        self.class
    }

    /// The bound view instance.
    pub fn view(&self) -> &'v dyn View {
        self.view
    }
}

impl PartialEq for ViewIdentity<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class
    }
}

impl Eq for ViewIdentity<'_> {}

impl Hash for ViewIdentity<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class.hash(state);
    }
}

impl fmt::Debug for ViewIdentity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewIdentity")
            .field("class", &self.class)
            .field("template", &self.view.template_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::EmbeddedSource;
    use proptest::prelude::*;
    use std::collections::hash_map::DefaultHasher;

    struct Greeting {
        template: String,
    }

    impl View for Greeting {
        fn template_name(&self) -> &str {
            &self.template
        }

        fn template_source() -> Arc<dyn TemplateSource> {
            Arc::new(EmbeddedSource::new())
        }
    }

    struct Farewell;

    impl View for Farewell {
        fn template_name(&self) -> &str {
            "farewell.ftl"
        }

        fn template_source() -> Arc<dyn TemplateSource> {
            Arc::new(EmbeddedSource::new().labelled("farewell"))
        }
    }

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_different_types_are_different_identities() {
        let greeting = Greeting {
            template: "greeting.ftl".into(),
        };
        assert_ne!(ViewIdentity::of(&greeting), ViewIdentity::of(&Farewell));
        assert_ne!(ViewClass::of::<Greeting>(), ViewClass::of::<Farewell>());
    }

    #[test]
    fn test_class_carries_name_and_source() {
        let class = ViewClass::of::<Farewell>();
        assert!(class.name().ends_with("Farewell"));
        assert_eq!(class.template_source().location(), "farewell");
    }

    #[test]
    fn test_identity_exposes_bound_view() {
        let view = Greeting {
            template: "a.ftl".into(),
        };
        let identity = ViewIdentity::of(&view);
        assert_eq!(identity.view().template_name(), "a.ftl");
        assert_eq!(identity.class(), ViewClass::of::<Greeting>());
    }

    proptest! {
        #[test]
        fn same_type_identities_are_equal(a in ".*", b in ".*") {
            let first = Greeting { template: a };
            let second = Greeting { template: b };
            let x = ViewIdentity::of(&first);
            let y = ViewIdentity::of(&second);

            prop_assert_eq!(x, x);
            prop_assert_eq!(x, y);
            prop_assert_eq!(y, x);
            prop_assert_eq!(hash_of(&x), hash_of(&y));
        }
    }
}

//! Memoizing cache of template configurations.
//!
//! # Guarantees
//!
//! - **One build per key at a time.** When several threads ask for a view type
//!   that has not been built yet, one of them runs the build and the others
//!   block until it finishes. They then share the same `Arc`.
//! - **Failures are not cached.** If a build fails, its caller gets the error
//!   and the entry stays empty. A thread that was waiting on that build runs
//!   its own attempt next, and later requests retry as well. A template root
//!   that is deployed after the first request therefore starts working
//!   without a restart.
//! - **Unrelated keys do not contend.** Entries live in a sharded map and the
//!   build runs outside of any shard lock.
//! - **One build policy per cache.** The cache owns the
//!   [`ConfigurationBuilder`] used by [`configuration`](ConfigurationCache::configuration),
//!   so every renderer sharing a cache sees configurations built with the same
//!   encoding sampling and object-wrapping settings.
//!
//! # Lifecycle
//!
//! Entries are never evicted. The key space is the set of view types in the
//! program, so the cache is bounded by the code rather than by traffic, and a
//! cache held by a long-lived renderer lives for the whole process. There is
//! nothing to tear down: configurations hold no handles that need releasing.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use standout_views::{
//!     ConfigurationBuilder, ConfigurationCache, EmbeddedSource, TemplateSource, View, ViewIdentity,
//! };
//!
//! struct Status;
//!
//! impl View for Status {
//!     fn template_name(&self) -> &str { "status.ftl" }
//!     fn template_source() -> Arc<dyn TemplateSource> {
//!         Arc::new(EmbeddedSource::new().with("status.ftl", "ok"))
//!     }
//! }
//!
//! let cache = ConfigurationCache::new();
//! let identity = ViewIdentity::of(&Status);
//!
//! let first = cache.configuration(&identity).unwrap();
//! let second = cache
//!     .get_or_build(&identity, |id| ConfigurationBuilder::default().build(id))
//!     .unwrap();
//! assert!(Arc::ptr_eq(&first, &second));
//! assert_eq!(cache.len(), 1);
//! ```

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;

use super::{ConfigurationBuilder, TemplateConfiguration};
use crate::error::BuildError;
use crate::view::{ViewClass, ViewIdentity};

/// Default number of shards of the cache map.
pub const DEFAULT_CONCURRENCY: usize = 128;

type Slot = Arc<OnceCell<Arc<TemplateConfiguration>>>;

/// Concurrent get-or-build cache of [`TemplateConfiguration`]s keyed by view type.
pub struct ConfigurationCache {
    entries: DashMap<ViewClass, Slot>,
    builder: ConfigurationBuilder,
}

impl Default for ConfigurationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationCache {
    /// Creates an empty cache with [`DEFAULT_CONCURRENCY`] shards.
    pub fn new() -> Self {
        Self::with_concurrency(DEFAULT_CONCURRENCY)
    }

    /// Creates an empty cache with `shards` shards and the default builder.
    ///
    /// # Panics
    ///
    /// Panics unless `shards` is a power of two greater than one.
    /// [`RendererConfig::validate`](crate::RendererConfig::validate) checks
    /// this ahead of time.
    pub fn with_concurrency(shards: usize) -> Self {
        Self::with_builder(shards, ConfigurationBuilder::default())
    }

    /// Creates an empty cache with `shards` shards that builds with `builder`.
    ///
    /// # Panics
    ///
    /// Same as [`with_concurrency`](Self::with_concurrency).
    pub fn with_builder(shards: usize, builder: ConfigurationBuilder) -> Self {
        Self {
            entries: DashMap::with_shard_amount(shards),
            builder,
        }
    }

    /// The builder used by [`configuration`](Self::configuration).
    pub fn builder(&self) -> &ConfigurationBuilder {
        &self.builder
    }

    /// Returns the configuration for the view type of `identity`, building it
    /// with this cache's builder on first use.
    pub fn configuration(
        &self,
        identity: &ViewIdentity<'_>,
    ) -> Result<Arc<TemplateConfiguration>, BuildError> {
        self.get_or_build(identity, |identity| self.builder.build(identity))
    }

    /// Returns the configuration for the view type of `identity`, running
    /// `build` if it has not been built yet.
    ///
    /// At most one `build` runs per view type at a time; concurrent callers
    /// wait for it and share its result. An `Err` from `build` is returned to
    /// the caller that ran it and leaves the entry empty.
    pub fn get_or_build<F, E>(
        &self,
        identity: &ViewIdentity<'_>,
        build: F,
    ) -> Result<Arc<TemplateConfiguration>, E>
    where
        F: FnOnce(&ViewIdentity<'_>) -> Result<TemplateConfiguration, E>,
    {
        let class = identity.class();
        let slot = self.slot(class);
        if let Some(configuration) = slot.get() {
            tracing::trace!(view = class.name(), "template configuration cache hit");
            return Ok(Arc::clone(configuration));
        }

        slot.get_or_try_init(|| {
            tracing::debug!(view = class.name(), "building template configuration");
            build(identity).map(Arc::new)
        })
        .map(Arc::clone)
    }

    /// Returns the configuration of `class` if it has been built.
    pub fn get(&self, class: &ViewClass) -> Option<Arc<TemplateConfiguration>> {
        self.entries
            .get(class)
            .and_then(|slot| slot.get().map(Arc::clone))
    }

    /// Whether a configuration for `class` has been built.
    pub fn contains(&self, class: &ViewClass) -> bool {
        self.get(class).is_some()
    }

    /// Number of built configurations.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .count()
    }

    /// Whether no configuration has been built yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, class: ViewClass) -> Slot {
        if let Some(slot) = self.entries.get(&class) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.entries.entry(class).or_default().value())
    }
}

impl fmt::Debug for ConfigurationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationCache")
            .field("built", &self.len())
            .field("builder", &self.builder)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::ObjectWrapper;
    use crate::encoding::EncodingDetector;
    use crate::source::{EmbeddedSource, TemplateSource};
    use crate::view::View;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    #[derive(Default)]
    struct Profile {
        name: String,
    }

    impl View for Profile {
        fn template_name(&self) -> &str {
            "profile.ftl"
        }

        fn template_source() -> Arc<dyn TemplateSource> {
            Arc::new(EmbeddedSource::new().with("profile.ftl", "${name}"))
        }
    }

    struct Dashboard;

    impl View for Dashboard {
        fn template_name(&self) -> &str {
            "dashboard.ftl"
        }

        fn template_source() -> Arc<dyn TemplateSource> {
            Arc::new(EmbeddedSource::new().with("dashboard.ftl", "dashboard"))
        }
    }

    fn counting_build(
        counter: &AtomicUsize,
    ) -> impl FnOnce(&ViewIdentity<'_>) -> Result<TemplateConfiguration, BuildError> + '_ {
        move |identity| {
            counter.fetch_add(1, Ordering::SeqCst);
            ConfigurationBuilder::default().build(identity)
        }
    }

    fn failing_build(
        counter: &AtomicUsize,
    ) -> impl FnOnce(&ViewIdentity<'_>) -> Result<TemplateConfiguration, BuildError> + '_ {
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            Err(BuildError::SourceUnavailable {
                location: "nowhere".to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "not deployed yet"),
            })
        }
    }

    #[test]
    fn test_same_type_is_built_once() {
        let cache = ConfigurationCache::new();
        let builds = AtomicUsize::new(0);
        let ada = Profile { name: "Ada".into() };
        let grace = Profile {
            name: "Grace".into(),
        };

        let first = cache
            .get_or_build(&ViewIdentity::of(&ada), counting_build(&builds))
            .unwrap();
        let second = cache
            .get_or_build(&ViewIdentity::of(&grace), counting_build(&builds))
            .unwrap();

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_ne!(ada.name, grace.name);
    }

    #[test]
    fn test_different_types_get_independent_entries() {
        let cache = ConfigurationCache::new();
        let builds = AtomicUsize::new(0);

        let profile = cache
            .get_or_build(&ViewIdentity::of(&Profile::default()), counting_build(&builds))
            .unwrap();
        let dashboard = cache
            .get_or_build(&ViewIdentity::of(&Dashboard), counting_build(&builds))
            .unwrap();

        assert_eq!(builds.load(Ordering::SeqCst), 2);
        assert!(!Arc::ptr_eq(&profile, &dashboard));
        assert_eq!(profile.view_class(), ViewClass::of::<Profile>());
        assert_eq!(dashboard.view_class(), ViewClass::of::<Dashboard>());
        assert!(cache.contains(&ViewClass::of::<Profile>()));
        assert!(cache.contains(&ViewClass::of::<Dashboard>()));
    }

    #[test]
    fn test_concurrent_requests_share_one_build() {
        const THREADS: usize = 16;
        let cache = ConfigurationCache::new();
        let builds = AtomicUsize::new(0);
        let barrier = Barrier::new(THREADS);

        let results: Vec<Arc<TemplateConfiguration>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|i| {
                    let (cache, builds, barrier) = (&cache, &builds, &barrier);
                    scope.spawn(move || {
                        let view = Profile {
                            name: format!("user-{}", i),
                        };
                        barrier.wait();
                        cache
                            .get_or_build(&ViewIdentity::of(&view), |identity| {
                                builds.fetch_add(1, Ordering::SeqCst);
                                thread::sleep(Duration::from_millis(20));
                                ConfigurationBuilder::default().build(identity)
                            })
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|c| Arc::ptr_eq(c, &results[0])));
    }

    #[test]
    fn test_failed_build_is_not_cached() {
        let cache = ConfigurationCache::new();
        let builds = AtomicUsize::new(0);
        let identity = ViewIdentity::of(&Dashboard);

        assert!(cache.get_or_build(&identity, failing_build(&builds)).is_err());
        assert!(cache.is_empty());
        assert!(cache.get(&ViewClass::of::<Dashboard>()).is_none());

        let built = cache.get_or_build(&identity, counting_build(&builds));
        assert!(built.is_ok());
        assert_eq!(builds.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_failures_are_retried_by_each_waiter() {
        const THREADS: usize = 8;
        let cache = ConfigurationCache::new();
        let builds = AtomicUsize::new(0);
        let barrier = Barrier::new(THREADS);

        let failures = thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let (cache, builds, barrier) = (&cache, &builds, &barrier);
                    scope.spawn(move || {
                        barrier.wait();
                        cache
                            .get_or_build(&ViewIdentity::of(&Dashboard), failing_build(builds))
                            .is_err()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|failed| *failed)
                .count()
        });

        assert_eq!(failures, THREADS);
        assert_eq!(builds.load(Ordering::SeqCst), THREADS);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_configuration_uses_the_cache_builder() {
        let strict = ConfigurationBuilder::new(EncodingDetector::default(), ObjectWrapper::Strict);
        let cache = ConfigurationCache::with_builder(DEFAULT_CONCURRENCY, strict);
        assert_eq!(cache.builder(), &strict);

        let configuration = cache
            .configuration(&ViewIdentity::of(&Profile::default()))
            .unwrap();
        assert_eq!(configuration.object_wrapper(), ObjectWrapper::Strict);
        assert!(Arc::ptr_eq(
            &configuration,
            &cache.get(&ViewClass::of::<Profile>()).unwrap()
        ));
    }
}

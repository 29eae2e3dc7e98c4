use super::{Filter, FilterConfig, FilterPipeline, Registration};
use crate::errors::AaaError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Property naming the filters to inject, comma separated, in order.
pub const CUSTOM_FILTER_LIST_KEY: &str = "customFilterList";

/// Ordered filter list parsed from a properties map.
///
/// ```text
/// customFilterList = auth-log, authentication
/// authentication.realm = lab
/// ```
///
/// A `<filter>.<param>` key becomes an init parameter of that filter (split
/// at the last dot). Keys without a dot other than `customFilterList` are
/// logged and skipped. Keys match regardless of ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterChainConfig {
    filters: Vec<FilterConfig>,
}

impl FilterChainConfig {
    #[must_use]
    pub fn from_properties(properties: &HashMap<String, String>) -> Self {
        info!(target: "aaa.filters", keys = properties.len(), "Custom filter properties updated");

        for key in properties.keys() {
            if !key.contains('.') && !key.eq_ignore_ascii_case(CUSTOM_FILTER_LIST_KEY) {
                error!(target: "aaa.filters", key = %key, "Couldn't parse filter property; skipping");
            }
        }

        let list = properties
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(CUSTOM_FILTER_LIST_KEY))
            .map(|(_, value)| value);
        let Some(list) = list else {
            return Self::default();
        };

        let compact: String = list.chars().filter(|c| !c.is_whitespace()).collect();
        let filters = compact
            .split(',')
            .filter(|name| !name.is_empty())
            .map(|name| {
                properties
                    .iter()
                    .filter_map(|(key, value)| {
                        let (filter, param) = key.rsplit_once('.')?;
                        filter
                            .eq_ignore_ascii_case(name)
                            .then_some((param, value))
                    })
                    .fold(FilterConfig::new(name), |config, (param, value)| {
                        config.with_param(param, value.as_str())
                    })
            })
            .collect();

        Self { filters }
    }

    #[must_use]
    pub fn filters(&self) -> &[FilterConfig] {
        &self.filters
    }

    #[must_use]
    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(FilterConfig::filter_name).collect()
    }
}

/// Builds a fresh filter instance.
pub type FilterFactory = Arc<dyn Fn() -> Arc<dyn Filter> + Send + Sync>;

/// Maps filter names used in [`FilterChainConfig`] to factories.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    factories: HashMap<String, FilterFactory>,
}

impl FilterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_factory<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Filter> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn create(&self, name: &str) -> Option<Arc<dyn Filter>> {
        self.factories.get(name).map(|factory| factory())
    }
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("filters", &self.names())
            .finish()
    }
}

impl FilterPipeline {
    /// Rebuild the stage list from `config`.
    ///
    /// A filter already live with the same name and parameters is kept as
    /// is; anything else gets a fresh instance from `registry`. Unknown
    /// names are logged and skipped.
    ///
    /// # Errors
    ///
    /// Fails when a new filter's `init` fails; the previous list stays live.
    pub fn reconfigure(
        &self,
        config: &FilterChainConfig,
        registry: &FilterRegistry,
    ) -> Result<(), AaaError> {
        let mut registrations = Vec::with_capacity(config.filters().len());

        for filter_config in config.filters() {
            let filter = match self.live_filter(filter_config) {
                Some(live) => live,
                None => match registry.create(filter_config.filter_name()) {
                    Some(created) => created,
                    None => {
                        warn!(
                            target: "aaa.filters",
                            filter = filter_config.filter_name(),
                            "Skipping filter that couldn't be found"
                        );
                        continue;
                    }
                },
            };
            registrations.push(Registration::new(filter).with_config(filter_config.clone()));
        }

        self.update_stages(registrations)
    }
}

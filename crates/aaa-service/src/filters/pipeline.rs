use super::{Filter, FilterConfig, FilterRequest, FilterResponse, Next, Terminal};
use crate::errors::AaaError;
use crate::observability::metrics::{record_filter_chain_update, set_filter_chain_stages};
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, instrument};

/// A filter and the configuration it is registered with.
#[derive(Clone)]
pub struct Registration {
    filter: Arc<dyn Filter>,
    config: FilterConfig,
}

impl Registration {
    /// Register `filter` with no init parameters.
    #[must_use]
    pub fn new(filter: Arc<dyn Filter>) -> Self {
        let config = FilterConfig::new(filter.name());
        Self { filter, config }
    }

    #[must_use]
    pub fn with_config(mut self, config: FilterConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn filter(&self) -> &Arc<dyn Filter> {
        &self.filter
    }

    #[must_use]
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("filter", &self.filter.name())
            .field("config", &self.config)
            .finish()
    }
}

/// A registered filter plus its lifecycle state.
///
/// Released exactly once, when the last snapshot holding it is dropped (or
/// right away when an aborted update discards it).
pub(crate) struct Stage {
    filter: Arc<dyn Filter>,
    config: FilterConfig,
    lifecycle: Mutex<()>,
    initialized: AtomicBool,
    released: AtomicBool,
}

impl Stage {
    fn new(registration: Registration) -> Self {
        Self {
            filter: registration.filter,
            config: registration.config,
            lifecycle: Mutex::new(()),
            initialized: AtomicBool::new(false),
            released: AtomicBool::new(false),
        }
    }

    pub(crate) fn filter(&self) -> &dyn Filter {
        self.filter.as_ref()
    }

    pub(crate) fn ensure_initialized(&self) -> Result<(), AaaError> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        let _lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        if self.released.load(Ordering::Acquire) {
            return Err(AaaError::Filter(format!(
                "filter '{}' has been released",
                self.config.filter_name()
            )));
        }

        self.filter
            .init(&self.config)
            .map_err(|e| match e {
                e @ AaaError::FilterInit { .. } => e,
                other => AaaError::FilterInit {
                    filter: self.config.filter_name().to_string(),
                    reason: other.to_string(),
                },
            })?;

        self.initialized.store(true, Ordering::Release);
        debug!(target: "aaa.filters", filter = self.config.filter_name(), "Filter initialized");
        Ok(())
    }

    /// Call `destroy` on the filter if it was initialized. Idempotent.
    pub(crate) fn release(&self) {
        let _lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.initialized.load(Ordering::Acquire) {
            self.filter.destroy();
            debug!(target: "aaa.filters", filter = self.config.filter_name(), "Filter released");
        }
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        self.release();
    }
}

type StageList = Vec<Arc<Stage>>;

/// Hot-swappable filter chain in front of a fixed terminal handler.
///
/// Each `process` call loads the current stage list once and runs to
/// completion on that snapshot; an `update_stages` racing with it affects
/// only later requests. No lock is held while stages run. Updates are
/// serialized among themselves.
pub struct FilterPipeline {
    stages: ArcSwap<StageList>,
    update_lock: Mutex<()>,
    terminal: Arc<dyn Terminal>,
}

impl FilterPipeline {
    /// Create an empty pipeline: requests go straight to `terminal`.
    pub fn new(terminal: impl Terminal + 'static) -> Self {
        Self::from_shared(Arc::new(terminal))
    }

    #[must_use]
    pub fn from_shared(terminal: Arc<dyn Terminal>) -> Self {
        Self {
            stages: ArcSwap::from_pointee(Vec::new()),
            update_lock: Mutex::new(()),
            terminal,
        }
    }

    /// Run `req` through the current stages and the terminal.
    ///
    /// # Errors
    ///
    /// Returns whatever error a stage or the terminal raised.
    pub fn process(&self, req: &mut FilterRequest, resp: &mut FilterResponse) -> Result<(), AaaError> {
        let snapshot = self.stages.load_full();
        Next::new(&snapshot, self.terminal.as_ref()).run(req, resp)
    }

    /// Atomically replace the stage list.
    ///
    /// Filters already live in the current list (the same instance) keep
    /// their stage and initialized state; their registration's config is
    /// not re-applied. Every other filter is initialized before the swap.
    ///
    /// # Errors
    ///
    /// If any `init` fails the update is abandoned: filters initialized by
    /// this call are released and the previous list stays live.
    #[instrument(skip_all, fields(stages = registrations.len()))]
    pub fn update_stages(&self, registrations: Vec<Registration>) -> Result<(), AaaError> {
        let _update = self.update_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.stages.load_full();

        let mut next: StageList = Vec::with_capacity(registrations.len());
        let mut fresh: StageList = Vec::new();

        for registration in registrations {
            let live = current
                .iter()
                .chain(fresh.iter())
                .find(|stage| Arc::ptr_eq(&stage.filter, &registration.filter))
                .cloned();
            if let Some(stage) = live {
                next.push(stage);
                continue;
            }

            let stage = Arc::new(Stage::new(registration));
            if let Err(e) = stage.ensure_initialized() {
                error!(target: "aaa.filters", error = %e, "Filter chain update aborted");
                for initialized in &fresh {
                    initialized.release();
                }
                record_filter_chain_update("error");
                return Err(e);
            }
            fresh.push(Arc::clone(&stage));
            next.push(stage);
        }

        let names: Vec<&str> = next.iter().map(|s| s.config.filter_name()).collect();
        info!(target: "aaa.filters", filters = ?names, "Injecting a new filter chain");

        let count = next.len();
        self.stages.store(Arc::new(next));
        record_filter_chain_update("success");
        set_filter_chain_stages(count);
        Ok(())
    }

    /// Empty the pipeline and release every registered stage.
    ///
    /// Later requests go straight to the terminal. A stage still used by a
    /// running request is released when that request finishes, so
    /// `Filter::destroy` never overlaps `Filter::process` on the same stage.
    pub fn destroy(&self) {
        let _update = self.update_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = self.stages.swap(Arc::new(Vec::new()));
        let count = previous.len();
        drop(previous);
        set_filter_chain_stages(0);
        info!(target: "aaa.filters", stages = count, "Filter chain destroyed");
    }

    #[must_use]
    pub fn stage_names(&self) -> Vec<String> {
        self.stages
            .load()
            .iter()
            .map(|s| s.config.filter_name().to_string())
            .collect()
    }

    /// Live filter registered with exactly `config`, if any.
    pub(crate) fn live_filter(&self, config: &FilterConfig) -> Option<Arc<dyn Filter>> {
        self.stages
            .load()
            .iter()
            .find(|s| &s.config == config)
            .map(|s| Arc::clone(&s.filter))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterPipeline")
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}

// src/coordinator/mod.rs
//! Column registry and view lifecycle coordination
//!
//! The coordinator owns the registered column definitions and the set of live
//! views. After every transition each live view has one attached handler
//! (once its data source exists) and one materialized element per registered
//! column id, and nothing for ids that are no longer registered.
//!
//! Host failures do not abort a transition. Every view is processed, the
//! failures are logged and returned together as [`CoordinatorError::Attachment`].

mod error;

pub use error::{AttachmentAction, AttachmentFailure, AttachmentTarget, CoordinatorError};

use crate::cache::FieldCache;
use crate::column::{ColumnDefinition, ColumnOptions};
use crate::element::ColumnElement;
use crate::handler::ColumnHandler;
use crate::host::{
    AttributeStore, FieldDeriver, HostCapabilities, HostError, Scheduler, ViewHost, ViewId,
};
use crate::refresh::RefreshDebouncer;
use column_template::config::RuntimeConfig;
use column_template::logging::codes;
use column_template::template::ParseNode;
use column_template::{log_debug, log_error, log_success, log_warning};
use error::collect;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::{Rc, Weak};

/// Host services the coordinator is constructed with
pub struct CoordinatorContext {
    pub config: RuntimeConfig,
    pub scheduler: Rc<dyn Scheduler>,
    pub deriver: Rc<dyn FieldDeriver>,
    pub attributes: Rc<dyn AttributeStore>,
}

/// Per-view bookkeeping of what the coordinator attached
struct ManagedView {
    view: Weak<dyn ViewHost>,
    handlers: BTreeSet<String>,
    elements: BTreeSet<String>,
}

/// What one attach/detach step needs besides the view itself
struct Binding<'a> {
    cache: &'a FieldCache,
    attributes: &'a dyn AttributeStore,
    capabilities: HostCapabilities,
}

pub struct ColumnCoordinator {
    config: RuntimeConfig,
    capabilities: HostCapabilities,
    attributes: Rc<dyn AttributeStore>,
    cache: FieldCache,
    /// Registration order is the element order in new views
    columns: Vec<Rc<ColumnDefinition>>,
    views: BTreeMap<ViewId, ManagedView>,
}

impl ColumnCoordinator {
    pub fn new(context: CoordinatorContext) -> Self {
        let CoordinatorContext {
            config,
            scheduler,
            deriver,
            attributes,
        } = context;

        let capabilities = HostCapabilities::from_version(&config.host_version);
        let refresh = RefreshDebouncer::new(scheduler, config.refresh_delay());
        let cache = FieldCache::new(deriver, refresh);

        log_success!(
            codes::success::SYSTEM_INITIALIZATION_COMPLETED,
            "Column coordinator initialized",
            "host_version" => &config.host_version,
            "refresh_delay_ms" => config.refresh_delay_ms
        );

        Self {
            config,
            capabilities,
            attributes,
            cache,
            columns: Vec::new(),
            views: BTreeMap::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Register or fully replace a column
    pub fn register_column(
        &mut self,
        id: &str,
        label: &str,
        tooltip: &str,
        template: ParseNode,
        options: ColumnOptions,
    ) -> Result<(), CoordinatorError> {
        let definition = ColumnDefinition::new(
            id,
            label,
            tooltip,
            template,
            options,
            self.config.max_template_depth,
        )
        .map_err(|source| {
            log_error!(source.code(), "Column template rejected", "column" => id, "error" => &source);
            CoordinatorError::Template {
                column_id: id.to_string(),
                source,
            }
        })?;

        self.register_definition(definition)
    }

    /// Register from the structured (JSON) template and options values
    pub fn register_column_json(
        &mut self,
        id: &str,
        label: &str,
        tooltip: &str,
        template: &serde_json::Value,
        options: &serde_json::Value,
    ) -> Result<(), CoordinatorError> {
        let root = ParseNode::from_json(template).map_err(|source| {
            log_error!(source.code(), "Column template rejected", "column" => id, "error" => &source);
            CoordinatorError::Template {
                column_id: id.to_string(),
                source,
            }
        })?;

        let options = if options.is_null() {
            ColumnOptions::default()
        } else {
            ColumnOptions::deserialize(options).map_err(|source| {
                log_error!(
                    codes::registry::INVALID_COLUMN,
                    "Column options rejected",
                    "column" => id,
                    "error" => &source
                );
                CoordinatorError::Options {
                    column_id: id.to_string(),
                    source,
                }
            })?
        };

        self.register_column(id, label, tooltip, root, options)
    }

    /// Register an already validated definition
    pub fn register_definition(
        &mut self,
        definition: ColumnDefinition,
    ) -> Result<(), CoordinatorError> {
        if definition.id.trim().is_empty() {
            log_error!(codes::registry::INVALID_COLUMN, "Column id must not be empty");
            return Err(CoordinatorError::InvalidColumn {
                column_id: definition.id,
                reason: "column id must not be empty".to_string(),
            });
        }

        // Patterns stay lazily compiled; broken ones are reported now, once
        let template = &definition.template;
        for err in template.take_unreported(template.precompile()) {
            log_warning!(
                err.code(),
                "Column template contains an error",
                "column" => &definition.id,
                "error" => &err
            );
        }

        let definition = Rc::new(definition);
        match self.columns.iter_mut().find(|c| c.id == definition.id) {
            Some(slot) => *slot = definition.clone(),
            None => self.columns.push(definition.clone()),
        }

        self.prune_dead_views();
        let binding = Binding {
            cache: &self.cache,
            attributes: self.attributes.as_ref(),
            capabilities: self.capabilities,
        };
        let mut failures = Vec::new();
        for managed in self.views.values_mut() {
            let Some(view) = managed.view.upgrade() else {
                continue;
            };
            managed.attach_handler(&view, &definition, &binding, &mut failures);
            managed.attach_element(&view, &definition, &binding, &mut failures);
        }

        log_success!(
            codes::success::COLUMN_REGISTERED,
            "Column registered",
            "column" => &definition.id,
            "views" => self.views.len()
        );
        collect(failures)
    }

    /// Remove a column from every live view
    ///
    /// Unknown ids are not an error; views are still swept for stale state.
    pub fn unregister_column(&mut self, id: &str) -> Result<(), CoordinatorError> {
        let known = match self.columns.iter().position(|c| c.id == id) {
            Some(index) => {
                self.columns.remove(index);
                true
            }
            None => {
                log_warning!(
                    codes::registry::UNKNOWN_COLUMN,
                    "Unregistering a column that is not registered",
                    "column" => id
                );
                false
            }
        };

        self.prune_dead_views();
        let mut failures = Vec::new();
        for managed in self.views.values_mut() {
            let Some(view) = managed.view.upgrade() else {
                continue;
            };
            managed.detach_handler(&view, id, &mut failures);
            managed.detach_element(&view, id, &mut failures);
        }

        if known {
            log_success!(codes::success::COLUMN_UNREGISTERED, "Column unregistered", "column" => id);
        }
        collect(failures)
    }

    // ------------------------------------------------------------------------
    // View lifecycle
    // ------------------------------------------------------------------------

    /// Start managing `view` and attach every registered column to it
    ///
    /// Handlers are only attached if the data source already exists;
    /// otherwise [`view_data_source_ready`](Self::view_data_source_ready)
    /// attaches them later.
    pub fn view_created(&mut self, view: &Rc<dyn ViewHost>) -> Result<(), CoordinatorError> {
        self.prune_dead_views();

        let view_id = view.id();
        let managed = self.views.entry(view_id).or_insert_with(|| ManagedView {
            view: Rc::downgrade(view),
            handlers: BTreeSet::new(),
            elements: BTreeSet::new(),
        });
        managed.view = Rc::downgrade(view);

        let binding = Binding {
            cache: &self.cache,
            attributes: self.attributes.as_ref(),
            capabilities: self.capabilities,
        };
        let mut failures = Vec::new();
        for definition in &self.columns {
            managed.attach_handler(view, definition, &binding, &mut failures);
        }
        for definition in &self.columns {
            managed.attach_element(view, definition, &binding, &mut failures);
        }

        log_success!(
            codes::success::VIEW_ATTACHED,
            "View attached",
            "view" => view_id,
            "columns" => self.columns.len(),
            "data_source_ready" => view.data_source().is_some()
        );
        collect(failures)
    }

    /// The view's data source was (re)created; attach fresh handlers to it
    pub fn view_data_source_ready(&mut self, view_id: ViewId) -> Result<(), CoordinatorError> {
        let view = match self.views.get(&view_id) {
            Some(managed) => managed.view.upgrade(),
            None => {
                log_debug!("Data source ready for an unmanaged view", "view" => view_id);
                return Ok(());
            }
        };
        let Some(view) = view else {
            self.views.remove(&view_id);
            return Ok(());
        };
        let Some(managed) = self.views.get_mut(&view_id) else {
            return Ok(());
        };

        // Handlers on the previous data source went away with it
        managed.handlers.clear();

        let binding = Binding {
            cache: &self.cache,
            attributes: self.attributes.as_ref(),
            capabilities: self.capabilities,
        };
        let mut failures = Vec::new();
        for definition in &self.columns {
            managed.attach_handler(&view, definition, &binding, &mut failures);
        }
        collect(failures)
    }

    /// Data sources changed somewhere but the host cannot say which view
    pub fn data_sources_changed(&mut self) -> Result<(), CoordinatorError> {
        let ids: Vec<ViewId> = self.views.keys().copied().collect();
        let mut failures = Vec::new();
        for view_id in ids {
            if let Err(CoordinatorError::Attachment { failures: more }) =
                self.view_data_source_ready(view_id)
            {
                failures.extend(more);
            }
        }
        collect(failures)
    }

    /// Forget a view the host is tearing down; its elements go with it
    pub fn view_destroyed(&mut self, view_id: ViewId) {
        if self.views.remove(&view_id).is_some() {
            log_debug!("View detached", "view" => view_id);
        }
        self.cache.refresh().cancel(view_id);
    }

    /// Detach everything from every live view and stop managing them
    pub fn shutdown(&mut self) -> Result<(), CoordinatorError> {
        let mut failures = Vec::new();
        for (_, mut managed) in std::mem::take(&mut self.views) {
            let Some(view) = managed.view.upgrade() else {
                continue;
            };
            let handlers: Vec<String> = managed.handlers.iter().cloned().collect();
            for id in handlers {
                managed.detach_handler(&view, &id, &mut failures);
            }
            let elements: Vec<String> = managed.elements.iter().cloned().collect();
            for id in elements {
                managed.detach_element(&view, &id, &mut failures);
            }
        }
        self.cache.refresh().cancel_all();

        log_success!(
            codes::success::SHUTDOWN_COMPLETED,
            "Column coordinator shut down",
            "failures" => failures.len()
        );
        collect(failures)
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    /// Registered ids in registration order
    pub fn registered_ids(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.id.as_str()).collect()
    }

    pub fn definition(&self, id: &str) -> Option<&Rc<ColumnDefinition>> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Managed views the host has not dropped
    pub fn live_views(&self) -> Vec<ViewId> {
        self.views
            .iter()
            .filter(|(_, managed)| managed.view.strong_count() > 0)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Column ids with a handler attached in `view_id`
    pub fn attached_columns(&self, view_id: ViewId) -> Vec<String> {
        self.views
            .get(&view_id)
            .map(|m| m.handlers.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Column ids with an element materialized in `view_id`
    pub fn materialized_columns(&self, view_id: ViewId) -> Vec<String> {
        self.views
            .get(&view_id)
            .map(|m| m.elements.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn field_cache(&self) -> &FieldCache {
        &self.cache
    }

    pub fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    fn prune_dead_views(&mut self) {
        let before = self.views.len();
        self.views.retain(|_, managed| managed.view.strong_count() > 0);
        let pruned = before - self.views.len();
        if pruned > 0 {
            log_debug!("Pruned views dropped without notice", "count" => pruned);
        }
    }
}

impl ManagedView {
    fn attach_handler(
        &mut self,
        view: &Rc<dyn ViewHost>,
        definition: &Rc<ColumnDefinition>,
        binding: &Binding<'_>,
        failures: &mut Vec<AttachmentFailure>,
    ) {
        // Without a data source there is nothing to attach to yet
        let Some(source) = view.data_source() else {
            return;
        };

        let handler = ColumnHandler::new(
            definition.clone(),
            Rc::downgrade(view),
            binding.cache.clone(),
        );
        match source.add_column_handler(&definition.id, Rc::new(handler)) {
            Ok(()) => {
                self.handlers.insert(definition.id.clone());
            }
            Err(error) => report(
                failures,
                view.id(),
                &definition.id,
                AttachmentTarget::Handler,
                AttachmentAction::Attach,
                error,
            ),
        }
    }

    fn detach_handler(
        &mut self,
        view: &Rc<dyn ViewHost>,
        column_id: &str,
        failures: &mut Vec<AttachmentFailure>,
    ) {
        if !self.handlers.remove(column_id) {
            return;
        }
        let Some(source) = view.data_source() else {
            return;
        };
        if let Err(error) = source.remove_column_handler(column_id) {
            report(
                failures,
                view.id(),
                column_id,
                AttachmentTarget::Handler,
                AttachmentAction::Detach,
                error,
            );
        }
    }

    /// Replaces any element this view already has for the column
    fn attach_element(
        &mut self,
        view: &Rc<dyn ViewHost>,
        definition: &Rc<ColumnDefinition>,
        binding: &Binding<'_>,
        failures: &mut Vec<AttachmentFailure>,
    ) {
        if !self.detach_element(view, &definition.id, failures) {
            return;
        }

        let element = ColumnElement::materialize(
            definition,
            &view.document_url(),
            binding.attributes,
            binding.capabilities,
        );
        match view.append_column_element(element) {
            Ok(()) => {
                self.elements.insert(definition.id.clone());
            }
            Err(error) => report(
                failures,
                view.id(),
                &definition.id,
                AttachmentTarget::Element,
                AttachmentAction::Attach,
                error,
            ),
        }
    }

    /// Returns false if the host failed to remove an existing element
    fn detach_element(
        &mut self,
        view: &Rc<dyn ViewHost>,
        column_id: &str,
        failures: &mut Vec<AttachmentFailure>,
    ) -> bool {
        if !self.elements.remove(column_id) {
            return true;
        }
        match view.remove_column_element(column_id) {
            Ok(true) => true,
            Ok(false) => {
                log_debug!("Column element already gone", "column" => column_id, "view" => view.id());
                true
            }
            Err(error) => {
                report(
                    failures,
                    view.id(),
                    column_id,
                    AttachmentTarget::Element,
                    AttachmentAction::Detach,
                    error,
                );
                false
            }
        }
    }
}

fn report(
    failures: &mut Vec<AttachmentFailure>,
    view_id: ViewId,
    column_id: &str,
    target: AttachmentTarget,
    action: AttachmentAction,
    error: HostError,
) {
    let failure = AttachmentFailure {
        column_id: column_id.to_string(),
        view_id,
        target,
        action,
        error,
    };
    log_error!(
        failure.code(),
        "Host operation failed",
        "column" => column_id,
        "view" => view_id,
        "error" => &failure.error
    );
    failures.push(failure);
}

#[cfg(test)]
mod tests;

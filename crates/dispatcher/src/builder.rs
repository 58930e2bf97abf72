//! DispatcherBuilder - installs built-in handlers from a FormBlueprint

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, instrument};

use contracts::{
    FieldHandlerKind, FieldRouteConfig, FileHandlerKind, FileRouteConfig, FormBlueprint,
    FormParser, HandlerError, MultipartConfig, Part,
};

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::handlers::{DiskHandler, LogHandler};
use crate::registry::HandlerRegistry;

/// Field values captured by `collect` routes, in arrival order
#[derive(Debug, Clone, Default)]
pub struct FieldCollector {
    entries: Arc<Mutex<Vec<(String, String)>>>,
}

impl FieldCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a key/value pair
    pub fn push(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((key.to_string(), value.to_string()));
    }

    /// Copy of the captured pairs
    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of captured pairs
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing was captured
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builder for a [`Dispatcher`] wired from configuration
pub struct DispatcherBuilder {
    config: MultipartConfig,
    registry: HandlerRegistry,
    collector: FieldCollector,
}

impl DispatcherBuilder {
    /// Create a builder with no routes
    pub fn new(config: MultipartConfig) -> Self {
        Self {
            config,
            registry: HandlerRegistry::new(),
            collector: FieldCollector::new(),
        }
    }

    /// Create a builder with every route of `blueprint` installed
    ///
    /// # Errors
    /// Returns `HandlerCreation` if a disk handler cannot create its directory
    #[instrument(
        name = "dispatcher_builder_from_blueprint",
        skip(blueprint),
        fields(files = blueprint.files.len(), fields = blueprint.fields.len())
    )]
    pub fn from_blueprint(blueprint: &FormBlueprint) -> Result<Self, DispatchError> {
        let mut builder = Self::new(blueprint.limits.clone());
        for route in &blueprint.files {
            builder.install_file_route(route)?;
        }
        for route in &blueprint.fields {
            builder.install_field_route(route);
        }
        info!(
            files = blueprint.files.len(),
            fields = blueprint.fields.len(),
            "Blueprint routes installed"
        );
        Ok(builder)
    }

    fn install_file_route(&mut self, route: &FileRouteConfig) -> Result<(), DispatchError> {
        debug!(name = %route.name, handler = ?route.handler, "Installing file route");
        match route.handler {
            FileHandlerKind::Log => {
                self.registry
                    .on_file_handler(&route.name, LogHandler::new(&route.name));
            }
            FileHandlerKind::Disk => {
                let handler = DiskHandler::from_params(&route.name, &route.params)
                    .map_err(|e| DispatchError::handler_creation(&route.name, e.to_string()))?;
                self.registry.on_file_handler(&route.name, handler);
            }
            FileHandlerKind::Discard => {
                self.registry.on_file(&route.name, discard);
            }
        }
        Ok(())
    }

    fn install_field_route(&mut self, route: &FieldRouteConfig) {
        debug!(name = %route.name, handler = ?route.handler, "Installing field route");
        match route.handler {
            FieldHandlerKind::Log => {
                self.registry.on_field(&route.name, |key, value| {
                    info!(key, len = value.len(), "Field received");
                    Ok(())
                });
            }
            FieldHandlerKind::Collect => {
                let collector = self.collector.clone();
                self.registry.on_field(&route.name, move |key, value| {
                    collector.push(key, value);
                    Ok(())
                });
            }
        }
    }

    /// Registry for adding handlers beyond the blueprint
    pub fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    /// Collector shared by every `collect` route
    pub fn collector(&self) -> FieldCollector {
        self.collector.clone()
    }

    /// Create the dispatcher over `source`
    pub fn build<P: FormParser>(self, source: P::Source) -> Dispatcher<P> {
        Dispatcher::with_registry(source, self.config, self.registry)
    }
}

async fn discard(part: Part) -> Result<(), HandlerError> {
    part.drain().await?;
    Ok(())
}

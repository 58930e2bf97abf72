//! HandlerRegistry - name to handler mappings for files and fields

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use contracts::{HandlerError, Part, PartHandler};

use crate::name::handler_name;

/// Reserved name of the catch-all handler
pub const WILDCARD: &str = "*";

/// Type-erased file part handler
pub type FileHandler =
    Arc<dyn Fn(Part) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// Type-erased field handler, called with the raw key and the value
pub type FieldHandler = Arc<dyn Fn(&str, &str) -> Result<(), HandlerError> + Send + Sync>;

/// A registered handler and the name it was registered under
#[derive(Clone)]
pub struct Route<H> {
    key: String,
    handler: H,
}

impl<H> Route<H> {
    /// Registration name (`"*"` for the wildcard)
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Handler
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Whether this is the wildcard route
    pub fn is_wildcard(&self) -> bool {
        self.key == WILDCARD
    }
}

/// File and field handlers keyed by name
///
/// The last registration for a name wins.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    files: HashMap<String, Route<FileHandler>>,
    fields: HashMap<String, Route<FieldHandler>>,
    has_handlers: bool,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the file handler for `name`
    pub fn on_file<F, Fut>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(Part) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let handler: FileHandler = Arc::new(move |part| handler(part).boxed());
        self.insert_file(name.into(), handler)
    }

    /// Register a [`PartHandler`] implementation for `name`
    pub fn on_file_handler<H>(&mut self, name: impl Into<String>, handler: H) -> &mut Self
    where
        H: PartHandler + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        self.on_file(name, move |part| {
            let handler = Arc::clone(&handler);
            async move { handler.handle(part).await }
        })
    }

    /// Register the field handler for `name`
    pub fn on_field<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&str, &str) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let key = name.into();
        self.has_handlers = true;
        self.fields.insert(
            key.clone(),
            Route {
                key,
                handler: Arc::new(handler),
            },
        );
        self
    }

    fn insert_file(&mut self, key: String, handler: FileHandler) -> &mut Self {
        self.has_handlers = true;
        self.files.insert(key.clone(), Route { key, handler });
        self
    }

    /// Whether any handler was ever registered
    pub fn has_handlers(&self) -> bool {
        self.has_handlers
    }

    /// Handler for a raw part name: exact match on the normalized name, else wildcard
    pub fn resolve_file_handler(&self, name: &str) -> Option<&Route<FileHandler>> {
        let normalized = handler_name(name);
        self.files
            .get(normalized.as_ref())
            .or_else(|| self.files.get(WILDCARD))
    }

    /// Handler for a field key: exact match, else wildcard
    pub fn resolve_field_handler(&self, key: &str) -> Option<&Route<FieldHandler>> {
        self.fields.get(key).or_else(|| self.fields.get(WILDCARD))
    }

    /// Registered file handler names
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Registered field handler names
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("files", &self.files.keys().collect::<Vec<_>>())
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

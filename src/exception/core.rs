use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::ConfigError;
use crate::request::Request;

/// A node in the failure-category tree.
///
/// Declare categories as `static` items so parents can be referenced:
///
/// ```rust
/// use brrtrouter_mvc::exception::{categories, Category};
///
/// static QUOTA_EXCEEDED: Category = Category::child("QuotaExceeded", &categories::RUNTIME);
/// assert!(QUOTA_EXCEEDED.is_a(&categories::EXCEPTION));
/// ```
///
/// A category is identified by its address, not its name: declare each one
/// as a `static`, never a `const`. Two categories may share a display name.
#[derive(Debug)]
pub struct Category {
    name: &'static str,
    parent: Option<&'static Category>,
}

impl Category {
    #[must_use]
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    #[must_use]
    pub const fn child(name: &'static str, parent: &'static Category) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn parent(&self) -> Option<&'static Category> {
        self.parent
    }

    /// True when `self` equals `other` or descends from it.
    #[must_use]
    pub fn is_a(&self, other: &Category) -> bool {
        if self == other {
            return true;
        }
        let mut cursor = self.parent;
        while let Some(c) = cursor {
            if c == other {
                return true;
            }
            cursor = c.parent;
        }
        false
    }
}

impl PartialEq for Category {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for Category {}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Built-in categories.
pub mod categories {
    use super::Category;

    pub static EXCEPTION: Category = Category::root("Exception");
    pub static RUNTIME: Category = Category::child("RuntimeException", &EXCEPTION);
    /// Raised when a method body reads an argument as the wrong type.
    pub static ILLEGAL_ARGUMENT: Category =
        Category::child("IllegalArgumentException", &RUNTIME);
    pub static IO: Category = Category::child("IOException", &EXCEPTION);
    pub static FILE_NOT_FOUND: Category = Category::child("FileNotFoundException", &IO);
}

/// A categorised failure raised by a handler, interceptor or call-time fetcher.
#[derive(Clone)]
pub struct Thrown {
    category: &'static Category,
    message: String,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Thrown {
    pub fn new(category: &'static Category, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an error value, keeping it reachable through [`std::error::Error::source`].
    pub fn from_error<E>(category: &'static Category, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            category,
            message: error.to_string(),
            source: Some(Arc::new(error)),
        }
    }

    #[must_use]
    pub fn category(&self) -> &'static Category {
        self.category
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn is(&self, category: &Category) -> bool {
        self.category.is_a(category)
    }

    /// Downcast the wrapped source error, if any.
    #[must_use]
    pub fn source_as<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_deref()?.downcast_ref::<E>()
    }
}

impl fmt::Debug for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thrown")
            .field("category", &self.category.name)
            .field("message", &self.message)
            .finish()
    }
}

impl fmt::Display for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category.name, self.message)
    }
}

impl std::error::Error for Thrown {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Deals with a failure of a registered category.
///
/// Returns `true` when the failure was handled. Returning `false` lets the
/// failure propagate as unhandled.
pub trait ExceptionHandler: Send + Sync {
    fn handle(&self, thrown: &Thrown, request: &dyn Request) -> bool;
}

impl<F> ExceptionHandler for F
where
    F: Fn(&Thrown, &dyn Request) -> bool + Send + Sync,
{
    fn handle(&self, thrown: &Thrown, request: &dyn Request) -> bool {
        self(thrown, request)
    }
}

struct Entry {
    category: &'static Category,
    handler: Arc<dyn ExceptionHandler>,
}

/// Ordered registry of exception handlers.
#[derive(Default)]
pub struct ExceptionDispatcher {
    entries: Vec<Entry>,
}

impl ExceptionDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for `category`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnreachableHandler`] when an earlier entry's category is
    /// `category` or one of its ancestors.
    pub fn register<H>(&mut self, category: &'static Category, handler: H) -> Result<(), ConfigError>
    where
        H: ExceptionHandler + 'static,
    {
        self.register_arc(category, Arc::new(handler))
    }

    /// Same as [`register`](Self::register) for an already shared handler.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    pub fn register_arc(
        &mut self,
        category: &'static Category,
        handler: Arc<dyn ExceptionHandler>,
    ) -> Result<(), ConfigError> {
        if let Some(existing) = self.entries.iter().find(|e| category.is_a(e.category)) {
            return Err(ConfigError::UnreachableHandler {
                category: category.name,
                shadowed_by: existing.category.name,
            });
        }
        info!(
            category = category.name,
            position = self.entries.len(),
            "Exception handler registered"
        );
        self.entries.push(Entry { category, handler });
        Ok(())
    }

    /// First registered handler whose category covers `category`.
    #[must_use]
    pub fn handler_for(&self, category: &Category) -> Option<&Arc<dyn ExceptionHandler>> {
        self.entries
            .iter()
            .find(|e| category.is_a(e.category))
            .map(|e| &e.handler)
    }

    /// Offer `thrown` to its handler. Returns whether it was handled.
    pub fn dispatch(&self, thrown: &Thrown, request: &dyn Request) -> bool {
        match self.entries.iter().find(|e| thrown.category.is_a(e.category)) {
            Some(entry) => {
                let handled = entry.handler.handle(thrown, request);
                debug!(
                    category = thrown.category.name,
                    handler_category = entry.category.name,
                    handled,
                    "Exception dispatched"
                );
                handled
            }
            None => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered categories in lookup order.
    pub fn categories(&self) -> impl Iterator<Item = &'static Category> + '_ {
        self.entries.iter().map(|e| e.category)
    }
}

impl fmt::Debug for ExceptionDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.category.name))
            .finish()
    }
}

//! The language registry.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use thiserror::Error;

use super::LanguageHandler;

/// Errors raised while building a registry.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("language '{0}' registered twice")]
    DuplicateLanguage(String),
    #[error("extension '{extension}' claimed by both '{first}' and '{second}'")]
    DuplicateExtension {
        extension: String,
        first: String,
        second: String,
    },
}

/// Immutable mapping from language id and file extension to handler.
///
/// Lookups hand out the same `Arc` every time, so two lookups of the same
/// id are pointer-identical.
pub struct LanguageRegistry {
    handlers: Vec<Arc<dyn LanguageHandler>>,
    by_id: HashMap<&'static str, usize>,
    by_extension: HashMap<String, usize>,
}

impl LanguageRegistry {
    pub fn builder() -> LanguageRegistryBuilder {
        LanguageRegistryBuilder::default()
    }

    /// A registry with every language compiled into this build.
    pub fn builtin() -> Self {
        let builder = Self::builder();
        #[cfg(feature = "tree-sitter")]
        let builder = builder
            .register(super::java::JavaHandler::new())
            .register(super::python::PythonHandler::new());

        // Built-in languages have distinct ids and extensions.
        builder.build().unwrap_or_else(|_| Self::empty())
    }

    fn empty() -> Self {
        Self {
            handlers: Vec::new(),
            by_id: HashMap::new(),
            by_extension: HashMap::new(),
        }
    }

    pub fn lookup(&self, language_id: &str) -> Option<&Arc<dyn LanguageHandler>> {
        self.by_id.get(language_id).map(|&i| &self.handlers[i])
    }

    /// Handler for a file extension (without the dot, any case).
    pub fn for_extension(&self, ext: &str) -> Option<&Arc<dyn LanguageHandler>> {
        self.by_extension
            .get(&ext.to_ascii_lowercase())
            .map(|&i| &self.handlers[i])
    }

    /// Registered language ids, in registration order.
    pub fn language_ids(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.language_id()).collect()
    }

    pub fn handlers(&self) -> impl Iterator<Item = &Arc<dyn LanguageHandler>> {
        self.handlers.iter()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Collects handlers for a [`LanguageRegistry`].
#[derive(Default)]
pub struct LanguageRegistryBuilder {
    handlers: Vec<Arc<dyn LanguageHandler>>,
}

impl LanguageRegistryBuilder {
    pub fn register(mut self, handler: impl LanguageHandler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn register_shared(mut self, handler: Arc<dyn LanguageHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Freeze the registry. Ids and extensions must be unique.
    pub fn build(self) -> Result<LanguageRegistry, RegistryError> {
        let mut by_id = HashMap::new();
        let mut by_extension: HashMap<String, usize> = HashMap::new();

        for (i, handler) in self.handlers.iter().enumerate() {
            let id = handler.language_id();
            if by_id.insert(id, i).is_some() {
                return Err(RegistryError::DuplicateLanguage(id.to_string()));
            }
            for ext in handler.file_extensions() {
                let ext = ext.to_ascii_lowercase();
                if let Some(&first) = by_extension.get(&ext) {
                    return Err(RegistryError::DuplicateExtension {
                        extension: ext,
                        first: self.handlers[first].language_id().to_string(),
                        second: id.to_string(),
                    });
                }
                by_extension.insert(ext, i);
            }
        }

        Ok(LanguageRegistry {
            handlers: self.handlers,
            by_id,
            by_extension,
        })
    }
}

/// Static storage for the process-wide registry.
static REGISTRY: OnceCell<LanguageRegistry> = OnceCell::new();

/// The process-wide registry of built-in languages.
///
/// Built on first use and read-only afterwards.
pub fn registry() -> &'static LanguageRegistry {
    REGISTRY.get_or_init(|| {
        let registry = LanguageRegistry::builtin();
        tracing::debug!(languages = ?registry.language_ids(), "language registry initialized");
        registry
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ParseError, Parser};
    use crate::metrics::{MetricsProvider, StaticMetrics};
    use crate::query::{AttributeProvider, NoAttributes};

    struct Fake(&'static str, &'static [&'static str]);

    impl LanguageHandler for Fake {
        fn language_id(&self) -> &'static str {
            self.0
        }
        fn display_name(&self) -> &'static str {
            "Fake"
        }
        fn file_extensions(&self) -> &'static [&'static str] {
            self.1
        }
        fn parser(&self) -> Result<Box<dyn Parser>, ParseError> {
            Err(ParseError::Language("fake".to_string()))
        }
        fn attributes(&self) -> &dyn AttributeProvider {
            &NoAttributes
        }
        fn metrics(&self) -> &dyn MetricsProvider {
            &StaticMetrics(&[])
        }
    }

    #[test]
    fn test_lookup_by_id_and_extension() {
        let registry = LanguageRegistry::builder()
            .register(Fake("one", &["a", "B"]))
            .register(Fake("two", &["c"]))
            .build()
            .unwrap();

        assert_eq!(registry.language_ids(), vec!["one", "two"]);
        assert_eq!(registry.lookup("two").map(|h| h.language_id()), Some("two"));
        assert_eq!(registry.for_extension("b").map(|h| h.language_id()), Some("one"));
        assert!(registry.lookup("three").is_none());
        assert!(Arc::ptr_eq(
            registry.lookup("one").unwrap(),
            registry.for_extension("a").unwrap()
        ));
    }

    #[test]
    fn test_duplicates_rejected() {
        let dup_id = LanguageRegistry::builder()
            .register(Fake("one", &["a"]))
            .register(Fake("one", &["b"]))
            .build();
        assert_eq!(dup_id.err(), Some(RegistryError::DuplicateLanguage("one".into())));

        let dup_ext = LanguageRegistry::builder()
            .register(Fake("one", &["a"]))
            .register(Fake("two", &["A"]))
            .build();
        assert!(matches!(dup_ext, Err(RegistryError::DuplicateExtension { .. })));
    }
}

//! Port contracts for inbox filtering.

use std::collections::HashMap;

/// Metadata describing a user-defined custom attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomAttributeDefinition {
    /// Attribute definition identifier.
    pub id: i64,
    /// Stripped attribute key (no `ca_` prefix).
    pub key: String,
}

/// Resolves stripped `ca_` keys to attribute definitions.
///
/// The planner caches lookups per instance so repeated conditions on the
/// same attribute never reload metadata within one request.
pub trait CustomAttributeCatalog: Send + Sync {
    /// Returns the definition for a stripped key, if one exists.
    fn definition(&self, key: &str) -> Option<CustomAttributeDefinition>;
}

/// Catalog over a fixed set of definitions, for deployments that load
/// attribute metadata up front (and for tests).
#[derive(Debug, Clone, Default)]
pub struct StaticCustomAttributeCatalog {
    definitions: HashMap<String, CustomAttributeDefinition>,
}

impl StaticCustomAttributeCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition, keyed by its stripped key.
    #[must_use]
    pub fn with_definition(mut self, definition: CustomAttributeDefinition) -> Self {
        self.definitions.insert(definition.key.clone(), definition);
        self
    }
}

impl CustomAttributeCatalog for StaticCustomAttributeCatalog {
    fn definition(&self, key: &str) -> Option<CustomAttributeDefinition> {
        self.definitions.get(key).cloned()
    }
}

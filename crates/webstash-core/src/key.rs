use crate::error::{Result, StoreError};

/// A user key, optionally scoped to a namespace.
///
/// Namespaces are passed explicitly rather than inferred from argument
/// count, so `("app", "theme")` and `"theme"` can never be confused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryKey<'a> {
    pub namespace: Option<&'a str>,
    pub key: &'a str,
}

impl<'a> EntryKey<'a> {
    /// A key with no namespace.
    pub fn new(key: &'a str) -> Self {
        Self { namespace: None, key }
    }

    /// A key inside `namespace`.
    pub fn namespaced(namespace: &'a str, key: &'a str) -> Self {
        Self { namespace: Some(namespace), key }
    }

    /// The namespace, treating an empty string as absent.
    pub fn scope(&self) -> Option<&'a str> {
        self.namespace.filter(|ns| !ns.is_empty())
    }

    /// Fails with [`StoreError::KeyFormat`] if the raw key contains `separator`.
    pub fn validate(&self, separator: char) -> Result<()> {
        if self.key.contains(separator) {
            return Err(StoreError::KeyFormat {
                key: self.key.to_string(),
                separator,
            });
        }
        Ok(())
    }

    /// The key as stored in the backend: `<namespace><separator><key>`, or
    /// just `<key>` without a namespace.
    pub fn composite(&self, separator: char) -> String {
        match self.scope() {
            Some(ns) => format!("{ns}{separator}{}", self.key),
            None => self.key.to_string(),
        }
    }
}

impl<'a> From<&'a str> for EntryKey<'a> {
    fn from(key: &'a str) -> Self {
        Self::new(key)
    }
}

impl<'a> From<(&'a str, &'a str)> for EntryKey<'a> {
    fn from((namespace, key): (&'a str, &'a str)) -> Self {
        Self::namespaced(namespace, key)
    }
}

/// Prefix shared by every composite key in `namespace`.
///
/// Includes the trailing separator so `foo` never matches `foobar:x`.
pub fn namespace_prefix(namespace: &str, separator: char) -> String {
    format!("{namespace}{separator}")
}

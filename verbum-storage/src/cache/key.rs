//! Cache keys derived from resource identity.
//!
//! A `CacheKey` can only be built from a [`ResourceKey`], optionally
//! narrowed by a derivative name (e.g. a parsed range). Raw bytes and every
//! derivative of the same resource therefore share one key prefix.

use std::fmt;
use verbum_core::ResourceKey;

/// Separator between the resource part and the derivative part.
const DERIVATIVE_SEPARATOR: char = '#';

/// Key under which one cached payload is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Private inner data - cannot be constructed externally
    inner: CacheKeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKeyInner {
    resource: ResourceKey,
    derivative: Option<String>,
    encoded: String,
}

impl CacheKey {
    /// Key for the raw document bytes of a resource.
    pub fn raw(resource: &ResourceKey) -> Self {
        Self::build(resource.clone(), None)
    }

    /// Key for a value computed from a resource, such as
    /// `scripture:3:16:vn`.
    pub fn derived(resource: &ResourceKey, derivative: impl Into<String>) -> Self {
        Self::build(resource.clone(), Some(derivative.into()))
    }

    fn build(resource: ResourceKey, derivative: Option<String>) -> Self {
        let mut encoded = resource.cache_key();
        if let Some(name) = &derivative {
            encoded.push(DERIVATIVE_SEPARATOR);
            encoded.push_str(name);
        }
        Self {
            inner: CacheKeyInner {
                resource,
                derivative,
                encoded,
            },
        }
    }

    pub fn resource(&self) -> &ResourceKey {
        &self.inner.resource
    }

    pub fn derivative(&self) -> Option<&str> {
        self.inner.derivative.as_deref()
    }

    pub fn is_raw(&self) -> bool {
        self.inner.derivative.is_none()
    }

    /// Stable string form, used as the on-disk key.
    pub fn as_str(&self) -> &str {
        &self.inner.encoded
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.inner.encoded.as_bytes()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.encoded)
    }
}

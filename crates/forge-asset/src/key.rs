//! Static asset identity
//!
//! Every asset type declares an [`AssetKey`] at compile time. The key is the
//! cache key inside a store and the entry name inside the persisted state file,
//! so it must never change once released.

use std::fmt::{self, Display, Formatter};

use serde::{Serialize, Serializer};

/// Stable identity of an asset type
///
/// A key is a dotted `kind` (`"installconfig.InstallConfig"`) optionally
/// parameterised by a `variant` for generic assets that are instantiated once
/// per profile (`"tls.SignerCertKey"` / `"etcd-signer"`).
///
/// # Invariants
/// - Unique across a registry
/// - Stable across releases (it is written to the state file)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetKey {
    kind: &'static str,
    variant: Option<&'static str>,
}

impl AssetKey {
    /// Key for a non-parameterised asset type
    #[inline]
    #[must_use]
    pub const fn new(kind: &'static str) -> Self {
        Self {
            kind,
            variant: None,
        }
    }

    /// Key for one variant of a parameterised asset type
    #[inline]
    #[must_use]
    pub const fn with_variant(kind: &'static str, variant: &'static str) -> Self {
        Self {
            kind,
            variant: Some(variant),
        }
    }

    /// Asset kind
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    /// Variant, if the asset type is parameterised
    #[inline]
    #[must_use]
    pub const fn variant(&self) -> Option<&'static str> {
        self.variant
    }

    /// String form used in the persisted state file
    #[must_use]
    pub fn state_key(&self) -> String {
        self.to_string()
    }
}

impl Display for AssetKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.variant {
            Some(variant) => write!(f, "{}/{}", self.kind, variant),
            None => f.write_str(self.kind),
        }
    }
}

impl Serialize for AssetKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Render a resolution path as `a -> b -> c`
#[must_use]
pub fn display_path(path: &[AssetKey]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

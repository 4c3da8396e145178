//! Typed identifier wrappers for stored files and conversion records.
//!
//! Path hashes and content hashes are both hex digests, so newtypes keep a
//! path hash from being passed where a content hash is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generate a newtype wrapper over a hex digest string.
macro_rules! hash_id {
    ($($(#[doc = $doc:expr])* $name:ident),+ $(,)?) => {
        $(
            $(#[doc = $doc])*
            #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(String);

            impl $name {
                /// Wrap an existing digest.
                #[must_use]
                pub fn new(digest: impl Into<String>) -> Self {
                    Self(digest.into())
                }

                /// Return the digest as a string slice.
                #[must_use]
                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<String> for $name {
                fn from(digest: String) -> Self {
                    Self(digest)
                }
            }

            impl From<&str> for $name {
                fn from(digest: &str) -> Self {
                    Self(digest.to_string())
                }
            }

            impl AsRef<str> for $name {
                fn as_ref(&self) -> &str {
                    &self.0
                }
            }
        )+
    };
}

hash_id! {
    /// Digest of a file's storage location. Unique per stored instance.
    PathHash,
    /// Digest of a file's bytes. Shared by every copy of the same content.
    ContentHash,
}

/// Row identifier of a conversion record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversionId(i64);

impl ConversionId {
    /// Return the raw row id.
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for ConversionId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConversionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//! Trait definition for native configuration parsers.

use crate::common::CanonicalConfig;
use crate::Result;

#[cfg(test)]
use mockall::automock;

/// Maps one tool's native configuration document into a [`CanonicalConfig`].
///
/// This is the only place schema knowledge about a specific tool lives.
/// Parsers are pure: they receive the document text and never touch disk.
#[cfg_attr(test, automock)]
pub trait NativeParser: Send + Sync {
    /// Tool identifier (e.g., "meltano", "canonizer")
    fn tool(&self) -> &str;

    /// Parse the raw document text.
    fn parse(&self, document: &str) -> Result<CanonicalConfig>;
}

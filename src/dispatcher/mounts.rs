use std::sync::Arc;

use tracing::info;

use crate::controller::{select, Candidate, HandlerRegistry};
use crate::error::ConfigError;
use crate::request::{PathInfo, Request};

/// Handler registries served below one path prefix.
#[derive(Debug)]
struct Mount {
    prefix: String,
    registries: Vec<Arc<HandlerRegistry>>,
}

/// Registries grouped by path prefix, longest prefix first.
///
/// A request is served by the longest prefix it lies below; shorter prefixes
/// are never tried as a fallback. Registries on the same prefix compete in
/// the order they were mounted.
#[derive(Debug, Default)]
pub struct MountTable {
    mounts: Vec<Mount>,
}

impl MountTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `registry` below `prefix` (`""` for the root).
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidMount`] unless `prefix` is empty or starts with
    /// `/` and does not end with `/`.
    pub fn mount(&mut self, prefix: &str, registry: &Arc<HandlerRegistry>) -> Result<(), ConfigError> {
        Self::check_prefix(prefix)?;
        info!(prefix, handler = registry.name(), "Handler class mounted");
        if let Some(mount) = self.mounts.iter_mut().find(|m| m.prefix == prefix) {
            mount.registries.push(Arc::clone(registry));
            return Ok(());
        }
        let at = self
            .mounts
            .partition_point(|m| m.prefix.len() >= prefix.len());
        self.mounts.insert(
            at,
            Mount {
                prefix: prefix.to_string(),
                registries: vec![Arc::clone(registry)],
            },
        );
        Ok(())
    }

    /// Validate a prefix without mounting anything.
    ///
    /// # Errors
    ///
    /// See [`mount`](Self::mount).
    pub fn check_prefix(prefix: &str) -> Result<(), ConfigError> {
        if !prefix.is_empty() && (!prefix.starts_with('/') || prefix.ends_with('/')) {
            return Err(ConfigError::InvalidMount {
                prefix: prefix.to_string(),
            });
        }
        Ok(())
    }

    /// The longest mount `request` lies below, with its registries and the
    /// mount-relative view of the request.
    pub fn resolve<'r>(
        &self,
        request: &'r dyn Request,
        strip_session_ids: bool,
    ) -> Option<(&str, &[Arc<HandlerRegistry>], PathInfo<'r>)> {
        self.mounts.iter().find_map(|m| {
            PathInfo::below(request, &m.prefix, strip_session_ids)
                .map(|info| (m.prefix.as_str(), m.registries.as_slice(), info))
        })
    }

    /// The mount prefix and best candidate for `request`.
    #[must_use]
    pub fn select(
        &self,
        request: &dyn Request,
        strip_session_ids: bool,
    ) -> Option<(&str, Candidate<'_>)> {
        let (prefix, registries, info) = self.resolve(request, strip_session_ids)?;
        let candidate = select(registries.iter().map(Arc::as_ref), &info)?;
        Some((prefix, candidate))
    }

    /// Prefixes, longest first.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> + '_ {
        self.mounts.iter().map(|m| m.prefix.as_str())
    }

    /// Registries mounted below exactly `prefix`.
    #[must_use]
    pub fn registries(&self, prefix: &str) -> &[Arc<HandlerRegistry>] {
        self.mounts
            .iter()
            .find(|m| m.prefix == prefix)
            .map_or(&[][..], |m| m.registries.as_slice())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }
}

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::convert::ConversionService;
use crate::error::ConfigError;
use crate::intercept::InterceptorFactory;
use crate::request::Request;
use crate::scope::ScopeFrame;
use crate::value::TypeKey;

use super::descriptor::HandlerClass;
use super::invocation::{Invocation, MatchResult};

/// The compiled invocations of one handler class.
pub struct HandlerRegistry {
    key: TypeKey,
    name: String,
    invocations: Vec<Arc<Invocation>>,
}

impl HandlerRegistry {
    /// Compile every method of `class`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateMethod`] or the first error raised while
    /// compiling a method.
    pub fn build(
        class: HandlerClass,
        conversions: &dyn ConversionService,
        interceptor_factory: &dyn InterceptorFactory,
    ) -> Result<Self, ConfigError> {
        let (key, name, markers, methods) = class.into_parts();
        let mut seen = HashSet::with_capacity(methods.len());
        let mut invocations = Vec::with_capacity(methods.len());

        for def in methods {
            if !seen.insert(def.name().to_string()) {
                return Err(ConfigError::DuplicateMethod {
                    handler: name,
                    method: def.name().to_string(),
                });
            }
            let invocation = Invocation::build(
                key,
                &name,
                markers.as_deref(),
                def,
                conversions,
                interceptor_factory,
            )?;
            invocations.push(Arc::new(invocation));
        }

        info!(
            handler = %name,
            methods = invocations.len(),
            routable = invocations.iter().filter(|i| i.is_routable()).count(),
            "Handler class registered"
        );

        Ok(Self {
            key,
            name,
            invocations,
        })
    }

    #[must_use]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn invocations(&self) -> &[Arc<Invocation>] {
        &self.invocations
    }

    /// The method named `method`, for reentrant calls.
    #[must_use]
    pub fn invocation(&self, method: &str) -> Option<&Arc<Invocation>> {
        self.invocations.iter().find(|i| i.method_name() == method)
    }

    /// The best invocation of this class for `request`.
    #[must_use]
    pub fn best_invocation(&self, request: &dyn Request) -> Option<Candidate<'_>> {
        select(std::iter::once(self), request)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("name", &self.name)
            .field("invocations", &self.invocations)
            .finish()
    }
}

/// One invocation matched against one request.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    registry: &'a HandlerRegistry,
    invocation: &'a Arc<Invocation>,
    matched: MatchResult,
}

impl<'a> Candidate<'a> {
    /// Fewer captured groups wins; on equal groups, higher confidence wins.
    #[must_use]
    pub fn is_better_than(&self, other: &Candidate<'_>) -> bool {
        let (mine, theirs) = (self.matched.group_count(), other.matched.group_count());
        if mine != theirs {
            return mine < theirs;
        }
        self.matched.confidence() > other.matched.confidence()
    }

    #[must_use]
    pub fn registry(&self) -> &'a HandlerRegistry {
        self.registry
    }

    #[must_use]
    pub fn invocation(&self) -> &'a Arc<Invocation> {
        self.invocation
    }

    #[must_use]
    pub fn matched(&self) -> &MatchResult {
        &self.matched
    }

    /// Path variables bound by the match.
    #[must_use]
    pub fn frame(&self) -> ScopeFrame {
        self.invocation.frame_for(&self.matched)
    }
}

/// The single best candidate across `registries`, in registration order.
///
/// A later candidate replaces the current best only when strictly better, so
/// the first-registered candidate wins a complete tie.
pub fn select<'a, I>(registries: I, request: &dyn Request) -> Option<Candidate<'a>>
where
    I: IntoIterator<Item = &'a HandlerRegistry>,
{
    let mut best: Option<Candidate<'a>> = None;
    for registry in registries {
        for invocation in &registry.invocations {
            let Some(matched) = invocation.can_serve(request) else {
                continue;
            };
            let candidate = Candidate {
                registry,
                invocation,
                matched,
            };
            trace!(
                handler = %registry.name,
                method = invocation.method_name(),
                groups = candidate.matched.group_count(),
                confidence = candidate.matched.confidence(),
                "Candidate"
            );
            best = match best {
                Some(current) if !candidate.is_better_than(&current) => Some(current),
                _ => Some(candidate),
            };
        }
    }
    if let Some(c) = &best {
        debug!(
            request_id = %request.request_id(),
            path = request.path(),
            handler = %c.registry.name,
            method = c.invocation.method_name(),
            "Invocation selected"
        );
    }
    best
}

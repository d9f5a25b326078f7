use std::borrow::Cow;
use std::fmt;

use tracing::debug;

use crate::convert::ConversionService;
use crate::error::{CallError, ConfigError};
use crate::fetchers::{
    fetcher_for, ArgumentFetcher, CalltimeFetcher, FetchContext, ParamInfo, ParamSpec, Site,
};
use crate::intercept::{collect_interceptors, InterceptorFactory, InterceptorId, TypeMarkers};
use crate::request::Request;
use crate::router::{MatchConstraints, RequestMapping, RouteCaptures, RoutePattern};
use crate::scope::ScopeFrame;
use crate::value::TypeKey;

use super::args::Args;
use super::descriptor::{MethodBody, MethodDef};

/// A successful structural match of one invocation against one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pattern: usize,
    captures: RouteCaptures,
    confidence: u32,
}

impl MatchResult {
    /// Index of the template that matched, in declaration order.
    #[must_use]
    pub fn pattern_index(&self) -> usize {
        self.pattern
    }

    #[must_use]
    pub fn captures(&self) -> &RouteCaptures {
        &self.captures
    }

    /// Number of captured path variables.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.captures.len()
    }

    #[must_use]
    pub fn confidence(&self) -> u32 {
        self.confidence
    }
}

/// The compiled, immutable form of one handler method.
pub struct Invocation {
    handler: TypeKey,
    handler_name: String,
    method_name: Cow<'static, str>,
    patterns: Vec<RoutePattern>,
    constraints: MatchConstraints,
    params: Vec<ParamSpec>,
    fetchers: Vec<Box<dyn ArgumentFetcher>>,
    interceptors: Vec<InterceptorId>,
    body: MethodBody,
}

impl Invocation {
    /// Compile `def`, a method of the class `handler` / `handler_name`.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] raised by its templates, parameters or interceptor markers.
    pub(crate) fn build(
        handler: TypeKey,
        handler_name: &str,
        type_markers: Option<&TypeMarkers>,
        def: MethodDef,
        conversions: &dyn ConversionService,
        interceptor_factory: &dyn InterceptorFactory,
    ) -> Result<Self, ConfigError> {
        let (method_name, bound_to, mapping, params, markers, body) = def.into_parts();

        if bound_to != handler {
            return Err(ConfigError::HandlerTypeMismatch {
                handler: handler_name.to_string(),
                method: method_name.to_string(),
                expected: handler.name(),
                found: bound_to.name(),
            });
        }

        let mapping = mapping.unwrap_or_else(RequestMapping::new);
        let patterns = mapping.compile_patterns()?;

        let fetchers = params
            .iter()
            .enumerate()
            .map(|(position, spec)| {
                let site = Site {
                    handler: handler_name,
                    method: &method_name,
                    position,
                };
                fetcher_for(&site, spec, &patterns, conversions)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let interceptors = collect_interceptors(&markers, type_markers);
        if let Some(unknown) = interceptors
            .iter()
            .find(|id| !interceptor_factory.provides_interceptor(**id))
        {
            return Err(ConfigError::UnknownInterceptor {
                handler: handler_name.to_string(),
                method: method_name.to_string(),
                interceptor: unknown.name(),
            });
        }

        debug!(
            handler = handler_name,
            method = %method_name,
            templates = ?mapping.paths(),
            params = params.len(),
            interceptors = interceptors.len(),
            "Invocation compiled"
        );

        Ok(Self {
            handler,
            handler_name: handler_name.to_string(),
            method_name,
            patterns,
            constraints: mapping.constraints(),
            params,
            fetchers,
            interceptors,
            body,
        })
    }

    /// Match `request` against the route patterns and constraints.
    ///
    /// Templates are tried in declaration order; the first structural match is used.
    #[must_use]
    pub fn can_serve(&self, request: &dyn Request) -> Option<MatchResult> {
        let (pattern, captures) = self
            .patterns
            .iter()
            .enumerate()
            .find_map(|(i, p)| p.captures(request.path()).map(|c| (i, c)))?;
        let confidence = self.constraints.evaluate(request)?;
        Some(MatchResult {
            pattern,
            captures,
            confidence,
        })
    }

    /// Path variables bound by a match.
    #[must_use]
    pub fn frame_for(&self, matched: &MatchResult) -> ScopeFrame {
        match self.patterns.get(matched.pattern) {
            Some(pattern) => ScopeFrame::from_match(pattern, &matched.captures),
            None => ScopeFrame::new(),
        }
    }

    /// Resolve every argument in parameter order; call-time fetchers first.
    pub(crate) fn resolve(
        &self,
        cx: &FetchContext<'_>,
        calltime: &[&dyn CalltimeFetcher],
    ) -> Result<Args, CallError> {
        let mut values = Vec::with_capacity(self.params.len());
        for (position, (spec, fetcher)) in self.params.iter().zip(&self.fetchers).enumerate() {
            let info = ParamInfo::new(position, spec);
            let value = match calltime.iter().find(|f| f.can_fetch(&info)) {
                Some(f) => f.fetch(&info, cx.request())?,
                None => fetcher.fetch(cx)?,
            };
            values.push(value);
        }
        Ok(Args::new(values))
    }

    /// Positions of the parameters intercepted under `key`.
    pub(crate) fn intercepted_positions<'a>(
        &'a self,
        key: &'a str,
    ) -> impl Iterator<Item = usize> + 'a {
        self.params
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.intercepted_key() == Some(key))
            .map(|(i, _)| i)
    }

    pub(crate) fn body(&self) -> &MethodBody {
        &self.body
    }

    #[must_use]
    pub fn handler(&self) -> TypeKey {
        self.handler
    }

    #[must_use]
    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    #[must_use]
    pub fn patterns(&self) -> &[RoutePattern] {
        &self.patterns
    }

    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Interceptor ids, closest first.
    #[must_use]
    pub fn interceptors(&self) -> &[InterceptorId] {
        &self.interceptors
    }

    /// Whether the method can be selected by routing at all.
    #[must_use]
    pub fn is_routable(&self) -> bool {
        !self.patterns.is_empty()
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("handler", &self.handler_name)
            .field("method", &self.method_name)
            .field("patterns", &self.patterns)
            .field("fetchers", &self.fetchers)
            .field("interceptors", &self.interceptors)
            .finish()
    }
}

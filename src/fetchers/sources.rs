//! The registered fetchers, one per parameter source.

use crate::convert::{ConversionError, ConversionService};
use crate::error::{CallError, ConfigError};
use crate::router::RoutePattern;
use crate::value::{ParamType, Shape, TypeKey, Value};

use super::core::{ArgumentFetcher, FetchContext, ParamMarker, ParamSpec};

const PATH_VARIABLES: &str = "path variables";
const QUERY_PARAMETERS: &str = "query parameters";
const HEADERS: &str = "headers";

/// String values plus the conversion details shared by the string-sourced fetchers.
#[derive(Debug)]
struct Converting {
    name: String,
    ty: ParamType,
    default: Option<String>,
    source: &'static str,
}

impl Converting {
    fn convert(&self, cx: &FetchContext<'_>, input: &str) -> Result<Value, CallError> {
        cx.conversions
            .convert(&self.ty.element(), input)
            .map_err(|e| CallError::InvalidParameter {
                name: self.name.clone(),
                source: self.source,
                reason: e.to_string(),
            })
    }

    fn missing(&self) -> CallError {
        CallError::MissingParameter {
            name: self.name.clone(),
            source: self.source,
        }
    }

    fn collect_failed(&self) -> CallError {
        CallError::InvalidParameter {
            name: self.name.clone(),
            source: self.source,
            reason: format!("converted values are not {}", self.ty.element()),
        }
    }

    /// Scalar: first value, else converted default, else missing.
    /// List: every value; none at all gives an empty list with a default, else missing.
    fn from_values(&self, cx: &FetchContext<'_>, values: &[&str]) -> Result<Option<Value>, CallError> {
        match self.ty.shape() {
            Shape::List(collect) => {
                if values.is_empty() && self.default.is_none() {
                    return Err(self.missing());
                }
                let items = values
                    .iter()
                    .map(|v| self.convert(cx, v))
                    .collect::<Result<Vec<_>, _>>()?;
                collect(items).map(Some).ok_or_else(|| self.collect_failed())
            }
            Shape::Scalar | Shape::Map(_) => match (values.first(), &self.default) {
                (Some(v), _) => self.convert(cx, v).map(Some),
                (None, Some(d)) => self.convert(cx, d).map(Some),
                (None, None) => Err(self.missing()),
            },
        }
    }
}

#[derive(Debug)]
struct PathVariableFetcher(Converting);

impl ArgumentFetcher for PathVariableFetcher {
    fn fetch(&self, cx: &FetchContext<'_>) -> Result<Option<Value>, CallError> {
        let values: Vec<&str> = cx.frame.get(&self.0.name).into_iter().collect();
        self.0.from_values(cx, &values)
    }
}

#[derive(Debug)]
struct QueryParamFetcher(Converting);

impl QueryParamFetcher {
    /// Key of a `name:key` or `name[key]` query parameter.
    fn map_key<'a>(&self, param: &'a str) -> Option<&'a str> {
        let rest = param.strip_prefix(self.0.name.as_str())?;
        if let Some(key) = rest.strip_prefix(':') {
            return Some(key);
        }
        rest.strip_prefix('[')?.strip_suffix(']')
    }
}

impl ArgumentFetcher for QueryParamFetcher {
    fn fetch(&self, cx: &FetchContext<'_>) -> Result<Option<Value>, CallError> {
        let Shape::Map(collect) = self.0.ty.shape() else {
            let values = cx.request.query_params(&self.0.name);
            return self.0.from_values(cx, &values);
        };

        let mut entries = Vec::new();
        for param in cx.request.query_param_names() {
            let Some(key) = self.map_key(param) else {
                continue;
            };
            if let Some(raw) = cx.request.query_param(param) {
                entries.push((key.to_string(), self.0.convert(cx, raw)?));
            }
        }
        if entries.is_empty() && self.0.default.is_none() {
            return Err(self.0.missing());
        }
        collect(entries)
            .map(Some)
            .ok_or_else(|| self.0.collect_failed())
    }
}

#[derive(Debug)]
struct HeaderFetcher(Converting);

impl ArgumentFetcher for HeaderFetcher {
    fn fetch(&self, cx: &FetchContext<'_>) -> Result<Option<Value>, CallError> {
        let values = cx.request.headers(&self.0.name);
        self.0.from_values(cx, &values)
    }
}

#[derive(Debug)]
struct RequestAttributeFetcher {
    name: String,
}

impl ArgumentFetcher for RequestAttributeFetcher {
    fn fetch(&self, cx: &FetchContext<'_>) -> Result<Option<Value>, CallError> {
        Ok(cx.request.attributes().get(&self.name))
    }
}

#[derive(Debug)]
struct SessionAttributeFetcher {
    name: String,
}

impl ArgumentFetcher for SessionAttributeFetcher {
    fn fetch(&self, cx: &FetchContext<'_>) -> Result<Option<Value>, CallError> {
        Ok(cx.request.session().and_then(|s| s.get(&self.name)))
    }
}

#[derive(Debug)]
struct InterceptedFetcher;

impl ArgumentFetcher for InterceptedFetcher {
    fn fetch(&self, _cx: &FetchContext<'_>) -> Result<Option<Value>, CallError> {
        Ok(None)
    }
}

#[derive(Debug)]
struct InjectorFetcher {
    key: TypeKey,
    qualifier: Option<String>,
}

impl ArgumentFetcher for InjectorFetcher {
    fn fetch(&self, cx: &FetchContext<'_>) -> Result<Option<Value>, CallError> {
        cx.container
            .instance(self.key, self.qualifier.as_deref())
            .map(Some)
            .ok_or_else(|| CallError::Unresolvable {
                type_name: self.key.name(),
                qualifier: self.qualifier.clone(),
            })
    }
}

/// Names the parameter being built in configuration errors.
pub(crate) struct Site<'a> {
    pub handler: &'a str,
    pub method: &'a str,
    pub position: usize,
}

impl Site<'_> {
    fn converting(
        &self,
        spec: &ParamSpec,
        name: &str,
        source: &'static str,
        conversions: &dyn ConversionService,
        allow_map: bool,
    ) -> Result<Converting, ConfigError> {
        let ty = *spec.ty();
        if matches!(ty.shape(), Shape::Map(_)) && !allow_map {
            return Err(ConfigError::UnsupportedShape {
                handler: self.handler.to_string(),
                method: self.method.to_string(),
                position: self.position,
                source,
            });
        }
        if !conversions.supports(&ty.element()) {
            return Err(ConfigError::NoConverter {
                handler: self.handler.to_string(),
                method: self.method.to_string(),
                position: self.position,
                type_name: ty.element().name(),
            });
        }
        if let Some(default) = spec.default() {
            if let Err(ConversionError::Invalid { reason, .. }) =
                conversions.convert(&ty.element(), default)
            {
                return Err(ConfigError::InvalidDefault {
                    handler: self.handler.to_string(),
                    method: self.method.to_string(),
                    position: self.position,
                    value: default.to_string(),
                    reason,
                });
            }
        }
        Ok(Converting {
            name: name.to_string(),
            ty,
            default: spec.default().map(str::to_string),
            source,
        })
    }
}

fn find<'a>(spec: &'a ParamSpec, pick: fn(&'a ParamMarker) -> Option<&'a String>) -> Option<&'a str> {
    spec.markers().iter().find_map(pick).map(String::as_str)
}

/// Choose the fetcher for one parameter, in source precedence order.
///
/// # Errors
///
/// Unknown path variables, unconvertible types or defaults, and map shapes on
/// sources that cannot feed them.
pub(crate) fn fetcher_for(
    site: &Site<'_>,
    spec: &ParamSpec,
    patterns: &[RoutePattern],
    conversions: &dyn ConversionService,
) -> Result<Box<dyn ArgumentFetcher>, ConfigError> {
    if let Some(name) = find(spec, |m| match m {
        ParamMarker::PathVariable(n) => Some(n),
        _ => None,
    }) {
        if !patterns.is_empty() && !patterns.iter().any(|p| p.index_of(name).is_some()) {
            return Err(ConfigError::NoSuchPathVariable {
                handler: site.handler.to_string(),
                method: site.method.to_string(),
                name: name.to_string(),
            });
        }
        let c = site.converting(spec, name, PATH_VARIABLES, conversions, false)?;
        return Ok(Box::new(PathVariableFetcher(c)));
    }

    if let Some(name) = find(spec, |m| match m {
        ParamMarker::QueryParam(n) => Some(n),
        _ => None,
    }) {
        let c = site.converting(spec, name, QUERY_PARAMETERS, conversions, true)?;
        return Ok(Box::new(QueryParamFetcher(c)));
    }

    if let Some(name) = find(spec, |m| match m {
        ParamMarker::RequestAttribute(n) => Some(n),
        _ => None,
    }) {
        return Ok(Box::new(RequestAttributeFetcher {
            name: name.to_string(),
        }));
    }

    if let Some(name) = find(spec, |m| match m {
        ParamMarker::SessionAttribute(n) => Some(n),
        _ => None,
    }) {
        return Ok(Box::new(SessionAttributeFetcher {
            name: name.to_string(),
        }));
    }

    if let Some(name) = find(spec, |m| match m {
        ParamMarker::Header(n) => Some(n),
        _ => None,
    }) {
        let c = site.converting(spec, name, HEADERS, conversions, false)?;
        return Ok(Box::new(HeaderFetcher(c)));
    }

    if spec.intercepted_key().is_some() {
        return Ok(Box::new(InterceptedFetcher));
    }

    Ok(Box::new(InjectorFetcher {
        key: spec.ty().declared(),
        qualifier: spec.qualifier().map(str::to_string),
    }))
}

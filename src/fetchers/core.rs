use std::any::Any;
use std::fmt;

use crate::container::Container;
use crate::convert::ConversionService;
use crate::error::CallError;
use crate::exception::Thrown;
use crate::request::Request;
use crate::scope::ScopeFrame;
use crate::value::{ParamType, TypeKey, Value};

/// Where a parameter's value comes from, plus free-form tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamMarker {
    PathVariable(String),
    QueryParam(String),
    RequestAttribute(String),
    SessionAttribute(String),
    Header(String),
    /// Left empty for an interceptor to fill under this key.
    Intercepted(String),
    /// Qualifier for container injection.
    Qualified(String),
    /// Matched by call-time fetchers only.
    Tag(&'static str),
}

/// One formal parameter of a handler method.
///
/// ```rust
/// use brrtrouter_mvc::fetchers::ParamSpec;
///
/// let page = ParamSpec::query::<u32>("page").default_value("1");
/// let tags = ParamSpec::query_list::<String>("tag");
/// let id = ParamSpec::path_variable::<u64>("id");
/// assert_eq!(page.default(), Some("1"));
/// # let _ = (tags, id);
/// ```
#[derive(Debug, Clone)]
pub struct ParamSpec {
    ty: ParamType,
    markers: Vec<ParamMarker>,
    default: Option<String>,
}

impl ParamSpec {
    /// A parameter with no markers: injected from the container.
    #[must_use]
    pub fn new(ty: ParamType) -> Self {
        Self {
            ty,
            markers: Vec::new(),
            default: None,
        }
    }

    #[must_use]
    pub fn path_variable<T: Any + Send + Sync>(name: &str) -> Self {
        Self::new(ParamType::of::<T>()).marker(ParamMarker::PathVariable(name.to_string()))
    }

    #[must_use]
    pub fn query<T: Any + Send + Sync>(name: &str) -> Self {
        Self::new(ParamType::of::<T>()).marker(ParamMarker::QueryParam(name.to_string()))
    }

    /// All values of a repeated query parameter, as `Vec<T>`.
    #[must_use]
    pub fn query_list<T: Any + Send + Sync + Clone>(name: &str) -> Self {
        Self::new(ParamType::list_of::<T>()).marker(ParamMarker::QueryParam(name.to_string()))
    }

    /// `name:key=v` / `name[key]=v` entries, as `HashMap<String, T>`.
    #[must_use]
    pub fn query_map<T: Any + Send + Sync + Clone>(name: &str) -> Self {
        Self::new(ParamType::map_of::<T>()).marker(ParamMarker::QueryParam(name.to_string()))
    }

    #[must_use]
    pub fn header<T: Any + Send + Sync>(name: &str) -> Self {
        Self::new(ParamType::of::<T>()).marker(ParamMarker::Header(name.to_string()))
    }

    /// All values of a repeated header, as `Vec<T>`.
    #[must_use]
    pub fn header_list<T: Any + Send + Sync + Clone>(name: &str) -> Self {
        Self::new(ParamType::list_of::<T>()).marker(ParamMarker::Header(name.to_string()))
    }

    #[must_use]
    pub fn request_attribute<T: Any + Send + Sync>(name: &str) -> Self {
        Self::new(ParamType::of::<T>()).marker(ParamMarker::RequestAttribute(name.to_string()))
    }

    #[must_use]
    pub fn session_attribute<T: Any + Send + Sync>(name: &str) -> Self {
        Self::new(ParamType::of::<T>()).marker(ParamMarker::SessionAttribute(name.to_string()))
    }

    #[must_use]
    pub fn intercepted<T: Any + Send + Sync>(key: &str) -> Self {
        Self::new(ParamType::of::<T>()).marker(ParamMarker::Intercepted(key.to_string()))
    }

    #[must_use]
    pub fn inject<T: Any + Send + Sync>() -> Self {
        Self::new(ParamType::of::<T>())
    }

    #[must_use]
    pub fn marker(mut self, marker: ParamMarker) -> Self {
        self.markers.push(marker);
        self
    }

    #[must_use]
    pub fn qualified(self, name: &str) -> Self {
        self.marker(ParamMarker::Qualified(name.to_string()))
    }

    #[must_use]
    pub fn tag(self, tag: &'static str) -> Self {
        self.marker(ParamMarker::Tag(tag))
    }

    /// Value used when the source has none. Converted and checked at registration.
    #[must_use]
    pub fn default_value(mut self, value: &str) -> Self {
        self.default = Some(value.to_string());
        self
    }

    #[must_use]
    pub fn ty(&self) -> &ParamType {
        &self.ty
    }

    #[must_use]
    pub fn markers(&self) -> &[ParamMarker] {
        &self.markers
    }

    #[must_use]
    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.markers
            .iter()
            .any(|m| matches!(m, ParamMarker::Tag(t) if *t == tag))
    }

    /// Key of an intercepted parameter.
    #[must_use]
    pub fn intercepted_key(&self) -> Option<&str> {
        self.markers.iter().find_map(|m| match m {
            ParamMarker::Intercepted(k) => Some(k.as_str()),
            _ => None,
        })
    }

    #[must_use]
    pub fn qualifier(&self) -> Option<&str> {
        self.markers.iter().find_map(|m| match m {
            ParamMarker::Qualified(q) => Some(q.as_str()),
            _ => None,
        })
    }
}

/// A parameter as offered to call-time fetchers.
#[derive(Debug, Clone, Copy)]
pub struct ParamInfo<'a> {
    position: usize,
    spec: &'a ParamSpec,
}

impl<'a> ParamInfo<'a> {
    pub(crate) fn new(position: usize, spec: &'a ParamSpec) -> Self {
        Self { position, spec }
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn ty(&self) -> &'a ParamType {
        self.spec.ty()
    }

    #[must_use]
    pub fn markers(&self) -> &'a [ParamMarker] {
        self.spec.markers()
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.spec.has_tag(tag)
    }
}

/// Everything a fetcher may read while resolving one argument.
pub struct FetchContext<'a> {
    pub(crate) request: &'a dyn Request,
    pub(crate) frame: &'a ScopeFrame,
    pub(crate) conversions: &'a dyn ConversionService,
    pub(crate) container: &'a dyn Container,
}

impl<'a> FetchContext<'a> {
    #[must_use]
    pub fn new(
        request: &'a dyn Request,
        frame: &'a ScopeFrame,
        conversions: &'a dyn ConversionService,
        container: &'a dyn Container,
    ) -> Self {
        Self {
            request,
            frame,
            conversions,
            container,
        }
    }

    #[must_use]
    pub fn request(&self) -> &'a dyn Request {
        self.request
    }

    /// Path variables of the current call.
    #[must_use]
    pub fn frame(&self) -> &'a ScopeFrame {
        self.frame
    }
}

/// Resolves one argument. Chosen at registration, run on every call.
pub trait ArgumentFetcher: Send + Sync + fmt::Debug {
    /// `Ok(None)` means the argument is absent but that is acceptable.
    ///
    /// # Errors
    ///
    /// [`CallError::MissingParameter`], [`CallError::InvalidParameter`] or
    /// [`CallError::Unresolvable`].
    fn fetch(&self, cx: &FetchContext<'_>) -> Result<Option<Value>, CallError>;
}

/// Supplies arguments for one reentrant call, ahead of the registered fetchers.
pub trait CalltimeFetcher {
    fn can_fetch(&self, param: &ParamInfo<'_>) -> bool;

    /// # Errors
    ///
    /// A [`Thrown`] that goes through exception dispatch like a handler failure.
    fn fetch(&self, param: &ParamInfo<'_>, request: &dyn Request) -> Result<Option<Value>, Thrown>;
}

#[derive(Debug, Clone, Copy)]
enum Selector {
    Type(TypeKey),
    Position(usize),
    Tag(&'static str),
}

/// A ready-made [`CalltimeFetcher`] holding one value.
///
/// ```rust
/// use brrtrouter_mvc::fetchers::Provided;
/// use brrtrouter_mvc::value::Value;
///
/// let by_type = Provided::by_type(String::from("override"));
/// let by_position = Provided::at(2, Value::new(7_u32));
/// let by_tag = Provided::tagged("current-user", Value::new("alice"));
/// # let _ = (by_type, by_position, by_tag);
/// ```
#[derive(Debug, Clone)]
pub struct Provided {
    selector: Selector,
    value: Value,
}

impl Provided {
    /// Matches parameters declared as exactly `T`.
    pub fn by_type<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            selector: Selector::Type(TypeKey::of::<T>()),
            value: Value::new(value),
        }
    }

    /// Matches the parameter at `position`.
    #[must_use]
    pub fn at(position: usize, value: Value) -> Self {
        Self {
            selector: Selector::Position(position),
            value,
        }
    }

    /// Matches parameters carrying `ParamMarker::Tag(tag)`.
    #[must_use]
    pub fn tagged(tag: &'static str, value: Value) -> Self {
        Self {
            selector: Selector::Tag(tag),
            value,
        }
    }
}

impl CalltimeFetcher for Provided {
    fn can_fetch(&self, param: &ParamInfo<'_>) -> bool {
        match self.selector {
            Selector::Type(key) => param.ty().declared() == key,
            Selector::Position(p) => param.position() == p,
            Selector::Tag(tag) => param.has_tag(tag),
        }
    }

    fn fetch(&self, _param: &ParamInfo<'_>, _request: &dyn Request) -> Result<Option<Value>, Thrown> {
        Ok(Some(self.value.clone()))
    }
}

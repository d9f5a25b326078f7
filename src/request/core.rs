use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use smallvec::SmallVec;

use crate::ids::RequestId;
use crate::value::Value;

/// Maximum number of query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Maximum inline headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Query parameters in arrival order. Names repeat for multi-valued parameters.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Headers in arrival order. Names repeat for multi-valued headers.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

static JSESSIONID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i);jsessionid=[a-z0-9\-._]+").expect("jsessionid regex should be valid")
});

/// Read access to one inbound request.
pub trait Request {
    /// Correlation id for logs.
    fn request_id(&self) -> RequestId;

    fn method(&self) -> &Method;

    /// Path relative to the mount the request was dispatched through.
    fn path(&self) -> &str;

    /// First value of a header (case-insensitive name).
    fn header(&self, name: &str) -> Option<&str>;

    /// All values of a header (case-insensitive name).
    fn headers(&self, name: &str) -> Vec<&str>;

    /// First value of a query parameter.
    fn query_param(&self, name: &str) -> Option<&str>;

    /// All values of a query parameter.
    fn query_params(&self, name: &str) -> Vec<&str>;

    /// Distinct query parameter names in arrival order.
    fn query_param_names(&self) -> Vec<&str>;

    /// Media type of the body without parameters (`application/json`).
    fn content_type(&self) -> Option<&str> {
        self.header("content-type").map(media_type)
    }

    /// Request-scoped attribute bag.
    fn attributes(&self) -> &AttributeBag;

    /// Session attribute bag, when the request belongs to a session.
    fn session(&self) -> Option<&AttributeBag>;
}

/// Strip media-type parameters: `text/html; charset=utf-8` → `text/html`.
#[must_use]
pub fn media_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
}

/// Remove `;jsessionid=...` segments some clients append to URLs.
#[must_use]
pub fn strip_jsessionid(path: &str) -> Cow<'_, str> {
    JSESSIONID.replace_all(path, "")
}

/// Named, type-erased values shared between handlers of one request (or session).
#[derive(Default)]
pub struct AttributeBag {
    values: RwLock<HashMap<String, Value>>,
}

impl AttributeBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.read().get(name).cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.values.write().insert(name.into(), value);
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.values.write().remove(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.read().contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl fmt::Debug for AttributeBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.values.read();
        let mut names: Vec<&String> = values.keys().collect();
        names.sort();
        f.debug_set().entries(names).finish()
    }
}

/// An in-memory request.
///
/// ```rust
/// use brrtrouter_mvc::request::{HttpRequest, Request};
///
/// let req = HttpRequest::get("/pets?tag=cat&tag=dog").with_header("Accept", "application/json");
/// assert_eq!(req.path(), "/pets");
/// assert_eq!(req.query_params("tag"), vec!["cat", "dog"]);
/// assert_eq!(req.header("accept"), Some("application/json"));
/// ```
#[derive(Debug)]
pub struct HttpRequest {
    request_id: RequestId,
    method: Method,
    path: String,
    query: ParamVec,
    headers: HeaderVec,
    attributes: AttributeBag,
    session: Option<Arc<AttributeBag>>,
}

impl HttpRequest {
    /// Build a request from a verb and a `path?query` URI.
    #[must_use]
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((p, q)) => (p, q),
            None => (uri, ""),
        };
        let query: ParamVec = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
            .collect();
        let path = if path.is_empty() { "/" } else { path };
        Self {
            request_id: RequestId::new(),
            method,
            path: path.to_string(),
            query,
            headers: HeaderVec::new(),
            attributes: AttributeBag::new(),
            session: None,
        }
    }

    #[must_use]
    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    #[must_use]
    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    /// Append a header. `X-Request-Id` also sets the correlation id when it parses.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if name.eq_ignore_ascii_case("x-request-id") {
            if let Ok(id) = value.parse::<RequestId>() {
                self.request_id = id;
            }
        }
        self.headers.push((Arc::from(name), value));
        self
    }

    #[must_use]
    pub fn with_session(mut self, session: Arc<AttributeBag>) -> Self {
        self.session = Some(session);
        self
    }

    #[must_use]
    pub fn with_attribute(self, name: &str, value: Value) -> Self {
        self.attributes.set(name, value);
        self
    }
}

impl Request for HttpRequest {
    fn request_id(&self) -> RequestId {
        self.request_id
    }

    fn method(&self) -> &Method {
        &self.method
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn headers(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    fn query_params(&self, name: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    fn query_param_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.query.len());
        for (k, _) in &self.query {
            if !names.contains(&k.as_ref()) {
                names.push(k.as_ref());
            }
        }
        names
    }

    fn attributes(&self) -> &AttributeBag {
        &self.attributes
    }

    fn session(&self) -> Option<&AttributeBag> {
        self.session.as_deref()
    }
}

/// A request seen through a mount: same request, path relative to the prefix.
pub struct PathInfo<'a> {
    inner: &'a dyn Request,
    path: String,
}

impl<'a> PathInfo<'a> {
    /// Strip `prefix` from the inner request's path.
    ///
    /// Returns `None` when the path is not below `prefix`. The remainder always
    /// starts with `/`.
    #[must_use]
    pub fn below(inner: &'a dyn Request, prefix: &str, strip_session_ids: bool) -> Option<Self> {
        let full = if strip_session_ids {
            strip_jsessionid(inner.path())
        } else {
            Cow::Borrowed(inner.path())
        };
        let rest = full.strip_prefix(prefix)?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }
        let path = if rest.is_empty() { "/" } else { rest };
        Some(Self {
            inner,
            path: path.to_string(),
        })
    }
}

impl Request for PathInfo<'_> {
    fn request_id(&self) -> RequestId {
        self.inner.request_id()
    }

    fn method(&self) -> &Method {
        self.inner.method()
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.inner.header(name)
    }

    fn headers(&self, name: &str) -> Vec<&str> {
        self.inner.headers(name)
    }

    fn query_param(&self, name: &str) -> Option<&str> {
        self.inner.query_param(name)
    }

    fn query_params(&self, name: &str) -> Vec<&str> {
        self.inner.query_params(name)
    }

    fn query_param_names(&self) -> Vec<&str> {
        self.inner.query_param_names()
    }

    fn content_type(&self) -> Option<&str> {
        self.inner.content_type()
    }

    fn attributes(&self) -> &AttributeBag {
        self.inner.attributes()
    }

    fn session(&self) -> Option<&AttributeBag> {
        self.inner.session()
    }
}

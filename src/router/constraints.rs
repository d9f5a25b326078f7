use http::Method;

use crate::error::ConfigError;
use crate::request::{media_type, Request};

use super::core::RoutePattern;

/// Declarative routing information for one handler method.
///
/// ```rust
/// use brrtrouter_mvc::router::RequestMapping;
/// use http::Method;
///
/// let mapping = RequestMapping::path("/items/{id}")
///     .method(Method::PUT)
///     .consumes("application/json")
///     .produces("application/json");
/// assert_eq!(mapping.paths(), ["/items/{id}"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMapping {
    paths: Vec<String>,
    methods: Vec<Method>,
    params: Vec<String>,
    headers: Vec<String>,
    consumes: Vec<String>,
    produces: Vec<String>,
}

impl RequestMapping {
    /// A mapping without any path. It only constrains reentrant-call metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A mapping for one path template.
    #[must_use]
    pub fn path(template: &str) -> Self {
        Self::new().and_path(template)
    }

    /// Add another template; templates are tried in declaration order.
    #[must_use]
    pub fn and_path(mut self, template: &str) -> Self {
        self.paths.push(template.to_string());
        self
    }

    /// Accept this verb. With no verb declared, every verb is accepted.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    /// Require a query parameter to be present.
    #[must_use]
    pub fn param(mut self, name: &str) -> Self {
        self.params.push(name.to_string());
        self
    }

    /// Require a header to be present.
    #[must_use]
    pub fn header(mut self, name: &str) -> Self {
        self.headers.push(name.to_string());
        self
    }

    /// Accept a request body of this media type.
    #[must_use]
    pub fn consumes(mut self, media: &str) -> Self {
        self.consumes.push(media.to_string());
        self
    }

    /// Produce this media type; the request's `Accept` header must allow one of them.
    #[must_use]
    pub fn produces(mut self, media: &str) -> Self {
        self.produces.push(media.to_string());
        self
    }

    #[must_use]
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Compile every path template, in declaration order.
    ///
    /// # Errors
    ///
    /// The first template that fails to compile.
    pub fn compile_patterns(&self) -> Result<Vec<RoutePattern>, ConfigError> {
        self.paths.iter().map(|p| RoutePattern::compile(p)).collect()
    }

    #[must_use]
    pub fn constraints(&self) -> MatchConstraints {
        MatchConstraints {
            methods: self.methods.clone(),
            params: self.params.clone(),
            headers: self.headers.clone(),
            consumes: self.consumes.clone(),
            produces: self.produces.clone(),
        }
    }
}

/// The non-path constraints of a mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchConstraints {
    methods: Vec<Method>,
    params: Vec<String>,
    headers: Vec<String>,
    consumes: Vec<String>,
    produces: Vec<String>,
}

impl MatchConstraints {
    /// Confidence for `request`, or `None` when a declared constraint fails.
    ///
    /// One point each for: verb, every required parameter, every required
    /// header, consumes, produces.
    #[must_use]
    pub fn evaluate(&self, request: &dyn Request) -> Option<u32> {
        let mut confidence = 0;

        if !self.methods.is_empty() {
            if !self.methods.contains(request.method()) {
                return None;
            }
            confidence += 1;
        }

        for param in &self.params {
            request.query_param(param)?;
            confidence += 1;
        }

        for header in &self.headers {
            request.header(header)?;
            confidence += 1;
        }

        if !self.consumes.is_empty() {
            let content_type = request.content_type()?;
            if !self
                .consumes
                .iter()
                .any(|c| media_type(c).eq_ignore_ascii_case(content_type))
            {
                return None;
            }
            confidence += 1;
        }

        if !self.produces.is_empty() {
            let accept = request.headers("accept");
            if !self
                .produces
                .iter()
                .any(|p| accept.iter().any(|a| accept_contains(a, p)))
            {
                return None;
            }
            confidence += 1;
        }

        Some(confidence)
    }
}

/// Whether an `Accept` header value allows `media`.
///
/// Entries are comma separated; parameters such as `;q=0.8` are ignored.
/// `*/*` accepts anything and `type/*` accepts any subtype of `type`.
#[must_use]
pub fn accept_contains(accept: &str, media: &str) -> bool {
    let media = media_type(media);
    let media_main = media.split('/').next().unwrap_or(media);
    accept.split(',').map(media_type).any(|entry| {
        if entry == "*/*" || entry.eq_ignore_ascii_case(media) {
            return true;
        }
        match entry.strip_suffix("/*") {
            Some(main) => main.eq_ignore_ascii_case(media_main),
            None => false,
        }
    })
}

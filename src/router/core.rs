//! Route template compilation - runs once per template at registration.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;

use crate::error::ConfigError;
use crate::request::MAX_INLINE_PARAMS;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([^{}]*)\}").expect("placeholder regex should be valid")
});

fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// One compiled path template.
///
/// Immutable after [`compile`](Self::compile); shared read-only between
/// concurrent requests.
#[derive(Clone)]
pub struct RoutePattern {
    template: String,
    regex: Regex,
    /// Placeholder names with their 1-based capture index, left to right.
    names: SmallVec<[(Arc<str>, usize); MAX_INLINE_PARAMS]>,
}

impl RoutePattern {
    /// Compile `template`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MalformedTemplate`] when the template is empty, does not
    /// start with `/`, has unbalanced braces or a placeholder name outside
    /// `[A-Za-z0-9_-]+`.
    pub fn compile(template: &str) -> Result<Self, ConfigError> {
        let malformed = |reason: &str| ConfigError::MalformedTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        if template.is_empty() {
            return Err(malformed("template is empty"));
        }
        if !template.starts_with('/') {
            return Err(malformed("template must start with '/'"));
        }

        let mut pattern = String::with_capacity(template.len() + 16);
        pattern.push('^');
        let mut names = SmallVec::new();
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let literal = &template[last..whole.start()];
            if literal.contains(['{', '}']) {
                return Err(malformed("unbalanced brace"));
            }
            if !valid_name(name.as_str()) {
                return Err(malformed(&format!(
                    "invalid placeholder name '{}'",
                    name.as_str()
                )));
            }
            pattern.push_str(&regex::escape(literal));
            pattern.push_str("([^/]+)");
            names.push((Arc::from(name.as_str()), names.len() + 1));
            last = whole.end();
        }

        let tail = &template[last..];
        if tail.contains(['{', '}']) {
            return Err(malformed("unbalanced brace"));
        }
        pattern.push_str(&regex::escape(tail));
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| malformed(&e.to_string()))?;
        Ok(Self {
            template: template.to_string(),
            regex,
            names,
        })
    }

    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Number of capture groups (placeholders) in the template.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.names.len()
    }

    /// 1-based capture index of a placeholder. Repeated names resolve to the last one.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names
            .iter()
            .rfind(|(n, _)| n.as_ref() == name)
            .map(|(_, i)| *i)
    }

    /// Placeholder names, left to right.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.iter().map(|(n, _)| n.as_ref())
    }

    /// Whether `path` matches; returns the captured values if so.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<RouteCaptures> {
        let caps = self.regex.captures(path)?;
        let values = caps
            .iter()
            .skip(1)
            .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect();
        Some(RouteCaptures { values })
    }

    /// Pairs of (name, captured value), left to right.
    pub fn bind<'a>(
        &'a self,
        captures: &'a RouteCaptures,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.names
            .iter()
            .filter_map(move |(n, i)| captures.get(*i).map(|v| (n.as_ref(), v)))
    }
}

impl fmt::Debug for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutePattern")
            .field("template", &self.template)
            .field("regex", &self.regex.as_str())
            .finish()
    }
}

/// Values captured by a successful [`RoutePattern::captures`], indexed from 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteCaptures {
    values: SmallVec<[String; MAX_INLINE_PARAMS]>,
}

impl RouteCaptures {
    /// Value of capture group `index` (1-based).
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

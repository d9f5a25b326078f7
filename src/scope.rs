//! Per-request scope stack.
//!
//! Each call pushes a [`ScopeFrame`] holding its path variables and pops it
//! when the call ends. A handler that calls another handler reentrantly gets
//! a fresh frame on top; the outer frame sits untouched underneath and is the
//! top again as soon as the inner call returns.
//!
//! The stack is owned by one [`crate::call::Caller`] and is deliberately
//! `!Sync`: it is request-local state and must never be shared between
//! concurrent requests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::router::{RouteCaptures, RoutePattern};

/// Path variables visible to one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeFrame {
    vars: HashMap<String, String>,
}

impl ScopeFrame {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind every placeholder of `pattern` to its captured value.
    #[must_use]
    pub fn from_match(pattern: &RoutePattern, captures: &RouteCaptures) -> Self {
        pattern.bind(captures).collect()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ScopeFrame {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Stack of frames for one request.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: RefCell<Vec<Rc<ScopeFrame>>>,
}

impl ScopeStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `frame`; it is popped when the returned guard drops.
    #[must_use = "the frame is popped as soon as the guard is dropped"]
    pub fn push(&self, frame: ScopeFrame) -> ScopeGuard<'_> {
        let mut frames = self.frames.borrow_mut();
        frames.push(Rc::new(frame));
        ScopeGuard {
            stack: self,
            depth: frames.len(),
        }
    }

    /// The frame on top of the stack.
    #[must_use]
    pub fn current(&self) -> Option<Rc<ScopeFrame>> {
        self.frames.borrow().last().cloned()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }
}

/// Pops its frame exactly once, on every exit path.
#[derive(Debug)]
pub struct ScopeGuard<'a> {
    stack: &'a ScopeStack,
    depth: usize,
}

impl ScopeGuard<'_> {
    /// Stack depth including this guard's frame.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        let mut frames = self.stack.frames.borrow_mut();
        debug_assert_eq!(frames.len(), self.depth, "scope frames popped out of order");
        frames.truncate(self.depth.saturating_sub(1));
    }
}

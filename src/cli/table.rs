//! YAML routing tables for the probe.
//!
//! ```yaml
//! handlers:
//!   - name: Items
//!     methods:
//!       - name: show
//!         paths: ["/item/{id}"]
//!         verbs: [GET]
//!       - name: special
//!         paths: ["/item/special"]
//! mounts:
//!   - prefix: /api
//!     handlers: [Items]
//! ```
//!
//! Every placeholder of a method's templates becomes a `String` path-variable
//! parameter. Bodies are never run.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use http::Method;
use serde::{Deserialize, Serialize};

use crate::container::ServiceContainer;
use crate::controller::{HandlerClass, HandlerRegistry, MethodDef};
use crate::convert::Conversions;
use crate::dispatcher::MountTable;
use crate::error::ConfigError;
use crate::fetchers::ParamSpec;
use crate::request::Request;
use crate::router::{RequestMapping, RoutePattern};

/// Stand-in handler type shared by every probe class.
enum Probe {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteTable {
    #[serde(default)]
    pub handlers: Vec<HandlerEntry>,
    #[serde(default)]
    pub mounts: Vec<MountEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerEntry {
    pub name: String,
    #[serde(default)]
    pub methods: Vec<MethodEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodEntry {
    pub name: String,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub verbs: Vec<String>,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub consumes: Vec<String>,
    #[serde(default)]
    pub produces: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MountEntry {
    #[serde(default)]
    pub prefix: String,
    pub handlers: Vec<String>,
}

impl RouteTable {
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a routing table.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    /// # Errors
    ///
    /// Returns an error if the document is not a routing table.
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("invalid routing table")
    }

    /// Compile every handler and mount.
    ///
    /// # Errors
    ///
    /// The first [`ConfigError`] found, or a mount naming an unknown handler.
    pub fn compile(&self) -> anyhow::Result<CompiledTable> {
        let conversions = Conversions::default();
        let interceptors = ServiceContainer::new();

        let mut registries: HashMap<&str, Arc<HandlerRegistry>> = HashMap::new();
        for handler in &self.handlers {
            if registries.contains_key(handler.name.as_str()) {
                return Err(ConfigError::DuplicateHandler {
                    handler: handler.name.clone(),
                }
                .into());
            }
            let class = handler.class()?;
            let registry = HandlerRegistry::build(class, &conversions, &interceptors)
                .with_context(|| format!("handler {}", handler.name))?;
            registries.insert(handler.name.as_str(), Arc::new(registry));
        }

        let mut mounts = MountTable::new();
        for mount in &self.mounts {
            MountTable::check_prefix(&mount.prefix)?;
            for name in &mount.handlers {
                let Some(registry) = registries.get(name.as_str()) else {
                    bail!("mount '{}' names unknown handler '{name}'", mount.prefix);
                };
                mounts.mount(&mount.prefix, registry)?;
            }
        }

        let methods = registries.values().map(|r| r.invocations().len()).sum();
        let routable = registries
            .values()
            .flat_map(|r| r.invocations())
            .filter(|i| i.is_routable())
            .count();
        Ok(CompiledTable {
            handlers: self.handlers.len(),
            methods,
            routable,
            mounts,
        })
    }
}

impl HandlerEntry {
    fn class(&self) -> anyhow::Result<HandlerClass> {
        let mut class = HandlerClass::new::<Probe>().named(&self.name);
        for method in &self.methods {
            class = class.method(method.def()?);
        }
        Ok(class)
    }
}

impl MethodEntry {
    fn def(&self) -> anyhow::Result<MethodDef> {
        let mut mapping = RequestMapping::new();
        let mut variables = Vec::new();
        let mut seen = HashSet::new();
        for template in &self.paths {
            mapping = mapping.and_path(template);
            let pattern = RoutePattern::compile(template)?;
            for name in pattern.variable_names() {
                if seen.insert(name.to_string()) {
                    variables.push(name.to_string());
                }
            }
        }
        for verb in &self.verbs {
            let method = Method::from_bytes(verb.to_ascii_uppercase().as_bytes())
                .with_context(|| format!("method {}: invalid verb '{verb}'", self.name))?;
            mapping = mapping.method(method);
        }
        for param in &self.params {
            mapping = mapping.param(param);
        }
        for header in &self.headers {
            mapping = mapping.header(header);
        }
        for media in &self.consumes {
            mapping = mapping.consumes(media);
        }
        for media in &self.produces {
            mapping = mapping.produces(media);
        }

        let mut def = MethodDef::new(self.name.clone(), |_: &Probe, _, _| Ok(None));
        if !self.paths.is_empty() {
            def = def.mapping(mapping);
        }
        for variable in &variables {
            def = def.param(ParamSpec::path_variable::<String>(variable));
        }
        Ok(def)
    }
}

/// A compiled routing table.
#[derive(Debug)]
pub struct CompiledTable {
    handlers: usize,
    methods: usize,
    routable: usize,
    mounts: MountTable,
}

/// Summary printed by `check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub handlers: usize,
    pub methods: usize,
    pub routable: usize,
    pub mounts: Vec<String>,
}

/// Selection printed by `select`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeMatch {
    pub mount: String,
    pub handler: String,
    pub method: String,
    pub pattern: String,
    pub path_variables: BTreeMap<String, String>,
    pub groups: usize,
    pub confidence: u32,
}

impl CompiledTable {
    #[must_use]
    pub fn summary(&self) -> TableSummary {
        TableSummary {
            handlers: self.handlers,
            methods: self.methods,
            routable: self.routable,
            mounts: self.mounts.prefixes().map(str::to_string).collect(),
        }
    }

    /// What the engine would select for `request`.
    #[must_use]
    pub fn select(&self, request: &dyn Request, strip_jsessionid: bool) -> Option<ProbeMatch> {
        let (mount, candidate) = self.mounts.select(request, strip_jsessionid)?;
        let invocation = candidate.invocation();
        let pattern = invocation
            .patterns()
            .get(candidate.matched().pattern_index())
            .map(|p| p.template().to_string())
            .unwrap_or_default();
        Some(ProbeMatch {
            mount: mount.to_string(),
            handler: candidate.registry().name().to_string(),
            method: invocation.method_name().to_string(),
            pattern,
            path_variables: candidate
                .frame()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            groups: candidate.matched().group_count(),
            confidence: candidate.matched().confidence(),
        })
    }
}

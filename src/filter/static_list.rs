use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::ToolDescriptor;

pub const ALLOWED_ENV: &str = "TOOL_FILTER_ALLOWED";
pub const BLOCKED_ENV: &str = "TOOL_FILTER_BLOCKED";

/// Exact-name allow/block lists.
///
/// Applied in two phases: the allow list (when non-empty) keeps only the
/// names it contains, then the block list removes its names. A name on both
/// lists is therefore hidden.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StaticFilterSpec")]
pub struct StaticFilter {
    #[serde(rename = "allowed_tool_names")]
    allowed: BTreeSet<String>,
    #[serde(rename = "blocked_tool_names")]
    blocked: BTreeSet<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StaticFilterSpec {
    #[serde(default)]
    allowed_tool_names: Option<Vec<String>>,
    #[serde(default)]
    blocked_tool_names: Option<Vec<String>>,
}

impl TryFrom<StaticFilterSpec> for StaticFilter {
    type Error = ConfigError;

    fn try_from(spec: StaticFilterSpec) -> Result<Self, Self::Error> {
        Self::new(
            spec.allowed_tool_names.unwrap_or_default(),
            spec.blocked_tool_names.unwrap_or_default(),
        )
    }
}

impl StaticFilter {
    pub fn new<A, B>(allowed: A, blocked: B) -> Result<Self, ConfigError>
    where
        A: IntoIterator,
        A::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        Ok(Self {
            allowed: collect_names("allowed_tool_names", allowed)?,
            blocked: collect_names("blocked_tool_names", blocked)?,
        })
    }

    pub fn allow_only<I>(names: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::new(names, Vec::<String>::new())
    }

    pub fn block<I>(names: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::new(Vec::<String>::new(), names)
    }

    /// Allow list from names known at compile time to be well formed.
    pub(crate) fn allow_only_static(names: &[&'static str]) -> Self {
        Self {
            allowed: names.iter().map(|n| n.to_string()).collect(),
            blocked: BTreeSet::new(),
        }
    }

    /// Parse `{"allowed_tool_names": [...], "blocked_tool_names": [...]}`.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read comma-separated lists from `TOOL_FILTER_ALLOWED` / `TOOL_FILTER_BLOCKED`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let allowed = split_list("allowed_tool_names", lookup(ALLOWED_ENV))?;
        let blocked = split_list("blocked_tool_names", lookup(BLOCKED_ENV))?;
        Self::new(allowed, blocked)
    }

    pub fn allowed(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }

    pub fn blocked(&self) -> impl Iterator<Item = &str> {
        self.blocked.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty() && self.blocked.is_empty()
    }

    /// Whether a single name survives both phases.
    pub fn allows(&self, name: &str) -> bool {
        if !self.allowed.is_empty() && !self.allowed.contains(name) {
            return false;
        }
        !self.blocked.contains(name)
    }

    /// Keep the tools that survive both phases, in their original order.
    pub fn apply(&self, mut tools: Vec<ToolDescriptor>) -> Vec<ToolDescriptor> {
        if !self.allowed.is_empty() {
            tools.retain(|t| self.allowed.contains(&t.name));
        }
        if !self.blocked.is_empty() {
            tools.retain(|t| !self.blocked.contains(&t.name));
        }
        tools
    }
}

fn collect_names<I>(list: &'static str, names: I) -> Result<BTreeSet<String>, ConfigError>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    names
        .into_iter()
        .map(|n| {
            let name: String = n.into();
            validate_name(list, &name).map(|()| name)
        })
        .collect()
}

fn validate_name(list: &'static str, name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::EmptyName { list });
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ConfigError::InvalidName {
            list,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Unset or blank means no names. Empty entries (`a,,b`) are an error.
fn split_list(list: &'static str, raw: Option<String>) -> Result<Vec<String>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',')
        .map(|part| {
            let name = part.trim();
            if name.is_empty() {
                Err(ConfigError::EmptyName { list })
            } else {
                Ok(name.to_string())
            }
        })
        .collect()
}

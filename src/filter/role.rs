use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::static_list::StaticFilter;
use super::{PredicateError, ToolPredicate};
use crate::context::FilterContext;
use crate::types::ToolDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentRole {
    ReadOnly,
    Admin,
    Basic,
}

impl AgentRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "read-only",
            Self::Admin => "admin",
            Self::Basic => "basic",
        }
    }

    /// Map the conventional agent names (`ReadOnlyAgent`, `AdminAgent`,
    /// `BasicAgent`) to roles.
    pub fn from_agent_name(name: &str) -> Option<Self> {
        match name {
            "ReadOnlyAgent" => Some(Self::ReadOnly),
            "AdminAgent" => Some(Self::Admin),
            "BasicAgent" => Some(Self::Basic),
            _ => None,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read-only" | "read_only" | "readonly" => Ok(Self::ReadOnly),
            "admin" => Ok(Self::Admin),
            "basic" => Ok(Self::Basic),
            other => Err(format!("unknown agent role '{other}'")),
        }
    }
}

/// Keeps tools whose name starts with any of the given prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePrefixFilter {
    prefixes: Vec<String>,
}

impl NamePrefixFilter {
    pub fn new<I>(prefixes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}

#[async_trait]
impl ToolPredicate for NamePrefixFilter {
    fn name(&self) -> &str {
        "name-prefix"
    }

    async fn evaluate(
        &self,
        tool: &ToolDescriptor,
        _context: &FilterContext,
    ) -> Result<bool, PredicateError> {
        Ok(self.matches(&tool.name))
    }
}

const BASIC_TOOLS: [&str; 2] = ["read_file", "list_directory"];

/// What one role is allowed to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRule {
    AllowAll,
    DenyAll,
    Prefixes(NamePrefixFilter),
    Names(StaticFilter),
}

impl RoleRule {
    pub fn allows(&self, name: &str) -> bool {
        match self {
            Self::AllowAll => true,
            Self::DenyAll => false,
            Self::Prefixes(prefixes) => prefixes.matches(name),
            Self::Names(filter) => filter.allows(name),
        }
    }
}

/// Role-aware predicate. Selects a [`RoleRule`] from the requesting agent's
/// role; agents without a recognised role see nothing.
///
/// Defaults:
/// - `read-only`: names starting with `read_` or `list_`
/// - `admin`: everything
/// - `basic`: exactly `read_file` and `list_directory`
#[derive(Debug, Clone)]
pub struct RolePolicy {
    read_only: RoleRule,
    admin: RoleRule,
    basic: RoleRule,
    unknown: RoleRule,
}

impl Default for RolePolicy {
    fn default() -> Self {
        Self {
            read_only: RoleRule::Prefixes(NamePrefixFilter::new(["read_", "list_"])),
            admin: RoleRule::AllowAll,
            basic: RoleRule::Names(StaticFilter::allow_only_static(&BASIC_TOOLS)),
            unknown: RoleRule::DenyAll,
        }
    }
}

impl RolePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the rule for a role.
    pub fn with_rule(mut self, role: AgentRole, rule: RoleRule) -> Self {
        match role {
            AgentRole::ReadOnly => self.read_only = rule,
            AgentRole::Admin => self.admin = rule,
            AgentRole::Basic => self.basic = rule,
        }
        self
    }

    /// Rule for agents with no recognised role. Deny-all unless overridden.
    pub fn with_fallback(mut self, rule: RoleRule) -> Self {
        self.unknown = rule;
        self
    }

    pub fn rule_for(&self, role: Option<AgentRole>) -> &RoleRule {
        match role {
            Some(AgentRole::ReadOnly) => &self.read_only,
            Some(AgentRole::Admin) => &self.admin,
            Some(AgentRole::Basic) => &self.basic,
            None => &self.unknown,
        }
    }
}

#[async_trait]
impl ToolPredicate for RolePolicy {
    fn name(&self) -> &str {
        "role-policy"
    }

    async fn evaluate(
        &self,
        tool: &ToolDescriptor,
        context: &FilterContext,
    ) -> Result<bool, PredicateError> {
        let role = context.agent.effective_role();
        Ok(self.rule_for(role).allows(&tool.name))
    }
}

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::filter::role::AgentRole;

/// Who is asking for tools.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentIdentity {
    pub name: String,
    pub role: Option<AgentRole>,
}

impl AgentIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: None,
        }
    }

    pub fn with_role(mut self, role: AgentRole) -> Self {
        self.role = Some(role);
        self
    }

    /// The explicit role, or one inferred from a conventional agent name
    /// such as `ReadOnlyAgent`.
    pub fn effective_role(&self) -> Option<AgentRole> {
        self.role.or_else(|| AgentRole::from_agent_name(&self.name))
    }
}

/// Read-only snapshot handed to dynamic filters. Built fresh for every
/// filtering pass and never stored.
#[derive(Debug, Clone, Serialize)]
pub struct FilterContext {
    pub agent: AgentIdentity,
    pub server_name: String,
    /// Arbitrary run-scoped data supplied by the caller.
    pub run_context: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl FilterContext {
    pub fn new(agent: AgentIdentity, server_name: impl Into<String>) -> Self {
        Self {
            agent,
            server_name: server_name.into(),
            run_context: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_run_context(mut self, data: Value) -> Self {
        self.run_context = Some(data);
        self
    }

    /// Look up a top-level key in the run context.
    pub fn run_value(&self, key: &str) -> Option<&Value> {
        self.run_context.as_ref()?.get(key)
    }
}

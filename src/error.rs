use crate::filter::PredicateError;

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("tool filter failed on '{tool}' from server '{server}': {source}")]
    Evaluation {
        tool: String,
        server: String,
        #[source]
        source: PredicateError,
    },
    #[error("tool filtering cancelled")]
    Cancelled,
}

/// Rejected while building a filter, never while running one.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tool name in {list} is empty")]
    EmptyName { list: &'static str },
    #[error("invalid tool name in {list}: {name:?}")]
    InvalidName { list: &'static str, name: String },
    #[error("failed to parse filter config: {0}")]
    Parse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ToolServerError {
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("tool '{tool}' is not available to agent '{agent}'")]
    ToolNotVisible { tool: String, agent: String },
    #[error("tool '{tool}' failed: {message}")]
    Call { tool: String, message: String },
    #[error("tool server error: {0}")]
    Server(String),
}

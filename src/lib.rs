pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod filter;
pub mod tools;
pub mod types;

pub use config::ModelConfig;
pub use context::{AgentIdentity, FilterContext};
pub use engine::ToolFilterEngine;
pub use error::{ConfigError, FilterError, ToolServerError};
pub use filter::{
    predicate_fn, try_predicate_fn, AgentRole, FilterConfig, NamePrefixFilter, PredicateError,
    RolePolicy, RoleRule, StaticFilter, ToolPredicate,
};
pub use tools::{FilteredToolServer, ToolCatalog, ToolHandler, ToolServer};
pub use types::ToolDescriptor;

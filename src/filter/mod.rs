pub mod role;
pub mod static_list;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::FilterContext;
use crate::types::ToolDescriptor;

pub use role::{AgentRole, NamePrefixFilter, RolePolicy, RoleRule};
pub use static_list::StaticFilter;

/// Error from a dynamic predicate. Fatal for the filtering pass it occurs in.
#[derive(Debug, thiserror::Error)]
pub enum PredicateError {
    #[error("{0}")]
    Failed(String),
    #[error("lookup failed: {0}")]
    Lookup(String),
}

/// Decides whether one tool is visible for one run.
///
/// Implement this directly for predicates that need to await something
/// (a remote policy service, a database). Plain closures go through
/// [`predicate_fn`] or [`try_predicate_fn`].
#[async_trait]
pub trait ToolPredicate: Send + Sync {
    fn name(&self) -> &str {
        "predicate"
    }

    async fn evaluate(
        &self,
        tool: &ToolDescriptor,
        context: &FilterContext,
    ) -> Result<bool, PredicateError>;
}

#[async_trait]
impl<P: ToolPredicate + ?Sized> ToolPredicate for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn evaluate(
        &self,
        tool: &ToolDescriptor,
        context: &FilterContext,
    ) -> Result<bool, PredicateError> {
        (**self).evaluate(tool, context).await
    }
}

/// Adapter for an infallible synchronous closure.
pub struct FnPredicate<F> {
    f: F,
}

#[async_trait]
impl<F> ToolPredicate for FnPredicate<F>
where
    F: Fn(&ToolDescriptor, &FilterContext) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        "fn"
    }

    async fn evaluate(
        &self,
        tool: &ToolDescriptor,
        context: &FilterContext,
    ) -> Result<bool, PredicateError> {
        Ok((self.f)(tool, context))
    }
}

/// Adapter for a fallible synchronous closure.
pub struct TryFnPredicate<F> {
    f: F,
}

#[async_trait]
impl<F> ToolPredicate for TryFnPredicate<F>
where
    F: Fn(&ToolDescriptor, &FilterContext) -> Result<bool, PredicateError> + Send + Sync,
{
    fn name(&self) -> &str {
        "try-fn"
    }

    async fn evaluate(
        &self,
        tool: &ToolDescriptor,
        context: &FilterContext,
    ) -> Result<bool, PredicateError> {
        (self.f)(tool, context)
    }
}

pub fn predicate_fn<F>(f: F) -> FnPredicate<F>
where
    F: Fn(&ToolDescriptor, &FilterContext) -> bool + Send + Sync,
{
    FnPredicate { f }
}

pub fn try_predicate_fn<F>(f: F) -> TryFnPredicate<F>
where
    F: Fn(&ToolDescriptor, &FilterContext) -> Result<bool, PredicateError> + Send + Sync,
{
    TryFnPredicate { f }
}

/// How a tool server's listing is narrowed for an agent run.
#[derive(Clone, Default)]
pub enum FilterConfig {
    /// Everything the server offers is visible.
    #[default]
    Unfiltered,
    /// Exact-name allow/block lists.
    Static(StaticFilter),
    /// A per-tool predicate, evaluated on every listing.
    Dynamic(Arc<dyn ToolPredicate>),
}

impl FilterConfig {
    pub fn dynamic(predicate: impl ToolPredicate + 'static) -> Self {
        Self::Dynamic(Arc::new(predicate))
    }

    pub fn is_unfiltered(&self) -> bool {
        matches!(self, Self::Unfiltered)
    }
}

impl From<StaticFilter> for FilterConfig {
    fn from(filter: StaticFilter) -> Self {
        Self::Static(filter)
    }
}

impl From<RolePolicy> for FilterConfig {
    fn from(policy: RolePolicy) -> Self {
        Self::dynamic(policy)
    }
}

impl fmt::Debug for FilterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unfiltered => write!(f, "Unfiltered"),
            Self::Static(filter) => f.debug_tuple("Static").field(filter).finish(),
            Self::Dynamic(predicate) => write!(f, "Dynamic({})", predicate.name()),
        }
    }
}

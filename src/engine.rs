use futures::stream::{self, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::context::FilterContext;
use crate::error::FilterError;
use crate::filter::{FilterConfig, ToolPredicate};
use crate::types::ToolDescriptor;

/// Narrows a tool server's listing to what one agent run may see.
///
/// Stateless: every call is a pure function of the tool list, the config
/// and the context, so one engine can serve any number of concurrent runs.
/// Output always keeps the server's enumeration order, even when dynamic
/// predicates are evaluated concurrently.
///
/// A failing predicate fails the whole pass, even with evaluations still in
/// flight. Callers get an error rather than a partial list and should expose
/// no tools from that server.
#[derive(Debug, Clone)]
pub struct ToolFilterEngine {
    concurrency: usize,
}

impl Default for ToolFilterEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolFilterEngine {
    /// Evaluates dynamic predicates one tool at a time.
    pub fn new() -> Self {
        Self { concurrency: 1 }
    }

    /// Allow up to `limit` predicate evaluations in flight. Clamped to at least 1.
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub async fn filter(
        &self,
        tools: Vec<ToolDescriptor>,
        config: &FilterConfig,
        context: &FilterContext,
    ) -> Result<Vec<ToolDescriptor>, FilterError> {
        let offered = tools.len();
        let result = match config {
            FilterConfig::Unfiltered => Ok(tools),
            FilterConfig::Static(filter) => Ok(filter.apply(tools)),
            FilterConfig::Dynamic(predicate) => {
                self.evaluate_all(tools, &**predicate, context).await
            }
        };

        match &result {
            Ok(kept) => debug!(
                server = %context.server_name,
                agent = %context.agent.name,
                offered,
                kept = kept.len(),
                "filtered tool listing"
            ),
            Err(e) => debug!(
                server = %context.server_name,
                agent = %context.agent.name,
                error = %e,
                "tool filter failed"
            ),
        }
        result
    }

    /// Like [`filter`](Self::filter), abandoning in-flight evaluation when
    /// the run is cancelled.
    pub async fn filter_with_cancel(
        &self,
        tools: Vec<ToolDescriptor>,
        config: &FilterConfig,
        context: &FilterContext,
        cancel: &CancellationToken,
    ) -> Result<Vec<ToolDescriptor>, FilterError> {
        if cancel.is_cancelled() {
            return Err(FilterError::Cancelled);
        }
        tokio::select! {
            result = self.filter(tools, config, context) => result,
            _ = cancel.cancelled() => {
                info!(
                    server = %context.server_name,
                    agent = %context.agent.name,
                    "tool filtering cancelled"
                );
                Err(FilterError::Cancelled)
            }
        }
    }

    async fn evaluate_all(
        &self,
        tools: Vec<ToolDescriptor>,
        predicate: &dyn ToolPredicate,
        context: &FilterContext,
    ) -> Result<Vec<ToolDescriptor>, FilterError> {
        if self.concurrency == 1 {
            let mut kept = Vec::with_capacity(tools.len());
            for tool in tools {
                if evaluate_one(predicate, &tool, context).await? {
                    kept.push(tool);
                }
            }
            return Ok(kept);
        }

        // First error ends the pass and drops everything still in flight.
        let mut verdicts: Vec<(usize, ToolDescriptor, bool)> =
            stream::iter(tools.into_iter().enumerate())
                .map(|(index, tool)| async move {
                    let keep = evaluate_one(predicate, &tool, context).await?;
                    Ok::<_, FilterError>((index, tool, keep))
                })
                .buffer_unordered(self.concurrency)
                .try_collect()
                .await?;

        verdicts.sort_unstable_by_key(|(index, _, _)| *index);
        Ok(verdicts
            .into_iter()
            .filter_map(|(_, tool, keep)| keep.then_some(tool))
            .collect())
    }
}

async fn evaluate_one(
    predicate: &dyn ToolPredicate,
    tool: &ToolDescriptor,
    context: &FilterContext,
) -> Result<bool, FilterError> {
    predicate
        .evaluate(tool, context)
        .await
        .map_err(|source| FilterError::Evaluation {
            tool: tool.name.clone(),
            server: context.server_name.clone(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AgentIdentity;
    use crate::filter::{
        predicate_fn, try_predicate_fn, AgentRole, PredicateError, RolePolicy, StaticFilter,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn fs_tools() -> Vec<ToolDescriptor> {
        ["read_file", "list_directory", "write_file", "delete_file"]
            .into_iter()
            .map(ToolDescriptor::new)
            .collect()
    }

    fn names(tools: &[ToolDescriptor]) -> Vec<&str> {
        tools.iter().map(|t| t.name.as_str()).collect()
    }

    fn ctx(agent: AgentIdentity) -> FilterContext {
        FilterContext::new(agent, "filesystem")
    }

    // --- Slow predicate: later tools finish first ---

    struct SlowLookup {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl SlowLookup {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ToolPredicate for SlowLookup {
        async fn evaluate(
            &self,
            tool: &ToolDescriptor,
            _context: &FilterContext,
        ) -> Result<bool, PredicateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = match tool.name.as_str() {
                "read_file" => 40,
                "list_directory" => 30,
                "write_file" => 20,
                _ => 10,
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(tool.name != "write_file")
        }
    }

    // --- read_file hangs on a slow lookup, write_file fails at once ---

    struct SlowFirstThenFail;

    #[async_trait]
    impl ToolPredicate for SlowFirstThenFail {
        async fn evaluate(
            &self,
            tool: &ToolDescriptor,
            _context: &FilterContext,
        ) -> Result<bool, PredicateError> {
            match tool.name.as_str() {
                "read_file" => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(true)
                }
                "write_file" => Err(PredicateError::Lookup("policy service unavailable".into())),
                _ => Ok(true),
            }
        }
    }

    // --- Never resolves ---

    struct Hanging;

    #[async_trait]
    impl ToolPredicate for Hanging {
        async fn evaluate(
            &self,
            _tool: &ToolDescriptor,
            _context: &FilterContext,
        ) -> Result<bool, PredicateError> {
            futures::future::pending::<()>().await;
            Ok(true)
        }
    }

    // --- Tests ---

    #[tokio::test]
    async fn unfiltered_is_identity() {
        let engine = ToolFilterEngine::new();
        let out = engine
            .filter(fs_tools(), &FilterConfig::Unfiltered, &ctx(AgentIdentity::new("a")))
            .await
            .unwrap();
        assert_eq!(out, fs_tools());

        let empty_static = FilterConfig::Static(StaticFilter::default());
        let out = engine
            .filter(fs_tools(), &empty_static, &ctx(AgentIdentity::new("a")))
            .await
            .unwrap();
        assert_eq!(out, fs_tools());
    }

    #[tokio::test]
    async fn static_allow_and_block() {
        let config: FilterConfig = StaticFilter::new(
            ["read_file", "list_directory", "write_file"],
            ["delete_file"],
        )
        .unwrap()
        .into();

        let out = ToolFilterEngine::new()
            .filter(fs_tools(), &config, &ctx(AgentIdentity::new("a")))
            .await
            .unwrap();
        assert_eq!(names(&out), ["read_file", "list_directory", "write_file"]);
    }

    #[tokio::test]
    async fn dynamic_prefix_predicate() {
        let config = FilterConfig::dynamic(predicate_fn(|tool, _| {
            tool.name.starts_with("read_") || tool.name.starts_with("list_")
        }));

        let out = ToolFilterEngine::new()
            .filter(fs_tools(), &config, &ctx(AgentIdentity::new("a")))
            .await
            .unwrap();
        assert_eq!(names(&out), ["read_file", "list_directory"]);
    }

    #[tokio::test]
    async fn role_policy_basic() {
        let config = FilterConfig::from(RolePolicy::default());
        let agent = AgentIdentity::new("worker").with_role(AgentRole::Basic);

        let out = ToolFilterEngine::new()
            .filter(fs_tools(), &config, &ctx(agent))
            .await
            .unwrap();
        assert_eq!(names(&out), ["read_file", "list_directory"]);
    }

    #[tokio::test]
    async fn predicate_sees_context() {
        let config = FilterConfig::dynamic(predicate_fn(|tool, ctx| {
            ctx.server_name == "filesystem"
                && ctx.agent.name == "auditor"
                && tool.name == "read_file"
        }));

        let out = ToolFilterEngine::new()
            .filter(fs_tools(), &config, &ctx(AgentIdentity::new("auditor")))
            .await
            .unwrap();
        assert_eq!(names(&out), ["read_file"]);
    }

    #[tokio::test]
    async fn predicate_error_fails_closed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let config = FilterConfig::dynamic(try_predicate_fn(move |tool, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            if tool.name == "write_file" {
                Err(PredicateError::Lookup("policy service unavailable".into()))
            } else {
                Ok(true)
            }
        }));

        let err = ToolFilterEngine::new()
            .filter(fs_tools(), &config, &ctx(AgentIdentity::new("a")))
            .await
            .unwrap_err();

        match err {
            FilterError::Evaluation { tool, server, .. } => {
                assert_eq!(tool, "write_file");
                assert_eq!(server, "filesystem");
            }
            other => panic!("expected evaluation error, got {other:?}"),
        }
        // Evaluation stops at the failing tool.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn predicate_error_fails_closed_concurrently() {
        let config = FilterConfig::dynamic(try_predicate_fn(|tool, _| {
            if tool.name == "write_file" {
                Err(PredicateError::Failed("boom".into()))
            } else {
                Ok(true)
            }
        }));

        let result = ToolFilterEngine::new()
            .with_concurrency(4)
            .filter(fs_tools(), &config, &ctx(AgentIdentity::new("a")))
            .await;
        assert!(matches!(result, Err(FilterError::Evaluation { .. })));
    }

    #[tokio::test]
    async fn failure_does_not_wait_for_slow_earlier_tools() {
        let lookup = Arc::new(SlowFirstThenFail);
        let config = FilterConfig::Dynamic(lookup);

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            ToolFilterEngine::new().with_concurrency(4).filter(
                fs_tools(),
                &config,
                &ctx(AgentIdentity::new("a")),
            ),
        )
        .await
        .expect("failure should end the pass without waiting on read_file");

        match result {
            Err(FilterError::Evaluation { tool, .. }) => assert_eq!(tool, "write_file"),
            other => panic!("expected evaluation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn concurrent_evaluation_keeps_order() {
        let lookup = Arc::new(SlowLookup::new());
        let config = FilterConfig::Dynamic(lookup.clone());

        let out = ToolFilterEngine::new()
            .with_concurrency(4)
            .filter(fs_tools(), &config, &ctx(AgentIdentity::new("a")))
            .await
            .unwrap();

        assert_eq!(names(&out), ["read_file", "list_directory", "delete_file"]);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 4);
        assert!(lookup.peak.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let lookup = Arc::new(SlowLookup::new());
        let config = FilterConfig::Dynamic(lookup.clone());

        ToolFilterEngine::new()
            .with_concurrency(2)
            .filter(fs_tools(), &config, &ctx(AgentIdentity::new("a")))
            .await
            .unwrap();

        assert!(lookup.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn sequential_by_default() {
        let lookup = Arc::new(SlowLookup::new());
        let config = FilterConfig::Dynamic(lookup.clone());

        let engine = ToolFilterEngine::new();
        assert_eq!(engine.concurrency(), 1);
        engine
            .filter(fs_tools(), &config, &ctx(AgentIdentity::new("a")))
            .await
            .unwrap();
        assert_eq!(lookup.peak.load(Ordering::SeqCst), 1);
        assert_eq!(ToolFilterEngine::new().with_concurrency(0).concurrency(), 1);
    }

    #[tokio::test]
    async fn empty_listing_is_not_an_error() {
        let config = FilterConfig::dynamic(Hanging);
        let out = ToolFilterEngine::new()
            .filter(Vec::new(), &config, &ctx(AgentIdentity::new("a")))
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn cancellation_before_filtering() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = ToolFilterEngine::new()
            .filter_with_cancel(
                fs_tools(),
                &FilterConfig::Unfiltered,
                &ctx(AgentIdentity::new("a")),
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FilterError::Cancelled));
    }

    #[tokio::test]
    async fn cancellation_abandons_in_flight_predicate() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = ToolFilterEngine::new()
            .filter_with_cancel(
                fs_tools(),
                &FilterConfig::dynamic(Hanging),
                &ctx(AgentIdentity::new("a")),
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FilterError::Cancelled));
    }
}

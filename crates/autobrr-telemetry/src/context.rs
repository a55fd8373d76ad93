//! Context propagation helpers for per-release and per-session spans.
//!
//! # Design
//! - Keeps the release identifier in task-local storage so spans emitted deep
//!   inside parsing/filtering carry it without threading it through every call.
//! - Provides an application-level span guard to ensure top-level spans carry mode/build info.

use std::future::Future;
use std::sync::Arc;

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Guard that keeps the application-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    #[must_use]
    /// Enter the application-level tracing span for the lifetime of the guard.
    pub fn new(mode: impl Into<String>) -> Self {
        let mode = mode.into();
        let span: &'static Span = Box::leak(Box::new(
            tracing::info_span!("app", mode = %mode, build_sha = %build_sha()),
        ));
        let guard = span.enter();
        Self { _guard: guard }
    }
}

/// Record the current application mode on the active span.
pub fn record_app_mode(mode: &str) {
    Span::current().record("mode", tracing::field::display(mode));
}

/// Retrieve the release identifier from the current task, if one is set.
#[must_use]
pub fn current_release_id() -> Option<String> {
    ACTIVE_RELEASE_CONTEXT
        .try_with(|ctx| ctx.release_id.as_ref().to_string())
        .ok()
}

/// Execute the provided future with the supplied release context available to
/// downstream spans emitted by the parser, filter engine, and pipeline.
pub async fn with_release_context<Fut, T>(release_id: impl Into<String>, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    let context = ReleaseContext {
        release_id: Arc::from(release_id.into()),
    };
    ACTIVE_RELEASE_CONTEXT.scope(context, fut).await
}

#[derive(Clone)]
struct ReleaseContext {
    release_id: Arc<str>,
}

tokio::task_local! {
    static ACTIVE_RELEASE_CONTEXT: ReleaseContext;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_context_guard_sets_app_mode_field() {
        let guard = GlobalContextGuard::new("test");
        record_app_mode("active");
        drop(guard);
    }

    #[tokio::test]
    async fn with_release_context_exposes_identifier() {
        let output = with_release_context("indexer.torrent-id", async {
            assert_eq!(current_release_id().as_deref(), Some("indexer.torrent-id"));
            "done"
        })
        .await;
        assert_eq!(output, "done");
        assert!(current_release_id().is_none());
    }
}

//! Per-run execution context.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ConfigContext;
use crate::environment::EnvironmentAdapter;

use super::cancel::CancellationToken;

/// Everything a run needs besides the plan itself.
///
/// Built once before the run starts and shared read-only by every lane.
#[derive(Clone)]
pub struct ExecutionContext {
    pub profile: String,
    pub interactive: bool,
    pub dry_run: bool,
    pub cancel: CancellationToken,
    /// Feature values when the run started.
    pub features: BTreeMap<String, bool>,
    /// Run-wide cap on simultaneously running steps.
    pub max_concurrency: usize,
    pub grace_period: Duration,
    /// Lines of stdout/stderr kept per step.
    pub summary_lines: usize,
    /// Base directory for step processes and relative step `cwd`s.
    pub working_dir: PathBuf,
    pub config: Arc<dyn ConfigContext>,
    pub adapter: Arc<dyn EnvironmentAdapter>,
}

impl ExecutionContext {
    pub fn new(config: Arc<dyn ConfigContext>, adapter: Arc<dyn EnvironmentAdapter>) -> Self {
        Self {
            profile: config.profile().to_string(),
            interactive: adapter.is_interactive(),
            dry_run: false,
            cancel: CancellationToken::new(),
            features: config.features(),
            max_concurrency: 4,
            grace_period: Duration::from_secs(5),
            summary_lines: 20,
            working_dir: PathBuf::from("."),
            config,
            adapter,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Zero is treated as one.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    pub fn with_summary_lines(mut self, lines: usize) -> Self {
        self.summary_lines = lines;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("profile", &self.profile)
            .field("interactive", &self.interactive)
            .field("dry_run", &self.dry_run)
            .field("max_concurrency", &self.max_concurrency)
            .field("working_dir", &self.working_dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileContext;
    use crate::environment::MockAdapter;

    #[test]
    fn snapshots_profile_and_features() {
        let adapter: Arc<dyn EnvironmentAdapter> = Arc::new(MockAdapter::non_interactive());
        let config = Arc::new(ProfileContext::from_features(
            "ci",
            BTreeMap::from([("docker".to_string(), true)]),
            adapter.clone(),
        ));
        let ctx = ExecutionContext::new(config, adapter).with_max_concurrency(0);

        assert_eq!(ctx.profile, "ci");
        assert!(!ctx.interactive);
        assert_eq!(ctx.features.get("docker"), Some(&true));
        assert_eq!(ctx.max_concurrency, 1);
    }
}

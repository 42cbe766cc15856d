use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use swapify::marketplace::{CreditPolicy, MatchEvent, MatchNotifier, NotifyError};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Stands in for the chat gateway: records the match in the service log.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LogNotifier;

impl MatchNotifier for LogNotifier {
    fn publish(&self, event: MatchEvent) -> Result<(), NotifyError> {
        info!(
            post_id = %event.post_id,
            author = %event.author,
            selected_user = %event.selected_user,
            selected_at = %event.selected_at,
            "participants matched; conversation may open"
        );
        Ok(())
    }
}

pub(crate) fn parse_credit_policy(raw: &str) -> Result<CreditPolicy, String> {
    CreditPolicy::parse(raw)
        .ok_or_else(|| format!("unknown credit policy '{raw}' (expected counterpart or both)"))
}

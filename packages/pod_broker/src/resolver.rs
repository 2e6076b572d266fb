use tracing::debug;

use crate::error::ResolveError;
use crate::{Candidate, Orchestrator, Phase};

/// Map a session name to one live pod.
///
/// Lists pods matching `job-name=<session>` in `namespace` and picks the
/// first one (listing order) whose phase is exactly `Running`. No health
/// check beyond phase, no preference for newest or oldest, no cache: this
/// runs freshly on every bridge connection, so a transient empty list or a
/// not-yet-running pod fails immediately and the client has to reconnect.
pub async fn resolve_running(
    orchestrator: &dyn Orchestrator,
    namespace: &str,
    session: &str,
) -> Result<Candidate, ResolveError> {
    let selector = format!("job-name={session}");
    debug!(%namespace, %selector, "listing candidate pods");

    let candidates = orchestrator
        .list_candidates(namespace, &selector)
        .await
        .map_err(|source| ResolveError::List {
            selector: selector.clone(),
            source,
        })?;

    if candidates.is_empty() {
        return Err(ResolveError::NoCandidates { selector });
    }

    let total = candidates.len();
    candidates
        .into_iter()
        .find(|c| c.phase == Phase::Running)
        .ok_or(ResolveError::NoRunningInstance { selector, total })
}

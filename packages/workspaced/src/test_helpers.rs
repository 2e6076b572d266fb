use std::sync::Arc;

use pod_broker::fake::FakeOrchestrator;

use crate::AppState;
use crate::config::{SessionConfig, SessionFileConfig, WorkspaceConfig};

/// Build an `AppState` rooted in a fresh temp directory with a default fake
/// orchestrator. Callers must hold the `TempDir` for the lifetime of the
/// test so the workspace root stays valid.
pub async fn test_app_state() -> (AppState, tempfile::TempDir) {
    test_app_state_with(Arc::new(FakeOrchestrator::new())).await
}

/// Same as [`test_app_state`] but with a caller-scripted orchestrator, for
/// bridge tests that assert on listings, exec opens, and recorded stdin.
pub async fn test_app_state_with(
    orchestrator: Arc<FakeOrchestrator>,
) -> (AppState, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("tempdir");

    let state = AppState {
        workspace: Arc::new(WorkspaceConfig {
            code_dir: tmp.path().to_path_buf(),
        }),
        session: Arc::new(SessionConfig::from_file(&SessionFileConfig::default())),
        orchestrator: Some(orchestrator),
    };
    (state, tmp)
}

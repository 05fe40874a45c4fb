//! Result artifact for the orchestrating pipeline.

use std::path::Path;

use snapcopy_core::errors::{ReplicationError, Result};

use crate::commands::run::RunOutcome;

/// File name used when no output path is given
pub const DEFAULT_ARTIFACT_NAME: &str = "copied-rds-snapshot-name";

/// Write exactly the destination snapshot identifier to `path`, with no
/// trailing newline. Overwrites an existing file.
///
/// # Errors
///
/// `Io` when the file cannot be written.
pub fn write_result_artifact(path: &Path, outcome: &RunOutcome) -> Result<()> {
    std::fs::write(path, outcome.destination_snapshot_id.as_bytes()).map_err(|e| {
        ReplicationError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        }
    })?;
    tracing::info!(
        path = %path.display(),
        target_snapshot_id = %outcome.destination_snapshot_id,
        "wrote result artifact"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::run::RunAction;
    use snapcopy_core::DecisionReason;

    fn outcome(id: &str) -> RunOutcome {
        RunOutcome {
            run_id: "run".to_string(),
            instance_id: "db-1".to_string(),
            source_snapshot_id: "snap-1".to_string(),
            destination_snapshot_id: id.to_string(),
            action: RunAction::Copied,
            reason: DecisionReason::Bootstrap,
        }
    }

    #[test]
    fn test_artifact_has_no_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_ARTIFACT_NAME);

        write_result_artifact(&path, &outcome("snap-1-copied-from-111111111111")).unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, b"snap-1-copied-from-111111111111");
    }

    #[test]
    fn test_unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("artifact");

        let err = write_result_artifact(&path, &outcome("x")).unwrap_err();
        assert!(matches!(err, ReplicationError::Io { .. }));
        assert!(!path.exists());
    }
}

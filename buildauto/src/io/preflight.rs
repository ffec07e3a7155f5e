//! Working-directory checks that gate any mutation.

use std::path::Path;

use anyhow::Result;
use tracing::debug;

use crate::core::types::PreconditionError;

/// Ensure every name in `required` exists directly inside `dir`.
///
/// Fails with [`PreconditionError`] naming all missing entries.
pub fn assert_present_in_dir(dir: &Path, required: &[String]) -> Result<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| !dir.join(name).exists())
        .cloned()
        .collect();
    if missing.is_empty() {
        debug!(dir = %dir.display(), "markers present");
        return Ok(());
    }
    Err(PreconditionError {
        dir: dir.to_path_buf(),
        missing,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_when_all_markers_exist() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("settings.gradle"), "").expect("write");
        assert_present_in_dir(temp.path(), &["settings.gradle".to_string()]).expect("present");
    }

    #[test]
    fn lists_every_missing_marker() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("a"), "").expect("write");
        let required = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let err = assert_present_in_dir(temp.path(), &required).unwrap_err();
        let precondition = err
            .downcast_ref::<PreconditionError>()
            .expect("precondition error");
        assert_eq!(precondition.missing, vec!["b", "c"]);
    }
}

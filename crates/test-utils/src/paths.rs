//! Path utilities for tests that write artifacts.

/// Creates a fresh scratch directory that is removed when dropped.
///
/// Panics if the system temp directory is not writable; only use from tests.
pub fn scratch_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("survey-grid-test-")
        .tempdir()
        .expect("failed to create scratch directory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_dir_is_removed() {
        let dir = scratch_dir();
        let path = dir.path().to_path_buf();
        assert!(path.is_dir());
        drop(dir);
        assert!(!path.exists());
    }
}

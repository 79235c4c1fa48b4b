use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

static LOGGING_INIT: Once = Once::new();

/// Initializes the tracing subscriber for tests.
///
/// Guarded by a `Once` so parallel tests install the global subscriber a single
/// time. Not for test binaries that also use `#[traced_test]`.
pub fn setup_test_logging() {
    LOGGING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Writes `content` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(&path, content).expect("Failed to write file");
    path
}

/// Returns true when the current process runs as root (UID 0).
/// Permission-sensitive tests skip themselves in that case.
#[cfg(test)]
#[inline]
pub fn running_as_root() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid has no side effects.
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_file_creates_parents() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "a/b/c.txt", "content");
        assert_eq!(fs::read_to_string(path).unwrap(), "content");
    }

    #[test]
    #[should_panic(expected = "Failed to create parent dir")]
    fn test_write_file_fails_loudly() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "blocker", "plain file");
        write_file(dir.path(), "blocker/child.txt", "never written");
    }
}

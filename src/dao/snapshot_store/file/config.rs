use std::path::PathBuf;

/// Default on-disk location of the round snapshot.
const DEFAULT_SNAPSHOT_PATH: &str = "data/round.json";
/// Environment variable that overrides [`DEFAULT_SNAPSHOT_PATH`].
const SNAPSHOT_PATH_ENV: &str = "TASK_RACE_SNAPSHOT_PATH";

/// Runtime configuration for the file-backed snapshot store.
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Path of the JSON snapshot file.
    pub path: PathBuf,
}

impl FileStoreConfig {
    /// Construct a configuration pointing at an explicit snapshot path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Build a configuration from the environment, falling back to the
    /// default path next to the working directory.
    pub fn from_env() -> Self {
        let path = std::env::var_os(SNAPSHOT_PATH_ENV)
            .map(PathBuf::from)
            .filter(|path| !path.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_PATH));
        Self { path }
    }
}

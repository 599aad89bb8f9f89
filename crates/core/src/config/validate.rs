use std::path::Path;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Crawler program and deploy script are set
/// - The crawl and preview directories are distinct
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.crawler.program.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "crawler.program cannot be empty".to_string(),
        ));
    }

    if config.deploy.script.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "deploy.script cannot be empty".to_string(),
        ));
    }

    if config.paths.static_repository == config.paths.visualize_repository {
        return Err(ConfigError::ValidationError(
            "paths.static_repository and paths.visualize_repository must differ".to_string(),
        ));
    }

    Ok(())
}

/// Check that the directories and files the server works with exist.
///
/// The log directory is created when missing. The repositories and the
/// deploy script must already be in place.
pub fn verify_paths(config: &Config) -> Result<(), ConfigError> {
    let paths = &config.paths;

    std::fs::create_dir_all(&paths.log_dir).map_err(|e| {
        ConfigError::ValidationError(format!(
            "cannot create paths.log_dir {}: {}",
            paths.log_dir.display(),
            e
        ))
    })?;

    for (name, dir) in [
        ("paths.static_repository", &paths.static_repository),
        ("paths.visualize_repository", &paths.visualize_repository),
        ("paths.archive_repository", &paths.archive_repository),
    ] {
        require_dir(name, dir)?;
    }

    if !config.deploy.script.is_file() {
        return Err(ConfigError::ValidationError(format!(
            "deploy.script {} is not a file",
            config.deploy.script.display()
        )));
    }

    Ok(())
}

fn require_dir(name: &str, dir: &Path) -> Result<(), ConfigError> {
    if !dir.is_dir() {
        return Err(ConfigError::ValidationError(format!(
            "{} {} is not a directory",
            name,
            dir.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_config_from_str, PathsConfig};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn base_config() -> Config {
        load_config_from_str(
            r#"
[crawler]
program = "crawl.sh"

[deploy]
script = "deploy.sh"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = base_config();
        config.server.port = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_empty_script_fails() {
        let mut config = base_config();
        config.deploy.script = PathBuf::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_same_repositories_fails() {
        let mut config = base_config();
        config.paths.visualize_repository = config.paths.static_repository.clone();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    fn rooted_config(root: &Path) -> Config {
        let mut config = base_config();
        config.paths = PathsConfig::rooted_at(root);
        config.deploy.script = root.join("deploy.sh");
        std::fs::write(&config.deploy.script, "#!/bin/sh\n").unwrap();
        for dir in [
            &config.paths.static_repository,
            &config.paths.visualize_repository,
            &config.paths.archive_repository,
        ] {
            std::fs::create_dir_all(dir).unwrap();
        }
        config
    }

    #[test]
    fn test_verify_paths_creates_log_dir() {
        let tmp = TempDir::new().unwrap();
        let config = rooted_config(tmp.path());
        assert!(!config.paths.log_dir.exists());

        verify_paths(&config).unwrap();
        assert!(config.paths.log_dir.is_dir());
    }

    #[test]
    fn test_verify_paths_missing_repository_fails() {
        let tmp = TempDir::new().unwrap();
        let config = rooted_config(tmp.path());
        std::fs::remove_dir(&config.paths.archive_repository).unwrap();

        let err = verify_paths(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("paths.archive_repository"));
    }

    #[test]
    fn test_verify_paths_missing_script_fails() {
        let tmp = TempDir::new().unwrap();
        let mut config = rooted_config(tmp.path());
        config.deploy.script = tmp.path().join("missing.sh");

        let err = verify_paths(&config).unwrap_err();
        assert!(err.to_string().contains("deploy.script"));
    }

    #[test]
    fn test_verify_paths_rejects_file_as_repository() {
        let tmp = TempDir::new().unwrap();
        let config = rooted_config(tmp.path());
        std::fs::remove_dir(&config.paths.visualize_repository).unwrap();
        std::fs::write(&config.paths.visualize_repository, "").unwrap();

        assert!(verify_paths(&config).is_err());
    }
}

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{info, warn};

use super::{DeployError, Deployer};
use crate::config::DeployConfig;

/// Runs `<shell> <script> <hash>` and streams its output to the log.
#[derive(Debug, Clone)]
pub struct ScriptDeployer {
    shell: PathBuf,
    script: PathBuf,
}

impl ScriptDeployer {
    pub fn new(shell: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
            script: script.into(),
        }
    }

    pub fn from_config(config: &DeployConfig) -> Self {
        Self::new(&config.shell, &config.script)
    }
}

#[async_trait]
impl Deployer for ScriptDeployer {
    async fn deploy(&self, content_hash: &str) -> Result<(), DeployError> {
        if !self.script.is_file() {
            return Err(DeployError::ScriptNotFound {
                path: self.script.clone(),
            });
        }

        info!(script = %self.script.display(), hash = %content_hash, "Running deploy script");

        let mut child = Command::new(&self.shell)
            .arg(&self.script)
            .arg(content_hash)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DeployError::InterpreterNotFound {
                        path: self.shell.clone(),
                    }
                } else {
                    DeployError::Io(e)
                }
            })?;

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!(line = %line, "deploy");
                }
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                info!(line = %line, "deploy");
            }
        }

        let status = child.wait().await?;
        if let Some(task) = stderr_task {
            let _ = task.await;
        }

        if !status.success() {
            return Err(DeployError::ScriptFailed {
                code: status.code(),
            });
        }

        info!(hash = %content_hash, "Deploy script finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_script(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("push_to_prod.sh");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn test_script_receives_hash() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("deployed");
        let script = write_script(
            &dir,
            &format!("echo deploying $1\necho \"$1\" > {}\n", marker.display()),
        );

        let deployer = ScriptDeployer::new("sh", script);
        deployer.deploy("abc123").await.unwrap();

        assert_eq!(std::fs::read_to_string(marker).unwrap().trim(), "abc123");
    }

    #[tokio::test]
    async fn test_script_failure() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "echo boom >&2\nexit 3\n");

        let deployer = ScriptDeployer::new("sh", script);
        let result = deployer.deploy("abc123").await;
        assert!(matches!(
            result,
            Err(DeployError::ScriptFailed { code: Some(3) })
        ));
    }

    #[tokio::test]
    async fn test_missing_script() {
        let deployer = ScriptDeployer::new("sh", "/nonexistent/push_to_prod.sh");
        assert!(matches!(
            deployer.deploy("abc123").await,
            Err(DeployError::ScriptNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_interpreter() {
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "exit 0\n");

        let deployer = ScriptDeployer::new("/nonexistent/bin/bash", script);
        assert!(matches!(
            deployer.deploy("abc123").await,
            Err(DeployError::InterpreterNotFound { .. })
        ));
    }
}

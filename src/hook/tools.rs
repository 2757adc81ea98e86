//! `Runtime` backed by the orchestration runtime's hook tools.
//!
//! Each call spawns a hook tool via `tokio::process::Command` (never a
//! shell), races it against the configured timeout, and kills the child if
//! the timeout wins. Tools that support it are asked for JSON output.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use tokio::io::AsyncReadExt;

use crate::config::{CharmConfig, HookToolsConfig};
use crate::error::ProxyError;
use crate::hook::Runtime;
use crate::relation::{Databag, RelationHandle, RelationId};
use crate::status::{StatusReport, UnitStatus};

/// Hook tool client for one unit.
#[derive(Debug, Clone)]
pub struct HookTools {
    dir: Option<PathBuf>,
    timeout: Duration,
    /// Application this unit belongs to; names the local bucket.
    app: String,
}

impl HookTools {
    pub fn new(dir: Option<PathBuf>, timeout: Duration, app: impl Into<String>) -> Self {
        Self {
            dir,
            timeout,
            app: app.into(),
        }
    }

    /// Build from settings and the unit name (`app/N`).
    pub fn from_config(config: &HookToolsConfig, unit_name: &str) -> crate::Result<Self> {
        let app = match unit_name.split_once('/') {
            Some((app, number)) if !app.is_empty() && number.parse::<u32>().is_ok() => app,
            _ => {
                return Err(ProxyError::InvalidConfig(format!(
                    "unit name '{}' is not of the form <application>/<number>",
                    unit_name
                )));
            }
        };
        Ok(Self::new(
            config.dir.clone(),
            Duration::from_secs(config.timeout_secs),
            app,
        ))
    }

    fn program(&self, tool: &str) -> PathBuf {
        match &self.dir {
            Some(dir) => dir.join(tool),
            None => Path::new(tool).to_path_buf(),
        }
    }

    /// Run a hook tool and return its stdout.
    async fn run(&self, tool: &str, args: &[&str]) -> crate::Result<String> {
        let start = Instant::now();
        let program = self.program(tool);

        let mut cmd = tokio::process::Command::new(&program);
        cmd.args(args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            ProxyError::HookTool(
                tool.to_string(),
                format!("failed to spawn '{}': {}", program.display(), e),
            )
        })?;

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let output = tokio::select! {
            result = async {
                let mut stdout_bytes = Vec::new();
                let mut stderr_bytes = Vec::new();
                // Drain both pipes together so neither can fill and stall the tool.
                let (out, err) = tokio::join!(
                    async {
                        match stdout_pipe {
                            Some(mut out) => out.read_to_end(&mut stdout_bytes).await.map(|_| ()),
                            None => Ok(()),
                        }
                    },
                    async {
                        match stderr_pipe {
                            Some(mut err) => err.read_to_end(&mut stderr_bytes).await.map(|_| ()),
                            None => Ok(()),
                        }
                    },
                );
                out?;
                err?;
                let status = child.wait().await?;
                Ok::<_, std::io::Error>(std::process::Output {
                    status,
                    stdout: stdout_bytes,
                    stderr: stderr_bytes,
                })
            } => {
                result.map_err(|e| ProxyError::HookTool(
                    tool.to_string(),
                    format!("process I/O error: {}", e),
                ))?
            }
            _ = tokio::time::sleep(self.timeout) => {
                let _ = child.kill().await;
                return Err(ProxyError::HookToolTimeout(tool.to_string()));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);

        tracing::debug!(
            tool = %tool,
            args = ?args,
            exit_code = output.status.code().unwrap_or(-1),
            duration_ms = start.elapsed().as_millis() as u64,
            "hook tool invocation"
        );

        if !output.status.success() {
            let detail = match stderr.trim() {
                "" => output.status.to_string(),
                msg => msg.to_string(),
            };
            return Err(ProxyError::HookTool(tool.to_string(), detail));
        }

        Ok(stdout)
    }

    /// Run a hook tool with `--format=json` and decode its output.
    async fn run_json<T: DeserializeOwned>(&self, tool: &str, args: &[&str]) -> crate::Result<T> {
        let mut full_args = vec!["--format=json"];
        full_args.extend_from_slice(args);
        let stdout = self.run(tool, &full_args).await?;
        // Some tools print nothing at all for an empty result.
        let body = match stdout.trim() {
            "" => "null",
            body => body,
        };
        serde_json::from_str(body).map_err(|e| ProxyError::Decode(tool.to_string(), e.to_string()))
    }

    /// Application bucket of `app` on relation `id`.
    async fn app_data(&self, id: &str, app: &str) -> crate::Result<Databag> {
        let data: Option<Databag> = self
            .run_json("relation-get", &["-r", id, "--app", "-", app])
            .await?;
        Ok(data.unwrap_or_default())
    }
}

impl Runtime for HookTools {
    async fn is_leader(&self) -> crate::Result<bool> {
        self.run_json("is-leader", &[]).await
    }

    async fn charm_config(&self) -> crate::Result<CharmConfig> {
        let config: Option<CharmConfig> = self.run_json("config-get", &[]).await?;
        Ok(config.unwrap_or_default())
    }

    async fn relations(
        &self,
        integration: &str,
        leader: bool,
        skip: Option<&RelationId>,
    ) -> crate::Result<Vec<RelationHandle>> {
        let ids: Option<Vec<String>> = self.run_json("relation-ids", &[integration]).await?;

        let mut relations = Vec::new();
        for raw_id in ids.unwrap_or_default() {
            let id: RelationId = raw_id.parse()?;
            if skip == Some(&id) {
                tracing::debug!(relation = %id, "skipping relation being removed");
                continue;
            }
            let remote_app: Option<String> = self
                .run_json("relation-list", &["-r", raw_id.as_str(), "--app"])
                .await?;
            let remote_app = remote_app.filter(|app| !app.is_empty());

            let remote = match &remote_app {
                Some(app) => self.app_data(&raw_id, app).await?,
                None => Databag::new(),
            };
            // Only the leader may read its own application bucket.
            let local = if leader {
                self.app_data(&raw_id, &self.app).await?
            } else {
                Databag::new()
            };

            relations.push(RelationHandle::new(id, remote_app, local, remote));
        }

        tracing::debug!(
            integration = %integration,
            count = relations.len(),
            "collected joined relations"
        );
        Ok(relations)
    }

    async fn relation_set(&self, id: &RelationId, data: &Databag) -> crate::Result<()> {
        let raw_id = id.to_string();
        let pairs: Vec<String> = data.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        let mut args = vec!["-r", raw_id.as_str(), "--app"];
        args.extend(pairs.iter().map(String::as_str));
        self.run("relation-set", &args)
            .await
            .map_err(|e| ProxyError::RelationWrite(id.clone(), e.to_string()))?;
        Ok(())
    }

    async fn status_set(&self, report: &StatusReport) -> crate::Result<()> {
        // status-set cannot set error; that label belongs to the runtime.
        let status = match report.status {
            UnitStatus::Error => UnitStatus::Blocked,
            other => other,
        };
        self.run("status-set", &[status.as_str(), report.message.as_str()])
            .await?;
        Ok(())
    }
}

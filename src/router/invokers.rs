//! Concrete invocation paths.
//!
//! [`SdkInvoker`] spawns the SDK binary in oneshot mode and captures its
//! output. [`PromptInvoker`] is the non-SDK equivalent: it renders the
//! agent's definition file together with the workflow context into a
//! self-contained prompt, which the caller can hand to any completion
//! surface. Both bound their external waits so one slow invocation degrades
//! only itself.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;

use crate::config::{Config, RouterConfig, SdkConfig};
use crate::context::ContextRecord;
use crate::error::InvocationError;
use crate::router::AgentInvoker;

/// Render the instruction block shared by both paths.
fn context_prompt(agent: &str, record: &ContextRecord) -> String {
    let state = serde_json::to_string_pretty(&record.state).unwrap_or_else(|_| "{}".to_string());
    format!(
        "You are the '{agent}' agent for workflow {}.\nTask: {}\nShared state:\n{state}\n",
        record.workflow_id, record.task
    )
}

/// SDK-backed primary path: spawn the configured binary in oneshot mode.
pub struct SdkInvoker {
    binary: String,
    api_key: Option<SecretString>,
    timeout: Duration,
}

impl SdkInvoker {
    pub fn new(sdk: &SdkConfig, router: &RouterConfig) -> Self {
        Self {
            binary: sdk.binary.clone(),
            api_key: sdk.api_key.clone(),
            timeout: router.invoke_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.sdk, &config.router)
    }
}

#[async_trait]
impl AgentInvoker for SdkInvoker {
    fn path_name(&self) -> &str {
        "sdk"
    }

    async fn invoke(
        &self,
        agent: &str,
        record: &mut ContextRecord,
    ) -> Result<String, InvocationError> {
        let prompt = context_prompt(agent, record);

        let mut cmd = Command::new(&self.binary);
        cmd.arg("-p")
            .arg(&prompt)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref key) = self.api_key {
            cmd.env("ANTHROPIC_API_KEY", key.expose_secret());
        }

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                InvocationError::SdkUnavailable {
                    reason: format!("{} not found on PATH", self.binary),
                }
            } else {
                InvocationError::Failed {
                    path: "sdk".to_string(),
                    agent: agent.to_string(),
                    reason: format!("failed to spawn {}: {e}", self.binary),
                }
            }
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| InvocationError::Timeout {
                path: "sdk".to_string(),
                agent: agent.to_string(),
                timeout: self.timeout,
            })?
            .map_err(|e| InvocationError::Failed {
                path: "sdk".to_string(),
                agent: agent.to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InvocationError::Failed {
                path: "sdk".to_string(),
                agent: agent.to_string(),
                reason: format!("{} exited with {}: {}", self.binary, output.status, stderr.trim()),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        record.set_state(format!("output:{agent}"), stdout.clone());
        Ok(stdout)
    }
}

/// Prompt-based fallback path: render the agent definition plus workflow
/// context into a prompt and stash it on the record.
pub struct PromptInvoker {
    agents_dir: PathBuf,
}

impl PromptInvoker {
    pub fn new(agents_dir: impl Into<PathBuf>) -> Self {
        Self {
            agents_dir: agents_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.sdk.agents_dir.clone())
    }
}

#[async_trait]
impl AgentInvoker for PromptInvoker {
    fn path_name(&self) -> &str {
        "prompt"
    }

    async fn invoke(
        &self,
        agent: &str,
        record: &mut ContextRecord,
    ) -> Result<String, InvocationError> {
        let definition_path = self.agents_dir.join(format!("{agent}.md"));
        let definition = tokio::fs::read_to_string(&definition_path)
            .await
            .map_err(|e| InvocationError::Failed {
                path: "prompt".to_string(),
                agent: agent.to_string(),
                reason: format!(
                    "cannot read agent definition {}: {e}",
                    definition_path.display()
                ),
            })?;

        let prompt = format!("{definition}\n---\n{}", context_prompt(agent, record));
        record.set_state(format!("prompt:{agent}"), prompt.clone());
        tracing::debug!(agent, workflow_id = %record.workflow_id, "rendered prompt-based fallback");
        Ok(prompt)
    }
}

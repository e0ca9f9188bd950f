//! Adapter driving a real window manager through its control tools.
//!
//! This is the thin boundary layer for integration runs: window operations
//! go through a `windowctl`-style helper, snapshots come from a
//! `windowstack`-style dump, and the stacking signal is the raw
//! `_NET_CLIENT_LIST_STACKING` property read off the root window. All text
//! parsing stays here and in [`crate::snapshot::parse_stack_dump`]; nothing
//! past this module sees tool output.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;

use crate::channel::{CommandChannel, QueryChannel, WindowKind};
use crate::error::{HarnessError, HarnessResult};
use crate::registry::WindowHandle;
use crate::snapshot::{self, SnapshotScope, StackSnapshot, StackingSignal};

/// Paths and optional environment hooks for the tool adapter.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// The window-operation helper (`windowctl`).
    pub windowctl: PathBuf,
    /// The stack-dump helper (`windowstack`).
    pub windowstack: PathBuf,
    /// Property reader for the stacking signal.
    pub xprop: PathBuf,
    /// Environment initialization command line, run once before the
    /// scenario.
    pub init_cmd: Option<Vec<String>>,
    /// Ambient-setting restore command, run at cleanup; failure only warns.
    pub restore_cmd: Option<Vec<String>>,
}

impl ToolConfig {
    /// Config for the given helper binaries, with `xprop` from `PATH` and
    /// no init/restore hooks.
    pub fn new(windowctl: impl Into<PathBuf>, windowstack: impl Into<PathBuf>) -> Self {
        Self {
            windowctl: windowctl.into(),
            windowstack: windowstack.into(),
            xprop: PathBuf::from("xprop"),
            init_cmd: None,
            restore_cmd: None,
        }
    }
}

/// Channel implementation backed by external control tools.
pub struct ToolWindowManager {
    config: ToolConfig,
}

impl ToolWindowManager {
    /// Run the environment initialization hook (if any) and construct the
    /// adapter. A failing init is a setup failure: fatal, no checks run.
    pub async fn initialize(config: ToolConfig) -> HarnessResult<Self> {
        if let Some((cmd, args)) = config.init_cmd.as_deref().and_then(<[_]>::split_first) {
            let status = Command::new(cmd).args(args).status().await?;
            if !status.success() {
                return Err(HarnessError::Setup(format!(
                    "init command {cmd} exited with {status}"
                )));
            }
        }
        Ok(Self { config })
    }

    async fn ctl(&self, args: &[&str]) -> HarnessResult<String> {
        let output = Command::new(&self.config.windowctl)
            .args(args)
            .output()
            .await?;
        if !output.status.success() {
            return Err(HarnessError::Channel(format!(
                "windowctl {args:?} exited with {}",
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait(?Send)]
impl CommandChannel for ToolWindowManager {
    async fn create_window(
        &mut self,
        kind: WindowKind,
        transient_to: Option<&WindowHandle>,
    ) -> HarnessResult<WindowHandle> {
        let stdout = match (kind, transient_to) {
            (WindowKind::Application, _) => self.ctl(&["kn"]).await?,
            (WindowKind::Dialog, Some(parent)) => self.ctl(&["kd", parent.as_str()]).await?,
            (WindowKind::Dialog, None) => self.ctl(&["kd"]).await?,
        };
        let token = stdout
            .lines()
            .next()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or_else(|| {
                HarnessError::Channel("windowctl printed no window handle".into())
            })?;
        Ok(WindowHandle::new(token))
    }

    async fn iconify(&mut self, window: &WindowHandle) -> HarnessResult<()> {
        self.ctl(&["O", window.as_str()]).await.map(drop)
    }

    async fn activate(&mut self, window: &WindowHandle) -> HarnessResult<()> {
        self.ctl(&["A", window.as_str()]).await.map(drop)
    }

    async fn set_transient_for(
        &mut self,
        window: &WindowHandle,
        new_parent: &WindowHandle,
    ) -> HarnessResult<()> {
        self.ctl(&["t", window.as_str(), new_parent.as_str()])
            .await
            .map(drop)
    }

    async fn destroy_all(&mut self) -> HarnessResult<()> {
        let helper = self
            .config
            .windowctl
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "windowctl".to_string());
        // Test windows live in helper processes; killing them is cleanup.
        let status = Command::new("pkill").arg(&helper).status().await?;
        if !status.success() {
            tracing::warn!(%helper, "pkill found no test windows to clean up");
        }
        if let Some(restore) = &self.config.restore_cmd {
            if let Some((cmd, args)) = restore.split_first() {
                match Command::new(cmd).args(args).status().await {
                    Ok(status) if status.success() => {}
                    Ok(status) => {
                        tracing::warn!(%cmd, %status, "ambient-setting restore failed")
                    }
                    Err(err) => tracing::warn!(%cmd, %err, "ambient-setting restore failed"),
                }
            }
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl QueryChannel for ToolWindowManager {
    async fn stack_snapshot(&mut self, scope: SnapshotScope) -> HarnessResult<StackSnapshot> {
        let mut command = Command::new(&self.config.windowstack);
        if scope == SnapshotScope::CurrentMonitor {
            command.arg("m");
        }
        let output = command.output().await?;
        if !output.status.success() {
            return Err(HarnessError::Channel(format!(
                "windowstack exited with {}",
                output.status
            )));
        }
        Ok(snapshot::parse_stack_dump(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }

    async fn stacking_signal(&mut self) -> HarnessResult<StackingSignal> {
        let output = Command::new(&self.config.xprop)
            .args(["-root", "-notype", "_NET_CLIENT_LIST_STACKING"])
            .output()
            .await?;
        if !output.status.success() {
            return Err(HarnessError::Channel(format!(
                "xprop exited with {}",
                output.status
            )));
        }
        Ok(StackingSignal::new(
            String::from_utf8_lossy(&output.stdout).trim().to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_init(init: &[&str]) -> ToolConfig {
        let mut config = ToolConfig::new("windowctl", "windowstack");
        config.init_cmd = Some(init.iter().map(|s| s.to_string()).collect());
        config
    }

    #[tokio::test]
    async fn init_hook_takes_a_full_command_line() {
        let config = config_with_init(&["sh", "-c", "exit 0"]);
        assert!(ToolWindowManager::initialize(config).await.is_ok());
    }

    #[tokio::test]
    async fn failing_init_hook_is_a_setup_failure() {
        let config = config_with_init(&["sh", "-c", "exit 3"]);
        match ToolWindowManager::initialize(config).await {
            Err(HarnessError::Setup(reason)) => assert!(reason.contains("init command")),
            other => panic!("expected setup failure, got {:?}", other.map(|_| ())),
        }
    }
}

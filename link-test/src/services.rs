// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Control of the agent and qsfp_service processes on the switch under test.

use async_trait::async_trait;
use camino::Utf8Path;
use slog::debug;
use slog::error;
use slog::info;
use slog::Logger;
use tokio::process::Command;

use crate::config::ServiceConfig;
use crate::LinkTestError;

/// The services managed by the harness.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Service {
    Agent,
    Qsfp,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceControl: Send + Sync {
    async fn stop(&self, service: Service) -> Result<(), LinkTestError>;
    async fn start(&self, service: Service) -> Result<(), LinkTestError>;
    /// Make the named configuration the one the agent loads at startup.
    async fn use_agent_config(&self, name: &str) -> Result<(), LinkTestError>;
    /// Remove state the services persist across restarts.
    async fn clear_state(&self) -> Result<(), LinkTestError>;
}

/// Manages the services through systemd.
pub struct SystemdServices {
    log: Logger,
    config: ServiceConfig,
}

impl SystemdServices {
    pub fn new(log: Logger, config: ServiceConfig) -> Self {
        SystemdServices { log, config }
    }

    fn unit(&self, service: Service) -> &str {
        match service {
            Service::Agent => &self.config.agent_unit,
            Service::Qsfp => &self.config.qsfp_unit,
        }
    }

    async fn systemctl(
        &self,
        verb: &str,
        service: Service,
    ) -> Result<(), LinkTestError> {
        let unit = self.unit(service);
        let args = vec![verb, unit];
        debug!(self.log, "{} {}", self.config.systemctl, args.join(" "));
        let out = Command::new(&self.config.systemctl)
            .args(&args)
            .output()
            .await
            .map_err(|e| service_error(&self.config.systemctl, verb, unit, e))?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            error!(self.log, "failed to {verb} {unit}: {stderr}");
            return Err(service_error(
                &self.config.systemctl,
                verb,
                unit,
                stderr.trim(),
            ));
        }
        info!(self.log, "{verb} {unit}");
        Ok(())
    }
}

fn service_error(
    cmd: &Utf8Path,
    verb: &str,
    unit: &str,
    reason: impl ToString,
) -> LinkTestError {
    LinkTestError::Service {
        command: format!("{cmd} {verb} {unit}"),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl ServiceControl for SystemdServices {
    async fn stop(&self, service: Service) -> Result<(), LinkTestError> {
        self.systemctl("stop", service).await
    }

    async fn start(&self, service: Service) -> Result<(), LinkTestError> {
        self.systemctl("start", service).await
    }

    async fn use_agent_config(&self, name: &str) -> Result<(), LinkTestError> {
        let src = self.config.agent_config_dir.join(name);
        let dst = &self.config.agent_config_path;
        tokio::fs::copy(&src, dst).await.map_err(|e| {
            LinkTestError::Service {
                command: format!("cp {src} {dst}"),
                reason: e.to_string(),
            }
        })?;
        info!(self.log, "using agent config {name}"; "path" => %src);
        Ok(())
    }

    async fn clear_state(&self) -> Result<(), LinkTestError> {
        for dir in &self.config.state_dirs {
            match tokio::fs::remove_dir_all(dir).await {
                Ok(()) => debug!(self.log, "removed {dir}"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(LinkTestError::Service {
                        command: format!("rm -r {dir}"),
                        reason: e.to_string(),
                    })
                }
            }
        }
        Ok(())
    }
}

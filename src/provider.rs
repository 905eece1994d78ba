//! Convergence engine for one Homebrew package resource

use std::sync::Arc;
use tracing::debug;

use crate::checksum;
use crate::environment::{EnvironmentResolver, HostIdentity, SystemIdentity};
use crate::error::ProviderError;
use crate::exec::{self, CommandRunner, SystemCommandRunner};
use crate::facts;
use crate::query::QueryService;
use crate::types::{Ensure, InstallOutcome, PackageSpec};

/// Action the engine took to converge one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    Installed,
    Upgraded,
    Removed,
    Unchanged,
}

impl Convergence {
    pub fn changed(&self) -> bool {
        !matches!(self, Convergence::Unchanged)
    }
}

/// Per-resource state machine driving brew towards the desired state.
pub struct BrewProvider {
    runner: Arc<dyn CommandRunner>,
    resolver: Arc<EnvironmentResolver>,
    query: QueryService,
    arch_emulation: bool,
}

impl BrewProvider {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        identity: Arc<dyn SystemIdentity>,
        arch_emulation: bool,
    ) -> Self {
        let resolver = Arc::new(EnvironmentResolver::new(exec::brew_command(), identity));
        let query = QueryService::new(runner.clone(), resolver.clone(), arch_emulation);
        Self {
            runner,
            resolver,
            query,
            arch_emulation,
        }
    }

    /// Provider wired against the live host. Refuses to build anywhere but
    /// macOS; this is the registration gate for the provider.
    pub async fn for_host() -> Result<Self, ProviderError> {
        if !cfg!(target_os = "macos") {
            return Err(ProviderError::UnsupportedPlatform);
        }
        let arch_emulation = facts::has_arm64().await;
        Ok(Self::new(
            Arc::new(SystemCommandRunner::new()),
            Arc::new(HostIdentity),
            arch_emulation,
        ))
    }

    pub fn query(&self) -> &QueryService {
        &self.query
    }

    fn argv(&self, args: &[&str]) -> Vec<String> {
        exec::brew_argv(self.resolver.brew_path(), args)
    }

    /// Converge actual state to `spec.ensure`. Exactly one of install,
    /// upgrade, uninstall or nothing is driven per attempt.
    pub async fn converge(&self, spec: &PackageSpec) -> Result<Convergence, ProviderError> {
        let installed = self.query.installed_version(spec).await?;

        match (&spec.ensure, installed) {
            (Ensure::Absent, Some(_)) => {
                self.uninstall(spec).await?;
                Ok(Convergence::Removed)
            }
            (Ensure::Absent, None) => Ok(Convergence::Unchanged),
            // Upgrade is re-invoked unconditionally; brew's own idempotence
            // decides whether anything changes.
            (Ensure::Latest, Some(_)) => {
                debug!("Upgrading {}", spec.resource_name());
                self.upgrade(spec).await?;
                Ok(Convergence::Upgraded)
            }
            (Ensure::Latest, None) => {
                debug!("Installing {}", spec.resource_name());
                self.install(spec).await?;
                Ok(Convergence::Installed)
            }
            (Ensure::Present | Ensure::Version(_), None) => {
                self.install(spec).await?;
                Ok(Convergence::Installed)
            }
            (Ensure::Version(version), Some(record)) => {
                // brew lists every installed version space-separated.
                let pinned = version.to_lowercase();
                if record.version.split_whitespace().any(|v| v == pinned) {
                    Ok(Convergence::Unchanged)
                } else {
                    self.install(spec).await?;
                    Ok(Convergence::Installed)
                }
            }
            (Ensure::Present, Some(_)) => Ok(Convergence::Unchanged),
        }
    }

    /// Install after the verification lookup. A failing lookup aborts the
    /// whole install rather than attempting it blindly.
    pub async fn install(&self, spec: &PackageSpec) -> Result<(), ProviderError> {
        let install_name = spec.install_name();
        debug!("Looking for {install_name} package...");
        let ctx = self.resolver.resolve(self.arch_emulation)?;
        let argv = self.argv(&["info", &install_name]);
        if self.runner.run(&argv, &ctx, false, true).await.is_err() {
            return Err(ProviderError::PackageNotFound { name: install_name });
        }

        debug!("Package found, installing...");
        self.do_install(spec).await
    }

    /// One install with the single checksum-mismatch retry.
    async fn do_install(&self, spec: &PackageSpec) -> Result<(), ProviderError> {
        match self.install_attempt(spec).await? {
            InstallOutcome::Success => Ok(()),
            InstallOutcome::ToolFailure(detail) => Err(ProviderError::InstallFailed {
                package: spec.install_name(),
                error: detail,
            }),
            InstallOutcome::ChecksumMismatch(files) => {
                debug!("Fixing checksum error...");
                checksum::scrub(&files).await?;
                match self.install_attempt(spec).await? {
                    InstallOutcome::Success => Ok(()),
                    InstallOutcome::ToolFailure(detail) => Err(ProviderError::InstallFailed {
                        package: spec.install_name(),
                        error: detail,
                    }),
                    InstallOutcome::ChecksumMismatch(files) => {
                        Err(ProviderError::InstallFailed {
                            package: spec.install_name(),
                            error: format!(
                                "Checksum error for package {} in files {:?}",
                                spec.install_name(),
                                files
                            ),
                        })
                    }
                }
            }
        }
    }

    async fn install_attempt(&self, spec: &PackageSpec) -> Result<InstallOutcome, ProviderError> {
        let ctx = self.resolver.resolve(self.arch_emulation)?;
        let mut argv = vec![
            self.resolver.brew_path().display().to_string(),
            "install".to_string(),
            spec.install_name(),
        ];
        argv.extend(spec.install_options.iter().cloned());

        match self.runner.run(&argv, &ctx, true, true).await {
            Ok(output) => match checksum::detect(&output.stdout) {
                Some(files) => Ok(InstallOutcome::ChecksumMismatch(files)),
                None => Ok(InstallOutcome::Success),
            },
            Err(failure) => Ok(InstallOutcome::ToolFailure(failure.to_string())),
        }
    }

    pub async fn upgrade(&self, spec: &PackageSpec) -> Result<(), ProviderError> {
        let name = spec.resource_name();
        let ctx = self.resolver.resolve(self.arch_emulation)?;
        let argv = self.argv(&["upgrade", &name]);
        self.runner
            .run(&argv, &ctx, true, true)
            .await
            .map_err(|e| ProviderError::UpgradeFailed {
                package: name,
                error: e.to_string(),
            })?;
        Ok(())
    }

    pub async fn uninstall(&self, spec: &PackageSpec) -> Result<(), ProviderError> {
        let name = spec.resource_name();
        debug!("Uninstalling {name}");
        let ctx = self.resolver.resolve(self.arch_emulation)?;
        let argv = self.argv(&["uninstall", &name]);
        self.runner
            .run(&argv, &ctx, true, true)
            .await
            .map_err(|e| ProviderError::UninstallFailed {
                package: name,
                error: e.to_string(),
            })?;
        Ok(())
    }

    /// The ensure=latest path: install when absent, otherwise upgrade
    /// unconditionally.
    pub async fn update(&self, spec: &PackageSpec) -> Result<Convergence, ProviderError> {
        if self.query.installed_version(spec).await?.is_some() {
            debug!("Upgrading {}", spec.resource_name());
            self.upgrade(spec).await?;
            Ok(Convergence::Upgraded)
        } else {
            debug!("Installing {}", spec.resource_name());
            self.install(spec).await?;
            Ok(Convergence::Installed)
        }
    }
}

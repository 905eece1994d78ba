//! Installed and candidate version lookups

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::environment::EnvironmentResolver;
use crate::error::ProviderError;
use crate::exec::{brew_argv, CommandRunner};
use crate::parse;
use crate::types::{PackageRecord, PackageSpec};

/// One formula record out of `brew info --json`
#[derive(Debug, Deserialize)]
struct FormulaInfo {
    name: String,
    versions: FormulaVersions,
}

#[derive(Debug, Deserialize)]
struct FormulaVersions {
    stable: Option<String>,
}

/// Answers "is package P installed, and at what version?" and "what is the
/// latest available version of P?" through the environment resolver and the
/// output parser.
pub struct QueryService {
    runner: Arc<dyn CommandRunner>,
    resolver: Arc<EnvironmentResolver>,
    arch_emulation: bool,
}

impl QueryService {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        resolver: Arc<EnvironmentResolver>,
        arch_emulation: bool,
    ) -> Self {
        Self {
            runner,
            resolver,
            arch_emulation,
        }
    }

    /// Installed version of one package, `None` when it is not installed.
    pub async fn installed_version(
        &self,
        spec: &PackageSpec,
    ) -> Result<Option<PackageRecord>, ProviderError> {
        let name = spec.resource_name();
        debug!("Listing installed packages");
        let ctx = self.resolver.resolve(self.arch_emulation)?;
        let argv = brew_argv(self.resolver.brew_path(), &["list", "--versions", &name]);
        let output = self
            .runner
            .run(&argv, &ctx, false, false)
            .await
            .map_err(|e| ProviderError::ListFailed {
                error: e.to_string(),
            })?;
        Ok(parse::parse_single_match(&output.stdout, &name))
    }

    /// Everything brew reports as installed.
    pub async fn installed_packages(&self) -> Result<Vec<PackageRecord>, ProviderError> {
        debug!("Listing installed packages");
        let ctx = self.resolver.resolve(self.arch_emulation)?;
        let argv = brew_argv(self.resolver.brew_path(), &["list", "--versions"]);
        let output = self
            .runner
            .run(&argv, &ctx, false, false)
            .await
            .map_err(|e| ProviderError::ListFailed {
                error: e.to_string(),
            })?;
        Ok(parse::parse_list_output(&output.stdout))
    }

    /// Latest available stable version of one package.
    pub async fn latest_version(&self, spec: &PackageSpec) -> Result<String, ProviderError> {
        let name = spec.resource_name();
        let ctx = self.resolver.resolve(self.arch_emulation)?;
        let argv = brew_argv(self.resolver.brew_path(), &["info", "--json", &name]);
        let output = self
            .runner
            .run(&argv, &ctx, false, false)
            .await
            .map_err(|e| ProviderError::InfoFailed {
                name: name.clone(),
                error: e.to_string(),
            })?;

        let formulae: Vec<FormulaInfo> =
            serde_json::from_str(&output.stdout).map_err(|e| ProviderError::InfoFailed {
                name: name.clone(),
                error: e.to_string(),
            })?;

        if formulae.is_empty() {
            debug!("Package {name} not found");
            return Err(ProviderError::PackageNotFound { name });
        }
        if formulae.len() > 1 {
            warn!("Multiple matches for package {name} - using first one found");
        }

        let formula = &formulae[0];
        debug!("Found package {}", formula.name);
        formula
            .versions
            .stable
            .clone()
            .ok_or(ProviderError::PackageNotFound { name })
    }
}

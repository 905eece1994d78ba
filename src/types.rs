//! Desired and actual package state types

use std::path::PathBuf;

use crate::error::ProviderError;

/// Desired installation state for one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ensure {
    Present,
    Absent,
    Latest,
    /// An explicit version string; brew defines the version syntax
    Version(String),
}

impl Ensure {
    pub fn parse(value: &str) -> Ensure {
        match value {
            "present" | "installed" | "true" => Ensure::Present,
            "absent" | "removed" => Ensure::Absent,
            "latest" => Ensure::Latest,
            other => Ensure::Version(other.to_string()),
        }
    }
}

/// Desired state for one package resource, as handed over by the
/// surrounding agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    name: String,
    pub ensure: Ensure,
    pub install_options: Vec<String>,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>, ensure: Ensure) -> Result<Self, ProviderError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ProviderError::EmptyPackageName);
        }
        Ok(Self {
            name,
            ensure,
            install_options: Vec::new(),
        })
    }

    pub fn with_install_options(mut self, options: Vec<String>) -> Self {
        self.install_options = options;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier brew sees. URL-form names are opaque and case-sensitive;
    /// everything else is normalized to lowercase.
    pub fn resource_name(&self) -> String {
        if self.name.starts_with("http://") || self.name.starts_with("https://") {
            self.name.clone()
        } else {
            self.name.to_lowercase()
        }
    }

    /// Install target handed to `brew install`, `name@version` when an
    /// explicit version is pinned.
    pub fn install_name(&self) -> String {
        match &self.ensure {
            Ensure::Version(version) => {
                format!("{}@{}", self.resource_name(), version.to_lowercase())
            }
            _ => self.resource_name(),
        }
    }
}

/// Actual state of one installed package as reported by brew. Produced
/// fresh on every query, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
}

/// Result of one install attempt, driving the retry-once semantics of the
/// convergence engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Success,
    ChecksumMismatch(Vec<PathBuf>),
    ToolFailure(String),
}

use thiserror::Error;

/// Errors raised while constructing the execution environment for brew
#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error("Homebrew does not support installations owned by the \"root\" user. Please check the permissions of {path}")]
    RootOwnedInstallation { path: String },

    #[error("No passwd entry for brew owner uid {uid}")]
    UnknownOwner { uid: u32 },

    #[error("Could not stat {path}: {error}")]
    Stat { path: String, error: String },
}

/// Errors from the external command invocation itself
#[derive(Error, Debug)]
pub enum ExecutionFailure {
    #[error("Failed to execute '{command}': {error}")]
    Spawn { command: String, error: String },

    #[error("Execution of '{command}' returned {code}: {output}")]
    NonZeroExit {
        command: String,
        code: i32,
        output: String,
    },
}

/// Reconciliation-level errors surfaced to the caller
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Package name must not be empty")]
    EmptyPackageName,

    #[error("The Homebrew provider is only supported on macOS hosts")]
    UnsupportedPlatform,

    #[error("Could not find package: {name}")]
    PackageNotFound { name: String },

    #[error("Could not list packages: {error}")]
    ListFailed { error: String },

    #[error("Could not read package info for {name}: {error}")]
    InfoFailed { name: String, error: String },

    #[error("Could not install package {package}: {error}")]
    InstallFailed { package: String, error: String },

    #[error("Could not upgrade package {package}: {error}")]
    UpgradeFailed { package: String, error: String },

    #[error("Could not uninstall package {package}: {error}")]
    UninstallFailed { package: String, error: String },

    #[error("Could not remove mismatched checksum file {path}: {error}")]
    ChecksumScrubFailed { path: String, error: String },

    #[error(transparent)]
    Environment(#[from] EnvironmentError),
}

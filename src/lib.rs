//! Homebrew package state provider
//!
//! Reconciles the desired installation state of a named package against the
//! state Homebrew reports, and drives the minimal set of brew invocations
//! (install, upgrade, uninstall) needed to converge the two. Designed as
//! one resource-type provider inside a larger configuration-management
//! agent; the agent supplies a [`PackageSpec`] per resource and receives a
//! [`Convergence`] outcome or a [`ProviderError`].

pub mod checksum;
pub mod environment;
pub mod error;
pub mod exec;
pub mod facts;
pub mod parse;
pub mod provider;
pub mod query;
pub mod types;

pub use error::{EnvironmentError, ExecutionFailure, ProviderError};
pub use provider::{BrewProvider, Convergence};
pub use query::QueryService;
pub use types::{Ensure, InstallOutcome, PackageRecord, PackageSpec};

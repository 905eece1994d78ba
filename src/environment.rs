//! Execution environment construction for brew invocations

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::EnvironmentError;

/// uid/gid the subprocess should run as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingUser {
    pub uid: u32,
    pub gid: u32,
}

/// Environment under which one external invocation runs. Recomputed per
/// invocation; ownership of the brew binary can change underneath us.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Explicit uid/gid for the subprocess, only set when the caller runs
    /// privileged and must drop to the binary owner.
    pub working_user: Option<WorkingUser>,
    /// HOME override; brew keys its cache and config off this.
    pub home: PathBuf,
    pub extra_env: HashMap<String, String>,
    /// Leading argv tokens, e.g. an architecture-emulation wrapper.
    pub command_prefix: Vec<String>,
}

/// Host identity lookups the resolver depends on. An explicit seam so
/// behavior is deterministic and testable without a live host.
pub trait SystemIdentity: Send + Sync {
    /// Owning uid/gid of a file on disk.
    fn file_owner(&self, path: &Path) -> Result<(u32, u32), EnvironmentError>;
    /// Home directory of a uid, from the passwd database.
    fn home_for_uid(&self, uid: u32) -> Option<PathBuf>;
    /// Effective uid of the calling process.
    fn effective_uid(&self) -> u32;
}

/// Identity lookups against the live host
pub struct HostIdentity;

#[cfg(unix)]
impl SystemIdentity for HostIdentity {
    fn file_owner(&self, path: &Path) -> Result<(u32, u32), EnvironmentError> {
        use std::os::unix::fs::MetadataExt;

        let metadata = std::fs::metadata(path).map_err(|e| EnvironmentError::Stat {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Ok((metadata.uid(), metadata.gid()))
    }

    fn home_for_uid(&self, uid: u32) -> Option<PathBuf> {
        nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid))
            .ok()
            .flatten()
            .map(|user| user.dir)
    }

    fn effective_uid(&self) -> u32 {
        nix::unistd::geteuid().as_raw()
    }
}

/// Computes the [`ExecutionContext`] for every brew invocation.
pub struct EnvironmentResolver {
    brew_path: PathBuf,
    identity: Arc<dyn SystemIdentity>,
}

impl EnvironmentResolver {
    pub fn new(brew_path: PathBuf, identity: Arc<dyn SystemIdentity>) -> Self {
        Self {
            brew_path,
            identity,
        }
    }

    pub fn brew_path(&self) -> &Path {
        &self.brew_path
    }

    /// Resolve the environment for one invocation. Fails before anything is
    /// executed when the brew binary is owned by root; brew refuses to
    /// operate out of root-owned installations.
    pub fn resolve(&self, has_arch_emulation: bool) -> Result<ExecutionContext, EnvironmentError> {
        let (owner_uid, owner_gid) = self.identity.file_owner(&self.brew_path)?;

        if owner_uid == 0 {
            return Err(EnvironmentError::RootOwnedInstallation {
                path: self.brew_path.display().to_string(),
            });
        }

        let home = self
            .identity
            .home_for_uid(owner_uid)
            .ok_or(EnvironmentError::UnknownOwner { uid: owner_uid })?;

        // uid/gid can only be dropped when running as root; otherwise the
        // subprocess inherits the caller's identity.
        let working_user = (self.identity.effective_uid() == 0).then_some(WorkingUser {
            uid: owner_uid,
            gid: owner_gid,
        });

        let mut extra_env = HashMap::new();
        let mut command_prefix = Vec::new();
        if has_arch_emulation {
            extra_env.insert("HOMEBREW_CHANGE_ARCH_TO_ARM".to_string(), "1".to_string());
            command_prefix = vec!["arch".to_string(), "-arm64".to_string()];
        }

        Ok(ExecutionContext {
            working_user,
            home,
            extra_env,
            command_prefix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubIdentity {
        owner: (u32, u32),
        euid: u32,
    }

    impl SystemIdentity for StubIdentity {
        fn file_owner(&self, _path: &Path) -> Result<(u32, u32), EnvironmentError> {
            Ok(self.owner)
        }

        fn home_for_uid(&self, uid: u32) -> Option<PathBuf> {
            Some(PathBuf::from(format!("/Users/user{uid}")))
        }

        fn effective_uid(&self) -> u32 {
            self.euid
        }
    }

    fn resolver(owner: (u32, u32), euid: u32) -> EnvironmentResolver {
        EnvironmentResolver::new(
            PathBuf::from("/opt/homebrew/bin/brew"),
            Arc::new(StubIdentity { owner, euid }),
        )
    }

    #[test]
    fn root_owned_binary_is_rejected() {
        let result = resolver((0, 0), 501).resolve(false);
        assert!(matches!(
            result,
            Err(EnvironmentError::RootOwnedInstallation { .. })
        ));
    }

    #[test]
    fn privileged_caller_drops_to_binary_owner() {
        let ctx = resolver((501, 20), 0).resolve(false).unwrap();
        assert_eq!(ctx.working_user, Some(WorkingUser { uid: 501, gid: 20 }));
        assert_eq!(ctx.home, PathBuf::from("/Users/user501"));
    }

    #[test]
    fn unprivileged_caller_inherits_identity() {
        let ctx = resolver((501, 20), 501).resolve(false).unwrap();
        assert_eq!(ctx.working_user, None);
    }

    #[test]
    fn arch_emulation_sets_env_and_prefix() {
        let ctx = resolver((501, 20), 501).resolve(true).unwrap();
        assert_eq!(
            ctx.extra_env.get("HOMEBREW_CHANGE_ARCH_TO_ARM"),
            Some(&"1".to_string())
        );
        assert_eq!(ctx.command_prefix, vec!["arch", "-arm64"]);
    }

    #[test]
    fn no_emulation_leaves_prefix_empty() {
        let ctx = resolver((501, 20), 501).resolve(false).unwrap();
        assert!(ctx.extra_env.is_empty());
        assert!(ctx.command_prefix.is_empty());
    }
}

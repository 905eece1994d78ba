//! Shared fakes for provider integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use homebrew_provider::environment::{ExecutionContext, SystemIdentity};
use homebrew_provider::error::{EnvironmentError, ExecutionFailure};
use homebrew_provider::exec::{CommandOutput, CommandRunner};

enum Scripted {
    Output { stdout: String, code: i32 },
    SpawnFailure(String),
}

/// Command runner fed from a scripted response queue, recording every argv
/// it is asked to run.
pub struct FakeRunner {
    calls: Mutex<Vec<Vec<String>>>,
    combine_flags: Mutex<Vec<bool>>,
    responses: Mutex<VecDeque<Scripted>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            combine_flags: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push_output(&self, stdout: &str) {
        self.push_exit(stdout, 0);
    }

    pub fn push_exit(&self, stdout: &str, code: i32) {
        self.responses.lock().unwrap().push_back(Scripted::Output {
            stdout: stdout.to_string(),
            code,
        });
    }

    pub fn push_spawn_failure(&self, error: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Scripted::SpawnFailure(error.to_string()));
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// The combine-streams flag of each recorded invocation.
    pub fn combine_flags(&self) -> Vec<bool> {
        self.combine_flags.lock().unwrap().clone()
    }

    /// The brew subcommand of each recorded invocation.
    pub fn subcommands(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|argv| argv.get(1).cloned().unwrap_or_default())
            .collect()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(
        &self,
        argv: &[String],
        _ctx: &ExecutionContext,
        combine: bool,
        fail_on_failure: bool,
    ) -> Result<CommandOutput, ExecutionFailure> {
        self.calls.lock().unwrap().push(argv.to_vec());
        self.combine_flags.lock().unwrap().push(combine);
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected brew invocation");
        match next {
            Scripted::Output { stdout, code } => {
                if fail_on_failure && code != 0 {
                    Err(ExecutionFailure::NonZeroExit {
                        command: argv.join(" "),
                        code,
                        output: stdout,
                    })
                } else {
                    Ok(CommandOutput {
                        stdout,
                        exit_code: code,
                    })
                }
            }
            Scripted::SpawnFailure(error) => Err(ExecutionFailure::Spawn {
                command: argv.join(" "),
                error,
            }),
        }
    }
}

/// Identity database with fixed answers.
pub struct FakeIdentity {
    pub owner_uid: u32,
    pub owner_gid: u32,
    pub euid: u32,
}

impl FakeIdentity {
    pub fn unprivileged() -> Self {
        Self {
            owner_uid: 501,
            owner_gid: 20,
            euid: 501,
        }
    }

    pub fn root_owned_brew() -> Self {
        Self {
            owner_uid: 0,
            owner_gid: 0,
            euid: 501,
        }
    }
}

impl SystemIdentity for FakeIdentity {
    fn file_owner(&self, _path: &Path) -> Result<(u32, u32), EnvironmentError> {
        Ok((self.owner_uid, self.owner_gid))
    }

    fn home_for_uid(&self, uid: u32) -> Option<PathBuf> {
        Some(PathBuf::from(format!("/Users/user{uid}")))
    }

    fn effective_uid(&self) -> u32 {
        self.euid
    }
}

pub mod bump_emsdk;
pub mod bump_msbuild;
pub mod eng_sync;
pub mod mono_addin;
pub mod sdk_versions;

use crate::error::Result;
use crate::github::{ClientConfig, GitHub};
use crate::steps::publish::PublishSettings;
use crate::verify::{repo_name, require, validate_repo_slug};
use clap::{Args, Subcommand};

#[derive(Subcommand)]
pub enum Command {
    /// Sync eng/ version manifests of an msbuild fork from the toolset repository
    EngSync(eng_sync::EngSyncArgs),

    /// Bump the msbuild revision pinned in mono and open or update the pull request
    BumpMsbuild(bump_msbuild::BumpMsbuildArgs),

    /// Print the nuget.exe, SDK and Roslyn versions a mono branch corresponds to
    SdkVersions(sdk_versions::SdkVersionsArgs),

    /// Bump the Emscripten docker image used by the runtime's pipelines
    BumpEmsdk(bump_emsdk::BumpEmsdkArgs),

    /// Convert a mono package artifacts listing into an addin "mono external" record
    MonoAddin(mono_addin::MonoAddinArgs),
}

impl Command {
    pub fn execute(self) -> Result<()> {
        match self {
            Command::EngSync(args) => eng_sync::execute(args),
            Command::BumpMsbuild(args) => bump_msbuild::execute(args),
            Command::SdkVersions(args) => sdk_versions::execute(args),
            Command::BumpEmsdk(args) => bump_emsdk::execute(args),
            Command::MonoAddin(args) => mono_addin::execute(args),
        }
    }
}

/// Options shared by every command that pushes a branch and opens a pull request.
#[derive(Args, Debug, Clone, Default)]
pub struct PublishArgs {
    /// GitHub personal access token
    #[arg(long, short = 't', env = "GITHUB_TOKEN", hide_env_values = true)]
    pub pat: Option<String>,

    /// Push with --dry-run and do not create pull requests
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// GitHub user name the pull requests are created from
    #[arg(long, value_name = "USER")]
    pub git_user_name: Option<String>,

    /// Remote of the user's fork in the working directory [default: --git-user-name]
    #[arg(long, value_name = "REMOTE")]
    pub remote_name: Option<String>,

    /// Remote of the upstream repository in the working directory
    #[arg(long, value_name = "REMOTE", default_value = "origin")]
    pub origin_name: String,

    /// The user's fork, as owner/name [default: <git-user-name>/<upstream name>]
    #[arg(long, value_name = "REPO")]
    pub fork_repo: Option<String>,

    /// Comma separated list of reviewer user names
    #[arg(long, short = 'r', value_delimiter = ',')]
    pub reviewers: Vec<String>,

    /// Allow resetting a working directory that has uncommitted changes
    #[arg(long)]
    pub allow_dirty: bool,
}

impl PublishArgs {
    /// User name, falling back to the remote name.
    pub fn user(&self) -> Option<&str> {
        self.git_user_name
            .as_deref()
            .or(self.remote_name.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    /// Remote name, falling back to the user name.
    pub fn remote(&self) -> Option<&str> {
        self.remote_name
            .as_deref()
            .or(self.git_user_name.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    pub fn token(&self) -> Option<String> {
        self.pat.clone().filter(|t| !t.trim().is_empty())
    }

    /// Checks remote, user and token requirements.
    pub fn validate(&self) -> Result<()> {
        let reason = "remote name and remote user name are required";
        require("--git-user-name", self.user(), reason)?;
        require("--remote-name", self.remote(), reason)?;

        if !self.dry_run {
            require(
                "--pat",
                self.token().as_deref(),
                "GitHub personal access token required to create pull requests",
            )?;
        }

        if let Some(fork) = &self.fork_repo {
            validate_repo_slug("--fork-repo", fork)?;
        }
        Ok(())
    }

    /// Settings for publishing against `upstream_repo`.
    pub fn settings(&self, upstream_repo: &str) -> Result<PublishSettings> {
        let reason = "remote name and remote user name are required";
        let user = require("--git-user-name", self.user(), reason)?.to_string();
        let push_remote = require("--remote-name", self.remote(), reason)?.to_string();

        let fork_repo = self
            .fork_repo
            .clone()
            .unwrap_or_else(|| format!("{}/{}", user, repo_name(upstream_repo)));

        Ok(PublishSettings {
            user,
            push_remote,
            origin_remote: self.origin_name.clone(),
            fork_repo,
            reviewers: self
                .reviewers
                .iter()
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
            dry_run: self.dry_run,
        })
    }

    pub fn client(&self) -> Result<GitHub> {
        GitHub::new(ClientConfig::default().with_token(self.token()))
    }
}

/// GitHub client for read-only commands; uses `GITHUB_TOKEN` when set.
pub(crate) fn read_only_client() -> Result<GitHub> {
    let token = std::env::var("GITHUB_TOKEN").ok();
    GitHub::new(ClientConfig::default().with_token(token))
}

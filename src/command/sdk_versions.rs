use super::read_only_client;
use crate::error::{BumpError, Result};
use crate::github::{ContentSource, resolve_reference};
use crate::manifest::{DependencyRecord, ROSLYN_PACKAGE_PROPERTY, parse_dependencies, parse_properties};
use crate::rewrite::{MSBUILD_PY_REVISION, NUGET_EXE_VERSION, capture_group};
use crate::steps::msbuild::{MSBUILD_PY_PATH, NUGET_PY_PATH};
use crate::steps::sync::{VERSION_DETAILS_PATH, VERSIONS_PROPS_PATH};
use crate::verify::validate_repo_slug;
use clap::Parser;
use colored::Colorize;

#[derive(Parser, Debug, Clone)]
pub struct SdkVersionsArgs {
    /// Mono repository
    #[arg(long, default_value = "mono/mono")]
    pub mono_repo: String,

    /// Mono branch or commit sha
    #[arg(long, default_value = "master")]
    pub mono_branch: String,

    /// msbuild repository
    #[arg(long, default_value = "mono/msbuild")]
    pub msbuild_repo: String,

    /// msbuild branch or commit sha [default: the revision mono pins]
    #[arg(long)]
    pub msbuild_branch: Option<String>,
}

/// Versions a mono branch corresponds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkReport {
    pub mono_repo: String,
    pub mono_branch: String,
    pub mono_commit: String,
    pub nuget_exe: Option<String>,
    pub msbuild_ref: String,
    pub sdks: Vec<DependencyRecord>,
    pub roslyn: Option<String>,
}

impl SdkReport {
    pub fn print(&self) {
        println!(
            "From mono repo {}, branch {} at commit {}:",
            self.mono_repo, self.mono_branch, self.mono_commit
        );
        println!("nuget.exe: {}", self.nuget_exe.as_deref().unwrap_or_default());
        println!("\nFrom msbuild commit: {}", self.msbuild_ref);
        println!("{}", "-- SDKs --".bold());
        for sdk in &self.sdks {
            println!("{}: {}", sdk.name, sdk.version);
        }
        println!();
        println!(
            "Roslyn version in msbuild (only for building): {}",
            self.roslyn.as_deref().unwrap_or("Not found!")
        );
    }
}

pub fn collect(source: &dyn ContentSource, args: &SdkVersionsArgs) -> Result<SdkReport> {
    let mono_commit = resolve_reference(source, &args.mono_repo, &args.mono_branch)?;

    let nuget_py = source.get_raw(&args.mono_repo, &mono_commit, NUGET_PY_PATH)?;
    let nuget_exe = capture_group(&nuget_py, NUGET_EXE_VERSION)?;
    if nuget_exe.is_none() {
        log::warn!("No nuget.exe version in {}", NUGET_PY_PATH);
    }

    let msbuild_ref = match &args.msbuild_branch {
        Some(reference) => reference.clone(),
        None => {
            let msbuild_py = source.get_raw(&args.mono_repo, &mono_commit, MSBUILD_PY_PATH)?;
            capture_group(&msbuild_py, MSBUILD_PY_REVISION)?
                .filter(|r| !r.is_empty())
                .ok_or_else(|| {
                    BumpError::KeyNotFound(format!(
                        "msbuild reference in {}@{}:{}",
                        args.mono_repo, mono_commit, MSBUILD_PY_PATH
                    ))
                })?
        }
    };

    let (details, versions) = rayon::join(
        || source.get_raw(&args.msbuild_repo, &msbuild_ref, VERSION_DETAILS_PATH),
        || source.get_raw(&args.msbuild_repo, &msbuild_ref, VERSIONS_PROPS_PATH),
    );
    let sdks = parse_dependencies(&details?)?.into_values().collect();
    let roslyn = parse_properties(&versions?)?.remove(ROSLYN_PACKAGE_PROPERTY);

    Ok(SdkReport {
        mono_repo: args.mono_repo.clone(),
        mono_branch: args.mono_branch.clone(),
        mono_commit,
        nuget_exe,
        msbuild_ref,
        sdks,
        roslyn,
    })
}

pub fn execute(args: SdkVersionsArgs) -> Result<()> {
    validate_repo_slug("--mono-repo", &args.mono_repo)?;
    validate_repo_slug("--msbuild-repo", &args.msbuild_repo)?;

    let client = read_only_client()?;
    match collect(&client, &args) {
        Ok(report) => {
            report.print();
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            Err(e)
        }
    }
}

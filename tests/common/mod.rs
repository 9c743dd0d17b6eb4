//! Shared fixtures for the eng-bump integration tests.
//!
//! Nothing here talks to GitHub: commands are only driven far enough to
//! exercise argument handling and local file work.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use std::fs;
use std::path::{Path, PathBuf};

/// Artifact listing as published by a mono package build.
#[allow(unused)]
pub const ARTIFACTS_JSON: &str = r#"[
  {
    "url": "https://download.mono-project.com/archive/6.12.0/macos-10-universal/0a2c6b3e1a9bc8e2da0bbe1b8a33a5d3b3b7a2fe/MonoFramework-MDK-6.12.0.90.macos10.xamarin.universal.pkg",
    "sha256": "1b3f4a6d",
    "md5": "9e107d9d",
    "size": 305872896,
    "productId": "964ebddd-1ffe-47e7-8128-5ce17ffffb05",
    "releaseId": "612000090",
    "version": "6.12.0.90"
  }
]"#;

#[allow(unused)]
pub const ARTIFACT_COMMIT: &str = "0a2c6b3e1a9bc8e2da0bbe1b8a33a5d3b3b7a2fe";

/// A dependency list in the shape msbuild and the toolset keep it.
#[allow(unused)]
pub const VERSION_DETAILS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Dependencies>
  <ProductDependencies>
    <!-- Roslyn ships with the toolset -->
    <Dependency Name="Microsoft.Net.Compilers.Toolset" Version="3.4.0-beta4-19569-03">
      <Uri>https://github.com/dotnet/roslyn</Uri>
      <Sha>ff930dec2a3f9d6a51fdd3e5e3a1ba6e1aa5b01e</Sha>
    </Dependency>
    <Dependency Name="NuGet.Build.Tasks" Version="5.4.0-rtm.6292">
      <Uri>https://github.com/NuGet/NuGet.Client</Uri>
      <Sha>fb2ba6efc5d8bbd7a3b5b2c9a2d8e4c1e1f2a3b4</Sha>
    </Dependency>
  </ProductDependencies>
  <ToolsetDependencies>
    <Dependency Name="Microsoft.DotNet.Arcade.Sdk" Version="1.0.0-beta.19577.5">
      <Uri>https://github.com/dotnet/arcade</Uri>
      <Sha>99c6b59a8afff97fe891341b39abe985f1d3c565</Sha>
    </Dependency>
  </ToolsetDependencies>
</Dependencies>
"#;

/// A property list with one placeholder value among the literal versions.
#[allow(unused)]
pub const VERSIONS_PROPS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project>
  <PropertyGroup>
    <VersionPrefix>16.5.0</VersionPrefix>
    <DotNetUseShippingVersions>true</DotNetUseShippingVersions>
  </PropertyGroup>
  <!-- Production dependencies -->
  <PropertyGroup>
    <MicrosoftNetCompilersToolsetVersion>3.4.0-beta1-19516-01</MicrosoftNetCompilersToolsetVersion>
    <NuGetBuildTasksVersion>5.3.0-rtm.6192</NuGetBuildTasksVersion>
    <SystemMemoryPackageVersion>$(SystemMemoryVersion)</SystemMemoryPackageVersion>
  </PropertyGroup>
</Project>
"#;

#[allow(unused)]
pub fn eng_bump_cmd() -> Command {
    let mut cmd = cargo_bin_cmd!("eng-bump");
    cmd.env_remove("GITHUB_TOKEN").env_remove("RUST_LOG");
    cmd
}

/// Writes `content` to `dir/name` and returns the path.
#[allow(unused)]
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

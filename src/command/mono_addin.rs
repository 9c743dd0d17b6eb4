use crate::error::Result;
use crate::steps::addin::mono_external_from_artifacts;
use clap::Parser;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
pub struct MonoAddinArgs {
    /// Artifacts JSON published by the mono package build
    #[arg(value_name = "ARTIFACTS_JSON")]
    pub artifacts: PathBuf,

    /// Write the record to this file instead of printing it
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn execute(args: MonoAddinArgs) -> Result<()> {
    let result: Result<(String, String)> = (|| {
        let json = fs::read_to_string(&args.artifacts)?;
        let external = mono_external_from_artifacts(&json)?;
        Ok((external.commit.clone(), external.to_pretty_json()?))
    })();

    let (commit, record) = match result {
        Ok(converted) => converted,
        Err(e) => {
            eprintln!(
                "{} {}: {}",
                "Error reading".red().bold(),
                args.artifacts.display(),
                e
            );
            return Err(e);
        }
    };

    println!("commit = {}", commit);
    match &args.output {
        Some(path) => {
            fs::write(path, format!("{}\n", record))?;
            println!("{} {}", "Wrote".green(), path.display());
        }
        None => println!("{}", record),
    }
    Ok(())
}

//! Command-line interface for pagewalk
//!
//! Arguments only locate the config file and override a couple of its keys;
//! everything of substance lives in the config mapping itself.

use std::path::PathBuf;

use clap::Parser;
use directories::ProjectDirs;
use thiserror::Error;

/// Errors raised while resolving CLI arguments
#[derive(Debug, Error)]
pub enum CliError {
    /// No --config argument and no platform config directory to default to
    #[error("no config file given and no platform config directory available")]
    NoConfigDir,
}

/// pagewalk - crawl a paginated JSON API into an on-disk result cache
#[derive(Parser, Debug)]
#[command(name = "pagewalk")]
#[command(about = "Paginated API crawler with a file-backed result cache")]
#[command(version)]
pub struct Cli {
    /// Path to the JSON config file
    ///
    /// Defaults to config.json in the platform config directory
    /// (~/.config/pagewalk/ on Linux).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Listen port for the status server, overriding the config's `port` key
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Results directory, overriding the config's `root_dir` key
    #[arg(long, value_name = "DIR")]
    pub root_dir: Option<PathBuf>,
}

impl Cli {
    /// Resolves the config file path, falling back to the XDG location
    pub fn config_path(&self) -> Result<PathBuf, CliError> {
        if let Some(path) = &self.config {
            return Ok(path.clone());
        }
        let project_dirs = ProjectDirs::from("", "", "pagewalk").ok_or(CliError::NoConfigDir)?;
        Ok(project_dirs.config_dir().join("config.json"))
    }
}

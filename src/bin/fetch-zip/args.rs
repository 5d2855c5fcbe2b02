use std::path::PathBuf;

use clap::FromArgMatches;
use clap::{CommandFactory, Parser};

use fetch_zip::Config;

use crate::error::AppError;

// Shamelessly borrowed from https://github.com/crate-ci/clap-cargo/blob/0378657ffdf2b67bcd6f1ab56e04a1322b92dd0e/src/style.rs
use anstyle::AnsiColor::*;
use anstyle::Effects;
use anstyle::Style;

const HEADER: Style = Green.on_default().effects(Effects::BOLD);
const USAGE: Style = Green.on_default().effects(Effects::BOLD);
const LITERAL: Style = Cyan.on_default().effects(Effects::BOLD);
const PLACEHOLDER: Style = Cyan.on_default();
const ERROR: Style = Red.on_default().effects(Effects::BOLD);
const VALID: Style = Cyan.on_default().effects(Effects::BOLD);
const INVALID: Style = Yellow.on_default().effects(Effects::BOLD);

const APP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(HEADER)
    .usage(USAGE)
    .literal(LITERAL)
    .placeholder(PLACEHOLDER)
    .error(ERROR)
    .valid(VALID)
    .invalid(INVALID);

/// Environment variable naming the configuration file.
const CONFIG_ENV: &str = "FETCH_ZIP_CONFIG";

#[derive(Debug, Parser)]
#[command(name = "fetch-zip")]
#[command(version)]
#[command(about = "Fetch a git repository, remote archive or local directory as a single zip archive")]
#[command(long_about = None)]
#[command(styles = APP_STYLING)]
#[command(term_width = 80)]
struct Args {
    /// Handler to use instead of detecting one from the source (see `fetch-zip handlers`)
    #[arg(long = "type", short = 't', value_name = "NAME", global = true)]
    handler: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, short = 'k', global = true)]
    insecure: bool,

    /// Configuration file. If omitted, check the `FETCH_ZIP_CONFIG` environment variable and then
    /// `config.toml` in the user's configuration directory.
    #[arg(long, short = 'c', value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Create a zip archive from a source
    #[command(visible_alias = "z")]
    Zip {
        /// Path or URL of the source. Append `#<ref>` to a repository URL to pick a branch, tag
        /// or commit.
        source: String,

        /// Where to write the archive, or `-` for stdout
        #[arg(long, short = 'o', value_name = "PATH", default_value = "content.zip")]
        output: String,
    },
    /// Print the fingerprint of a source
    #[command(visible_alias = "s")]
    Sha1 {
        /// Path or URL of the source
        source: String,
    },
    /// Check whether a source differs from a stored fingerprint. Exits with status 1 if it does.
    #[command(visible_alias = "d")]
    Diff {
        /// Path or URL of the source
        source: String,

        /// Fingerprint previously printed by the `sha1` command
        sha1: String,
    },
    /// List the available handlers in detection order
    Handlers,
}

#[derive(Debug)]
pub enum Output {
    Stdout,
    File(PathBuf),
}

#[derive(Debug)]
pub struct ValidatedArgs {
    pub handler: Option<String>,
    pub config: Config,
    pub command: ValidatedCommand,
}

#[derive(Debug)]
pub enum ValidatedCommand {
    Zip { source: String, output: Output },
    Sha1 { source: String },
    Diff { source: String, sha1: String },
    Handlers,
}

impl ValidatedArgs {
    /// Find the configuration file, falling back to `FETCH_ZIP_CONFIG` then the user's
    /// configuration directory. Only an explicitly named file has to exist.
    fn detect_config_file(arg: Option<PathBuf>) -> Result<Option<PathBuf>, AppError> {
        match arg {
            Some(path) => Ok(Some(path)),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(path) => Ok(Some(PathBuf::from(path))),
                None => {
                    let project_dirs = directories::ProjectDirs::from("", "", "fetch-zip")
                        .ok_or(AppError::arg_validation(
                            "could not determine configuration directory".to_string(),
                        ))?;
                    let path = project_dirs.config_dir().join("config.toml");
                    Ok(path.is_file().then_some(path))
                }
            },
        }
    }

    fn load_config(arg: Option<PathBuf>, insecure: bool) -> Result<Config, AppError> {
        let mut config = match Self::detect_config_file(arg)? {
            Some(path) => {
                Config::load(&path).map_err(|err| AppError::config_load(path.clone(), err))?
            }
            None => Config::default(),
        };
        config.http.insecure |= insecure;
        Ok(config)
    }
}

impl TryFrom<Command> for ValidatedCommand {
    type Error = AppError;

    fn try_from(command: Command) -> Result<Self, Self::Error> {
        match command {
            Command::Zip { source, output } => {
                let output = if output == "-" {
                    Output::Stdout
                } else {
                    let path = PathBuf::from(output);
                    // If given, validate that the output directory exists
                    if let Some(parent) = path.parent()
                        && !parent.as_os_str().is_empty()
                        && !parent.is_dir()
                    {
                        return Err(AppError::arg_validation(format!(
                            "output directory does not exist: {}",
                            parent.display()
                        )));
                    }
                    Output::File(path)
                };
                Ok(ValidatedCommand::Zip { source, output })
            }
            Command::Sha1 { source } => Ok(ValidatedCommand::Sha1 { source }),
            Command::Diff { source, sha1 } => {
                if sha1.trim().is_empty() {
                    return Err(AppError::arg_validation(
                        "you must pass the sha1 stored from the sha1 command".to_string(),
                    ));
                }
                Ok(ValidatedCommand::Diff { source, sha1 })
            }
            Command::Handlers => Ok(ValidatedCommand::Handlers),
        }
    }
}

pub fn parse() -> Result<ValidatedArgs, AppError> {
    let matches = Args::command().get_matches();
    let args = match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(err) => {
            err.format(&mut Args::command()).exit();
        }
    };
    Ok(ValidatedArgs {
        handler: args.handler,
        config: ValidatedArgs::load_config(args.config, args.insecure)?,
        command: ValidatedCommand::try_from(args.command)?,
    })
}

use std::io::{self, Write};
use std::process::ExitCode;

use fetch_zip::{Change, Registry};

use crate::args::{Output, ValidatedCommand};
use crate::error::AppError;

mod args;
mod error;
mod progress;

fn main() -> ExitCode {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::from(err)
        }
    }
}

fn run() -> Result<ExitCode, AppError> {
    let args = args::parse()?;
    let registry = Registry::from_config(&args.config)?;
    let handler = args.handler.as_deref();

    match args.command {
        ValidatedCommand::Zip { source, output } => {
            let mut artefact = registry.open(source, handler)?.zip()?;
            match output {
                Output::Stdout => {
                    let mut stdout = io::stdout().lock();
                    io::copy(&mut artefact, &mut stdout)?;
                    stdout.flush()?;
                    artefact.close()?;
                }
                Output::File(path) => {
                    let name = path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    let bar = progress::make_progress_bar(artefact.size(), name);
                    let mut file = std::fs::File::create(&path)
                        .map_err(|err| AppError::write_output(path.clone(), err.into()))?;
                    io::copy(&mut bar.wrap_read(&mut artefact), &mut file)
                        .map_err(|err| AppError::write_output(path.clone(), err.into()))?;
                    bar.finish_and_clear();
                    artefact.close()?;
                    println!("Downloaded and zipped at {}", path.display());
                }
            }
        }
        ValidatedCommand::Sha1 { source } => {
            let fingerprint = registry.open(source, handler)?.fingerprint()?;
            print!("{fingerprint}");
            io::stdout().flush()?;
        }
        ValidatedCommand::Diff { source, sha1 } => {
            match registry.open(source, handler)?.has_changed(sha1.trim()) {
                Change::Unchanged { .. } => println!("no change from source"),
                Change::Changed { current } => {
                    tracing::info!(%current, "fingerprint changed");
                    println!("file from source is different");
                    return Ok(ExitCode::from(1));
                }
                Change::Failed(err) => return Err(err.into()),
            }
        }
        ValidatedCommand::Handlers => {
            for name in registry.handler_names() {
                println!("{name}");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

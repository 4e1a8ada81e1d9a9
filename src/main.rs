use anyhow::{Context, Result};
use clap::Parser;
use riskcall::cli::{Cli, Command};
use riskcall::instrument::InstrumentConfig;
use riskcall::ir::Module;
use riskcall::pipeline::PassRegistry;
use riskcall::runtime::ProfileReport;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn run_instrument(
    input: &Path,
    output: Option<&Path>,
    passes: &str,
    config: Option<&Path>,
    print: bool,
    required_only: bool,
) -> Result<()> {
    let mut module = Module::from_file(input)?;

    let config = match config {
        Some(path) => InstrumentConfig::from_file(path)?,
        None => InstrumentConfig::default(),
    };
    tracing::debug!(
        "Targets: {:?}, hook: {}",
        config.targets.iter().collect::<Vec<_>>(),
        config.hook
    );

    let registry = PassRegistry::with_builtin_passes(config);
    let mut pipeline = registry.parse_pipeline(passes)?.required_only(required_only);

    let stderr = io::stderr();
    let preserved = pipeline.run(&mut module, &mut stderr.lock())?;
    module.validate().context("Instrumented module is malformed")?;

    let json = module.to_json_string()?;
    match output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
    }

    if print {
        eprintln!("{}", module);
    }
    eprintln!("modified: {}", preserved.modified());
    Ok(())
}

fn run_summary(report: &Path, limit: usize) -> Result<()> {
    let loaded = ProfileReport::from_file(report)
        .with_context(|| format!("Failed to load report {}", report.display()))?;
    loaded.print_summary(report, limit);
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    match args.command {
        Command::Instrument {
            input,
            output,
            passes,
            config,
            print,
            required_only,
        } => run_instrument(
            &input,
            output.as_deref(),
            &passes,
            config.as_deref(),
            print,
            required_only,
        ),
        Command::Summary { report, limit } => run_summary(&report, limit),
    }
}

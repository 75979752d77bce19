//! nativejar - packages JVM applications as single native executables.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use nativejar::resources::DirBundle;
use nativejar::shrink::ProguardShrinker;
use nativejar::timing::{format_seconds, Timer};
use nativejar::{BuildRequest, Config, Pipeline, Platform};

#[derive(Parser)]
#[command(name = "nativejar")]
#[command(about = "Compile a set of JARs into a single native executable")]
struct Cli {
    /// Colon separated list of JARs to compile
    #[arg(long, value_delimiter = ':', required_unless_present = "show_config")]
    classpath: Vec<PathBuf>,

    /// Name of the class containing the app's main method
    #[arg(value_name = "MAIN", required_unless_present = "show_config")]
    main_class: Option<String>,

    /// Path to the output file
    #[arg(value_name = "OUTPUT", required_unless_present = "show_config")]
    output: Option<PathBuf>,

    /// Skip the dead code elimination step (huge binaries but much faster)
    #[arg(long)]
    no_shrink: bool,

    /// Compress the bytecode using LZMA. Results in slower startup but slightly smaller binaries.
    #[arg(long)]
    lzma: bool,

    /// Keep the working directory that contains temporary files
    #[arg(long)]
    save_temps: bool,

    /// Target platform (default: the host)
    #[arg(long)]
    platform: Option<Platform>,

    /// Verbose diagnostics (same as RUST_LOG=debug)
    #[arg(short, long)]
    verbose: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    show_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env if present
    dotenvy::dotenv().ok();
    init_tracing(cli.verbose);

    let config = Config::load();
    if cli.show_config {
        config.print();
        return Ok(());
    }

    let (Some(main_class), Some(output)) = (cli.main_class, cli.output) else {
        anyhow::bail!("MAIN and OUTPUT are required");
    };
    let platform = match cli.platform {
        Some(p) => p,
        None => Platform::host()?,
    };

    let request = BuildRequest::new(cli.classpath, main_class, output, platform)
        .shrink(!cli.no_shrink)
        .compress(cli.lzma)
        .keep_workspace(cli.save_temps);

    let bundle = DirBundle::new(&config.resources, platform);
    let shrinker = config
        .java
        .clone()
        .map(|java| ProguardShrinker::new(java, &config.shrinker_jar));
    let mut pipeline = Pipeline::new(&config, &bundle);
    if let Some(ref shrinker) = shrinker {
        pipeline = pipeline.with_shrinker(shrinker);
    }

    let timer = Timer::start("build");
    let report = pipeline
        .run(&request)
        .with_context(|| format!("building {}", request.output.display()))?;
    set_output_permissions(&report.artifact);

    println!();
    println!("Took {} seconds", format_seconds(timer.elapsed()));
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// rwxr-x---. The executable is already in place, so a failure here is
/// reported without failing the build.
fn set_output_permissions(path: &Path) {
    if let Err(e) = nativejar::process::set_mode(path, 0o750) {
        tracing::warn!(path = %path.display(), error = %e, "could not set output permissions");
    }
}

//! Clash Bridge Command Line Tool
//!
//! Runs the same bootstrap as the embedded library and keeps the control
//! endpoint alive until interrupted.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use clash_bridge::common::init_logger;
use clash_bridge::config::defaults::SUCCESS;
use clash_bridge::{
    bootstrap, verify_config, BootstrapOptions, BootstrapReport, ConfigSource, Core, CorePaths,
    Result, APP_NAME, VERSION,
};

/// Clash Bridge: configuration bootstrap for an embedded Clash core
#[derive(Parser, Debug)]
#[clap(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Home configuration directory (defaults to ~/.config/clash)
    #[clap(long, env = "CLASH_HOME_DIR")]
    home: Option<PathBuf>,

    /// Configuration file (defaults to config.yaml in the home directory)
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Replace controller and listener ports that cannot be bound
    #[clap(long)]
    check_ports: bool,

    /// Override the configuration's allow-lan setting
    #[clap(long)]
    allow_lan: Option<bool>,

    /// Only check the given configuration file and exit
    #[clap(long, value_name = "FILE")]
    verify: Option<PathBuf>,

    /// Log level
    #[clap(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    init_logger(&args.log_level);

    match execute(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute(args: Args) -> Result<ExitCode> {
    let paths = match &args.home {
        Some(home) => CorePaths::from_home(home),
        None => CorePaths::detect()?,
    };

    if let Some(path) = &args.verify {
        let bytes = std::fs::read(path)?;
        let loader = clash_bridge::config::YamlLoader::new();
        let message = match verify_config(&loader, &bytes) {
            Ok(()) => SUCCESS.to_string(),
            Err(e) => e.to_string(),
        };
        println!("{}", message);
        return Ok(if message == SUCCESS { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    info!("Starting {} v{}", APP_NAME, VERSION);
    info!("Home directory: {}", paths.home_dir.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let _enter = runtime.enter();

    let core = Core::builder(paths).build()?;

    let source = match args.config {
        Some(path) => ConfigSource::Path(path),
        None => ConfigSource::Default,
    };
    let options = BootstrapOptions {
        repair_ports: args.check_ports,
        allow_lan: args.allow_lan,
    };

    let config = bootstrap(&core, &source, options)?;
    println!("{}", BootstrapReport::from(&config).to_json()?);

    runtime.block_on(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    Ok(ExitCode::SUCCESS)
}

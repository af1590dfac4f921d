//! cachetrace CLI - memory trace inspection

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use cli::Cli;

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "cachetrace=debug"
    } else if cli.silent {
        "cachetrace=warn"
    } else {
        "cachetrace=info"
    };
    let filter = EnvFilter::from_default_env().add_directive(
        default_level
            .parse()
            .unwrap_or_else(|_| LevelFilter::INFO.into()),
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let exit_code = commands::run_command(&cli);
    std::process::exit(exit_code);
}

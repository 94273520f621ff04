mod cli;
mod commands;
mod config;
mod constants;
mod error;
mod git;
mod lock;
mod process;
mod session;
mod template;
mod workspace;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    commands::run(cli)
}

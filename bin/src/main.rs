use std::process::ExitCode;

mod cli;
mod config;

fn main() -> ExitCode {
    cli::run()
}

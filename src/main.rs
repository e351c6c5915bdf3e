use std::env;

use clap::Parser;
mod command;
pub mod config;
pub mod display;
pub mod engine;
pub mod errors;
pub mod interface;
pub mod matcher;
pub mod registry;
pub mod runner;
pub mod signal;
pub mod source;
pub mod task;
use log::info;

#[tokio::main]
async fn main() {
    let args = command::Command::parse();

    match args.action {
        command::SubCommand::Run(command) => {
            if env::var_os("RUST_LOG").is_none() {
                let level = if command.value.debug { "debug" } else { "warn" };
                unsafe {
                    env::set_var("RUST_LOG", level);
                }
            }
            env_logger::init();

            info!("input: {}", command.value.input.display());

            let exit_code = match runner::run_progress(&command.value).await {
                Ok(_) => 0,
                Err(error) if error.is_not_found() => {
                    eprintln!("{}", error);
                    1
                }
                Err(error) => {
                    eprintln!("Error in fai-progress: {}", error);
                    2
                }
            };

            std::process::exit(exit_code);
        }
    }
}

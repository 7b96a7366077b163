mod cli;
mod commands;
mod config;
mod error;

use clap::Parser;
use cli::Cli;
use commands::{Output, Outgoing, format_address, to_base64};
use cookie_nft::config::format_ton;
use error::CliResult;

fn init_tracing(cli: &Cli) {
    // --verbose → "debug"; otherwise RUST_LOG, falling back to "warn".
    // Logs go to stderr so stdout carries only the BoC output.
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = config::load_config(cli.config.as_deref())?;
    let output = commands::run(cli.command, &config, cli.collection.as_deref(), cli.query_id)?;
    print_output(output)?;
    Ok(())
}

fn print_output(output: Output) -> CliResult<()> {
    match output {
        Output::Message(message) => print_message(message),
        Output::Text(fields) => {
            for (key, value) in fields {
                println!("{}: {}", key, value);
            }
            Ok(())
        }
    }
}

fn print_message(message: Outgoing) -> CliResult<()> {
    let Outgoing {
        to,
        value,
        body,
        state_init,
    } = message;

    if let Some(to) = to {
        println!("to: {}", format_address(&to));
    }
    println!("value: {} TON ({} nanotons)", format_ton(value), value);
    println!("body: {}", to_base64(body)?);
    if let Some(state_init) = state_init {
        println!("state_init: {}", to_base64(state_init)?);
    }
    Ok(())
}

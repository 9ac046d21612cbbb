use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;
use log::error;

use rq3query::commands::{Dispatcher, Line};
use rq3query::config::Config;
use rq3query::engine::Engine;

/// Query game and voice servers from the command line.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// JSON config file
    #[clap(short, long, default_value = "config.json")]
    config: PathBuf,
    /// Allow privileged commands such as rcon
    #[clap(long)]
    authorized: bool,
    /// Command and its arguments, e.g. `status alpha`
    #[clap(trailing_var_arg = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let args = Args::parse();

    let config = Config::load(&args.config).map_err(|e| {
        error!("{}", e);
        e
    })?;
    let engine = Engine::new(&config, config.load_servers()?, config.voice_registry()?);

    let input = if args.command.is_empty() {
        "help".to_owned()
    } else {
        args.command.join(" ")
    };

    for line in Dispatcher::new()
        .dispatch(&engine, &input, args.authorized)
        .await
    {
        match line {
            Line::Reply(text) => println!("{}", text),
            Line::Private(text) => println!("[private] {}", text),
        }
    }

    Ok(())
}

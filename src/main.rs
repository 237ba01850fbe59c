use clap::Parser as _;
use opentherm_tools::commands;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[derive(clap::Parser)]
#[clap(version, about, author)]
enum Commands {
    Entities(commands::entities::Args),
    Messages(commands::messages::Args),
    Resolve(commands::resolve::Args),
    Decode(commands::decode::Args),
    Encode(commands::encode::Args),
}

fn end<E: std::error::Error>(r: Result<(), E>) {
    std::process::exit(match r {
        Ok(_) => 0,
        Err(e) => {
            eprintln!("{}", commands::error_report(&e));
            1
        }
    });
}

/// Log to stderr, filtered by `OPENTHERM_TOOLS_LOG`. Nothing is logged if it is unset.
fn init_logging() {
    let filter = std::env::var("OPENTHERM_TOOLS_LOG")
        .ok()
        .and_then(|description| {
            description.parse::<tracing_subscriber::filter::targets::Targets>().ok()
        })
        .unwrap_or_default();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() {
    init_logging();
    match Commands::parse() {
        Commands::Entities(args) => end(commands::entities::run(args)),
        Commands::Messages(args) => end(commands::messages::run(args)),
        Commands::Resolve(args) => end(commands::resolve::run(args)),
        Commands::Decode(args) => end(commands::decode::run(args)),
        Commands::Encode(args) => end(commands::encode::run(args)),
    }
}

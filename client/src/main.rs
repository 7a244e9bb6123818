mod menu;
mod network;

use clap::Parser;
use log::info;

/// Trivia game client
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server IP address to connect to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to connect to
    #[arg(short, long, default_value = "2604")]
    port: u16,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let address = format!("{}:{}", args.host, args.port);
    println!("Connecting to {}...", address);
    let mut conn = network::Connection::connect(&address)?;
    info!("Connected to {}", address);
    println!("Connection successful.");

    menu::login(&mut conn)?;
    menu::run(&mut conn)?;

    Ok(())
}

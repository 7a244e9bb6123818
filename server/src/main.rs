use clap::Parser;
use log::info;
use server::network::Server;
use server::storage;

/// Trivia game server
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "2604")]
    port: u16,

    /// Path to the user database file
    #[arg(long, default_value = "Users.txt")]
    users: String,

    /// Path to the question database file
    #[arg(long, default_value = "Questions.txt")]
    questions: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let store = storage::load_database(&args.users, &args.questions)?;

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&address, store).await?;

    info!("Server started successfully");
    server.run().await?;

    Ok(())
}

//! Campus Rooms chat node
//!
//! Runs the live chat channel (`/ws`) and the chat API (`/api/chat/*`) on one
//! listener, backed by a SQLite message store. Identity comes from the
//! upstream auth layer in the `x-user-id` header.
//!
//! `campus-node stats` prints a summary of stored messages and exits.

mod http;
mod ws;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use campus_chat::{ChatConfig, ChatService};
use campus_store::{Directory, MessageStore, PersistenceConfig, StaticDirectory};
use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "campus-node",
    author,
    version,
    about = "Campus Rooms chat node",
    long_about = None
)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(flatten)]
    storage: StorageArgs,

    /// Serve options when no subcommand is given
    #[command(flatten)]
    serve: ServeArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Debug)]
struct StorageArgs {
    /// SQLite database file
    #[arg(long, env = "CAMPUS_DB_PATH", default_value = "campus-chat.db", global = true)]
    db_path: PathBuf,

    /// Maximum message body length in characters
    #[arg(long, env = "CAMPUS_MAX_BODY_CHARS", default_value_t = 2000, global = true)]
    max_body_chars: usize,

    /// Maximum pooled database connections
    #[arg(long, env = "CAMPUS_MAX_CONNECTIONS", default_value_t = 8, global = true)]
    max_connections: u32,
}

impl StorageArgs {
    fn persistence_config(&self) -> PersistenceConfig {
        PersistenceConfig {
            db_path: self.db_path.clone(),
            max_body_chars: self.max_body_chars,
            max_connections: self.max_connections,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the chat channel and API (default)
    Serve(ServeArgs),
    /// Print message store statistics
    Stats(StatsArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on
    #[arg(short, long, env = "CAMPUS_LISTEN", default_value = "127.0.0.1:3001")]
    listen: SocketAddr,

    /// JSON file with user and listing display names
    #[arg(long, env = "CAMPUS_DIRECTORY")]
    directory: Option<PathBuf>,

    /// Maximum rooms one session may join
    #[arg(long, env = "CAMPUS_MAX_ROOMS_PER_SESSION", default_value_t = 16)]
    max_rooms_per_session: usize,

    /// Maximum sessions in one room
    #[arg(long, env = "CAMPUS_MAX_SESSIONS_PER_ROOM", default_value_t = 512)]
    max_sessions_per_room: usize,

    /// Outbound event queue per session
    #[arg(long, env = "CAMPUS_QUEUE_CAPACITY", default_value_t = 64)]
    queue_capacity: usize,

    /// Seconds between server pings
    #[arg(long, env = "CAMPUS_HEARTBEAT_SECS", default_value_t = 20)]
    heartbeat_secs: u64,

    /// Seconds without inbound frames before a session is closed
    #[arg(long, env = "CAMPUS_IDLE_TIMEOUT_SECS", default_value_t = 60)]
    idle_timeout_secs: u64,
}

impl ServeArgs {
    fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            max_rooms_per_session: self.max_rooms_per_session,
            max_sessions_per_room: self.max_sessions_per_room,
            outbound_queue_capacity: self.queue_capacity,
            heartbeat_interval: Duration::from_secs(self.heartbeat_secs),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
        }
    }
}

#[derive(Args, Debug)]
struct StatsArgs {
    /// Number of recent messages to show
    #[arg(short, long, default_value_t = 10)]
    limit: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let cli = Cli::parse();
    let store = Arc::new(MessageStore::with_config(cli.storage.persistence_config()).await?);

    let command = cli.command.unwrap_or(Command::Serve(cli.serve));

    match command {
        Command::Serve(args) => serve(store, args).await,
        Command::Stats(args) => stats(&store, args).await,
    }
}

async fn serve(store: Arc<MessageStore>, args: ServeArgs) -> Result<()> {
    let directory: Arc<dyn Directory> = match &args.directory {
        Some(path) => Arc::new(StaticDirectory::from_json_file(path).await?),
        None => Arc::new(StaticDirectory::new()),
    };

    let service = Arc::new(ChatService::new(store, directory, args.chat_config()));
    let app = http::router(service);

    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen))?;
    info!("Chat node listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    info!("Chat node stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}

async fn stats(store: &MessageStore, args: StatsArgs) -> Result<()> {
    let total = store.total_messages().await?;
    println!("Total chat messages: {}", total);

    if total == 0 {
        println!("No chat messages found in database.");
        return Ok(());
    }

    println!("\nRecent messages:");
    for (index, msg) in store.recent_messages(args.limit).await?.iter().enumerate() {
        println!(
            "{}. {} (from: {}, to: {}, listing: {}, at: {})",
            index + 1,
            msg.body,
            msg.sender_id,
            msg.receiver_id,
            msg.listing_id,
            msg.created_at.to_rfc3339()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_serve() {
        let cli = Cli::parse_from(["campus-node"]);
        assert!(cli.command.is_none());

        let config = cli.serve.chat_config();
        assert_eq!(config.max_rooms_per_session, 16);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(20));
    }

    #[test]
    fn test_serve_options_without_subcommand() {
        let cli = Cli::parse_from([
            "campus-node",
            "--listen",
            "0.0.0.0:9000",
            "--queue-capacity",
            "8",
        ]);
        assert!(cli.command.is_none());
        assert_eq!(cli.serve.listen, "0.0.0.0:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(cli.serve.chat_config().outbound_queue_capacity, 8);

        let cli = Cli::parse_from(["campus-node", "serve", "--listen", "0.0.0.0:9001"]);
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.listen, "0.0.0.0:9001".parse::<SocketAddr>().unwrap())
            }
            other => panic!("expected serve, got {:?}", other),
        }
    }

    #[test]
    fn test_global_storage_args() {
        let cli = Cli::parse_from([
            "campus-node",
            "stats",
            "--db-path",
            "/tmp/chat.db",
            "-l",
            "3",
        ]);
        assert_eq!(cli.storage.db_path, PathBuf::from("/tmp/chat.db"));
        assert!(matches!(cli.command, Some(Command::Stats(StatsArgs { limit: 3 }))));
    }
}

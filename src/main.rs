//! Erudite CLI binary entry point.

use clap::Parser;
use erudite::cli::{commands, keys, Cli, Commands, KeysCommands};
use erudite::store::FilePreferenceStore;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Logs go to stderr so streamed note text on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("erudite=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n⏹️  Stopping...");
            on_interrupt.cancel();
        }
    });

    let result = match cli.command {
        Commands::Note(args) => commands::handle_note(args, cancel).await,
        Commands::Synthesize(args) => commands::handle_synthesize(args, cancel).await,
        Commands::Search(args) => commands::handle_search(args, cancel).await,
        Commands::Chat(args) => commands::handle_chat(args, cancel).await,
        Commands::Keys(keys_args) => {
            let store = FilePreferenceStore::new_default();
            match keys_args.command {
                KeysCommands::Set(args) => keys::handle_set(&store, &args.provider, &args.key),
                KeysCommands::List => keys::handle_list(&store),
                KeysCommands::Clear(args) => keys::handle_clear(&store, args.provider.as_deref()),
            }
        }
        #[cfg(feature = "relay")]
        Commands::Serve(args) => commands::handle_serve(args, cancel).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

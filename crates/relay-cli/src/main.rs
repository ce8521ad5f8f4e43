mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{action::ChatArgs, config::ConfigSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "relay",
    about = "Drive the messaging app through its automation scripts, one action at a time",
    version,
    propagate_version = true
)]
struct Cli {
    /// Relay directory holding scripts/ and config.yaml (default: current directory)
    #[arg(long, global = true, env = "RELAY_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a direct message
    Send {
        /// Phone number or email of the recipient
        handle: String,
        /// Message body
        body: String,
        /// File to attach
        #[arg(long)]
        attachment: Option<PathBuf>,
    },

    /// Send a message to a group chat
    SendGroup {
        #[command(flatten)]
        chat: ChatArgs,
        /// Message body
        body: String,
        /// File to attach
        #[arg(long)]
        attachment: Option<PathBuf>,
    },

    /// Add a participant to a group chat
    AddParticipant {
        #[command(flatten)]
        chat: ChatArgs,
        /// Phone number or email to add
        account: String,
    },

    /// Remove a participant from a group chat
    RemoveParticipant {
        #[command(flatten)]
        chat: ChatArgs,
        /// Phone number or email to remove
        account: String,
    },

    /// Rename a group chat
    RenameGroup {
        #[command(flatten)]
        chat: ChatArgs,
        /// New title
        title: String,
    },

    /// Create a group chat and send its first message
    CreateGroup {
        /// Group name
        name: String,
        /// First message
        body: String,
        /// Participant handle (repeatable)
        #[arg(long = "participant", short = 'p', required = true)]
        participants: Vec<String>,
    },

    /// Leave a group chat
    LeaveGroup {
        #[command(flatten)]
        chat: ChatArgs,
    },

    /// Export contacts into the contacts/ folder
    ContactSync,

    /// Check that the scripts and the machine are ready
    Setup,

    /// Inspect and validate config.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Config { .. } => tracing::Level::WARN,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let json = cli.json;

    use cmd::action::Action;
    let result = match cli.command {
        Commands::Send {
            handle,
            body,
            attachment,
        } => cmd::action::run(
            &root,
            Action::Send {
                handle,
                body,
                attachment,
            },
            json,
        ),
        Commands::SendGroup {
            chat,
            body,
            attachment,
        } => cmd::action::run(
            &root,
            Action::SendGroup {
                chat,
                body,
                attachment,
            },
            json,
        ),
        Commands::AddParticipant { chat, account } => {
            cmd::action::run(&root, Action::AddParticipant { chat, account }, json)
        }
        Commands::RemoveParticipant { chat, account } => {
            cmd::action::run(&root, Action::RemoveParticipant { chat, account }, json)
        }
        Commands::RenameGroup { chat, title } => {
            cmd::action::run(&root, Action::RenameGroup { chat, title }, json)
        }
        Commands::CreateGroup {
            name,
            body,
            participants,
        } => cmd::action::run(
            &root,
            Action::CreateGroup {
                name,
                participants,
                body,
            },
            json,
        ),
        Commands::LeaveGroup { chat } => cmd::action::run(&root, Action::LeaveGroup { chat }, json),
        Commands::ContactSync => cmd::action::run(&root, Action::ContactSync, json),
        Commands::Setup => cmd::action::run(&root, Action::Setup, json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

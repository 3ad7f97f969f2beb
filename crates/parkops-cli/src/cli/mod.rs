pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[clap(name = "parkops", about = "Parking machine field-service missions")]
#[clap(version, author)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[clap(long, global = true)]
    pub json: bool,

    /// Log sync activity to stderr
    #[clap(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Select or check the backend server
    #[clap(subcommand, name = "server")]
    Server(ServerCommands),

    /// Log in, log out or show the current session
    #[clap(subcommand, name = "auth")]
    Auth(AuthCommands),

    /// Show or set the display language (en, fr)
    #[clap(name = "lang")]
    Lang {
        /// New language; omit to show the current one
        locale: Option<String>,
    },

    /// Refresh and list your missions
    #[clap(name = "ls")]
    List {
        /// Number of pages to load
        #[clap(long, default_value_t = 1)]
        pages: u32,
    },

    /// Show a mission (opens it if it is new)
    #[clap(name = "show")]
    Show {
        /// Mission id
        id: String,
    },

    /// Mark a new mission as opened
    #[clap(name = "open")]
    Open {
        /// Mission id
        id: String,
    },

    /// Submit a mission as completed
    #[clap(name = "submit")]
    Submit {
        /// Mission id
        id: String,
        /// Notes were collected
        #[clap(long)]
        collect_notes: bool,
        /// Coins were collected
        #[clap(long)]
        collect_coins: bool,
        /// Notes were refilled
        #[clap(long)]
        refill_notes: bool,
        /// Coins were refilled
        #[clap(long)]
        refill_coins: bool,
        /// Completed maintenance tasks by position (comma-separated, from 0)
        #[clap(long, value_delimiter = ',')]
        maintenance: Vec<usize>,
    },

    /// Feed a push notification into the local store
    #[clap(subcommand, name = "notify")]
    Notify(NotifyCommands),

    /// Register or remove this device's push token
    #[clap(subcommand, name = "push")]
    Push(PushCommands),

    /// Drop the cached missions of the logged-in operator
    #[clap(name = "clear")]
    Clear,
}

#[derive(Subcommand)]
pub enum ServerCommands {
    /// Store the server URL after a health check
    Set {
        url: String,
        /// Store the URL even if the health check fails
        #[clap(long)]
        skip_check: bool,
    },
    /// Run the health check against the stored server
    Check,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Log in as an operator
    Login {
        username: String,
        /// Password (prompted for when omitted)
        #[clap(long)]
        password: Option<String>,
    },
    /// Log out and drop cached missions
    Logout,
    /// Show the current session
    Status,
}

#[derive(Subcommand)]
pub enum NotifyCommands {
    /// A new mission was assigned
    New {
        /// Push data as delivered, e.g. '{"id": "m-9", "payload": {...}}'
        data: String,
    },
    /// The operator tapped a mission notification
    Tap {
        /// Push data as delivered, e.g. '{"id": "m-9"}'
        data: String,
    },
}

#[derive(Subcommand)]
pub enum PushCommands {
    Register { token: String },
    Remove { token: String },
}

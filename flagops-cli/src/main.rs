mod config_cmd;
mod flags;
mod transfer;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use flagops_lib::config::CONFIG_PATH_VAR;
use flagops_lib::{resolve, ConfigStore, ConnectionArgs, Error, HttpFlagClient, ResolvedConnection};
use tracing_subscriber::EnvFilter;

use crate::config_cmd::ConfigAction;
use crate::flags::{CreateFields, UpdateFields};

#[derive(Parser, Debug)]
#[command(name = "flagops")]
#[command(version)]
#[command(about = "Manage feature flags on a remote flag service", long_about = None)]
struct Args {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(clap::Args, Debug)]
struct GlobalArgs {
    /// Flag service base URL (used together with --api-key)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// API key for the flag service
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Target environment (defaults to default_env from the config file)
    #[arg(short = 'e', long = "env", global = true)]
    env: Option<String>,

    /// Path to the config file [default: ~/.flagops/config.yaml]
    #[arg(short = 'c', long = "config-file", global = true, env = CONFIG_PATH_VAR)]
    config_file: Option<PathBuf>,

    /// Verbose output, repeat for more (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List flags in the environment
    List {
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one flag as JSON
    Get { key: String },
    /// Create a flag (replaces an existing flag with the same key)
    Create {
        key: String,
        #[command(flatten)]
        fields: CreateFields,
    },
    /// Change some fields of a flag, keeping the rest
    Update {
        key: String,
        #[command(flatten)]
        fields: UpdateFields,
    },
    /// Turn a flag on
    Enable { key: String },
    /// Turn a flag off
    Disable { key: String },
    /// Delete a flag
    Delete { key: String },
    /// Upsert flags from a JSON file (export document or array of flags)
    Import {
        file: PathBuf,

        /// Keep importing after a failed flag
        #[arg(long)]
        continue_on_error: bool,
    },
    /// Write every flag of the environment as JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Read and edit the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options shared by every command, built once per invocation.
#[derive(Debug)]
pub struct GlobalOpts {
    pub connection: ConnectionArgs,
    pub store: ConfigStore,
}

impl GlobalOpts {
    fn from_args(args: GlobalArgs) -> Result<Self, Error> {
        let store = match args.config_file.filter(|p| !p.as_os_str().is_empty()) {
            Some(path) => ConfigStore::new(path),
            None => ConfigStore::default_location()?,
        };
        Ok(Self {
            connection: ConnectionArgs {
                base_url: args.base_url,
                api_key: args.api_key,
                env: args.env,
            },
            store,
        })
    }

    /// Resolve the connection and build a client for it.
    pub fn connect(&self) -> Result<(ResolvedConnection, HttpFlagClient), Error> {
        let conn = resolve::resolve(&self.connection, &self.store)?;
        tracing::info!(env = %conn.environment, base_url = %conn.base_url, "resolved connection");
        let client = HttpFlagClient::new(&conn)?;
        Ok((conn, client))
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cmd: Command, opts: &GlobalOpts) -> Result<(), Error> {
    match cmd {
        Command::List { json } => flags::run_list(opts, json),
        Command::Get { key } => flags::run_get(opts, &key),
        Command::Create { key, fields } => flags::run_create(opts, &key, fields),
        Command::Update { key, fields } => flags::run_update(opts, &key, fields),
        Command::Enable { key } => flags::run_set_enabled(opts, &key, true),
        Command::Disable { key } => flags::run_set_enabled(opts, &key, false),
        Command::Delete { key } => flags::run_delete(opts, &key),
        Command::Import {
            file,
            continue_on_error,
        } => transfer::run_import(opts, &file, continue_on_error),
        Command::Export { output } => transfer::run_export(opts, output.as_deref()),
        Command::Config { action } => config_cmd::run_config(opts, action),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.global.verbose);

    let result = GlobalOpts::from_args(args.global).and_then(|opts| run(args.cmd, &opts));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

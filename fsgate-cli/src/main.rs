// SPDX-License-Identifier: AGPL-3.0-or-later
//! fsgate CLI
//!
//! Drives the root-scoped filesystem facade from a shell.

mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fsgate")]
#[command(author, version, about = "fsgate - Root-scoped filesystem facade", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    roots: RootArgs,

    /// Verbose output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Where the facade's roots come from
#[derive(Args, Debug, Default)]
pub struct RootArgs {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Document root (read-write)
    #[arg(long, global = true)]
    pub document_dir: Option<PathBuf>,

    /// Caches root (read-write)
    #[arg(long, global = true)]
    pub caches_dir: Option<PathBuf>,

    /// Bundle root (read-only)
    #[arg(long, global = true)]
    pub bundle_dir: Option<PathBuf>,

    /// Let the OS decide access for paths outside the roots
    #[arg(long, global = true)]
    pub allow_external: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show file or directory information
    #[command(alias = "stat")]
    Info {
        /// Path or file:// URI
        path: String,

        /// Include the MD5 of file contents
        #[arg(long)]
        md5: bool,
    },

    /// Copy a file or directory tree
    Cp {
        /// Source path
        source: String,

        /// Destination path
        dest: String,
    },

    /// Move or rename a file or directory
    Mv {
        /// Source path
        source: String,

        /// Destination path
        dest: String,
    },

    /// Remove files or directories
    Rm {
        /// Path(s) to remove
        #[arg(required = true)]
        paths: Vec<String>,

        /// Ignore paths that do not exist
        #[arg(short, long)]
        force: bool,
    },

    /// Create directories
    Mkdir {
        /// Directory path(s) to create
        #[arg(required = true)]
        paths: Vec<String>,

        /// Create parent directories as needed
        #[arg(short, long)]
        parents: bool,
    },

    /// List directory contents
    #[command(alias = "dir")]
    Ls {
        /// Path to list (defaults to the document root)
        path: Option<String>,

        /// Long format with details
        #[arg(short, long)]
        long: bool,

        /// Show all files including hidden
        #[arg(short, long)]
        all: bool,

        /// Human-readable sizes
        #[arg(short = 'H', long)]
        human: bool,
    },

    /// Display file contents
    Cat {
        /// File to display
        path: String,

        /// Print contents base64-encoded
        #[arg(long)]
        base64: bool,

        /// Byte offset to start at (implies --base64)
        #[arg(long)]
        position: Option<u64>,

        /// Number of bytes to read (implies --base64)
        #[arg(long)]
        length: Option<u64>,
    },

    /// Write text to a file, replacing it
    Write {
        /// File to write
        path: String,

        /// Contents (read from stdin when omitted)
        contents: Option<String>,

        /// Contents are base64-encoded bytes
        #[arg(long)]
        base64: bool,
    },

    /// Show the permissions granted for paths
    Perms {
        /// Path(s) to check
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Print a new unique path inside a directory
    Genpath {
        /// Directory (defaults to the caches root)
        dir: Option<String>,

        /// File extension
        #[arg(short, long, default_value = "")]
        ext: String,

        /// Create the directory if it is missing
        #[arg(long)]
        create: bool,
    },

    /// Print the MD5 of a file, or of stdin
    Md5 {
        /// File to hash ("-" for stdin)
        path: Option<String>,
    },

    /// Show storage space for the document root's volume
    Df,

    /// Show the resolved root directories
    Roots,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let fs = match commands::init_facade(&cli.roots) {
        Ok(fs) => fs,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Info { path, md5 } => commands::info(&fs, &path, md5).await,
        Commands::Cp { source, dest } => commands::cp(&fs, &source, &dest).await,
        Commands::Mv { source, dest } => commands::mv(&fs, &source, &dest).await,
        Commands::Rm { paths, force } => commands::rm(&fs, &paths, force).await,
        Commands::Mkdir { paths, parents } => commands::mkdir(&fs, &paths, parents).await,
        Commands::Ls { path, long, all, human } => {
            commands::ls(&fs, path.as_deref(), long, all, human).await
        }
        Commands::Cat { path, base64, position, length } => {
            commands::cat(&fs, &path, base64, position, length).await
        }
        Commands::Write { path, contents, base64 } => {
            commands::write(&fs, &path, contents, base64).await
        }
        Commands::Perms { paths } => commands::perms(&fs, &paths),
        Commands::Genpath { dir, ext, create } => {
            commands::genpath(&fs, dir.as_deref(), &ext, create)
        }
        Commands::Md5 { path } => commands::md5(&fs, path.as_deref()).await,
        Commands::Df => commands::df(&fs).await,
        Commands::Roots => commands::roots(&fs),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

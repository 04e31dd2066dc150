use clap::{Parser, Subcommand};
use git_rescan::commands::*;
use git_rescan::core::{error::RescanError, print_error};
use std::env;

#[derive(Parser)]
#[command(name = "git-rescan")]
#[command(about = "Rescan a git working copy and report the status of every changed path")]
#[command(version = "0.1.0")]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one rescan and print staged, worktree and untracked paths
    Status {
        /// Print the status table as JSON
        #[arg(long)]
        json: bool,
        /// Do not list untracked files
        #[arg(long)]
        no_untracked: bool,
        /// Refresh the index even when gui.trustmtime is set
        #[arg(long)]
        ignore_mtime: bool,
        /// Maximum number of worktree entries before untracked files are hidden
        #[arg(long, value_name = "N")]
        max_files: Option<usize>,
        /// Exclude untracked files using .gitignore, info/exclude and core.excludesfile
        #[arg(long)]
        legacy_exclude: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Configure logging based on --debug flag
    if cli.debug {
        env::set_var("RUST_LOG", "debug");
    } else {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    match cli.command {
        Commands::Status {
            json,
            no_untracked,
            ignore_mtime,
            max_files,
            legacy_exclude,
        } => {
            let options = StatusOptions {
                json,
                no_untracked,
                ignore_mtime,
                max_files,
                legacy_exclude,
            };
            if let Err(e) = execute_status(&options) {
                if let RescanError::NotInGitRepo = e {
                    print_error("Not in a git repository");
                } else {
                    print_error(&e.to_string());
                }
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

use crate::output::OutputFormat;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "awstbx")]
#[command(version)]
#[command(about = "Bulk cleanup for cloud accounts with preview and confirmation", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Show what would be deleted without deleting anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(long, global = true)]
    pub no_confirm: bool,

    /// Output format (defaults to the config file's, then table)
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Config file (default: ~/.config/awstbx/config.toml)
    #[arg(long, global = true, env = "AWSTBX_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON inventory describing the account to clean up
    #[arg(long, global = true, env = "AWSTBX_INVENTORY")]
    pub inventory: Option<PathBuf>,

    /// Give up on remote work after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Items per listing page
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    pub page_size: Option<u32>,
}

#[derive(Subcommand)]
pub enum Command {
    /// IAM cleanup
    #[command(subcommand)]
    Iam(IamCommand),

    /// SageMaker cleanup
    #[command(subcommand)]
    Sagemaker(SageMakerCommand),

    /// CloudFormation cleanup
    #[command(subcommand)]
    Cfn(CfnCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// IAM Commands
// ============================================================================

#[derive(Subcommand)]
pub enum IamCommand {
    /// Delete a user and everything attached to it
    DeleteUser {
        /// User to delete
        #[arg(long, default_value = "")]
        username: String,
    },
}

// ============================================================================
// SageMaker Commands
// ============================================================================

#[derive(Subcommand)]
pub enum SageMakerCommand {
    /// Delete a user profile with its apps and private spaces
    DeleteUserProfile {
        /// Domain the profile belongs to
        #[arg(long, default_value = "")]
        domain_id: String,

        /// User profile to delete
        #[arg(long, default_value = "")]
        user_profile: String,
    },

    /// Delete spaces in one domain or across all domains
    CleanupSpaces {
        /// Restrict to one domain
        #[arg(long)]
        domain_id: Option<String>,

        /// Only these spaces (comma-separated, requires --domain-id)
        #[arg(long, value_delimiter = ',')]
        spaces: Vec<String>,
    },
}

// ============================================================================
// CloudFormation Commands
// ============================================================================

#[derive(Subcommand)]
pub enum CfnCommand {
    /// Delete a stack set after all of its stack instances
    #[command(name = "delete-stackset")]
    DeleteStackSet {
        /// Stack set to delete
        #[arg(long, default_value = "")]
        stackset_name: String,
    },
}

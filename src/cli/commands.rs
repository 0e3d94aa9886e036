use clap::{Parser, Subcommand};
use postguard::config::Locale;
use std::path::PathBuf;

/// `postguard` - Gate post submissions behind a risk assessment service.
#[derive(Parser, Debug)]
#[command(name = "postguard")]
#[command(version)]
#[command(about = "Gate post submissions behind a risk assessment service.", long_about = None)]
pub struct Cli {
    /// Log at debug level regardless of the configured log_level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Establish the conversation with the assessment service
    Init {
        /// Open a new conversation even if one is already configured
        #[arg(long)]
        force: bool,
    },

    /// Assess a draft and print the verdict
    Check {
        /// Draft text to assess
        #[arg(required_unless_present = "stdin", conflicts_with = "stdin")]
        text: Option<String>,

        /// Read the draft from standard input
        #[arg(long)]
        stdin: bool,
    },

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },

    /// Run the guard against a local HTML page and click a control
    DryRun {
        /// HTML file loaded into the in-memory page
        #[arg(long)]
        html: PathBuf,

        /// Selector of the control to click
        #[arg(long)]
        click: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Update service and feedback settings
    Set {
        /// Base URL of the assessment service
        #[arg(long)]
        base_url: Option<String>,

        /// Assistant identifier
        #[arg(long)]
        assistant_id: Option<String>,

        /// Feedback language (en, ja)
        #[arg(long)]
        locale: Option<Locale>,
    },
}

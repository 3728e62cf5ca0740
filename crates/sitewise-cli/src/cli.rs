use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sitewise - natural-language wind farm site analysis
#[derive(Parser, Debug)]
#[command(name = "sitewise")]
#[command(about = "Natural-language wind farm site analysis", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Show the orchestration trace for each reply
    #[arg(long, global = true)]
    pub explain: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true, default_value = ".sitewise/config.toml")]
    pub config: PathBuf,

    /// Directory holding project records and sessions
    #[arg(long, global = true)]
    pub store_root: Option<PathBuf>,

    /// Base URL of the analysis capability endpoint
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Base URL of the intelligent agent
    #[arg(long, global = true)]
    pub agent_endpoint: Option<String>,

    /// Conversation session; persisted between invocations
    #[arg(long, global = true, default_value = "cli")]
    pub session: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a single question
    Ask(AskArgs),

    /// Start an interactive conversation
    Chat(ChatArgs),

    /// Manage renewable energy projects
    Projects(ProjectsArgs),

    /// Show the project dashboard
    Dashboard,

    /// Show the effective configuration and where each value came from
    Config,

    /// Run health checks and diagnostics
    Doctor(DoctorArgs),
}

#[derive(Parser, Debug)]
pub struct AskArgs {
    /// The question, e.g. "analyze terrain at 35.067, -101.395"
    pub query: String,

    /// Run against this project instead of resolving one from the query
    #[arg(long)]
    pub project: Option<String>,

    /// Approve any confirmation the request needs
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Skip the nearby-project check for new sites
    #[arg(long)]
    pub skip_duplicate_check: bool,
}

#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Start a fresh session instead of continuing `--session`
    #[arg(long)]
    pub new: bool,
}

#[derive(Parser, Debug)]
pub struct ProjectsArgs {
    #[command(subcommand)]
    pub command: ProjectsCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProjectsCommand {
    /// List projects
    List {
        /// Include archived projects
        #[arg(long)]
        all: bool,
    },

    /// Show one project record
    Show { name: String },

    /// Delete a project
    Delete {
        name: String,
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Delete every project whose name contains a pattern
    BulkDelete {
        pattern: String,
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Rename a project
    Rename {
        old: String,
        new: String,
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Merge two projects into one
    Merge {
        first: String,
        second: String,
        /// Name that survives (defaults to the first)
        #[arg(long)]
        keep: Option<String>,
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Hide a project from listings
    Archive { name: String },

    /// Restore an archived project
    Unarchive { name: String },

    /// Write a project as a portable JSON document
    Export {
        name: String,
        /// Output file (stdout when omitted)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Import a previously exported project
    Import { path: PathBuf },

    /// Filter projects
    Search(SearchArgs),

    /// Find projects that sit close together
    Duplicates {
        /// Grouping radius in kilometres
        #[arg(long)]
        radius_km: Option<f64>,
    },
}

#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// Substring of the project name
    #[arg(long)]
    pub name: Option<String>,

    /// Latitude of the search center
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude of the search center
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Search radius in kilometres
    #[arg(long)]
    pub radius_km: Option<f64>,

    /// Only projects without a report
    #[arg(long)]
    pub incomplete: bool,

    /// Only archived projects
    #[arg(long)]
    pub archived: bool,

    /// Created at or after (RFC 3339)
    #[arg(long)]
    pub created_after: Option<DateTime<Utc>>,

    /// Created at or before (RFC 3339)
    #[arg(long)]
    pub created_before: Option<DateTime<Utc>>,
}

#[derive(Parser, Debug)]
pub struct DoctorArgs {
    /// Show detailed diagnostic information
    #[arg(long)]
    pub verbose: bool,
}

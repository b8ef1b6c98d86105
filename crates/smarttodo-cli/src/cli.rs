use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};

use smarttodo_core::{PriorityTier, SourceType, TaskStatus};

#[derive(Parser)]
#[command(
    name = "smarttodo",
    version,
    about = "Personal task manager with AI-assisted prioritization"
)]
pub struct Cli {
    /// PostgreSQL URL. Without it an in-memory store is used for this run.
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply pending database migrations
    Migrate,

    /// Check that the generation endpoint responds
    Health,

    /// Create, update and inspect tasks
    #[command(subcommand)]
    Task(TaskCommand),

    /// Re-prioritize tasks with AI
    Batch {
        /// Task ids, processed in order
        #[arg(required = true)]
        ids: Vec<i64>,
        /// Cancel items not yet started after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Inspect categories and adjust usage counters
    #[command(subcommand)]
    Category(CategoryCommand),

    /// Submit and inspect context entries
    #[command(subcommand)]
    Context(ContextCommand),
}

/// Fields shared by create and update.
#[derive(Args)]
pub struct TaskFields {
    /// Task description
    #[arg(short, long)]
    pub description: Option<String>,
    /// Priority score, 0-100
    #[arg(short, long)]
    pub score: Option<i32>,
    /// Category name (created if missing)
    #[arg(short, long, conflicts_with = "category_id")]
    pub category: Option<String>,
    /// Existing category id
    #[arg(long)]
    pub category_id: Option<i64>,
    /// Deadline, YYYY-MM-DD
    #[arg(long)]
    pub deadline: Option<NaiveDate>,
    /// pending, in_progress or completed
    #[arg(long)]
    pub status: Option<TaskStatus>,
    /// Do not consult the model
    #[arg(long)]
    pub no_ai: bool,
    /// Context entry ids passed to the model as hints
    #[arg(long = "context", value_delimiter = ',')]
    pub context_ids: Vec<i64>,
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Create a task
    Create {
        /// Task title
        title: String,
        #[command(flatten)]
        fields: TaskFields,
    },

    /// Update a task; omitted fields keep their values
    Update {
        id: i64,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },

    /// Set the priority score directly
    SetPriority { id: i64, score: i32 },

    /// Assign a category by name
    AssignCategory { id: i64, name: String },

    /// Mark a task completed
    Complete { id: i64 },

    /// Show one task
    Show { id: i64 },

    /// List tasks by priority
    List {
        #[arg(long)]
        category_id: Option<i64>,
        #[arg(long)]
        status: Option<TaskStatus>,
        /// low, medium or high
        #[arg(long)]
        priority: Option<PriorityTier>,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
    },

    /// Ask the model for suggestions without saving anything
    Suggest {
        /// Existing task id
        #[arg(long, conflicts_with = "title")]
        id: Option<i64>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
        /// Context entry ids passed to the model as hints
        #[arg(long = "context", value_delimiter = ',')]
        context_ids: Vec<i64>,
    },
}

#[derive(Subcommand)]
pub enum CategoryCommand {
    /// List categories with usage counts
    List,
    /// Add one to a usage counter
    Increment { id: i64 },
    /// Subtract one from a usage counter (never below zero)
    Decrement { id: i64 },
}

#[derive(Subcommand)]
pub enum ContextCommand {
    /// Store a note, message or email and analyze it
    Submit {
        content: String,
        /// note, message (or whatsapp) or email
        #[arg(long, default_value = "note")]
        source: SourceType,
    },
    /// List entries, newest first
    List {
        #[arg(long)]
        source: Option<SourceType>,
        /// RFC 3339 lower bound, inclusive
        #[arg(long)]
        since: Option<DateTime<Utc>>,
        /// RFC 3339 upper bound, inclusive
        #[arg(long)]
        until: Option<DateTime<Utc>>,
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Re-run analysis for an entry
    Reanalyze { id: i64 },
}

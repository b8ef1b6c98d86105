//! smarttodo command-line entry point.
//!
//! Results are printed to stdout as pretty JSON; logs go to stderr (or a
//! daily-rotated file when `LOG_FILE` is set).

mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smarttodo_db::{log_pool_metrics, Database, PoolConfig, Repositories};
use smarttodo_engine::{
    ApplyOptions, CategoryRef, EngineConfig, GenerationBackend, ListContextRequest,
    ListTasksRequest, SmartTodo, SuggestionTarget, TaskDraft,
};
use smarttodo_inference::OpenAIBackend;

use cli::{CategoryCommand, Cli, Command, ContextCommand, TaskCommand, TaskFields};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging configuration:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "smarttodo=info,...")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "smarttodo=info,smarttodo_engine=info,smarttodo_inference=info,smarttodo_db=warn".into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("smarttodo.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // stdout is reserved for command output
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stderr)"),
        "Logging initialized"
    );

    let cli = Cli::parse();

    if let Command::Migrate = cli.command {
        let url = cli
            .database_url
            .as_deref()
            .context("DATABASE_URL is required for migrate")?;
        let db = Database::connect_with_config(url, PoolConfig::from_env()).await?;
        db.migrate().await?;
        info!(subsystem = "cli", "Migrations applied");
        return Ok(());
    }

    let (repos, db) = match cli.database_url.as_deref() {
        Some(url) => {
            let db = Database::connect_with_config(url, PoolConfig::from_env()).await?;
            db.migrate().await.context("failed to apply migrations")?;
            (Repositories::postgres(&db), Some(db))
        }
        None => {
            warn!(
                subsystem = "cli",
                "DATABASE_URL not set, using an in-memory store; nothing will persist"
            );
            (Repositories::in_memory(), None)
        }
    };

    let config = EngineConfig::from_env()?;
    let backend: Option<Arc<dyn GenerationBackend>> = match OpenAIBackend::from_env() {
        Ok(b) => Some(Arc::new(b)),
        Err(e) => {
            warn!(subsystem = "cli", error = %e, "Generation backend unavailable");
            None
        }
    };
    let todo = SmartTodo::new(repos, backend, config);

    let outcome = run(&todo, cli.command).await;
    todo.wait_for_background().await;
    if let Some(db) = &db {
        log_pool_metrics(db.pool());
    }
    outcome
}

async fn run(todo: &SmartTodo, command: Command) -> Result<()> {
    match command {
        Command::Migrate => bail!("migrate runs before the engine is built"),
        Command::Health => match todo.health_check().await {
            Some(Ok(true)) => print_json(&serde_json::json!({ "ai": "healthy" })),
            Some(Ok(false)) => print_json(&serde_json::json!({ "ai": "unhealthy" })),
            Some(Err(e)) => print_json(&serde_json::json!({ "ai": "error", "error": e.to_string() })),
            None => print_json(&serde_json::json!({ "ai": "not_configured" })),
        },
        Command::Task(cmd) => run_task(todo, cmd).await,
        Command::Batch { ids, timeout_secs } => {
            let report = match timeout_secs {
                Some(secs) => {
                    todo.batch_prioritize_within(&ids, Duration::from_secs(secs))
                        .await?
                }
                None => todo.batch_prioritize(&ids).await?,
            };
            print_json(&report)
        }
        Command::Category(cmd) => match cmd {
            CategoryCommand::List => print_json(&todo.list_categories().await?),
            CategoryCommand::Increment { id } => print_json(&todo.increment_usage(id).await?),
            CategoryCommand::Decrement { id } => print_json(&todo.decrement_usage(id).await?),
        },
        Command::Context(cmd) => match cmd {
            ContextCommand::Submit { content, source } => {
                print_json(&todo.submit_context(&content, source).await?)
            }
            ContextCommand::List {
                source,
                since,
                until,
                limit,
            } => print_json(
                &todo
                    .list_context(ListContextRequest {
                        source_type: source,
                        start: since,
                        end: until,
                        limit,
                    })
                    .await?,
            ),
            ContextCommand::Reanalyze { id } => print_json(&todo.reanalyze_context(id).await?),
        },
    }
}

async fn run_task(todo: &SmartTodo, cmd: TaskCommand) -> Result<()> {
    match cmd {
        TaskCommand::Create { title, fields } => {
            let (draft, options) = draft_from(TaskDraft::new(title), fields);
            print_json(&todo.create_or_update_task(draft, options).await?)
        }
        TaskCommand::Update { id, title, fields } => {
            let mut draft = TaskDraft::for_update(id);
            draft.title = title;
            let (draft, options) = draft_from(draft, fields);
            print_json(&todo.create_or_update_task(draft, options).await?)
        }
        TaskCommand::SetPriority { id, score } => print_json(&todo.set_priority(id, score).await?),
        TaskCommand::AssignCategory { id, name } => {
            print_json(&todo.assign_category_by_name(id, &name).await?)
        }
        TaskCommand::Complete { id } => print_json(&todo.complete_task(id).await?),
        TaskCommand::Show { id } => print_json(&todo.get_task(id).await?),
        TaskCommand::List {
            category_id,
            status,
            priority,
            limit,
            offset,
        } => print_json(
            &todo
                .list_tasks(ListTasksRequest {
                    category_id,
                    status,
                    priority,
                    limit,
                    offset,
                })
                .await?,
        ),
        TaskCommand::Suggest {
            id,
            title,
            description,
            context_ids,
        } => {
            let target = match (id, title) {
                (Some(id), _) => SuggestionTarget::Task(id),
                (None, Some(title)) => SuggestionTarget::Text { title, description },
                (None, None) => bail!("either --id or --title is required"),
            };
            print_json(&todo.get_ai_suggestions(target, &context_ids).await?)
        }
    }
}

fn draft_from(mut draft: TaskDraft, fields: TaskFields) -> (TaskDraft, ApplyOptions) {
    draft.description = fields.description;
    draft.priority_score = fields.score;
    draft.deadline = fields.deadline;
    draft.status = fields.status;
    draft.category = match (fields.category_id, fields.category) {
        (Some(id), _) => Some(CategoryRef::Id(id)),
        (None, Some(name)) => Some(CategoryRef::Name(name)),
        (None, None) => None,
    };

    let options = if fields.no_ai {
        ApplyOptions::without_ai()
    } else {
        ApplyOptions::with_ai()
    }
    .with_context(fields.context_ids);
    (draft, options)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

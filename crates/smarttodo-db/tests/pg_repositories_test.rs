//! PostgreSQL repository tests.
//!
//! Requires a live database: `DATABASE_URL=... cargo test -p smarttodo-db --features integration`

#![cfg(feature = "integration")]

use std::sync::Arc;

use smarttodo_db::test_fixtures::{test_database_url, unique_name};
use smarttodo_db::{
    CategoryRepository, ContextRepository, Database, Error, ListContextRequest, NewContextEntry,
    NewTask, SourceType, TaskQuery, TaskRepository, TaskStatus,
};

async fn setup() -> Database {
    let _ = dotenvy::dotenv();
    let db = Database::connect(&test_database_url())
        .await
        .expect("Failed to connect to test database");
    db.migrate().await.expect("Failed to run migrations");
    db
}

fn new_task(title: &str) -> NewTask {
    NewTask {
        title: title.to_string(),
        description: String::new(),
        category_id: None,
        priority_score: 50,
        deadline: None,
        status: TaskStatus::Pending,
        is_ai_suggested: false,
    }
}

#[tokio::test]
async fn test_task_round_trip_with_category_join() {
    let db = setup().await;
    let name = unique_name("Work");
    let (category, created) = db.categories.resolve_or_create(&name).await.unwrap();
    assert!(created);

    let mut task = new_task("Quarterly report");
    task.category_id = Some(category.id);
    let inserted = db.tasks.insert(task).await.unwrap();
    assert_eq!(inserted.category_name.as_deref(), Some(name.as_str()));

    let mut changed = inserted.clone();
    changed.status = TaskStatus::InProgress;
    changed.priority_score = 75;
    let updated = db.tasks.update(&changed).await.unwrap();
    assert_eq!(updated.status, TaskStatus::InProgress);
    assert_eq!(updated.priority_score, 75);
    assert!(updated.updated_at > inserted.updated_at);
}

#[tokio::test]
async fn test_fetch_missing_task_is_not_found() {
    let db = setup().await;
    let err = db.tasks.fetch(i64::MAX).await.unwrap_err();
    assert!(matches!(err, Error::TaskNotFound(_)));
}

#[tokio::test]
async fn test_resolve_or_create_case_insensitive() {
    let db = setup().await;
    let name = unique_name("Errands");
    let (first, _) = db.categories.resolve_or_create(&name).await.unwrap();
    let (second, created) = db
        .categories
        .resolve_or_create(&name.to_uppercase())
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn test_counter_clamps_and_survives_concurrency() {
    let db = Arc::new(setup().await);
    let (category, _) = db
        .categories
        .resolve_or_create(&unique_name("Counter"))
        .await
        .unwrap();
    let id = category.id;

    let zero = db.categories.decrement_usage(id).await.unwrap();
    assert_eq!(zero.usage_count, 0);

    let mut handles = Vec::new();
    for _ in 0..20 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            db.categories.increment_usage(id).await.unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }
    let after = db.categories.fetch(id).await.unwrap();
    assert_eq!(after.usage_count, 20);
}

#[tokio::test]
async fn test_list_filters_by_category() {
    let db = setup().await;
    let (category, _) = db
        .categories
        .resolve_or_create(&unique_name("Listing"))
        .await
        .unwrap();
    for score in [10, 90] {
        let mut task = new_task("listed");
        task.category_id = Some(category.id);
        task.priority_score = score;
        db.tasks.insert(task).await.unwrap();
    }

    let tasks = db
        .tasks
        .list(TaskQuery {
            category_id: Some(category.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].priority_score, 90);
}

#[tokio::test]
async fn test_context_insert_and_list() {
    let db = setup().await;
    let entry = db
        .context
        .insert(NewContextEntry {
            content: "Meeting moved to Monday".into(),
            source_type: SourceType::Message,
            processed_insights: None,
        })
        .await
        .unwrap();
    assert!(entry.processed_insights.is_none());

    let listed = db
        .context
        .list(ListContextRequest {
            source_type: Some(SourceType::Message),
            start: Some(entry.timestamp),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(listed.iter().any(|e| e.id == entry.id));
}

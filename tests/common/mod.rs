//! Shared fixtures for integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use entity_repo::{
    logging, Entity, EntityMapping, MemoryBackend, PropertyMapping, Repository, RepositoryChanges,
    RepositoryConfig,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub done: bool,
}

impl Entity for Todo {
    const FIELDS: &'static [&'static str] = &["id", "title", "done"];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

pub fn todo(title: &str) -> Todo {
    Todo {
        id: None,
        title: title.to_string(),
        done: false,
    }
}

pub fn todo_mapping() -> Arc<EntityMapping<Todo>> {
    Arc::new(
        EntityMapping::builder()
            .field("id", PropertyMapping::string("id").optional())
            .field("title", PropertyMapping::string("summary"))
            .field("done", PropertyMapping::boolean("status"))
            .build()
            .unwrap(),
    )
}

pub type TodoRepo = Repository<Todo, MemoryBackend>;

pub fn todo_repo() -> TodoRepo {
    todo_repo_with(RepositoryConfig::default())
}

pub fn todo_repo_with(config: RepositoryConfig) -> TodoRepo {
    logging::init_test_tracing();
    Repository::with_config(MemoryBackend::new(), todo_mapping(), config).unwrap()
}

/// Calendar-style entity exercising every coercion type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub subject: String,
    pub seats: i64,
    pub budget: f64,
    pub remote: bool,
    pub starts_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Entity for Meeting {
    const FIELDS: &'static [&'static str] = &[
        "id",
        "subject",
        "seats",
        "budget",
        "remote",
        "starts_at",
        "location",
    ];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

pub fn meeting_mapping() -> EntityMapping<Meeting> {
    EntityMapping::builder()
        .field("id", PropertyMapping::string("eventId").optional())
        .field("subject", PropertyMapping::string("summary"))
        .field("seats", PropertyMapping::number("capacity"))
        .field("budget", PropertyMapping::number("cost"))
        .field("remote", PropertyMapping::boolean("online"))
        .field("starts_at", PropertyMapping::date("start"))
        .field("location", PropertyMapping::string("where").optional())
        .build()
        .unwrap()
}

/// Records every change set a repository publishes.
pub fn record_changes<T: Entity>(
    repo: &impl entity_repo::EntityRepository<T>,
) -> Arc<Mutex<Vec<RepositoryChanges<T>>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    repo.add_listener(Arc::new(move |changes: &RepositoryChanges<T>| {
        sink.lock().push(changes.clone())
    }));
    seen
}

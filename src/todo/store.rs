//! In-memory todo store.

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::types::{TodoDraft, TodoItem, TodoPatch, TodoStats};

#[derive(Debug)]
struct Inner {
    /// Newest first.
    items: Vec<TodoItem>,
    next_id: u64,
}

/// Ordered todo collection owned by the service.
///
/// Every operation takes the lock for its full duration, so concurrent
/// requests apply one after another in arrival order. Lookups that miss
/// return `None`; nothing here fails.
#[derive(Debug)]
pub struct TodoStore {
    inner: RwLock<Inner>,
}

impl TodoStore {
    /// Create an empty store. The first id handed out is 1.
    pub fn new() -> Self {
        Self::from_items(Vec::new())
    }

    /// Create a store holding the three demo todos.
    pub fn with_demo_data() -> Self {
        Self::from_items(demo_items())
    }

    /// Create a store from existing items, kept in the given order.
    pub fn from_items(items: Vec<TodoItem>) -> Self {
        let next_id = items.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        Self {
            inner: RwLock::new(Inner { items, next_id }),
        }
    }

    /// All items, optionally filtered by a case-insensitive search on name
    /// and description. An empty search matches everything.
    pub async fn list(&self, search: Option<&str>) -> Vec<TodoItem> {
        let inner = self.inner.read().await;
        match search.filter(|s| !s.is_empty()) {
            Some(query) => {
                let needle = query.to_lowercase();
                inner
                    .items
                    .iter()
                    .filter(|t| t.matches(&needle))
                    .cloned()
                    .collect()
            }
            None => inner.items.clone(),
        }
    }

    /// Number of items.
    pub async fn len(&self) -> usize {
        self.inner.read().await.items.len()
    }

    /// Whether the store holds no items.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Look up a single item.
    pub async fn get(&self, id: u64) -> Option<TodoItem> {
        let inner = self.inner.read().await;
        inner.items.iter().find(|t| t.id == id).cloned()
    }

    /// Insert a new item at the front and return it.
    pub async fn create(&self, draft: TodoDraft) -> TodoItem {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;

        let now = Utc::now();
        let todo = TodoItem {
            id,
            name: draft.name,
            description: draft.description,
            priority: draft.priority,
            done: false,
            created_at: now,
            updated_at: now,
        };
        inner.items.insert(0, todo.clone());
        debug!(id, "todo created");
        todo
    }

    /// Apply a partial update. `None` if the id is unknown.
    pub async fn update(&self, id: u64, patch: &TodoPatch) -> Option<TodoItem> {
        let mut inner = self.inner.write().await;
        let todo = inner.items.iter_mut().find(|t| t.id == id)?;
        patch.apply(todo, Utc::now());
        Some(todo.clone())
    }

    /// Look up `id` and only then build and apply the patch, all under one
    /// write lock. An unknown id yields `Ok(None)` without calling
    /// `build_patch`; a patch error leaves the item untouched.
    pub async fn try_update<F, E>(&self, id: u64, build_patch: F) -> Result<Option<TodoItem>, E>
    where
        F: FnOnce() -> Result<TodoPatch, E>,
    {
        let mut inner = self.inner.write().await;
        let Some(todo) = inner.items.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        let patch = build_patch()?;
        patch.apply(todo, Utc::now());
        Ok(Some(todo.clone()))
    }

    /// Remove and return an item. `None` if the id is unknown.
    pub async fn delete(&self, id: u64) -> Option<TodoItem> {
        let mut inner = self.inner.write().await;
        let index = inner.items.iter().position(|t| t.id == id)?;
        Some(inner.items.remove(index))
    }

    /// Remove every completed item, preserving the order of the rest.
    /// Returns how many were removed.
    pub async fn delete_completed(&self) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.items.len();
        inner.items.retain(|t| !t.done);
        before - inner.items.len()
    }

    /// Set `done` on every item and return the resulting collection.
    pub async fn set_all_done(&self, done: bool) -> Vec<TodoItem> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        for todo in inner.items.iter_mut() {
            todo.done = done;
            todo.touch(now);
        }
        inner.items.clone()
    }

    /// Completion counters.
    pub async fn stats(&self) -> TodoStats {
        TodoStats::from_items(&self.inner.read().await.items)
    }
}

impl Default for TodoStore {
    fn default() -> Self {
        Self::new()
    }
}

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

fn demo_items() -> Vec<TodoItem> {
    let seed = [
        (1, "Learn Vue 3", "Dig into the Vue 3 Composition API", "high", false),
        (2, "Finish project deployment", "Deploy the project to production", "medium", true),
        (3, "Prepare demo slides", "Put together slides for the project demo", "low", false),
    ];

    seed.into_iter()
        .map(|(id, name, description, priority, done)| TodoItem {
            id,
            name: name.to_string(),
            description: description.to_string(),
            priority: priority.to_string(),
            done,
            created_at: day(id as u32),
            updated_at: day(id as u32),
        })
        .collect()
}

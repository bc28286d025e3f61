//! Todo records and the in-memory store that owns them.

pub mod store;
pub mod types;

pub use store::TodoStore;
pub use types::{
    NewTodo, SearchQuery, TodoDraft, TodoItem, TodoPatch, TodoStats, ToggleAll, DEFAULT_PRIORITY,
};

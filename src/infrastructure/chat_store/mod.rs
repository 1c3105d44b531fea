mod sqlite;

pub use sqlite::SqliteChatStore;

pub mod reindex;
pub mod store;
pub mod transcribe;

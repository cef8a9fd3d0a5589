pub mod category;
pub mod chunk;
pub mod item;

pub use category::CategoryCount;
pub use chunk::KnowledgeChunk;
pub use item::KnowledgeItem;

// Infrastructure - storage backends, id generation and request middleware
pub mod id_generator;          // Snowflake-style id generation
pub mod memory_store;          // In-process document store
pub mod middleware;            // Request context and logging
pub mod repository;            // Typed collection access and pagination
pub mod sqlite_store;          // SQLite document store
pub mod store;                 // Document store interface

pub use id_generator::IdGenerator;
pub use memory_store::MemoryStore;
pub use middleware::RequestContext;
pub use repository::{Page, PageRequest, Pagination, Repository};
pub use sqlite_store::SqliteStore;
pub use store::{Collection, Document, DocumentStore, Filter, FindOptions, SortOrder, StoreTransaction};

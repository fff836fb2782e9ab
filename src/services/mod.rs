// Service exports
pub mod cache;
pub mod codec;
pub mod firestore;
pub mod gemini;
pub mod memory;
pub mod store;

pub use cache::{CacheError, CacheKey, CacheManager, CacheStats};
pub use firestore::{FirestoreClient, FirestoreOptions};
pub use gemini::GeminiClient;
pub use memory::InMemoryStore;
pub use store::{ProfileStore, StoreError};

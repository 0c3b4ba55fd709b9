// Driven adapters - key-value store implementations

pub mod redis_store;
pub mod in_memory_store;

pub use redis_store::RedisKeyValueStore;
pub use in_memory_store::InMemoryKeyValueStore;

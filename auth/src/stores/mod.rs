//! Storage implementations for used-token ledgers.
//!
//! - **Memory Token Storage** - Process-local map, the default
//! - **Redis Token Storage** - Shared across processes, entries expire via TTL

pub mod memory;
#[cfg(feature = "redis")]
pub mod token_redis;

// Re-exports
pub use memory::MemoryTokenStorage;
#[cfg(feature = "redis")]
pub use token_redis::RedisTokenStorage;

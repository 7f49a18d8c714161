//! Authentication providers.
//!
//! This module defines traits for the external dependencies of the magic
//! link strategy. These traits enable dependency injection and make the
//! strategy testable.
//!
//! Providers are **interfaces**, not implementations. The strategy depends
//! on these traits, and the application chooses a concrete implementation
//! from [`stores`](crate::stores) or brings its own:
//!
//! - **Testing / single process**: in-memory storage
//! - **Production / multiple processes**: Redis or any shared cache

pub mod token_storage;

pub use token_storage::TokenStorage;

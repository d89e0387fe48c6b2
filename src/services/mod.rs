//! Use cases and the storage adapter they run against.

pub mod listing_service;
pub mod path_guard;
pub mod proxy_service;
pub mod redirect_guard;
pub mod resolver;
pub mod storage_service;

#[cfg(test)]
pub mod memory_storage;

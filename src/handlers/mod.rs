//! HTTP handlers and middleware.

pub mod list_page;
pub mod middleware;
pub mod object_handlers;

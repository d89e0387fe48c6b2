//! Core data models for the gateway.
//!
//! `object` and `collection` describe what the bucket holds and how a request
//! path is matched against it; `listing` holds the shapes the `/list`
//! endpoint serializes or renders.

pub mod collection;
pub mod listing;
pub mod object;

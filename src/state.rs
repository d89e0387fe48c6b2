//! Shared router state.

use crate::{
    config::Delivery,
    services::{
        listing_service::ListingService, proxy_service::ProxyService,
        storage_service::ObjectStorage,
    },
};
use std::sync::Arc;

/// Cloned into every handler; all heavy parts sit behind the one storage `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub proxy: ProxyService,
    pub listing: ListingService,
    pub delivery: Delivery,
}

impl AppState {
    pub fn new(storage: Arc<dyn ObjectStorage>, presign_expiry_minutes: u32, delivery: Delivery) -> Self {
        Self {
            proxy: ProxyService::new(storage.clone()).with_expiry_minutes(presign_expiry_minutes),
            listing: ListingService::new(storage),
            delivery,
        }
    }
}

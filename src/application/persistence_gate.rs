//! Pre-fetch existence check against the durable store
//!
//! Matches on (name, brand, gender) only; color is not known until the
//! detail page has been fetched. A store error counts as "not found".

use std::sync::Arc;
use tracing::warn;

use crate::domain::{Gender, ProductStore};

pub struct PersistenceGate<P: ?Sized> {
    store: Arc<P>,
}

impl<P: ProductStore + ?Sized> PersistenceGate<P> {
    pub fn new(store: Arc<P>) -> Self {
        Self { store }
    }

    /// True when the item is already durable and should be skipped
    pub async fn already_ingested(&self, name: &str, brand: &str, gender: Gender) -> bool {
        match self.store.exists_by(name, brand, gender).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(
                    name,
                    brand,
                    gender = %gender,
                    "❌ Error checking store for existing product: {:#}",
                    e
                );
                false
            }
        }
    }
}

//! HTTP handlers grouped by resource.

pub mod assemblies;
pub mod health;
pub mod metrics;
pub mod offers;
pub mod orders;
pub mod parts;

use std::str::FromStr;
use std::sync::Arc;

use cad_client::CadSplitter;
use domain::{AssemblyService, OfferService, OrderService};
use record_store::RecordStore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: RecordStore> {
    pub orders: OrderService<S>,
    pub offers: OfferService<S>,
    pub assemblies: AssemblyService<S>,
    pub cad: Arc<dyn CadSplitter>,
}

impl<S: RecordStore + Clone> AppState<S> {
    /// Wires every service onto one store.
    pub fn new(store: S, cad: Arc<dyn CadSplitter>) -> Self {
        Self {
            orders: OrderService::new(store.clone()),
            offers: OfferService::new(store.clone()),
            assemblies: AssemblyService::new(store),
            cad,
        }
    }
}

pub(crate) fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {what} id: {raw}")))
}

use crate::events::Processor;
use crate::notify::Notifier;
use crate::store::ParkingStore;
use std::sync::Arc;

/// Shared application state handed to the router: the persistence and
/// notification seams plus the configured processor.
pub struct AppState {
    store: Arc<dyn ParkingStore>,
    notifier: Arc<dyn Notifier>,
    processor: Processor,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ParkingStore>,
        notifier: Arc<dyn Notifier>,
        processor: Processor,
    ) -> Self {
        Self {
            store,
            notifier,
            processor,
        }
    }

    pub fn store(&self) -> &dyn ParkingStore {
        self.store.as_ref()
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    pub fn processor(&self) -> &Processor {
        &self.processor
    }
}

use std::sync::Arc;

use household_core::config::ScheduleConfig;
use household_core::Clock;

use crate::store::{HouseholdStore, MemoryStore};

pub struct AppState {
    pub store: Arc<dyn HouseholdStore>,
    pub clock: Arc<dyn Clock>,
    pub schedule: ScheduleConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn HouseholdStore>,
        clock: Arc<dyn Clock>,
        schedule: ScheduleConfig,
    ) -> Self {
        Self {
            store,
            clock,
            schedule,
        }
    }

    /// State backed by a fresh [`MemoryStore`].
    pub fn in_memory(clock: Arc<dyn Clock>, schedule: ScheduleConfig) -> Self {
        Self::new(Arc::new(MemoryStore::new()), clock, schedule)
    }
}

pub mod accounts;
pub mod catalog;
pub mod grouping;
pub mod live_session;
pub mod requests;
pub mod rest_timer;
pub mod set_log;
pub mod templates;

pub use accounts::AccountService;
pub use catalog::CatalogService;
pub use grouping::{group_items, DayPlan, ItemGroup};
pub use live_session::{LiveSessionService, SessionRepair};
pub use requests::RequestService;
pub use rest_timer::RestTimer;
pub use set_log::{aggregate_volume, SetLogService};
pub use templates::{DayEditor, GroupEdit, ReconcileReport, TemplateService};

use serde::Serialize;

use crate::clock::SharedClock;
use crate::error::Result;
use crate::models::User;
use crate::store::Store;

/// Every service wired to one store and one clock.
#[derive(Clone)]
pub struct Trainlog<S: Store> {
    pub accounts: AccountService<S>,
    pub catalog: CatalogService<S>,
    pub requests: RequestService<S>,
    pub templates: TemplateService<S>,
    pub sessions: LiveSessionService<S>,
    pub rest: RestTimer<S>,
    pub sets: SetLogService<S>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub templates: ReconcileReport,
    pub sets_removed: usize,
    pub sessions: SessionRepair,
}

impl<S: Store> Trainlog<S> {
    pub fn new(store: S, clock: SharedClock) -> Self {
        let catalog = CatalogService::new(store.clone(), clock.clone());
        let rest = RestTimer::new(store.clone(), clock.clone());

        Self {
            accounts: AccountService::new(store.clone(), clock.clone()),
            requests: RequestService::new(store.clone(), clock.clone(), catalog.clone()),
            templates: TemplateService::new(store.clone(), clock.clone()),
            sessions: LiveSessionService::new(store.clone(), clock.clone(), rest.clone()),
            sets: SetLogService::new(store, clock),
            catalog,
            rest,
        }
    }

    /// Runs every reconciliation pass. Session repair is per user, so only
    /// `user`'s live session is checked.
    pub async fn repair(&self, user: &User) -> Result<RepairReport> {
        let templates = self.templates.reconcile_orphans().await?;
        let sets_removed = self.sets.reconcile_orphan_sets().await?;
        let sessions = self.sessions.reconcile(&user.email).await?;

        tracing::info!(
            "Repair removed {} days, {} items, {} sets",
            templates.days_removed,
            templates.items_removed,
            sets_removed
        );
        Ok(RepairReport {
            templates,
            sets_removed,
            sessions,
        })
    }
}

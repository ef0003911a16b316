use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::Config;
use crate::payments::{SettlementPolicy, SettlementScheduler};
use crate::services::{
    AccountService, CheckInService, DashboardService, EventService, PaymentService, TicketService,
};
use crate::store::Store;

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenService>,
    pub accounts: Arc<AccountService>,
    pub events: Arc<EventService>,
    pub tickets: Arc<TicketService>,
    pub checkin: Arc<CheckInService>,
    pub payments: Arc<PaymentService>,
    pub dashboard: Arc<DashboardService>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        policy: Arc<dyn SettlementPolicy>,
        scheduler: SettlementScheduler,
    ) -> Self {
        let tokens = Arc::new(TokenService::new(&config));

        Self {
            accounts: Arc::new(AccountService::new(
                Arc::clone(&store),
                Arc::clone(&tokens),
                &config,
            )),
            events: Arc::new(EventService::new(Arc::clone(&store))),
            tickets: Arc::new(TicketService::new(Arc::clone(&store), &config)),
            checkin: Arc::new(CheckInService::new(Arc::clone(&store))),
            payments: Arc::new(PaymentService::new(
                Arc::clone(&store),
                policy,
                scheduler,
                &config,
            )),
            dashboard: Arc::new(DashboardService::new(Arc::clone(&store))),
            tokens,
            store,
            config: Arc::new(config),
        }
    }
}

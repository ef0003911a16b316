//! Application services. Each one owns a slice of the domain and talks to
//! persistence only through the [`Store`](crate::store::Store) port.

pub mod accounts;
pub mod checkin;
pub mod dashboard;
pub mod events;
pub mod payments;
pub mod tickets;

pub use accounts::AccountService;
pub use checkin::CheckInService;
pub use dashboard::DashboardService;
pub use events::EventService;
pub use payments::PaymentService;
pub use tickets::TicketService;

use serde::Deserialize;

pub(crate) const DEFAULT_PAGE_SIZE: i64 = 10;
pub(crate) const MAX_PAGE_SIZE: i64 = 100;

/// `?page=&limit=` as accepted by the paginated listings.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

/// Decides the outcome of simulated card and mobile-money payments.
pub trait SettlementPolicy: Send + Sync {
    fn authorize_card(&self, amount: Decimal) -> bool;
    fn confirm_mobile_money(&self, amount: Decimal) -> bool;
}

/// Approves each payment with a fixed probability per rail.
pub struct RandomPolicy {
    rng: Mutex<StdRng>,
    card_success_rate: f64,
    mobile_money_success_rate: f64,
}

impl RandomPolicy {
    pub fn from_entropy(card_success_rate: f64, mobile_money_success_rate: f64) -> Self {
        Self::with_rng(
            StdRng::from_entropy(),
            card_success_rate,
            mobile_money_success_rate,
        )
    }

    pub fn seeded(seed: u64, card_success_rate: f64, mobile_money_success_rate: f64) -> Self {
        Self::with_rng(
            StdRng::seed_from_u64(seed),
            card_success_rate,
            mobile_money_success_rate,
        )
    }

    fn with_rng(rng: StdRng, card_success_rate: f64, mobile_money_success_rate: f64) -> Self {
        Self {
            rng: Mutex::new(rng),
            card_success_rate,
            mobile_money_success_rate,
        }
    }

    fn draw(&self, rate: f64) -> bool {
        self.rng.lock().gen::<f64>() < rate
    }
}

impl SettlementPolicy for RandomPolicy {
    fn authorize_card(&self, _amount: Decimal) -> bool {
        self.draw(self.card_success_rate)
    }

    fn confirm_mobile_money(&self, _amount: Decimal) -> bool {
        self.draw(self.mobile_money_success_rate)
    }
}

/// Always returns the same answer per rail.
#[derive(Debug, Clone, Copy)]
pub struct FixedPolicy {
    pub card: bool,
    pub mobile_money: bool,
}

impl FixedPolicy {
    pub fn approve_all() -> Self {
        Self {
            card: true,
            mobile_money: true,
        }
    }

    pub fn decline_all() -> Self {
        Self {
            card: false,
            mobile_money: false,
        }
    }
}

impl SettlementPolicy for FixedPolicy {
    fn authorize_card(&self, _amount: Decimal) -> bool {
        self.card
    }

    fn confirm_mobile_money(&self, _amount: Decimal) -> bool {
        self.mobile_money
    }
}

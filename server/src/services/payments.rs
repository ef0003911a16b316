use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::models::notification::{NewNotification, NotificationKind};
use crate::models::ticket::TicketStatus;
use crate::models::transaction::{PaymentMethod, Settlement, Transaction, TransactionStatus};
use crate::models::user::User;
use crate::payments::gateway::StkCallback;
use crate::payments::{ScheduledSettlement, SettlementPolicy, SettlementScheduler};
use crate::store::Store;
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::validate_mpesa_phone;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    #[validate(length(min = 1, message = "At least one ticket is required"))]
    pub ticket_ids: Vec<Uuid>,
    pub payment_method: PaymentMethod,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub status: TransactionStatus,
    pub message: String,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutcome {
    pub transaction: Transaction,
    pub payment_response: PaymentResponse,
    pub total_amount: Decimal,
}

/// Applies a settlement and records the buyer notification when it completes
/// the transaction. `None` means the transaction had already left `pending`.
async fn apply_settlement(
    store: &dyn Store,
    transaction_id: Uuid,
    settlement: Settlement,
) -> AppResult<Option<Transaction>> {
    let Some(transaction) = store.settle_transaction(transaction_id, settlement).await? else {
        return Ok(None);
    };

    if transaction.status == TransactionStatus::Completed {
        let notification = NewNotification {
            recipient_id: transaction.buyer_id,
            event_id: None,
            ticket_id: transaction.ticket_ids.first().copied(),
            kind: NotificationKind::PaymentConfirmation,
            title: "Payment confirmed".to_string(),
            message: format!(
                "Your payment of {} for {} ticket(s) has been received.",
                transaction.amount,
                transaction.ticket_ids.len()
            ),
        };
        if let Err(e) = store.create_notification(notification, Utc::now()).await {
            warn!(transaction_id = %transaction.id, error = %e, "Failed to record payment notification");
        }
    }

    Ok(Some(transaction))
}

/// An armed mobile-money timer. `attempt` tells a re-initiated payment's
/// timer apart from the one it replaced.
struct PendingSettlement {
    attempt: Uuid,
    timer: ScheduledSettlement,
}

type PendingMap = DashMap<Uuid, PendingSettlement>;

/// Drops the entry for `transaction_id` only if it still belongs to `attempt`.
fn release(pending: &PendingMap, transaction_id: Uuid, attempt: Uuid) -> bool {
    pending
        .remove_if(&transaction_id, |_, entry| entry.attempt == attempt)
        .is_some()
}

fn reference(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple()).to_uppercase()
}

pub struct PaymentService {
    store: Arc<dyn Store>,
    policy: Arc<dyn SettlementPolicy>,
    scheduler: SettlementScheduler,
    mobile_money_delay: Duration,
    pending: Arc<PendingMap>,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn Store>,
        policy: Arc<dyn SettlementPolicy>,
        scheduler: SettlementScheduler,
        config: &Config,
    ) -> Self {
        Self {
            store,
            policy,
            scheduler,
            mobile_money_delay: config.mobile_money_delay,
            pending: Arc::new(DashMap::new()),
        }
    }

    pub fn scheduler(&self) -> &SettlementScheduler {
        &self.scheduler
    }

    /// Transactions with a simulated mobile-money timer still armed.
    pub fn awaiting_settlement(&self) -> usize {
        self.pending.len()
    }

    pub async fn initiate(
        &self,
        buyer: &User,
        request: InitiatePaymentRequest,
    ) -> AppResult<PaymentOutcome> {
        let method = request.payment_method;
        let phone_number = match method {
            PaymentMethod::Pending => {
                return Err(AppError::InvalidArgument(
                    "Payment method must be one of: mobile-money, card, cash".to_string(),
                ))
            }
            PaymentMethod::MobileMoney => {
                let phone = request.phone_number.ok_or_else(|| {
                    AppError::InvalidArgument(
                        "Phone number is required for mobile money payments".to_string(),
                    )
                })?;
                validate_mpesa_phone(&phone).map_err(|_| {
                    AppError::InvalidArgument(
                        "Please enter a valid M-Pesa phone number (e.g., +254712345678)"
                            .to_string(),
                    )
                })?;
                Some(phone)
            }
            PaymentMethod::Cash | PaymentMethod::Card => None,
        };

        let requested: HashSet<Uuid> = request.ticket_ids.iter().copied().collect();
        if requested.is_empty() {
            return Err(AppError::InvalidArgument(
                "At least one ticket is required".to_string(),
            ));
        }
        let ids: Vec<Uuid> = requested.iter().copied().collect();
        let tickets = self.store.tickets_by_ids(&ids).await?;
        let owned = tickets.len() == requested.len()
            && tickets
                .iter()
                .all(|t| t.buyer_id == buyer.id && t.status == TicketStatus::Purchased);
        if !owned {
            return Err(AppError::NotFound(
                "Some tickets not found or not authorized".to_string(),
            ));
        }

        let transaction_id = tickets[0].transaction_id;
        let transaction = self
            .store
            .transaction_by_id(transaction_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;
        let covered: HashSet<Uuid> = transaction.ticket_ids.iter().copied().collect();
        if tickets.iter().any(|t| t.transaction_id != transaction_id) || covered != requested {
            return Err(AppError::InvalidArgument(
                "Tickets must be paid together with the rest of their purchase".to_string(),
            ));
        }
        if matches!(
            transaction.status,
            TransactionStatus::Completed | TransactionStatus::Refunded
        ) {
            return Err(AppError::InvalidState(
                "Transaction has already been settled".to_string(),
            ));
        }

        let total: Decimal = tickets.iter().map(|t| t.price).sum();
        let merchant_request_id =
            (method == PaymentMethod::MobileMoney).then(|| reference("MR"));

        let transaction = self
            .store
            .begin_payment(transaction_id, method, merchant_request_id.clone(), Utc::now())
            .await?
            .ok_or_else(|| {
                AppError::InvalidState("Transaction has already been settled".to_string())
            })?;

        info!(
            transaction_id = %transaction.id,
            buyer_id = %buyer.id,
            method = %method,
            amount = %total,
            "Payment initiated"
        );

        let (transaction, payment_response) = match method {
            PaymentMethod::Cash => {
                let settled = self
                    .settle_now(transaction, Settlement::completed(None, Utc::now()))
                    .await?;
                let response = PaymentResponse {
                    status: settled.status,
                    message: "Cash payment recorded".to_string(),
                    amount: total,
                    reference: None,
                    merchant_request_id: None,
                    phone_number: None,
                };
                (settled, response)
            }
            PaymentMethod::Card => {
                let settlement = if self.policy.authorize_card(total) {
                    Settlement::completed(Some(reference("CARD")), Utc::now())
                } else {
                    Settlement::failed("Card payment declined", Utc::now())
                };
                let settled = self.settle_now(transaction, settlement).await?;
                let message = match settled.status {
                    TransactionStatus::Completed => "Card payment processed successfully",
                    _ => "Card payment declined",
                };
                let response = PaymentResponse {
                    status: settled.status,
                    message: message.to_string(),
                    amount: total,
                    reference: settled.gateway_reference.clone(),
                    merchant_request_id: None,
                    phone_number: None,
                };
                (settled, response)
            }
            PaymentMethod::MobileMoney | PaymentMethod::Pending => {
                self.schedule_mobile_money(transaction.id, total);
                let response = PaymentResponse {
                    status: TransactionStatus::Pending,
                    message: "M-Pesa STK push initiated. Please check your phone.".to_string(),
                    amount: total,
                    reference: Some(transaction.id.to_string()),
                    merchant_request_id,
                    phone_number,
                };
                (transaction, response)
            }
        };

        Ok(PaymentOutcome {
            transaction,
            payment_response,
            total_amount: total,
        })
    }

    /// Settles from a gateway callback. Replays after settlement change
    /// nothing and report the transaction as it stands.
    pub async fn handle_callback(&self, gateway: &str, callback: StkCallback) -> AppResult<Transaction> {
        match gateway.parse::<PaymentMethod>() {
            Ok(PaymentMethod::MobileMoney) => {}
            _ => {
                return Err(AppError::NotFound(format!(
                    "Unknown payment gateway '{gateway}'"
                )))
            }
        }

        let transaction = self
            .store
            .transaction_by_merchant_request(&callback.merchant_request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;

        if let Some((_, entry)) = self.pending.remove(&transaction.id) {
            entry.timer.cancel();
        }

        let now = Utc::now();
        let settlement = if callback.succeeded() {
            if let Some(amount) = callback.metadata("Amount") {
                if amount.to_string() != transaction.amount.normalize().to_string() {
                    warn!(
                        transaction_id = %transaction.id,
                        reported = %amount,
                        expected = %transaction.amount,
                        "Gateway reported a different amount"
                    );
                }
            }
            Settlement::completed(Some(callback.checkout_request_id.clone()), now)
        } else if callback.result_desc.is_empty() {
            Settlement::failed("Payment failed", now)
        } else {
            Settlement::failed(callback.result_desc.clone(), now)
        };

        match apply_settlement(self.store.as_ref(), transaction.id, settlement).await? {
            Some(settled) => {
                info!(
                    transaction_id = %settled.id,
                    checkout_request_id = %callback.checkout_request_id,
                    status = %settled.status,
                    "Gateway callback settled transaction"
                );
                Ok(settled)
            }
            None => {
                info!(
                    transaction_id = %transaction.id,
                    status = %transaction.status,
                    "Gateway callback replay ignored"
                );
                Ok(transaction)
            }
        }
    }

    async fn settle_now(&self, transaction: Transaction, settlement: Settlement) -> AppResult<Transaction> {
        match apply_settlement(self.store.as_ref(), transaction.id, settlement).await? {
            Some(settled) => Ok(settled),
            None => self
                .store
                .transaction_by_id(transaction.id)
                .await?
                .ok_or_else(|| AppError::NotFound("Transaction not found".to_string())),
        }
    }

    fn schedule_mobile_money(&self, transaction_id: Uuid, amount: Decimal) {
        let store = Arc::clone(&self.store);
        let policy = Arc::clone(&self.policy);
        let pending = Arc::clone(&self.pending);
        let attempt = Uuid::new_v4();

        let timer = self.scheduler.schedule(self.mobile_money_delay, async move {
            release(&pending, transaction_id, attempt);

            let now = Utc::now();
            let settlement = if policy.confirm_mobile_money(amount) {
                Settlement::completed(Some(format!("MP{}", now.timestamp_millis())), now)
            } else {
                Settlement::failed("Mobile money payment was not confirmed", now)
            };

            match apply_settlement(store.as_ref(), transaction_id, settlement).await {
                Ok(Some(settled)) => {
                    info!(transaction_id = %transaction_id, status = %settled.status, "Mobile money payment settled");
                }
                Ok(None) => {
                    debug!(transaction_id = %transaction_id, "Mobile money timer found transaction already settled");
                }
                Err(e) => {
                    error!(transaction_id = %transaction_id, error = %e, "Mobile money settlement failed");
                }
            }
        });

        if let Some(previous) = self
            .pending
            .insert(transaction_id, PendingSettlement { attempt, timer })
        {
            previous.timer.cancel();
        }
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

text_enum! {
    PaymentMethod {
        Pending => "pending",
        Cash => "cash",
        Card => "card",
        MobileMoney => "mobile-money" | "mpesa",
    }
}

text_enum! {
    TransactionStatus {
        Pending => "pending",
        Completed => "completed",
        Failed => "failed",
        Refunded => "refunded",
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub ticket_ids: Vec<Uuid>,
    pub buyer_id: Uuid,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub status: TransactionStatus,
    pub merchant_request_id: Option<String>,
    pub gateway_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Terminal outcome applied to a transaction that is still pending.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub status: TransactionStatus,
    pub gateway_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub settled_at: DateTime<Utc>,
}

impl Settlement {
    pub fn completed(reference: Option<String>, at: DateTime<Utc>) -> Self {
        Self {
            status: TransactionStatus::Completed,
            gateway_reference: reference,
            failure_reason: None,
            settled_at: at,
        }
    }

    pub fn failed(reason: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            status: TransactionStatus::Failed,
            gateway_reference: None,
            failure_reason: Some(reason.into()),
            settled_at: at,
        }
    }
}

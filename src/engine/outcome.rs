use serde::Serialize;

use super::error::{Rejection, RejectionKind};
use super::transaction::{TransactionRecord, TransactionType};

/// Result of a single `execute` call that did not hit an infrastructure error.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionOutcome {
    /// The request was applied and produced this record
    Applied(TransactionRecord),
    /// The request was refused; nothing changed
    Rejected(Rejection),
}

impl TransactionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransactionOutcome::Applied(_))
    }

    pub fn record(&self) -> Option<&TransactionRecord> {
        match self {
            TransactionOutcome::Applied(record) => Some(record),
            TransactionOutcome::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            TransactionOutcome::Applied(_) => None,
            TransactionOutcome::Rejected(rejection) => Some(rejection),
        }
    }

    /// Human-readable summary
    pub fn message(&self) -> String {
        match self {
            TransactionOutcome::Applied(record) => match record.transaction_type() {
                TransactionType::Transfer => "Transfer completed successfully".to_owned(),
                TransactionType::Deposit | TransactionType::Withdrawal => {
                    "Transaction completed successfully".to_owned()
                }
            },
            TransactionOutcome::Rejected(rejection) => rejection.to_string(),
        }
    }
}

/// Caller-facing shape of an outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<RejectionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<TransactionRecord>,
}

impl From<TransactionOutcome> for TransactionResponse {
    fn from(outcome: TransactionOutcome) -> Self {
        let message = outcome.message();
        match outcome {
            TransactionOutcome::Applied(record) => Self {
                success: true,
                message,
                error_kind: None,
                record: Some(record),
            },
            TransactionOutcome::Rejected(rejection) => Self {
                success: false,
                message,
                error_kind: Some(rejection.kind()),
                record: None,
            },
        }
    }
}

/// Counters reported after a CSV batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub applied: u64,
    pub rejected: u64,
}

//! Wire types shared between the settlement engine's transport layers
//! and clients. Plain serde structs only; no engine dependency.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Requested,
    Sent,
    Confirmed,
    RolledBack,
}

impl TransferStatus {
    /// Returns the canonical status string used by the engine/database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Sent => "sent",
            Self::Confirmed => "confirmed",
            Self::RolledBack => "rolled_back",
        }
    }
}

pub mod expense {
    use super::*;

    /// One member's portion of an expense.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ShareBody {
        pub member_id: String,
        pub amount_minor: i64,
    }

    /// Request body for creating an expense.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub title: String,
        pub amount_minor: i64,
        pub payer_id: String,
        pub paid_at: DateTime<Utc>,
        pub shares: Vec<ShareBody>,
    }

    /// Request body for updating an expense (full share replace).
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseUpdate {
        pub title: String,
        pub amount_minor: i64,
        pub payer_id: String,
        pub paid_at: DateTime<Utc>,
        pub shares: Vec<ShareBody>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub group_id: String,
        pub title: String,
        pub amount_minor: i64,
        pub payer_id: String,
        pub paid_at: DateTime<Utc>,
        pub shares: Vec<ShareBody>,
    }
}

pub mod settlement {
    use super::*;

    /// One member's net position in a group (positive = owed money).
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberBalance {
        pub member_id: String,
        pub balance_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalancesResponse {
        pub balances: Vec<MemberBalance>,
    }

    /// A suggested transfer, traceable to the expense that produced it.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct DraftView {
        pub from_member: String,
        pub to_member: String,
        pub amount_minor: i64,
        pub expense_id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DraftsResponse {
        pub drafts: Vec<DraftView>,
    }

    /// One transfer to create in a commit batch.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct CommitItemBody {
        pub from_member: String,
        pub to_member: String,
        pub amount_minor: i64,
        pub memo: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CommitRequest {
        pub items: Vec<CommitItemBody>,
    }

    /// Request body for `mark_sent`, `confirm`, `rollback` and `nudge`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferActionRequest {
        pub memo: Option<String>,
    }

    /// Request body for attaching a payment proof.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct AttachProofRequest {
        pub proof_url: String,
        pub memo: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferView {
        pub id: Uuid,
        pub group_id: String,
        pub from_member: String,
        pub to_member: String,
        pub amount_minor: i64,
        pub status: TransferStatus,
        pub proof_url: Option<String>,
        pub memo: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }
}

pub mod event {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SettlementEventKind {
        Requested,
        Sent,
        Confirmed,
        RolledBack,
        Nudge,
    }

    /// Payload fanned out to group members on every transfer change.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementEventBody {
        pub kind: SettlementEventKind,
        pub group_id: String,
        pub transfer_id: Uuid,
        pub from_member: String,
        pub to_member: String,
        pub amount_minor: i64,
        pub status: TransferStatus,
        pub memo: Option<String>,
        pub actor_id: String,
        pub occurred_at: DateTime<Utc>,
    }
}

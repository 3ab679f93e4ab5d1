//! Command structs for engine operations.
//!
//! These types group parameters for write operations (expense
//! create/update, draft commit, transfer actions), keeping call sites
//! readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One member's portion of an expense, as supplied by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareInput {
    pub member_id: String,
    pub amount_minor: i64,
}

impl ShareInput {
    #[must_use]
    pub fn new(member_id: impl Into<String>, amount_minor: i64) -> Self {
        Self {
            member_id: member_id.into(),
            amount_minor,
        }
    }
}

/// Create an expense with its full share list.
#[derive(Clone, Debug)]
pub struct NewExpenseCmd {
    pub group_id: String,
    pub title: String,
    pub amount_minor: i64,
    pub payer_id: String,
    pub created_by: String,
    pub paid_at: DateTime<Utc>,
    pub shares: Vec<ShareInput>,
}

impl NewExpenseCmd {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        title: impl Into<String>,
        amount_minor: i64,
        payer_id: impl Into<String>,
        created_by: impl Into<String>,
        paid_at: DateTime<Utc>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            title: title.into(),
            amount_minor,
            payer_id: payer_id.into(),
            created_by: created_by.into(),
            paid_at,
            shares: Vec::new(),
        }
    }

    #[must_use]
    pub fn share(mut self, member_id: impl Into<String>, amount_minor: i64) -> Self {
        self.shares.push(ShareInput::new(member_id, amount_minor));
        self
    }

    #[must_use]
    pub fn shares(mut self, shares: Vec<ShareInput>) -> Self {
        self.shares = shares;
        self
    }
}

/// Update an expense, fully replacing its share list.
#[derive(Clone, Debug)]
pub struct UpdateExpenseCmd {
    pub group_id: String,
    pub expense_id: Uuid,
    pub title: String,
    pub amount_minor: i64,
    pub payer_id: String,
    pub paid_at: DateTime<Utc>,
    pub shares: Vec<ShareInput>,
}

impl UpdateExpenseCmd {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        expense_id: Uuid,
        title: impl Into<String>,
        amount_minor: i64,
        payer_id: impl Into<String>,
        paid_at: DateTime<Utc>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            expense_id,
            title: title.into(),
            amount_minor,
            payer_id: payer_id.into(),
            paid_at,
            shares: Vec::new(),
        }
    }

    #[must_use]
    pub fn share(mut self, member_id: impl Into<String>, amount_minor: i64) -> Self {
        self.shares.push(ShareInput::new(member_id, amount_minor));
        self
    }

    #[must_use]
    pub fn shares(mut self, shares: Vec<ShareInput>) -> Self {
        self.shares = shares;
        self
    }
}

/// One transfer to create in a [`CommitCmd`] batch.
#[derive(Clone, Debug)]
pub struct CommitItem {
    pub from_member: String,
    pub to_member: String,
    pub amount_minor: i64,
    pub memo: Option<String>,
}

impl CommitItem {
    #[must_use]
    pub fn new(
        from_member: impl Into<String>,
        to_member: impl Into<String>,
        amount_minor: i64,
    ) -> Self {
        Self {
            from_member: from_member.into(),
            to_member: to_member.into(),
            amount_minor,
            memo: None,
        }
    }

    #[must_use]
    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }
}

/// Commit a batch of selected drafts as `requested` transfers.
#[derive(Clone, Debug)]
pub struct CommitCmd {
    pub group_id: String,
    pub actor_id: String,
    pub items: Vec<CommitItem>,
}

impl CommitCmd {
    #[must_use]
    pub fn new(group_id: impl Into<String>, actor_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            actor_id: actor_id.into(),
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn item(mut self, item: CommitItem) -> Self {
        self.items.push(item);
        self
    }
}

/// A single-transfer action (`mark_sent`, `confirm`, `nudge`).
#[derive(Clone, Debug)]
pub struct TransferActionCmd {
    pub group_id: String,
    pub transfer_id: Uuid,
    pub actor_id: String,
    pub memo: Option<String>,
}

impl TransferActionCmd {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        transfer_id: Uuid,
        actor_id: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            transfer_id,
            actor_id: actor_id.into(),
            memo: None,
        }
    }

    #[must_use]
    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }
}

/// Roll a transfer back. Admins may roll back a confirmed transfer.
#[derive(Clone, Debug)]
pub struct RollbackCmd {
    pub group_id: String,
    pub transfer_id: Uuid,
    pub actor_id: String,
    pub is_admin: bool,
    pub memo: Option<String>,
}

impl RollbackCmd {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        transfer_id: Uuid,
        actor_id: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            transfer_id,
            actor_id: actor_id.into(),
            is_admin: false,
            memo: None,
        }
    }

    #[must_use]
    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    #[must_use]
    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }
}

/// Attach (or replace) a payment proof URL on a transfer.
#[derive(Clone, Debug)]
pub struct AttachProofCmd {
    pub group_id: String,
    pub transfer_id: Uuid,
    pub actor_id: String,
    pub proof_url: String,
    pub memo: Option<String>,
}

impl AttachProofCmd {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        transfer_id: Uuid,
        actor_id: impl Into<String>,
        proof_url: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            transfer_id,
            actor_id: actor_id.into(),
            proof_url: proof_url.into(),
            memo: None,
        }
    }

    #[must_use]
    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }
}

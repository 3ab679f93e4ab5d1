//! Transfer primitives and the settlement state machine.
//!
//! A `Transfer` records the real-world act of one member sending money
//! to another. The engine never moves money; it stores attestations
//! ("sent", "confirmed") supplied by the two parties.
//!
//! Lifecycle: `requested → sent → confirmed`, with `rolled_back`
//! reachable from every state (from a confirmed transfer, admins only).
//! Each state is its own newtype and transition methods exist only on
//! the state they apply to, so an illegal transition cannot be written
//! past the single dispatch point in the settlement ops.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Requested,
    Sent,
    Confirmed,
    RolledBack,
}

impl TransferStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Sent => "sent",
            Self::Confirmed => "confirmed",
            Self::RolledBack => "rolled_back",
        }
    }

    /// A transfer still blocking a new commit for the same pair.
    pub fn is_unresolved(self) -> bool {
        matches!(self, Self::Requested | Self::Sent)
    }

    pub const UNRESOLVED: [Self; 2] = [Self::Requested, Self::Sent];
}

impl TryFrom<&str> for TransferStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "requested" => Ok(Self::Requested),
            "sent" => Ok(Self::Sent),
            "confirmed" => Ok(Self::Confirmed),
            "rolled_back" => Ok(Self::RolledBack),
            other => Err(EngineError::Validation(format!(
                "invalid transfer status: {other}"
            ))),
        }
    }
}

/// A suggested transfer derived from one expense share. Never persisted;
/// the expense id keeps each suggestion traceable to its origin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDraft {
    pub from_member: String,
    pub to_member: String,
    pub amount_minor: i64,
    pub expense_id: Uuid,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
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

impl Transfer {
    pub fn new(
        group_id: String,
        from_member: String,
        to_member: String,
        amount_minor: i64,
        memo: Option<String>,
        now: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::Validation(
                "amount_minor must be > 0".to_string(),
            ));
        }
        if from_member.is_empty() || to_member.is_empty() {
            return Err(EngineError::Validation(
                "from_member and to_member must not be empty".to_string(),
            ));
        }
        if from_member == to_member {
            return Err(EngineError::Validation(
                "from_member and to_member must differ".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            group_id,
            from_member,
            to_member,
            amount_minor,
            status: TransferStatus::Requested,
            proof_url: None,
            memo,
            created_at: now,
            updated_at: now,
        })
    }

    fn stamp(&mut self, memo: Option<String>, now: DateTime<Utc>) {
        if memo.is_some() {
            self.memo = memo;
        }
        self.updated_at = now;
    }

    fn require_from(&self, actor_id: &str) -> ResultEngine<()> {
        if actor_id != self.from_member {
            return Err(EngineError::Forbidden(
                "only the sending member may do this".to_string(),
            ));
        }
        Ok(())
    }

    fn require_from_or_admin(&self, actor_id: &str, is_admin: bool) -> ResultEngine<()> {
        if is_admin {
            return Ok(());
        }
        if actor_id != self.from_member {
            return Err(EngineError::Forbidden(
                "only the sending member or an admin may roll back".to_string(),
            ));
        }
        Ok(())
    }
}

/// A transfer in the `requested` state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestedTransfer(Transfer);

/// A transfer in the `sent` state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentTransfer(Transfer);

/// A transfer in the `confirmed` state (terminal, admins may roll back).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmedTransfer(Transfer);

/// A transfer in the `rolled_back` state (terminal).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RolledBackTransfer(Transfer);

impl RequestedTransfer {
    /// The sending member attests the money left their account.
    pub fn mark_sent(
        self,
        actor_id: &str,
        memo: Option<String>,
        now: DateTime<Utc>,
    ) -> ResultEngine<SentTransfer> {
        self.0.require_from(actor_id)?;
        let mut transfer = self.0;
        transfer.status = TransferStatus::Sent;
        transfer.stamp(memo, now);
        Ok(SentTransfer(transfer))
    }

    pub fn roll_back(
        self,
        actor_id: &str,
        is_admin: bool,
        memo: Option<String>,
        now: DateTime<Utc>,
    ) -> ResultEngine<RolledBackTransfer> {
        self.0.require_from_or_admin(actor_id, is_admin)?;
        let mut transfer = self.0;
        transfer.status = TransferStatus::RolledBack;
        transfer.stamp(memo, now);
        Ok(RolledBackTransfer(transfer))
    }

    pub fn into_inner(self) -> Transfer {
        self.0
    }
}

impl SentTransfer {
    /// The receiving member attests the money arrived.
    pub fn confirm(
        self,
        actor_id: &str,
        memo: Option<String>,
        now: DateTime<Utc>,
    ) -> ResultEngine<ConfirmedTransfer> {
        if actor_id != self.0.to_member {
            return Err(EngineError::Forbidden(
                "only the receiving member may confirm".to_string(),
            ));
        }
        let mut transfer = self.0;
        transfer.status = TransferStatus::Confirmed;
        transfer.stamp(memo, now);
        Ok(ConfirmedTransfer(transfer))
    }

    pub fn roll_back(
        self,
        actor_id: &str,
        is_admin: bool,
        memo: Option<String>,
        now: DateTime<Utc>,
    ) -> ResultEngine<RolledBackTransfer> {
        self.0.require_from_or_admin(actor_id, is_admin)?;
        let mut transfer = self.0;
        transfer.status = TransferStatus::RolledBack;
        transfer.stamp(memo, now);
        Ok(RolledBackTransfer(transfer))
    }

    pub fn into_inner(self) -> Transfer {
        self.0
    }
}

impl ConfirmedTransfer {
    /// A confirmed settlement is final for members; only an admin may
    /// undo it, e.g. after a dispute.
    pub fn roll_back(
        self,
        _actor_id: &str,
        is_admin: bool,
        memo: Option<String>,
        now: DateTime<Utc>,
    ) -> ResultEngine<RolledBackTransfer> {
        if !is_admin {
            return Err(EngineError::Forbidden(
                "only an admin may roll back a confirmed transfer".to_string(),
            ));
        }
        let mut transfer = self.0;
        transfer.status = TransferStatus::RolledBack;
        transfer.stamp(memo, now);
        Ok(RolledBackTransfer(transfer))
    }

    pub fn into_inner(self) -> Transfer {
        self.0
    }
}

impl RolledBackTransfer {
    pub fn into_inner(self) -> Transfer {
        self.0
    }
}

/// A transfer tagged by its current state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferState {
    Requested(RequestedTransfer),
    Sent(SentTransfer),
    Confirmed(ConfirmedTransfer),
    RolledBack(RolledBackTransfer),
}

impl From<Transfer> for TransferState {
    fn from(transfer: Transfer) -> Self {
        match transfer.status {
            TransferStatus::Requested => Self::Requested(RequestedTransfer(transfer)),
            TransferStatus::Sent => Self::Sent(SentTransfer(transfer)),
            TransferStatus::Confirmed => Self::Confirmed(ConfirmedTransfer(transfer)),
            TransferStatus::RolledBack => Self::RolledBack(RolledBackTransfer(transfer)),
        }
    }
}

impl TransferState {
    pub fn status(&self) -> TransferStatus {
        self.transfer().status
    }

    pub fn transfer(&self) -> &Transfer {
        match self {
            Self::Requested(t) => &t.0,
            Self::Sent(t) => &t.0,
            Self::Confirmed(t) => &t.0,
            Self::RolledBack(t) => &t.0,
        }
    }

    pub fn into_inner(self) -> Transfer {
        match self {
            Self::Requested(t) => t.0,
            Self::Sent(t) => t.0,
            Self::Confirmed(t) => t.0,
            Self::RolledBack(t) => t.0,
        }
    }

    /// Attach a payment proof without changing the status. Allowed in
    /// every state, and only for the sending member.
    pub fn attach_proof(
        self,
        actor_id: &str,
        proof_url: String,
        memo: Option<String>,
        now: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        self.transfer().require_from(actor_id)?;
        let mut transfer = self.into_inner();
        transfer.proof_url = Some(proof_url);
        transfer.stamp(memo, now);
        Ok(Self::from(transfer))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transfers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub from_member: String,
    pub to_member: String,
    pub amount_minor: i64,
    pub status: String,
    pub proof_url: Option<String>,
    pub memo: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transfer> for ActiveModel {
    fn from(transfer: &Transfer) -> Self {
        Self {
            id: ActiveValue::Set(transfer.id.to_string()),
            group_id: ActiveValue::Set(transfer.group_id.clone()),
            from_member: ActiveValue::Set(transfer.from_member.clone()),
            to_member: ActiveValue::Set(transfer.to_member.clone()),
            amount_minor: ActiveValue::Set(transfer.amount_minor),
            status: ActiveValue::Set(transfer.status.as_str().to_string()),
            proof_url: ActiveValue::Set(transfer.proof_url.clone()),
            memo: ActiveValue::Set(transfer.memo.clone()),
            created_at: ActiveValue::Set(transfer.created_at),
            updated_at: ActiveValue::Set(transfer.updated_at),
        }
    }
}

impl TryFrom<Model> for Transfer {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("transfer not exists".to_string()))?,
            group_id: model.group_id,
            from_member: model.from_member,
            to_member: model.to_member,
            amount_minor: model.amount_minor,
            status: TransferStatus::try_from(model.status.as_str())?,
            proof_url: model.proof_url,
            memo: model.memo,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requested() -> RequestedTransfer {
        let transfer = Transfer::new(
            "trip".to_string(),
            "m2".to_string(),
            "m1".to_string(),
            60000,
            None,
            Utc::now(),
        )
        .unwrap();
        match TransferState::from(transfer) {
            TransferState::Requested(t) => t,
            _ => unreachable!(),
        }
    }

    #[test]
    fn happy_path_requested_sent_confirmed() {
        let now = Utc::now();
        let sent = requested().mark_sent("m2", None, now).unwrap();
        let confirmed = sent.confirm("m1", Some("thanks".to_string()), now).unwrap();
        let transfer = confirmed.into_inner();
        assert_eq!(transfer.status, TransferStatus::Confirmed);
        assert_eq!(transfer.memo.as_deref(), Some("thanks"));
    }

    #[test]
    fn mark_sent_requires_sender() {
        let err = requested().mark_sent("m1", None, Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }

    #[test]
    fn confirm_requires_receiver() {
        let sent = requested().mark_sent("m2", None, Utc::now()).unwrap();
        let err = sent.confirm("m2", None, Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }

    #[test]
    fn rollback_actor_rules() {
        // Sender may roll back their own requested transfer.
        let rolled = requested()
            .roll_back("m2", false, None, Utc::now())
            .unwrap();
        assert_eq!(rolled.into_inner().status, TransferStatus::RolledBack);

        // A third member may not, admin or not supplied.
        let err = requested()
            .roll_back("m3", false, None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));

        // Confirmed transfers need an admin.
        let confirmed = requested()
            .mark_sent("m2", None, Utc::now())
            .unwrap()
            .confirm("m1", None, Utc::now())
            .unwrap();
        let err = confirmed
            .clone()
            .roll_back("m2", false, None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
        let rolled = confirmed.roll_back("m9", true, None, Utc::now()).unwrap();
        assert_eq!(rolled.into_inner().status, TransferStatus::RolledBack);
    }

    #[test]
    fn attach_proof_keeps_status() {
        let state = TransferState::from(requested().into_inner());
        let state = state
            .attach_proof("m2", "https://pay.example/r/1".to_string(), None, Utc::now())
            .unwrap();
        assert_eq!(state.status(), TransferStatus::Requested);
        assert!(state.transfer().proof_url.is_some());

        let err = TransferState::from(state.into_inner())
            .attach_proof("m1", "https://pay.example/r/2".to_string(), None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }

    #[test]
    fn self_transfer_rejected() {
        let err = Transfer::new(
            "trip".to_string(),
            "m1".to_string(),
            "m1".to_string(),
            100,
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}

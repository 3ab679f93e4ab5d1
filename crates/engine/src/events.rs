//! Settlement events handed to an external notifier.
//!
//! The engine describes every transfer state change (and nudges) as a
//! [`SettlementEvent`] and hands it to the injected [`EventEmitter`]
//! after the database transaction has committed. Delivery is best
//! effort: an emitter failure is logged and never surfaces to the
//! caller, and never undoes the committed change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::transfers::{Transfer, TransferStatus};

pub type EmitError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementEventKind {
    Requested,
    Sent,
    Confirmed,
    RolledBack,
    Nudge,
}

impl SettlementEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Sent => "sent",
            Self::Confirmed => "confirmed",
            Self::RolledBack => "rolled_back",
            Self::Nudge => "nudge",
        }
    }
}

/// Description of one transfer state change, for realtime fan-out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementEvent {
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

impl SettlementEvent {
    pub fn new(
        kind: SettlementEventKind,
        transfer: &Transfer,
        actor_id: &str,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            group_id: transfer.group_id.clone(),
            transfer_id: transfer.id,
            from_member: transfer.from_member.clone(),
            to_member: transfer.to_member.clone(),
            amount_minor: transfer.amount_minor,
            status: transfer.status,
            memo: transfer.memo.clone(),
            actor_id: actor_id.to_string(),
            occurred_at,
        }
    }
}

/// Sink for settlement events. Implementations fan the event out
/// (websocket push, pub/sub); the engine only calls [`emit`].
///
/// [`emit`]: EventEmitter::emit
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: &SettlementEvent) -> Result<(), EmitError>;
}

/// Emitter that drops every event. Default when none is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopEmitter;

impl EventEmitter for NoopEmitter {
    fn emit(&self, _event: &SettlementEvent) -> Result<(), EmitError> {
        Ok(())
    }
}

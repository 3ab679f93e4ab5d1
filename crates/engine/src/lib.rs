//! Settlement core for shared travel expenses.
//!
//! The engine keeps a per-group ledger of expenses split into member
//! shares, derives net balances and suggested peer-to-peer transfer
//! drafts from it, and tracks committed transfers through an
//! actor-authorized state machine
//! (requested → sent → confirmed, with rollback).
//!
//! All amounts are integers in the smallest currency unit (`i64`); no
//! floating point is used anywhere. Balances are recomputed from the
//! ledger on every call rather than cached.

pub use commands::{
    AttachProofCmd, CommitCmd, CommitItem, NewExpenseCmd, RollbackCmd, ShareInput,
    TransferActionCmd, UpdateExpenseCmd,
};
pub use error::EngineError;
pub use events::{EmitError, EventEmitter, NoopEmitter, SettlementEvent, SettlementEventKind};
pub use expenses::Expense;
pub use ops::{Engine, EngineBuilder};
pub use shares::Share;
pub use transfers::{
    ConfirmedTransfer, RequestedTransfer, RolledBackTransfer, SentTransfer, Transfer,
    TransferDraft, TransferState, TransferStatus,
};

mod commands;
mod error;
mod events;
mod expenses;
mod ops;
mod shares;
mod transfers;

pub type ResultEngine<T> = Result<T, EngineError>;

use chrono::Utc;
use uuid::Uuid;

use sea_orm::{
    ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::{
    EngineError, ResultEngine, Transfer, TransferState, TransferStatus,
    commands::{AttachProofCmd, CommitCmd, RollbackCmd, TransferActionCmd},
    events::{SettlementEvent, SettlementEventKind},
    transfers,
};

use super::{Engine, normalize_optional_text, normalize_required_text, with_tx};

fn conflict_transition(action: &str, status: TransferStatus) -> EngineError {
    EngineError::Conflict(format!(
        "cannot {action} a {} transfer",
        status.as_str()
    ))
}

impl Engine {
    /// Commit a batch of selected drafts, creating one `requested`
    /// transfer per item.
    ///
    /// The batch is all-or-nothing: if any item has an unresolved
    /// (requested or sent) transfer for the same (from, to) pair in the
    /// group, the whole commit fails with a conflict and nothing is
    /// inserted. The check runs inside the same transaction as the
    /// inserts, and the storage schema backs it with a unique index over
    /// unresolved pairs, so two racing commits cannot both win.
    pub async fn commit_drafts(&self, cmd: CommitCmd) -> ResultEngine<Vec<Transfer>> {
        if cmd.items.is_empty() {
            return Err(EngineError::Validation(
                "commit requires at least one item".to_string(),
            ));
        }
        let now = Utc::now();

        let created: Vec<Transfer> = with_tx!(self, |db_tx| {
            let mut created = Vec::with_capacity(cmd.items.len());
            for item in &cmd.items {
                let memo = normalize_optional_text(item.memo.as_deref());
                let transfer = Transfer::new(
                    cmd.group_id.clone(),
                    item.from_member.clone(),
                    item.to_member.clone(),
                    item.amount_minor,
                    memo,
                    now,
                )?;

                self.require_pair_resolved(
                    &db_tx,
                    &cmd.group_id,
                    &transfer.from_member,
                    &transfer.to_member,
                )
                .await?;

                if let Err(err) = transfers::ActiveModel::from(&transfer).insert(&db_tx).await {
                    // The unresolved-pair index may have rejected the row
                    // under a concurrent commit; report that as a conflict
                    // rather than a database failure.
                    if self
                        .find_unresolved(
                            &db_tx,
                            &cmd.group_id,
                            &transfer.from_member,
                            &transfer.to_member,
                        )
                        .await?
                        .is_some()
                    {
                        return Err(EngineError::Conflict(format!(
                            "unresolved transfer {} -> {} already exists",
                            transfer.from_member, transfer.to_member
                        )));
                    }
                    return Err(err.into());
                }
                created.push(transfer);
            }
            Ok(created)
        })?;

        for transfer in &created {
            self.emit_event(SettlementEvent::new(
                SettlementEventKind::Requested,
                transfer,
                &cmd.actor_id,
                now,
            ));
        }
        Ok(created)
    }

    /// The sending member attests the money was sent.
    pub async fn mark_sent(&self, cmd: TransferActionCmd) -> ResultEngine<Transfer> {
        let memo = normalize_optional_text(cmd.memo.as_deref());
        let now = Utc::now();

        let updated = with_tx!(self, |db_tx| {
            let transfer = self
                .require_transfer(&db_tx, &cmd.group_id, cmd.transfer_id)
                .await?;
            let old_status = transfer.status;
            let sent = match TransferState::from(transfer) {
                TransferState::Requested(t) => t.mark_sent(&cmd.actor_id, memo.clone(), now)?,
                state => return Err(conflict_transition("mark_sent", state.status())),
            };
            let updated = sent.into_inner();
            self.persist_transition(&db_tx, old_status, &updated).await?;
            Ok(updated)
        })?;

        self.emit_event(SettlementEvent::new(
            SettlementEventKind::Sent,
            &updated,
            &cmd.actor_id,
            now,
        ));
        Ok(updated)
    }

    /// The receiving member attests the money arrived.
    pub async fn confirm(&self, cmd: TransferActionCmd) -> ResultEngine<Transfer> {
        let memo = normalize_optional_text(cmd.memo.as_deref());
        let now = Utc::now();

        let updated = with_tx!(self, |db_tx| {
            let transfer = self
                .require_transfer(&db_tx, &cmd.group_id, cmd.transfer_id)
                .await?;
            let old_status = transfer.status;
            let confirmed = match TransferState::from(transfer) {
                TransferState::Sent(t) => t.confirm(&cmd.actor_id, memo.clone(), now)?,
                state => return Err(conflict_transition("confirm", state.status())),
            };
            let updated = confirmed.into_inner();
            self.persist_transition(&db_tx, old_status, &updated).await?;
            Ok(updated)
        })?;

        self.emit_event(SettlementEvent::new(
            SettlementEventKind::Confirmed,
            &updated,
            &cmd.actor_id,
            now,
        ));
        Ok(updated)
    }

    /// Undo a transfer. The sending member may roll back their own
    /// requested or sent transfer; a confirmed transfer needs an admin.
    pub async fn rollback(&self, cmd: RollbackCmd) -> ResultEngine<Transfer> {
        let memo = normalize_optional_text(cmd.memo.as_deref());
        let now = Utc::now();

        let updated = with_tx!(self, |db_tx| {
            let transfer = self
                .require_transfer(&db_tx, &cmd.group_id, cmd.transfer_id)
                .await?;
            let old_status = transfer.status;
            let rolled = match TransferState::from(transfer) {
                TransferState::Requested(t) => {
                    t.roll_back(&cmd.actor_id, cmd.is_admin, memo.clone(), now)?
                }
                TransferState::Sent(t) => {
                    t.roll_back(&cmd.actor_id, cmd.is_admin, memo.clone(), now)?
                }
                TransferState::Confirmed(t) => {
                    t.roll_back(&cmd.actor_id, cmd.is_admin, memo.clone(), now)?
                }
                state => return Err(conflict_transition("rollback", state.status())),
            };
            let updated = rolled.into_inner();
            self.persist_transition(&db_tx, old_status, &updated).await?;
            Ok(updated)
        })?;

        self.emit_event(SettlementEvent::new(
            SettlementEventKind::RolledBack,
            &updated,
            &cmd.actor_id,
            now,
        ));
        Ok(updated)
    }

    /// Attach a payment proof URL; allowed in every state, sending
    /// member only, status unchanged. No event is emitted.
    pub async fn attach_proof(&self, cmd: AttachProofCmd) -> ResultEngine<Transfer> {
        let proof_url = normalize_required_text(&cmd.proof_url, "proof_url")?;
        let memo = normalize_optional_text(cmd.memo.as_deref());
        let now = Utc::now();

        with_tx!(self, |db_tx| {
            let transfer = self
                .require_transfer(&db_tx, &cmd.group_id, cmd.transfer_id)
                .await?;
            let old_status = transfer.status;
            let state = TransferState::from(transfer).attach_proof(
                &cmd.actor_id,
                proof_url.clone(),
                memo.clone(),
                now,
            )?;
            let updated = state.into_inner();
            self.persist_transition(&db_tx, old_status, &updated).await?;
            Ok(updated)
        })
    }

    /// Poke the other party about a transfer. Mutates nothing; the only
    /// effect is a notification event carrying the current state.
    pub async fn nudge(&self, cmd: TransferActionCmd) -> ResultEngine<()> {
        let transfer = self
            .require_transfer(&self.database, &cmd.group_id, cmd.transfer_id)
            .await?;
        let mut event = SettlementEvent::new(
            SettlementEventKind::Nudge,
            &transfer,
            &cmd.actor_id,
            Utc::now(),
        );
        event.memo = normalize_optional_text(cmd.memo.as_deref()).or(event.memo);
        self.emit_event(event);
        Ok(())
    }

    /// Return one transfer.
    pub async fn transfer(&self, group_id: &str, transfer_id: Uuid) -> ResultEngine<Transfer> {
        self.require_transfer(&self.database, group_id, transfer_id)
            .await
    }

    /// List a group's transfers, newest first.
    pub async fn list_transfers(&self, group_id: &str) -> ResultEngine<Vec<Transfer>> {
        let models = transfers::Entity::find()
            .filter(transfers::Column::GroupId.eq(group_id.to_string()))
            .order_by_desc(transfers::Column::CreatedAt)
            .order_by_desc(transfers::Column::Id)
            .all(&self.database)
            .await?;
        models.into_iter().map(Transfer::try_from).collect()
    }

    async fn require_transfer(
        &self,
        db: &impl ConnectionTrait,
        group_id: &str,
        transfer_id: Uuid,
    ) -> ResultEngine<Transfer> {
        let model = transfers::Entity::find_by_id(transfer_id.to_string())
            .filter(transfers::Column::GroupId.eq(group_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("transfer not exists".to_string()))?;
        Transfer::try_from(model)
    }

    async fn find_unresolved(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: &str,
        from_member: &str,
        to_member: &str,
    ) -> ResultEngine<Option<transfers::Model>> {
        transfers::Entity::find()
            .filter(transfers::Column::GroupId.eq(group_id.to_string()))
            .filter(transfers::Column::FromMember.eq(from_member.to_string()))
            .filter(transfers::Column::ToMember.eq(to_member.to_string()))
            .filter(
                transfers::Column::Status
                    .is_in(TransferStatus::UNRESOLVED.map(TransferStatus::as_str)),
            )
            .one(db_tx)
            .await
            .map_err(Into::into)
    }

    async fn require_pair_resolved(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: &str,
        from_member: &str,
        to_member: &str,
    ) -> ResultEngine<()> {
        if self
            .find_unresolved(db_tx, group_id, from_member, to_member)
            .await?
            .is_some()
        {
            return Err(EngineError::Conflict(format!(
                "unresolved transfer {from_member} -> {to_member} already exists"
            )));
        }
        Ok(())
    }

    /// Persist a state transition with a compare-and-swap on the status
    /// column: zero affected rows means another action won the race and
    /// the caller's read is stale.
    async fn persist_transition(
        &self,
        db_tx: &DatabaseTransaction,
        old_status: TransferStatus,
        updated: &Transfer,
    ) -> ResultEngine<()> {
        let result = transfers::Entity::update_many()
            .col_expr(
                transfers::Column::Status,
                Expr::value(updated.status.as_str()),
            )
            .col_expr(transfers::Column::Memo, Expr::value(updated.memo.clone()))
            .col_expr(
                transfers::Column::ProofUrl,
                Expr::value(updated.proof_url.clone()),
            )
            .col_expr(
                transfers::Column::UpdatedAt,
                Expr::value(updated.updated_at),
            )
            .filter(transfers::Column::Id.eq(updated.id.to_string()))
            .filter(transfers::Column::Status.eq(old_status.as_str()))
            .exec(db_tx)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::Conflict(
                "transfer was modified concurrently".to_string(),
            ));
        }
        Ok(())
    }
}

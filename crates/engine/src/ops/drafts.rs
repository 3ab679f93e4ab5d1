use sea_orm::{QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, TransferDraft, expenses, shares};

use super::Engine;

impl Engine {
    /// Suggested transfers for a group, one per non-payer share with a
    /// positive amount, directed toward that expense's payer.
    ///
    /// Drafts are generated per expense and deliberately not netted
    /// across expenses: every suggestion stays traceable to the expense
    /// that produced it, which matters for disputes. A netting pass
    /// could be layered on top without touching the balance fold.
    pub async fn drafts(&self, group_id: &str) -> ResultEngine<Vec<TransferDraft>> {
        let expense_models = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(expenses::Column::PaidAt)
            .order_by_asc(expenses::Column::Id)
            .all(&self.database)
            .await?;

        let mut out = Vec::new();
        for expense in &expense_models {
            let expense_id = Uuid::parse_str(&expense.id)
                .map_err(|_| EngineError::NotFound("expense not exists".to_string()))?;
            let share_models = shares::Entity::find()
                .filter(shares::Column::ExpenseId.eq(expense.id.clone()))
                .order_by_asc(shares::Column::MemberId)
                .all(&self.database)
                .await?;
            for share in share_models {
                if share.member_id == expense.payer_id || share.amount_minor <= 0 {
                    continue;
                }
                out.push(TransferDraft {
                    from_member: share.member_id,
                    to_member: expense.payer_id.clone(),
                    amount_minor: share.amount_minor,
                    expense_id,
                });
            }
        }

        Ok(out)
    }
}

use std::collections::HashMap;

use sea_orm::{JoinType, QueryFilter, QuerySelect, prelude::*};

use crate::{ResultEngine, expenses, shares};

use super::Engine;

impl Engine {
    /// Net balance per member for a group, folded from the expense
    /// ledger: the payer is credited the full amount, every
    /// share-holder (payer included) is debited their share.
    ///
    /// Read-only and recomputed from scratch on every call; for any
    /// group the values always sum to zero. A group without expenses
    /// yields an empty map.
    pub async fn balances(&self, group_id: &str) -> ResultEngine<HashMap<String, i64>> {
        let expense_models = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .all(&self.database)
            .await?;

        let mut acc: HashMap<String, i64> = HashMap::new();
        for expense in &expense_models {
            *acc.entry(expense.payer_id.clone()).or_insert(0) += expense.amount_minor;
        }

        let share_models = shares::Entity::find()
            .join(JoinType::InnerJoin, shares::Relation::Expenses.def())
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .all(&self.database)
            .await?;
        for share in share_models {
            *acc.entry(share.member_id).or_insert(0) -= share.amount_minor;
        }

        Ok(acc)
    }
}

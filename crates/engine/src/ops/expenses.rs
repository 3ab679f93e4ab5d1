use uuid::Uuid;

use sea_orm::{
    ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};

use crate::{
    EngineError, Expense, ResultEngine, Share,
    commands::{NewExpenseCmd, UpdateExpenseCmd},
    expenses, shares,
};

use super::{Engine, normalize_required_text, with_tx};

impl Engine {
    /// Create an expense together with its full share list.
    ///
    /// The share amounts must sum exactly to the expense amount; the
    /// expense and all shares are inserted in one transaction.
    pub async fn add_expense(&self, cmd: NewExpenseCmd) -> ResultEngine<Uuid> {
        let title = normalize_required_text(&cmd.title, "title")?;
        let expense = Expense::new(
            cmd.group_id,
            title,
            cmd.amount_minor,
            cmd.payer_id,
            cmd.created_by,
            cmd.paid_at,
            &cmd.shares,
        )?;

        with_tx!(self, |db_tx| {
            expenses::ActiveModel::from(&expense).insert(&db_tx).await?;
            for share in &expense.shares {
                shares::ActiveModel::from(share).insert(&db_tx).await?;
            }
            Ok(expense.id)
        })
    }

    /// Update an expense, replacing its share list wholesale.
    ///
    /// The old shares are deleted and the new ones inserted inside the
    /// same transaction, so a concurrent balance read never observes a
    /// share sum different from the expense amount.
    pub async fn update_expense(&self, cmd: UpdateExpenseCmd) -> ResultEngine<()> {
        let title = normalize_required_text(&cmd.title, "title")?;
        let mut expense = Expense::new(
            cmd.group_id.clone(),
            title,
            cmd.amount_minor,
            cmd.payer_id,
            String::new(),
            cmd.paid_at,
            &cmd.shares,
        )?;

        with_tx!(self, |db_tx| {
            let existing = self
                .require_expense_in_group(&db_tx, &cmd.group_id, cmd.expense_id)
                .await?;
            // Keep the stored id and creator; only the payload is replaced.
            expense.id = cmd.expense_id;
            expense.created_by = existing.created_by;
            for share in &mut expense.shares {
                share.expense_id = cmd.expense_id;
            }

            let model = expenses::ActiveModel::from(&expense);
            model.update(&db_tx).await?;

            shares::Entity::delete_many()
                .filter(shares::Column::ExpenseId.eq(cmd.expense_id.to_string()))
                .exec(&db_tx)
                .await?;
            for share in &expense.shares {
                shares::ActiveModel::from(share).insert(&db_tx).await?;
            }
            Ok(())
        })
    }

    /// Delete an expense and its shares. Transfers already committed
    /// from its drafts are untouched; they are historical records.
    pub async fn delete_expense(&self, group_id: &str, expense_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_expense_in_group(&db_tx, group_id, expense_id)
                .await?;
            shares::Entity::delete_many()
                .filter(shares::Column::ExpenseId.eq(expense_id.to_string()))
                .exec(&db_tx)
                .await?;
            expenses::Entity::delete_by_id(expense_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    /// Return one expense with its shares.
    pub async fn expense(&self, group_id: &str, expense_id: Uuid) -> ResultEngine<Expense> {
        let model = expenses::Entity::find_by_id(expense_id.to_string())
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("expense not exists".to_string()))?;
        let mut expense = Expense::try_from(model)?;
        expense.shares = self.load_shares(&self.database, expense_id).await?;
        Ok(expense)
    }

    /// List a group's expenses with shares, oldest first.
    pub async fn list_expenses(&self, group_id: &str) -> ResultEngine<Vec<Expense>> {
        let models = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(expenses::Column::PaidAt)
            .order_by_asc(expenses::Column::Id)
            .all(&self.database)
            .await?;

        let mut out = Vec::with_capacity(models.len());
        for model in models {
            let mut expense = Expense::try_from(model)?;
            expense.shares = self.load_shares(&self.database, expense.id).await?;
            out.push(expense);
        }
        Ok(out)
    }

    pub(super) async fn require_expense_in_group(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: &str,
        expense_id: Uuid,
    ) -> ResultEngine<Expense> {
        let model = expenses::Entity::find_by_id(expense_id.to_string())
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound("expense not exists".to_string()))?;
        Expense::try_from(model)
    }

    pub(super) async fn load_shares(
        &self,
        db: &impl ConnectionTrait,
        expense_id: Uuid,
    ) -> ResultEngine<Vec<Share>> {
        let models = shares::Entity::find()
            .filter(shares::Column::ExpenseId.eq(expense_id.to_string()))
            .order_by_asc(shares::Column::MemberId)
            .all(db)
            .await?;
        models.into_iter().map(Share::try_from).collect()
    }
}

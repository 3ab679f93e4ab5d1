//! Per-member shares of an expense.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

/// One member's portion of an expense. At most one share exists per
/// (expense, member) pair; the amount may be zero but never negative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub id: Uuid,
    pub expense_id: Uuid,
    pub member_id: String,
    pub amount_minor: i64,
}

impl Share {
    pub fn new(expense_id: Uuid, member_id: String, amount_minor: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            expense_id,
            member_id,
            amount_minor,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "shares")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub expense_id: String,
    pub member_id: String,
    pub amount_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Share> for ActiveModel {
    fn from(share: &Share) -> Self {
        Self {
            id: ActiveValue::Set(share.id.to_string()),
            expense_id: ActiveValue::Set(share.expense_id.to_string()),
            member_id: ActiveValue::Set(share.member_id.clone()),
            amount_minor: ActiveValue::Set(share.amount_minor),
        }
    }
}

impl TryFrom<Model> for Share {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("share not exists".to_string()))?,
            expense_id: Uuid::parse_str(&model.expense_id)
                .map_err(|_| EngineError::NotFound("expense not exists".to_string()))?,
            member_id: model.member_id,
            amount_minor: model.amount_minor,
        })
    }
}

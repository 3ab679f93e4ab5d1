//! Expense primitives.
//!
//! An `Expense` is one payment made by a member (the payer) on behalf of
//! the group, split into per-member [`Share`]s. The share amounts must
//! sum exactly to the expense amount; the check runs on create and on
//! every full share replace.
//!
//! [`Share`]: super::shares::Share

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, commands::ShareInput, shares::Share};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub group_id: String,
    pub title: String,
    pub amount_minor: i64,
    pub payer_id: String,
    pub created_by: String,
    pub paid_at: DateTime<Utc>,
    pub shares: Vec<Share>,
}

impl Expense {
    /// Builds a validated expense with its full share list.
    ///
    /// Rejects a non-positive amount, an empty payer id, a share with a
    /// negative amount or empty member id, more than one share for the
    /// same member, and a share sum different from the expense amount.
    pub fn new(
        group_id: String,
        title: String,
        amount_minor: i64,
        payer_id: String,
        created_by: String,
        paid_at: DateTime<Utc>,
        shares: &[ShareInput],
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::Validation(
                "amount_minor must be > 0".to_string(),
            ));
        }
        if payer_id.is_empty() {
            return Err(EngineError::Validation(
                "payer_id must not be empty".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let mut out = Vec::with_capacity(shares.len());
        let mut sum: i64 = 0;
        for share in shares {
            if share.member_id.is_empty() {
                return Err(EngineError::Validation(
                    "share member_id must not be empty".to_string(),
                ));
            }
            if share.amount_minor < 0 {
                return Err(EngineError::Validation(
                    "share amount_minor must be >= 0".to_string(),
                ));
            }
            if out.iter().any(|s: &Share| s.member_id == share.member_id) {
                return Err(EngineError::Validation(format!(
                    "duplicate share for member {}",
                    share.member_id
                )));
            }
            sum += share.amount_minor;
            out.push(Share::new(id, share.member_id.clone(), share.amount_minor));
        }
        if sum != amount_minor {
            return Err(EngineError::Validation(format!(
                "share amounts sum to {sum}, expense amount is {amount_minor}"
            )));
        }

        Ok(Self {
            id,
            group_id,
            title,
            amount_minor,
            payer_id,
            created_by,
            paid_at,
            shares: out,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub title: String,
    pub amount_minor: i64,
    pub payer_id: String,
    pub created_by: String,
    pub paid_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::shares::Entity")]
    Shares,
}

impl Related<super::shares::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shares.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            group_id: ActiveValue::Set(expense.group_id.clone()),
            title: ActiveValue::Set(expense.title.clone()),
            amount_minor: ActiveValue::Set(expense.amount_minor),
            payer_id: ActiveValue::Set(expense.payer_id.clone()),
            created_by: ActiveValue::Set(expense.created_by.clone()),
            paid_at: ActiveValue::Set(expense.paid_at),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("expense not exists".to_string()))?,
            group_id: model.group_id,
            title: model.title,
            amount_minor: model.amount_minor,
            payer_id: model.payer_id,
            created_by: model.created_by,
            paid_at: model.paid_at,
            shares: Vec::new(),
        })
    }
}

//! Poll entity: metadata, ownership and lifecycle state.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "poll")]
pub struct Model {
    /// Short opaque poll token handed out to chat users.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Poll question, non-empty.
    pub question: String,

    /// User who created the poll. Only this user may end or delete it.
    pub creator_id: String,

    /// Lifecycle state. Deleted polls have no row at all.
    pub state: PollState,

    pub created_at: DateTimeWithTimeZone,
}

/// Poll lifecycle state.
///
/// Transitions are one-directional: `Active` → `Ended`. Deletion removes
/// the record instead of transitioning it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PollState {
    /// Accepting votes.
    #[sea_orm(string_value = "active")]
    Active,
    /// Closed for voting, still queryable.
    #[sea_orm(string_value = "ended")]
    Ended,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::poll_option::Entity")]
    PollOptions,

    #[sea_orm(has_many = "super::poll_vote::Entity")]
    PollVotes,
}

impl Related<super::poll_option::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PollOptions.def()
    }
}

impl Related<super::poll_vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PollVotes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

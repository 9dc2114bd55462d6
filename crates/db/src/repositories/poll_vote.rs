//! Poll vote repository: the append-only vote ledger.
//!
//! Enforces single-vote-per-user through the unique (`poll_id`,
//! `user_id`) index. There is no existence pre-check: concurrent votes
//! for the same pair race on the constraint and exactly one insert wins.

use std::sync::Arc;

use crate::entities::{PollVote, poll_vote};
use pollbot_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};

/// Poll vote repository for database operations.
#[derive(Clone)]
pub struct PollVoteRepository {
    db: Arc<DatabaseConnection>,
}

impl PollVoteRepository {
    /// Create a new poll vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append a vote to the ledger.
    ///
    /// Fails with [`AppError::AlreadyVoted`] when a row for this
    /// (`poll_id`, `user_id`) pair already exists. Runs on the caller's
    /// connection so it can join the cast-vote transaction.
    pub async fn record_vote<C: ConnectionTrait>(
        &self,
        conn: &C,
        vote: &poll_vote::Model,
    ) -> AppResult<()> {
        let active = poll_vote::ActiveModel {
            id: Set(vote.id.clone()),
            poll_id: Set(vote.poll_id.clone()),
            user_id: Set(vote.user_id.clone()),
            choice_id: Set(vote.choice_id),
            created_at: Set(vote.created_at),
        };

        PollVote::insert(active)
            .exec_without_returning(conn)
            .await
            .map_err(|e| {
                if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    AppError::AlreadyVoted
                } else {
                    AppError::Database(e.to_string())
                }
            })?;

        tracing::debug!(
            poll_id = %vote.poll_id,
            user_id = %vote.user_id,
            choice_id = vote.choice_id,
            "vote recorded"
        );
        Ok(())
    }

    /// Get the ledger rows for a poll in cast order.
    ///
    /// The audit trail: the tally is derivable by replaying these rows.
    pub async fn find_by_poll(&self, poll_id: &str) -> AppResult<Vec<poll_vote::Model>> {
        PollVote::find()
            .filter(poll_vote::Column::PollId.eq(poll_id))
            .order_by_asc(poll_vote::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count ledger rows for a poll.
    pub async fn count_for_poll(&self, poll_id: &str) -> AppResult<u64> {
        PollVote::find()
            .filter(poll_vote::Column::PollId.eq(poll_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

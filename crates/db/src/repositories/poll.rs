//! Poll repository: the poll record store.
//!
//! Owns poll metadata, the option rows carrying the per-option vote
//! counters, and the lifecycle/ownership checks. Counter mutation is a
//! single atomic `UPDATE ... SET votes = votes + 1`; state transitions
//! and deletion lock the poll row so they serialize against concurrent
//! votes on the same poll.

use std::sync::Arc;

use crate::entities::{Poll, PollOption, PollState, poll, poll_option};
use chrono::Utc;
use pollbot_common::{AppError, AppResult};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};

/// Poll repository for database operations.
#[derive(Clone)]
pub struct PollRepository {
    db: Arc<DatabaseConnection>,
}

impl PollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a poll by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a poll by ID, returning an error if it does not exist.
    pub async fn get_by_id(&self, id: &str) -> AppResult<poll::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PollNotFound(id.to_string()))
    }

    /// Get a poll's options in option-id order.
    pub async fn get_options(&self, poll_id: &str) -> AppResult<Vec<poll_option::Model>> {
        PollOption::find()
            .filter(poll_option::Column::PollId.eq(poll_id))
            .order_by_asc(poll_option::Column::OptionId)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch a poll inside a transaction with a row-level lock
    /// (`SELECT ... FOR UPDATE`).
    ///
    /// Votes and state transitions on the same poll both take this lock,
    /// so they resolve to one consistent ordering.
    pub async fn get_for_update<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(id)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a single option of a poll.
    pub async fn find_option<C: ConnectionTrait>(
        &self,
        conn: &C,
        poll_id: &str,
        option_id: i32,
    ) -> AppResult<Option<poll_option::Model>> {
        PollOption::find_by_id((poll_id.to_string(), option_id))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a new poll record with its option rows.
    ///
    /// Inserts with `ON CONFLICT DO NOTHING` on the id: zero rows
    /// inserted means the short id is taken, reported as
    /// [`AppError::PollIdExists`] for the caller to retry with a fresh
    /// id.
    pub async fn create(
        &self,
        poll: &poll::Model,
        options: &[poll_option::Model],
    ) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let active = poll::ActiveModel {
            id: Set(poll.id.clone()),
            question: Set(poll.question.clone()),
            creator_id: Set(poll.creator_id.clone()),
            state: Set(poll.state),
            created_at: Set(poll.created_at),
        };

        let inserted = Poll::insert(active)
            .on_conflict(OnConflict::column(poll::Column::Id).do_nothing().to_owned())
            .exec_without_returning(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if inserted == 0 {
            return Err(AppError::PollIdExists(poll.id.clone()));
        }

        let option_rows = options.iter().map(|o| poll_option::ActiveModel {
            poll_id: Set(o.poll_id.clone()),
            option_id: Set(o.option_id),
            text: Set(o.text.clone()),
            votes: Set(o.votes),
        });

        PollOption::insert_many(option_rows)
            .exec_without_returning(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomically increment the vote counter of one option.
    ///
    /// A single SQL `votes = votes + 1`; never a read-modify-write cycle.
    /// Fails with [`AppError::OptionNotFound`] when no such option row
    /// exists.
    pub async fn increment_tally<C: ConnectionTrait>(
        &self,
        conn: &C,
        poll_id: &str,
        option_id: i32,
    ) -> AppResult<()> {
        let result = PollOption::update_many()
            .col_expr(
                poll_option::Column::Votes,
                Expr::col(poll_option::Column::Votes).add(1),
            )
            .filter(poll_option::Column::PollId.eq(poll_id))
            .filter(poll_option::Column::OptionId.eq(option_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(AppError::OptionNotFound(option_id));
        }
        Ok(())
    }

    /// Transition a poll's lifecycle state, gated on ownership.
    ///
    /// Transitions are one-directional: only `Active` → `Ended` is legal.
    pub async fn set_state(
        &self,
        id: &str,
        new_state: PollState,
        actor_id: &str,
    ) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let poll = self
            .get_for_update(&txn, id)
            .await?
            .ok_or_else(|| AppError::PollNotFound(id.to_string()))?;

        if poll.creator_id != actor_id {
            return Err(AppError::Forbidden(
                "only the poll creator can end this poll".to_string(),
            ));
        }

        match (poll.state, new_state) {
            (PollState::Active, PollState::Ended) => {}
            (PollState::Ended, PollState::Ended) => return Err(AppError::AlreadyEnded),
            (_, PollState::Active) => {
                return Err(AppError::Internal(
                    "polls cannot be reactivated".to_string(),
                ));
            }
        }

        Poll::update_many()
            .col_expr(poll::Column::State, Expr::value(new_state))
            .filter(poll::Column::Id.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(poll_id = id, state = ?new_state, "poll state changed");
        Ok(())
    }

    /// Remove a poll record, gated on ownership.
    ///
    /// Option rows and ledger rows are purged by foreign-key cascade.
    pub async fn delete(&self, id: &str, actor_id: &str) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let poll = self
            .get_for_update(&txn, id)
            .await?
            .ok_or_else(|| AppError::PollNotFound(id.to_string()))?;

        if poll.creator_id != actor_id {
            return Err(AppError::Forbidden(
                "only the poll creator can delete this poll".to_string(),
            ));
        }

        Poll::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(poll_id = id, "poll deleted");
        Ok(())
    }
}

/// Build a poll model with zeroed option rows, ready for [`PollRepository::create`].
#[must_use]
pub fn new_poll_record(
    id: &str,
    question: &str,
    creator_id: &str,
    option_texts: &[String],
) -> (poll::Model, Vec<poll_option::Model>) {
    let poll = poll::Model {
        id: id.to_string(),
        question: question.to_string(),
        creator_id: creator_id.to_string(),
        state: PollState::Active,
        created_at: Utc::now().into(),
    };

    let options = option_texts
        .iter()
        .enumerate()
        .map(|(i, text)| poll_option::Model {
            poll_id: id.to_string(),
            option_id: i as i32 + 1,
            text: text.clone(),
            votes: 0,
        })
        .collect();

    (poll, options)
}

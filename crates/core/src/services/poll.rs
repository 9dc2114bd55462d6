//! Poll store and service.
//!
//! [`PollStore`] sequences the poll record store and the vote ledger
//! into the externally visible operations and owns the invariant
//! protocol (existence, active-state, option validity, ownership,
//! dedup). [`PollService`] is the stable facade on top: it generates
//! poll identifiers and retries creation on short-id collisions.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use pollbot_common::{AppError, AppResult, IdGenerator, PollConfig};
use pollbot_db::{
    entities::{PollState, poll, poll_option, poll_vote},
    repositories::{PollRepository, PollVoteRepository, new_poll_record},
};
use sea_orm::{DatabaseConnection, TransactionTrait};

/// Input for creating a poll.
#[derive(Debug, Clone)]
pub struct CreatePollInput {
    pub question: String,
    pub creator_id: String,
    pub options: Vec<String>,
}

/// A freshly created poll with its zeroed option rows.
#[derive(Debug, Clone)]
pub struct CreatedPoll {
    pub poll: poll::Model,
    pub options: Vec<poll_option::Model>,
}

/// A poll's question, options and current tally.
#[derive(Debug, Clone)]
pub struct PollTally {
    pub poll: poll::Model,
    pub options: Vec<poll_option::Model>,
}

impl PollTally {
    /// The tally as an option-id → count mapping.
    #[must_use]
    pub fn counts(&self) -> BTreeMap<i32, i32> {
        self.options.iter().map(|o| (o.option_id, o.votes)).collect()
    }
}

/// Poll store: orchestrates the record store and the vote ledger.
#[derive(Clone)]
pub struct PollStore {
    db: Arc<DatabaseConnection>,
    polls: PollRepository,
    votes: PollVoteRepository,
    id_gen: IdGenerator,
    limits: PollConfig,
}

impl PollStore {
    /// Create a new poll store over an opened database connection.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, limits: PollConfig) -> Self {
        Self {
            polls: PollRepository::new(db.clone()),
            votes: PollVoteRepository::new(db.clone()),
            db,
            id_gen: IdGenerator::new(),
            limits,
        }
    }

    /// Validate and persist a new poll under the given id.
    ///
    /// Option ids are assigned 1..N in input order and every counter
    /// starts at zero. An id collision surfaces as
    /// [`AppError::PollIdExists`] for the caller to retry.
    pub async fn create_poll(&self, id: &str, input: &CreatePollInput) -> AppResult<CreatedPoll> {
        if input.question.trim().is_empty() {
            return Err(AppError::EmptyQuestion);
        }
        if input.options.len() < 2 {
            return Err(AppError::TooFewOptions);
        }
        if input.options.len() > self.limits.max_options {
            return Err(AppError::TooManyOptions(self.limits.max_options));
        }
        for (i, option) in input.options.iter().enumerate() {
            if option.trim().is_empty() {
                return Err(AppError::EmptyOption(i + 1));
            }
            if option.chars().count() > self.limits.max_option_len {
                return Err(AppError::OptionTooLong(i + 1, self.limits.max_option_len));
            }
        }

        let (poll, options) = new_poll_record(id, &input.question, &input.creator_id, &input.options);
        self.polls.create(&poll, &options).await?;

        tracing::debug!(poll_id = id, creator_id = %input.creator_id, "poll created");
        Ok(CreatedPoll { poll, options })
    }

    /// Cast a vote.
    ///
    /// One transaction covers the whole protocol, so a vote is either
    /// fully committed (ledgered and tallied) or not committed at all:
    /// 1. lock the poll row, fail `PollNotFound` if absent;
    /// 2. fail `PollEnded` unless the poll is active;
    /// 3. fail `OptionNotFound` unless the choice exists;
    /// 4. append to the ledger, fail `AlreadyVoted` on conflict;
    /// 5. atomically increment the option counter; commit.
    pub async fn cast_vote(&self, poll_id: &str, user_id: &str, choice_id: i32) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let poll = self
            .polls
            .get_for_update(&txn, poll_id)
            .await?
            .ok_or_else(|| AppError::PollNotFound(poll_id.to_string()))?;

        if poll.state != PollState::Active {
            return Err(AppError::PollEnded);
        }

        if self
            .polls
            .find_option(&txn, poll_id, choice_id)
            .await?
            .is_none()
        {
            return Err(AppError::OptionNotFound(choice_id));
        }

        let vote = poll_vote::Model {
            id: self.id_gen.generate(),
            poll_id: poll_id.to_string(),
            user_id: user_id.to_string(),
            choice_id,
            created_at: Utc::now().into(),
        };
        self.votes.record_vote(&txn, &vote).await?;

        self.polls.increment_tally(&txn, poll_id, choice_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a poll's question, options and tally.
    ///
    /// Read-only; works on ended polls. The whole tally lives in the
    /// option rows, so a single select over them is a consistent
    /// snapshot.
    pub async fn get_tally(&self, poll_id: &str) -> AppResult<PollTally> {
        let poll = self.polls.get_by_id(poll_id).await?;
        let options = self.polls.get_options(poll_id).await?;

        // A delete can commit between the two reads. A poll always has
        // at least two options, so an empty set means the row we just
        // saw is already gone.
        if options.is_empty() {
            return Err(AppError::PollNotFound(poll_id.to_string()));
        }

        Ok(PollTally { poll, options })
    }

    /// End a poll. Creator-only; ended polls remain queryable.
    pub async fn end_poll(&self, poll_id: &str, actor_id: &str) -> AppResult<()> {
        self.polls.set_state(poll_id, PollState::Ended, actor_id).await
    }

    /// Delete a poll. Creator-only; removes the record and purges its
    /// option and ledger rows.
    pub async fn delete_poll(&self, poll_id: &str, actor_id: &str) -> AppResult<()> {
        self.polls.delete(poll_id, actor_id).await
    }

    /// Ledger rows for a poll, in cast order.
    ///
    /// The reconciliation path: replaying these rows re-derives the
    /// tally.
    pub async fn vote_ledger(&self, poll_id: &str) -> AppResult<Vec<poll_vote::Model>> {
        self.votes.find_by_poll(poll_id).await
    }
}

/// Poll service: the caller-facing facade.
///
/// Matches the store's contract 1:1 and adds no invariants; its only
/// own concern is poll identifier generation with a bounded retry
/// budget against short-id collisions.
#[derive(Clone)]
pub struct PollService {
    store: PollStore,
    id_gen: IdGenerator,
    id_retry_attempts: u32,
}

impl PollService {
    /// Create a new poll service.
    #[must_use]
    pub fn new(store: PollStore, config: &PollConfig) -> Self {
        Self {
            store,
            id_gen: IdGenerator::new(),
            id_retry_attempts: config.id_retry_attempts,
        }
    }

    /// Create a poll, retrying with fresh ids on collision.
    pub async fn create_poll(&self, input: CreatePollInput) -> AppResult<CreatedPoll> {
        for attempt in 0..self.id_retry_attempts {
            let id = self.id_gen.generate_poll_id();
            match self.store.create_poll(&id, &input).await {
                Err(AppError::PollIdExists(id)) => {
                    tracing::warn!(poll_id = %id, attempt, "poll id collision, retrying");
                }
                other => return other,
            }
        }
        Err(AppError::IdGenerationFailed)
    }

    /// Cast a vote on behalf of a user.
    pub async fn cast_vote(&self, poll_id: &str, user_id: &str, choice_id: i32) -> AppResult<()> {
        self.store.cast_vote(poll_id, user_id, choice_id).await
    }

    /// Get a poll's question, options and tally.
    pub async fn get_tally(&self, poll_id: &str) -> AppResult<PollTally> {
        self.store.get_tally(poll_id).await
    }

    /// End a poll on behalf of its creator.
    pub async fn end_poll(&self, poll_id: &str, actor_id: &str) -> AppResult<()> {
        self.store.end_poll(poll_id, actor_id).await
    }

    /// Delete a poll on behalf of its creator.
    pub async fn delete_poll(&self, poll_id: &str, actor_id: &str) -> AppResult<()> {
        self.store.delete_poll(poll_id, actor_id).await
    }
}

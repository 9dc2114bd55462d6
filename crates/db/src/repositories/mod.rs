//! Database repositories.

pub mod poll;
pub mod poll_vote;

pub use poll::{PollRepository, new_poll_record};
pub use poll_vote::PollVoteRepository;

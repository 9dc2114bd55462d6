//! Database entities.

#![allow(missing_docs)]

pub mod poll;
pub mod poll_option;
pub mod poll_vote;

pub use poll::{Entity as Poll, PollState};
pub use poll_option::Entity as PollOption;
pub use poll_vote::Entity as PollVote;

//! Business logic services.

#![allow(missing_docs)]

pub mod poll;

pub use poll::{CreatePollInput, CreatedPoll, PollService, PollStore, PollTally};

//! Circle: a local-first issue tracker.
//!
//! Issues belong to a team, sit in a status column and carry a
//! lexicographic [`rank::Rank`] that orders them inside that column.
//! [`tracker::Tracker`] holds the domain rules and works against any
//! [`repository::IssueRepository`]; [`store`] turns loaded data into the
//! grouped board view.

pub mod config;
pub mod error;
pub mod issues;
pub mod rank;
pub mod repository;
pub mod seed;
pub mod store;
pub mod tracker;
pub mod types;

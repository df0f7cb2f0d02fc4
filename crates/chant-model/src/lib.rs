//! Chant Domain Model
//!
//! Data types for tiered small-group deliberation: a large population
//! and its submitted ideas converge on one winning idea through rounds
//! ("tiers") of small fixed-size group votes ("cells").
//!
//! # Core Types
//!
//! - [`Participant`] - a voter; weight 1 unless acting as a delegate
//! - [`Idea`] - a submission moving through the status lifecycle
//! - [`Cell`] - a 3-7 person voting group formed for one tier
//! - [`Vote`] - one append-only ballot; `(cell, voter)` never repeats
//! - [`Delegate`] - a cell winner's author carrying the weight of the
//!   constituency they represent
//!
//! # Bookkeeping
//!
//! - [`Phase`] - the deliberation-level state machine
//! - [`TierResult`] - audit record of one completed tier
//! - [`Champion`] - summary of a declared winner
//!
//! # Projections
//!
//! - [`Snapshot`], [`CellView`], [`IdeaView`] - read-only display
//!   projections with live tallies; constructing one never mutates
//!   engine state.

mod cell;
mod champion;
mod ids;
mod idea;
mod participant;
mod phase;
mod snapshot;
mod tier;
mod vote;

pub use cell::{Cell, CellStatus};
pub use champion::Champion;
pub use idea::{Idea, IdeaStatus};
pub use ids::{CellId, IdeaId, ParticipantId};
pub use participant::{Delegate, Participant};
pub use phase::Phase;
pub use snapshot::{CellView, IdeaView, Snapshot};
pub use tier::TierResult;
pub use vote::Vote;

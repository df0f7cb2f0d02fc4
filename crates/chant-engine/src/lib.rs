//! Chant Deliberation Engine
//!
//! A tiered small-group deliberation and voting engine: a large
//! population of participants and submitted ideas converges on one
//! winning idea through successive tiers of 3-7 person voting cells.
//!
//! Two advancement modes:
//!
//! - **Batch**: everyone votes every tier on the shrinking idea pool;
//!   the second completed tier of a run is settled by a cross-tally of
//!   its cells.
//! - **Delegation**: each tier's cell winners become weighted
//!   delegates representing their cells, so every tier is a ~5x
//!   smaller decision body and a million participants converge in 9
//!   tiers.
//!
//! Continuous-flow deliberations keep going after consensus: the
//! champion defends against accumulated challengers in bounded
//! challenge rounds until an explicit close.
//!
//! All shared state sits behind [`DeliberationStore`]; the bundled
//! [`MemoryStore`] serializes same-cell votes with a per-cell mutex
//! while votes in different cells proceed in parallel.
//!
//! # Example
//!
//! ```
//! use chant_engine::{Deliberation, DeliberationConfig, TierOutcome};
//!
//! let d = Deliberation::new(DeliberationConfig::default().with_seed(7));
//! let alice = d.register("alice")?;
//! let bob = d.register("bob")?;
//! let carol = d.register("carol")?;
//!
//! let plant = d.submit_idea(alice, "plant street trees")?;
//! d.submit_idea(bob, "repaint the library")?;
//!
//! let cells = d.open_voting()?;
//! for cell in &cells {
//!     for &member in &cell.members {
//!         d.cast_vote(cell.id, member, plant)?;
//!     }
//! }
//! let outcome = d.complete_tier()?;
//! assert_eq!(outcome, TierOutcome::Consensus { winner: plant });
//! # Ok::<(), chant_engine::Error>(())
//! ```

mod challenge;
mod delegation;
mod engine;
mod error;
mod store;
mod tally;
mod tier;

pub use engine::{Deliberation, DeliberationConfig, FlowMode, VoteReceipt};
pub use error::{Error, Result};
pub use store::{CastOutcome, DeliberationStore, MemoryStore};
pub use tally::{select_winner, tally_votes, weighted_totals, TallyResult};
pub use tier::TierOutcome;

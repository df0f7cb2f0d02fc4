//! Deliberation state store.
//!
//! All shared mutable state - roster, ideas, cells, votes, tier log -
//! sits behind [`DeliberationStore`] so any persistence technology can
//! replace [`MemoryStore`] without touching engine semantics. Every
//! mutation path goes through the store; in particular the
//! cell-completion race is resolved here, by whatever atomicity
//! primitive the backing store has.
//!
//! # Concurrency contract
//!
//! - [`record_vote`](DeliberationStore::record_vote) is the one atomic
//!   primitive: duplicate check, append, count, and the one-time
//!   `Voting -> Completed` transition happen as a unit, and
//!   `completed_now` is reported to exactly one caller.
//! - Votes for different cells must be able to proceed in parallel.
//! - Control-plane operations (tier formation, roster swaps, reset)
//!   may take coarse locks; they are rare.
//!
//! `MemoryStore` meets the contract with reader-writer tables plus a
//! mutex per cell. Lock order: cells map -> cell slot -> voter set.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};

use chant_model::{
    Cell, CellId, CellStatus, Champion, Idea, IdeaId, IdeaStatus, Participant, ParticipantId,
    Phase, TierResult, Vote,
};

use crate::error::{Error, Result};

/// Outcome of recording a single vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastOutcome {
    /// Votes now cast in the cell.
    pub vote_count: usize,
    /// True for exactly one caller: the vote that crossed the
    /// threshold and completed the cell.
    pub completed_now: bool,
}

/// Repository interface for a deliberation's shared state.
pub trait DeliberationStore: Send + Sync {
    // --- Phase and counters ---

    fn phase(&self) -> Phase;
    fn set_phase(&self, phase: Phase);
    fn current_tier(&self) -> u32;
    fn set_current_tier(&self, tier: u32);
    fn challenge_round(&self) -> u32;
    fn set_challenge_round(&self, round: u32);
    /// First tier of the current voting run (1 for the initial run).
    fn round_base_tier(&self) -> u32;
    fn set_round_base_tier(&self, tier: u32);

    // --- Roster ---

    /// Register a participant into the base roster (and the active one).
    fn put_participant(&self, participant: Participant);
    fn participant(&self, id: ParticipantId) -> Option<Participant>;
    /// The roster voting in the current tier, in registration order.
    fn active_roster(&self) -> Vec<Participant>;
    /// Replace the active roster (delegate tiers). The base roster is
    /// untouched.
    fn replace_active_roster(&self, roster: Vec<Participant>);
    /// Restore the active roster to the full registered population.
    fn restore_base_roster(&self);

    // --- Ideas ---

    fn put_idea(&self, idea: Idea) -> Result<()>;
    fn idea(&self, id: IdeaId) -> Option<Idea>;
    /// All ideas in id order.
    fn ideas(&self) -> Vec<Idea>;
    /// Set status, returning false if the idea is unknown.
    fn set_idea_status(&self, id: IdeaId, status: IdeaStatus) -> bool;
    /// Stamp the tier an idea is being voted on in, with its status.
    fn stamp_idea(&self, id: IdeaId, tier: u32, status: IdeaStatus) -> bool;
    /// Accumulate tally score onto an idea.
    fn add_idea_score(&self, id: IdeaId, score: u64) -> bool;

    // --- Cells and votes ---

    fn insert_cells(&self, cells: Vec<Cell>);
    fn cell(&self, id: CellId) -> Option<Cell>;
    fn cells_in_tier(&self, tier: u32) -> Vec<Cell>;
    fn all_cells(&self) -> Vec<Cell>;
    fn votes_in(&self, cell: CellId) -> Result<Vec<Vote>>;
    /// The atomic vote primitive. See the module docs.
    fn record_vote(&self, cell: CellId, voter: ParticipantId, idea: IdeaId) -> Result<CastOutcome>;
    /// Stamp a completed cell's winner. Exactly one caller per cell
    /// (the one `record_vote` told `completed_now`).
    fn set_cell_winner(&self, cell: CellId, winner: IdeaId) -> Result<()>;
    /// Distinct participants who have voted across the whole run.
    fn voters_total(&self) -> usize;

    // --- Tier log and champion ---

    fn tier_result(&self, tier: u32) -> Option<TierResult>;
    fn record_tier_result(&self, result: TierResult);
    fn champion(&self) -> Option<Champion>;
    fn set_champion(&self, champion: Champion);

    // --- Reset ---

    /// Atomically clear all in-flight cell/vote/tier state, restore
    /// the base roster, revert ideas to `Submitted`, and return the
    /// deliberation to the `Submission` phase. No partial resets.
    fn reset_run(&self);
}

/// One cell's hot state: the record plus its vote ledger, guarded by a
/// single mutex so same-cell submissions serialize and the completion
/// transition fires exactly once.
#[derive(Debug)]
struct CellSlot {
    cell: Cell,
    votes: Vec<Vote>,
    voted: HashSet<ParticipantId>,
}

impl CellSlot {
    fn new(cell: Cell) -> Self {
        Self {
            cell,
            votes: Vec::new(),
            voted: HashSet::new(),
        }
    }
}

#[derive(Debug)]
struct ControlState {
    phase: Phase,
    current_tier: u32,
    challenge_round: u32,
    round_base_tier: u32,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            phase: Phase::Submission,
            current_tier: 0,
            challenge_round: 0,
            round_base_tier: 1,
        }
    }
}

/// In-memory [`DeliberationStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    control: RwLock<ControlState>,
    /// Registration order of the full population.
    base_order: RwLock<Vec<ParticipantId>>,
    base: RwLock<HashMap<ParticipantId, Participant>>,
    /// Roster voting in the current tier, in order.
    active: RwLock<Vec<Participant>>,
    ideas: RwLock<BTreeMap<IdeaId, Idea>>,
    cells: RwLock<HashMap<CellId, Mutex<CellSlot>>>,
    tiers: RwLock<BTreeMap<u32, TierResult>>,
    champion: RwLock<Option<Champion>>,
    voters: RwLock<HashSet<ParticipantId>>,
    vote_seq: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store in the `Submission` phase.
    pub fn new() -> Self {
        Self::default()
    }

    fn read_control(&self) -> std::sync::RwLockReadGuard<'_, ControlState> {
        self.control.read().expect("control lock poisoned")
    }

    fn write_control(&self) -> std::sync::RwLockWriteGuard<'_, ControlState> {
        self.control.write().expect("control lock poisoned")
    }
}

impl DeliberationStore for MemoryStore {
    fn phase(&self) -> Phase {
        self.read_control().phase
    }

    fn set_phase(&self, phase: Phase) {
        self.write_control().phase = phase;
    }

    fn current_tier(&self) -> u32 {
        self.read_control().current_tier
    }

    fn set_current_tier(&self, tier: u32) {
        self.write_control().current_tier = tier;
    }

    fn challenge_round(&self) -> u32 {
        self.read_control().challenge_round
    }

    fn set_challenge_round(&self, round: u32) {
        self.write_control().challenge_round = round;
    }

    fn round_base_tier(&self) -> u32 {
        self.read_control().round_base_tier
    }

    fn set_round_base_tier(&self, tier: u32) {
        self.write_control().round_base_tier = tier;
    }

    fn put_participant(&self, participant: Participant) {
        let mut base = self.base.write().expect("base lock poisoned");
        if base.insert(participant.id, participant.clone()).is_none() {
            self.base_order
                .write()
                .expect("base order lock poisoned")
                .push(participant.id);
            self.active
                .write()
                .expect("active lock poisoned")
                .push(participant);
        }
    }

    fn participant(&self, id: ParticipantId) -> Option<Participant> {
        // Active roster carries delegate weights; fall back to base.
        let active = self.active.read().expect("active lock poisoned");
        active
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .or_else(|| self.base.read().expect("base lock poisoned").get(&id).cloned())
    }

    fn active_roster(&self) -> Vec<Participant> {
        self.active.read().expect("active lock poisoned").clone()
    }

    fn replace_active_roster(&self, roster: Vec<Participant>) {
        *self.active.write().expect("active lock poisoned") = roster;
    }

    fn restore_base_roster(&self) {
        let base = self.base.read().expect("base lock poisoned");
        let order = self.base_order.read().expect("base order lock poisoned");
        let roster = order
            .iter()
            .filter_map(|id| base.get(id).cloned())
            .collect();
        *self.active.write().expect("active lock poisoned") = roster;
    }

    fn put_idea(&self, idea: Idea) -> Result<()> {
        let mut ideas = self.ideas.write().expect("ideas lock poisoned");
        if ideas.contains_key(&idea.id) {
            return Err(Error::Invariant(format!("idea id {} reused", idea.id)));
        }
        ideas.insert(idea.id, idea);
        Ok(())
    }

    fn idea(&self, id: IdeaId) -> Option<Idea> {
        self.ideas.read().expect("ideas lock poisoned").get(&id).cloned()
    }

    fn ideas(&self) -> Vec<Idea> {
        self.ideas
            .read()
            .expect("ideas lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    fn set_idea_status(&self, id: IdeaId, status: IdeaStatus) -> bool {
        let mut ideas = self.ideas.write().expect("ideas lock poisoned");
        match ideas.get_mut(&id) {
            Some(idea) => {
                idea.status = status;
                true
            }
            None => false,
        }
    }

    fn stamp_idea(&self, id: IdeaId, tier: u32, status: IdeaStatus) -> bool {
        let mut ideas = self.ideas.write().expect("ideas lock poisoned");
        match ideas.get_mut(&id) {
            Some(idea) => {
                idea.tier = tier;
                idea.status = status;
                true
            }
            None => false,
        }
    }

    fn add_idea_score(&self, id: IdeaId, score: u64) -> bool {
        let mut ideas = self.ideas.write().expect("ideas lock poisoned");
        match ideas.get_mut(&id) {
            Some(idea) => {
                idea.score += score;
                true
            }
            None => false,
        }
    }

    fn insert_cells(&self, new_cells: Vec<Cell>) {
        let mut cells = self.cells.write().expect("cells lock poisoned");
        for cell in new_cells {
            cells.insert(cell.id, Mutex::new(CellSlot::new(cell)));
        }
    }

    fn cell(&self, id: CellId) -> Option<Cell> {
        let cells = self.cells.read().expect("cells lock poisoned");
        cells
            .get(&id)
            .map(|slot| slot.lock().expect("cell slot poisoned").cell.clone())
    }

    fn cells_in_tier(&self, tier: u32) -> Vec<Cell> {
        let cells = self.cells.read().expect("cells lock poisoned");
        let mut found: Vec<Cell> = cells
            .values()
            .map(|slot| slot.lock().expect("cell slot poisoned").cell.clone())
            .filter(|c| c.tier == tier)
            .collect();
        found.sort_by_key(|c| c.id);
        found
    }

    fn all_cells(&self) -> Vec<Cell> {
        let cells = self.cells.read().expect("cells lock poisoned");
        let mut found: Vec<Cell> = cells
            .values()
            .map(|slot| slot.lock().expect("cell slot poisoned").cell.clone())
            .collect();
        found.sort_by_key(|c| c.id);
        found
    }

    fn votes_in(&self, cell: CellId) -> Result<Vec<Vote>> {
        let cells = self.cells.read().expect("cells lock poisoned");
        let slot = cells.get(&cell).ok_or(Error::NotFound {
            kind: "cell",
            id: cell.value(),
        })?;
        let votes = slot.lock().expect("cell slot poisoned").votes.clone();
        Ok(votes)
    }

    fn record_vote(&self, cell: CellId, voter: ParticipantId, idea: IdeaId) -> Result<CastOutcome> {
        let cells = self.cells.read().expect("cells lock poisoned");
        let slot = cells.get(&cell).ok_or(Error::NotFound {
            kind: "cell",
            id: cell.value(),
        })?;
        let mut slot = slot.lock().expect("cell slot poisoned");

        if slot.cell.is_completed() {
            return Err(Error::CellCompleted(cell));
        }
        if !slot.cell.has_member(voter) {
            return Err(Error::NotMember { cell, voter });
        }
        if slot.voted.contains(&voter) {
            return Err(Error::DuplicateVote { cell, voter });
        }
        if !slot.cell.has_idea(idea) {
            return Err(Error::InvalidIdea { cell, idea });
        }

        let cast_at = self.vote_seq.fetch_add(1, Ordering::Relaxed);
        slot.votes.push(Vote {
            cell,
            voter,
            idea,
            cast_at,
        });
        slot.voted.insert(voter);

        let vote_count = slot.votes.len();
        let completed_now = vote_count >= slot.cell.votes_needed;
        if completed_now {
            // One-time transition, still under the slot lock: racing
            // submitters either lost the threshold or were rejected above.
            slot.cell.status = CellStatus::Completed;
        }

        self.voters
            .write()
            .expect("voters lock poisoned")
            .insert(voter);

        Ok(CastOutcome {
            vote_count,
            completed_now,
        })
    }

    fn set_cell_winner(&self, cell: CellId, winner: IdeaId) -> Result<()> {
        let cells = self.cells.read().expect("cells lock poisoned");
        let slot = cells.get(&cell).ok_or(Error::NotFound {
            kind: "cell",
            id: cell.value(),
        })?;
        slot.lock().expect("cell slot poisoned").cell.winner = Some(winner);
        Ok(())
    }

    fn voters_total(&self) -> usize {
        self.voters.read().expect("voters lock poisoned").len()
    }

    fn tier_result(&self, tier: u32) -> Option<TierResult> {
        self.tiers
            .read()
            .expect("tiers lock poisoned")
            .get(&tier)
            .cloned()
    }

    fn record_tier_result(&self, result: TierResult) {
        self.tiers
            .write()
            .expect("tiers lock poisoned")
            .insert(result.tier, result);
    }

    fn champion(&self) -> Option<Champion> {
        *self.champion.read().expect("champion lock poisoned")
    }

    fn set_champion(&self, champion: Champion) {
        *self.champion.write().expect("champion lock poisoned") = Some(champion);
    }

    fn reset_run(&self) {
        // Take every lock for the duration: nothing observes a partial
        // reset.
        let mut control = self.write_control();
        let mut cells = self.cells.write().expect("cells lock poisoned");
        let mut ideas = self.ideas.write().expect("ideas lock poisoned");
        let mut tiers = self.tiers.write().expect("tiers lock poisoned");
        let mut champion = self.champion.write().expect("champion lock poisoned");
        let mut voters = self.voters.write().expect("voters lock poisoned");

        cells.clear();
        tiers.clear();
        voters.clear();
        *champion = None;
        for idea in ideas.values_mut() {
            idea.status = IdeaStatus::Submitted;
            idea.tier = 0;
            idea.score = 0;
        }
        *control = ControlState::default();
        self.vote_seq.store(0, Ordering::Relaxed);
        drop(control);

        self.restore_base_roster();
    }
}

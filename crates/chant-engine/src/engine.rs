//! The deliberation facade.
//!
//! [`Deliberation`] owns the store, the configuration, and the
//! injected random source, and exposes the whole lifecycle: register
//! participants, collect ideas, open voting, accumulate votes, and
//! coordinate tiers until one idea remains. Tier coordination,
//! delegation, and challenge rounds live in sibling modules as further
//! `impl` blocks on this type.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use chant_model::{
    Cell, CellId, CellView, Champion, Idea, IdeaId, IdeaStatus, IdeaView, Participant,
    ParticipantId, Phase, Snapshot, TierResult,
};
use chant_plan::{allocate_tier, plan_cell_sizes};

use crate::error::{Error, Result};
use crate::store::{DeliberationStore, MemoryStore};
use crate::tally;

/// How winners advance between tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowMode {
    /// The full roster keeps voting each tier on the shrinking pool;
    /// the second completed tier of a run is settled by cross-tally.
    #[default]
    Batch,
    /// Cell winners' authors become weighted delegates; each tier is a
    /// smaller, higher-weight decision body.
    Delegation,
}

/// Deliberation configuration.
///
/// Built up with `with_*` methods from [`default`](Self::default):
///
/// ```
/// use chant_engine::{DeliberationConfig, FlowMode};
///
/// let config = DeliberationConfig::default()
///     .with_flow(FlowMode::Delegation)
///     .with_seed(7);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DeliberationConfig {
    /// Advancement mode.
    pub flow: FlowMode,
    /// Continuous flow: consensus opens a challenge window instead of
    /// ending the deliberation.
    pub continuous: bool,
    /// RNG seed for auto-completion. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Override the per-cell vote threshold. Clamped to cell size.
    pub votes_needed: Option<usize>,
}

impl DeliberationConfig {
    #[must_use]
    pub fn with_flow(mut self, flow: FlowMode) -> Self {
        self.flow = flow;
        self
    }

    #[must_use]
    pub fn with_continuous(mut self, continuous: bool) -> Self {
        self.continuous = continuous;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_votes_needed(mut self, votes_needed: usize) -> Self {
        self.votes_needed = Some(votes_needed);
        self
    }
}

/// What a caller learns from casting a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    /// Votes now cast in the cell.
    pub vote_count: usize,
    /// Whether this vote completed the cell.
    pub cell_completed: bool,
}

/// A tiered small-group deliberation.
///
/// Generic over the store so persistence technology is swappable;
/// defaults to the in-memory store.
pub struct Deliberation<S: DeliberationStore = MemoryStore> {
    pub(crate) config: DeliberationConfig,
    pub(crate) store: S,
    next_participant: AtomicU64,
    next_idea: AtomicU64,
    next_cell: AtomicU64,
    rng: Mutex<StdRng>,
}

impl Deliberation<MemoryStore> {
    /// Create a deliberation backed by the in-memory store.
    pub fn new(config: DeliberationConfig) -> Self {
        Self::with_store(MemoryStore::new(), config)
    }
}

impl<S: DeliberationStore> Deliberation<S> {
    /// Create a deliberation over an explicit store.
    pub fn with_store(store: S, config: DeliberationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            store,
            next_participant: AtomicU64::new(1),
            next_idea: AtomicU64::new(1),
            next_cell: AtomicU64::new(1),
            rng: Mutex::new(rng),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn phase(&self) -> Phase {
        self.store.phase()
    }

    pub fn current_tier(&self) -> u32 {
        self.store.current_tier()
    }

    pub fn challenge_round(&self) -> u32 {
        self.store.challenge_round()
    }

    /// The champion record, once consensus has been reached.
    pub fn champion(&self) -> Option<Champion> {
        self.store.champion()
    }

    /// The recorded outcome of a completed tier.
    pub fn tier_result(&self, tier: u32) -> Option<TierResult> {
        self.store.tier_result(tier)
    }

    // --- Submission phase ---

    /// Register a participant. Submission phase only.
    pub fn register(&self, name: impl Into<String>) -> Result<ParticipantId> {
        self.require_phase(Phase::Submission)?;
        let id = ParticipantId(self.next_participant.fetch_add(1, Ordering::Relaxed));
        self.store.put_participant(Participant::new(id, name));
        Ok(id)
    }

    /// Submit an idea during the submission window.
    pub fn submit_idea(&self, author: ParticipantId, text: impl Into<String>) -> Result<IdeaId> {
        self.require_phase(Phase::Submission)?;
        self.admit_idea(author, text)
    }

    pub(crate) fn admit_idea(
        &self,
        author: ParticipantId,
        text: impl Into<String>,
    ) -> Result<IdeaId> {
        debug_assert!(
            self.store.phase().accepts_ideas(),
            "idea admitted outside a submission window"
        );
        if self.store.participant(author).is_none() {
            return Err(Error::NotFound {
                kind: "participant",
                id: author.value(),
            });
        }
        let id = IdeaId(self.next_idea.fetch_add(1, Ordering::Relaxed));
        self.store.put_idea(Idea::new(id, author, text))?;
        Ok(id)
    }

    /// Close submissions and form tier 1 from the full roster and the
    /// submitted idea pool.
    pub fn open_voting(&self) -> Result<Vec<Cell>> {
        self.require_phase(Phase::Submission)?;
        let roster = self.store.active_roster();
        let pool: Vec<IdeaId> = self
            .store
            .ideas()
            .into_iter()
            .filter(|i| i.status == IdeaStatus::Submitted)
            .map(|i| i.id)
            .collect();

        let cells = self.form_tier(1, &roster, &pool)?;
        self.store.set_phase(Phase::Voting);
        self.store.set_current_tier(1);
        self.store.set_round_base_tier(1);
        debug!(
            participants = roster.len(),
            ideas = pool.len(),
            cells = cells.len(),
            "voting opened"
        );
        Ok(cells)
    }

    /// Plan, allocate, and insert the cells of one tier. Every pooled
    /// idea is stamped in-voting for the tier.
    pub(crate) fn form_tier(
        &self,
        tier: u32,
        roster: &[Participant],
        pool: &[IdeaId],
    ) -> Result<Vec<Cell>> {
        let plan = plan_cell_sizes(roster.len());
        let allocated = allocate_tier(roster, pool, &plan)?;
        debug!(
            tier,
            cells = allocated.len(),
            batches = allocated.batch_count(),
            shape = ?allocated.shape,
            "tier formed"
        );

        let mut cells = Vec::with_capacity(allocated.len());
        for blueprint in allocated.cells {
            let id = CellId(self.next_cell.fetch_add(1, Ordering::Relaxed));
            let members = blueprint.members.iter().map(|p| p.id).collect();
            let mut cell = Cell::new(id, tier, blueprint.batch, members, blueprint.ideas);
            if let Some(needed) = self.config.votes_needed {
                cell.votes_needed = needed.min(cell.members.len());
            }
            cells.push(cell);
        }

        for &idea in pool {
            self.store.stamp_idea(idea, tier, IdeaStatus::InVoting);
        }
        self.store.insert_cells(cells.clone());
        Ok(cells)
    }

    // --- Voting phase ---

    /// Cast one vote. The completing vote triggers the cell tally
    /// exactly once.
    pub fn cast_vote(
        &self,
        cell: CellId,
        voter: ParticipantId,
        idea: IdeaId,
    ) -> Result<VoteReceipt> {
        self.require_votes()?;
        let outcome = self.store.record_vote(cell, voter, idea)?;
        trace!(%cell, %voter, %idea, count = outcome.vote_count, "vote recorded");
        if outcome.completed_now {
            self.finalize_cell(cell)?;
        }
        Ok(VoteReceipt {
            vote_count: outcome.vote_count,
            cell_completed: outcome.completed_now,
        })
    }

    /// Cast a uniformly random on-ballot vote for every member of the
    /// cell who has not voted. Models timeout handling for no-shows.
    /// Returns the number of votes added.
    pub fn auto_complete(&self, cell_id: CellId) -> Result<usize> {
        self.require_votes()?;
        let cell = self.store.cell(cell_id).ok_or(Error::NotFound {
            kind: "cell",
            id: cell_id.value(),
        })?;
        if cell.is_completed() {
            return Ok(0);
        }

        let voted: HashSet<ParticipantId> = self
            .store
            .votes_in(cell_id)?
            .iter()
            .map(|v| v.voter)
            .collect();

        let mut added = 0;
        for &member in &cell.members {
            if voted.contains(&member) {
                continue;
            }
            let idea = {
                let mut rng = self.rng.lock().expect("rng lock poisoned");
                cell.ideas[rng.gen_range(0..cell.ideas.len())]
            };
            // Votes may land concurrently; skip anyone who beat us.
            match self.store.record_vote(cell_id, member, idea) {
                Ok(outcome) => {
                    added += 1;
                    if outcome.completed_now {
                        self.finalize_cell(cell_id)?;
                    }
                }
                Err(Error::DuplicateVote { .. }) => continue,
                Err(Error::CellCompleted(_)) => break,
                Err(e) => return Err(e),
            }
        }
        debug!(cell = %cell_id, added, "auto-completed");
        Ok(added)
    }

    /// Runs exactly once per cell: only the caller the store told
    /// `completed_now` gets here.
    pub(crate) fn finalize_cell(&self, cell_id: CellId) -> Result<()> {
        let votes = self.store.votes_in(cell_id)?;
        let weights = self.roster_weights();
        let tally = tally::tally_votes(&votes, &weights)?;
        self.store.set_cell_winner(cell_id, tally.winner)?;
        for &(idea, score) in &tally.totals {
            self.store.add_idea_score(idea, score);
        }
        debug!(cell = %cell_id, winner = %tally.winner, score = tally.score, "cell completed");
        Ok(())
    }

    pub(crate) fn roster_weights(&self) -> HashMap<ParticipantId, u64> {
        self.store
            .active_roster()
            .into_iter()
            .map(|p| (p.id, p.weight))
            .collect()
    }

    pub(crate) fn require_phase(&self, expected: Phase) -> Result<()> {
        let actual = self.store.phase();
        if actual == expected {
            Ok(())
        } else {
            Err(Error::phase(expected, actual))
        }
    }

    fn require_votes(&self) -> Result<()> {
        let actual = self.store.phase();
        if actual.accepts_votes() {
            Ok(())
        } else {
            Err(Error::phase(Phase::Voting, actual))
        }
    }

    // --- Projection and lifecycle ---

    /// Read-only projection of the whole deliberation with live
    /// per-cell tallies. Never mutates state.
    pub fn snapshot(&self) -> Snapshot {
        let weights = self.roster_weights();
        let ideas = self
            .store
            .ideas()
            .into_iter()
            .map(|i| IdeaView {
                id: i.id,
                author: i.author,
                text: i.text,
                tier: i.tier,
                status: i.status,
                score: i.score,
            })
            .collect();
        let cells = self
            .store
            .all_cells()
            .into_iter()
            .map(|c| {
                let votes = self.store.votes_in(c.id).unwrap_or_default();
                let tally = tally::weighted_totals(&votes, &weights);
                CellView {
                    id: c.id,
                    tier: c.tier,
                    batch: c.batch,
                    members: c.members,
                    ideas: c.ideas,
                    votes_cast: votes.len(),
                    votes_needed: c.votes_needed,
                    status: c.status,
                    winner: c.winner,
                    tally: tally.into_iter().collect(),
                }
            })
            .collect();
        Snapshot {
            phase: self.store.phase(),
            current_tier: self.store.current_tier(),
            challenge_round: self.store.challenge_round(),
            ideas,
            cells,
        }
    }

    /// Reset the run: all cells, votes, tier results, and the champion
    /// are discarded atomically; ideas revert to submitted; the full
    /// roster is restored; the phase returns to submission.
    pub fn reset(&self) {
        self.store.reset_run();
        debug!("deliberation reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Deliberation {
        Deliberation::new(DeliberationConfig::default().with_seed(42))
    }

    fn populate(d: &Deliberation, people: usize, ideas: usize) -> (Vec<ParticipantId>, Vec<IdeaId>) {
        let pids: Vec<ParticipantId> = (0..people)
            .map(|i| d.register(format!("p{}", i)).unwrap())
            .collect();
        let iids: Vec<IdeaId> = (0..ideas)
            .map(|i| d.submit_idea(pids[i % pids.len()], format!("idea {}", i)).unwrap())
            .collect();
        (pids, iids)
    }

    #[test]
    fn open_voting_forms_tier_one() {
        let d = seeded();
        populate(&d, 16, 32);
        let cells = d.open_voting().unwrap();

        assert_eq!(d.phase(), Phase::Voting);
        assert_eq!(d.current_tier(), 1);
        let sizes: Vec<usize> = cells.iter().map(|c| c.members.len()).collect();
        assert_eq!(sizes, vec![5, 5, 6]);
        for idea in d.store().ideas() {
            assert_eq!(idea.status, IdeaStatus::InVoting);
            assert_eq!(idea.tier, 1);
        }
    }

    #[test]
    fn submission_only_operations_reject_other_phases() {
        let d = seeded();
        let (pids, _) = populate(&d, 16, 32);
        d.open_voting().unwrap();

        assert!(matches!(
            d.register("late"),
            Err(Error::Phase {
                expected: Phase::Submission,
                actual: Phase::Voting,
            }),
        ));
        assert!(matches!(
            d.submit_idea(pids[0], "late idea"),
            Err(Error::Phase { .. }),
        ));
        assert!(matches!(d.open_voting(), Err(Error::Phase { .. })));
    }

    #[test]
    fn voting_rejected_before_open() {
        let d = seeded();
        let (pids, iids) = populate(&d, 5, 8);
        assert!(matches!(
            d.cast_vote(CellId(1), pids[0], iids[0]),
            Err(Error::Phase {
                expected: Phase::Voting,
                ..
            }),
        ));
    }

    #[test]
    fn unknown_author_rejected() {
        let d = seeded();
        assert!(matches!(
            d.submit_idea(ParticipantId(99), "ghost"),
            Err(Error::NotFound {
                kind: "participant",
                id: 99,
            }),
        ));
    }

    #[test]
    fn completing_vote_reports_and_stamps_winner() {
        let d = seeded();
        let (pids, _) = populate(&d, 5, 10);
        let cells = d.open_voting().unwrap();
        let cell = &cells[0];
        let pick = cell.ideas[0];

        for (i, &voter) in pids.iter().enumerate() {
            let receipt = d.cast_vote(cell.id, voter, pick).unwrap();
            assert_eq!(receipt.vote_count, i + 1);
            assert_eq!(receipt.cell_completed, i + 1 == cell.votes_needed);
        }
        let done = d.store().cell(cell.id).unwrap();
        assert!(done.is_completed());
        assert_eq!(done.winner, Some(pick));
        assert_eq!(d.store().idea(pick).unwrap().score, 5);
    }

    #[test]
    fn auto_complete_fills_remaining_votes_deterministically() {
        let a = seeded();
        let b = seeded();
        for d in [&a, &b] {
            let (pids, _) = populate(d, 5, 10);
            let cells = d.open_voting().unwrap();
            let cell = &cells[0];
            d.cast_vote(cell.id, pids[0], cell.ideas[0]).unwrap();
            let added = d.auto_complete(cell.id).unwrap();
            assert_eq!(added, 4);
            assert!(d.store().cell(cell.id).unwrap().is_completed());
        }
        // Same seed, same random fills, same winner.
        assert_eq!(
            a.store().cell(CellId(1)).unwrap().winner,
            b.store().cell(CellId(1)).unwrap().winner,
        );
    }

    #[test]
    fn auto_complete_on_completed_cell_is_a_no_op() {
        let d = seeded();
        let (pids, _) = populate(&d, 5, 10);
        let cells = d.open_voting().unwrap();
        let cell = &cells[0];
        for &voter in &pids {
            d.cast_vote(cell.id, voter, cell.ideas[0]).unwrap();
        }
        assert_eq!(d.auto_complete(cell.id).unwrap(), 0);
    }

    #[test]
    fn votes_needed_override_is_clamped() {
        let d = Deliberation::new(
            DeliberationConfig::default()
                .with_seed(1)
                .with_votes_needed(9),
        );
        populate(&d, 5, 10);
        let cells = d.open_voting().unwrap();
        assert_eq!(cells[0].votes_needed, 5);
    }

    #[test]
    fn snapshot_reflects_live_tallies_without_mutating() {
        let d = seeded();
        let (pids, _) = populate(&d, 5, 10);
        let cells = d.open_voting().unwrap();
        let cell = &cells[0];
        d.cast_vote(cell.id, pids[0], cell.ideas[0]).unwrap();
        d.cast_vote(cell.id, pids[1], cell.ideas[0]).unwrap();

        let snap = d.snapshot();
        let view = snap.cells.iter().find(|c| c.id == cell.id).unwrap();
        assert_eq!(view.votes_cast, 2);
        assert_eq!(view.tally, vec![(cell.ideas[0], 2)]);

        // Taking a snapshot changed nothing.
        assert_eq!(d.snapshot(), snap);
    }

    #[test]
    fn reset_returns_to_submission() {
        let d = seeded();
        let (pids, _) = populate(&d, 5, 10);
        let cells = d.open_voting().unwrap();
        d.cast_vote(cells[0].id, pids[0], cells[0].ideas[0]).unwrap();

        d.reset();
        assert_eq!(d.phase(), Phase::Submission);
        assert!(d.store().all_cells().is_empty());
        // The deliberation is usable again.
        assert!(d.register("newcomer").is_ok());
    }
}

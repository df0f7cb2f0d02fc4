//! Tier coordination.
//!
//! A tier completes when every one of its cells has completed. The
//! coordinator then collects the distinct cell winners and decides:
//! declare consensus (one winner remains), settle by cross-tally
//! (batch flow, second completed tier of a run), or form the next
//! tier (shrunk pool in batch flow, weighted delegates in delegation
//! flow). `current_tier` advances only when a tier actually forms.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use chant_model::{Champion, IdeaId, IdeaStatus, Phase, TierResult};

use crate::engine::{Deliberation, FlowMode};
use crate::error::{Error, Result};
use crate::store::DeliberationStore;
use crate::tally;

/// What completing a tier produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TierOutcome {
    /// A single idea remains; the deliberation (or challenge round)
    /// is decided.
    Consensus { winner: IdeaId },
    /// A new tier was formed.
    NextTier {
        tier: u32,
        cells: usize,
        electorate: usize,
    },
}

impl<S: DeliberationStore> Deliberation<S> {
    /// Complete the current tier.
    ///
    /// Idempotent: repeating the call after the run is decided returns
    /// the recorded consensus with no further side effects. Fails with
    /// [`Error::IncompleteTier`] while any cell is still voting.
    pub fn complete_tier(&self) -> Result<TierOutcome> {
        let tier = self.store.current_tier();
        if let Some(recorded) = self.store.tier_result(tier) {
            // Terminal tiers are the only ones whose result is still
            // filed under current_tier; forming a new tier advances it.
            return match recorded.winner() {
                Some(winner) => Ok(TierOutcome::Consensus { winner }),
                None => Err(Error::Invariant(format!(
                    "tier {} recorded without a winner but never advanced",
                    tier
                ))),
            };
        }
        self.require_phase(Phase::Voting)?;

        let cells = self.store.cells_in_tier(tier);
        if cells.is_empty() {
            return Err(Error::Invariant(format!("tier {} has no cells", tier)));
        }
        // Completion and winner-stamping are separate store writes; a
        // cell counts as pending until both have landed, so a tier can
        // never finalize past a completed cell whose tally is still in
        // flight.
        let pending = cells
            .iter()
            .filter(|c| !c.is_completed() || c.winner.is_none())
            .count();
        if pending > 0 {
            return Err(Error::IncompleteTier { tier, pending });
        }

        // Tier-wide score totals, re-tallied from the vote ledgers.
        let weights = self.roster_weights();
        let mut totals: BTreeMap<IdeaId, u64> = BTreeMap::new();
        for cell in &cells {
            let votes = self.store.votes_in(cell.id)?;
            for (idea, score) in tally::weighted_totals(&votes, &weights) {
                *totals.entry(idea).or_insert(0) += score;
            }
        }
        let scores: Vec<(IdeaId, u64)> = totals.iter().map(|(&i, &s)| (i, s)).collect();

        // Distinct winners; cells sharing a batch often share one.
        let advancing: Vec<IdeaId> = cells
            .iter()
            .filter_map(|c| c.winner)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if advancing.is_empty() {
            return Err(Error::Invariant(format!(
                "tier {} completed with no cell winners",
                tier
            )));
        }
        debug!(tier, cells = cells.len(), advancing = advancing.len(), "tier complete");

        if let [winner] = advancing[..] {
            return self.finish(tier, winner, scores, cells.len());
        }

        match self.config.flow {
            FlowMode::Batch => {
                if tier == self.store.round_base_tier() {
                    self.next_batch_tier(tier, advancing, scores, cells.len())
                } else {
                    // From the second completed tier of a run, the
                    // tier-wide totals settle it directly.
                    let (winner, score) = tally::select_winner(&totals)?;
                    debug!(tier, %winner, score, "cross-tally decided the run");
                    self.finish(tier, winner, scores, cells.len())
                }
            }
            FlowMode::Delegation => self.next_delegate_tier(tier, &cells, advancing, scores),
        }
    }

    /// Declare the run's winner: record the terminal tier, eliminate
    /// everything else, file the champion, and move the phase on.
    pub(crate) fn finish(
        &self,
        tier: u32,
        winner: IdeaId,
        scores: Vec<(IdeaId, u64)>,
        cell_count: usize,
    ) -> Result<TierOutcome> {
        self.store.record_tier_result(TierResult {
            tier,
            advancing: vec![winner],
            scores,
            cell_count,
        });
        for idea in self.store.ideas() {
            if idea.id != winner
                && matches!(idea.status, IdeaStatus::InVoting | IdeaStatus::Advancing)
            {
                self.store.set_idea_status(idea.id, IdeaStatus::Eliminated);
            }
        }

        let round = self.store.challenge_round();
        self.store.set_champion(Champion {
            idea: winner,
            total_tiers: tier,
            total_voters: self.store.voters_total(),
            challenge_round: round,
        });

        if self.config.continuous {
            self.store.set_idea_status(winner, IdeaStatus::Defending);
            self.store.set_phase(Phase::Accumulating);
            debug!(%winner, round, "champion declared, accumulating challengers");
        } else {
            self.store.set_idea_status(winner, IdeaStatus::Winner);
            self.store.set_phase(Phase::Completed);
            debug!(%winner, tier, "consensus reached");
        }
        Ok(TierOutcome::Consensus { winner })
    }

    /// Batch flow: the full roster votes again on the shrunk pool.
    fn next_batch_tier(
        &self,
        tier: u32,
        advancing: Vec<IdeaId>,
        scores: Vec<(IdeaId, u64)>,
        cell_count: usize,
    ) -> Result<TierOutcome> {
        self.store.record_tier_result(TierResult {
            tier,
            advancing: advancing.clone(),
            scores,
            cell_count,
        });
        self.eliminate_losers(&advancing);

        let roster = self.store.active_roster();
        let next = tier + 1;
        let cells = self.form_tier(next, &roster, &advancing)?;
        self.store.set_current_tier(next);
        Ok(TierOutcome::NextTier {
            tier: next,
            cells: cells.len(),
            electorate: roster.len(),
        })
    }

    /// Every in-voting idea either advances or is eliminated.
    pub(crate) fn eliminate_losers(&self, advancing: &[IdeaId]) {
        for idea in self.store.ideas() {
            if idea.status != IdeaStatus::InVoting {
                continue;
            }
            let status = if advancing.contains(&idea.id) {
                IdeaStatus::Advancing
            } else {
                IdeaStatus::Eliminated
            };
            self.store.set_idea_status(idea.id, status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DeliberationConfig;
    use chant_model::{Cell, ParticipantId};

    fn batch(seed: u64) -> Deliberation {
        Deliberation::new(DeliberationConfig::default().with_seed(seed))
    }

    /// Everyone in the cell votes for `pick`.
    fn decide_cell(d: &Deliberation, cell: &Cell, pick: IdeaId) {
        for &member in &cell.members {
            d.cast_vote(cell.id, member, pick).unwrap();
        }
    }

    fn setup(d: &Deliberation, people: usize, ideas: usize) -> Vec<Cell> {
        let pids: Vec<ParticipantId> = (0..people)
            .map(|i| d.register(format!("p{}", i)).unwrap())
            .collect();
        for i in 0..ideas {
            d.submit_idea(pids[i % pids.len()], format!("idea {}", i))
                .unwrap();
        }
        d.open_voting().unwrap()
    }

    #[test]
    fn incomplete_tier_is_rejected_with_pending_count() {
        let d = batch(1);
        let cells = setup(&d, 16, 32);
        decide_cell(&d, &cells[0], cells[0].ideas[0]);

        assert_eq!(
            d.complete_tier(),
            Err(Error::IncompleteTier { tier: 1, pending: 2 }),
        );
    }

    #[test]
    fn first_tier_forms_a_second_from_the_full_roster() {
        let d = batch(1);
        let cells = setup(&d, 16, 32);
        for cell in &cells {
            decide_cell(&d, cell, cell.ideas[0]);
        }

        let outcome = d.complete_tier().unwrap();
        assert_eq!(
            outcome,
            TierOutcome::NextTier {
                tier: 2,
                cells: 3,
                electorate: 16,
            },
        );
        assert_eq!(d.current_tier(), 2);

        // Pool shrank from 32 to the 3 cell winners.
        let result = d.tier_result(1).unwrap();
        assert_eq!(result.advancing.len(), 3);
        assert_eq!(result.cell_count, 3);
        assert!(!result.is_consensus());

        // Losers eliminated, winners back in voting for tier 2.
        let live: Vec<IdeaId> = d
            .store()
            .ideas()
            .iter()
            .filter(|i| i.status == IdeaStatus::InVoting)
            .map(|i| i.id)
            .collect();
        assert_eq!(live, result.advancing);
        let eliminated = d
            .store()
            .ideas()
            .iter()
            .filter(|i| i.status == IdeaStatus::Eliminated)
            .count();
        assert_eq!(eliminated, 32 - 3);
    }

    #[test]
    fn unanimous_tier_one_ends_the_run() {
        // 5 people, one cell: its winner is global consensus.
        let d = batch(1);
        let cells = setup(&d, 5, 8);
        assert_eq!(cells.len(), 1);
        let pick = cells[0].ideas[2];
        decide_cell(&d, &cells[0], pick);

        let outcome = d.complete_tier().unwrap();
        assert_eq!(outcome, TierOutcome::Consensus { winner: pick });
        assert_eq!(d.phase(), Phase::Completed);
        assert_eq!(d.store().idea(pick).unwrap().status, IdeaStatus::Winner);

        let champion = d.champion().unwrap();
        assert_eq!(champion.idea, pick);
        assert_eq!(champion.total_tiers, 1);
        assert_eq!(champion.total_voters, 5);
    }

    #[test]
    fn second_tier_is_settled_by_cross_tally() {
        let d = batch(1);
        let tier1 = setup(&d, 16, 32);
        for cell in &tier1 {
            decide_cell(&d, cell, cell.ideas[0]);
        }
        d.complete_tier().unwrap();

        // Tier 2: make the cells disagree so no single winner emerges,
        // then the cross-tally picks the idea with the highest total.
        let tier2 = d.store().cells_in_tier(2);
        for cell in &tier2 {
            // Each cell unanimously backs a different ballot entry.
            let pick = cell.ideas[cell.id.value() as usize % cell.ideas.len()];
            decide_cell(&d, cell, pick);
        }

        let outcome = d.complete_tier().unwrap();
        let TierOutcome::Consensus { winner } = outcome else {
            panic!("expected a cross-tally decision, got {:?}", outcome);
        };
        assert_eq!(d.phase(), Phase::Completed);

        // The cross-tally winner carries the highest tier-2 total.
        let result = d.tier_result(2).unwrap();
        let top = result.scores.iter().map(|&(_, s)| s).max().unwrap();
        let winner_score = result
            .scores
            .iter()
            .find(|&&(i, _)| i == winner)
            .map(|&(_, s)| s)
            .unwrap();
        assert_eq!(winner_score, top);
    }

    #[test]
    fn complete_tier_is_idempotent_after_consensus() {
        let d = batch(1);
        let cells = setup(&d, 5, 8);
        let pick = cells[0].ideas[0];
        decide_cell(&d, &cells[0], pick);

        let first = d.complete_tier().unwrap();
        let snapshot = d.snapshot();
        let again = d.complete_tier().unwrap();
        assert_eq!(first, again);
        // No additional side effects.
        assert_eq!(d.snapshot(), snapshot);
    }

    #[test]
    fn completed_cell_without_a_stamped_winner_stays_pending() {
        let d = batch(1);
        let cells = setup(&d, 16, 32);
        decide_cell(&d, &cells[0], cells[0].ideas[0]);
        decide_cell(&d, &cells[1], cells[1].ideas[0]);
        // Complete the third cell through the raw store primitive: its
        // votes are all in but no winner has been stamped yet.
        for &member in &cells[2].members {
            d.store()
                .record_vote(cells[2].id, member, cells[2].ideas[0])
                .unwrap();
        }
        assert!(d.store().cell(cells[2].id).unwrap().is_completed());

        // The tier must not finalize around the unstamped cell.
        assert_eq!(
            d.complete_tier(),
            Err(Error::IncompleteTier { tier: 1, pending: 1 }),
        );

        // Once the winner lands, the tier completes and the late
        // cell's winner is counted.
        d.finalize_cell(cells[2].id).unwrap();
        let outcome = d.complete_tier().unwrap();
        assert!(matches!(outcome, TierOutcome::NextTier { .. }));
        let advancing = d.tier_result(1).unwrap().advancing;
        assert!(advancing.contains(&cells[2].ideas[0]));
    }

    #[test]
    fn completing_with_no_cells_is_an_invariant_violation() {
        let d = batch(1);
        setup(&d, 5, 8);
        d.store().set_current_tier(9);
        assert!(matches!(d.complete_tier(), Err(Error::Invariant(_))));
    }

    #[test]
    fn advancing_idea_count_strictly_decreases() {
        let d = batch(1);
        let mut cells = setup(&d, 16, 32);
        let mut pool = 32;
        loop {
            for cell in &cells {
                decide_cell(&d, cell, cell.ideas[0]);
            }
            match d.complete_tier().unwrap() {
                TierOutcome::Consensus { .. } => break,
                TierOutcome::NextTier { tier, .. } => {
                    let advanced = d.tier_result(tier - 1).unwrap().advancing.len();
                    assert!(advanced < pool, "{} !< {}", advanced, pool);
                    pool = advanced;
                    cells = d.store().cells_in_tier(tier);
                }
            }
        }
        assert_eq!(d.phase(), Phase::Completed);
    }

    #[test]
    fn phase_error_when_completing_before_voting() {
        let d = batch(1);
        assert!(matches!(
            d.complete_tier(),
            Err(Error::Phase {
                expected: Phase::Voting,
                actual: Phase::Submission,
            }),
        ));
    }
}

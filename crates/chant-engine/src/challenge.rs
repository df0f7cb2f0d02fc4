//! Champion challenge rounds (continuous flow).
//!
//! In a continuous-flow deliberation consensus does not end the run:
//! the winner becomes a defending champion, the phase moves to
//! accumulating, and new challenger ideas may be submitted. Opening
//! the next round forms a fresh tier from the champion plus every
//! accumulated challenger, with the full roster voting again; the
//! round's winner takes (or keeps) the championship and returns to
//! accumulating. An explicit close ends the deliberation.

use tracing::debug;

use chant_model::{Cell, Champion, IdeaId, IdeaStatus, ParticipantId, Phase};

use crate::engine::Deliberation;
use crate::error::{Error, Result};
use crate::store::DeliberationStore;

impl<S: DeliberationStore> Deliberation<S> {
    /// Submit a challenger idea during the accumulation window.
    pub fn submit_challenger(
        &self,
        author: ParticipantId,
        text: impl Into<String>,
    ) -> Result<IdeaId> {
        self.require_phase(Phase::Accumulating)?;
        self.admit_idea(author, text)
    }

    /// Challenger ideas accumulated for the next round.
    pub fn challengers(&self) -> Vec<IdeaId> {
        self.store
            .ideas()
            .into_iter()
            .filter(|i| i.status == IdeaStatus::Submitted)
            .map(|i| i.id)
            .collect()
    }

    /// Open the next challenge round: a new tier of the champion plus
    /// all accumulated challengers, judged by the full roster.
    pub fn begin_challenge_round(&self) -> Result<Vec<Cell>> {
        self.require_phase(Phase::Accumulating)?;
        let champion = self.reigning_champion()?;
        let challengers = self.challengers();
        if challengers.is_empty() {
            return Err(Error::NoChallengers);
        }
        let mut pool = vec![champion.idea];
        pool.extend(challengers);
        pool.sort_unstable();

        self.store.restore_base_roster();
        let roster = self.store.active_roster();
        let next = self.store.current_tier() + 1;
        let round = self.store.challenge_round() + 1;
        let cells = self.form_tier(next, &roster, &pool)?;

        self.store.set_current_tier(next);
        self.store.set_round_base_tier(next);
        self.store.set_challenge_round(round);
        self.store.set_phase(Phase::Voting);
        debug!(
            round,
            tier = next,
            challengers = pool.len() - 1,
            "challenge round opened"
        );
        Ok(cells)
    }

    /// End a continuous-flow deliberation: the reigning champion is
    /// declared the final winner.
    pub fn close(&self) -> Result<Champion> {
        self.require_phase(Phase::Accumulating)?;
        let champion = self.reigning_champion()?;
        self.store.set_idea_status(champion.idea, IdeaStatus::Winner);
        self.store.set_phase(Phase::Completed);
        debug!(winner = %champion.idea, rounds = champion.challenge_round, "deliberation closed");
        Ok(champion)
    }

    fn reigning_champion(&self) -> Result<Champion> {
        self.store.champion().ok_or_else(|| {
            Error::Invariant("deliberation is accumulating without a champion".into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DeliberationConfig;
    use crate::tier::TierOutcome;

    /// 5 people, continuous flow; everyone backs the given ballot
    /// index each time a cell votes.
    fn continuous() -> (Deliberation, Vec<ParticipantId>) {
        let d = Deliberation::new(
            DeliberationConfig::default()
                .with_continuous(true)
                .with_seed(11),
        );
        let pids: Vec<ParticipantId> = (0..5)
            .map(|i| d.register(format!("p{}", i)).unwrap())
            .collect();
        for i in 0..4 {
            d.submit_idea(pids[i], format!("idea {}", i)).unwrap();
        }
        (d, pids)
    }

    fn decide_all_cells(d: &Deliberation, pick_index: usize) {
        for cell in d.store().cells_in_tier(d.current_tier()) {
            let pick = cell.ideas[pick_index.min(cell.ideas.len() - 1)];
            for &member in &cell.members {
                d.cast_vote(cell.id, member, pick).unwrap();
            }
        }
    }

    #[test]
    fn consensus_opens_an_accumulation_window() {
        let (d, _) = continuous();
        d.open_voting().unwrap();
        decide_all_cells(&d, 0);

        let outcome = d.complete_tier().unwrap();
        let TierOutcome::Consensus { winner } = outcome else {
            panic!("expected consensus");
        };
        assert_eq!(d.phase(), Phase::Accumulating);
        assert_eq!(
            d.store().idea(winner).unwrap().status,
            IdeaStatus::Defending,
        );
        assert_eq!(d.champion().unwrap().challenge_round, 0);
    }

    #[test]
    fn round_needs_at_least_one_challenger() {
        let (d, _) = continuous();
        d.open_voting().unwrap();
        decide_all_cells(&d, 0);
        d.complete_tier().unwrap();

        assert_eq!(d.begin_challenge_round(), Err(Error::NoChallengers));
    }

    #[test]
    fn challenger_can_take_the_championship() {
        let (d, pids) = continuous();
        d.open_voting().unwrap();
        decide_all_cells(&d, 0);
        let TierOutcome::Consensus { winner: first } = d.complete_tier().unwrap() else {
            panic!("expected consensus");
        };

        let challenger = d.submit_challenger(pids[1], "a better idea").unwrap();
        assert_eq!(d.challengers(), vec![challenger]);

        let cells = d.begin_challenge_round().unwrap();
        assert_eq!(d.phase(), Phase::Voting);
        assert_eq!(d.challenge_round(), 1);
        assert_eq!(d.current_tier(), 2);
        // Champion and challenger share the round's ballot.
        assert!(cells[0].has_idea(first));
        assert!(cells[0].has_idea(challenger));

        // Everyone switches to the challenger.
        for &member in &cells[0].members {
            d.cast_vote(cells[0].id, member, challenger).unwrap();
        }
        let TierOutcome::Consensus { winner } = d.complete_tier().unwrap() else {
            panic!("expected consensus");
        };
        assert_eq!(winner, challenger);
        assert_eq!(d.phase(), Phase::Accumulating);
        assert_eq!(d.store().idea(first).unwrap().status, IdeaStatus::Eliminated);

        let champion = d.champion().unwrap();
        assert_eq!(champion.idea, challenger);
        assert_eq!(champion.challenge_round, 1);
    }

    #[test]
    fn close_finishes_with_the_reigning_champion() {
        let (d, _) = continuous();
        d.open_voting().unwrap();
        decide_all_cells(&d, 0);
        let TierOutcome::Consensus { winner } = d.complete_tier().unwrap() else {
            panic!("expected consensus");
        };

        let champion = d.close().unwrap();
        assert_eq!(champion.idea, winner);
        assert_eq!(d.phase(), Phase::Completed);
        assert_eq!(d.store().idea(winner).unwrap().status, IdeaStatus::Winner);
    }

    #[test]
    fn challenge_operations_reject_wrong_phases() {
        let (d, pids) = continuous();
        assert!(matches!(
            d.submit_challenger(pids[0], "too early"),
            Err(Error::Phase {
                expected: Phase::Accumulating,
                ..
            }),
        ));
        assert!(matches!(d.begin_challenge_round(), Err(Error::Phase { .. })));
        assert!(matches!(d.close(), Err(Error::Phase { .. })));
    }
}

//! Delegate promotion.
//!
//! In delegation flow each tier's cell winners are converted into
//! delegates: the delegate is the winning idea's author, and their
//! weight is the number of constituents they represent. At the
//! population tier that weight is the producing cell's size; at later
//! tiers it is the author's already-recorded delegate weight, carried
//! forward unchanged. An author who wins in several cells becomes one
//! delegate championing all their winning ideas, with the producing
//! cells' sizes summed at the population tier.
//!
//! Weight conservation holds at the population boundary: the delegate
//! weights sum to the electorate size, so every person is represented
//! exactly once, transitively. Each delegate tier is a roughly 5x
//! smaller, higher-weight decision body, which is what makes the
//! process logarithmic.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::{debug, error, warn};

use chant_model::{Cell, Delegate, IdeaId, ParticipantId, TierResult};
use chant_plan::MIN_CELL_SIZE;

use crate::engine::Deliberation;
use crate::error::{Error, Result};
use crate::store::DeliberationStore;
use crate::tally;
use crate::tier::TierOutcome;

impl<S: DeliberationStore> Deliberation<S> {
    /// Delegation flow: winners become weighted delegates and a
    /// smaller tier is formed from them. Falls back to a cross-tally
    /// decision when too few delegates remain to seat a cell.
    pub(crate) fn next_delegate_tier(
        &self,
        tier: u32,
        cells: &[Cell],
        advancing: Vec<IdeaId>,
        scores: Vec<(IdeaId, u64)>,
    ) -> Result<TierOutcome> {
        let delegates = self.promote_winners(tier, cells)?;

        if tier == self.store.round_base_tier() {
            let population: u64 = cells.iter().map(|c| c.members.len() as u64).sum();
            let represented: u64 = delegates.iter().map(|d| d.weight).sum();
            if represented != population {
                error!(population, represented, "delegate weights do not cover the electorate");
                return Err(Error::Invariant(format!(
                    "delegate weights sum to {} for a population of {}",
                    represented, population
                )));
            }
        }

        if delegates.len() < MIN_CELL_SIZE {
            // Too few delegates to seat a cell; the tier totals decide.
            warn!(
                delegates = delegates.len(),
                "not enough delegates for another tier, settling by cross-tally"
            );
            let totals: BTreeMap<IdeaId, u64> = scores.iter().copied().collect();
            let (winner, _) = tally::select_winner(&totals)?;
            return self.finish(tier, winner, scores, cells.len());
        }

        self.store.record_tier_result(TierResult {
            tier,
            advancing: advancing.clone(),
            scores,
            cell_count: cells.len(),
        });
        self.eliminate_losers(&advancing);

        let roster: Vec<_> = delegates.iter().map(Delegate::as_participant).collect();
        self.store.replace_active_roster(roster.clone());
        debug!(
            tier,
            delegates = roster.len(),
            total_weight = roster.iter().map(|p| p.weight).sum::<u64>(),
            "delegates promoted"
        );

        let next = tier + 1;
        let new_cells = self.form_tier(next, &roster, &advancing)?;
        self.store.set_current_tier(next);
        Ok(TierOutcome::NextTier {
            tier: next,
            cells: new_cells.len(),
            electorate: roster.len(),
        })
    }

    /// Convert the tier's cell winners into delegates, merging
    /// multi-cell authors.
    fn promote_winners(&self, tier: u32, cells: &[Cell]) -> Result<Vec<Delegate>> {
        let population_tier = tier == self.store.round_base_tier();
        let mut by_author: BTreeMap<ParticipantId, Delegate> = BTreeMap::new();

        for cell in cells {
            let winner = cell.winner.ok_or_else(|| {
                Error::Invariant(format!("completed cell {} has no winner", cell.id))
            })?;
            let idea = self.store.idea(winner).ok_or(Error::NotFound {
                kind: "idea",
                id: winner.value(),
            })?;
            let author = idea.author;
            let weight = if population_tier {
                cell.members.len() as u64
            } else {
                // Carried forward from the existing delegate record,
                // never re-derived.
                self.store.participant(author).map_or(1, |p| p.weight)
            };

            match by_author.entry(author) {
                Entry::Occupied(mut entry) => {
                    let delegate = entry.get_mut();
                    if population_tier {
                        delegate.weight += weight;
                    }
                    if !delegate.representing.contains(&winner) {
                        delegate.representing.push(winner);
                    }
                }
                Entry::Vacant(entry) => {
                    let name = self
                        .store
                        .participant(author)
                        .map_or_else(|| format!("participant {}", author), |p| p.name);
                    entry.insert(Delegate {
                        id: author,
                        name,
                        weight,
                        representing: vec![winner],
                    });
                }
            }
        }
        Ok(by_author.into_values().collect())
    }
}

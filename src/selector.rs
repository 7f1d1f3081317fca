use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{Error, Result};
use crate::models::{Card, FilterMode};

/// Keeps the cards `mode` lets through, preserving their order.
pub fn filter_cards(cards: Vec<Card>, mode: FilterMode) -> Vec<Card> {
    cards.into_iter().filter(|card| mode.matches(card)).collect()
}

/// Uniform permutation of `0..n` (Fisher-Yates).
pub fn random_permutation<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    order
}

/// Maps a monotonically increasing cursor onto a shuffled filtered set.
///
/// The permutation survives until the filtered set changes size or the caller
/// invalidates it; it is then replaced wholesale.
#[derive(Debug, Clone, Default)]
pub struct CardSelector {
    order: Option<Vec<usize>>,
}

impl CardSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order(&self) -> Option<&[usize]> {
        self.order.as_deref()
    }

    pub fn invalidate(&mut self) {
        self.order = None;
    }

    fn ensure_order<R: Rng + ?Sized>(&mut self, n: usize, rng: &mut R) -> &[usize] {
        let stale = self.order.as_ref().map_or(true, |order| order.len() != n);
        if stale {
            self.order = Some(random_permutation(n, rng));
        }
        self.order.as_deref().unwrap_or_default()
    }

    /// The card at `cursor`, i.e. `filtered[order[cursor % n]]`.
    pub fn select<'a, R: Rng + ?Sized>(
        &mut self,
        filtered: &'a [Card],
        cursor: usize,
        rng: &mut R,
    ) -> Result<&'a Card> {
        let n = filtered.len();
        if n == 0 {
            return Err(Error::EmptySelection);
        }

        let order = self.ensure_order(n, rng);
        Ok(&filtered[order[cursor % n]])
    }
}

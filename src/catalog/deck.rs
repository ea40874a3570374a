use rand::{seq::SliceRandom, Rng};

/// Shuffled draw order over a pool of record indices.
///
/// Every index comes up once before the pool is reshuffled, and a reshuffle
/// never starts with the index that was drawn last.
#[derive(Debug, Default, Clone)]
pub struct Deck {
    order: Vec<usize>,
    last: Option<usize>,
}

impl Deck {
    pub fn draw<R: Rng + ?Sized>(&mut self, pool: &[usize], rng: &mut R) -> Option<usize> {
        if pool.is_empty() {
            return None;
        }

        if self.order.is_empty() {
            self.order = pool.to_vec();
            self.order.shuffle(rng);
            // cards come off the back
            let n = self.order.len();
            if n > 1 && self.order.last() == self.last.as_ref() {
                self.order.swap(0, n - 1);
            }
        }

        let next = self.order.pop();
        self.last = next;
        next
    }

    pub fn remaining(&self) -> usize {
        self.order.len()
    }
}

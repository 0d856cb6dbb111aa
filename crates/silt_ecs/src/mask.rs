use crate::component::ComponentId;

/// Maximum number of component types a [`World`](crate::world::World) can
/// hold. Fixes the width of [`Mask`] and the size of the per-archetype
/// access and transition tables.
pub const MASK_TOTAL_BITS: usize = 128;

pub(crate) const MASK_WORDS: usize = MASK_TOTAL_BITS / 64;

/// Fixed-width bitset over the component id space.
///
/// Two masks with the same bit pattern compare and hash equal, which makes
/// the mask usable as the key of the archetype table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Mask {
    words: [u64; MASK_WORDS],
}

impl Mask {
    #[inline]
    pub fn from_ids(ids: &[ComponentId]) -> Self {
        let mut mask = Self::default();
        for &id in ids {
            mask.set(id, true);
        }
        mask
    }

    #[inline]
    pub fn get(&self, id: ComponentId) -> bool {
        let index = id.index();
        (self.words[index / 64] >> (index % 64)) & 1 == 1
    }

    #[inline]
    pub fn set(&mut self, id: ComponentId, value: bool) {
        let index = id.index();
        if value {
            self.words[index / 64] |= 1 << (index % 64);
        } else {
            self.words[index / 64] &= !(1 << (index % 64));
        }
    }

    /// Copy of `self` with `id` set.
    #[inline]
    pub fn with(mut self, id: ComponentId) -> Self {
        self.set(id, true);
        self
    }

    /// Copy of `self` with `id` cleared.
    #[inline]
    pub fn without(mut self, id: ComponentId) -> Self {
        self.set(id, false);
        self
    }

    /// Mask with every bit set in `self` or `other`.
    #[inline]
    pub fn union(&self, other: &Mask) -> Mask {
        let mut words = self.words;
        for (word, other) in words.iter_mut().zip(other.words.iter()) {
            *word |= other;
        }
        Mask { words }
    }

    /// Mask with the bits of `self` that are not set in `other`.
    #[inline]
    pub fn difference(&self, other: &Mask) -> Mask {
        let mut words = self.words;
        for (word, other) in words.iter_mut().zip(other.words.iter()) {
            *word &= !other;
        }
        Mask { words }
    }

    /// Whether every bit of `other` is also set in `self`.
    #[inline]
    pub fn contains(&self, other: &Mask) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| a & b == *b)
    }

    /// Whether `self` and `other` share no bits.
    #[inline]
    pub fn is_disjoint(&self, other: &Mask) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| a & b == 0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterates the set component ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.words.iter().enumerate().flat_map(|(word_index, &word)| {
            let base = word_index * 64;
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let tz = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(ComponentId::from_index(base + tz))
            })
        })
    }
}

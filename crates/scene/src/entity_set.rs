use crate::entity::EntityId;
use foundation::handles::Handle;

/// Deterministic entity set backed by a bitset.
///
/// Membership is tracked by `EntityId::index()`; the generation stored per slot
/// makes `contains` reject stale ids whose slot has been reused.
///
/// Ordering contract:
/// - Iteration yields entities in ascending index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySet {
    words: Vec<u64>,
    generations: Vec<u32>,
    len: usize,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.words.clear();
        self.generations.clear();
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        let (word, bit) = word_bit(entity.index());
        let present = self
            .words
            .get(word)
            .is_some_and(|w| (w & (1u64 << bit)) != 0);
        present && self.generations[entity.index() as usize] == entity.generation()
    }

    /// Inserts `entity` into the set, replacing a stale id in the same slot.
    ///
    /// Returns `true` if the set changed.
    pub fn insert(&mut self, entity: EntityId) -> bool {
        if self.contains(entity) {
            return false;
        }
        let index = entity.index();
        self.ensure_capacity(index);
        let (word, bit) = word_bit(index);
        let mask = 1u64 << bit;
        let w = &mut self.words[word];
        if (*w & mask) == 0 {
            *w |= mask;
            self.len += 1;
        }
        self.generations[index as usize] = entity.generation();
        true
    }

    /// Removes `entity` from the set.
    ///
    /// Returns `true` if the set changed.
    pub fn remove(&mut self, entity: EntityId) -> bool {
        if !self.contains(entity) {
            return false;
        }
        let (word, bit) = word_bit(entity.index());
        self.words[word] &= !(1u64 << bit);
        self.len -= 1;
        true
    }

    /// Iterates member entities in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        SetIndexIter {
            words: &self.words,
            word_index: 0,
            current_word: 0,
            base_index: 0,
        }
        .map(|idx| EntityId(Handle::new(idx, self.generations[idx as usize])))
    }

    fn ensure_capacity(&mut self, index: u32) {
        let (word, _bit) = word_bit(index);
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        if self.generations.len() <= index as usize {
            self.generations.resize(index as usize + 1, 0);
        }
    }
}

impl FromIterator<EntityId> for EntitySet {
    fn from_iter<I: IntoIterator<Item = EntityId>>(iter: I) -> Self {
        let mut set = EntitySet::new();
        for entity in iter {
            set.insert(entity);
        }
        set
    }
}

fn word_bit(index: u32) -> (usize, u32) {
    let word = (index / 64) as usize;
    let bit = index % 64;
    (word, bit)
}

struct SetIndexIter<'a> {
    words: &'a [u64],
    word_index: usize,
    current_word: u64,
    base_index: u32,
}

impl Iterator for SetIndexIter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let tz = self.current_word.trailing_zeros();
                self.current_word &= !(1u64 << tz);
                return Some(self.base_index + tz);
            }

            let w = *self.words.get(self.word_index)?;
            self.current_word = w;
            self.base_index = (self.word_index as u32) * 64;
            self.word_index += 1;
        }
    }
}

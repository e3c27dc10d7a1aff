// reflex_core/src/estimation/delay_line.rs

/// A fixed-capacity ring buffer indexed from the most recent entry.
///
/// Slot 0 is the newest value and slot `capacity - 1` the oldest. Pushing
/// moves every entry one slot older and drops whatever was in the oldest slot.
/// Only the write cursor moves, so a push never copies the stored entries.
#[derive(Debug, Clone)]
pub struct DelayLine<T> {
    slots: Vec<T>,
    /// Physical index of slot 0.
    head: usize,
    /// Number of genuine pushes held, saturating at the capacity.
    filled: usize,
}

impl<T: Clone> DelayLine<T> {
    /// Creates a line with every slot set to `fill`.
    pub fn new(capacity: usize, fill: T) -> Self {
        Self {
            slots: vec![fill; capacity],
            head: 0,
            filled: 0,
        }
    }
}

impl<T> DelayLine<T> {
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// How many slots hold pushed values rather than the initial fill.
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// True once every slot holds a pushed value. A zero-capacity line is always full.
    pub fn is_full(&self) -> bool {
        self.filled == self.slots.len()
    }

    /// Stores `value` in slot 0 and returns the entry that fell off the end, if any.
    pub fn push(&mut self, value: T) -> Option<T> {
        let capacity = self.slots.len();
        if capacity == 0 {
            return None;
        }
        // The oldest slot sits right after slot 0 in physical order.
        self.head = (self.head + capacity - 1) % capacity;
        self.filled = (self.filled + 1).min(capacity);
        Some(std::mem::replace(&mut self.slots[self.head], value))
    }

    /// Slot `age`, where 0 is the most recent entry.
    pub fn get(&self, age: usize) -> Option<&T> {
        let capacity = self.slots.len();
        if age >= capacity {
            return None;
        }
        self.slots.get((self.head + age) % capacity)
    }

    pub fn newest(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn oldest(&self) -> Option<&T> {
        self.get(self.slots.len().checked_sub(1)?)
    }

    /// Iterates from the oldest slot to the newest.
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.slots.len()).rev().filter_map(move |age| self.get(age))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_fill_value() {
        let line = DelayLine::new(3, 0);
        assert_eq!(line.capacity(), 3);
        assert_eq!(line.filled(), 0);
        assert!(!line.is_full());
        assert_eq!(line.iter_oldest_first().copied().collect::<Vec<_>>(), vec![0, 0, 0]);
    }

    #[test]
    fn push_ages_entries() {
        let mut line = DelayLine::new(3, 0);
        assert_eq!(line.push(1), Some(0));
        assert_eq!(line.push(2), Some(0));
        assert_eq!(line.get(0), Some(&2));
        assert_eq!(line.get(1), Some(&1));
        assert_eq!(line.get(2), Some(&0));
        assert_eq!(line.get(3), None);
        assert!(!line.is_full());

        assert_eq!(line.push(3), Some(0));
        assert!(line.is_full());
        assert_eq!(line.oldest(), Some(&1));

        // Wrapping around drops the oldest.
        assert_eq!(line.push(4), Some(1));
        assert_eq!(line.newest(), Some(&4));
        assert_eq!(line.oldest(), Some(&2));
        assert_eq!(line.filled(), 3);
        assert_eq!(line.iter_oldest_first().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn single_slot_always_holds_latest() {
        let mut line = DelayLine::new(1, 'z');
        line.push('a');
        assert!(line.is_full());
        assert_eq!(line.push('b'), Some('a'));
        assert_eq!(line.newest(), line.oldest());
        assert_eq!(line.oldest(), Some(&'b'));
    }

    #[test]
    fn zero_capacity_is_trivially_full() {
        let mut line: DelayLine<u8> = DelayLine::new(0, 0);
        assert!(line.is_full());
        assert_eq!(line.push(7), None);
        assert_eq!(line.newest(), None);
        assert_eq!(line.oldest(), None);
        assert_eq!(line.iter_oldest_first().count(), 0);
    }
}

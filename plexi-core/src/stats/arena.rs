/// Fixed capacity slab with generation checked slots.
///
/// Entries are addressed by `(index, generation)`. Removing an entry bumps
/// the slot's generation so any handle still pointing at the old entry no
/// longer resolves, even after the slot has been reused.
#[derive(Debug)]
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    /// indices of the vacant slots, reused last-in first-out
    vacant: Vec<u16>,
    capacity: usize,
    len: usize,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    entry: Option<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Key {
    pub(crate) index: u16,
    pub(crate) generation: u32,
}

impl<T> Arena<T> {
    /// the capacity is clamped to what a `u16` index can address
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.min(usize::from(u16::MAX) + 1);
        Self {
            slots: Vec::with_capacity(capacity),
            vacant: Vec::new(),
            capacity,
            len: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Returns `None` when every slot is occupied.
    pub(crate) fn insert(&mut self, value: T) -> Option<Key> {
        let index = if let Some(index) = self.vacant.pop() {
            index
        } else if self.slots.len() < self.capacity {
            self.slots.push(Slot {
                generation: 0,
                entry: None,
            });
            (self.slots.len() - 1) as u16
        } else {
            return None;
        };

        let slot = &mut self.slots[usize::from(index)];
        slot.entry = Some(value);
        self.len += 1;

        Some(Key {
            index,
            generation: slot.generation,
        })
    }

    pub(crate) fn remove(&mut self, key: Key) -> Option<T> {
        let slot = self.slots.get_mut(usize::from(key.index))?;
        if slot.generation != key.generation {
            return None;
        }
        let value = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.vacant.push(key.index);
        self.len -= 1;
        Some(value)
    }

    pub(crate) fn get(&self, key: Key) -> Option<&T> {
        let slot = self.slots.get(usize::from(key.index))?;
        if slot.generation != key.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    pub(crate) fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        let slot = self.slots.get_mut(usize::from(key.index))?;
        if slot.generation != key.generation {
            return None;
        }
        slot.entry.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_until_full() {
        let mut arena = Arena::with_capacity(2);
        assert!(arena.insert(1).is_some());
        assert!(arena.insert(2).is_some());
        assert!(arena.insert(3).is_none());
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn stale_key_does_not_resolve() {
        let mut arena = Arena::with_capacity(1);
        let first = arena.insert("first").unwrap();
        assert_eq!(arena.remove(first), Some("first"));

        let second = arena.insert("second").unwrap();
        assert_eq!(first.index, second.index);
        assert_ne!(first.generation, second.generation);

        assert_eq!(arena.get(first), None);
        assert_eq!(arena.remove(first), None);
        assert_eq!(arena.get(second), Some(&"second"));
    }

    #[test]
    fn remove_twice() {
        let mut arena = Arena::with_capacity(4);
        let key = arena.insert(42).unwrap();
        assert_eq!(arena.remove(key), Some(42));
        assert_eq!(arena.remove(key), None);
        assert_eq!(arena.len(), 0);
    }

    #[test]
    fn foreign_key() {
        let mut arena: Arena<u8> = Arena::with_capacity(4);
        let key = Key {
            index: 3,
            generation: 0,
        };
        assert_eq!(arena.get(key), None);
        assert_eq!(arena.remove(key), None);
    }

    #[test]
    fn zero_capacity() {
        let mut arena = Arena::with_capacity(0);
        assert!(arena.insert(()).is_none());
        assert_eq!(arena.capacity(), 0);
    }
}

/// Generational slot arena backing body, fixture and joint storage.
///
/// Removing a value bumps the slot's generation, so any handle minted for
/// the old occupant stops resolving. Iteration visits live slots in index
/// order, which keeps everything built on top of it deterministic.
#[derive(Debug)]
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Stores a value and returns its `(index, generation)` pair
    pub fn insert(&mut self, value: T) -> (u32, u32) {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return (index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        (index, 0)
    }

    pub fn get(&self, index: u32, generation: u32) -> Option<&T> {
        self.slots
            .get(index as usize)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, index: u32, generation: u32) -> Option<&mut T> {
        self.slots
            .get_mut(index as usize)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn contains(&self, index: u32, generation: u32) -> bool {
        self.get(index, generation).is_some()
    }

    /// Removes and returns the value, invalidating existing handles to it
    pub fn remove(&mut self, index: u32, generation: u32) -> Option<T> {
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation || slot.value.is_none() {
            return None;
        }

        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        self.len -= 1;
        slot.value.take()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live entries in ascending index order
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (index as u32, slot.generation, value))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, u32, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| {
                slot.value
                    .as_mut()
                    .map(|value| (index as u32, slot.generation, value))
            })
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_round_trip() {
        let mut arena = Arena::new();
        let (i, g) = arena.insert("a");
        assert_eq!(arena.get(i, g), Some(&"a"));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn stale_generation_does_not_resolve() {
        let mut arena = Arena::new();
        let (i, g) = arena.insert(1);
        assert_eq!(arena.remove(i, g), Some(1));
        assert_eq!(arena.get(i, g), None);
        assert!(!arena.contains(i, g));

        // The slot is reused with a fresh generation
        let (i2, g2) = arena.insert(2);
        assert_eq!(i2, i);
        assert_ne!(g2, g);
        assert_eq!(arena.get(i, g), None);
        assert_eq!(arena.get(i2, g2), Some(&2));
    }

    #[test]
    fn iteration_is_in_index_order() {
        let mut arena = Arena::new();
        let (a, ga) = arena.insert("a");
        let (b, _gb) = arena.insert("b");
        let (c, _gc) = arena.insert("c");
        arena.remove(b, _gb);

        let indices: Vec<u32> = arena.iter().map(|(i, _, _)| i).collect();
        assert_eq!(indices, vec![a, c]);
        assert_eq!(arena.get(a, ga), Some(&"a"));
    }
}

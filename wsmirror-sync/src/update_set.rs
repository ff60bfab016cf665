//! Insertion-ordered set of item identifiers.

use std::collections::HashSet;

use wsmirror_core::ItemId;

/// Each identifier appears at most once; iteration follows first insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSet {
    order: Vec<ItemId>,
    members: HashSet<ItemId>,
}

impl UpdateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `id` was already present.
    pub fn insert(&mut self, id: ItemId) -> bool {
        if !self.members.insert(id) {
            return false;
        }
        self.order.push(id);
        true
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.members.contains(&id)
    }

    pub fn as_slice(&self) -> &[ItemId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl FromIterator<ItemId> for UpdateSet {
    fn from_iter<T: IntoIterator<Item = ItemId>>(iter: T) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_dedups_and_keeps_first_position() {
        let ids: UpdateSet = [3, 1, 3, 2, 1]
            .into_iter()
            .filter_map(ItemId::new)
            .collect();
        let raw: Vec<u64> = ids.iter().map(ItemId::get).collect();
        assert_eq!(raw, vec![3, 1, 2]);
        assert_eq!(ids.len(), 3);
    }
}

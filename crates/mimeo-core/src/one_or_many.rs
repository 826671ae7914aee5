//! Single-value slot that upgrades to an unordered set on second insert.

use std::collections::HashSet;
use std::collections::hash_set;
use std::hash::Hash;

/// One value, or an unordered unique collection once a second distinct
/// value arrives.
///
/// Registry entries hold most of their matcher collections in an
/// `Option<OneOrMany<T>>`: `None` until the first value, `One` for the common
/// single-pattern case, `Many` after that.
#[derive(Debug, Clone)]
pub enum OneOrMany<T: Eq + Hash> {
    One(T),
    Many(HashSet<T>),
}

impl<T: Eq + Hash> OneOrMany<T> {
    /// Insert `value`, upgrading `One` to `Many` when it is distinct.
    ///
    /// Returns `false` if an equal value was already present; the stored
    /// value is kept in that case.
    pub fn insert(&mut self, value: T) -> bool {
        if let OneOrMany::Many(set) = self {
            return set.insert(value);
        }
        if let OneOrMany::One(existing) = self {
            if *existing == value {
                return false;
            }
        }

        let previous = std::mem::replace(self, OneOrMany::Many(HashSet::with_capacity(2)));
        if let (OneOrMany::One(existing), OneOrMany::Many(set)) = (previous, &mut *self) {
            set.insert(existing);
            set.insert(value);
        }
        true
    }

    /// Insert into an optional slot, creating `One` when the slot is empty.
    pub fn insert_into(slot: &mut Option<Self>, value: T) -> bool {
        match slot {
            Some(existing) => existing.insert(value),
            None => {
                *slot = Some(OneOrMany::One(value));
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(set) => set.len(),
        }
    }

    /// Always `false`: an empty collection is represented by `None` at the
    /// owning slot.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn is_many(&self) -> bool {
        matches!(self, OneOrMany::Many(_))
    }

    pub fn contains(&self, value: &T) -> bool {
        match self {
            OneOrMany::One(v) => v == value,
            OneOrMany::Many(set) => set.contains(value),
        }
    }

    pub fn iter(&self) -> Iter<'_, T> {
        match self {
            OneOrMany::One(v) => Iter::One(Some(v)),
            OneOrMany::Many(set) => Iter::Many(set.iter()),
        }
    }
}

impl<T: Eq + Hash> PartialEq for OneOrMany<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|v| other.contains(v))
    }
}

impl<'a, T: Eq + Hash> IntoIterator for &'a OneOrMany<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Borrowing iterator over a [`OneOrMany`].
pub enum Iter<'a, T> {
    One(Option<&'a T>),
    Many(hash_set::Iter<'a, T>),
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Iter::One(v) => v.take(),
            Iter::Many(it) => it.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_into_empty_slot_creates_one() {
        let mut slot: Option<OneOrMany<u8>> = None;
        assert!(OneOrMany::insert_into(&mut slot, 1));
        assert!(matches!(slot, Some(OneOrMany::One(1))));
    }

    #[test]
    fn test_second_distinct_value_upgrades() {
        let mut v = OneOrMany::One("a");
        assert!(v.insert("b"));
        assert!(v.is_many());
        assert_eq!(v.len(), 2);
        assert!(v.contains(&"a"));
        assert!(v.contains(&"b"));
    }

    #[test]
    fn test_duplicate_does_not_upgrade() {
        let mut v = OneOrMany::One(7);
        assert!(!v.insert(7));
        assert!(!v.is_many());
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn test_iter_covers_all_members() {
        let mut v = OneOrMany::One(1);
        v.insert(2);
        v.insert(3);
        let mut seen: Vec<_> = v.iter().copied().collect();
        seen.sort();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_equality_ignores_order() {
        let mut a = OneOrMany::One(1);
        a.insert(2);
        let mut b = OneOrMany::One(2);
        b.insert(1);
        assert_eq!(a, b);
        assert_ne!(a, OneOrMany::One(1));
    }
}

//! Value-semantics sets with the source language's operators.
//!
//! `+` is union, `-` difference, `*` intersection; `<=` and `>=` test for
//! subset and superset. Operators build new sets and leave both operands
//! untouched.

use core::cmp::Ordering;
use core::fmt;
use core::hash::Hash;
use core::ops::{Add, Mul, Sub};

use rustc_hash::FxHashSet;

/// Unordered set of distinct elements.
#[derive(Clone)]
pub struct Set<T> {
    items: FxHashSet<T>,
}

impl<T: Eq + Hash> Set<T> {
    pub fn new() -> Self {
        Self {
            items: FxHashSet::default(),
        }
    }

    /// Add `value`; no effect if already present.
    pub fn include(&mut self, value: T) {
        self.items.insert(value);
    }

    /// Remove `value`; no effect if absent.
    pub fn exclude(&mut self, value: &T) {
        self.items.remove(value);
    }

    /// `value in set`.
    pub fn contains(&self, value: &T) -> bool {
        self.items.contains(value)
    }

    pub fn size(&self) -> i32 {
        i32::try_from(self.items.len()).unwrap_or(i32::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter()
    }

    pub fn is_subset(&self, other: &Self) -> bool {
        self.items.is_subset(&other.items)
    }

    pub fn is_superset(&self, other: &Self) -> bool {
        self.items.is_superset(&other.items)
    }
}

impl<T: Eq + Hash> Default for Set<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a set from a literal list of elements.
pub fn make_set<T: Eq + Hash + Clone>(items: &[T]) -> Set<T> {
    items.iter().cloned().collect()
}

/// `value in set`, as a free function for generated code.
pub fn in_set<T: Eq + Hash>(value: &T, set: &Set<T>) -> bool {
    set.contains(value)
}

impl<T: Eq + Hash> FromIterator<T> for Set<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<T: Eq + Hash> Extend<T> for Set<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl<T: Eq + Hash + Clone> Add for &Set<T> {
    type Output = Set<T>;

    fn add(self, rhs: &Set<T>) -> Set<T> {
        self.items.union(&rhs.items).cloned().collect()
    }
}

impl<T: Eq + Hash + Clone> Sub for &Set<T> {
    type Output = Set<T>;

    fn sub(self, rhs: &Set<T>) -> Set<T> {
        self.items.difference(&rhs.items).cloned().collect()
    }
}

impl<T: Eq + Hash + Clone> Mul for &Set<T> {
    type Output = Set<T>;

    fn mul(self, rhs: &Set<T>) -> Set<T> {
        self.items.intersection(&rhs.items).cloned().collect()
    }
}

impl<T: Eq + Hash> Add for Set<T> {
    type Output = Set<T>;

    fn add(mut self, rhs: Set<T>) -> Set<T> {
        self.items.extend(rhs.items);
        self
    }
}

impl<T: Eq + Hash> Sub for Set<T> {
    type Output = Set<T>;

    fn sub(mut self, rhs: Set<T>) -> Set<T> {
        self.items.retain(|item| !rhs.items.contains(item));
        self
    }
}

impl<T: Eq + Hash> Mul for Set<T> {
    type Output = Set<T>;

    fn mul(mut self, rhs: Set<T>) -> Set<T> {
        self.items.retain(|item| rhs.items.contains(item));
        self
    }
}

impl<T: Eq + Hash> PartialEq for Set<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq + Hash> Eq for Set<T> {}

/// Sets are partially ordered by inclusion.
impl<T: Eq + Hash> PartialOrd for Set<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.is_subset(other), self.is_superset(other)) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (false, false) => None,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Set<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.items.iter()).finish()
    }
}

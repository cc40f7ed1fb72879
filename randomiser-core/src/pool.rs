use std::collections::BTreeMap;

use crate::species::{SpeciesId, SpeciesTable, Type};
use crate::species_set::SpeciesSet;

/// Allowed species for one randomisation pass and the scarcity-tracking
/// "remaining" subset drawn down as replacements are handed out.
#[derive(Clone, Debug)]
pub struct SpeciesPool {
    allowed: SpeciesSet,
    /// Only built when some form of type theming is active.
    allowed_by_type: Option<BTreeMap<Type, SpeciesSet>>,
    remaining: SpeciesSet,
    remaining_by_type: BTreeMap<Type, SpeciesSet>,
    types: Vec<Type>,
    refills: usize,
}

impl SpeciesPool {
    pub fn new(table: &SpeciesTable, allowed: SpeciesSet, by_type: bool) -> Self {
        let types = table.types_in_use();
        let allowed_by_type = by_type.then(|| allowed.sort_by_type(table, &types));
        let mut pool = Self {
            remaining: allowed.clone(),
            allowed,
            allowed_by_type,
            remaining_by_type: BTreeMap::new(),
            types,
            refills: 0,
        };
        pool.reset_remaining();
        pool
    }

    fn reset_remaining(&mut self) {
        self.remaining = self.allowed.clone();
        self.remaining_by_type = self.allowed_by_type.clone().unwrap_or_default();
    }

    /// Puts every allowed species back into the remaining pool.
    pub fn refill(&mut self) {
        self.reset_remaining();
        self.refills += 1;
    }

    /// Starts a fresh cycle between regions; not counted as a refill.
    pub fn reset(&mut self) {
        self.reset_remaining();
    }

    pub fn refills(&self) -> usize {
        self.refills
    }

    pub fn types(&self) -> &[Type] {
        &self.types
    }

    pub fn allowed(&self) -> &SpeciesSet {
        &self.allowed
    }

    pub fn remaining(&self) -> &SpeciesSet {
        &self.remaining
    }

    /// Allowed species of type `t`, or all allowed species for `None`.
    pub fn allowed_of(&self, t: Option<Type>) -> SpeciesSet {
        match (t, &self.allowed_by_type) {
            (Some(t), Some(by_type)) => by_type.get(&t).cloned().unwrap_or_default(),
            _ => self.allowed.clone(),
        }
    }

    /// Remaining species of type `t`, or all remaining species for `None`.
    pub fn remaining_of(&self, t: Option<Type>) -> SpeciesSet {
        match (t, &self.allowed_by_type) {
            (Some(t), Some(_)) => self.remaining_by_type.get(&t).cloned().unwrap_or_default(),
            _ => self.remaining.clone(),
        }
    }

    pub fn has_remaining_of(&self, t: Type) -> bool {
        self.remaining_by_type.get(&t).is_some_and(|s| !s.is_empty())
    }

    /// Marks `id` as used. Refills straight away if that emptied the pool,
    /// so callers never see an empty remaining set.
    pub fn take(&mut self, table: &SpeciesTable, id: SpeciesId) {
        self.remaining.remove(id);
        if let Some(sp) = table.get(id) {
            for t in sp.types() {
                if let Some(bucket) = self.remaining_by_type.get_mut(&t) {
                    bucket.remove(id);
                }
            }
        }
        if self.remaining.is_empty() {
            self.refill();
        }
    }
}

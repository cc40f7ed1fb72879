//! Ordered species sets and the pure queries the allocator runs over them.
//!
//! Sets are ordered by id so iteration, and therefore every random draw made
//! from a set, is reproducible for a given seed.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::species::{SpeciesId, SpeciesTable, Type};

// Similar-strength window: start at +/-10% of the target, widen by 5% until
// there are enough candidates.
const SIMILAR_STRENGTH_MIN_CANDIDATES: usize = 3;
const SIMILAR_STRENGTH_MAX_EXPANSIONS: usize = 3;

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeciesSet(BTreeSet<SpeciesId>);

impl SpeciesSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: SpeciesId) -> bool {
        self.0.contains(&id)
    }

    pub fn insert(&mut self, id: SpeciesId) -> bool {
        self.0.insert(id)
    }

    pub fn remove(&mut self, id: SpeciesId) -> bool {
        self.0.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = SpeciesId> + '_ {
        self.0.iter().copied()
    }

    pub fn first(&self) -> Option<SpeciesId> {
        self.0.first().copied()
    }

    pub fn extend_from(&mut self, other: &SpeciesSet) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn remove_all(&mut self, other: &SpeciesSet) {
        if other.is_empty() {
            return;
        }
        self.0.retain(|id| !other.0.contains(id));
    }

    pub fn retain_all(&mut self, other: &SpeciesSet) {
        self.0.retain(|id| other.0.contains(id));
    }

    pub fn union(&self, other: &SpeciesSet) -> SpeciesSet {
        Self(self.0.union(&other.0).copied().collect())
    }

    pub fn difference(&self, other: &SpeciesSet) -> SpeciesSet {
        Self(self.0.difference(&other.0).copied().collect())
    }

    pub fn intersection(&self, other: &SpeciesSet) -> SpeciesSet {
        Self(self.0.intersection(&other.0).copied().collect())
    }

    pub fn contains_any(&self, other: &SpeciesSet) -> bool {
        !self.0.is_disjoint(&other.0)
    }

    pub fn filter(&self, pred: impl Fn(SpeciesId) -> bool) -> SpeciesSet {
        Self(self.0.iter().copied().filter(|&id| pred(id)).collect())
    }

    /// Partitions the set by type. Dual-typed species land in both buckets;
    /// every type in `types` gets an entry, possibly empty.
    pub fn sort_by_type(&self, table: &SpeciesTable, types: &[Type]) -> BTreeMap<Type, SpeciesSet> {
        let mut by_type: BTreeMap<Type, SpeciesSet> =
            types.iter().map(|&t| (t, SpeciesSet::new())).collect();
        for id in self.iter() {
            if let Some(sp) = table.get(id) {
                for t in sp.types() {
                    if let Some(bucket) = by_type.get_mut(&t) {
                        bucket.insert(id);
                    }
                }
            }
        }
        by_type
    }

    /// Types carried by every member of the set.
    pub fn shared_types(&self, table: &SpeciesTable) -> BTreeSet<Type> {
        let mut members = self.iter().filter_map(|id| table.get(id));
        let Some(first) = members.next() else {
            return BTreeSet::new();
        };
        let mut shared: BTreeSet<Type> = first.types().collect();
        for sp in members {
            shared.retain(|&t| sp.has_type(t));
            if shared.is_empty() {
                break;
            }
        }
        shared
    }

    /// A single type shared by every member, if any. With two candidates the
    /// lowest id's primary type wins, then anything that is not `Normal`.
    pub fn shared_type(&self, table: &SpeciesTable) -> Option<Type> {
        let preferred = self.first().and_then(|id| table.primary_type(id));
        pick_preferred_type(&self.shared_types(table), preferred)
    }

    /// Members from `id`'s evolutionary family.
    pub fn filter_family(&self, table: &SpeciesTable, id: SpeciesId) -> SpeciesSet {
        self.intersection(&table.family(id))
    }

    /// Members with at least `before` stages behind and `after` stages ahead.
    pub fn filter_has_evo_stages(
        &self,
        table: &SpeciesTable,
        before: usize,
        after: usize,
    ) -> SpeciesSet {
        self.filter(|id| table.stages_before(id) >= before && table.stages_after(id) >= after)
    }

    /// Furthest ancestor of `id` present in this set, as a stage count.
    pub fn evo_stages_before(&self, table: &SpeciesTable, id: SpeciesId) -> usize {
        self.members_at_distance(table, id, -1)
    }

    /// Furthest descendant of `id` present in this set, as a stage count.
    pub fn evo_stages_after(&self, table: &SpeciesTable, id: SpeciesId) -> usize {
        self.members_at_distance(table, id, 1)
    }

    fn members_at_distance(&self, table: &SpeciesTable, id: SpeciesId, sign: i32) -> usize {
        (1..=table.stages_before(id).max(table.stages_after(id)))
            .filter(|&k| {
                table
                    .relatives_same_branch(id, sign * k as i32)
                    .contains_any(self)
            })
            .max()
            .unwrap_or(0)
    }

    pub fn random_species<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<SpeciesId> {
        if self.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..self.len());
        self.0.iter().nth(idx).copied()
    }

    /// Uniform pick among members whose base stat total is close to `target`.
    pub fn random_similar_strength<R: Rng + ?Sized>(
        &self,
        table: &SpeciesTable,
        target: u32,
        rng: &mut R,
    ) -> Option<SpeciesId> {
        if self.is_empty() {
            return None;
        }
        let step = (target / 20).max(1);
        let mut min = target.saturating_sub(target / 10);
        let mut max = target.saturating_add(target / 10);
        let mut expansions = 0;
        let mut can_pick = SpeciesSet::new();
        while can_pick.is_empty()
            || (can_pick.len() < SIMILAR_STRENGTH_MIN_CANDIDATES
                && expansions < SIMILAR_STRENGTH_MAX_EXPANSIONS)
        {
            for id in self.iter() {
                let bst = table.bst(id);
                if bst >= min && bst <= max {
                    can_pick.insert(id);
                }
            }
            min = min.saturating_sub(step);
            max = max.saturating_add(step);
            expansions += 1;
        }
        can_pick.random_species(rng)
    }
}

/// Picks among candidate themes: `preferred` if present, otherwise the first
/// non-`Normal` type, otherwise whatever is left.
pub(crate) fn pick_preferred_type(types: &BTreeSet<Type>, preferred: Option<Type>) -> Option<Type> {
    if let Some(p) = preferred.filter(|p| types.contains(p)) {
        return Some(p);
    }
    types
        .iter()
        .copied()
        .find(|&t| t != Type::Normal)
        .or_else(|| types.first().copied())
}

impl FromIterator<SpeciesId> for SpeciesSet {
    fn from_iter<I: IntoIterator<Item = SpeciesId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<SpeciesId> for SpeciesSet {
    fn extend<I: IntoIterator<Item = SpeciesId>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<'a> IntoIterator for &'a SpeciesSet {
    type Item = SpeciesId;
    type IntoIter = std::iter::Copied<std::collections::btree_set::Iter<'a, SpeciesId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn set(ids: &[SpeciesId]) -> SpeciesSet {
        ids.iter().copied().collect()
    }

    #[test]
    fn set_algebra() {
        let a = set(&[PIDGEY, PIDGEOTTO, EEVEE]);
        let b = set(&[EEVEE, JOLTEON]);
        assert_eq!(a.union(&b).len(), 4);
        assert_eq!(a.difference(&b), set(&[PIDGEY, PIDGEOTTO]));
        assert_eq!(a.intersection(&b), set(&[EEVEE]));
        assert!(a.contains_any(&b));
    }

    #[test]
    fn sort_by_type_puts_dual_types_in_both() {
        let table = eevee_and_pidgey();
        let all: SpeciesSet = table.iter().map(|sp| sp.id).collect();
        let by_type = all.sort_by_type(&table, &table.types_in_use());
        assert!(by_type[&Type::Normal].contains(PIDGEY));
        assert!(by_type[&Type::Flying].contains(PIDGEY));
        assert!(by_type[&Type::Water].contains(VAPOREON));
        assert!(!by_type[&Type::Water].contains(JOLTEON));
    }

    #[test]
    fn shared_type_prefers_non_normal() {
        let table = eevee_and_pidgey();
        let birds = set(&[PIDGEY, PIDGEOTTO]);
        assert_eq!(
            birds.shared_types(&table),
            BTreeSet::from([Type::Normal, Type::Flying])
        );
        // Pidgey's primary is Normal, so the primary preference wins.
        assert_eq!(birds.shared_type(&table), Some(Type::Normal));
        assert_eq!(
            pick_preferred_type(&BTreeSet::from([Type::Normal, Type::Flying]), None),
            Some(Type::Flying)
        );
        assert_eq!(set(&[PIDGEY, VAPOREON]).shared_type(&table), None);
    }

    #[test]
    fn evo_stages_within_the_set() {
        let table = eevee_and_pidgey();
        let skip_chain = set(&[PIDGEY, PIDGEOT]);
        assert_eq!(skip_chain.evo_stages_after(&table, PIDGEY), 2);
        assert_eq!(skip_chain.evo_stages_before(&table, PIDGEOT), 2);
        assert_eq!(skip_chain.evo_stages_before(&table, PIDGEY), 0);
    }

    #[test]
    fn filter_has_evo_stages_is_at_least() {
        let table = eevee_and_pidgey();
        let all: SpeciesSet = table.iter().map(|sp| sp.id).collect();
        let mids = all.filter_has_evo_stages(&table, 1, 1);
        assert_eq!(mids, set(&[PIDGEOTTO]));
    }

    #[test]
    fn queries_do_not_mutate() {
        let table = eevee_and_pidgey();
        let all: SpeciesSet = table.iter().map(|sp| sp.id).collect();
        let first = all.filter_has_evo_stages(&table, 0, 1);
        let second = all.filter_has_evo_stages(&table, 0, 1);
        assert_eq!(first, second);
        assert_eq!(all.shared_types(&table), all.shared_types(&table));
        assert_eq!(all.len(), table.len());
    }

    #[test]
    fn similar_strength_stays_near_target() {
        let table = eevee_and_pidgey();
        let all: SpeciesSet = table.iter().map(|sp| sp.id).collect();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..32 {
            let pick = all.random_similar_strength(&table, 251, &mut rng).unwrap();
            let bst = table.bst(pick);
            assert!((200..=330).contains(&bst), "bst {bst} too far from 251");
        }
    }

    #[test]
    fn similar_strength_widens_when_nothing_is_close() {
        let table = eevee_and_pidgey();
        let strong = set(&[PIDGEOT]);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(strong.random_similar_strength(&table, 200, &mut rng), Some(PIDGEOT));
    }
}

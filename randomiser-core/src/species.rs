//! Read-only species graph queried by the encounter engine.
//!
//! Evolution is stored as plain id edges on each [`Species`]; everything
//! derived from them (stages, families, relatives at an offset) is computed on
//! demand by [`SpeciesTable`] so no run-scoped data ever lives on a species.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use crate::species_set::SpeciesSet;

// Evolution data can be hand-edited; cap walks so a bad cycle cannot hang.
const MAX_EVOLUTION_DEPTH: usize = 8;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Type {
    Normal,
    Fighting,
    Flying,
    Poison,
    Ground,
    Rock,
    Bug,
    Ghost,
    Steel,
    Fire,
    Water,
    Grass,
    Electric,
    Psychic,
    Ice,
    Dragon,
    Dark,
    Fairy,
}

impl Type {
    pub const ALL: [Type; 18] = [
        Type::Normal,
        Type::Fighting,
        Type::Flying,
        Type::Poison,
        Type::Ground,
        Type::Rock,
        Type::Bug,
        Type::Ghost,
        Type::Steel,
        Type::Fire,
        Type::Water,
        Type::Grass,
        Type::Electric,
        Type::Psychic,
        Type::Ice,
        Type::Dragon,
        Type::Dark,
        Type::Fairy,
    ];
}

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SpeciesId(pub u16);

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Species {
    pub id: SpeciesId,
    pub name: String,
    pub primary_type: Type,
    #[serde(default)]
    pub secondary_type: Option<Type>,
    /// Base stat total used for power-level comparisons.
    pub bst: u32,
    #[serde(default)]
    pub legendary: bool,
    /// Species this one evolves into.
    #[serde(default)]
    pub evolves_into: Vec<SpeciesId>,
    /// Species that evolve into this one.
    #[serde(default)]
    pub evolves_from: Vec<SpeciesId>,
    /// Set on alternate formes; points at the base forme.
    #[serde(default)]
    pub base_forme: Option<SpeciesId>,
    #[serde(default)]
    pub forme_number: u8,
    #[serde(default)]
    pub cosmetic_formes: u8,
    /// Real forme numbers for cosmetic variants when they are not simply
    /// `0..cosmetic_formes`.
    #[serde(default)]
    pub cosmetic_forme_numbers: Vec<u8>,
}

impl Species {
    pub fn has_type(&self, t: Type) -> bool {
        self.primary_type == t || self.secondary_type == Some(t)
    }

    pub fn types(&self) -> impl Iterator<Item = Type> + '_ {
        std::iter::once(self.primary_type).chain(self.secondary_type)
    }

    pub fn is_base_forme(&self) -> bool {
        self.base_forme.is_none()
    }

    pub fn is_alt_forme(&self) -> bool {
        self.base_forme.is_some() && self.forme_number > 0
    }

    pub fn cosmetic_forme_number(&self, index: u8) -> u8 {
        self.cosmetic_forme_numbers
            .get(index as usize)
            .copied()
            .unwrap_or(index)
    }
}

/// How one species stands relative to another in the same family.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Relation {
    /// Stage difference: positive means later in the line.
    pub offset: i32,
    /// True when one is an ancestor of the other (or they are the same).
    pub same_branch: bool,
}

#[derive(Clone, Debug, Default)]
pub struct SpeciesTable {
    species: BTreeMap<SpeciesId, Species>,
}

impl SpeciesTable {
    pub fn new(species: impl IntoIterator<Item = Species>) -> Self {
        Self {
            species: species.into_iter().map(|s| (s.id, s)).collect(),
        }
    }

    pub fn get(&self, id: SpeciesId) -> Option<&Species> {
        self.species.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Species> {
        self.species.values()
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn name(&self, id: SpeciesId) -> String {
        match self.get(id) {
            Some(sp) => sp.name.clone(),
            None => id.to_string(),
        }
    }

    pub fn primary_type(&self, id: SpeciesId) -> Option<Type> {
        self.get(id).map(|sp| sp.primary_type)
    }

    pub fn has_type(&self, id: SpeciesId, t: Type) -> bool {
        self.get(id).is_some_and(|sp| sp.has_type(t))
    }

    pub fn bst(&self, id: SpeciesId) -> u32 {
        self.get(id).map_or(0, |sp| sp.bst)
    }

    /// Types carried by at least one species in the table, in canonical order.
    pub fn types_in_use(&self) -> Vec<Type> {
        let used: BTreeSet<Type> = self.iter().flat_map(|sp| sp.types()).collect();
        Type::ALL.into_iter().filter(|t| used.contains(t)).collect()
    }

    /// Base forme of `id`, or `id` itself if it already is one.
    pub fn base_forme_of(&self, id: SpeciesId) -> SpeciesId {
        match self.get(id) {
            Some(sp) if sp.is_alt_forme() => sp.base_forme.unwrap_or(id),
            _ => id,
        }
    }

    fn parents(&self, id: SpeciesId) -> &[SpeciesId] {
        self.get(id).map_or(&[], |sp| sp.evolves_from.as_slice())
    }

    fn children(&self, id: SpeciesId) -> &[SpeciesId] {
        self.get(id).map_or(&[], |sp| sp.evolves_into.as_slice())
    }

    /// Longest chain of ancestors behind `id`.
    pub fn stages_before(&self, id: SpeciesId) -> usize {
        self.longest_walk(id, false, 0)
    }

    /// Longest chain of descendants ahead of `id`.
    pub fn stages_after(&self, id: SpeciesId) -> usize {
        self.longest_walk(id, true, 0)
    }

    fn longest_walk(&self, id: SpeciesId, forward: bool, depth: usize) -> usize {
        if depth >= MAX_EVOLUTION_DEPTH {
            return 0;
        }
        let next = if forward { self.children(id) } else { self.parents(id) };
        next.iter()
            .map(|&n| 1 + self.longest_walk(n, forward, depth + 1))
            .max()
            .unwrap_or(0)
    }

    /// Every species connected to `id` through evolution, `id` included.
    pub fn family(&self, id: SpeciesId) -> SpeciesSet {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([id]);
        while let Some(cur) = queue.pop_front() {
            if !seen.insert(cur) {
                continue;
            }
            for &n in self.parents(cur).iter().chain(self.children(cur)) {
                if !seen.contains(&n) {
                    queue.push_back(n);
                }
            }
        }
        SpeciesSet::from_iter(seen)
    }

    /// Descendants (positive) or ancestors (negative) exactly `offset` steps
    /// away along a single line. Offset zero is the species itself.
    pub fn relatives_same_branch(&self, id: SpeciesId, offset: i32) -> SpeciesSet {
        let steps = offset.unsigned_abs() as usize;
        let mut frontier: BTreeSet<SpeciesId> = BTreeSet::from([id]);
        for _ in 0..steps.min(MAX_EVOLUTION_DEPTH) {
            frontier = frontier
                .iter()
                .flat_map(|&s| {
                    if offset > 0 {
                        self.children(s).iter().copied()
                    } else {
                        self.parents(s).iter().copied()
                    }
                })
                .collect();
        }
        if steps > MAX_EVOLUTION_DEPTH {
            frontier.clear();
        }
        SpeciesSet::from_iter(frontier)
    }

    /// Family members whose stage differs from `id`'s by exactly `offset`,
    /// regardless of branch.
    pub fn relatives_at_offset(&self, id: SpeciesId, offset: i32) -> SpeciesSet {
        let stage = self.stages_before(id) as i32;
        self.family(id)
            .filter(|r| self.stages_before(r) as i32 - stage == offset)
    }

    /// True when `other` is `id`, an ancestor of it, or a descendant of it.
    pub fn on_same_branch(&self, id: SpeciesId, other: SpeciesId) -> bool {
        if id == other {
            return true;
        }
        (1..=MAX_EVOLUTION_DEPTH as i32).any(|k| {
            self.relatives_same_branch(id, k).contains(other)
                || self.relatives_same_branch(id, -k).contains(other)
        })
    }

    /// Where `to` sits relative to `from`; `None` when they are unrelated.
    pub fn relation(&self, from: SpeciesId, to: SpeciesId) -> Option<Relation> {
        if !self.family(from).contains(to) {
            return None;
        }
        Some(Relation {
            offset: self.stages_before(to) as i32 - self.stages_before(from) as i32,
            same_branch: self.on_same_branch(from, to),
        })
    }

    /// Relatives of `id` that stand to it the way `relation` describes.
    ///
    /// Off-branch relations (siblings, cousins) only match relatives that
    /// really are off `id`'s branch, so `id` never matches itself.
    pub fn relatives_matching(&self, id: SpeciesId, relation: Relation) -> SpeciesSet {
        if relation.same_branch {
            return self.relatives_same_branch(id, relation.offset);
        }
        self.relatives_at_offset(id, relation.offset)
            .filter(|r| !self.on_same_branch(id, r))
    }
}

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::species::SpeciesId;
use crate::species_set::SpeciesSet;

pub const MAX_LEVEL: u8 = 100;

/// Location tag the data collaborator uses for areas the game never loads.
pub const UNUSED_LOCATION_TAG: &str = "UNUSED";

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EncounterType {
    #[default]
    Walking,
    Surfing,
    Fishing,
    /// Rock smash, headbutt and the like.
    Interact,
    Ambush,
    Special,
    Unused,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub species: SpeciesId,
    pub level: u8,
    #[serde(default)]
    pub max_level: u8,
    #[serde(default)]
    pub forme_number: u8,
}

impl Encounter {
    pub fn new(species: SpeciesId, level: u8, max_level: u8) -> Self {
        Self {
            species,
            level,
            max_level,
            forme_number: 0,
        }
    }

    fn effective_max_level(&self) -> u8 {
        self.max_level.max(self.level)
    }

    pub fn average_level(&self) -> u8 {
        ((self.level as u16 + self.effective_max_level() as u16) / 2) as u8
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EncounterArea {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub location_tag: String,
    #[serde(default)]
    pub map_index: i32,
    #[serde(default)]
    pub encounter_type: EncounterType,
    /// Areas the game indexes by species need at least two distinct species.
    #[serde(default)]
    pub force_multiple_species: bool,
    /// Species that must never be placed here.
    #[serde(default)]
    pub banned_species: SpeciesSet,
    #[serde(default)]
    pub encounters: Vec<Encounter>,
}

impl EncounterArea {
    pub fn is_unused(&self) -> bool {
        self.encounter_type == EncounterType::Unused || self.location_tag == UNUSED_LOCATION_TAG
    }

    pub fn species_in_area(&self) -> SpeciesSet {
        self.encounters.iter().map(|e| e.species).collect()
    }

    pub fn distinct_species(&self) -> usize {
        self.species_in_area().len()
    }
}

impl fmt::Display for EncounterArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.display_name.is_empty() {
            write!(f, "map {} ({:?})", self.map_index, self.encounter_type)
        } else {
            write!(f, "{} ({:?})", self.display_name, self.encounter_type)
        }
    }
}

/// Stable partition of `indices` by `key`, groups in order of first appearance.
pub(crate) fn group_by<K, F>(areas: &[EncounterArea], indices: &[usize], key: F) -> Vec<Vec<usize>>
where
    K: Eq + Hash,
    F: Fn(&EncounterArea) -> K,
{
    let mut slot_of: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for &idx in indices {
        let k = key(&areas[idx]);
        let slot = *slot_of.entry(k).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(idx);
    }
    groups
}

pub(crate) fn group_by_map_index(areas: &[EncounterArea], indices: &[usize]) -> Vec<Vec<usize>> {
    group_by(areas, indices, |a| a.map_index)
}

pub(crate) fn group_by_location(areas: &[EncounterArea], indices: &[usize]) -> Vec<Vec<usize>> {
    group_by(areas, indices, |a| a.location_tag.clone())
}

pub(crate) fn group_by_encounter_type(areas: &[EncounterArea], indices: &[usize]) -> Vec<Vec<usize>> {
    group_by(areas, indices, |a| a.encounter_type)
}

fn scale_level(level: u8, modifier: i32) -> u8 {
    let scaled = (level as f64 * (1.0 + modifier as f64 / 100.0)).round();
    scaled.clamp(0.0, MAX_LEVEL as f64) as u8
}

/// Rescales every slot's level range by `modifier` percent, capped at 100.
pub fn apply_level_modifier(areas: &mut [EncounterArea], modifier: i32) {
    if modifier == 0 {
        return;
    }
    for area in areas.iter_mut() {
        for enc in area.encounters.iter_mut() {
            enc.level = scale_level(enc.level, modifier);
            enc.max_level = scale_level(enc.max_level, modifier);
        }
    }
}

//! Per-species facts gathered from the areas of one region before any slot
//! is touched: which themes those areas vote for, which species may not
//! replace it, which relatives share the region, and how low it appears.

use std::collections::BTreeMap;

use crate::encounter::{EncounterArea, MAX_LEVEL};
use crate::species::{SpeciesId, SpeciesTable, Type};
use crate::species_set::SpeciesSet;
use crate::{RandomiserError, Result};

#[derive(Clone, Debug)]
pub(crate) struct SpeciesAreaInfo {
    pub species: SpeciesId,
    primary: Option<Type>,
    themes: BTreeMap<Type, usize>,
    pub banned_for_replacement: SpeciesSet,
    /// Relatives present in the region, the species itself included.
    pub family: SpeciesSet,
    pub lowest_level: u8,
}

impl SpeciesAreaInfo {
    fn new(table: &SpeciesTable, species: SpeciesId) -> Self {
        Self {
            species,
            primary: table.primary_type(species),
            themes: BTreeMap::new(),
            banned_for_replacement: SpeciesSet::new(),
            family: SpeciesSet::from_iter([species]),
            lowest_level: MAX_LEVEL,
        }
    }

    /// Adds `weight` votes for `theme`; `None` is no vote.
    pub fn add_theme(&mut self, theme: Option<Type>, weight: usize) {
        if let Some(t) = theme {
            *self.themes.entry(t).or_insert(0) += weight.max(1);
        }
    }

    /// The most-voted theme; ties go to the species' own primary type.
    /// With no votes at all, falls back to the primary type only if asked.
    pub fn theme(&self, default_to_primary: bool) -> Option<Type> {
        let Some(&best) = self.themes.values().max() else {
            return if default_to_primary { self.primary } else { None };
        };
        let tied: Vec<Type> = self
            .themes
            .iter()
            .filter(|(_, votes)| **votes == best)
            .map(|(&t, _)| t)
            .collect();
        match self.primary {
            Some(p) if tied.contains(&p) => Some(p),
            _ => tied.first().copied(),
        }
    }

    pub fn set_level_if_lower(&mut self, level: u8) {
        self.lowest_level = self.lowest_level.min(level);
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct AreaInfoOptions {
    pub keep_type_themes: bool,
    pub keep_evolutions: bool,
    pub record_levels: bool,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct AreaInfoMap {
    infos: BTreeMap<SpeciesId, SpeciesAreaInfo>,
}

impl AreaInfoMap {
    /// Scans `region` (indices into `areas`) once, before randomisation.
    pub fn build(
        table: &SpeciesTable,
        areas: &[EncounterArea],
        region: &[usize],
        options: AreaInfoOptions,
    ) -> Self {
        let mut infos: BTreeMap<SpeciesId, SpeciesAreaInfo> = BTreeMap::new();
        for &idx in region {
            let area = &areas[idx];
            let in_area = area.species_in_area();
            let area_theme = if options.keep_type_themes {
                in_area.shared_type(table)
            } else {
                None
            };
            for species in in_area.iter() {
                let info = infos
                    .entry(species)
                    .or_insert_with(|| SpeciesAreaInfo::new(table, species));
                info.add_theme(area_theme, in_area.len());
                info.banned_for_replacement.extend_from(&area.banned_species);
            }
            if options.record_levels {
                for enc in &area.encounters {
                    if let Some(info) = infos.get_mut(&enc.species) {
                        info.set_level_if_lower(enc.average_level());
                    }
                }
            }
        }

        if options.keep_evolutions {
            let present: SpeciesSet = infos.keys().copied().collect();
            for info in infos.values_mut() {
                info.family = present.filter_family(table, info.species);
            }
        }
        Self { infos }
    }

    pub fn get(&self, species: SpeciesId) -> Result<&SpeciesAreaInfo> {
        self.infos.get(&species).ok_or_else(|| {
            RandomiserError::Invariant(format!("no area information recorded for species {species}"))
        })
    }

    /// Pools theme votes across each family so relatives end up themed as
    /// one. An area holding two relatives counts twice; that is accepted.
    pub fn spread_themes_through_families(&mut self) -> Result<()> {
        let mut done = SpeciesSet::new();
        let species: Vec<SpeciesId> = self.infos.keys().copied().collect();
        for id in species {
            if done.contains(id) {
                continue;
            }
            let family = self.get(id)?.family.clone();
            done.extend_from(&family);

            let mut pooled: BTreeMap<Type, usize> = BTreeMap::new();
            for relative in family.iter() {
                for (&t, &votes) in &self.get(relative)?.themes {
                    *pooled.entry(t).or_insert(0) += votes;
                }
            }
            for relative in family.iter() {
                let info = self.infos.get_mut(&relative).ok_or_else(|| {
                    RandomiserError::Invariant(format!(
                        "family member {relative} has no area information"
                    ))
                })?;
                info.themes = pooled.clone();
            }
        }
        Ok(())
    }

    /// Each distinct family in the region once, in the order its first
    /// member appears in the region's slots.
    pub fn families_in_order(&self, areas: &[EncounterArea], region: &[usize]) -> Result<Vec<SpeciesSet>> {
        let mut seen = SpeciesSet::new();
        let mut families = Vec::new();
        for &idx in region {
            for enc in &areas[idx].encounters {
                if seen.contains(enc.species) {
                    continue;
                }
                let family = self.get(enc.species)?.family.clone();
                seen.extend_from(&family);
                families.push(family);
            }
        }
        Ok(families)
    }
}

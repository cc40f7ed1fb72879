//! Allocation for the platform whose per-map species lookup (the in-game
//! "DexNav" search) crashes once a map lists too many species.
//!
//! The load formula and the threshold are a heuristic taken from observed
//! crashes. They have not been verified against real hardware.

use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

use crate::allocator::EncounterAllocator;
use crate::encounter::{group_by_encounter_type, group_by_map_index, EncounterArea, EncounterType};
use crate::species::{SpeciesId, SpeciesTable, Type};
use crate::species_set::SpeciesSet;
use crate::Result;

/// Highest map load the lookup survives.
pub const CRASH_THRESHOLD: usize = 18;

fn is_interact(area: &EncounterArea) -> bool {
    area.encounter_type == EncounterType::Interact
}

fn base_formes_in(table: &SpeciesTable, areas: &[EncounterArea], group: &[usize]) -> SpeciesSet {
    group
        .iter()
        .flat_map(|&i| areas[i].encounters.iter())
        .map(|enc| table.base_forme_of(enc.species))
        .collect()
}

/// Load of one map: the areas of `map` merged by encounter type, each
/// contributing its count of distinct base formes. `Interact` areas do not
/// count.
pub fn map_load(table: &SpeciesTable, areas: &[EncounterArea], map: &[usize]) -> usize {
    group_by_encounter_type(areas, map)
        .iter()
        .filter(|group| group.first().is_some_and(|&i| !is_interact(&areas[i])))
        .map(|group| base_formes_in(table, areas, group).len())
        .sum()
}

/// Load the map would have if every slot held a different species.
fn load_ceiling(areas: &[EncounterArea], map: &[usize]) -> usize {
    map.iter()
        .filter(|&&i| !is_interact(&areas[i]))
        .map(|&i| areas[i].encounters.len())
        .sum()
}

impl<'a> EncounterAllocator<'a> {
    pub(crate) fn randomize_avoiding_crashes<R: Rng + ?Sized>(
        &mut self,
        areas: &mut [EncounterArea],
        prepared: &[usize],
        rng: &mut R,
    ) -> Result<()> {
        let mut maps = group_by_map_index(areas, prepared);
        maps.shuffle(rng);

        let interact: Vec<usize> = maps
            .iter()
            .flatten()
            .copied()
            .filter(|&i| is_interact(&areas[i]))
            .collect();
        for idx in interact {
            self.randomize_region(areas, &[idx], rng)?;
        }

        for map in &maps {
            let rest: Vec<usize> = map.iter().copied().filter(|&i| !is_interact(&areas[i])).collect();
            if rest.is_empty() {
                continue;
            }
            if load_ceiling(areas, &rest) <= CRASH_THRESHOLD {
                for &idx in &rest {
                    self.randomize_region(areas, &[idx], rng)?;
                }
            } else {
                self.randomize_crowded_map(areas, &rest, rng)?;
            }
        }
        Ok(())
    }

    /// A map that could exceed the threshold: a bounded one-to-one pass per
    /// map-area, then independent picks for duplicated slots while the load
    /// stays under the threshold.
    fn randomize_crowded_map<R: Rng + ?Sized>(
        &mut self,
        areas: &mut [EncounterArea],
        map: &[usize],
        rng: &mut R,
    ) -> Result<()> {
        let before = map_load(self.table, areas, map);
        let originals: BTreeMap<(usize, usize), SpeciesId> = map
            .iter()
            .flat_map(|&i| {
                areas[i]
                    .encounters
                    .iter()
                    .enumerate()
                    .map(move |(slot, enc)| ((i, slot), enc.species))
            })
            .collect();
        self.build_area_info(areas, map)?;

        let groups = group_by_encounter_type(areas, map);
        if groups.len() > CRASH_THRESHOLD {
            warn!(
                "map {} has {} encounter kinds; its load cannot be held under {}",
                areas[map[0]].map_index,
                groups.len(),
                CRASH_THRESHOLD
            );
        }

        let mut themes: Vec<Option<Type>> = Vec::with_capacity(groups.len());
        let mut committed = 0;
        for (g, group) in groups.iter().enumerate() {
            self.region_type = self.pick_region_theme(areas, group, rng)?;
            themes.push(self.region_type);
            let groups_left = groups.len() - g - 1;
            let budget = CRASH_THRESHOLD.saturating_sub(committed + groups_left).max(1);
            committed += self.randomize_bounded_map_area(areas, group, budget, rng)?;
        }

        let mut slots: Vec<(usize, usize, usize)> = groups
            .iter()
            .enumerate()
            .flat_map(|(g, group)| {
                group
                    .iter()
                    .flat_map(|&i| (0..areas[i].encounters.len()).map(move |slot| (g, i, slot)))
                    .collect::<Vec<_>>()
            })
            .collect();
        slots.shuffle(rng);

        let mut diversified = 0;
        for (g, idx, slot) in slots {
            let current = areas[idx].encounters[slot].species;
            let Some(&original) = originals.get(&(idx, slot)) else {
                continue;
            };
            if self.is_passthrough(original) {
                continue;
            }
            let duplicated = groups[g].iter().any(|&j| {
                areas[j]
                    .encounters
                    .iter()
                    .enumerate()
                    .any(|(s, enc)| (j, s) != (idx, slot) && enc.species == current)
            });
            if !duplicated {
                continue;
            }
            if map_load(self.table, areas, map) + 1 > CRASH_THRESHOLD {
                break;
            }
            self.region_type = themes[g];
            let place = format!("slot {slot} of {}", areas[idx].display_name);
            let candidates = self.candidates(original)?;
            let replacement = self
                .pick_from(&candidates, original, rng)
                .ok_or_else(|| self.exhausted(original, &place))?;
            self.record(original, replacement);
            self.apply_replacement(&mut areas[idx].encounters[slot], replacement, rng);
            diversified += 1;
        }

        for &idx in map {
            if map_load(self.table, areas, map) < CRASH_THRESHOLD {
                self.enforce_multiple_species(&mut areas[idx], rng);
            }
        }
        debug!(
            "crowded map {}: load {} -> {} ({} slots diversified)",
            areas[map[0]].map_index,
            before,
            map_load(self.table, areas, map),
            diversified
        );
        self.report.regions += 1;
        self.report.areas += map.len();
        Ok(())
    }

    /// One-to-one replacement within a single map-area that hands out at most
    /// `budget` distinct species. Once the budget is spent, new originals
    /// reuse a replacement already handed out here. Returns the species used.
    fn randomize_bounded_map_area<R: Rng + ?Sized>(
        &mut self,
        areas: &mut [EncounterArea],
        group: &[usize],
        budget: usize,
        rng: &mut R,
    ) -> Result<usize> {
        let mut used: SpeciesSet = group
            .iter()
            .flat_map(|&i| areas[i].encounters.iter())
            .map(|enc| enc.species)
            .filter(|&s| self.is_passthrough(s))
            .map(|s| self.table.base_forme_of(s))
            .collect();
        let mut translation: BTreeMap<SpeciesId, SpeciesId> = BTreeMap::new();

        for &idx in group {
            for slot in 0..areas[idx].encounters.len() {
                let current = areas[idx].encounters[slot].species;
                if self.is_passthrough(current) {
                    continue;
                }
                let replacement = match translation.get(&current) {
                    Some(&r) => r,
                    None => {
                        let place = format!("slot {slot} of {}", areas[idx].display_name);
                        let r = self.bounded_pick(current, &place, &translation, used.len() < budget, rng)?;
                        self.record(current, r);
                        translation.insert(current, r);
                        used.insert(self.table.base_forme_of(r));
                        r
                    }
                };
                self.apply_replacement(&mut areas[idx].encounters[slot], replacement, rng);
            }
        }
        Ok(used.len())
    }

    fn bounded_pick<R: Rng + ?Sized>(
        &self,
        current: SpeciesId,
        place: &str,
        translation: &BTreeMap<SpeciesId, SpeciesId>,
        may_add: bool,
        rng: &mut R,
    ) -> Result<SpeciesId> {
        if !may_add {
            let bans = &self.area_info.get(current)?.banned_for_replacement;
            let reusable: SpeciesSet = translation.values().copied().collect();
            if let Some(r) = reusable.difference(bans).random_species(rng) {
                return Ok(r);
            }
            warn!("no earlier replacement fits {place}; adding a species past the map budget");
        }
        let candidates = self.candidates(current)?;
        self.pick_from(&candidates, current, rng)
            .ok_or_else(|| self.exhausted(current, place))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::AllocatorConfig;
    use crate::test_support::*;
    use crate::EncounterSettings;
    use rand::{rngs::StdRng, SeedableRng};

    fn many_species(n: u16) -> SpeciesTable {
        SpeciesTable::new((1..=n).map(|i| species(i, &format!("Mon{i}"), Type::Normal, None, 300)))
    }

    fn crash_allocator(table: &SpeciesTable) -> EncounterAllocator<'_> {
        let config = AllocatorConfig::new(&EncounterSettings::default(), true).unwrap();
        let allowed: SpeciesSet = table.iter().map(|sp| sp.id).collect();
        EncounterAllocator::new(config, table, allowed, SpeciesSet::new()).unwrap()
    }

    #[test]
    fn load_merges_areas_by_kind_and_skips_interact() {
        let table = eevee_and_pidgey();
        let areas = vec![
            area("Route", 1, EncounterType::Walking, &[PIDGEY, EEVEE]),
            area("Route", 1, EncounterType::Walking, &[PIDGEY, PIDGEOT]),
            area("Route", 1, EncounterType::Surfing, &[VAPOREON, ALT_PIDGEOT]),
            area("Route", 1, EncounterType::Interact, &[JOLTEON]),
        ];
        assert_eq!(map_load(&table, &areas, &[0, 1, 2, 3]), 3 + 2);
        assert_eq!(load_ceiling(&areas, &[0, 1, 2, 3]), 6);
    }

    #[test]
    fn crowded_map_is_brought_under_the_threshold() {
        let table = many_species(40);
        let species: Vec<SpeciesId> = (1..=20).map(SpeciesId).collect();
        for seed in 0..10 {
            let mut areas = vec![area("Meadow", 7, EncounterType::Walking, &species)];
            assert_eq!(map_load(&table, &areas, &[0]), 20);
            let mut alloc = crash_allocator(&table);
            alloc.randomize(&mut areas, &mut StdRng::seed_from_u64(seed)).unwrap();
            assert!(map_load(&table, &areas, &[0]) <= CRASH_THRESHOLD);
        }
    }

    #[test]
    fn several_kinds_share_the_budget() {
        let table = many_species(60);
        let walking: Vec<SpeciesId> = (1..=12).map(SpeciesId).collect();
        let surfing: Vec<SpeciesId> = (13..=24).map(SpeciesId).collect();
        for seed in 0..10 {
            let mut areas = vec![
                area("Bay", 3, EncounterType::Walking, &walking),
                area("Bay", 3, EncounterType::Surfing, &surfing),
                area("Bay", 3, EncounterType::Interact, &[SpeciesId(30)]),
            ];
            let mut alloc = crash_allocator(&table);
            alloc.randomize(&mut areas, &mut StdRng::seed_from_u64(seed)).unwrap();
            assert!(map_load(&table, &areas, &[0, 1, 2]) <= CRASH_THRESHOLD);
        }
    }

    #[test]
    fn small_maps_are_randomised_freely() {
        let table = many_species(30);
        let mut areas = vec![area("Path", 2, EncounterType::Walking, &[SpeciesId(1); 4])];
        let mut alloc = crash_allocator(&table);
        alloc.randomize(&mut areas, &mut StdRng::seed_from_u64(8)).unwrap();
        assert_eq!(alloc.report().regions, 1);
    }
}

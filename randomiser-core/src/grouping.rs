use rand::seq::SliceRandom;
use rand::Rng;

use crate::encounter::{
    group_by_encounter_type, group_by_location, group_by_map_index, EncounterArea,
};
use crate::RegionGrouping;

/// Areas that share a theme and translation table for one allocation step.
/// Holds indices into the pass's working area list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Region {
    pub areas: Vec<usize>,
}

/// Indices of the areas worth randomising, in shuffled order. Shuffling keeps
/// early areas from always getting first pick of a scarce pool.
pub(crate) fn prepare_areas<R: Rng + ?Sized>(areas: &[EncounterArea], rng: &mut R) -> Vec<usize> {
    let mut prepared: Vec<usize> = areas
        .iter()
        .enumerate()
        .filter(|(_, a)| !a.is_unused())
        .map(|(i, _)| i)
        .collect();
    prepared.shuffle(rng);
    prepared
}

fn split_by_type(areas: &[EncounterArea], groups: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
    groups
        .iter()
        .flat_map(|g| group_by_encounter_type(areas, g))
        .collect()
}

/// Partitions the prepared areas according to `grouping`. The result is not
/// shuffled yet; see [`shuffle_regions`].
pub(crate) fn build_regions(
    areas: &[EncounterArea],
    prepared: &[usize],
    grouping: RegionGrouping,
    split_by_encounter_type: bool,
) -> Vec<Region> {
    let groups = match grouping {
        RegionGrouping::None | RegionGrouping::EncounterSet => {
            prepared.iter().map(|&i| vec![i]).collect()
        }
        RegionGrouping::Map => group_by_map_index(areas, prepared),
        RegionGrouping::NamedLocation => group_by_location(areas, prepared),
        RegionGrouping::Game => vec![prepared.to_vec()],
    };
    let groups = match grouping {
        RegionGrouping::Map | RegionGrouping::NamedLocation | RegionGrouping::Game
            if split_by_encounter_type =>
        {
            split_by_type(areas, groups)
        }
        _ => groups,
    };
    groups
        .into_iter()
        .filter(|g| !g.is_empty())
        .map(|areas| Region { areas })
        .collect()
}

pub(crate) fn shuffle_regions<R: Rng + ?Sized>(regions: &mut [Region], rng: &mut R) {
    regions.shuffle(rng);
}

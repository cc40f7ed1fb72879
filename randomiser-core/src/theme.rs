use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeSet;

use crate::encounter::EncounterArea;
use crate::pool::SpeciesPool;
use crate::species::{SpeciesTable, Type};
use crate::species_set::{pick_preferred_type, SpeciesSet};
use crate::{RandomiserError, Result};

/// Theme the region already had: a type shared by every species of every
/// area in it, preferring the first slot's primary type, then not `Normal`.
pub(crate) fn existing_region_theme(
    table: &SpeciesTable,
    areas: &[EncounterArea],
    region: &[usize],
) -> Option<Type> {
    let mut possible: BTreeSet<Type> = Type::ALL.into_iter().collect();
    for &idx in region {
        let shared = areas[idx].species_in_area().shared_types(table);
        possible.retain(|t| shared.contains(t));
        if possible.is_empty() {
            return None;
        }
    }
    let preferred = region
        .first()
        .and_then(|&idx| areas[idx].encounters.first())
        .and_then(|enc| table.primary_type(enc.species));
    pick_preferred_type(&possible, preferred)
}

/// A random type that still has species left in the remaining pool.
pub(crate) fn random_theme_with_species_remaining<R: Rng + ?Sized>(
    pool: &SpeciesPool,
    rng: &mut R,
) -> Result<Type> {
    let mut types = pool.types().to_vec();
    types.shuffle(rng);
    types
        .into_iter()
        .find(|&t| pool.has_remaining_of(t))
        .ok_or_else(|| {
            RandomiserError::Invariant("remaining pool holds no species of any type".to_string())
        })
}

/// Type shared by the banned species sitting in this region, if any. Banned
/// species stay put under catch-em-all, so a random theme has to fit them.
pub(crate) fn banned_species_theme(
    table: &SpeciesTable,
    banned: &SpeciesSet,
    areas: &[EncounterArea],
    region: &[usize],
) -> Option<Type> {
    let mut in_region = SpeciesSet::new();
    for &idx in region {
        in_region.extend_from(&areas[idx].species_in_area());
    }
    let banned_here = banned.intersection(&in_region);
    if banned_here.is_empty() {
        return None;
    }
    banned_here.shared_type(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encounter::EncounterType;
    use crate::test_support::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn existing_theme_needs_every_area_to_agree() {
        let table = eevee_and_pidgey();
        let areas = vec![
            area("Birds", 1, EncounterType::Walking, &[PIDGEOTTO, PIDGEY]),
            area("Eevee", 1, EncounterType::Walking, &[EEVEE]),
            area("Lake", 2, EncounterType::Surfing, &[VAPOREON]),
        ];
        assert_eq!(existing_region_theme(&table, &areas, &[0]), Some(Type::Normal));
        assert_eq!(existing_region_theme(&table, &areas, &[0, 1]), Some(Type::Normal));
        assert_eq!(existing_region_theme(&table, &areas, &[0, 2]), None);
    }

    #[test]
    fn random_theme_skips_exhausted_types() {
        let table = eevee_and_pidgey();
        let allowed: SpeciesSet = [VAPOREON].into_iter().collect();
        let pool = SpeciesPool::new(&table, allowed, true);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..8 {
            assert_eq!(random_theme_with_species_remaining(&pool, &mut rng).unwrap(), Type::Water);
        }
    }

    #[test]
    fn banned_theme_follows_the_banned_species() {
        let table = eevee_and_pidgey();
        let areas = vec![area("Cave", 1, EncounterType::Walking, &[JOLTEON, PIDGEY])];
        let banned: SpeciesSet = [JOLTEON].into_iter().collect();
        assert_eq!(
            banned_species_theme(&table, &banned, &areas, &[0]),
            Some(Type::Electric)
        );
        assert_eq!(banned_species_theme(&table, &SpeciesSet::new(), &areas, &[0]), None);
    }
}

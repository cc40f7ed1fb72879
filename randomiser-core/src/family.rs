//! Keeps evolutionary families together: once one member of a family has a
//! replacement, its relatives map onto the matching relatives of that
//! replacement.

use rand::Rng;
use std::collections::BTreeSet;

use crate::allocator::EncounterAllocator;
use crate::encounter::EncounterArea;
use crate::species::{Relation, SpeciesId};
use crate::species_set::SpeciesSet;
use crate::{RandomiserError, Result};

impl<'a> EncounterAllocator<'a> {
    /// True once a relative of `species` in this region has a replacement.
    pub(crate) fn map_has_family_member(&self, species: SpeciesId) -> Result<bool> {
        let info = self.area_info.get(species)?;
        Ok(info
            .family
            .iter()
            .any(|r| r != species && self.region_map.contains_key(&r)))
    }

    /// Mapped relative of `species` to derive from, preferring one on the
    /// same branch.
    fn mapped_relative(&self, species: SpeciesId) -> Result<(SpeciesId, SpeciesId, Relation)> {
        let info = self.area_info.get(species)?;
        let mut mapped = info
            .family
            .iter()
            .filter(|&r| r != species)
            .filter_map(|r| {
                let replacement = *self.region_map.get(&r)?;
                let relation = self.table.relation(r, species)?;
                Some((r, replacement, relation))
            })
            .collect::<Vec<_>>();
        mapped.sort_by_key(|(_, _, relation)| !relation.same_branch);
        mapped.into_iter().next().ok_or_else(|| {
            RandomiserError::Invariant(format!(
                "{} has no mapped relative to derive from",
                self.table.name(species)
            ))
        })
    }

    /// The relative of an already mapped relative's replacement that stands
    /// where `species` stands.
    pub(crate) fn pick_family_member_replacement<R: Rng + ?Sized>(
        &self,
        species: SpeciesId,
        rng: &mut R,
    ) -> Result<SpeciesId> {
        let (relative, relative_replacement, relation) = self.mapped_relative(species)?;
        let bans = &self.area_info.get(species)?.banned_for_replacement;
        let matching = self
            .table
            .relatives_matching(relative_replacement, relation)
            .difference(bans);

        let used: SpeciesSet = self.region_map.values().copied().collect();
        let fresh = matching.intersection(self.pool.remaining());
        let unused = matching.intersection(self.pool.allowed()).difference(&used);
        let candidates = if !fresh.is_empty() {
            fresh
        } else if !unused.is_empty() {
            unused
        } else {
            matching.intersection(self.pool.allowed())
        };
        candidates.random_species(rng).ok_or_else(|| {
            RandomiserError::Invariant(format!(
                "{} has no relative standing to it as {} stands to {}",
                self.table.name(relative_replacement),
                self.table.name(species),
                self.table.name(relative)
            ))
        })
    }

    /// Narrows `candidates` to species whose own family has the shape of
    /// `species`' family in this region, so every relative can be derived
    /// later. Families that already supplied a replacement here are avoided
    /// while anything else fits.
    pub(crate) fn setup_allowed_for_family(
        &self,
        species: SpeciesId,
        candidates: SpeciesSet,
    ) -> Result<SpeciesSet> {
        let info = self.area_info.get(species)?;
        let family = &info.family;
        let before = family.evo_stages_before(self.table, species);
        let after = family.evo_stages_after(self.table, species);
        let mut shaped = candidates.filter_has_evo_stages(self.table, before, after);

        let allowed = self.pool.allowed();
        for relative in family.iter().filter(|&r| r != species) {
            let Some(relation) = self.table.relation(species, relative) else {
                continue;
            };
            let relative_bans = &self.area_info.get(relative)?.banned_for_replacement;
            shaped = shaped.filter(|p| {
                !self
                    .table
                    .relatives_matching(p, relation)
                    .intersection(allowed)
                    .difference(relative_bans)
                    .is_empty()
            });
        }

        let used: SpeciesSet = self.region_map.values().copied().collect();
        if used.is_empty() {
            return Ok(shaped);
        }
        let unused_families = shaped.filter(|p| !self.table.family(p).contains_any(&used));
        Ok(if unused_families.is_empty() {
            shaped
        } else {
            unused_families
        })
    }

    /// Lower ranks are harder to place and go first: chains with a gap,
    /// then full chains, then pairs, then lone species.
    fn family_shape_rank(&self, family: &SpeciesSet) -> u8 {
        if family.len() < 2 {
            return 3;
        }
        let stages: BTreeSet<usize> = family.iter().map(|s| self.table.stages_before(s)).collect();
        let (Some(&lo), Some(&hi)) = (stages.first(), stages.last()) else {
            return 3;
        };
        let span = hi - lo;
        if span >= 2 && stages.len() <= span {
            0
        } else if span >= 2 {
            1
        } else {
            2
        }
    }

    /// Fills the translation table one family at a time, then writes it out.
    pub(crate) fn randomize_region_by_families<R: Rng + ?Sized>(
        &mut self,
        areas: &mut [EncounterArea],
        region: &[usize],
        rng: &mut R,
    ) -> Result<()> {
        let mut families = self.area_info.families_in_order(areas, region)?;
        families.sort_by_key(|f| self.family_shape_rank(f));

        for family in &families {
            let mut members: Vec<SpeciesId> = family.iter().collect();
            members.sort_by_key(|&s| self.table.stages_before(s));
            let Some((&representative, rest)) = members.split_first() else {
                continue;
            };

            if !self.region_map.contains_key(&representative) {
                let replacement = if self.is_passthrough(representative) {
                    representative
                } else {
                    let place = format!("family of {} in this region", self.table.name(representative));
                    let candidates = self.candidates(representative)?;
                    self.pick_from(&candidates, representative, rng)
                        .ok_or_else(|| self.exhausted(representative, &place))?
                };
                self.record(representative, replacement);
            }

            for &member in rest {
                if self.region_map.contains_key(&member) {
                    continue;
                }
                let replacement = if self.is_passthrough(member) {
                    member
                } else {
                    self.pick_family_member_replacement(member, rng)?
                };
                self.record(member, replacement);
            }
        }

        for &idx in region {
            let area = &mut areas[idx];
            for slot in 0..area.encounters.len() {
                let current = area.encounters[slot].species;
                if self.is_passthrough(current) {
                    continue;
                }
                let Some(&replacement) = self.region_map.get(&current) else {
                    return Err(RandomiserError::Invariant(format!(
                        "{} in {} was never given a replacement",
                        self.table.name(current),
                        area.display_name
                    )));
                };
                self.apply_replacement(&mut area.encounters[slot], replacement, rng);
            }
            self.enforce_multiple_species(area, rng);
        }
        Ok(())
    }
}

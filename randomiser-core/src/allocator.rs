//! The replacement allocator: one pass object that owns the remaining pool and
//! translation table and walks every region of the game.
//!
//! Random draws happen in a fixed order, so one seed always reproduces a run:
//!
//! 1. shuffle of the prepared areas
//! 2. shuffle of the regions, or of the maps in crash-avoiding mode
//! 3. per region, the random theme (if random themes are on)
//! 4. per slot, the replacement pick followed by the forme pick
//! 5. per area, the multiple-species fix-up
//!
//! Regions filled family by family draw every replacement before any forme.

use log::{debug, warn};
use rand::{seq::SliceRandom, Rng};
use std::collections::BTreeMap;

use crate::area_info::{AreaInfoMap, AreaInfoOptions};
use crate::encounter::{Encounter, EncounterArea};
use crate::grouping::{build_regions, prepare_areas, shuffle_regions};
use crate::pool::SpeciesPool;
use crate::species::{SpeciesId, SpeciesTable, Type};
use crate::species_set::SpeciesSet;
use crate::theme::{banned_species_theme, existing_region_theme, random_theme_with_species_remaining};
use crate::{EncounterReport, EncounterSettings, RandomiserError, RegionGrouping, Result, TypeThemeMode};

/// How slots are tied together during one pass. Chosen once from settings.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AllocationStrategy {
    /// Every slot draws on its own.
    Free,
    /// Free draws, but no map may exceed the per-map species lookup limit.
    CrashAvoiding,
    /// Equal originals within a region get equal replacements.
    OneToOne {
        grouping: RegionGrouping,
        split_by_type: bool,
        families: bool,
    },
    /// Whole-game translation filled one evolutionary family at a time.
    WholeGameFamilies { split_by_type: bool },
}

impl AllocationStrategy {
    fn grouping(self) -> (RegionGrouping, bool) {
        match self {
            AllocationStrategy::Free | AllocationStrategy::CrashAvoiding => {
                (RegionGrouping::None, false)
            }
            AllocationStrategy::OneToOne {
                grouping,
                split_by_type,
                ..
            } => (grouping, split_by_type),
            AllocationStrategy::WholeGameFamilies { split_by_type } => {
                (RegionGrouping::Game, split_by_type)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocatorConfig {
    pub strategy: AllocationStrategy,
    pub random_themes: bool,
    pub keep_type_themes: bool,
    pub keep_primary_type: bool,
    pub catch_em_all: bool,
    pub similar_strength: bool,
    pub balance_shaking_grass: bool,
    pub keep_evolutions: bool,
    pub level_modifier: i32,
}

impl AllocatorConfig {
    pub fn new(settings: &EncounterSettings, target_platform: bool) -> Result<Self> {
        let split_by_type = settings.split_by_encounter_type;
        let strategy = match settings.region_grouping {
            RegionGrouping::None if target_platform => AllocationStrategy::CrashAvoiding,
            RegionGrouping::None => AllocationStrategy::Free,
            RegionGrouping::Game if settings.keep_evolution_families => {
                AllocationStrategy::WholeGameFamilies { split_by_type }
            }
            grouping => AllocationStrategy::OneToOne {
                grouping,
                split_by_type,
                families: settings.keep_evolution_families,
            },
        };

        let mut config = Self {
            strategy,
            random_themes: settings.type_theme_mode == TypeThemeMode::RandomThemes,
            keep_type_themes: settings.keep_type_themes,
            keep_primary_type: settings.type_theme_mode == TypeThemeMode::KeepPrimary,
            catch_em_all: settings.catch_em_all,
            similar_strength: settings.similar_strength,
            balance_shaking_grass: settings.balance_shaking_grass,
            keep_evolutions: settings.keep_evolution_families,
            level_modifier: settings.level_modifier,
        };
        if config.keep_evolutions && !config.uses_mapping() {
            warn!("keeping evolution families needs a region grouping; ignoring it");
            config.keep_evolutions = false;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn check_level_modifier(modifier: i32) -> Result<()> {
        if !(-100..=100).contains(&modifier) {
            return Err(RandomiserError::Config(format!(
                "level modifier {modifier}% is outside -100..=100"
            )));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.random_themes && self.keep_primary_type {
            return Err(RandomiserError::Config(
                "random type themes cannot be combined with keeping primary types".to_string(),
            ));
        }
        Self::check_level_modifier(self.level_modifier)
    }

    /// Whether the pool has to be indexed by type.
    pub fn needs_types(&self) -> bool {
        self.keep_primary_type || self.keep_type_themes || self.random_themes
    }

    /// Whether the pass keeps a translation table per region.
    pub fn uses_mapping(&self) -> bool {
        !matches!(
            self.strategy,
            AllocationStrategy::Free | AllocationStrategy::CrashAvoiding
        )
    }

    fn fills_by_family(&self) -> bool {
        matches!(self.strategy, AllocationStrategy::WholeGameFamilies { .. })
    }
}

/// State of one randomisation pass over a list of encounter areas.
pub struct EncounterAllocator<'a> {
    pub(crate) config: AllocatorConfig,
    pub(crate) table: &'a SpeciesTable,
    pub(crate) pool: SpeciesPool,
    /// Banned for wild encounters; only consulted for catch-em-all passthrough.
    pub(crate) banned: SpeciesSet,
    pub(crate) region_type: Option<Type>,
    pub(crate) region_map: BTreeMap<SpeciesId, SpeciesId>,
    pub(crate) area_info: AreaInfoMap,
    pub(crate) report: EncounterReport,
}

impl<'a> EncounterAllocator<'a> {
    pub fn new(
        config: AllocatorConfig,
        table: &'a SpeciesTable,
        allowed: SpeciesSet,
        banned: SpeciesSet,
    ) -> Result<Self> {
        config.validate()?;
        if allowed.is_empty() {
            return Err(RandomiserError::Config(
                "no species are allowed in wild encounters".to_string(),
            ));
        }
        let pool = SpeciesPool::new(table, allowed, config.needs_types());
        Ok(Self {
            config,
            table,
            pool,
            banned,
            region_type: None,
            region_map: BTreeMap::new(),
            area_info: AreaInfoMap::default(),
            report: EncounterReport::default(),
        })
    }

    pub fn report(&self) -> EncounterReport {
        EncounterReport {
            refills: self.pool.refills(),
            ..self.report.clone()
        }
    }

    /// Replaces the species of every used slot in `areas`.
    pub fn randomize<R: Rng + ?Sized>(
        &mut self,
        areas: &mut [EncounterArea],
        rng: &mut R,
    ) -> Result<()> {
        let prepared = prepare_areas(areas, rng);
        if self.config.strategy == AllocationStrategy::CrashAvoiding {
            return self.randomize_avoiding_crashes(areas, &prepared, rng);
        }

        let (grouping, split_by_type) = self.config.strategy.grouping();
        let mut regions = build_regions(areas, &prepared, grouping, split_by_type);
        shuffle_regions(&mut regions, rng);
        debug!(
            "{} areas in {} regions using {:?}",
            prepared.len(),
            regions.len(),
            self.config.strategy
        );
        for region in &regions {
            self.randomize_region(areas, &region.areas, rng)?;
        }
        Ok(())
    }

    pub(crate) fn is_passthrough(&self, species: SpeciesId) -> bool {
        self.config.catch_em_all && self.banned.contains(species)
    }

    pub(crate) fn pick_region_theme<R: Rng + ?Sized>(
        &self,
        areas: &[EncounterArea],
        region: &[usize],
        rng: &mut R,
    ) -> Result<Option<Type>> {
        if self.config.keep_type_themes {
            if let Some(t) = existing_region_theme(self.table, areas, region) {
                return Ok(Some(t));
            }
        }
        if !self.config.random_themes {
            return Ok(None);
        }
        let mut theme = random_theme_with_species_remaining(&self.pool, rng)?;
        if self.config.catch_em_all {
            if let Some(t) = banned_species_theme(self.table, &self.banned, areas, region) {
                theme = t;
            }
        }
        Ok(Some(theme))
    }

    pub(crate) fn build_area_info(&mut self, areas: &[EncounterArea], region: &[usize]) -> Result<()> {
        self.area_info = AreaInfoMap::build(
            self.table,
            areas,
            region,
            AreaInfoOptions {
                keep_type_themes: self.config.keep_type_themes,
                keep_evolutions: self.config.keep_evolutions,
                record_levels: self.config.balance_shaking_grass,
            },
        );
        if self.config.keep_evolutions {
            self.area_info.spread_themes_through_families()?;
        }
        Ok(())
    }

    pub(crate) fn randomize_region<R: Rng + ?Sized>(
        &mut self,
        areas: &mut [EncounterArea],
        region: &[usize],
        rng: &mut R,
    ) -> Result<()> {
        self.region_type = self.pick_region_theme(areas, region, rng)?;
        self.region_map.clear();
        self.build_area_info(areas, region)?;
        debug!(
            "region of {} areas starting at {}: theme {:?}",
            region.len(),
            region.first().map(|&i| areas[i].display_name.as_str()).unwrap_or("-"),
            self.region_type
        );

        if self.config.fills_by_family() {
            self.randomize_region_by_families(areas, region, rng)?;
        } else {
            for &idx in region {
                self.randomize_area(&mut areas[idx], rng)?;
            }
        }

        self.report.regions += 1;
        self.report.areas += region.len();
        if self.config.uses_mapping() && !self.config.catch_em_all {
            self.pool.reset();
        }
        Ok(())
    }

    fn randomize_area<R: Rng + ?Sized>(&mut self, area: &mut EncounterArea, rng: &mut R) -> Result<()> {
        for slot in 0..area.encounters.len() {
            let current = area.encounters[slot].species;
            if self.is_passthrough(current) {
                continue;
            }
            let replacement = match self.region_map.get(&current) {
                Some(&mapped) => mapped,
                None => {
                    let place = format!("slot {slot} of {}", area.display_name);
                    let picked = self.pick_replacement(current, &place, rng)?;
                    self.record(current, picked);
                    picked
                }
            };
            self.apply_replacement(&mut area.encounters[slot], replacement, rng);
        }
        self.enforce_multiple_species(area, rng);
        Ok(())
    }

    /// A replacement for `current` that is not yet in the translation table.
    fn pick_replacement<R: Rng + ?Sized>(
        &self,
        current: SpeciesId,
        place: &str,
        rng: &mut R,
    ) -> Result<SpeciesId> {
        if self.config.keep_evolutions && self.map_has_family_member(current)? {
            return self.pick_family_member_replacement(current, rng);
        }
        let candidates = self.candidates(current)?;
        self.pick_from(&candidates, current, rng)
            .ok_or_else(|| self.exhausted(current, place))
    }

    /// Species `current` may turn into under the region's theme: fresh ones
    /// first, then any allowed of the theme. An empty result is exhaustion.
    pub(crate) fn candidates(&self, current: SpeciesId) -> Result<SpeciesSet> {
        let info = self.area_info.get(current)?;
        let theme = self
            .region_type
            .or_else(|| info.theme(self.config.keep_primary_type));
        let bans = &info.banned_for_replacement;

        let fresh = self.shape_filter(current, self.pool.remaining_of(theme).difference(bans))?;
        if !fresh.is_empty() {
            return Ok(fresh);
        }
        self.shape_filter(current, self.pool.allowed_of(theme).difference(bans))
    }

    fn shape_filter(&self, current: SpeciesId, candidates: SpeciesSet) -> Result<SpeciesSet> {
        if self.config.keep_evolutions {
            self.setup_allowed_for_family(current, candidates)
        } else {
            Ok(candidates)
        }
    }

    pub(crate) fn pick_from<R: Rng + ?Sized>(
        &self,
        candidates: &SpeciesSet,
        current: SpeciesId,
        rng: &mut R,
    ) -> Option<SpeciesId> {
        if !self.config.similar_strength {
            return candidates.random_species(rng);
        }
        let mut target = self.table.bst(current);
        if self.config.balance_shaking_grass {
            if let Ok(info) = self.area_info.get(current) {
                target = target.min(u32::from(info.lowest_level) * 10 + 250);
            }
        }
        candidates.random_similar_strength(self.table, target, rng)
    }

    pub(crate) fn exhausted(&self, current: SpeciesId, place: &str) -> RandomiserError {
        RandomiserError::Exhausted {
            slot: format!("{} ({place})", self.table.name(current)),
        }
    }

    /// Marks `replacement` as handed out for `current`.
    pub(crate) fn record(&mut self, current: SpeciesId, replacement: SpeciesId) {
        if self.config.uses_mapping() {
            self.region_map.insert(current, replacement);
        }
        if self.config.uses_mapping() || self.config.catch_em_all {
            self.pool.take(self.table, replacement);
        }
    }

    /// Writes `replacement` into `enc`, folding alternate formes into their
    /// base species plus a forme number.
    pub(crate) fn apply_replacement<R: Rng + ?Sized>(
        &self,
        enc: &mut Encounter,
        replacement: SpeciesId,
        rng: &mut R,
    ) {
        let Some(sp) = self.table.get(replacement) else {
            enc.species = replacement;
            enc.forme_number = 0;
            return;
        };
        let cosmetic = (sp.cosmetic_formes > 0)
            .then(|| sp.cosmetic_forme_number(rng.gen_range(0..sp.cosmetic_formes)));
        if sp.is_alt_forme() {
            enc.species = self.table.base_forme_of(replacement);
            enc.forme_number = sp.forme_number.saturating_add(cosmetic.unwrap_or(0));
        } else {
            enc.species = replacement;
            enc.forme_number = cosmetic.unwrap_or(0);
        }
    }

    /// Best effort: an area flagged to hold several species that ended up
    /// with one gets a second, random allowed species in one slot.
    pub(crate) fn enforce_multiple_species<R: Rng + ?Sized>(
        &self,
        area: &mut EncounterArea,
        rng: &mut R,
    ) {
        if !area.force_multiple_species || area.encounters.len() < 2 || area.distinct_species() > 1 {
            return;
        }
        let only = area.encounters[0].species;
        let others = self
            .pool
            .allowed()
            .difference(&area.banned_species)
            .filter(|id| self.table.base_forme_of(id) != only);
        let Some(other) = others.random_species(rng) else {
            warn!("{} must hold several species but only {} fits", area.display_name, self.table.name(only));
            return;
        };
        let open: Vec<usize> = (0..area.encounters.len())
            .filter(|&i| !self.is_passthrough(area.encounters[i].species))
            .collect();
        let Some(&slot) = open.choose(rng) else {
            warn!("{} must hold several species but every slot is kept as it was", area.display_name);
            return;
        };
        self.apply_replacement(&mut area.encounters[slot], other, rng);
    }
}

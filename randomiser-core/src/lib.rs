use log::{debug, info};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

mod allocator;
mod area_info;
mod dexnav;
pub mod encounter;
mod family;
pub mod game_data;
mod grouping;
pub mod pool;
pub mod species;
pub mod species_set;
mod theme;

#[cfg(test)]
mod test_support;

pub use allocator::{AllocationStrategy, AllocatorConfig, EncounterAllocator};
pub use dexnav::{map_load, CRASH_THRESHOLD};
pub use encounter::{apply_level_modifier, Encounter, EncounterArea, EncounterType};
pub use game_data::{EncounterSource, GameData, SpeciesRestrictions, StaticRestrictions};
pub use species::{Species, SpeciesId, SpeciesTable, Type};
pub use species_set::SpeciesSet;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegionGrouping {
    /// Every slot is randomised on its own.
    #[default]
    None,
    EncounterSet,
    Map,
    NamedLocation,
    Game,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeThemeMode {
    #[default]
    Off,
    RandomThemes,
    KeepPrimary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterSettings {
    pub randomize_wild_pokemon: bool,
    pub use_time_based_encounters: bool,
    pub region_grouping: RegionGrouping,
    pub split_by_encounter_type: bool,
    pub type_theme_mode: TypeThemeMode,
    pub keep_type_themes: bool,
    pub keep_evolution_families: bool,
    pub catch_em_all: bool,
    pub similar_strength: bool,
    pub balance_shaking_grass: bool,
    pub block_legendaries: bool,
    /// Percentage applied to every encounter level, -100..=100.
    pub level_modifier: i32,
    pub allow_alt_formes: bool,
    pub ban_irregular_alt_formes: bool,
    /// Ability-dependent formes are only safe in the wild once abilities are
    /// themselves randomised.
    pub abilities_randomized: bool,
}

impl Default for EncounterSettings {
    fn default() -> Self {
        Self {
            randomize_wild_pokemon: true,
            use_time_based_encounters: false,
            region_grouping: RegionGrouping::None,
            split_by_encounter_type: false,
            type_theme_mode: TypeThemeMode::Off,
            keep_type_themes: false,
            keep_evolution_families: false,
            catch_em_all: false,
            similar_strength: false,
            balance_shaking_grass: false,
            block_legendaries: true,
            level_modifier: 0,
            allow_alt_formes: false,
            ban_irregular_alt_formes: false,
            abilities_randomized: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomiserSettings {
    pub seed: u64,
    pub debug: bool,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub encounters: EncounterSettings,
}

#[derive(Debug, Error)]
pub enum RandomiserError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("could not find a wild species replacement for {slot}")]
    Exhausted { slot: String },
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, RandomiserError>;

/// Summary of one encounter pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EncounterReport {
    pub regions: usize,
    pub areas: usize,
    pub slots: usize,
    pub slots_changed: usize,
    pub refills: usize,
}

fn species_banned_for_wild<S, P>(source: &S, restrictions: &P, settings: &EncounterSettings) -> SpeciesSet
where
    S: EncounterSource + ?Sized,
    P: SpeciesRestrictions + ?Sized,
{
    let mut banned = source.banned_for_wild_encounters();
    banned.extend_from(&restrictions.banned_formes_for_player());
    if !settings.abilities_randomized {
        banned.extend_from(&restrictions.ability_dependent_formes());
    }
    if settings.ban_irregular_alt_formes {
        banned.extend_from(&source.irregular_formes());
    }
    banned
}

/// Randomises the wild encounters held by `source` in place.
///
/// The areas are only handed back to `source` once the whole pass succeeded;
/// on error the source is left exactly as it was.
pub fn randomize_encounters<S, P, R>(
    source: &mut S,
    restrictions: &P,
    settings: &EncounterSettings,
    rng: &mut R,
) -> Result<EncounterReport>
where
    S: EncounterSource + ?Sized,
    P: SpeciesRestrictions + ?Sized,
    R: Rng + ?Sized,
{
    let use_time_of_day = settings.use_time_based_encounters;
    let mut areas = source.encounter_areas(use_time_of_day);

    if !settings.randomize_wild_pokemon {
        AllocatorConfig::check_level_modifier(settings.level_modifier)?;
        apply_level_modifier(&mut areas, settings.level_modifier);
        let report = EncounterReport {
            areas: areas.len(),
            slots: areas.iter().map(|a| a.encounters.len()).sum(),
            ..EncounterReport::default()
        };
        source.set_encounter_areas(use_time_of_day, areas);
        return Ok(report);
    }

    let config = AllocatorConfig::new(settings, source.is_target_platform_family())?;
    let banned = species_banned_for_wild(source, restrictions, settings);
    let mut allowed =
        restrictions.allowed_species(settings.block_legendaries, settings.allow_alt_formes);
    allowed.remove_all(&banned);
    debug!(
        "{} species allowed in the wild, {} banned",
        allowed.len(),
        banned.len()
    );

    let original: Vec<Vec<SpeciesId>> = areas
        .iter()
        .map(|a| a.encounters.iter().map(|e| e.species).collect())
        .collect();

    let mut report = {
        let mut allocator = EncounterAllocator::new(config, source.species(), allowed, banned)?;
        allocator.randomize(&mut areas, rng)?;
        allocator.report()
    };

    apply_level_modifier(&mut areas, settings.level_modifier);

    report.slots = areas.iter().map(|a| a.encounters.len()).sum();
    report.slots_changed = areas
        .iter()
        .zip(&original)
        .flat_map(|(area, before)| area.encounters.iter().zip(before))
        .filter(|(enc, before)| enc.species != **before)
        .count();

    source.set_encounter_areas(use_time_of_day, areas);
    Ok(report)
}

/// Loads the game dump at `input_path`, randomises its wild encounters and
/// writes the result to `output_path`.
pub fn run(settings: RandomiserSettings) -> Result<EncounterReport> {
    let mut data = GameData::load(&settings.input_path)?;
    info!(
        "loaded {} species and {} encounter areas from {:?}",
        data.species().len(),
        data.areas().len(),
        settings.input_path
    );

    let use_time_of_day = settings.encounters.use_time_based_encounters;
    let before = data.encounter_areas(use_time_of_day);
    let restrictions = data.restrictions();
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let report = randomize_encounters(&mut data, &restrictions, &settings.encounters, &mut rng)?;
    info!(
        "randomised {} of {} slots across {} regions ({} pool refills)",
        report.slots_changed, report.slots, report.regions, report.refills
    );

    data.save(&settings.output_path)?;
    info!("wrote {:?}", settings.output_path);

    if settings.debug {
        let after = data.encounter_areas(use_time_of_day);
        let log = spoiler_log(&settings, &report, data.species(), &before, &after);
        let log_path = settings.output_path.with_file_name("spoiler_log.txt");
        fs::write(&log_path, log)?;
        debug!("wrote {:?}", log_path);
    }
    Ok(report)
}

fn spoiler_log(
    settings: &RandomiserSettings,
    report: &EncounterReport,
    table: &SpeciesTable,
    before: &[EncounterArea],
    after: &[EncounterArea],
) -> String {
    let mut log = format!("Wild encounter randomiser seed: {}\n", settings.seed);
    log.push_str(&format!(
        "regions: {}, areas: {}, slots changed: {} of {}, pool refills: {}\n",
        report.regions, report.areas, report.slots_changed, report.slots, report.refills
    ));
    for (old, new) in before.iter().zip(after) {
        log.push_str(&format!(
            "{} (map {}, {:?}):\n",
            new.display_name, new.map_index, new.encounter_type
        ));
        for (o, n) in old.encounters.iter().zip(&new.encounters) {
            log.push_str(&format!(
                "  {} -> {} (forme {}, Lv {}-{})\n",
                table.name(o.species),
                table.name(n.species),
                n.forme_number,
                n.level,
                n.max_level
            ));
        }
    }
    log
}

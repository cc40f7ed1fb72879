//! Collaborator seams the engine reads game data through, plus a JSON-backed
//! implementation of both used by the command line tool.

use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use crate::encounter::EncounterArea;
use crate::species::{Species, SpeciesTable};
use crate::species_set::SpeciesSet;
use crate::Result;

/// Source and sink of encounter data, normally backed by a ROM handler.
pub trait EncounterSource {
    fn species(&self) -> &SpeciesTable;

    fn encounter_areas(&self, use_time_of_day: bool) -> Vec<EncounterArea>;

    fn set_encounter_areas(&mut self, use_time_of_day: bool, areas: Vec<EncounterArea>);

    fn banned_for_wild_encounters(&self) -> SpeciesSet;

    fn irregular_formes(&self) -> SpeciesSet;

    /// True for the platform whose per-map species lookup crashes when a map
    /// holds too many distinct species.
    fn is_target_platform_family(&self) -> bool;
}

/// Which species the player may meet at all, independent of encounters.
pub trait SpeciesRestrictions {
    fn allowed_species(&self, exclude_legendaries: bool, allow_alt_formes: bool) -> SpeciesSet;

    fn banned_formes_for_player(&self) -> SpeciesSet;

    fn ability_dependent_formes(&self) -> SpeciesSet;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GameDataFile {
    species: Vec<Species>,
    #[serde(default)]
    encounter_areas: Vec<EncounterArea>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time_of_day_areas: Option<Vec<EncounterArea>>,
    #[serde(default)]
    banned_for_wild: SpeciesSet,
    #[serde(default)]
    irregular_formes: SpeciesSet,
    #[serde(default)]
    banned_formes_for_player: SpeciesSet,
    #[serde(default)]
    ability_dependent_formes: SpeciesSet,
    #[serde(default)]
    target_platform_family: bool,
}

/// An extracted game dump: species table, encounter areas and ban lists.
#[derive(Debug, Default)]
pub struct GameData {
    table: SpeciesTable,
    file: GameDataFile,
}

fn is_gzip_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"))
}

impl GameData {
    pub fn from_json(json: &str) -> Result<Self> {
        let file: GameDataFile = serde_json::from_str(json)?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: GameDataFile) -> Self {
        let table = SpeciesTable::new(file.species.iter().cloned());
        Self { table, file }
    }

    /// Reads a `.json` dump, or a gzip-compressed one when the name ends in `.gz`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path)?;
        let text = if is_gzip_path(path) {
            let mut decoder = GzDecoder::new(raw.as_slice());
            let mut text = String::new();
            decoder.read_to_string(&mut text)?;
            text
        } else {
            String::from_utf8_lossy(&raw).into_owned()
        };
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.file)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        if is_gzip_path(path) {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(json.as_bytes())?;
            fs::write(path, encoder.finish()?)?;
        } else {
            fs::write(path, json)?;
        }
        Ok(())
    }

    pub fn areas(&self) -> &[EncounterArea] {
        &self.file.encounter_areas
    }
}

impl EncounterSource for GameData {
    fn species(&self) -> &SpeciesTable {
        &self.table
    }

    fn encounter_areas(&self, use_time_of_day: bool) -> Vec<EncounterArea> {
        match (&self.file.time_of_day_areas, use_time_of_day) {
            (Some(areas), true) => areas.clone(),
            _ => self.file.encounter_areas.clone(),
        }
    }

    fn set_encounter_areas(&mut self, use_time_of_day: bool, areas: Vec<EncounterArea>) {
        if use_time_of_day && self.file.time_of_day_areas.is_some() {
            self.file.time_of_day_areas = Some(areas);
        } else {
            self.file.encounter_areas = areas;
        }
    }

    fn banned_for_wild_encounters(&self) -> SpeciesSet {
        self.file.banned_for_wild.clone()
    }

    fn irregular_formes(&self) -> SpeciesSet {
        self.file.irregular_formes.clone()
    }

    fn is_target_platform_family(&self) -> bool {
        self.file.target_platform_family
    }
}

/// Restriction lists captured from a dump, so they can be consulted while the
/// dump itself is being rewritten.
#[derive(Debug, Clone, Default)]
pub struct StaticRestrictions {
    pub all: SpeciesSet,
    pub legendaries: SpeciesSet,
    pub alt_formes: SpeciesSet,
    pub banned_formes_for_player: SpeciesSet,
    pub ability_dependent_formes: SpeciesSet,
}

impl GameData {
    pub fn restrictions(&self) -> StaticRestrictions {
        StaticRestrictions {
            all: self.table.iter().map(|sp| sp.id).collect(),
            legendaries: self.table.iter().filter(|sp| sp.legendary).map(|sp| sp.id).collect(),
            alt_formes: self
                .table
                .iter()
                .filter(|sp| !sp.is_base_forme())
                .map(|sp| sp.id)
                .collect(),
            banned_formes_for_player: self.file.banned_formes_for_player.clone(),
            ability_dependent_formes: self.file.ability_dependent_formes.clone(),
        }
    }
}

impl SpeciesRestrictions for StaticRestrictions {
    fn allowed_species(&self, exclude_legendaries: bool, allow_alt_formes: bool) -> SpeciesSet {
        let mut allowed = self.all.clone();
        if exclude_legendaries {
            allowed.remove_all(&self.legendaries);
        }
        if !allow_alt_formes {
            allowed.remove_all(&self.alt_formes);
        }
        allowed
    }

    fn banned_formes_for_player(&self) -> SpeciesSet {
        self.banned_formes_for_player.clone()
    }

    fn ability_dependent_formes(&self) -> SpeciesSet {
        self.ability_dependent_formes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::SpeciesId;

    const DUMP: &str = r#"{
        "species": [
            { "id": 1, "name": "Bulbasaur", "primary_type": "GRASS", "secondary_type": "POISON", "bst": 318 },
            { "id": 150, "name": "Mewtwo", "primary_type": "PSYCHIC", "bst": 680, "legendary": true },
            { "id": 900, "name": "Bulbasaur-Alt", "primary_type": "GRASS", "bst": 318,
              "base_forme": 1, "forme_number": 1 }
        ],
        "encounter_areas": [
            { "display_name": "Route 1", "map_index": 1, "encounter_type": "WALKING",
              "encounters": [ { "species": 1, "level": 3, "max_level": 5 } ] }
        ],
        "time_of_day_areas": [],
        "banned_for_wild": [150]
    }"#;

    #[test]
    fn parses_a_minimal_dump() {
        let data = GameData::from_json(DUMP).unwrap();
        assert_eq!(data.species().len(), 3);
        assert_eq!(data.encounter_areas(false).len(), 1);
        assert!(data.encounter_areas(true).is_empty());
        assert!(data.banned_for_wild_encounters().contains(SpeciesId(150)));
    }

    #[test]
    fn allowed_species_honours_legendary_and_forme_flags() {
        let restrictions = GameData::from_json(DUMP).unwrap().restrictions();
        assert_eq!(restrictions.allowed_species(false, true).len(), 3);
        let strict = restrictions.allowed_species(true, false);
        assert_eq!(strict.iter().collect::<Vec<_>>(), vec![SpeciesId(1)]);
    }

    #[test]
    fn gzip_dump_round_trips_through_disk() {
        let data = GameData::from_json(DUMP).unwrap();
        let dir = std::env::temp_dir().join(format!("wild-randomiser-gz-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("dump.json.gz");
        data.save(&path).unwrap();
        let back = GameData::load(&path).unwrap();
        fs::remove_dir_all(&dir).unwrap();
        assert_eq!(back.areas().len(), 1);
        assert_eq!(back.species().len(), 3);
    }
}

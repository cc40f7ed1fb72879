#![allow(dead_code)]

use rand::{rngs::StdRng, SeedableRng};
use serde_json::{json, Value};
use std::path::PathBuf;
use wild_randomiser_core::{
    randomize_encounters, EncounterArea, EncounterReport, EncounterSettings, GameData, Result,
    SpeciesId,
};

pub fn species(id: u16, name: &str, primary: &str, secondary: Option<&str>, bst: u32) -> Value {
    json!({
        "id": id,
        "name": name,
        "primary_type": primary,
        "secondary_type": secondary,
        "bst": bst,
    })
}

/// Links consecutive ids in `chain` as one evolution line.
pub fn link(all: &mut [Value], chain: &[u16]) {
    for pair in chain.windows(2) {
        for sp in all.iter_mut() {
            if sp["id"] == pair[0] {
                push_id(sp, "evolves_into", pair[1]);
            }
            if sp["id"] == pair[1] {
                push_id(sp, "evolves_from", pair[0]);
            }
        }
    }
}

fn push_id(sp: &mut Value, key: &str, id: u16) {
    match sp.get_mut(key).and_then(Value::as_array_mut) {
        Some(list) => list.push(json!(id)),
        None => sp[key] = json!([id]),
    }
}

pub fn area(name: &str, map_index: i32, kind: &str, species: &[u16]) -> Value {
    let encounters: Vec<Value> = species
        .iter()
        .map(|&s| json!({ "species": s, "level": 4, "max_level": 6 }))
        .collect();
    json!({
        "display_name": name,
        "location_tag": name,
        "map_index": map_index,
        "encounter_type": kind,
        "encounters": encounters,
    })
}

pub fn sample_species() -> Vec<Value> {
    let mut all = vec![
        species(1, "Ember", "FIRE", None, 300),
        species(2, "Cinder", "FIRE", None, 310),
        species(3, "Blaze", "FIRE", None, 480),
        species(4, "Ripple", "WATER", None, 305),
        species(5, "Tide", "WATER", None, 320),
        species(6, "Torrent", "WATER", None, 500),
        species(7, "Sprout", "GRASS", None, 290),
        species(8, "Bloom", "GRASS", None, 330),
        species(9, "Spark", "ELECTRIC", None, 300),
        species(10, "Volt", "ELECTRIC", None, 320),
        species(11, "Larva", "BUG", None, 200),
        species(12, "Cocoon", "BUG", None, 210),
        species(13, "Moth", "BUG", Some("FLYING"), 400),
        species(14, "Chick", "NORMAL", Some("FLYING"), 250),
        species(15, "Hawk", "NORMAL", Some("FLYING"), 350),
        species(16, "Raptor", "NORMAL", Some("FLYING"), 480),
        species(17, "Pebble", "ROCK", None, 300),
        species(18, "Boulder", "ROCK", Some("GROUND"), 450),
        species(19, "Mole", "GROUND", None, 310),
        species(151, "Ghosty", "GHOST", None, 400),
        species(152, "Shade", "GHOST", None, 380),
    ];
    let mut legend = species(150, "Legend", "PSYCHIC", None, 680);
    legend["legendary"] = json!(true);
    all.push(legend);
    link(&mut all, &[11, 12, 13]);
    link(&mut all, &[14, 15, 16]);
    link(&mut all, &[17, 18]);
    all
}

pub fn sample_areas() -> Vec<Value> {
    let mut forest = area("Forest", 2, "WALKING", &[11, 12, 13, 7]);
    forest["location_tag"] = json!("Viridian");
    let mut cave = area("Cave", 3, "WALKING", &[17, 17, 17]);
    cave["force_multiple_species"] = json!(true);
    cave["banned_species"] = json!([1]);
    let mut lake = area("Lake", 4, "FISHING", &[4, 6]);
    lake["location_tag"] = json!("Viridian");
    let mut hidden = area("Hidden", 6, "WALKING", &[10]);
    hidden["location_tag"] = json!("UNUSED");
    vec![
        area("Route 1", 1, "WALKING", &[14, 14, 11, 12, 1]),
        area("Route 1", 1, "SURFING", &[4, 4, 5]),
        forest,
        cave,
        area("Cave", 3, "INTERACT", &[18]),
        lake,
        area("Tower", 5, "WALKING", &[151, 16, 9]),
        hidden,
    ]
}

pub fn sample_dump() -> Value {
    json!({
        "species": sample_species(),
        "encounter_areas": sample_areas(),
        "banned_for_wild": [151],
    })
}

pub fn load(dump: &Value) -> GameData {
    GameData::from_json(&dump.to_string()).expect("fixture dump parses")
}

pub fn randomize(data: &mut GameData, settings: &EncounterSettings, seed: u64) -> Result<EncounterReport> {
    let restrictions = data.restrictions();
    let mut rng = StdRng::seed_from_u64(seed);
    randomize_encounters(data, &restrictions, settings, &mut rng)
}

pub fn species_of(area: &EncounterArea) -> Vec<SpeciesId> {
    area.encounters.iter().map(|e| e.species).collect()
}

pub fn ids(raw: &[u16]) -> Vec<SpeciesId> {
    raw.iter().copied().map(SpeciesId).collect()
}

/// Fresh scratch directory under the system temp dir, unique per test.
pub fn scratch_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("wild-randomiser-{test}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("scratch dir");
    dir
}

//! Small species graphs and area builders shared by the unit tests.

use crate::encounter::{Encounter, EncounterArea, EncounterType};
use crate::species::{Species, SpeciesId, SpeciesTable, Type};

pub const PIDGEY: SpeciesId = SpeciesId(16);
pub const PIDGEOTTO: SpeciesId = SpeciesId(17);
pub const PIDGEOT: SpeciesId = SpeciesId(18);
pub const EEVEE: SpeciesId = SpeciesId(133);
pub const VAPOREON: SpeciesId = SpeciesId(134);
pub const JOLTEON: SpeciesId = SpeciesId(135);
pub const ALT_PIDGEOT: SpeciesId = SpeciesId(1000);

pub fn species(id: u16, name: &str, primary: Type, secondary: Option<Type>, bst: u32) -> Species {
    Species {
        id: SpeciesId(id),
        name: name.to_string(),
        primary_type: primary,
        secondary_type: secondary,
        bst,
        legendary: false,
        evolves_into: Vec::new(),
        evolves_from: Vec::new(),
        base_forme: None,
        forme_number: 0,
        cosmetic_formes: 0,
        cosmetic_forme_numbers: Vec::new(),
    }
}

/// Links `chain` as a straight evolution line.
pub fn link(all: &mut [Species], chain: &[SpeciesId]) {
    for pair in chain.windows(2) {
        for sp in all.iter_mut() {
            if sp.id == pair[0] && !sp.evolves_into.contains(&pair[1]) {
                sp.evolves_into.push(pair[1]);
            }
            if sp.id == pair[1] && !sp.evolves_from.contains(&pair[0]) {
                sp.evolves_from.push(pair[0]);
            }
        }
    }
}

/// A three-stage line, a branching line, and one alternate forme.
pub fn eevee_and_pidgey() -> SpeciesTable {
    let mut all = vec![
        species(16, "Pidgey", Type::Normal, Some(Type::Flying), 251),
        species(17, "Pidgeotto", Type::Normal, Some(Type::Flying), 349),
        species(18, "Pidgeot", Type::Normal, Some(Type::Flying), 479),
        species(133, "Eevee", Type::Normal, None, 325),
        species(134, "Vaporeon", Type::Water, None, 525),
        species(135, "Jolteon", Type::Electric, None, 525),
    ];
    let mut mega = species(1000, "Pidgeot-Mega", Type::Normal, Some(Type::Flying), 579);
    mega.base_forme = Some(PIDGEOT);
    mega.forme_number = 1;
    all.push(mega);
    link(&mut all, &[PIDGEY, PIDGEOTTO, PIDGEOT]);
    link(&mut all, &[EEVEE, VAPOREON]);
    link(&mut all, &[EEVEE, JOLTEON]);
    SpeciesTable::new(all)
}

pub fn area(name: &str, map_index: i32, kind: EncounterType, species: &[SpeciesId]) -> EncounterArea {
    EncounterArea {
        display_name: name.to_string(),
        location_tag: name.to_string(),
        map_index,
        encounter_type: kind,
        encounters: species
            .iter()
            .map(|&s| Encounter::new(s, 10, 12))
            .collect(),
        ..EncounterArea::default()
    }
}

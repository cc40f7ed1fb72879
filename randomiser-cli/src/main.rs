use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use wild_randomiser_core::{
    run, EncounterSettings, RandomiserSettings, RegionGrouping, Result, TypeThemeMode,
};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Grouping {
    None,
    EncounterSet,
    Map,
    NamedLocation,
    Game,
}

impl From<Grouping> for RegionGrouping {
    fn from(g: Grouping) -> Self {
        match g {
            Grouping::None => RegionGrouping::None,
            Grouping::EncounterSet => RegionGrouping::EncounterSet,
            Grouping::Map => RegionGrouping::Map,
            Grouping::NamedLocation => RegionGrouping::NamedLocation,
            Grouping::Game => RegionGrouping::Game,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ThemeMode {
    Off,
    RandomThemes,
    KeepPrimary,
}

impl From<ThemeMode> for TypeThemeMode {
    fn from(m: ThemeMode) -> Self {
        match m {
            ThemeMode::Off => TypeThemeMode::Off,
            ThemeMode::RandomThemes => TypeThemeMode::RandomThemes,
            ThemeMode::KeepPrimary => TypeThemeMode::KeepPrimary,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "wild-randomiser", version, about = "Wild encounter randomiser")]
struct Args {
    /// Game dump to read (.json or .json.gz)
    #[arg(long)]
    input: PathBuf,

    #[arg(long)]
    output: PathBuf,

    #[arg(long)]
    seed: u64,

    /// JSON file with encounter settings; flags below override it.
    #[arg(long, value_name = "JSON")]
    settings: Option<PathBuf>,

    /// Only rescale levels; keep every species.
    #[arg(long)]
    levels_only: bool,

    #[arg(long)]
    time_based_encounters: bool,

    #[arg(long, value_enum)]
    grouping: Option<Grouping>,

    #[arg(long)]
    split_by_encounter_type: bool,

    #[arg(long, value_enum)]
    type_themes: Option<ThemeMode>,

    #[arg(long)]
    keep_type_themes: bool,

    #[arg(long)]
    keep_evolution_families: bool,

    #[arg(long)]
    catch_em_all: bool,

    #[arg(long)]
    similar_strength: bool,

    #[arg(long)]
    balance_shaking_grass: bool,

    #[arg(long)]
    allow_legendaries: bool,

    /// Percentage applied to every encounter level (-100 to 100).
    #[arg(long, allow_hyphen_values = true)]
    level_modifier: Option<i32>,

    #[arg(long)]
    allow_alt_formes: bool,

    #[arg(long)]
    ban_irregular_alt_formes: bool,

    #[arg(long)]
    abilities_randomized: bool,

    #[arg(long, default_value_t = false)]
    debug: bool,
}

impl Args {
    fn encounter_settings(&self) -> Result<EncounterSettings> {
        let mut s: EncounterSettings = match &self.settings {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => EncounterSettings::default(),
        };
        if self.levels_only {
            s.randomize_wild_pokemon = false;
        }
        if let Some(g) = self.grouping {
            s.region_grouping = g.into();
        }
        if let Some(m) = self.type_themes {
            s.type_theme_mode = m.into();
        }
        if let Some(m) = self.level_modifier {
            s.level_modifier = m;
        }
        if self.allow_legendaries {
            s.block_legendaries = false;
        }
        s.use_time_based_encounters |= self.time_based_encounters;
        s.split_by_encounter_type |= self.split_by_encounter_type;
        s.keep_type_themes |= self.keep_type_themes;
        s.keep_evolution_families |= self.keep_evolution_families;
        s.catch_em_all |= self.catch_em_all;
        s.similar_strength |= self.similar_strength;
        s.balance_shaking_grass |= self.balance_shaking_grass;
        s.allow_alt_formes |= self.allow_alt_formes;
        s.ban_irregular_alt_formes |= self.ban_irregular_alt_formes;
        s.abilities_randomized |= self.abilities_randomized;
        Ok(s)
    }
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let encounters = match args.encounter_settings() {
        Ok(s) => s,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };
    let settings = RandomiserSettings {
        seed: args.seed,
        debug: args.debug,
        input_path: args.input,
        output_path: args.output,
        encounters,
    };

    if let Err(err) = run(settings) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

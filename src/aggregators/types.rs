//! Maximal type analysis.
//!
//! Finds the cards whose set of types cannot be extended: no other card's
//! types are a strict superset. The "with effects" variant first applies
//! the type-granting global effects of a fixed list of cards.

use crate::aggregators::first_card::by_printing_order;
use crate::aggregators::{insert_link, row, Aggregator, ColumnDef, Row};
use crate::cards::constants::BASIC_LAND_TYPES;
use crate::cards::{face_types, is_all_creature_types, is_permanent, is_traditional_card, sort_key};
use crate::models::{Card, CardFace, Printing};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, error};

/// Creature and land type lists from the comprehensive rules.
#[derive(Debug, Clone, Default)]
pub struct TypeTables {
    pub creature_types: BTreeSet<String>,
    pub land_types: BTreeSet<String>,
}

impl TypeTables {
    /// Load both tables; an unreadable file yields an empty table.
    pub fn load(creature_types_file: &Path, land_types_file: &Path) -> Self {
        Self {
            creature_types: load_types(creature_types_file),
            land_types: load_types(land_types_file),
        }
    }

    fn basic_land_types() -> BTreeSet<String> {
        BASIC_LAND_TYPES.iter().map(|t| t.to_string()).collect()
    }

    /// Land types that are not basic land types.
    pub fn nonbasic_land_types(&self) -> BTreeSet<String> {
        self.land_types
            .difference(&Self::basic_land_types())
            .cloned()
            .collect()
    }
}

/// Read a one-type-per-line file.
fn load_types(path: &Path) -> BTreeSet<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let types: BTreeSet<String> = content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect();
            debug!("Loaded {} types from {}", types.len(), path.display());
            types
        }
        Err(e) => {
            error!("Failed to load types from {}: {}", path.display(), e);
            BTreeSet::new()
        }
    }
}

/// A card whose static ability changes the types of other objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalEffect {
    InBolassClutches,
    RimefeatherOwl,
    EnchantedEvening,
    MycosynthLattice,
    MarchOfTheMachines,
    MaskwoodNexus,
    LifeAndLimb,
    PrismaticOmen,
    OmoQueenOfVesuva,
}

impl GlobalEffect {
    /// All effects, in the order they are applied.
    pub const ALL: [GlobalEffect; 9] = [
        GlobalEffect::InBolassClutches,
        GlobalEffect::RimefeatherOwl,
        GlobalEffect::EnchantedEvening,
        GlobalEffect::MycosynthLattice,
        GlobalEffect::MarchOfTheMachines,
        GlobalEffect::MaskwoodNexus,
        GlobalEffect::LifeAndLimb,
        GlobalEffect::PrismaticOmen,
        GlobalEffect::OmoQueenOfVesuva,
    ];

    /// Apply this effect to a set of types in place.
    pub fn apply(&self, types: &mut BTreeSet<String>, tables: &TypeTables) {
        fn has(types: &BTreeSet<String>, t: &str) -> bool {
            types.contains(t)
        }
        fn add(types: &mut BTreeSet<String>, list: &[&str]) {
            types.extend(list.iter().map(|t| t.to_string()));
        }

        match self {
            GlobalEffect::InBolassClutches if is_permanent(types) => add(types, &["Legendary"]),
            GlobalEffect::RimefeatherOwl if is_permanent(types) => add(types, &["Snow"]),
            GlobalEffect::EnchantedEvening if is_permanent(types) => add(types, &["Enchantment"]),
            GlobalEffect::MycosynthLattice if is_permanent(types) => add(types, &["Artifact"]),
            GlobalEffect::MarchOfTheMachines
                if has(types, "Artifact") && !has(types, "Creature") =>
            {
                add(types, &["Creature"])
            }
            GlobalEffect::MaskwoodNexus if has(types, "Creature") => {
                types.extend(tables.creature_types.iter().cloned())
            }
            GlobalEffect::LifeAndLimb if has(types, "Forest") || has(types, "Saproling") => {
                add(types, &["Creature", "Land", "Saproling", "Forest"])
            }
            GlobalEffect::PrismaticOmen if has(types, "Land") => add(types, &BASIC_LAND_TYPES),
            GlobalEffect::OmoQueenOfVesuva if has(types, "Land") => {
                add(types, &BASIC_LAND_TYPES);
                types.extend(tables.nonbasic_land_types());
            }
            GlobalEffect::OmoQueenOfVesuva if has(types, "Creature") => {
                types.extend(tables.creature_types.iter().cloned())
            }
            _ => {}
        }
    }
}

/// Whether global effects are considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMode {
    Printed,
    WithEffects,
}

const PRINTED_EXPLANATION: &str = "\
## What are Maximal Printed Types?

This report lists the cards with the most types **as printed**, ignoring any other cards in play.

A card has maximal types when no other card's printed types are a strict superset of its own.

**Special handling:**
- Cards with **Changeling** (and Mistform Ultimus) have every creature type
- **Planar Nexus** has every nonbasic land type
- Only traditional cards are included (no silver borders, tokens, emblems or memorabilia)

**Type lag:** new creature and land types appear on cards before the comprehensive rules list them. \
Run the `update-types` command to refresh the type tables.";

const EFFECTS_EXPLANATION: &str = "\
## What are Maximal Types with Global Effects?

This report lists the cards with the most types once the **global effects** of other permanents are applied.

## Global Effects Considered

**Type-granting effects:**
- **In Bolas's Clutches** makes permanents Legendary
- **Rimefeather Owl** makes permanents Snow
- **Enchanted Evening** makes permanents Enchantments
- **Mycosynth Lattice** makes permanents Artifacts
- **March of the Machines** makes artifacts Creatures

**Creature type effects:**
- **Maskwood Nexus** gives creatures every creature type
- Cards with **Changeling** already have every creature type

**Land type effects:**
- **Life and Limb** makes Forests and Saprolings into Creature Land Saproling Forests
- **Prismatic Omen** gives lands every basic land type
- **Planar Nexus** has every nonbasic land type
- **Omo, Queen of Vesuva** gives lands every land type and creatures every creature type

**Type lag:** effects that grant every creature or land type only include the types refreshed by the `update-types` command.";

/// Keeps the antichain of maximal type sets with their earliest printing.
pub struct MaximalTypesAggregator {
    mode: TypeMode,
    tables: TypeTables,
    nonbasic_land_types: BTreeSet<String>,
    maximal: BTreeMap<BTreeSet<String>, Printing>,
}

impl MaximalTypesAggregator {
    pub fn new(mode: TypeMode, tables: TypeTables) -> Self {
        let nonbasic_land_types = tables.nonbasic_land_types();
        Self {
            mode,
            tables,
            nonbasic_land_types,
            maximal: BTreeMap::new(),
        }
    }

    pub fn printed(tables: TypeTables) -> Self {
        Self::new(TypeMode::Printed, tables)
    }

    pub fn with_effects(tables: TypeTables) -> Self {
        Self::new(TypeMode::WithEffects, tables)
    }

    /// Types a face has under this aggregator's mode, or `None` to skip it.
    fn effective_types(&self, face: &CardFace) -> Option<BTreeSet<String>> {
        let mut types = face_types(face);
        if types.contains("Token") || types.contains("Emblem") {
            return None;
        }

        if is_all_creature_types(face) {
            types.extend(self.tables.creature_types.iter().cloned());
        }
        if face.name.as_deref() == Some("Planar Nexus") {
            types.extend(self.nonbasic_land_types.iter().cloned());
        }

        if self.mode == TypeMode::WithEffects {
            for effect in GlobalEffect::ALL {
                effect.apply(&mut types, &self.tables);
            }
        }

        Some(types)
    }

    fn process_face(&mut self, face: &CardFace, card: &Card) {
        let Some(types) = self.effective_types(face) else {
            return;
        };

        if let Some(existing) = self.maximal.get(&types) {
            if sort_key(card) < existing.sort_key {
                self.maximal.insert(types, Printing::from_card(card));
            }
            return;
        }

        if self.maximal.keys().any(|existing| types.is_subset(existing)) {
            return;
        }

        self.maximal.retain(|existing, _| !existing.is_subset(&types));
        self.maximal.insert(types, Printing::from_card(card));
    }
}

impl Aggregator for MaximalTypesAggregator {
    fn name(&self) -> &str {
        match self.mode {
            TypeMode::Printed => "maximal_printed_types",
            TypeMode::WithEffects => "maximal_types_with_effects",
        }
    }

    fn display_name(&self) -> &str {
        match self.mode {
            TypeMode::Printed => "Maximal Printed Types",
            TypeMode::WithEffects => "Maximal Types with Global Effects",
        }
    }

    fn description(&self) -> &str {
        match self.mode {
            TypeMode::Printed => "Cards whose printed types no other card exceeds",
            TypeMode::WithEffects => "Cards with maximal types, considering global effects",
        }
    }

    fn explanation(&self) -> &str {
        match self.mode {
            TypeMode::Printed => PRINTED_EXPLANATION,
            TypeMode::WithEffects => EFFECTS_EXPLANATION,
        }
    }

    fn columns(&self) -> Vec<ColumnDef> {
        let types_column = match self.mode {
            TypeMode::Printed => ColumnDef::new("types", "Types"),
            TypeMode::WithEffects => ColumnDef::new("originalTypes", "Original Types"),
        };
        vec![
            types_column.width(240),
            ColumnDef::new("name", "Name").width(160).card_link(),
            ColumnDef::new("set", "Set").width(100),
            ColumnDef::new("releaseDate", "Release Date"),
        ]
    }

    fn process_card(&mut self, card: &Card) {
        if !is_traditional_card(card) {
            return;
        }
        for face in card.faces() {
            self.process_face(&face, card);
        }
    }

    fn sorted_rows(&self) -> Vec<Row> {
        let types_field = match self.mode {
            TypeMode::Printed => "types",
            TypeMode::WithEffects => "originalTypes",
        };

        by_printing_order(&self.maximal)
            .into_iter()
            .map(|(_, printing)| {
                let mut row = row(json!({
                    "name": printing.name,
                    "set": printing.set,
                    "releaseDate": printing.release_date,
                }));
                row.insert(types_field.to_string(), json!(printing.type_line));
                insert_link(&mut row, &printing.scryfall_uri, &printing.image_uri);
                row
            })
            .collect()
    }
}

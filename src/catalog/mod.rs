//! The built-in animal list and the order animals are served in.

pub mod deck;
pub mod record;

pub use deck::Deck;
pub use record::{AnimalRecord, Category, CategoryChoice, Mode};

use include_dir::{include_dir, Dir};
use rand::{rngs::StdRng, SeedableRng};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use tracing::debug;

use crate::round::normalize_target;

static ANIMAL_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/animals");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("animal file {file} is not valid utf-8")]
    Encoding { file: String },

    #[error("could not parse animal file {file}: {source}")]
    Parse {
        file: String,
        source: serde_json::Error,
    },

    #[error("{name:?} has no usable {mode} answer")]
    EmptyAnswer { name: String, mode: Mode },

    #[error("{name:?} has no image reference")]
    EmptyImageRef { name: String },

    #[error("no animals in {0}")]
    NoAnimals(String),
}

#[derive(Deserialize)]
struct AnimalFile {
    category: Category,
    animals: Vec<AnimalEntry>,
}

#[derive(Deserialize)]
struct AnimalEntry {
    common_name: String,
    scientific_name: String,
    image_ref: String,
    fact: String,
}

/// Parses every bundled `src/animals/*.json` file.
pub fn builtin_records() -> Result<Vec<AnimalRecord>, CatalogError> {
    let mut files: Vec<_> = ANIMAL_DIR
        .files()
        .filter(|f| f.path().extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort_by(|a, b| a.path().cmp(b.path()));

    let mut records = Vec::new();
    for file in files {
        let name = file.path().display().to_string();
        let text = file
            .contents_utf8()
            .ok_or_else(|| CatalogError::Encoding { file: name.clone() })?;
        let parsed: AnimalFile =
            serde_json::from_str(text).map_err(|source| CatalogError::Parse {
                file: name.clone(),
                source,
            })?;

        records.extend(parsed.animals.into_iter().map(|entry| AnimalRecord {
            common_name: entry.common_name,
            scientific_name: entry.scientific_name,
            image_ref: entry.image_ref,
            fact: entry.fact,
            category: parsed.category,
        }));
    }
    Ok(records)
}

/// Every record has to give the round engine something to type in both modes.
pub fn validate(records: &[AnimalRecord]) -> Result<(), CatalogError> {
    for record in records {
        for mode in [Mode::Easy, Mode::Hard] {
            if normalize_target(record.target(mode)).is_empty() {
                return Err(CatalogError::EmptyAnswer {
                    name: record.common_name.clone(),
                    mode,
                });
            }
        }
        if record.image_ref.trim().is_empty() {
            return Err(CatalogError::EmptyImageRef {
                name: record.common_name.clone(),
            });
        }
    }
    Ok(())
}

#[derive(Debug)]
pub struct Catalog {
    records: Vec<AnimalRecord>,
    decks: HashMap<CategoryChoice, Deck>,
    rng: StdRng,
}

impl Catalog {
    /// The bundled animals in a random order.
    pub fn load() -> Result<Self, CatalogError> {
        Self::new(builtin_records()?, StdRng::from_entropy())
    }

    /// The bundled animals in a reproducible order.
    pub fn load_seeded(seed: u64) -> Result<Self, CatalogError> {
        Self::new(builtin_records()?, StdRng::seed_from_u64(seed))
    }

    pub fn new(records: Vec<AnimalRecord>, rng: StdRng) -> Result<Self, CatalogError> {
        validate(&records)?;
        debug!(count = records.len(), "catalog loaded");
        Ok(Self {
            records,
            decks: HashMap::new(),
            rng,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[AnimalRecord] {
        &self.records
    }

    /// Categories that have at least one animal, in declaration order.
    pub fn all_categories(&self) -> BTreeSet<Category> {
        self.records.iter().map(|r| r.category).collect()
    }

    /// What the menu offers: everything, then each category on its own.
    pub fn choices(&self) -> Vec<CategoryChoice> {
        std::iter::once(CategoryChoice::All)
            .chain(self.all_categories().into_iter().map(CategoryChoice::Only))
            .collect()
    }

    /// Next animal for `choice`. Animals do not repeat until every animal in
    /// the choice has been shown.
    pub fn next_animal(&mut self, choice: CategoryChoice) -> Result<&AnimalRecord, CatalogError> {
        let pool: Vec<usize> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| choice.includes(r.category))
            .map(|(i, _)| i)
            .collect();

        let deck = self.decks.entry(choice).or_default();
        let index = deck
            .draw(&pool, &mut self.rng)
            .ok_or_else(|| CatalogError::NoAnimals(choice.label()))?;
        Ok(&self.records[index])
    }
}

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[strum(to_string = "Reptiles")]
    Reptile,
    #[strum(to_string = "Sea creatures")]
    SeaCreature,
}

/// Which animals a game draws from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryChoice {
    #[default]
    All,
    Only(Category),
}

impl CategoryChoice {
    pub fn includes(&self, category: Category) -> bool {
        match self {
            CategoryChoice::All => true,
            CategoryChoice::Only(only) => *only == category,
        }
    }

    pub fn label(&self) -> String {
        match self {
            CategoryChoice::All => "All animals".to_string(),
            CategoryChoice::Only(category) => category.to_string(),
        }
    }
}

/// Easy asks for the common name, Hard for the scientific one.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Easy,
    Hard,
}

impl Mode {
    pub fn prompt(&self) -> &'static str {
        match self {
            Mode::Easy => "Type the common name:",
            Mode::Hard => "Type the scientific name:",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimalRecord {
    pub common_name: String,
    pub scientific_name: String,
    /// Wikimedia Commons file name, e.g. `Iguana_iguana_Portoviejo_02.jpg`.
    pub image_ref: String,
    pub fact: String,
    pub category: Category,
}

impl AnimalRecord {
    /// The name the player has to type in `mode`.
    pub fn target(&self, mode: Mode) -> &str {
        match mode {
            Mode::Easy => &self.common_name,
            Mode::Hard => &self.scientific_name,
        }
    }

    /// Public Commons page for the image, used for attribution.
    pub fn commons_page_url(&self) -> String {
        format!(
            "https://commons.wikimedia.org/wiki/File:{}",
            self.image_ref.replace(' ', "_")
        )
    }
}

// lib.rs
//! # PantryCycle
//!
//! Rule-based menstrual-phase labelling for recipe nutrition data. The crate
//! takes per-serving nutrient profiles, tags each recipe with one of four
//! phase labels via a hand-tuned threshold cascade, and trains a decision
//! tree on the labelled data so the rules can be approximated by a compact
//! model.
//!
//! ## `phase_utils`
//!
//! - **Purpose**: The core classification logic.
//! - **Features**:
//!   - **NutrientProfile**: Per-serving nutrient record (14 feature columns),
//!     deserializable straight from raw nutrition JSON blobs with snake_case
//!     and `_mg`-suffixed key aliases; absent fields default to 0.
//!   - **PhaseLabel**: The four phase tags (`Menstrual`, `Follicular`,
//!     `Ovulation`, `Luteal`) with a stable integer encoding for model
//!     training.
//!   - **classify_menstrual_phase**: A pure, total, deterministic threshold
//!     cascade - ordered condition/label pairs, first match wins, `Ovulation`
//!     fallback.
//!
//! ## `dataset_utils`
//!
//! - **Purpose**: Assemble and prepare recipe datasets for training.
//! - **Features**:
//!   - **RecipeDataset**: A chainable in-memory dataset builder supporting:
//!   - **CSV Load and Save**: Read recipe rows from a CSV file, write
//!     labelled datasets back out.
//!   - **Dataset Composition**: Append rows, concatenate datasets, and
//!     deduplicate recipes keeping the first occurrence.
//!   - **Bulk Labelling**: Tag every record with the phase cascade, in
//!     parallel.
//!   - **Distribution Reports**: Per-phase counts and percentages against
//!     the 15-30% balance target.
//!   - **Seeded Splits**: Reproducible train/test partitioning.
//!
//! ## `tree_utils`
//!
//! - **Purpose**: Train and score a decision tree on labelled datasets.
//! - **Features**:
//!   - **PhaseTree**: Fit a gini decision tree (smartcore) on the feature
//!     vectors of a labelled dataset, then predict phases for new profiles.
//!   - **ModelEvaluation**: Accuracy, confusion matrix, and per-phase
//!     precision/recall/F1, with a printable report.
//!
//! ## License
//!
//! This project is licensed under the MIT License.

pub mod dataset_utils;
pub mod phase_utils;
pub mod tree_utils;

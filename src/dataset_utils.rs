// dataset_utils.rs
use crate::phase_utils::{classify_menstrual_phase, NutrientProfile, PhaseLabel, FEATURE_COLUMNS};
use csv::Writer;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde_json::{Map, Number, Value};
use std::collections::HashSet;
use std::error::Error;
use std::fs::File;
use std::str::FromStr;

/// Phase-tag column name used when saving a labelled dataset.
pub const PHASE_TAG_COLUMN: &str = "Menstrual Phase Tag";

/// Represents one recipe in a dataset: a title, its per-serving nutrient
/// profile, and the phase tag once `label_phases` has run.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeRecord {
    pub title: String,
    pub nutrients: NutrientProfile,
    pub phase: Option<PhaseLabel>,
}

/// Represents a RecipeDataset object. This struct holds recipe records along
/// with an internal error handler: once a chainable method fails, subsequent
/// chained calls become no-ops and the first error is retained for
/// inspection via `get_error`.
#[derive(Debug)]
pub struct RecipeDataset {
    records: Vec<RecipeRecord>,
    error: Option<Box<dyn Error>>,
}

impl Default for RecipeDataset {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipeDataset {
    /// Creates an empty dataset.
    pub fn new() -> Self {
        RecipeDataset {
            records: Vec::new(),
            error: None,
        }
    }

    /// Creates a dataset from pre-built records.
    pub fn from_records(records: Vec<RecipeRecord>) -> Self {
        RecipeDataset {
            records,
            error: None,
        }
    }

    /// Creates a deep copy of the dataset, without carrying over any error.
    pub fn from_copy(&self) -> Self {
        RecipeDataset {
            records: self.records.clone(),
            error: None,
        }
    }

    /// Loads a dataset from a CSV file. The title column is the header named
    /// `Recipe`, or failing that the first header containing `recipe` or
    /// `title` (case-insensitive). Any of the `FEATURE_COLUMNS` present are
    /// mapped onto the nutrient profile; unparseable or missing numeric cells
    /// become 0. A phase tag column, if present, is parsed into the record's
    /// label.
    ///
    /// ```
    /// use pantrycycle::dataset_utils::RecipeDataset;
    ///
    /// let dataset = RecipeDataset::from_csv("recipes.csv");
    /// if let Some(e) = dataset.get_error() {
    ///     eprintln!("Load failed: {}", e);
    /// }
    /// ```
    pub fn from_csv(file_path: &str) -> Self {
        let mut dataset = RecipeDataset::new();

        let file = match File::open(file_path) {
            Ok(file) => file,
            Err(e) => {
                dataset.error = Some(Box::new(e));
                return dataset;
            }
        };

        let mut rdr = csv::Reader::from_reader(file);
        let headers: Vec<String> = match rdr.headers() {
            Ok(hdrs) => hdrs.iter().map(String::from).collect(),
            Err(e) => {
                dataset.error = Some(Box::new(e));
                return dataset;
            }
        };

        let title_idx = headers.iter().position(|h| h == "Recipe").or_else(|| {
            headers.iter().position(|h| {
                let lower = h.to_lowercase();
                lower.contains("recipe") || lower.contains("title")
            })
        });
        let phase_idx = headers.iter().position(|h| h == PHASE_TAG_COLUMN);

        for result in rdr.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    dataset.error = Some(Box::new(e));
                    break;
                }
            };

            let mut cells = Map::new();
            for (i, header) in headers.iter().enumerate() {
                if !FEATURE_COLUMNS.contains(&header.as_str()) {
                    continue;
                }
                let value = record
                    .get(i)
                    .and_then(|cell| f64::from_str(cell.trim()).ok())
                    .unwrap_or(0.0);
                if let Some(number) = Number::from_f64(value) {
                    cells.insert(header.clone(), Value::Number(number));
                }
            }

            let nutrients = match serde_json::from_value(Value::Object(cells)) {
                Ok(nutrients) => nutrients,
                Err(e) => {
                    dataset.error = Some(Box::new(e));
                    break;
                }
            };

            let title = title_idx
                .and_then(|i| record.get(i))
                .unwrap_or("")
                .to_string();
            let phase = phase_idx
                .and_then(|i| record.get(i))
                .and_then(|cell| cell.parse::<PhaseLabel>().ok());

            dataset.records.push(RecipeRecord {
                title,
                nutrients,
                phase,
            });
        }

        dataset
    }

    /// Saves the dataset as a CSV file with a `Recipe` column, the fourteen
    /// feature columns, and the phase tag column (blank for unlabelled rows).
    pub fn save_as(&mut self, file_path: &str) -> Result<&mut Self, Box<dyn Error>> {
        let mut wtr = Writer::from_path(file_path)?;

        let mut header: Vec<&str> = vec!["Recipe"];
        header.extend(FEATURE_COLUMNS);
        header.push(PHASE_TAG_COLUMN);
        wtr.write_record(&header)?;

        for record in &self.records {
            let mut row: Vec<String> = vec![record.title.clone()];
            for value in record.nutrients.feature_vector() {
                row.push(value.to_string());
            }
            row.push(
                record
                    .phase
                    .map(|phase| phase.as_str().to_string())
                    .unwrap_or_default(),
            );
            wtr.write_record(&row)?;
        }

        wtr.flush()?;
        Ok(self)
    }

    /// Adds one recipe to the dataset.
    pub fn add_recipe(&mut self, title: &str, nutrients: NutrientProfile) -> &mut Self {
        if self.error.is_none() {
            self.records.push(RecipeRecord {
                title: title.to_string(),
                nutrients,
                phase: None,
            });
        }
        self
    }

    /// Appends all records of another dataset to this one.
    pub fn union_with(&mut self, other: &RecipeDataset) -> &mut Self {
        if self.error.is_none() {
            self.records.extend_from_slice(&other.records);
        }
        self
    }

    /// Removes duplicate recipes, keeping the first occurrence of each title.
    /// Records with a blank title are deduplicated on their full feature
    /// vector instead.
    pub fn remove_duplicate_titles(&mut self) -> &mut Self {
        if self.error.is_some() {
            return self;
        }

        let original_count = self.records.len();
        let mut seen = HashSet::new();
        self.records.retain(|record| {
            let key = if record.title.trim().is_empty() {
                format!("{:?}", record.nutrients.feature_vector())
            } else {
                record.title.clone()
            };
            seen.insert(key)
        });
        let duplicates_removed = original_count - self.records.len();

        println!("Number of duplicate recipes removed: {}", duplicates_removed);

        self
    }

    /// Tags every record with its menstrual phase. Classification is pure and
    /// per-record, so the pass runs in parallel.
    pub fn label_phases(&mut self) -> &mut Self {
        if self.error.is_none() {
            self.records
                .par_iter_mut()
                .for_each(|record| record.phase = Some(classify_menstrual_phase(&record.nutrients)));
        }
        self
    }

    /// Returns `(label, count, percentage)` for each phase, in reporting
    /// order. Unlabelled records are not counted.
    pub fn phase_distribution(&self) -> Vec<(PhaseLabel, usize, f64)> {
        let total = self.records.len();
        PhaseLabel::ALL
            .iter()
            .map(|&label| {
                let count = self
                    .records
                    .iter()
                    .filter(|record| record.phase == Some(label))
                    .count();
                let percentage = if total == 0 {
                    0.0
                } else {
                    count as f64 / total as f64 * 100.0
                };
                (label, count, percentage)
            })
            .collect()
    }

    /// Prints the phase distribution, marking phases inside the 15-30% target
    /// share with a check.
    pub fn print_phase_distribution(&self) {
        for (label, count, percentage) in self.phase_distribution() {
            let status = if (15.0..=30.0).contains(&percentage) {
                "✓"
            } else {
                "✗"
            };
            println!(
                "{} {:12}: {:4} ({:5.2}%)",
                status,
                label.as_str(),
                count,
                percentage
            );
        }
    }

    /// Splits the dataset into a train and a test partition by a seeded
    /// shuffle of record indices. The train partition receives
    /// `floor(len * train_fraction)` records; every record lands in exactly
    /// one partition, and the same seed always produces the same split.
    pub fn shuffle_split(&self, train_fraction: f64, seed: u64) -> (RecipeDataset, RecipeDataset) {
        let mut indices: Vec<usize> = (0..self.records.len()).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let train_size = (self.records.len() as f64 * train_fraction) as usize;
        let train_records = indices[..train_size]
            .iter()
            .map(|&i| self.records[i].clone())
            .collect();
        let test_records = indices[train_size..]
            .iter()
            .map(|&i| self.records[i].clone())
            .collect();

        (
            RecipeDataset::from_records(train_records),
            RecipeDataset::from_records(test_records),
        )
    }

    /// Returns the records of the dataset.
    pub fn records(&self) -> &[RecipeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the first error hit by a chain of dataset operations, if any.
    pub fn get_error(&self) -> Option<&(dyn Error + 'static)> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Write;

    fn profile(iron: f64, vitamin_c: f64, zinc: f64, magnesium: f64, fiber: f64) -> NutrientProfile {
        NutrientProfile {
            iron,
            vitamin_c,
            zinc,
            magnesium,
            fiber,
            ..Default::default()
        }
    }

    #[test]
    fn from_csv_maps_feature_columns_and_defaults_missing_cells() {
        let mut tmp_file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        writeln!(tmp_file, "Recipe,iron,vitamin C,zinc,notes").unwrap();
        writeln!(tmp_file, "Lentil Soup,4,25,1.0,hearty").unwrap();
        writeln!(tmp_file, "Plain Rice,,not-a-number,0.4,bland").unwrap();
        tmp_file.flush().unwrap();

        let dataset = RecipeDataset::from_csv(tmp_file.path().to_str().unwrap());
        assert!(dataset.get_error().is_none());
        assert_eq!(dataset.len(), 2);

        let records = dataset.records();
        assert_eq!(records[0].title, "Lentil Soup");
        assert_eq!(records[0].nutrients.iron, 4.0);
        assert_eq!(records[0].nutrients.vitamin_c, 25.0);
        // magnesium column absent, iron cell empty, vitamin C unparseable
        assert_eq!(records[0].nutrients.magnesium, 0.0);
        assert_eq!(records[1].nutrients.iron, 0.0);
        assert_eq!(records[1].nutrients.vitamin_c, 0.0);
        assert_eq!(records[1].nutrients.zinc, 0.4);
    }

    #[test]
    fn from_csv_reports_missing_file() {
        let dataset = RecipeDataset::from_csv("/no/such/file.csv");
        assert!(dataset.get_error().is_some());
        assert!(dataset.is_empty());
    }

    #[test]
    fn save_and_reload_round_trips_labels() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let path = tmp_dir.path().join("labelled.csv");
        let path_str = path.to_str().unwrap();

        let mut dataset = RecipeDataset::new();
        dataset
            .add_recipe("Beef Stew", profile(5.0, 30.0, 2.0, 50.0, 0.0))
            .add_recipe("Bran Bowl", profile(0.0, 0.0, 0.0, 120.0, 11.0))
            .label_phases();
        dataset.save_as(path_str).unwrap();

        let reloaded = RecipeDataset::from_csv(path_str);
        assert!(reloaded.get_error().is_none());
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.records()[0].phase, Some(PhaseLabel::Menstrual));
        assert_eq!(reloaded.records()[1].phase, Some(PhaseLabel::Luteal));
        assert_eq!(reloaded.records()[0].nutrients, dataset.records()[0].nutrients);
    }

    #[test]
    fn remove_duplicate_titles_keeps_first_occurrence() {
        let mut dataset = RecipeDataset::new();
        dataset
            .add_recipe("Pancakes", profile(1.0, 2.0, 0.1, 10.0, 1.0))
            .add_recipe("Pancakes", profile(9.0, 9.0, 9.0, 9.0, 9.0))
            .add_recipe("Omelette", profile(2.0, 3.0, 1.1, 20.0, 0.0))
            .remove_duplicate_titles();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records()[0].title, "Pancakes");
        assert_eq!(dataset.records()[0].nutrients.iron, 1.0);
    }

    #[test]
    fn blank_titles_deduplicate_on_nutrients() {
        let mut dataset = RecipeDataset::new();
        dataset
            .add_recipe("", profile(1.0, 2.0, 0.1, 10.0, 1.0))
            .add_recipe("", profile(1.0, 2.0, 0.1, 10.0, 1.0))
            .add_recipe("", profile(3.0, 2.0, 0.1, 10.0, 1.0))
            .remove_duplicate_titles();

        assert_eq!(dataset.len(), 2);
    }

    #[test]
    fn union_concatenates_in_order() {
        let mut left = RecipeDataset::new();
        left.add_recipe("A", profile(1.0, 1.0, 0.0, 0.0, 0.0));
        let mut right = RecipeDataset::new();
        right.add_recipe("B", profile(2.0, 2.0, 0.0, 0.0, 0.0));

        left.union_with(&right);
        assert_eq!(left.len(), 2);
        assert_eq!(left.records()[1].title, "B");
    }

    #[test]
    fn label_phases_tags_every_record() {
        let mut dataset = RecipeDataset::new();
        dataset
            .add_recipe("Menstrual", profile(4.0, 25.0, 0.0, 0.0, 0.0))
            .add_recipe("Ovulation", profile(0.0, 20.0, 1.5, 50.0, 0.0))
            .add_recipe("Follicular", profile(2.0, 16.0, 1.2, 50.0, 0.0))
            .add_recipe("Luteal", profile(0.0, 0.0, 0.0, 100.0, 0.0))
            .label_phases();

        let distribution = dataset.phase_distribution();
        for (label, count, percentage) in distribution {
            assert_eq!(count, 1, "one record per phase, got {} for {}", count, label);
            assert!((percentage - 25.0).abs() < 1e-9);
        }
    }

    #[test]
    fn shuffle_split_is_seeded_disjoint_and_exhaustive() {
        let mut dataset = RecipeDataset::new();
        for i in 0..50 {
            dataset.add_recipe(&format!("recipe-{}", i), profile(i as f64, 0.0, 0.0, 0.0, 0.0));
        }

        let (train, test) = dataset.shuffle_split(0.8, 42);
        assert_eq!(train.len(), 40);
        assert_eq!(test.len(), 10);

        let train_titles: HashSet<String> =
            train.records().iter().map(|r| r.title.clone()).collect();
        let test_titles: HashSet<String> = test.records().iter().map(|r| r.title.clone()).collect();
        assert!(train_titles.is_disjoint(&test_titles));
        assert_eq!(train_titles.len() + test_titles.len(), 50);

        let (train_again, test_again) = dataset.shuffle_split(0.8, 42);
        assert_eq!(train.records(), train_again.records());
        assert_eq!(test.records(), test_again.records());

        let (train_other, _) = dataset.shuffle_split(0.8, 7);
        assert_eq!(train_other.len(), 40);
    }
}

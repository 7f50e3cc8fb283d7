// tree_utils.rs
use crate::dataset_utils::RecipeDataset;
use crate::phase_utils::{NutrientProfile, PhaseLabel};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_classifier::{
    DecisionTreeClassifier, DecisionTreeClassifierParameters,
};
use std::error::Error;
use std::io::{Error as IoError, ErrorKind};

/// Represents the training knobs of a phase decision tree. The defaults
/// (depth 5, seed 42) match the reference training run.
#[derive(Debug, Clone, Copy)]
pub struct PhaseTreeConfig {
    pub max_depth: u16,
    pub seed: u64,
}

impl Default for PhaseTreeConfig {
    fn default() -> Self {
        PhaseTreeConfig {
            max_depth: 5,
            seed: 42,
        }
    }
}

/// Represents a fitted decision tree mapping nutrient feature vectors to
/// phase labels.
pub struct PhaseTree {
    model: DecisionTreeClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>,
}

impl PhaseTree {
    /// Fits a gini decision tree on a fully labelled dataset. Fails on an
    /// empty dataset, on a dataset carrying an unhandled load error, or on
    /// any unlabelled record.
    ///
    /// ```
    /// use pantrycycle::dataset_utils::RecipeDataset;
    /// use pantrycycle::tree_utils::{PhaseTree, PhaseTreeConfig};
    ///
    /// let mut dataset = RecipeDataset::from_csv("recipes.csv");
    /// dataset.label_phases();
    /// let tree = PhaseTree::fit(&dataset, PhaseTreeConfig::default()).unwrap();
    /// let evaluation = tree.evaluate(&dataset).unwrap();
    /// evaluation.print_report();
    /// ```
    pub fn fit(dataset: &RecipeDataset, config: PhaseTreeConfig) -> Result<Self, Box<dyn Error>> {
        if let Some(e) = dataset.get_error() {
            return Err(IoError::new(ErrorKind::InvalidInput, e.to_string()).into());
        }
        if dataset.is_empty() {
            return Err(
                IoError::new(ErrorKind::InvalidInput, "Cannot train on an empty dataset").into(),
            );
        }

        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(dataset.len());
        let mut targets: Vec<u32> = Vec::with_capacity(dataset.len());
        for record in dataset.records() {
            let phase = record.phase.ok_or_else(|| {
                IoError::new(
                    ErrorKind::InvalidInput,
                    format!("Unlabelled record: {}", record.title),
                )
            })?;
            rows.push(record.nutrients.feature_vector().to_vec());
            targets.push(phase.code());
        }

        let row_refs: Vec<&[f64]> = rows.iter().map(|row| row.as_slice()).collect();
        let x = DenseMatrix::from_2d_array(&row_refs);

        let mut parameters =
            DecisionTreeClassifierParameters::default().with_max_depth(config.max_depth);
        parameters.seed = Some(config.seed);
        let model = DecisionTreeClassifier::fit(&x, &targets, parameters)?;

        Ok(PhaseTree { model })
    }

    /// Predicts a phase label for each profile.
    pub fn predict(&self, profiles: &[NutrientProfile]) -> Result<Vec<PhaseLabel>, Box<dyn Error>> {
        if profiles.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<Vec<f64>> = profiles
            .iter()
            .map(|profile| profile.feature_vector().to_vec())
            .collect();
        let row_refs: Vec<&[f64]> = rows.iter().map(|row| row.as_slice()).collect();
        let x = DenseMatrix::from_2d_array(&row_refs);

        let codes = self.model.predict(&x)?;
        codes
            .into_iter()
            .map(|code| {
                PhaseLabel::from_code(code).ok_or_else(|| {
                    IoError::new(
                        ErrorKind::InvalidData,
                        format!("Model produced unknown label code: {}", code),
                    )
                    .into()
                })
            })
            .collect()
    }

    /// Predicts the phase label of a single profile.
    pub fn predict_one(&self, profile: &NutrientProfile) -> Result<PhaseLabel, Box<dyn Error>> {
        let mut labels = self.predict(std::slice::from_ref(profile))?;
        labels
            .pop()
            .ok_or_else(|| IoError::new(ErrorKind::Other, "Prediction returned no label").into())
    }

    /// Scores the model against the phase tags already present on a dataset,
    /// producing accuracy and a confusion matrix.
    pub fn evaluate(&self, dataset: &RecipeDataset) -> Result<ModelEvaluation, Box<dyn Error>> {
        if dataset.is_empty() {
            return Err(
                IoError::new(ErrorKind::InvalidInput, "Cannot evaluate an empty dataset").into(),
            );
        }

        let mut actual: Vec<PhaseLabel> = Vec::with_capacity(dataset.len());
        let mut profiles: Vec<NutrientProfile> = Vec::with_capacity(dataset.len());
        for record in dataset.records() {
            let phase = record.phase.ok_or_else(|| {
                IoError::new(
                    ErrorKind::InvalidInput,
                    format!("Unlabelled record: {}", record.title),
                )
            })?;
            actual.push(phase);
            profiles.push(record.nutrients);
        }

        let predicted = self.predict(&profiles)?;

        let mut confusion = [[0usize; 4]; 4];
        let mut correct = 0usize;
        for (truth, guess) in actual.iter().zip(&predicted) {
            confusion[truth.code() as usize][guess.code() as usize] += 1;
            if truth == guess {
                correct += 1;
            }
        }

        Ok(ModelEvaluation {
            accuracy: correct as f64 / actual.len() as f64,
            confusion,
        })
    }
}

/// Represents the evaluation of a fitted tree against a labelled dataset.
/// `confusion` rows are actual labels, columns are predicted labels, both
/// indexed by `PhaseLabel::code`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelEvaluation {
    pub accuracy: f64,
    pub confusion: [[usize; 4]; 4],
}

impl ModelEvaluation {
    /// Number of records whose actual label is `label`.
    pub fn support(&self, label: PhaseLabel) -> usize {
        self.confusion[label.code() as usize].iter().sum()
    }

    /// Fraction of predictions of `label` that were correct; 0 when the
    /// label was never predicted.
    pub fn precision(&self, label: PhaseLabel) -> f64 {
        let column = label.code() as usize;
        let predicted: usize = self.confusion.iter().map(|row| row[column]).sum();
        if predicted == 0 {
            0.0
        } else {
            self.confusion[column][column] as f64 / predicted as f64
        }
    }

    /// Fraction of actual `label` records that were predicted as such; 0
    /// when the label never occurs.
    pub fn recall(&self, label: PhaseLabel) -> f64 {
        let row = label.code() as usize;
        let actual = self.support(label);
        if actual == 0 {
            0.0
        } else {
            self.confusion[row][row] as f64 / actual as f64
        }
    }

    /// Harmonic mean of precision and recall; 0 when both are 0.
    pub fn f1(&self, label: PhaseLabel) -> f64 {
        let precision = self.precision(label);
        let recall = self.recall(label);
        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    }

    /// Prints accuracy, the confusion matrix, and a per-phase
    /// precision/recall/F1 report.
    pub fn print_report(&self) {
        println!("Accuracy: {:.2}%", self.accuracy * 100.0);

        println!("\nConfusion matrix (rows = actual, columns = predicted):");
        print!("{:>14}", "");
        for label in PhaseLabel::ALL {
            print!("{:>12}", label.as_str());
        }
        println!();
        for label in PhaseLabel::ALL {
            print!("{:>14}", label.as_str());
            for guess in PhaseLabel::ALL {
                print!(
                    "{:>12}",
                    self.confusion[label.code() as usize][guess.code() as usize]
                );
            }
            println!();
        }

        println!(
            "\n{:>14}{:>12}{:>12}{:>12}{:>12}",
            "", "precision", "recall", "f1-score", "support"
        );
        for label in PhaseLabel::ALL {
            println!(
                "{:>14}{:>12.2}{:>12.2}{:>12.2}{:>12}",
                label.as_str(),
                self.precision(label),
                self.recall(label),
                self.f1(label),
                self.support(label)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    // Ten well-separated recipes per phase, labelled by the cascade itself.
    fn clustered_dataset() -> RecipeDataset {
        let mut dataset = RecipeDataset::new();
        for i in 0..10 {
            let jitter = i as f64 * 0.1;
            dataset
                .add_recipe(
                    &format!("menstrual-{}", i),
                    profile(8.0 + jitter, 40.0 + jitter, 0.0, 0.0, 0.0),
                )
                .add_recipe(
                    &format!("ovulation-{}", i),
                    profile(0.0, 30.0 + jitter, 3.0 + jitter, 10.0, 0.0),
                )
                .add_recipe(
                    &format!("follicular-{}", i),
                    profile(2.0 + jitter, 16.0 + jitter, 1.2, 40.0, 0.0),
                )
                .add_recipe(
                    &format!("luteal-{}", i),
                    profile(0.0, 0.0, 0.0, 150.0 + jitter, 12.0),
                );
        }
        dataset.label_phases();
        dataset
    }

    #[test]
    fn clusters_are_labelled_as_designed() {
        let dataset = clustered_dataset();
        for (_, count, percentage) in dataset.phase_distribution() {
            assert_eq!(count, 10);
            assert!((percentage - 25.0).abs() < 1e-9);
        }
    }

    #[test]
    fn tree_separates_distinct_clusters() {
        let dataset = clustered_dataset();
        let tree = PhaseTree::fit(&dataset, PhaseTreeConfig::default()).unwrap();
        let evaluation = tree.evaluate(&dataset).unwrap();

        assert!((evaluation.accuracy - 1.0).abs() < 1e-9);
        for label in PhaseLabel::ALL {
            let i = label.code() as usize;
            assert_eq!(evaluation.confusion[i][i], 10);
            assert_eq!(evaluation.support(label), 10);
            assert!((evaluation.precision(label) - 1.0).abs() < 1e-9);
            assert!((evaluation.recall(label) - 1.0).abs() < 1e-9);
            assert!((evaluation.f1(label) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn predict_one_matches_cluster_label() {
        let dataset = clustered_dataset();
        let tree = PhaseTree::fit(&dataset, PhaseTreeConfig::default()).unwrap();

        let fresh = profile(9.0, 45.0, 0.0, 0.0, 0.0);
        assert_eq!(tree.predict_one(&fresh).unwrap(), PhaseLabel::Menstrual);

        let fresh = profile(0.0, 0.0, 0.0, 160.0, 13.0);
        assert_eq!(tree.predict_one(&fresh).unwrap(), PhaseLabel::Luteal);
    }

    #[test]
    fn fitting_is_deterministic_for_a_seed() {
        let dataset = clustered_dataset();
        let profiles: Vec<NutrientProfile> =
            dataset.records().iter().map(|r| r.nutrients).collect();

        let first = PhaseTree::fit(&dataset, PhaseTreeConfig::default()).unwrap();
        let second = PhaseTree::fit(&dataset, PhaseTreeConfig::default()).unwrap();
        assert_eq!(
            first.predict(&profiles).unwrap(),
            second.predict(&profiles).unwrap()
        );
    }

    #[test]
    fn fit_rejects_empty_and_unlabelled_datasets() {
        assert!(PhaseTree::fit(&RecipeDataset::new(), PhaseTreeConfig::default()).is_err());

        let mut unlabelled = RecipeDataset::new();
        unlabelled.add_recipe("mystery", profile(1.0, 1.0, 1.0, 1.0, 1.0));
        assert!(PhaseTree::fit(&unlabelled, PhaseTreeConfig::default()).is_err());
    }

    #[test]
    fn evaluate_rejects_unlabelled_records() {
        let dataset = clustered_dataset();
        let tree = PhaseTree::fit(&dataset, PhaseTreeConfig::default()).unwrap();

        let mut unlabelled = RecipeDataset::new();
        unlabelled.add_recipe("mystery", profile(1.0, 1.0, 1.0, 1.0, 1.0));
        assert!(tree.evaluate(&unlabelled).is_err());

        let empty = tree.predict(&[]).unwrap();
        assert!(empty.is_empty());
    }
}

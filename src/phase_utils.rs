// phase_utils.rs
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::io::{Error as IoError, ErrorKind};
use std::str::FromStr;

/// Column order of the nutrient feature vector used across the library: CSV
/// ingestion in `dataset_utils` maps these column names onto `NutrientProfile`
/// fields, and `tree_utils` trains on feature matrices laid out in this order.
pub const FEATURE_COLUMNS: [&str; 14] = [
    "calories",
    "protein",
    "unsaturated fat",
    "trans fat",
    "saturated fat",
    "omega 3",
    "fiber",
    "vitamin C",
    "iron",
    "magnesium",
    "iodine",
    "zinc",
    "vitamin K",
    "calcium",
];

/// Represents the per-serving nutrient quantities of one recipe. Minerals and
/// vitamin C are in milligrams, fiber in grams; no unit conversion is
/// performed. Any field absent from the source data deserializes to 0, and
/// snake_case / `_mg`-suffixed keys are accepted alongside the display names,
/// so a raw `nutrition_per_serving` JSON blob can be parsed directly.
///
/// ```
/// use pantrycycle::phase_utils::NutrientProfile;
///
/// let profile = NutrientProfile::from_json(r#"{"iron_mg": 4, "vitamin_c_mg": 25}"#).unwrap();
/// assert_eq!(profile.iron, 4.0);
/// assert_eq!(profile.vitamin_c, 25.0);
/// assert_eq!(profile.zinc, 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NutrientProfile {
    pub calories: f64,
    pub protein: f64,
    #[serde(rename = "unsaturated fat", alias = "unsaturated_fat")]
    pub unsaturated_fat: f64,
    #[serde(rename = "trans fat", alias = "trans_fat")]
    pub trans_fat: f64,
    #[serde(rename = "saturated fat", alias = "saturated_fat")]
    pub saturated_fat: f64,
    #[serde(rename = "omega 3", alias = "omega_3")]
    pub omega_3: f64,
    pub fiber: f64,
    #[serde(rename = "vitamin C", alias = "vitamin_c", alias = "vitamin_c_mg")]
    pub vitamin_c: f64,
    #[serde(alias = "iron_mg")]
    pub iron: f64,
    #[serde(alias = "magnesium_mg")]
    pub magnesium: f64,
    pub iodine: f64,
    #[serde(alias = "zinc_mg")]
    pub zinc: f64,
    #[serde(rename = "vitamin K", alias = "vitamin_k")]
    pub vitamin_k: f64,
    pub calcium: f64,
}

impl NutrientProfile {
    /// Parses a profile from a JSON object, substituting 0 for any missing
    /// field and ignoring keys the profile does not track.
    pub fn from_json(json_data: &str) -> Result<Self, Box<dyn Error>> {
        let profile: NutrientProfile = serde_json::from_str(json_data)?;
        Ok(profile)
    }

    /// Returns the profile as a feature vector in `FEATURE_COLUMNS` order.
    pub fn feature_vector(&self) -> [f64; 14] {
        [
            self.calories,
            self.protein,
            self.unsaturated_fat,
            self.trans_fat,
            self.saturated_fat,
            self.omega_3,
            self.fiber,
            self.vitamin_c,
            self.iron,
            self.magnesium,
            self.iodine,
            self.zinc,
            self.vitamin_k,
            self.calcium,
        ]
    }

    /// Classifies this profile. See `classify_menstrual_phase`.
    pub fn phase(&self) -> PhaseLabel {
        classify_menstrual_phase(self)
    }
}

/// Represents one of the four menstrual-phase tags assigned to a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseLabel {
    Menstrual,
    Follicular,
    Ovulation,
    Luteal,
}

impl PhaseLabel {
    /// All labels, in reporting order. The position of a label in this array
    /// is its integer code for model training and confusion matrices.
    pub const ALL: [PhaseLabel; 4] = [
        PhaseLabel::Menstrual,
        PhaseLabel::Follicular,
        PhaseLabel::Ovulation,
        PhaseLabel::Luteal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseLabel::Menstrual => "Menstrual",
            PhaseLabel::Follicular => "Follicular",
            PhaseLabel::Ovulation => "Ovulation",
            PhaseLabel::Luteal => "Luteal",
        }
    }

    /// Returns the stable integer code of this label.
    pub fn code(&self) -> u32 {
        match self {
            PhaseLabel::Menstrual => 0,
            PhaseLabel::Follicular => 1,
            PhaseLabel::Ovulation => 2,
            PhaseLabel::Luteal => 3,
        }
    }

    /// Inverse of `code`.
    pub fn from_code(code: u32) -> Option<PhaseLabel> {
        PhaseLabel::ALL.get(code as usize).copied()
    }
}

impl fmt::Display for PhaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PhaseLabel {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Menstrual" => Ok(PhaseLabel::Menstrual),
            "Follicular" => Ok(PhaseLabel::Follicular),
            "Ovulation" => Ok(PhaseLabel::Ovulation),
            "Luteal" => Ok(PhaseLabel::Luteal),
            other => Err(IoError::new(
                ErrorKind::InvalidInput,
                format!("Unknown phase label: {}", other),
            )),
        }
    }
}

type PhaseRule = (fn(&NutrientProfile) -> bool, PhaseLabel);

/// The balanced threshold cascade, in priority order. The primary rules
/// (1-4) target a 15-30% share per phase; the secondary rules below them are
/// relaxed tolerance bands from later tuning rounds. Several of the secondary
/// conditions overlap earlier ones; the order and the overlaps are kept
/// exactly as tuned.
const CASCADE: [PhaseRule; 10] = [
    // 1. Menstrual: Iron>=4 AND VitC>=25
    (
        |p| p.iron >= 4.0 && p.vitamin_c >= 25.0,
        PhaseLabel::Menstrual,
    ),
    // 2. Ovulation: Zinc>=1.5 AND VitC>=20 AND Mg<80
    (
        |p| p.zinc >= 1.5 && p.vitamin_c >= 20.0 && p.magnesium < 80.0,
        PhaseLabel::Ovulation,
    ),
    // 3. Follicular: 1.5<=Iron<3.5 AND VitC>=15 AND Zinc>=1.0
    (
        |p| (1.5..3.5).contains(&p.iron) && p.vitamin_c >= 15.0 && p.zinc >= 1.0,
        PhaseLabel::Follicular,
    ),
    // 4. Luteal: Mg>=100 OR Fiber>=9
    (
        |p| p.magnesium >= 100.0 || p.fiber >= 9.0,
        PhaseLabel::Luteal,
    ),
    // 5. Follicular (relaxed): 1.5<=Iron<3.5 AND VitC>=12
    (
        |p| (1.5..3.5).contains(&p.iron) && p.vitamin_c >= 12.0,
        PhaseLabel::Follicular,
    ),
    // 6. Ovulation (relaxed): Zinc>=1.4 AND VitC>=18 AND Mg<85
    (
        |p| p.zinc >= 1.4 && p.vitamin_c >= 18.0 && p.magnesium < 85.0,
        PhaseLabel::Ovulation,
    ),
    // 7. Luteal (tightened): Mg>=105 OR Fiber>=10
    (
        |p| p.magnesium >= 105.0 || p.fiber >= 10.0,
        PhaseLabel::Luteal,
    ),
    // 8. Ovulation (fallback): Zinc>=1.2 AND VitC>=15 AND Mg<85
    (
        |p| p.zinc >= 1.2 && p.vitamin_c >= 15.0 && p.magnesium < 85.0,
        PhaseLabel::Ovulation,
    ),
    // 9. Luteal (fallback): Mg>=100 OR Fiber>=9
    (
        |p| p.magnesium >= 100.0 || p.fiber >= 9.0,
        PhaseLabel::Luteal,
    ),
    // 10. Follicular (fallback): Iron>=1.5 AND VitC>=12
    (
        |p| p.iron >= 1.5 && p.vitamin_c >= 12.0,
        PhaseLabel::Follicular,
    ),
];

/// Assigns a menstrual-phase tag to a nutrient profile by walking the
/// threshold cascade top to bottom; the first satisfied condition wins, and a
/// profile matching no condition is tagged `Ovulation`. The function is total
/// and deterministic, reads nothing but its argument, and may be called from
/// any number of threads at once.
///
/// ```
/// use pantrycycle::phase_utils::{classify_menstrual_phase, NutrientProfile, PhaseLabel};
///
/// let profile = NutrientProfile {
///     iron: 4.0,
///     vitamin_c: 25.0,
///     ..Default::default()
/// };
/// assert_eq!(classify_menstrual_phase(&profile), PhaseLabel::Menstrual);
/// assert_eq!(NutrientProfile::default().phase(), PhaseLabel::Ovulation);
/// ```
pub fn classify_menstrual_phase(profile: &NutrientProfile) -> PhaseLabel {
    for (condition, label) in CASCADE {
        if condition(profile) {
            return label;
        }
    }
    PhaseLabel::Ovulation
}

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{InputError, VocabularyError};

pub const MANUFACTURERS_KEY: &str = "manufacturers";
pub const CATEGORIES_KEY: &str = "categories";
pub const FUEL_TYPES_KEY: &str = "fuel_types";
pub const GEAR_BOX_TYPES_KEY: &str = "gear_box_types";
pub const DRIVE_WHEEL_TYPES_KEY: &str = "drive_wheel_types";
pub const WHEEL_TYPES_KEY: &str = "wheel_types";
pub const COLOR_TYPES_KEY: &str = "color_types";

/// Key holding the model list of one manufacturer
pub fn models_key(manufacturer: &str) -> String {
    format!("{}_models", manufacturer)
}

/// Categorical inputs of a car record that must come from the vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalField {
    Manufacturer,
    Model,
    Category,
    FuelType,
    GearBoxType,
    DriveWheels,
    Wheel,
    Color,
}

impl CategoricalField {
    /// Vocabulary key for fields with a single global list. `Model` lists are
    /// keyed per manufacturer, see [`models_key`].
    pub fn vocabulary_key(&self) -> Option<&'static str> {
        match self {
            CategoricalField::Manufacturer => Some(MANUFACTURERS_KEY),
            CategoricalField::Model => None,
            CategoricalField::Category => Some(CATEGORIES_KEY),
            CategoricalField::FuelType => Some(FUEL_TYPES_KEY),
            CategoricalField::GearBoxType => Some(GEAR_BOX_TYPES_KEY),
            CategoricalField::DriveWheels => Some(DRIVE_WHEEL_TYPES_KEY),
            CategoricalField::Wheel => Some(WHEEL_TYPES_KEY),
            CategoricalField::Color => Some(COLOR_TYPES_KEY),
        }
    }

    /// Column header used by the historical dataset and the pipeline
    pub fn column_name(&self) -> &'static str {
        match self {
            CategoricalField::Manufacturer => "Manufacturer",
            CategoricalField::Model => "Model",
            CategoricalField::Category => "Category",
            CategoricalField::FuelType => "Fuel type",
            CategoricalField::GearBoxType => "Gear box type",
            CategoricalField::DriveWheels => "Drive wheels",
            CategoricalField::Wheel => "Wheel",
            CategoricalField::Color => "Color",
        }
    }
}

impl fmt::Display for CategoricalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// A categorical value that has been checked against a [`VocabularyDocument`].
///
/// The only way to obtain one is [`VocabularyDocument::validate`] or
/// [`VocabularyDocument::validate_model`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Categorical {
    field: CategoricalField,
    value: String,
}

impl Categorical {
    pub fn field(&self) -> CategoricalField {
        self.field
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Categorical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Sorted, deduplicated dropdown options keyed by category name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VocabularyDocument(BTreeMap<String, Vec<String>>);

impl<'de> Deserialize<'de> for VocabularyDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BTreeMap::deserialize(deserializer).map(Self::new)
    }
}

impl VocabularyDocument {
    /// Lists are sorted and deduplicated on the way in
    pub fn new(mut entries: BTreeMap<String, Vec<String>>) -> Self {
        for list in entries.values_mut() {
            list.sort();
            list.dedup();
        }
        Self(entries)
    }

    /// Load a persisted document
    pub fn load(path: &Path) -> Result<Self, VocabularyError> {
        let content = fs::read_to_string(path).map_err(|source| VocabularyError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| VocabularyError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Serialize with the 4-space indentation the document has always used
    pub fn to_pretty_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        Ok(buf)
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn entries(&self) -> &BTreeMap<String, Vec<String>> {
        &self.0
    }

    pub fn manufacturers(&self) -> &[String] {
        self.get(MANUFACTURERS_KEY).unwrap_or_default()
    }

    pub fn models_for(&self, manufacturer: &str) -> Option<&[String]> {
        self.get(&models_key(manufacturer))
    }

    /// Options for a field with a global list; empty for `Model`
    pub fn options(&self, field: CategoricalField) -> &[String] {
        field
            .vocabulary_key()
            .and_then(|key| self.get(key))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check a value against its field's list.
    ///
    /// Without a manufacturer, a `Model` is accepted when any manufacturer
    /// lists it; records always go through [`Self::validate_model`].
    pub fn validate(&self, field: CategoricalField, value: &str) -> Result<Categorical, InputError> {
        let known = match field.vocabulary_key() {
            Some(key) => contains(self.get(key), value),
            None => self
                .0
                .iter()
                .filter(|(key, _)| key.ends_with("_models"))
                .any(|(_, models)| contains(Some(models), value)),
        };

        if known {
            Ok(Categorical {
                field,
                value: value.to_string(),
            })
        } else {
            Err(InputError::UnknownValue {
                field,
                value: value.to_string(),
            })
        }
    }

    /// Check a model against the list of an already validated manufacturer
    pub fn validate_model(&self, manufacturer: &Categorical, value: &str) -> Result<Categorical, InputError> {
        let models = self
            .models_for(manufacturer.as_str())
            .ok_or_else(|| InputError::UnknownManufacturer(manufacturer.as_str().to_string()))?;

        if contains(Some(models), value) {
            Ok(Categorical {
                field: CategoricalField::Model,
                value: value.to_string(),
            })
        } else {
            Err(InputError::UnknownValue {
                field: CategoricalField::Model,
                value: value.to_string(),
            })
        }
    }
}

// Lists are sorted, so a binary search is enough
fn contains(list: Option<&[String]>, value: &str) -> bool {
    list.is_some_and(|items| items.binary_search_by(|item| item.as_str().cmp(value)).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VocabularyDocument {
        let mut entries = BTreeMap::new();
        entries.insert(MANUFACTURERS_KEY.to_string(), vec!["FORD".to_string(), "TOYOTA".to_string()]);
        entries.insert(COLOR_TYPES_KEY.to_string(), vec!["Black".to_string(), "White".to_string()]);
        entries.insert(models_key("FORD"), vec!["Escape".to_string(), "Focus".to_string()]);
        entries.insert(models_key("TOYOTA"), vec!["Camry".to_string(), "Prius".to_string()]);
        VocabularyDocument::new(entries)
    }

    #[test]
    fn test_validate_known_and_unknown_values() {
        let vocabulary = sample();

        let color = vocabulary.validate(CategoricalField::Color, "Black").unwrap();
        assert_eq!(color.as_str(), "Black");
        assert_eq!(color.field(), CategoricalField::Color);

        let err = vocabulary.validate(CategoricalField::Color, "Purple").unwrap_err();
        assert_eq!(
            err,
            InputError::UnknownValue {
                field: CategoricalField::Color,
                value: "Purple".to_string()
            }
        );
    }

    #[test]
    fn test_loaded_lists_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strings.json");
        fs::write(&path, r#"{"manufacturers": ["TOYOTA", "FORD", "BMW", "FORD"]}"#).unwrap();

        let vocabulary = VocabularyDocument::load(&path).unwrap();
        assert_eq!(vocabulary.manufacturers(), &["BMW", "FORD", "TOYOTA"]);
        assert!(vocabulary.validate(CategoricalField::Manufacturer, "BMW").is_ok());
        assert!(vocabulary.validate(CategoricalField::Manufacturer, "TOYOTA").is_ok());
    }

    #[test]
    fn test_validate_model_is_scoped_to_manufacturer() {
        let vocabulary = sample();
        let ford = vocabulary.validate(CategoricalField::Manufacturer, "FORD").unwrap();

        assert!(vocabulary.validate_model(&ford, "Focus").is_ok());
        assert!(vocabulary.validate_model(&ford, "Camry").is_err());
        // Unscoped lookup accepts any manufacturer's model
        assert!(vocabulary.validate(CategoricalField::Model, "Camry").is_ok());
    }

    #[test]
    fn test_missing_list_rejects_everything() {
        let vocabulary = sample();
        assert!(vocabulary.options(CategoricalField::FuelType).is_empty());
        assert!(vocabulary.validate(CategoricalField::FuelType, "Petrol").is_err());
    }

    #[test]
    fn test_pretty_json_uses_four_space_indent() {
        let json = String::from_utf8(sample().to_pretty_json().unwrap()).unwrap();
        assert!(json.contains("\n    \"FORD_models\": [\n        \"Escape\","));

        let parsed: VocabularyDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample());
    }
}

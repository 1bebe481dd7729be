use std::fmt;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::InputError;
use crate::models::vocabulary::{Categorical, CategoricalField, VocabularyDocument};

/// The 17 named columns of a prediction row, in the order the pipeline was
/// trained with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureColumn {
    #[serde(rename = "Manufacturer")]
    Manufacturer,
    #[serde(rename = "Model")]
    Model,
    #[serde(rename = "Fuel type")]
    FuelType,
    #[serde(rename = "Wheel")]
    Wheel,
    #[serde(rename = "Engine volume")]
    EngineVolume,
    #[serde(rename = "Doors")]
    Doors,
    #[serde(rename = "Airbags")]
    Airbags,
    #[serde(rename = "Drive wheels")]
    DriveWheels,
    #[serde(rename = "Color")]
    Color,
    #[serde(rename = "Cylinders")]
    Cylinders,
    #[serde(rename = "Prod. year")]
    ProdYear,
    #[serde(rename = "Mileage")]
    Mileage,
    #[serde(rename = "Levy")]
    Levy,
    #[serde(rename = "Leather interior")]
    LeatherInterior,
    #[serde(rename = "Turbo")]
    Turbo,
    #[serde(rename = "Category")]
    Category,
    #[serde(rename = "Gear box type")]
    GearBoxType,
}

impl FeatureColumn {
    pub fn name(&self) -> &'static str {
        match self {
            FeatureColumn::Manufacturer => "Manufacturer",
            FeatureColumn::Model => "Model",
            FeatureColumn::FuelType => "Fuel type",
            FeatureColumn::Wheel => "Wheel",
            FeatureColumn::EngineVolume => "Engine volume",
            FeatureColumn::Doors => "Doors",
            FeatureColumn::Airbags => "Airbags",
            FeatureColumn::DriveWheels => "Drive wheels",
            FeatureColumn::Color => "Color",
            FeatureColumn::Cylinders => "Cylinders",
            FeatureColumn::ProdYear => "Prod. year",
            FeatureColumn::Mileage => "Mileage",
            FeatureColumn::Levy => "Levy",
            FeatureColumn::LeatherInterior => "Leather interior",
            FeatureColumn::Turbo => "Turbo",
            FeatureColumn::Category => "Category",
            FeatureColumn::GearBoxType => "Gear box type",
        }
    }
}

impl FeatureColumn {
    pub fn kind(&self) -> ColumnKind {
        match self {
            FeatureColumn::EngineVolume
            | FeatureColumn::Doors
            | FeatureColumn::Airbags
            | FeatureColumn::Cylinders
            | FeatureColumn::ProdYear
            | FeatureColumn::Mileage
            | FeatureColumn::Levy => ColumnKind::Number,
            FeatureColumn::LeatherInterior | FeatureColumn::Turbo => ColumnKind::Flag,
            _ => ColumnKind::Text,
        }
    }
}

impl fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What kind of value a column holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Number,
    Flag,
}

/// One cell of a record, as the pipeline sees it
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(f64),
    Flag(bool),
}

/// Raw, unvalidated input as it arrives from a form, JSON body or CSV row.
///
/// Aliases accept the dataset headers so batch CSV files can be fed
/// in directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRequest {
    #[serde(alias = "Manufacturer")]
    pub manufacturer: String,
    #[serde(alias = "Model")]
    pub model: String,
    #[serde(alias = "Fuel type")]
    pub fuel_type: String,
    #[serde(alias = "Wheel")]
    pub wheel: String,
    #[serde(alias = "Engine volume")]
    pub engine_volume: f64,
    #[serde(alias = "Doors")]
    pub doors: u32,
    #[serde(alias = "Airbags")]
    pub airbags: u32,
    #[serde(alias = "Drive wheels")]
    pub drive_wheels: String,
    #[serde(alias = "Color")]
    pub color: String,
    #[serde(alias = "Cylinders")]
    pub cylinders: u32,
    #[serde(alias = "Prod. year")]
    pub prod_year: i32,
    #[serde(alias = "Mileage")]
    pub mileage: u64,
    #[serde(alias = "Levy")]
    pub levy: u64,
    #[serde(alias = "Leather interior", deserialize_with = "deserialize_flag")]
    pub leather_interior: bool,
    #[serde(alias = "Turbo", deserialize_with = "deserialize_flag")]
    pub turbo: bool,
    #[serde(alias = "Category")]
    pub category: String,
    #[serde(alias = "Gear box type")]
    pub gear_box_type: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Int(i64),
    Text(String),
}

// CSV files spell flags as Yes/No, True/False or 1/0
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match FlagRepr::deserialize(deserializer)? {
        FlagRepr::Bool(flag) => Ok(flag),
        FlagRepr::Int(value) => Ok(value != 0),
        FlagRepr::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" | "1" => Ok(true),
            "no" | "false" | "0" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!("invalid flag value '{}'", other))),
        },
    }
}

/// Inclusive bounds for one numeric input
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy + fmt::Display> Bounds<T> {
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    fn check(&self, field: &'static str, value: T) -> Result<T, InputError> {
        if value < self.min || value > self.max {
            return Err(InputError::OutOfRange {
                field,
                value: value.to_string(),
                min: self.min.to_string(),
                max: self.max.to_string(),
            });
        }
        Ok(value)
    }
}

/// Numeric ranges of the input form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputLimits {
    pub mileage: Bounds<u64>,
    pub levy: Bounds<u64>,
    pub engine_volume: Bounds<f64>,
    pub engine_volume_step: f64,
    pub doors: Bounds<u32>,
    pub cylinders: Bounds<u32>,
    pub airbags: Bounds<u32>,
    pub prod_year: Bounds<i32>,
}

/// Number of model years offered, counting the current one
pub const MODEL_YEAR_SPAN: i32 = 100;

impl InputLimits {
    pub fn for_year(current_year: i32) -> Self {
        Self {
            mileage: Bounds::new(0, 10_000_000),
            levy: Bounds::new(1, 1_000_000_000),
            engine_volume: Bounds::new(1.0, 30.0),
            engine_volume_step: 0.1,
            doors: Bounds::new(1, 8),
            cylinders: Bounds::new(1, 20),
            airbags: Bounds::new(1, 15),
            prod_year: Bounds::new(current_year - (MODEL_YEAR_SPAN - 1), current_year),
        }
    }

    pub fn current() -> Self {
        Self::for_year(Utc::now().year())
    }

    /// Selectable model years, newest first
    pub fn year_options(&self) -> Vec<i32> {
        (self.prod_year.min..=self.prod_year.max).rev().collect()
    }

    fn check_engine_volume(&self, value: f64) -> Result<f64, InputError> {
        if !value.is_finite() {
            return Err(InputError::OutOfRange {
                field: "engine_volume",
                value: value.to_string(),
                min: self.engine_volume.min.to_string(),
                max: self.engine_volume.max.to_string(),
            });
        }
        self.engine_volume.check("engine_volume", value)?;

        let steps = value / self.engine_volume_step;
        if (steps - steps.round()).abs() > 1e-6 {
            return Err(InputError::OffStep {
                field: "engine_volume",
                value,
                step: self.engine_volume_step,
            });
        }
        Ok(value)
    }
}

/// A validated, immutable prediction row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    manufacturer: Categorical,
    model: Categorical,
    fuel_type: Categorical,
    wheel: Categorical,
    engine_volume: f64,
    doors: u32,
    airbags: u32,
    drive_wheels: Categorical,
    color: Categorical,
    cylinders: u32,
    prod_year: i32,
    mileage: u64,
    levy: u64,
    leather_interior: bool,
    turbo: bool,
    category: Categorical,
    gear_box_type: Categorical,
}

impl FeatureRecord {
    /// Validate every field of a request; the first rejection wins
    pub fn from_request(
        request: &FeatureRequest,
        vocabulary: &VocabularyDocument,
        limits: &InputLimits,
    ) -> Result<Self, InputError> {
        let manufacturer = vocabulary.validate(CategoricalField::Manufacturer, &request.manufacturer)?;
        let model = vocabulary.validate_model(&manufacturer, &request.model)?;

        Ok(Self {
            model,
            manufacturer,
            fuel_type: vocabulary.validate(CategoricalField::FuelType, &request.fuel_type)?,
            wheel: vocabulary.validate(CategoricalField::Wheel, &request.wheel)?,
            engine_volume: limits.check_engine_volume(request.engine_volume)?,
            doors: limits.doors.check("doors", request.doors)?,
            airbags: limits.airbags.check("airbags", request.airbags)?,
            drive_wheels: vocabulary.validate(CategoricalField::DriveWheels, &request.drive_wheels)?,
            color: vocabulary.validate(CategoricalField::Color, &request.color)?,
            cylinders: limits.cylinders.check("cylinders", request.cylinders)?,
            prod_year: limits.prod_year.check("prod_year", request.prod_year)?,
            mileage: limits.mileage.check("mileage", request.mileage)?,
            levy: limits.levy.check("levy", request.levy)?,
            leather_interior: request.leather_interior,
            turbo: request.turbo,
            category: vocabulary.validate(CategoricalField::Category, &request.category)?,
            gear_box_type: vocabulary.validate(CategoricalField::GearBoxType, &request.gear_box_type)?,
        })
    }

    pub fn value(&self, column: FeatureColumn) -> FieldValue<'_> {
        match column {
            FeatureColumn::Manufacturer => FieldValue::Text(self.manufacturer.as_str()),
            FeatureColumn::Model => FieldValue::Text(self.model.as_str()),
            FeatureColumn::FuelType => FieldValue::Text(self.fuel_type.as_str()),
            FeatureColumn::Wheel => FieldValue::Text(self.wheel.as_str()),
            FeatureColumn::EngineVolume => FieldValue::Number(self.engine_volume),
            FeatureColumn::Doors => FieldValue::Number(self.doors as f64),
            FeatureColumn::Airbags => FieldValue::Number(self.airbags as f64),
            FeatureColumn::DriveWheels => FieldValue::Text(self.drive_wheels.as_str()),
            FeatureColumn::Color => FieldValue::Text(self.color.as_str()),
            FeatureColumn::Cylinders => FieldValue::Number(self.cylinders as f64),
            FeatureColumn::ProdYear => FieldValue::Number(self.prod_year as f64),
            FeatureColumn::Mileage => FieldValue::Number(self.mileage as f64),
            FeatureColumn::Levy => FieldValue::Number(self.levy as f64),
            FeatureColumn::LeatherInterior => FieldValue::Flag(self.leather_interior),
            FeatureColumn::Turbo => FieldValue::Flag(self.turbo),
            FeatureColumn::Category => FieldValue::Text(self.category.as_str()),
            FeatureColumn::GearBoxType => FieldValue::Text(self.gear_box_type.as_str()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::vocabulary::*;
    use std::collections::BTreeMap;

    pub(crate) fn sample_vocabulary() -> VocabularyDocument {
        let list = |values: &[&str]| values.iter().map(|v| v.to_string()).collect::<Vec<_>>();
        let mut entries = BTreeMap::new();
        entries.insert(MANUFACTURERS_KEY.to_string(), list(&["FORD", "TOYOTA"]));
        entries.insert(models_key("FORD"), list(&["Focus"]));
        entries.insert(models_key("TOYOTA"), list(&["Camry", "Prius"]));
        entries.insert(CATEGORIES_KEY.to_string(), list(&["Hatchback", "Sedan"]));
        entries.insert(FUEL_TYPES_KEY.to_string(), list(&["Hybrid", "Petrol"]));
        entries.insert(GEAR_BOX_TYPES_KEY.to_string(), list(&["Automatic", "Manual"]));
        entries.insert(DRIVE_WHEEL_TYPES_KEY.to_string(), list(&["Front", "Rear"]));
        entries.insert(WHEEL_TYPES_KEY.to_string(), list(&["Left wheel"]));
        entries.insert(COLOR_TYPES_KEY.to_string(), list(&["Black", "Silver"]));
        VocabularyDocument::new(entries)
    }

    pub(crate) fn sample_request() -> FeatureRequest {
        FeatureRequest {
            manufacturer: "TOYOTA".to_string(),
            model: "Prius".to_string(),
            fuel_type: "Hybrid".to_string(),
            wheel: "Left wheel".to_string(),
            engine_volume: 1.8,
            doors: 4,
            airbags: 8,
            drive_wheels: "Front".to_string(),
            color: "Silver".to_string(),
            cylinders: 4,
            prod_year: 2015,
            mileage: 120_000,
            levy: 950,
            leather_interior: true,
            turbo: false,
            category: "Hatchback".to_string(),
            gear_box_type: "Automatic".to_string(),
        }
    }

    #[test]
    fn test_valid_request_builds_record() {
        let record =
            FeatureRecord::from_request(&sample_request(), &sample_vocabulary(), &InputLimits::for_year(2025)).unwrap();

        assert_eq!(record.value(FeatureColumn::Model), FieldValue::Text("Prius"));
        assert_eq!(record.value(FeatureColumn::EngineVolume), FieldValue::Number(1.8));
        assert_eq!(record.value(FeatureColumn::LeatherInterior), FieldValue::Flag(true));
        assert_eq!(record.value(FeatureColumn::ProdYear), FieldValue::Number(2015.0));
    }

    #[test]
    fn test_model_from_other_manufacturer_is_rejected() {
        let mut request = sample_request();
        request.model = "Focus".to_string();

        let err = FeatureRecord::from_request(&request, &sample_vocabulary(), &InputLimits::for_year(2025))
            .unwrap_err();
        assert!(matches!(err, InputError::UnknownValue { field: CategoricalField::Model, .. }));
    }

    #[test]
    fn test_numeric_limits() {
        let vocabulary = sample_vocabulary();
        let limits = InputLimits::for_year(2025);

        let mut request = sample_request();
        request.doors = 9;
        assert!(matches!(
            FeatureRecord::from_request(&request, &vocabulary, &limits),
            Err(InputError::OutOfRange { field: "doors", .. })
        ));

        let mut request = sample_request();
        request.levy = 0;
        assert!(matches!(
            FeatureRecord::from_request(&request, &vocabulary, &limits),
            Err(InputError::OutOfRange { field: "levy", .. })
        ));

        let mut request = sample_request();
        request.engine_volume = 1.85;
        assert!(matches!(
            FeatureRecord::from_request(&request, &vocabulary, &limits),
            Err(InputError::OffStep { field: "engine_volume", .. })
        ));

        let mut request = sample_request();
        request.prod_year = 1925;
        assert!(matches!(
            FeatureRecord::from_request(&request, &vocabulary, &limits),
            Err(InputError::OutOfRange { field: "prod_year", .. })
        ));

        let mut request = sample_request();
        request.prod_year = 1926;
        request.mileage = 10_000_000;
        request.engine_volume = 30.0;
        assert!(FeatureRecord::from_request(&request, &vocabulary, &limits).is_ok());
    }

    #[test]
    fn test_column_kind_matches_record_values() {
        let record =
            FeatureRecord::from_request(&sample_request(), &sample_vocabulary(), &InputLimits::for_year(2025)).unwrap();

        for column in [
            FeatureColumn::Manufacturer,
            FeatureColumn::Wheel,
            FeatureColumn::Doors,
            FeatureColumn::Levy,
            FeatureColumn::Turbo,
            FeatureColumn::GearBoxType,
        ] {
            let kind = match record.value(column) {
                FieldValue::Text(_) => ColumnKind::Text,
                FieldValue::Number(_) => ColumnKind::Number,
                FieldValue::Flag(_) => ColumnKind::Flag,
            };
            assert_eq!(column.kind(), kind, "{}", column);
        }
    }

    #[test]
    fn test_year_options_cover_a_century() {
        let years = InputLimits::for_year(2025).year_options();
        assert_eq!(years.len(), 100);
        assert_eq!(years.first(), Some(&2025));
        assert_eq!(years.last(), Some(&1926));
    }

    #[test]
    fn test_request_accepts_dataset_headers_and_text_flags() {
        let csv_data = "Manufacturer,Model,Fuel type,Wheel,Engine volume,Doors,Airbags,Drive wheels,Color,Cylinders,Prod. year,Mileage,Levy,Leather interior,Turbo,Category,Gear box type\n\
            TOYOTA,Camry,Petrol,Left wheel,2.5,4,10,Front,Black,4,2018,45000,1200,Yes,No,Sedan,Automatic\n";
        let mut reader = csv::Reader::from_reader(csv_data.as_bytes());
        let request: FeatureRequest = reader.deserialize().next().unwrap().unwrap();

        assert_eq!(request.model, "Camry");
        assert!(request.leather_interior);
        assert!(!request.turbo);
        assert_eq!(request.prod_year, 2018);
    }
}

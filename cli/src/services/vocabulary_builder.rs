use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::VocabularyError;
use crate::models::vocabulary::{
    models_key, VocabularyDocument, CATEGORIES_KEY, COLOR_TYPES_KEY, DRIVE_WHEEL_TYPES_KEY, FUEL_TYPES_KEY,
    GEAR_BOX_TYPES_KEY, MANUFACTURERS_KEY, WHEEL_TYPES_KEY,
};
use crate::utils::{Logger, Timer};

/// The dataset columns the vocabulary is derived from; others are ignored
#[derive(Debug, Deserialize)]
struct RawCarRow {
    #[serde(rename = "Manufacturer")]
    manufacturer: String,
    #[serde(rename = "Model")]
    model: String,
    #[serde(rename = "Category")]
    category: String,
    #[serde(rename = "Fuel type")]
    fuel_type: String,
    #[serde(rename = "Gear box type")]
    gear_box_type: String,
    #[serde(rename = "Drive wheels")]
    drive_wheels: String,
    #[serde(rename = "Wheel")]
    wheel: String,
    #[serde(rename = "Color")]
    color: String,
}

#[derive(Default)]
struct Collector {
    manufacturers: BTreeSet<String>,
    categories: BTreeSet<String>,
    fuel_types: BTreeSet<String>,
    gear_box_types: BTreeSet<String>,
    drive_wheel_types: BTreeSet<String>,
    wheel_types: BTreeSet<String>,
    color_types: BTreeSet<String>,
    models: BTreeMap<String, BTreeSet<String>>,
}

fn insert(set: &mut BTreeSet<String>, value: String) {
    // Blank cells are missing data, not a selectable option
    if !value.is_empty() {
        set.insert(value);
    }
}

/// Derive the vocabulary from CSV data with a header row.
///
/// Every list comes out sorted and deduplicated, with one `<manufacturer>_models`
/// key per distinct manufacturer.
pub fn vocabulary_from_csv<R: Read>(reader: R) -> Result<VocabularyDocument, csv::Error> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut collector = Collector::default();

    for result in reader.deserialize() {
        let row: RawCarRow = result?;

        if !row.manufacturer.is_empty() {
            let models = collector.models.entry(row.manufacturer.clone()).or_default();
            insert(models, row.model);
        }
        insert(&mut collector.manufacturers, row.manufacturer);
        insert(&mut collector.categories, row.category);
        insert(&mut collector.fuel_types, row.fuel_type);
        insert(&mut collector.gear_box_types, row.gear_box_type);
        insert(&mut collector.drive_wheel_types, row.drive_wheels);
        insert(&mut collector.wheel_types, row.wheel);
        insert(&mut collector.color_types, row.color);
    }

    let mut entries = BTreeMap::new();
    entries.insert(MANUFACTURERS_KEY.to_string(), collector.manufacturers.into_iter().collect());
    entries.insert(CATEGORIES_KEY.to_string(), collector.categories.into_iter().collect());
    entries.insert(FUEL_TYPES_KEY.to_string(), collector.fuel_types.into_iter().collect());
    entries.insert(GEAR_BOX_TYPES_KEY.to_string(), collector.gear_box_types.into_iter().collect());
    entries.insert(DRIVE_WHEEL_TYPES_KEY.to_string(), collector.drive_wheel_types.into_iter().collect());
    entries.insert(WHEEL_TYPES_KEY.to_string(), collector.wheel_types.into_iter().collect());
    entries.insert(COLOR_TYPES_KEY.to_string(), collector.color_types.into_iter().collect());
    for (manufacturer, models) in collector.models {
        entries.insert(models_key(&manufacturer), models.into_iter().collect());
    }

    Ok(VocabularyDocument::new(entries))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildOutcome {
    Created,
    /// Document existed and was left untouched
    AlreadyPresent,
    Refreshed,
}

/// Staleness policy: a document older than its dataset is stale. Stale
/// documents are reported, never rebuilt implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Staleness {
    Missing,
    Fresh,
    Stale,
}

/// Builds, refreshes and inspects the persisted vocabulary document
pub struct VocabularyBuilder {
    dataset_path: PathBuf,
    output_path: PathBuf,
    logger: Logger,
}

impl VocabularyBuilder {
    pub fn new(dataset_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            output_path: output_path.into(),
            logger: Logger::new("VOCABULARY"),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Write the document only if it does not exist yet
    pub fn build(&self) -> Result<BuildOutcome, VocabularyError> {
        if self.output_path.exists() || !self.write_document(false)? {
            self.logger.info(&format!(
                "{} already exists, leaving it untouched",
                self.output_path.display()
            ));
            return Ok(BuildOutcome::AlreadyPresent);
        }
        Ok(BuildOutcome::Created)
    }

    /// Rebuild from the dataset and atomically replace the document
    pub fn refresh(&self) -> Result<BuildOutcome, VocabularyError> {
        self.write_document(true)?;
        Ok(BuildOutcome::Refreshed)
    }

    pub fn status(&self) -> Result<Staleness, VocabularyError> {
        if !self.output_path.exists() {
            return Ok(Staleness::Missing);
        }

        let document_time = modified(&self.output_path)?;
        let dataset_time = modified(&self.dataset_path)?;

        if dataset_time > document_time {
            self.logger.warn(&format!(
                "{} is older than {}; run a refresh to pick up new values",
                self.output_path.display(),
                self.dataset_path.display()
            ));
            Ok(Staleness::Stale)
        } else {
            Ok(Staleness::Fresh)
        }
    }

    fn read_dataset(&self) -> Result<VocabularyDocument, VocabularyError> {
        let file = fs::File::open(&self.dataset_path).map_err(|source| VocabularyError::Io {
            path: self.dataset_path.clone(),
            source,
        })?;

        vocabulary_from_csv(file).map_err(|source| VocabularyError::Csv {
            path: self.dataset_path.clone(),
            source,
        })
    }

    /// Returns false when `replace` is off and another writer got there first
    fn write_document(&self, replace: bool) -> Result<bool, VocabularyError> {
        let timer = Timer::start("vocabulary build");
        let document = self.read_dataset()?;
        let content = document.to_pretty_json().map_err(|source| VocabularyError::Json {
            path: self.output_path.clone(),
            source,
        })?;

        let io_error = |source| VocabularyError::Io {
            path: self.output_path.clone(),
            source,
        };
        let parent = match self.output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(io_error)?;

        let mut file = tempfile::NamedTempFile::new_in(&parent).map_err(io_error)?;
        file.write_all(&content).map_err(io_error)?;
        file.as_file().sync_all().map_err(io_error)?;
        let persisted = if replace {
            file.persist(&self.output_path)
        } else {
            file.persist_noclobber(&self.output_path)
        };
        match persisted {
            Ok(_) => {}
            Err(e) if !replace && e.error.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
            Err(source) => {
                return Err(VocabularyError::Persist {
                    path: self.output_path.clone(),
                    source,
                })
            }
        }

        self.logger.info(&format!(
            "Wrote {} ({} keys, {} manufacturers) from {}",
            self.output_path.display(),
            document.len(),
            document.manufacturers().len(),
            self.dataset_path.display()
        ));
        timer.log_elapsed("VOCABULARY");
        Ok(true)
    }
}

fn modified(path: &Path) -> Result<std::time::SystemTime, VocabularyError> {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|source| VocabularyError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Gallery on the local filesystem: one JPEG per capture plus an
/// append-only metadata CSV next to them.
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::codec::image_codec;
use crate::gallery::domain::gallery_store::{
    CaptureMetadata, GalleryEntry, GalleryError, GalleryStore, SavedCapture,
};
use crate::shared::constants::{GITKEEP_NAME, METADATA_CSV_NAME, MISSING_VALUE};
use crate::shared::frame::Frame;

pub const METADATA_HEADER: [&str; 13] = [
    "timestamp",
    "filename",
    "smile_prob",
    "age_label",
    "age_conf",
    "gender_label",
    "gender_conf",
    "emotion_label",
    "emotion_conf",
    "x",
    "y",
    "w",
    "h",
];

/// One CSV row. Field order and names match [`METADATA_HEADER`].
#[derive(Debug, Serialize, Deserialize)]
struct MetadataRow {
    timestamp: String,
    filename: String,
    smile_prob: String,
    age_label: String,
    age_conf: String,
    gender_label: String,
    gender_conf: String,
    emotion_label: String,
    emotion_conf: String,
    x: String,
    y: String,
    w: String,
    h: String,
}

impl MetadataRow {
    fn new(timestamp: String, filename: String, m: &CaptureMetadata) -> Self {
        Self {
            timestamp,
            filename,
            smile_prob: cell(m.smile_prob),
            age_label: m.age_label.clone(),
            age_conf: cell(m.age_conf),
            gender_label: m.gender_label.clone(),
            gender_conf: cell(m.gender_conf),
            emotion_label: m.emotion_label.clone(),
            emotion_conf: cell(m.emotion_conf),
            x: cell(m.x),
            y: cell(m.y),
            w: cell(m.w),
            h: cell(m.h),
        }
    }

    fn into_entry(self) -> GalleryEntry {
        let metadata = CaptureMetadata {
            smile_prob: parse_cell(&self.smile_prob),
            age_conf: parse_cell(&self.age_conf),
            gender_conf: parse_cell(&self.gender_conf),
            emotion_conf: parse_cell(&self.emotion_conf),
            x: parse_cell(&self.x),
            y: parse_cell(&self.y),
            w: parse_cell(&self.w),
            h: parse_cell(&self.h),
            age_label: self.age_label,
            gender_label: self.gender_label,
            emotion_label: self.emotion_label,
        };
        GalleryEntry {
            filename: self.filename,
            timestamp: self.timestamp,
            metadata,
            image: None,
        }
    }
}

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| MISSING_VALUE.to_string(), |v| v.to_string())
}

fn parse_cell<T: FromStr>(raw: &str) -> Option<T> {
    let raw = raw.trim();
    if raw == MISSING_VALUE || raw.is_empty() {
        return None;
    }
    let parsed = raw.parse().ok();
    if parsed.is_none() {
        log::warn!("Ignoring unparsable metadata value {raw:?}");
    }
    parsed
}

pub struct CsvGalleryStore {
    dir: PathBuf,
}

impl CsvGalleryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_CSV_NAME)
    }

    /// Like [`GalleryStore::list`], with every image attached as a data URL.
    /// Entries whose image cannot be read are skipped.
    pub fn list_with_images(&self) -> Result<Vec<GalleryEntry>, GalleryError> {
        let entries = self.list()?;
        Ok(entries
            .into_iter()
            .filter_map(|mut entry| match fs::read(self.dir.join(&entry.filename)) {
                Ok(bytes) => {
                    entry.image = Some(image_codec::jpeg_data_url(&bytes));
                    Some(entry)
                }
                Err(e) => {
                    log::warn!("Skipping unreadable capture {}: {e}", entry.filename);
                    None
                }
            })
            .collect())
    }

    /// Save with an explicit capture time.
    pub fn save_at(
        &self,
        frame: &Frame,
        metadata: &CaptureMetadata,
        now: DateTime<Local>,
    ) -> Result<SavedCapture, GalleryError> {
        fs::create_dir_all(&self.dir)?;
        let stem = now.format("%Y%m%d_%H%M%S").to_string();
        let filename = self.unused_filename(&stem);
        let path = self.dir.join(&filename);

        fs::write(&path, image_codec::encode_jpeg(frame)?)?;
        let row = MetadataRow::new(now.to_rfc3339(), filename.clone(), metadata);
        if let Err(e) = self.append_row(&row) {
            // An image without a row is never listed.
            if let Err(rm) = fs::remove_file(&path) {
                log::warn!("Could not remove orphaned capture {}: {rm}", path.display());
            }
            return Err(e);
        }
        log::info!("Saved capture {}", path.display());

        Ok(SavedCapture {
            filename,
            path,
            timestamp: stem,
        })
    }

    fn unused_filename(&self, stem: &str) -> String {
        let mut name = format!("{stem}.jpg");
        let mut n = 1;
        while self.dir.join(&name).exists() {
            name = format!("{stem}_{n}.jpg");
            n += 1;
        }
        name
    }

    fn append_row(&self, row: &MetadataRow) -> Result<(), GalleryError> {
        let path = self.metadata_path();
        let write_header = !path.exists();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        writer.serialize(row)?;
        writer.flush()?;
        Ok(())
    }

    fn write_header_only(&self) -> Result<(), GalleryError> {
        let mut writer = csv::Writer::from_path(self.metadata_path())?;
        writer.write_record(METADATA_HEADER)?;
        writer.flush()?;
        Ok(())
    }
}

fn validate_filename(filename: &str) -> Result<(), GalleryError> {
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
    {
        return Err(GalleryError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}

impl GalleryStore for CsvGalleryStore {
    fn save(&self, frame: &Frame, metadata: &CaptureMetadata) -> Result<SavedCapture, GalleryError> {
        self.save_at(frame, metadata, Local::now())
    }

    fn list(&self) -> Result<Vec<GalleryEntry>, GalleryError> {
        let path = self.metadata_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(&path)?;
        let mut entries = Vec::new();
        for row in reader.deserialize::<MetadataRow>() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    log::warn!("Skipping malformed metadata row: {e}");
                    continue;
                }
            };
            if self.dir.join(&row.filename).is_file() {
                entries.push(row.into_entry());
            }
        }
        Ok(entries)
    }

    fn delete(&self, filename: &str) -> Result<(), GalleryError> {
        validate_filename(filename)?;

        let image = self.dir.join(filename);
        if image.is_file() {
            fs::remove_file(&image)?;
        }

        let path = self.metadata_path();
        if !path.exists() {
            return Ok(());
        }

        // Raw records, so rows this version cannot parse survive untouched.
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)?;
        let mut records = reader.records();
        let mut kept = Vec::new();
        if let Some(header) = records.next() {
            kept.push(header?);
        }
        for record in records {
            let record = record?;
            if record.len() > 1 && record.get(1) != Some(filename) {
                kept.push(record);
            }
        }
        drop(reader);

        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&path)?;
        for record in &kept {
            writer.write_record(record)?;
        }
        writer.flush()?;
        log::info!("Deleted capture {filename}");
        Ok(())
    }

    fn clear(&self) -> Result<(), GalleryError> {
        fs::create_dir_all(&self.dir)?;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_name() != GITKEEP_NAME && entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
            }
        }
        self.write_header_only()?;
        log::info!("Cleared gallery at {}", self.dir.display());
        Ok(())
    }
}

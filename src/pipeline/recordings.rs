//! Local store of finished sessions.
//!
//! Layout under the store directory:
//!
//! ```text
//! jampilot_recordings.json   index, most recent first
//! audio/<id>.wav             raw microphone capture (32-bit float, mono)
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::audio::RecordedAudio;
use crate::error::StoreError;
use crate::pipeline::settings::JamSettings;
use crate::shared::{Genre, Instrument, Locality};

const INDEX_FILE: &str = "jampilot_recordings.json";
const AUDIO_DIR: &str = "audio";
pub const UNKNOWN_KEY: &str = "?";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub date: DateTime<Utc>,
    pub genre: Genre,
    pub locality: Locality,
    pub instrument: Instrument,
    pub bpm: u16,
    pub key: String,
    /// Seconds.
    pub duration: f64,
    /// Relative to the store directory.
    pub raw_audio: Option<PathBuf>,
    pub mixed_audio: Option<PathBuf>,
}

impl SessionRecord {
    pub fn new(started: DateTime<Utc>, settings: &JamSettings, key: Option<&str>, duration: f64) -> Self {
        Self {
            id: record_id(started),
            date: started,
            genre: settings.genre,
            locality: settings.locality,
            instrument: settings.instrument,
            bpm: settings.bpm,
            key: key.unwrap_or(UNKNOWN_KEY).to_string(),
            duration,
            raw_audio: None,
            mixed_audio: None,
        }
    }
}

pub fn record_id(at: DateTime<Utc>) -> String {
    format!("rec_{}", at.timestamp_millis())
}

pub struct RecordingStore {
    dir: PathBuf,
}

impl RecordingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    /// Absolute path of a path stored in a record.
    pub fn resolve(&self, stored: &Path) -> PathBuf {
        self.dir.join(stored)
    }

    /// All records, most recent first. An unreadable index reads as empty.
    pub fn list(&self) -> Vec<SessionRecord> {
        let path = self.index_path();
        let data = match std::fs::read_to_string(&path) {
            Ok(d) => d,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&data) {
            Ok(records) => records,
            Err(e) => {
                warn!("ignoring unreadable recordings index {}: {e}", path.display());
                Vec::new()
            }
        }
    }

    pub fn find(&self, id: &str) -> Option<SessionRecord> {
        self.list().into_iter().find(|r| r.id == id)
    }

    fn write_index(&self, records: &[SessionRecord]) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        let path = self.index_path();
        let json = serde_json::to_string_pretty(records)?;
        std::fs::write(&path, json).map_err(|e| StoreError::io(&path, e))
    }

    pub fn add(&self, record: SessionRecord) -> Result<(), StoreError> {
        let mut records = self.list();
        debug!(id = %record.id, "adding recording");
        records.insert(0, record);
        self.write_index(&records)
    }

    /// Removes the record and its audio. `Ok(false)` if no such id.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut records = self.list();
        let Some(pos) = records.iter().position(|r| r.id == id) else {
            return Ok(false);
        };
        let removed = records.remove(pos);
        self.write_index(&records)?;
        for blob in [removed.raw_audio, removed.mixed_audio].into_iter().flatten() {
            let path = self.resolve(&blob);
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io(path, e)),
            }
        }
        Ok(true)
    }

    /// Writes the capture as `audio/<id>.wav`; returns the stored (relative)
    /// path, or `None` when nothing was captured.
    pub fn save_raw_audio(&self, id: &str, audio: &RecordedAudio) -> Result<Option<PathBuf>, StoreError> {
        if audio.is_empty() {
            return Ok(None);
        }
        let rel = Path::new(AUDIO_DIR).join(format!("{id}.wav"));
        let path = self.resolve(&rel);
        let audio_dir = self.dir.join(AUDIO_DIR);
        std::fs::create_dir_all(&audio_dir).map_err(|e| StoreError::io(&audio_dir, e))?;

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: audio.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let wav_err = |source| StoreError::Wav { path: path.clone(), source };
        let mut writer = hound::WavWriter::create(&path, spec).map_err(wav_err)?;
        for &s in &audio.samples {
            writer.write_sample(s).map_err(wav_err)?;
        }
        writer.finalize().map_err(wav_err)?;
        Ok(Some(rel))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn record(millis: i64) -> SessionRecord {
        let at = Utc.timestamp_millis_opt(millis).unwrap();
        SessionRecord::new(at, &JamSettings::default(), Some("G"), 12.5)
    }

    #[test]
    fn add_keeps_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path());
        assert!(store.list().is_empty());
        store.add(record(1_000)).unwrap();
        store.add(record(2_000)).unwrap();
        let ids: Vec<_> = store.list().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["rec_2000", "rec_1000"]);
    }

    #[test]
    fn delete_removes_record_and_audio() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path());
        let mut rec = record(5_000);
        let audio = RecordedAudio { samples: vec![0.25; 480], sample_rate: 48000 };
        rec.raw_audio = store.save_raw_audio(&rec.id, &audio).unwrap();
        let wav = store.resolve(rec.raw_audio.as_deref().unwrap());
        assert!(wav.exists());
        store.add(rec).unwrap();
        store.add(record(6_000)).unwrap();

        assert!(store.delete("rec_5000").unwrap());
        assert!(!wav.exists());
        let ids: Vec<_> = store.list().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["rec_6000"]);
        assert!(!store.delete("rec_5000").unwrap());
    }

    #[test]
    fn find_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path());
        store.add(record(1_000)).unwrap();
        store.add(record(2_000)).unwrap();
        assert_eq!(store.find("rec_1000").map(|r| r.bpm), Some(110));
        assert!(store.find("rec_3000").is_none());
    }

    #[test]
    fn corrupt_index_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), "[{\"id\":").unwrap();
        let store = RecordingStore::new(dir.path());
        assert!(store.list().is_empty());
        // and the next add starts a fresh index
        store.add(record(7_000)).unwrap();
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn raw_audio_is_float_mono_wav() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path());
        let audio = RecordedAudio { samples: vec![0.5, -0.5, 0.125], sample_rate: 44100 };
        let rel = store.save_raw_audio("rec_1", &audio).unwrap().unwrap();
        assert_eq!(rel, Path::new("audio").join("rec_1.wav"));

        let mut reader = hound::WavReader::open(store.resolve(&rel)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.sample_format, hound::SampleFormat::Float);
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, audio.samples);
    }

    #[test]
    fn empty_capture_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path());
        assert_eq!(store.save_raw_audio("rec_2", &RecordedAudio::default()).unwrap(), None);
        assert!(!dir.path().join(AUDIO_DIR).exists());
    }

    #[test]
    fn record_json_is_camel_case() {
        let mut rec = record(1_700_000_000_000);
        rec.raw_audio = Some(PathBuf::from("audio/x.wav"));
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["id"], "rec_1700000000000");
        assert_eq!(json["rawAudio"], "audio/x.wav");
        assert!(json["mixedAudio"].is_null());
        assert_eq!(json["instrument"], "full_band");
        assert_eq!(json["key"], "G");
        assert!(json["date"].as_str().unwrap().starts_with("2023-11-14T22:13:20"));
    }

    #[test]
    fn missing_key_is_question_mark() {
        let r = SessionRecord::new(Utc::now(), &JamSettings::default(), None, 0.0);
        assert_eq!(r.key, UNKNOWN_KEY);
    }
}

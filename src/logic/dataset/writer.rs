use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::logic::dataset::get_dataset_dir;
use crate::logic::dataset::record::DatasetRecord;

const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10 MB

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_files: usize,
    pub total_size_mb: f32,
    pub current_file: String,
    pub records_written: u64,
}

struct WriterState {
    file: Option<File>,
    seq: u32,
    records: u64,
}

pub struct DatasetWriter {
    state: Mutex<WriterState>,
    base_dir: PathBuf,
    max_file_size: u64,
}

impl DatasetWriter {
    pub fn new() -> io::Result<Self> {
        Self::from_path(get_dataset_dir())
    }

    pub fn from_path(base_dir: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&base_dir)?;

        Ok(Self {
            state: Mutex::new(WriterState { file: None, seq: 0, records: 0 }),
            base_dir,
            max_file_size: MAX_FILE_SIZE,
        })
    }

    /// Rotate at a custom size
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Append record to dataset log
    /// Handles file rotation automatically
    pub fn append(&self, record: &DatasetRecord) -> io::Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        // If file not open, reuse latest or create new
        if state.file.is_none() {
            let reuse = match self.find_latest_log_file()? {
                Some(path) => {
                    // Continue numbering after the files already on disk
                    if let Some(last) = file_seq(&path) {
                        state.seq = state.seq.max(last);
                    }
                    let f = OpenOptions::new().create(true).append(true).open(&path)?;
                    if f.metadata()?.len() < self.max_file_size { Some(f) } else { None }
                }
                None => None,
            };
            state.file = match reuse {
                Some(f) => Some(f),
                None => Some(self.create_new_file(&mut state.seq)?),
            };
        }

        // Becomes full during runtime
        let should_rotate = match state.file.as_ref() {
            Some(f) => f.metadata()?.len() >= self.max_file_size,
            None => false,
        };
        if should_rotate {
            state.file = Some(self.create_new_file(&mut state.seq)?);
        }

        if let Some(file) = state.file.as_mut() {
            let json = serde_json::to_string(record)?;
            writeln!(file, "{}", json)?;
        }
        state.records += 1;

        Ok(())
    }

    pub fn get_stats(&self) -> io::Result<DatasetStats> {
        let mut count = 0;
        let mut size = 0u64;

        let mut entry_paths = Vec::new();
        for entry in fs::read_dir(&self.base_dir)?.flatten() {
            let path = entry.path();
            if is_jsonl(&path) {
                count += 1;
                if let Ok(meta) = entry.metadata() {
                    size += meta.len();
                }
                entry_paths.push(path);
            }
        }

        let current_file = entry_paths
            .iter()
            .max()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or("None")
            .to_string();

        Ok(DatasetStats {
            total_files: count,
            total_size_mb: size as f32 / 1024.0 / 1024.0,
            current_file,
            records_written: self.state.lock().records,
        })
    }

    fn create_new_file(&self, seq: &mut u32) -> io::Result<File> {
        *seq += 1;
        // YYYY-MM-DD-HHMMSS-seq, sorts chronologically
        let filename = format!("dataset-{}-{:04}.jsonl", Utc::now().format("%Y-%m-%d-%H%M%S"), seq);
        let path = self.base_dir.join(filename);

        OpenOptions::new().create(true).append(true).open(path)
    }

    fn find_latest_log_file(&self) -> io::Result<Option<PathBuf>> {
        let mut entries = fs::read_dir(&self.base_dir)?
            .filter_map(|res| res.ok())
            .map(|e| e.path())
            .filter(|p| is_jsonl(p))
            .collect::<Vec<_>>();

        entries.sort();
        Ok(entries.pop())
    }
}

/// Trailing `-NNNN` of a journal file name
fn file_seq(path: &Path) -> Option<u32> {
    path.file_stem()?.to_str()?.rsplit('-').next()?.parse().ok()
}

pub(crate) fn is_jsonl(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "jsonl")
}

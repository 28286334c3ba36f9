//! Line Source - `voltage,current,power` text protocol
//!
//! Firmware gửi một dòng mỗi lần đo. Chỉ tin V và |I|; power luôn tính lại.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::logic::features::Sample;
use super::{SampleSource, SourceError};

/// Parse one line into a Sample stamped now.
/// Exactly three comma-separated finite numbers, else None.
pub fn parse_line(line: &str) -> Option<Sample> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() != 3 {
        return None;
    }

    let voltage: f64 = parts[0].trim().parse().ok()?;
    let current: f64 = parts[1].trim().parse().ok()?;
    let reported_power: f64 = parts[2].trim().parse().ok()?;
    if !voltage.is_finite() || !current.is_finite() || !reported_power.is_finite() {
        return None;
    }

    Some(Sample::now(voltage, current.abs()))
}

pub struct LineSource<R: BufRead> {
    reader: R,
    label: String,
    buf: String,
    exhausted: bool,
    discarded: u64,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R, label: impl Into<String>) -> Self {
        Self {
            reader,
            label: label.into(),
            buf: String::new(),
            exhausted: false,
            discarded: 0,
        }
    }

    /// Lines rejected as malformed so far
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

/// Open a device node (e.g. `/dev/ttyUSB0`, pre-configured with stty) or a
/// capture file
pub fn open_device(path: &Path) -> Result<LineSource<BufReader<File>>, SourceError> {
    let file = File::open(path).map_err(|source| SourceError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(LineSource::new(BufReader::new(file), path.display().to_string()))
}

impl<R: BufRead> SampleSource for LineSource<R> {
    fn poll(&mut self) -> Result<Option<Sample>, SourceError> {
        if self.exhausted {
            return Ok(None);
        }

        self.buf.clear();
        let read = self.reader.read_line(&mut self.buf)?;
        if read == 0 {
            self.exhausted = true;
            log::info!("{}: end of stream", self.label);
            return Ok(None);
        }

        match parse_line(&self.buf) {
            Some(sample) => Ok(Some(sample)),
            None => {
                self.discarded += 1;
                log::debug!("{}: discarded line {:?}", self.label, self.buf.trim_end());
                Ok(None)
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn describe(&self) -> String {
        format!("line stream ({})", self.label)
    }
}

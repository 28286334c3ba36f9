use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use super::writer::is_jsonl;

/// Merge all dataset files in `source_dir` into a single JSONL file.
/// Returns the number of source files merged.
pub fn to_jsonl(source_dir: &Path, target_path: &Path) -> io::Result<usize> {
    if !source_dir.exists() {
        return Err(io::Error::new(io::ErrorKind::NotFound, "Dataset directory not found"));
    }

    // Sort by filename to keep chronological order
    let mut paths: Vec<_> = fs::read_dir(source_dir)?
        .filter_map(|r| r.ok())
        .map(|e| e.path())
        .filter(|p| is_jsonl(p) && p.as_path() != target_path)
        .collect();
    paths.sort();

    let mut output_file = File::create(target_path)?;
    let mut file_count = 0;

    for path in paths {
        let content = fs::read(&path)?;
        output_file.write_all(&content)?;

        if let Some(&last_byte) = content.last() {
            if last_byte != b'\n' {
                output_file.write_all(b"\n")?;
            }
        }

        file_count += 1;
    }

    output_file.flush()?;
    log::info!("Exported {} dataset files to {}", file_count, target_path.display());
    Ok(file_count)
}

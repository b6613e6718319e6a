//! JSON artifact reading and writing
//!
//! Artifacts are written from ordered containers only, so identical inputs
//! give byte-identical files.

use crate::{Result, StatsError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Write a compact JSON artifact, creating parent directories
pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    write_with(path.as_ref(), |writer| serde_json::to_writer(writer, value))
}

/// Write a pretty-printed JSON artifact (small, human-read files)
pub fn write_json_pretty<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    write_with(path.as_ref(), |writer| serde_json::to_writer_pretty(writer, value))
}

fn write_with<F>(path: &Path, serialize: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> serde_json::Result<()>,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serialize(&mut writer).map_err(|source| StatsError::Artifact {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush()?;
    Ok(())
}

/// Read a JSON artifact; a missing file is reported as [`StatsError::MissingInput`]
pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(StatsError::MissingInput(path.to_path_buf()));
    }
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(|source| StatsError::Artifact {
        path: path.to_path_buf(),
        source,
    })
}

/// All `*.json` files directly inside `dir`, sorted by file name
pub fn list_json<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(StatsError::MissingInput(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_json::<Vec<u32>, _>(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, StatsError::MissingInput(_)));
    }

    #[test]
    fn test_malformed_artifact_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = read_json::<Vec<u32>, _>(&path).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn test_write_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let mut value = BTreeMap::new();
        value.insert("b".to_string(), vec![1.5, 2.25]);
        value.insert("a".to_string(), vec![0.1]);

        let first = dir.path().join("nested/one.json");
        let second = dir.path().join("nested/two.json");
        write_json(&first, &value).unwrap();
        write_json(&second, &value).unwrap();

        assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
        let back: BTreeMap<String, Vec<f64>> = read_json(&first).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_list_json_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["2001.json", "1999.json", "notes.txt"] {
            std::fs::write(dir.path().join(name), "[]").unwrap();
        }
        let files = list_json(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["1999.json", "2001.json"]);
    }
}

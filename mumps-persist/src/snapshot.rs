// On-disk snapshot format: a 4-byte magic, a 1-byte version, then an
// rmp_serde encoding of the store's full global map, the whole thing
// gzipped. Writing goes through a `<file>.tmp` + fsync + rename so a
// crash mid-write never leaves a half-written file at the real path
// (the same discipline the teacher's `ioutil::FileWriter` uses before
// handing a file back out as a reader: flush, sync, only then proceed).

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path as FsPath;
use std::time::Instant;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use mumps_base::{err_kind, Kind, Result};
use mumps_store::TreeNode;

const MAGIC: [u8; 4] = *b"MMPS";
const VERSION: u8 = 1;

pub struct SnapshotStats {
    pub duration: std::time::Duration,
    pub byte_size: u64,
}

/// Writes `globals` to `path` atomically: encode, gzip, write to a
/// sibling `.tmp` file, fsync, then rename over `path`.
pub fn write_snapshot(path: &FsPath, globals: &BTreeMap<String, TreeNode>) -> Result<SnapshotStats> {
    let start = Instant::now();
    let payload = rmp_serde::to_vec(globals).map_err(|e| err_kind(Kind::Io, e.to_string()))?;

    let tmp_path = path.with_extension("tmp");
    let file = File::create(&tmp_path)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(&MAGIC)?;
    encoder.write_all(&[VERSION])?;
    encoder.write_all(&payload)?;
    let file = encoder.finish()?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    let byte_size = fs::metadata(path)?.len();
    Ok(SnapshotStats {
        duration: start.elapsed(),
        byte_size,
    })
}

/// Reads a snapshot written by `write_snapshot`. A missing file is not
/// an error: callers treat "no snapshot yet" as an empty store.
pub fn read_snapshot(path: &FsPath) -> Result<Option<BTreeMap<String, TreeNode>>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path)?;
    let mut decoder = GzDecoder::new(file);
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;

    if buf.len() < 5 || buf[0..4] != MAGIC {
        return Err(err_kind(Kind::Io, "snapshot file missing magic header"));
    }
    let version = buf[4];
    if version != VERSION {
        return Err(err_kind(Kind::Io, format!("unsupported snapshot version: {version}")));
    }
    let globals = rmp_serde::from_slice(&buf[5..]).map_err(|e| err_kind(Kind::Io, e.to_string()))?;
    Ok(Some(globals))
}

#[cfg(test)]
mod test {
    use super::*;
    use mumps_model::{SubscriptElement, Value};

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = std::env::temp_dir().join(format!("mumps-persist-test-{:?}", std::thread::current().id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("snapshot.mmps");

        let mut globals = BTreeMap::new();
        let mut node = TreeNode::new();
        node.set(&[SubscriptElement::Int(1)], Value::Str("John".to_string()));
        globals.insert("^P".to_string(), node);

        write_snapshot(&path, &globals).unwrap();
        let read_back = read_snapshot(&path).unwrap().unwrap();
        assert_eq!(
            read_back.get("^P").unwrap().get(&[SubscriptElement::Int(1)]),
            Some(&Value::Str("John".to_string()))
        );
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_read_missing_file_is_none() {
        let path = FsPath::new("/nonexistent/path/to/mumps-snapshot.mmps");
        assert!(read_snapshot(path).unwrap().is_none());
    }
}

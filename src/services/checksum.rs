use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

const CHUNK_SIZE: usize = 8192;

/// Hex SHA-256 of the whole file, read in fixed-size chunks.
pub fn file_checksum(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn identical_bytes_share_a_checksum_regardless_of_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("a.xlsx");
        let b = dir.path().join("renamed.xlsx");
        std::fs::write(&a, b"same bytes").expect("write a");
        std::fs::write(&b, b"same bytes").expect("write b");
        assert_eq!(file_checksum(&a).expect("hash a"), file_checksum(&b).expect("hash b"));
    }

    #[test]
    fn one_byte_changes_the_checksum() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("f.xlsx");
        std::fs::write(&path, b"payload").expect("write");
        let before = file_checksum(&path).expect("hash");
        let mut f = std::fs::OpenOptions::new().append(true).open(&path).expect("open");
        f.write_all(b"!").expect("append");
        drop(f);
        assert_ne!(before, file_checksum(&path).expect("hash"));
    }

    #[test]
    fn known_digest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty");
        std::fs::write(&path, b"").expect("write");
        assert_eq!(
            file_checksum(&path).expect("hash"),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}

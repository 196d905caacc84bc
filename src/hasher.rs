//! Content hashing for duplicate detection.
//!
//! Files are read in fixed 4 KiB blocks so memory use stays bounded regardless
//! of file size. The digest is only ever compared for equality.

use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Size of each read while hashing.
pub const HASH_BLOCK_SIZE: usize = 4096;

/// A SHA-256 digest of a file's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Computes the content digest of the file at `path`.
///
/// # Errors
///
/// Returns an `io::Error` if the path is not a regular file, cannot be opened,
/// or a read fails partway through.
pub fn hash_file(path: &Path) -> io::Result<ContentDigest> {
    if !path.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a regular file", path.display()),
        ));
    }

    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_BLOCK_SIZE];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    let digest = ContentDigest(hasher.finalize().into());
    tracing::debug!(path = %path.display(), %digest, "hashed file");
    Ok(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_hash_known_content() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("empty.bin");
        fs::write(&path, b"").expect("Failed to write file");

        let digest = hash_file(&path).expect("Failed to hash");
        assert_eq!(
            digest.to_string(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hash_is_deterministic() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("data.txt");
        fs::write(&path, "same bytes").expect("Failed to write file");

        assert_eq!(hash_file(&path).unwrap(), hash_file(&path).unwrap());
    }

    #[test]
    fn test_identical_content_different_names() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let sub = temp_dir.path().join("nested");
        fs::create_dir(&sub).expect("Failed to create dir");
        let a = temp_dir.path().join("a.txt");
        let b = sub.join("completely_different.bin");
        fs::write(&a, "payload").unwrap();
        fs::write(&b, "payload").unwrap();

        assert_eq!(hash_file(&a).unwrap(), hash_file(&b).unwrap());
    }

    #[test]
    fn test_single_byte_difference() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let a = temp_dir.path().join("a.bin");
        let b = temp_dir.path().join("b.bin");
        let mut bytes = vec![7u8; HASH_BLOCK_SIZE * 3 + 17];
        fs::write(&a, &bytes).unwrap();
        let last = bytes.len() - 1;
        bytes[last] = 8;
        fs::write(&b, &bytes).unwrap();

        assert_ne!(hash_file(&a).unwrap(), hash_file(&b).unwrap());
    }

    #[test]
    fn test_hash_missing_file_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = hash_file(&temp_dir.path().join("missing.txt"));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_hash_directory_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        assert!(hash_file(temp_dir.path()).is_err());
    }
}

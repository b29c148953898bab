use async_trait::async_trait;
use clap::ValueEnum;
use digest::Digest;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncReadExt;

/// Files are fed to the digest in blocks of this size.
pub const HASH_CHUNK_SIZE: usize = 4096;

#[derive(Error, Debug)]
pub enum HashError {
    #[error("File not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Error calculating hash for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
    Sha1,
    Md5,
}

impl HashAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
            Self::Sha1 => "sha1",
            Self::Md5 => "md5",
        }
    }
}

enum ContentDigestHasher {
    Sha1(Sha1),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
    Md5(Md5),
}

/// Incremental digest over one of the supported algorithms.
pub struct ContentHasher {
    hasher: ContentDigestHasher,
}

impl ContentHasher {
    #[inline]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let hasher = match algorithm {
            HashAlgorithm::Md5 => ContentDigestHasher::Md5(Md5::new()),
            HashAlgorithm::Sha1 => ContentDigestHasher::Sha1(Sha1::new()),
            HashAlgorithm::Sha256 => ContentDigestHasher::Sha256(Sha256::new()),
            HashAlgorithm::Sha384 => ContentDigestHasher::Sha384(Sha384::new()),
            HashAlgorithm::Sha512 => ContentDigestHasher::Sha512(Sha512::new()),
        };
        Self { hasher }
    }

    #[inline]
    pub fn update(&mut self, data: impl AsRef<[u8]>) {
        match &mut self.hasher {
            ContentDigestHasher::Sha1(digest) => Digest::update(digest, data.as_ref()),
            ContentDigestHasher::Sha256(digest) => Digest::update(digest, data.as_ref()),
            ContentDigestHasher::Sha384(digest) => Digest::update(digest, data.as_ref()),
            ContentDigestHasher::Sha512(digest) => Digest::update(digest, data.as_ref()),
            ContentDigestHasher::Md5(digest) => Digest::update(digest, data.as_ref()),
        };
    }

    /// Lowercase hex encoding of the digest.
    pub fn finalize_hex(self) -> String {
        let digest = match self.hasher {
            ContentDigestHasher::Sha1(digest) => digest.finalize().to_vec(),
            ContentDigestHasher::Sha256(digest) => digest.finalize().to_vec(),
            ContentDigestHasher::Sha384(digest) => digest.finalize().to_vec(),
            ContentDigestHasher::Sha512(digest) => digest.finalize().to_vec(),
            ContentDigestHasher::Md5(digest) => digest.finalize().to_vec(),
        };
        hex::encode(digest)
    }
}

pub async fn hash_file(path: &Path, algorithm: HashAlgorithm) -> Result<String, HashError> {
    let io_error = |source: std::io::Error| HashError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(HashError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(io_error(e)),
    };

    let mut hasher = ContentHasher::new(algorithm);
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let bytes_read = file.read(&mut buffer).await.map_err(io_error)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize_hex())
}

/// Produces the digest recorded in the ledger for a downloaded file.
#[async_trait]
pub trait FileDigester: Send + Sync {
    async fn digest_file(&self, path: &Path) -> Result<String, HashError>;
}

#[async_trait]
impl FileDigester for HashAlgorithm {
    async fn digest_file(&self, path: &Path) -> Result<String, HashError> {
        hash_file(path, *self).await
    }
}

pub mod content_digest_hasher;

pub use content_digest_hasher::{
    ContentHasher, FileDigester, HASH_CHUNK_SIZE, HashAlgorithm, HashError, hash_file,
};

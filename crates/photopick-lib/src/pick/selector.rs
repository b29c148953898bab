use super::types::Candidate;
use crate::download::ExtensionProbe;
use crate::ledger::Ledger;
use crate::remote::RemoteItem;
use crate::verification::{HashAlgorithm, HashError, hash_file};
use rand::Rng;
use std::path::{Path, PathBuf};

/// Escapes every byte outside `[A-Za-z0-9_-]` as `~XX` (upper-case hex). The
/// escape character is itself escaped, so distinct ids never share a file name.
fn sanitize_item_id(item_id: &str) -> String {
    let mut sanitized = String::with_capacity(item_id.len());
    for byte in item_id.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => sanitized.push(byte as char),
            _ => {
                sanitized.push('~');
                sanitized.push_str(&hex::encode_upper([byte]));
            }
        }
    }
    sanitized
}

/// Where the item with `item_id` is stored locally: `photo_<id><extension>`.
pub fn target_path(output_dir: &Path, item_id: &str, extension: &str) -> PathBuf {
    output_dir.join(format!("photo_{}{}", sanitize_item_id(item_id), extension))
}

/// True when the ledger has a digest for `item_id` and the file at `path`
/// still hashes to it. Hashing failures count as "not fetched".
pub async fn is_already_fetched(
    ledger: &Ledger,
    item_id: &str,
    path: &Path,
    algorithm: HashAlgorithm,
) -> bool {
    let Some(stored_digest) = ledger.get(item_id) else {
        return false;
    };

    match hash_file(path, algorithm).await {
        Ok(current) if current == stored_digest => {
            tracing::info!(item_id, path = %path.display(), "File already downloaded with matching hash. Skipping");
            true
        }
        Ok(_) => {
            tracing::info!(item_id, path = %path.display(), "File changed since download, will fetch again");
            false
        }
        Err(HashError::NotFound { .. }) => {
            tracing::debug!(item_id, path = %path.display(), "Recorded file missing, will fetch again");
            false
        }
        Err(e) => {
            tracing::warn!(item_id, error = %e, "Could not verify existing file, will fetch again");
            false
        }
    }
}

/// Items that are not verifiably present on disk, paired with their target paths.
pub async fn filter_candidates(
    items: Vec<RemoteItem>,
    ledger: &Ledger,
    output_dir: &Path,
    algorithm: HashAlgorithm,
    probe: &ExtensionProbe,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for item in items {
        let extension = probe.infer(&item.source_url).await;
        let target_path = target_path(output_dir, &item.id, &extension);
        if is_already_fetched(ledger, &item.id, &target_path, algorithm).await {
            continue;
        }
        candidates.push(Candidate { item, target_path });
    }
    candidates
}

/// Picks one candidate uniformly at random.
pub fn choose_candidate<R: Rng + ?Sized>(
    mut candidates: Vec<Candidate>,
    rng: &mut R,
) -> Option<Candidate> {
    if candidates.is_empty() {
        return None;
    }
    let index = rng.random_range(0..candidates.len());
    Some(candidates.swap_remove(index))
}

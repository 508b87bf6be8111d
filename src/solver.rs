use sha2::{Digest, Sha512};

/// Finds the proof-of-work nonce for a checkpoint challenge.
///
/// Returns the smallest `nonce >= 1` such that the lowercase hex SHA-512 digest of
/// `challenge` followed by the decimal `nonce` starts with `difficulty` zeros.
///
/// The search is unbounded and CPU-bound. Run it off the async executor.
pub fn solve(challenge: &str, difficulty: u32) -> u64 {
    let target = "0".repeat(difficulty as usize);
    let prefixed = Sha512::new_with_prefix(challenge.as_bytes());

    let mut nonce = 0u64;
    loop {
        nonce += 1;
        let digest = prefixed.clone().chain_update(nonce.to_string()).finalize();
        if hex::encode(digest).starts_with(&target) {
            return nonce;
        }
    }
}

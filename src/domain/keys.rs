//! Stable cache keys for stylesheet requests.
//!
//! Keys are lowercase hex SHA-256 digests: fixed width, free of path
//! separators and independent of process state, so an entry written by one
//! run is found again by the next.

use sha2::{Digest, Sha256};

/// Width in characters of every key returned by [`derive_key`].
pub const KEY_LEN: usize = 64;

/// Derive the cache key for a logical resource identifier such as a family list.
pub fn derive_key(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn identical_inputs_share_a_key() {
        assert_eq!(derive_key("Roboto"), derive_key("Roboto"));
        assert_eq!(
            derive_key("Open Sans:300,400|Lato"),
            derive_key("Open Sans:300,400|Lato")
        );
    }

    #[test]
    fn keys_are_fixed_width_lowercase_hex() {
        for input in ["", "a", "Roboto", "Noto Sans JP:wght@100..900"] {
            let key = derive_key(input);
            assert_eq!(key.len(), KEY_LEN);
            assert!(
                key.chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
            );
        }
    }

    #[test]
    fn known_digest_is_stable_across_runs() {
        assert_eq!(
            derive_key("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn distinct_families_do_not_collide() {
        let keys: HashSet<String> = (0..5_000)
            .map(|index| derive_key(&format!("Family {index}:400,700")))
            .collect();
        assert_eq!(keys.len(), 5_000);
    }
}

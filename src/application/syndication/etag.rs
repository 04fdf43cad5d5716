//! Content-hash entity tags.
//!
//! A tag is the fixed prefix followed by the first 128 bits of the SHA-256 of
//! the feed body, hex encoded. Anything not shaped like that is not ours.

use sha2::{Digest, Sha256};

pub const ETAG_PREFIX: &str = "syn";
pub const ETAG_HASH_LEN: usize = 32;
pub const ETAG_LEN: usize = ETAG_PREFIX.len() + ETAG_HASH_LEN;

pub fn compute(body: &[u8]) -> String {
    let digest = Sha256::digest(body);
    format!("{ETAG_PREFIX}{}", hex::encode(&digest[..ETAG_HASH_LEN / 2]))
}

pub fn is_well_formed(tag: &str) -> bool {
    tag.len() == ETAG_LEN
        && tag.starts_with(ETAG_PREFIX)
        && tag[ETAG_PREFIX.len()..]
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

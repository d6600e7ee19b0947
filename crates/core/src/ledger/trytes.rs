use rand::Rng;
use sha2::{Digest, Sha256};

pub const TRYTE_ALPHABET: &[u8; 27] = b"9ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of account ids and deposit addresses.
pub const HASH_TRYTES: usize = 81;

pub fn random_trytes(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| TRYTE_ALPHABET[rng.gen_range(0..TRYTE_ALPHABET.len())] as char)
        .collect()
}

/// Deterministic tryte string derived from `seed`, extended by re-hashing with a counter.
pub fn trytes_from_seed(seed: &[u8], len: usize) -> String {
    let mut out = String::with_capacity(len);
    let mut round: u32 = 0;
    while out.len() < len {
        let digest = Sha256::new()
            .chain_update(seed)
            .chain_update(round.to_be_bytes())
            .finalize();
        out.extend(
            digest
                .iter()
                .map(|b| TRYTE_ALPHABET[*b as usize % TRYTE_ALPHABET.len()] as char)
                .take(len - out.len()),
        );
        round += 1;
    }
    out
}

pub fn is_trytes(s: &str) -> bool {
    s.bytes().all(|b| TRYTE_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_trytes_are_stable() {
        let a = trytes_from_seed(b"seed", HASH_TRYTES);
        let b = trytes_from_seed(b"seed", HASH_TRYTES);
        assert_eq!(a, b);
        assert_eq!(a.len(), HASH_TRYTES);
        assert!(is_trytes(&a));
        assert_ne!(a, trytes_from_seed(b"other seed", HASH_TRYTES));
    }

    #[test]
    fn random_trytes_use_alphabet() {
        let t = random_trytes(HASH_TRYTES);
        assert_eq!(t.len(), HASH_TRYTES);
        assert!(is_trytes(&t));
        assert!(!is_trytes("abc"));
    }
}

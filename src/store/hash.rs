//! MurmurHash2 fingerprints for stored strings.
//!
//! Words are read little-endian so the fingerprint of a string is the same on
//! every target, regardless of native byte order or alignment.

/// Process-wide seed for [`fingerprint`].
pub const HASH_SEED: u32 = 0xf9a0_25a4;

const M: u32 = 0x5bd1_e995;
const R: u32 = 24;

/// MurmurHash2 over `data` with an explicit seed.
pub fn murmur2(data: &[u8], seed: u32) -> u32 {
    // длина складывается по модулю 2^32, как в исходном алгоритме
    let mut h = seed ^ (data.len() as u32);

    let mut words = data.chunks_exact(4);
    for word in &mut words {
        let mut k = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);

        h = h.wrapping_mul(M);
        h ^= k;
    }

    let tail = words.remainder();
    match tail.len() {
        3 => {
            h ^= (tail[2] as u32) << 16;
            h ^= (tail[1] as u32) << 8;
            h ^= tail[0] as u32;
        }
        2 => {
            h ^= (tail[1] as u32) << 8;
            h ^= tail[0] as u32;
        }
        1 => h ^= tail[0] as u32,
        _ => {}
    }
    h = h.wrapping_mul(M);

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^= h >> 15;
    h
}

/// Fingerprint used to bucket and pre-filter stored strings.
#[inline]
pub fn fingerprint(data: &[u8]) -> u32 {
    murmur2(data, HASH_SEED)
}

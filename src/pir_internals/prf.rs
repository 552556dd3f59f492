use aes::Aes128;
use aes::cipher::{BlockEncrypt, KeyInit, generic_array::GenericArray};
use rand::RngCore;

pub const PRF_KEY_BYTE_LEN: usize = 16;

pub type PrfKey = [u8; PRF_KEY_BYTE_LEN];

/// Keyed pseudorandom function mapping a `(tag, chunk_id)` pair to one 64-bit word.
///
/// One key lives for exactly one preprocessing epoch. Every hint offset is re-derived on demand
/// from `(key, short_tag, chunk_id)` and never stored, which is what keeps per-hint storage to a
/// single tag word instead of one word per chunk.
pub struct Prf {
    cipher: Aes128,
}

impl Prf {
    /// Expands the AES-128 key schedule once; `eval` then costs a single block encryption.
    pub fn new(key: &PrfKey) -> Prf {
        Prf {
            cipher: Aes128::new(&GenericArray::from(*key)),
        }
    }

    /// Samples a fresh key from the caller's CSPRNG.
    pub fn random_key(rng: &mut impl RngCore) -> PrfKey {
        let mut key = [0u8; PRF_KEY_BYTE_LEN];
        rng.fill_bytes(&mut key);
        key
    }

    /// Deterministic evaluation: AES-128 over the block `tag ‖ chunk_id`, truncated to 64 bits.
    /// Callers mask the result down to a chunk offset.
    #[inline(always)]
    pub fn eval(&self, tag: u64, chunk_id: u64) -> u64 {
        let mut block = GenericArray::from([0u8; 16]);
        block[..8].copy_from_slice(&tag.to_le_bytes());
        block[8..].copy_from_slice(&chunk_id.to_le_bytes());

        self.cipher.encrypt_block(&mut block);

        let mut word = [0u8; 8];
        word.copy_from_slice(&block[..8]);
        u64::from_le_bytes(word)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn evaluation_is_deterministic_per_key() {
        let mut rng = ChaCha8Rng::from_os_rng();
        let key = Prf::random_key(&mut rng);

        let prf_a = Prf::new(&key);
        let prf_b = Prf::new(&key);

        for tag in 0..64u64 {
            for chunk_id in 0..16u64 {
                assert_eq!(prf_a.eval(tag, chunk_id), prf_b.eval(tag, chunk_id));
            }
        }
    }

    #[test]
    fn distinct_keys_disagree() {
        let mut rng = ChaCha8Rng::from_os_rng();

        let prf_a = Prf::new(&Prf::random_key(&mut rng));
        let prf_b = Prf::new(&Prf::random_key(&mut rng));

        let num_disagreements = (0..256u64).filter(|&tag| prf_a.eval(tag, 0) != prf_b.eval(tag, 0)).count();
        assert!(num_disagreements > 250);
    }

    #[test]
    fn tag_and_chunk_inputs_are_separated() {
        let mut rng = ChaCha8Rng::from_os_rng();
        let prf = Prf::new(&Prf::random_key(&mut rng));

        // Swapping tag and chunk-id must not alias onto the same word.
        assert_ne!(prf.eval(1, 2), prf.eval(2, 1));
        assert_ne!(prf.eval(0, 1), prf.eval(1, 0));
    }
}

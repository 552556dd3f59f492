//! Word-wise XOR over variable-length record vectors.
//!
//! Records are ragged: a record shorter than the configured maximum behaves, under XOR, as if it
//! were zero-padded on the tail. Operations therefore stop at the shorter operand's length and
//! leave any excess of the longer operand untouched, without allocating.

/// XORs `src` into `dst` up to the shorter operand's length.
///
/// Self-inverse: `xor_into(xor_into(dst, src), src)` restores `dst`. Preprocessing folds millions
/// of records through this, so the bulk runs in 8-word strides with a scalar tail.
#[inline]
pub fn xor_into(dst: &mut [u64], src: &[u64]) {
    let n = dst.len().min(src.len());

    let (dst_blocks, dst_tail) = dst[..n].split_at_mut(n & !7);
    let (src_blocks, src_tail) = src[..n].split_at(n & !7);

    for (d, s) in dst_blocks.chunks_exact_mut(8).zip(src_blocks.chunks_exact(8)) {
        d[0] ^= s[0];
        d[1] ^= s[1];
        d[2] ^= s[2];
        d[3] ^= s[3];
        d[4] ^= s[4];
        d[5] ^= s[5];
        d[6] ^= s[6];
        d[7] ^= s[7];
    }
    for (d, s) in dst_tail.iter_mut().zip(src_tail.iter()) {
        *d ^= s;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;
    use test_case::test_case;

    fn random_words(rng: &mut ChaCha8Rng, num_words: usize) -> Vec<u64> {
        (0..num_words).map(|_| rng.random::<u64>()).collect()
    }

    #[test_case(8, 8; "equal lengths on the stride boundary")]
    #[test_case(13, 13; "equal lengths with a scalar tail")]
    #[test_case(21, 5; "destination longer than source")]
    #[test_case(5, 21; "source longer than destination")]
    #[test_case(0, 17; "empty destination")]
    #[test_case(17, 0; "empty source")]
    fn xor_is_an_involution(dst_words: usize, src_words: usize) {
        let mut rng = ChaCha8Rng::from_os_rng();

        let original = random_words(&mut rng, dst_words);
        let src = random_words(&mut rng, src_words);

        let mut dst = original.clone();
        xor_into(&mut dst, &src);
        xor_into(&mut dst, &src);

        assert_eq!(dst, original);
    }

    #[test]
    fn words_beyond_the_shorter_operand_are_untouched() {
        let mut rng = ChaCha8Rng::from_os_rng();

        let original = random_words(&mut rng, 32);
        let src = random_words(&mut rng, 11);

        let mut dst = original.clone();
        xor_into(&mut dst, &src);

        assert_eq!(&dst[11..], &original[11..]);
        for i in 0..11 {
            assert_eq!(dst[i], original[i] ^ src[i]);
        }
    }

    #[test]
    fn short_entry_acts_as_zero_padded() {
        let mut rng = ChaCha8Rng::from_os_rng();

        let acc_original = random_words(&mut rng, 16);
        let short_entry = random_words(&mut rng, 6);

        let mut padded_entry = short_entry.clone();
        padded_entry.resize(16, 0);

        let mut acc_ragged = acc_original.clone();
        xor_into(&mut acc_ragged, &short_entry);

        let mut acc_padded = acc_original;
        xor_into(&mut acc_padded, &padded_entry);

        assert_eq!(acc_ragged, acc_padded);
    }
}

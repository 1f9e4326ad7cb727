//! Fiat–Shamir transcript with domain separation.
//!
//! Deterministic, label-stable transform built on BLAKE3: every absorb is
//! prefixed by a fixed domain-separation tag plus a label (here: the registry
//! identifier of the column, query or coin being bound) and an explicit byte
//! length, so the prover and the verifier replay the exact same byte schedule.
//!
//! Challenge derivation clones the running hash state and reads the BLAKE3
//! XOF, so deriving a challenge does not consume the absorb state; only a
//! local counter advances. Field challenges reduce 64 uniform bytes modulo p;
//! bounded-integer challenges use rejection sampling over a power-of-two mask
//! so the draw stays uniform.

use std::io::Read;

use ark_ff::PrimeField;
use ark_serialize::CanonicalSerialize;
use blake3::Hasher;

use crate::F;

const TRANSCRIPT_DST: &[u8] = b"ziop.transcript.v1";
const CHALLENGE_DST: &[u8] = b"ziop.challenge.v1";

/// Fiat–Shamir transcript (BLAKE3-based).
#[derive(Clone)]
pub struct Transcript {
    hasher: Hasher,
    ctr: u64,
}

impl Transcript {
    /// Create a transcript under a domain-separation `label`, distinguishing
    /// independent protocol instances.
    pub fn new(label: &str) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(TRANSCRIPT_DST);
        hasher.update(label.as_bytes());
        Self { hasher, ctr: 0 }
    }

    /// Absorb an arbitrary byte string, length-delimited under `label`.
    pub fn absorb_bytes(&mut self, label: &str, bytes: &[u8]) {
        self.hasher.update(b"item:");
        self.hasher.update(&(label.len() as u64).to_be_bytes());
        self.hasher.update(label.as_bytes());
        self.hasher.update(b":len:");
        self.hasher.update(&(bytes.len() as u64).to_be_bytes());
        self.hasher.update(b":data:");
        self.hasher.update(bytes);
    }

    /// Absorb one field element (canonical compressed encoding).
    pub fn absorb_field(&mut self, label: &str, f: &F) {
        let mut bytes = Vec::with_capacity(32);
        f.serialize_compressed(&mut bytes)
            .expect("field serialization into a Vec cannot fail");
        self.absorb_bytes(label, &bytes);
    }

    /// Absorb a sequence of field elements as one length-delimited item.
    pub fn absorb_fields(&mut self, label: &str, fs: impl Iterator<Item = F>) {
        let mut buf = Vec::new();
        let mut count: u64 = 0;
        for f in fs {
            f.serialize_compressed(&mut buf)
                .expect("field serialization into a Vec cannot fail");
            count += 1;
        }
        let mut item = Vec::with_capacity(8 + buf.len());
        item.extend_from_slice(&count.to_be_bytes());
        item.extend_from_slice(&buf);
        self.absorb_bytes(label, &item);
    }

    /// Derive one field challenge.
    pub fn challenge_field(&mut self, label: &str) -> F {
        let mut xof = self.challenge_xof(label);
        let mut buf = [0u8; 64];
        xof.read_exact(&mut buf).expect("XOF read cannot fail");
        self.ctr = self.ctr.wrapping_add(1);
        F::from_le_bytes_mod_order(&buf)
    }

    /// Derive `count` integers uniform in `[0, upper_bound)`.
    ///
    /// Rejection sampling over the next power-of-two mask keeps the draw
    /// unbiased; the XOF supplies as many bytes as the rejections require.
    pub fn challenge_integers(&mut self, label: &str, count: usize, upper_bound: usize) -> Vec<usize> {
        assert!(upper_bound > 0, "integer challenge needs a positive bound");
        let mask = (upper_bound as u64).next_power_of_two() - 1;
        let mut xof = self.challenge_xof(label);
        self.ctr = self.ctr.wrapping_add(1);

        let mut out = Vec::with_capacity(count);
        let mut buf = [0u8; 8];
        while out.len() < count {
            xof.read_exact(&mut buf).expect("XOF read cannot fail");
            let v = u64::from_le_bytes(buf) & mask;
            if v < upper_bound as u64 {
                out.push(v as usize);
            }
        }
        out
    }

    fn challenge_xof(&self, label: &str) -> blake3::OutputReader {
        let mut h = self.hasher.clone();
        h.update(CHALLENGE_DST);
        h.update(b":label:");
        h.update(label.as_bytes());
        h.update(b":ctr:");
        h.update(&self.ctr.to_be_bytes());
        h.finalize_xof()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::One;

    #[test]
    fn same_schedule_same_challenge() {
        let mut t1 = Transcript::new("test");
        let mut t2 = Transcript::new("test");
        t1.absorb_field("P", &F::one());
        t2.absorb_field("P", &F::one());
        assert_eq!(t1.challenge_field("alpha"), t2.challenge_field("alpha"));
    }

    #[test]
    fn label_and_data_both_bind() {
        let mut t1 = Transcript::new("test");
        let mut t2 = Transcript::new("test");
        t1.absorb_bytes("P", b"data");
        t2.absorb_bytes("Q", b"data");
        assert_ne!(t1.challenge_field("alpha"), t2.challenge_field("alpha"));

        let mut t3 = Transcript::new("test");
        t3.absorb_bytes("P", b"datb");
        assert_ne!(t1.challenge_field("beta"), t3.challenge_field("beta"));
    }

    #[test]
    fn challenge_does_not_consume_absorbs() {
        let mut t = Transcript::new("test");
        t.absorb_bytes("P", b"x");
        let a = t.challenge_field("alpha");
        let b = t.challenge_field("alpha");
        // Counter advanced, so the second draw differs, deterministically.
        assert_ne!(a, b);

        let mut replay = Transcript::new("test");
        replay.absorb_bytes("P", b"x");
        assert_eq!(replay.challenge_field("alpha"), a);
        assert_eq!(replay.challenge_field("alpha"), b);
    }

    #[test]
    fn integer_challenges_respect_bound() {
        let mut t = Transcript::new("test");
        t.absorb_bytes("seed", b"s");
        let ints = t.challenge_integers("q", 64, 37);
        assert_eq!(ints.len(), 64);
        assert!(ints.iter().all(|&v| v < 37));
    }
}

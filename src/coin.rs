//! Coins: verifier randomness sampled from the Fiat–Shamir transcript.

use serde::{Deserialize, Serialize};

use crate::transcript::Transcript;
use crate::F;

/// Coin identifier, unique within a registry.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoinName(pub String);

impl CoinName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CoinName {
    fn from(s: &str) -> Self {
        CoinName(s.to_owned())
    }
}

impl From<String> for CoinName {
    fn from(s: String) -> Self {
        CoinName(s)
    }
}

impl std::fmt::Display for CoinName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for CoinName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CoinName({})", self.0)
    }
}

/// What kind of randomness a coin carries.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum CoinKind {
    /// One uniform field element.
    Field,
    /// `size` integers uniform in `[0, upper_bound)`.
    IntegerVec { size: usize, upper_bound: usize },
}

/// A coin declaration as stored in the registry.
#[derive(Clone, Debug)]
pub struct CoinDecl {
    pub name: CoinName,
    /// Round at which the coin is sampled; strictly positive, and strictly
    /// greater than the round of everything the coin observes.
    pub round: usize,
    pub kind: CoinKind,
}

impl CoinDecl {
    /// Draw the coin's value from the transcript, under its name as label.
    pub fn sample(&self, transcript: &mut Transcript) -> CoinValue {
        match self.kind {
            CoinKind::Field => CoinValue::Field(transcript.challenge_field(self.name.as_str())),
            CoinKind::IntegerVec { size, upper_bound } => CoinValue::IntegerVec(
                transcript.challenge_integers(self.name.as_str(), size, upper_bound),
            ),
        }
    }
}

/// A sampled coin value.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum CoinValue {
    Field(F),
    IntegerVec(Vec<usize>),
}

impl CoinValue {
    /// The field value, if this is a field coin.
    pub fn as_field(&self) -> Option<F> {
        match self {
            CoinValue::Field(f) => Some(*f),
            CoinValue::IntegerVec(_) => None,
        }
    }

    /// The integer vector, if this is an integer-vector coin.
    pub fn as_integers(&self) -> Option<&[usize]> {
        match self {
            CoinValue::IntegerVec(v) => Some(v),
            CoinValue::Field(_) => None,
        }
    }
}

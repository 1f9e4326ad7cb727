//! Per-account access-pattern classification.
//!
//! During a block, every account produces a sequence of traces against two
//! trees: the outer world-state tree (WS) and the account's own storage tree
//! (ST). Only six shapes of sequence are legal:
//!
//! ```text
//! Missing   = ReadZeroWS                                  (length 1)
//! Creation  = (InsertionST | ReadZeroST)*    InsertionWS
//! Deletion  = (ReadZeroST | ReadNonZeroST)*  DeletionWS
//! Update    = ST*                            UpdateWS
//! Read      = ReadNonZeroWS  (ReadNonZeroST | ReadZeroST)*
//! Redeploy  = (ReadZeroST | ReadNonZeroST)*  DeletionWS
//!             (ReadZeroST | InsertionST)*    InsertionWS
//! ```
//!
//! Exactly one world-state trace appears per pattern, except Redeploy which
//! has exactly two (a deletion then an insertion). The Read pattern arrives
//! with its WS trace first; [`classify`] returns a normalized copy with the
//! WS trace moved to the end (for a length-1 Read the normalization is the
//! identity).
//!
//! Matching is a fixed cascade of per-pattern matchers over the trace kinds.
//! A matcher either rejects cleanly (the next one is tried) or fails on the
//! *first* structural mismatch it sees; later mismatches are not enumerated.

use serde::{Deserialize, Serialize};

use crate::accumulator::trace::{
    DeletionTrace, InsertionTrace, ReadNonZeroTrace, ReadZeroTrace, UpdateTrace,
};
use thiserror::Error;

/// Which tree a trace was emitted against.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum TreeLocation {
    /// The outer account tree.
    WorldState,
    /// The storage tree of the named account.
    Storage(String),
}

/// One accumulator operation trace, by kind.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum OpTrace {
    ReadZero(ReadZeroTrace),
    ReadNonZero(ReadNonZeroTrace),
    Insertion(InsertionTrace),
    Update(UpdateTrace),
    Deletion(DeletionTrace),
}

/// A trace tagged with the tree it touched; the classifier's input.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct StateTrace {
    pub location: TreeLocation,
    pub op: OpTrace,
}

impl StateTrace {
    pub fn kind(&self) -> TraceKind {
        let ws = matches!(self.location, TreeLocation::WorldState);
        match (&self.op, ws) {
            (OpTrace::ReadZero(_), true) => TraceKind::ReadZeroWs,
            (OpTrace::ReadNonZero(_), true) => TraceKind::ReadNonZeroWs,
            (OpTrace::Insertion(_), true) => TraceKind::InsertionWs,
            (OpTrace::Update(_), true) => TraceKind::UpdateWs,
            (OpTrace::Deletion(_), true) => TraceKind::DeletionWs,
            (OpTrace::ReadZero(_), false) => TraceKind::ReadZeroSt,
            (OpTrace::ReadNonZero(_), false) => TraceKind::ReadNonZeroSt,
            (OpTrace::Insertion(_), false) => TraceKind::InsertionSt,
            (OpTrace::Update(_), false) => TraceKind::UpdateSt,
            (OpTrace::Deletion(_), false) => TraceKind::DeletionSt,
        }
    }
}

/// The tagged union of trace kinds the matcher state machine runs over.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum TraceKind {
    ReadZeroWs,
    ReadNonZeroWs,
    InsertionWs,
    UpdateWs,
    DeletionWs,
    ReadZeroSt,
    ReadNonZeroSt,
    InsertionSt,
    UpdateSt,
    DeletionSt,
}

impl TraceKind {
    pub fn is_world_state(self) -> bool {
        matches!(
            self,
            TraceKind::ReadZeroWs
                | TraceKind::ReadNonZeroWs
                | TraceKind::InsertionWs
                | TraceKind::UpdateWs
                | TraceKind::DeletionWs
        )
    }
}

/// The six legal per-account shapes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum AccessPattern {
    Missing,
    Creation,
    Deletion,
    Update,
    Read,
    Redeploy,
}

/// Classification failure.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("empty trace sequence")]
    Empty,
    #[error("found a world-state read-zero in a sequence longer than one")]
    StrayReadZero,
    #[error("found {found:?} inside a {pattern:?} sequence")]
    DisallowedTrace { pattern: AccessPattern, found: TraceKind },
    #[error("found a second world-state write ({found:?}) in a {pattern:?} sequence")]
    SecondWrite { pattern: AccessPattern, found: TraceKind },
    #[error("found more than one deletion in a redeploy sequence")]
    DoubleDeletion,
    #[error("no pattern matches the sequence {kinds:?}")]
    NoMatch { kinds: Vec<TraceKind> },
}

/// Classify a tagged trace sequence and return the normalized copy. The
/// input is never mutated; for every pattern except a multi-trace Read the
/// normalized sequence equals the input.
pub fn classify(traces: &[StateTrace]) -> Result<(AccessPattern, Vec<StateTrace>), PatternError> {
    let kinds: Vec<TraceKind> = traces.iter().map(StateTrace::kind).collect();
    let pattern = classify_kinds(&kinds)?;

    let mut normalized = traces.to_vec();
    if pattern == AccessPattern::Read && normalized.len() > 1 {
        normalized.rotate_left(1);
    }
    Ok((pattern, normalized))
}

/// Classify a kind sequence against the grammar.
pub fn classify_kinds(kinds: &[TraceKind]) -> Result<AccessPattern, PatternError> {
    if kinds.is_empty() {
        return Err(PatternError::Empty);
    }

    let matchers: [fn(&[TraceKind]) -> Result<bool, PatternError>; 6] = [
        match_missing,
        match_creation,
        match_deletion,
        match_read,
        match_update,
        match_redeploy,
    ];
    let patterns = [
        AccessPattern::Missing,
        AccessPattern::Creation,
        AccessPattern::Deletion,
        AccessPattern::Read,
        AccessPattern::Update,
        AccessPattern::Redeploy,
    ];
    for (matcher, pattern) in matchers.iter().zip(patterns) {
        if matcher(kinds)? {
            return Ok(pattern);
        }
    }
    Err(PatternError::NoMatch { kinds: kinds.to_vec() })
}

fn match_missing(kinds: &[TraceKind]) -> Result<bool, PatternError> {
    if kinds[0] == TraceKind::ReadZeroWs && kinds.len() == 1 {
        return Ok(true);
    }
    // A world-state read-zero anywhere else is always illegal.
    if kinds.contains(&TraceKind::ReadZeroWs) {
        return Err(PatternError::StrayReadZero);
    }
    Ok(false)
}

fn match_creation(kinds: &[TraceKind]) -> Result<bool, PatternError> {
    if *kinds.last().expect("non-empty") != TraceKind::InsertionWs {
        return Ok(false);
    }
    let mut first_error = None;
    for &k in &kinds[..kinds.len() - 1] {
        // A second world-state trace means this may be a redeploy; hand over.
        if k.is_world_state() {
            return Ok(false);
        }
        if !matches!(k, TraceKind::ReadZeroSt | TraceKind::InsertionSt) && first_error.is_none() {
            first_error = Some(PatternError::DisallowedTrace {
                pattern: AccessPattern::Creation,
                found: k,
            });
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(true),
    }
}

fn match_deletion(kinds: &[TraceKind]) -> Result<bool, PatternError> {
    if *kinds.last().expect("non-empty") != TraceKind::DeletionWs {
        return Ok(false);
    }
    let mut first_error = None;
    for &k in &kinds[..kinds.len() - 1] {
        if k.is_world_state() {
            return Err(PatternError::SecondWrite { pattern: AccessPattern::Deletion, found: k });
        }
        if !matches!(k, TraceKind::ReadZeroSt | TraceKind::ReadNonZeroSt) && first_error.is_none() {
            first_error = Some(PatternError::DisallowedTrace {
                pattern: AccessPattern::Deletion,
                found: k,
            });
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(true),
    }
}

fn match_read(kinds: &[TraceKind]) -> Result<bool, PatternError> {
    if kinds[0] != TraceKind::ReadNonZeroWs {
        return Ok(false);
    }
    let mut first_error = None;
    for &k in &kinds[1..] {
        if k.is_world_state() {
            return Err(PatternError::SecondWrite { pattern: AccessPattern::Read, found: k });
        }
        if !matches!(k, TraceKind::ReadZeroSt | TraceKind::ReadNonZeroSt) && first_error.is_none() {
            first_error = Some(PatternError::DisallowedTrace {
                pattern: AccessPattern::Read,
                found: k,
            });
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(true),
    }
}

fn match_update(kinds: &[TraceKind]) -> Result<bool, PatternError> {
    if *kinds.last().expect("non-empty") != TraceKind::UpdateWs {
        return Ok(false);
    }
    // Any storage-trie trace may precede an update.
    for &k in &kinds[..kinds.len() - 1] {
        if k.is_world_state() {
            return Err(PatternError::SecondWrite { pattern: AccessPattern::Update, found: k });
        }
    }
    Ok(true)
}

fn match_redeploy(kinds: &[TraceKind]) -> Result<bool, PatternError> {
    if *kinds.last().expect("non-empty") != TraceKind::InsertionWs || kinds.len() == 1 {
        return Ok(false);
    }
    let mut first_error = None;
    let mut found_deletion = false;
    for &k in &kinds[..kinds.len() - 1] {
        if k == TraceKind::DeletionWs {
            if found_deletion {
                return Err(PatternError::DoubleDeletion);
            }
            found_deletion = true;
            continue;
        }
        if k.is_world_state() {
            return Err(PatternError::SecondWrite { pattern: AccessPattern::Redeploy, found: k });
        }
        let allowed = if found_deletion {
            matches!(k, TraceKind::ReadZeroSt | TraceKind::InsertionSt)
        } else {
            matches!(k, TraceKind::ReadZeroSt | TraceKind::ReadNonZeroSt)
        };
        if !allowed && first_error.is_none() {
            first_error = Some(PatternError::DisallowedTrace {
                pattern: AccessPattern::Redeploy,
                found: k,
            });
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }
    Ok(found_deletion)
}

#[cfg(test)]
mod tests {
    use super::TraceKind::*;
    use super::*;

    #[test]
    fn missing_account() {
        assert_eq!(classify_kinds(&[ReadZeroWs]).unwrap(), AccessPattern::Missing);
        assert!(matches!(
            classify_kinds(&[ReadZeroWs, ReadZeroSt]),
            Err(PatternError::StrayReadZero)
        ));
    }

    #[test]
    fn creation() {
        assert_eq!(classify_kinds(&[InsertionWs]).unwrap(), AccessPattern::Creation);
        assert_eq!(
            classify_kinds(&[ReadZeroSt, InsertionSt, InsertionWs]).unwrap(),
            AccessPattern::Creation
        );
        assert!(matches!(
            classify_kinds(&[ReadNonZeroSt, InsertionWs]),
            Err(PatternError::DisallowedTrace { pattern: AccessPattern::Creation, .. })
        ));
    }

    #[test]
    fn deletion() {
        assert_eq!(classify_kinds(&[DeletionWs]).unwrap(), AccessPattern::Deletion);
        assert_eq!(
            classify_kinds(&[ReadNonZeroSt, ReadZeroSt, DeletionWs]).unwrap(),
            AccessPattern::Deletion
        );
        assert!(matches!(
            classify_kinds(&[UpdateWs, DeletionWs]),
            Err(PatternError::SecondWrite { .. })
        ));
    }

    #[test]
    fn update_allows_any_storage_prefix() {
        assert_eq!(
            classify_kinds(&[InsertionSt, UpdateSt, DeletionSt, ReadZeroSt, UpdateWs]).unwrap(),
            AccessPattern::Update
        );
        assert!(matches!(
            classify_kinds(&[UpdateWs, UpdateWs]),
            Err(PatternError::SecondWrite { .. })
        ));
    }

    #[test]
    fn read_rejects_storage_writes() {
        assert_eq!(classify_kinds(&[ReadNonZeroWs]).unwrap(), AccessPattern::Read);
        assert_eq!(
            classify_kinds(&[ReadNonZeroWs, ReadZeroSt, ReadNonZeroSt]).unwrap(),
            AccessPattern::Read
        );
        // A storage write inside a read-only access is structural corruption.
        assert!(matches!(
            classify_kinds(&[ReadNonZeroWs, InsertionSt]),
            Err(PatternError::DisallowedTrace { pattern: AccessPattern::Read, .. })
        ));
    }

    #[test]
    fn redeploy_scenario() {
        // The seed scenario: read, delete, then re-create with storage.
        let seq = [ReadNonZeroSt, DeletionWs, ReadZeroSt, InsertionSt, InsertionWs];
        assert_eq!(classify_kinds(&seq).unwrap(), AccessPattern::Redeploy);

        // Without the closing world-state insertion nothing matches.
        assert!(classify_kinds(&[ReadNonZeroSt, DeletionWs, ReadZeroSt, InsertionSt]).is_err());

        // A second world-state deletion is rejected.
        assert!(matches!(
            classify_kinds(&[ReadNonZeroSt, DeletionWs, DeletionWs, InsertionSt, InsertionWs]),
            Err(PatternError::DoubleDeletion)
        ));
    }

    #[test]
    fn no_match_lists_the_kinds() {
        let err = classify_kinds(&[ReadNonZeroSt]).unwrap_err();
        assert!(matches!(err, PatternError::NoMatch { .. }));
    }

    #[test]
    fn two_world_state_writes_always_reject() {
        for tail in [UpdateWs, DeletionWs] {
            assert!(classify_kinds(&[InsertionWs, tail]).is_err());
        }
        assert!(classify_kinds(&[UpdateWs, InsertionWs]).is_err());
    }

    mod normalization {
        use super::super::*;
        use crate::accumulator::ProverState;
        use crate::smt::{HashKind, SmtConfig};
        use crate::Bytes32;

        fn sample_traces() -> Vec<StateTrace> {
            let config = SmtConfig { hash: HashKind::Keccak, depth: 8 };
            let mut world = ProverState::initialize(config, "world");
            let mut storage = ProverState::initialize(config, "storage:0xabc");

            world.insert_and_prove(Bytes32::dummy(1), Bytes32::dummy(10)).unwrap();
            storage.insert_and_prove(Bytes32::dummy(2), Bytes32::dummy(20)).unwrap();

            let ws_read = world.read_non_zero_and_prove(Bytes32::dummy(1)).unwrap();
            let st_read = storage.read_non_zero_and_prove(Bytes32::dummy(2)).unwrap();
            let st_miss = storage.read_zero_and_prove(Bytes32::dummy(3)).unwrap();

            vec![
                StateTrace {
                    location: TreeLocation::WorldState,
                    op: OpTrace::ReadNonZero(ws_read),
                },
                StateTrace {
                    location: TreeLocation::Storage("0xabc".into()),
                    op: OpTrace::ReadNonZero(st_read),
                },
                StateTrace {
                    location: TreeLocation::Storage("0xabc".into()),
                    op: OpTrace::ReadZero(st_miss),
                },
            ]
        }

        #[test]
        fn read_moves_world_state_to_the_end() {
            let traces = sample_traces();
            let (pattern, normalized) = classify(&traces).unwrap();
            assert_eq!(pattern, AccessPattern::Read);
            assert_eq!(normalized.len(), 3);
            assert_eq!(normalized[2].kind(), TraceKind::ReadNonZeroWs);
            assert_eq!(normalized[0].kind(), TraceKind::ReadNonZeroSt);
            // The input is untouched.
            assert_eq!(traces[0].kind(), TraceKind::ReadNonZeroWs);
        }

        #[test]
        fn single_trace_read_normalizes_to_itself() {
            let traces = &sample_traces()[..1];
            let (pattern, normalized) = classify(traces).unwrap();
            assert_eq!(pattern, AccessPattern::Read);
            assert_eq!(normalized, traces.to_vec());
        }
    }
}

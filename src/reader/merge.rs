use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::matcher;
use crate::models::DecodeResult;

/// Which backend produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Source {
    /// The accurate, streaming backend (authoritative on text content)
    Accurate,
    /// The fast, batch backend
    Fast,
}

/// What `offer` did with a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Offer {
    /// Inserted as a new distinct entry
    Inserted,
    /// Overwrote a matching entry (accurate result, double-check mode)
    Corrected,
    /// A matching entry already exists and was kept
    DuplicateKept,
    /// Distinct, but the collection already holds the maximum
    CapacityRejected,
}

struct Entry {
    result: DecodeResult,
    source: Source,
}

/// The shared merged result collection of a combined decode
///
/// The only shared mutable state between producers. Duplicate lookup and
/// insert/overwrite execute as one critical section under a single lock;
/// no caller can perform the check and the mutation separately.
pub(crate) struct ResultAccumulator {
    max_codes: usize,
    double_check: bool,
    entries: Mutex<Vec<Entry>>,
}

impl ResultAccumulator {
    pub(crate) fn new(max_codes: usize, double_check: bool) -> Self {
        Self {
            max_codes,
            double_check,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Atomically merge one candidate into the collection.
    ///
    /// - No positional match: insert, unless the maximum of distinct
    ///   entries is already held.
    /// - Match and the candidate is accurate-sourced with double-check on:
    ///   whole-value overwrite — the accurate backend is authoritative on
    ///   text, and disagreement resolves in its favor. Corrections apply
    ///   even at capacity.
    /// - Match otherwise: keep the existing entry. A fast-sourced result
    ///   never overwrites anything.
    pub(crate) fn offer(&self, result: DecodeResult, source: Source) -> Offer {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries
            .iter_mut()
            .find(|e| matcher::is_duplicate(&e.result.position, &result.position))
        {
            if self.double_check && source == Source::Accurate {
                if entry.result.text != result.text {
                    debug!(
                        kept = %result.text_lossy(),
                        dropped = %entry.result.text_lossy(),
                        "conflicting texts at one position, accurate backend wins"
                    );
                }
                entry.result = result;
                entry.source = Source::Accurate;
                return Offer::Corrected;
            }
            trace!(?source, "duplicate position, entry kept");
            return Offer::DuplicateKept;
        }
        if entries.len() < self.max_codes {
            entries.push(Entry { result, source });
            Offer::Inserted
        } else {
            trace!(max = self.max_codes, "distinct entry rejected at capacity");
            Offer::CapacityRejected
        }
    }

    /// Whether further candidates can still change the outcome.
    ///
    /// True below capacity, and — in double-check mode — while any
    /// fast-sourced entry remains that an accurate result could still
    /// supersede. Producers poll this between pulls to stop early.
    pub(crate) fn wants_more(&self) -> bool {
        let entries = self.entries.lock();
        entries.len() < self.max_codes
            || (self.double_check && entries.iter().any(|e| e.source == Source::Fast))
    }

    pub(crate) fn into_results(self) -> Vec<DecodeResult> {
        self.entries
            .into_inner()
            .into_iter()
            .map(|e| e.result)
            .collect()
    }
}

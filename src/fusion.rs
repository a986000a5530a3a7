//! Reciprocal Rank Fusion: fused_score = Σ 1/(k + rank)
//!
//! Merges ranked lists from independent retrieval strategies into a
//! single ordering without requiring score normalisation across
//! strategies. Ordering is fully deterministic: ties on fused score are
//! broken by source coverage, then dense rank, then document id, so
//! identical inputs produce byte-identical output regardless of list
//! argument order.

use std::collections::HashMap;

use crate::types::{FusedResult, RankedHit, RetrievalSource};

/// Per-document accumulator built while walking the input lists.
#[derive(Debug, Default)]
struct Accumulator {
    score: f64,
    dense: bool,
    sparse: bool,
    /// Best (lowest) dense rank seen, used for tie-breaking.
    dense_rank: Option<usize>,
}

/// Fuse ranked lists using Reciprocal Rank Fusion.
///
/// Every document appearing in at least one list is scored as the sum of
/// `1/(k + rank)` over the lists that contain it; documents absent from
/// a list contribute nothing from that list. `k` must be positive
/// (callers validate via `SearchConfig`); larger values flatten the
/// influence of rank position.
///
/// Output is ordered by descending fused score. Equal scores are broken
/// by (a) presence in more source lists, then (b) ascending dense rank
/// with dense-less documents last, then (c) lexicographic document id.
///
/// Truncation to `top_k` is the caller's responsibility and must happen
/// strictly after fusion — pre-truncating source lists would bias the
/// merge.
pub fn fuse(lists: &[Vec<RankedHit>], k: f64) -> Vec<FusedResult> {
    let mut accumulators: HashMap<String, Accumulator> = HashMap::new();

    for list in lists {
        for hit in list {
            let acc = accumulators.entry(hit.document_id.clone()).or_default();
            acc.score += 1.0 / (k + hit.rank as f64);
            match hit.source {
                RetrievalSource::Dense => {
                    acc.dense = true;
                    acc.dense_rank = Some(acc.dense_rank.map_or(hit.rank, |r| r.min(hit.rank)));
                }
                RetrievalSource::Sparse => acc.sparse = true,
            }
        }
    }

    let mut ranked: Vec<(FusedResult, Option<usize>)> = accumulators
        .into_iter()
        .map(|(document_id, acc)| {
            let mut sources = Vec::new();
            if acc.dense {
                sources.push(RetrievalSource::Dense);
            }
            if acc.sparse {
                sources.push(RetrievalSource::Sparse);
            }
            (
                FusedResult {
                    document_id,
                    fused_score: acc.score,
                    sources,
                },
                acc.dense_rank,
            )
        })
        .collect();

    ranked.sort_by(|(a, a_dense), (b, b_dense)| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.sources.len().cmp(&a.sources.len()))
            .then_with(|| {
                a_dense
                    .unwrap_or(usize::MAX)
                    .cmp(&b_dense.unwrap_or(usize::MAX))
            })
            .then_with(|| a.document_id.cmp(&b.document_id))
    });

    ranked.into_iter().map(|(result, _)| result).collect()
}

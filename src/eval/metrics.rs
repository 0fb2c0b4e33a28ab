//! On-Topic Rate metrics: OTR and OTR@K over integer relevance flags.

/// On-Topic Rate: proportion of judged documents that are relevant.
/// Returns rel_count / total_docs. If total_docs is 0, returns 0.0.
/// rel_count is not checked against total_docs.
pub fn on_topic_rate(rel_count: usize, total_docs: usize) -> f64 {
    if total_docs == 0 {
        return 0.0;
    }
    rel_count as f64 / total_docs as f64
}

/// On-Topic Rate at cutoff K: (sum of flags in top-K) / K. If k is 0, returns 0.0.
///
/// When `flags` holds fewer than `k` entries the available prefix is summed and
/// still divided by `k`, so a short ranking scores below its true rate.
/// Use [`prefix_shortfall`] to detect that case.
pub fn on_topic_rate_at_k<F>(flags: &[F], k: usize) -> f64
where
    F: Copy + Into<u32>,
{
    if k == 0 {
        return 0.0;
    }
    let relevant_count: u64 = flags
        .iter()
        .take(k)
        .map(|&f| u64::from(Into::<u32>::into(f)))
        .sum();
    relevant_count as f64 / k as f64
}

/// OTR over a whole ranking: sum of flags / number of flags.
pub fn on_topic_rate_of<F>(flags: &[F]) -> f64
where
    F: Copy + Into<u32>,
{
    if flags.is_empty() {
        return 0.0;
    }
    let relevant_count: u64 = flags
        .iter()
        .map(|&f| u64::from(Into::<u32>::into(f)))
        .sum();
    relevant_count as f64 / flags.len() as f64
}

/// Number of top-K positions missing from `flags` (0 when the ranking is long enough).
pub fn prefix_shortfall<F>(flags: &[F], k: usize) -> usize {
    k.saturating_sub(flags.len())
}

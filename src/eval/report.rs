//! Per-query OTR report over labeled items.

use crate::error::{OtrError, Result};
use crate::eval::metrics::{on_topic_rate, on_topic_rate_at_k, prefix_shortfall};
use crate::eval::{Qid, RelevanceFlag, RelevanceItem};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Scores for one query (all items sharing a qid, in their input order).
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub qid: Option<Qid>,
    pub query: String,
    pub judged: usize,
    pub relevant: usize,
    pub otr: f64,
    pub otr_at_k: f64,
    /// Fewer than k documents were judged, so `otr_at_k` is divided by a
    /// window larger than the ranking.
    pub short_of_k: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OtrReport {
    pub k: usize,
    pub generated_at: DateTime<Utc>,
    pub queries: Vec<QueryReport>,
    /// Mean of per-query OTR.
    pub mean_otr: f64,
    /// Mean of per-query OTR@K.
    pub mean_otr_at_k: f64,
    /// OTR over all judged items pooled together.
    pub micro_otr: f64,
}

/// Group `items` by qid (first-appearance order) and score each group.
/// Every item must carry a relevance label.
pub fn build_report(items: &[RelevanceItem], k: usize) -> Result<OtrReport> {
    let mut groups: Vec<(Option<Qid>, String, Vec<RelevanceFlag>)> = Vec::new();

    for (idx, item) in items.iter().enumerate() {
        let flag = item.relevance().ok_or_else(|| {
            OtrError::InvalidInput(format!(
                "item {} (qid {}) has no relevance label",
                idx,
                item.trace_id()
            ))
        })?;
        let item_qid = item.qid();
        match groups.iter_mut().find(|(qid, _, _)| *qid == item_qid) {
            Some((_, _, flags)) => flags.push(flag),
            None => groups.push((item_qid, item.query().to_string(), vec![flag])),
        }
    }

    let queries: Vec<QueryReport> = groups
        .into_iter()
        .map(|(qid, query, flags)| {
            let relevant = flags.iter().filter(|f| f.is_relevant()).count();
            let short_of_k = prefix_shortfall(&flags, k) > 0;
            if short_of_k {
                log::debug!(
                    "qid {}: only {} judged documents for k={}",
                    qid.as_ref().map(Qid::to_string).unwrap_or_else(|| "-".to_string()),
                    flags.len(),
                    k
                );
            }
            QueryReport {
                qid,
                query,
                judged: flags.len(),
                relevant,
                otr: on_topic_rate(relevant, flags.len()),
                otr_at_k: on_topic_rate_at_k(&flags, k),
                short_of_k,
            }
        })
        .collect();

    let n = queries.len();
    let mean = |f: fn(&QueryReport) -> f64| {
        if n == 0 {
            0.0
        } else {
            queries.iter().map(f).sum::<f64>() / n as f64
        }
    };
    let mean_otr = mean(|q| q.otr);
    let mean_otr_at_k = mean(|q| q.otr_at_k);
    let total_relevant: usize = queries.iter().map(|q| q.relevant).sum();
    let micro_otr = on_topic_rate(total_relevant, items.len());

    Ok(OtrReport {
        k,
        generated_at: Utc::now(),
        queries,
        mean_otr,
        mean_otr_at_k,
        micro_otr,
    })
}

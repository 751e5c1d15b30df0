//! Partial label-match deletion over `prometheus` metric vectors.
//!
//! `MetricVec` only removes a series by its complete label set. A pod usually
//! owns many series per vector (one per container, binary, status code, ...),
//! so the collector snapshots the vector, selects every series whose labels
//! contain the requested pairs, and removes each one by its full label set.

use std::{collections::HashMap, sync::Arc};

use prometheus::core::{Collector, MetricVec, MetricVecBuilder};
use tracing::trace;

/// A multi-series metric whose series can be removed by a subset of their labels.
pub trait PartialMatchDelete: Send + Sync {
    /// Fully-qualified metric name.
    fn name(&self) -> String;

    /// Variable label names of the vector, in declaration order.
    fn label_names(&self) -> Vec<String>;

    /// Removes every series whose labels contain all of `matchers`, whatever
    /// their other label values. Returns the number of series removed.
    ///
    /// Nothing matching is not an error; a series removed concurrently by
    /// another caller is skipped.
    fn delete_partial_match(&self, matchers: &[(&str, &str)]) -> usize;
}

/// Shared handle to a pod-labeled metric vector.
pub type VecHandle = Arc<dyn PartialMatchDelete>;

impl<T> PartialMatchDelete for MetricVec<T>
where
    T: MetricVecBuilder,
{
    fn name(&self) -> String {
        self.desc()
            .first()
            .map(|desc| desc.fq_name.clone())
            .unwrap_or_default()
    }

    fn label_names(&self) -> Vec<String> {
        self.desc()
            .into_iter()
            .flat_map(|desc| desc.variable_labels.iter().cloned())
            .collect()
    }

    fn delete_partial_match(&self, matchers: &[(&str, &str)]) -> usize {
        let variable_labels = self.label_names();
        let mut removed = 0;

        for family in self.collect() {
            for metric in family.get_metric() {
                let pairs = metric.get_label();
                let matched = matchers.iter().all(|(name, value)| {
                    pairs
                        .iter()
                        .any(|pair| pair.get_name() == *name && pair.get_value() == *value)
                });
                if !matched {
                    continue;
                }

                // Const labels show up in the collected pairs too, but `remove`
                // only accepts the variable ones.
                let labels: HashMap<&str, &str> = pairs
                    .iter()
                    .filter(|pair| variable_labels.iter().any(|l| l == pair.get_name()))
                    .map(|pair| (pair.get_name(), pair.get_value()))
                    .collect();

                match self.remove(&labels) {
                    Ok(()) => removed += 1,
                    Err(e) => trace!(
                        event.name = "metrics.partial_match.remove_skipped",
                        metric.name = %family.get_name(),
                        error.message = %e,
                        "series already gone"
                    ),
                }
            }
        }

        removed
    }
}

//! Merging replication time series into a single table.

use fnv::FnvHashMap;

use crate::error::{Error, Result};
use crate::runner::{check_unique, ReplicationResult, Replications};
use crate::Float;

/// Two-level column key of the aggregated table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnKey {
    pub metric: String,
    pub replication: usize,
}

impl ColumnKey {
    pub fn new(metric: &str, replication: usize) -> Self {
        ColumnKey {
            metric: metric.to_string(),
            replication,
        }
    }
}

/// Table holding the time series of all replications of a batch.
///
/// Rows are ticks, in tick order. Columns are keyed by
/// `(metric, replication)`, grouped by metric so that all replications of
/// the same metric sit next to each other. Metrics keep the order in which
/// reporters were requested, replications are ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    metrics: Vec<String>,
    replications: usize,
    ticks: usize,
    keys: Vec<ColumnKey>,
    /// Column-major data, `data[i]` holds the column for `keys[i]`
    data: Vec<Vec<Float>>,
}

/// Combines the results of a batch into one table.
///
/// Replication indices must form the dense range `[0, R)`, and all results
/// must share the same reporters and tick count.
pub fn combine(replications: Replications) -> Result<AggregatedResult> {
    let count = replications.len();
    let (metrics, ticks) = match replications.values().next() {
        Some(first) => (first.reporters().to_vec(), first.ticks()),
        None => {
            return Err(Error::InconsistentReplications(
                "no replications to combine".to_string(),
            ))
        }
    };
    check_unique(&metrics)?;

    // per replication, column lookup by metric name
    let mut blocks: Vec<FnvHashMap<String, Vec<Float>>> = Vec::with_capacity(count);
    for (expected, (index, result)) in replications.into_iter().enumerate() {
        if index != expected {
            return Err(Error::InconsistentReplications(format!(
                "replication indices not dense: expected {}, found {}",
                expected, index
            )));
        }
        if result.ticks() != ticks {
            return Err(Error::InconsistentReplications(format!(
                "replication {} has {} ticks, expected {}",
                index,
                result.ticks(),
                ticks
            )));
        }
        check_unique(result.reporters())?;
        if result.reporters().len() != metrics.len()
            || metrics.iter().any(|m| result.column(m).is_none())
        {
            return Err(Error::InconsistentReplications(format!(
                "replication {} reports {:?}, expected {:?}",
                index,
                result.reporters(),
                metrics
            )));
        }
        let (reporters, columns) = result.into_columns();
        blocks.push(reporters.into_iter().zip(columns).collect());
    }

    let mut keys = Vec::with_capacity(metrics.len() * count);
    let mut data = Vec::with_capacity(metrics.len() * count);
    for metric in &metrics {
        for (replication, block) in blocks.iter_mut().enumerate() {
            let column = block.remove(metric).ok_or_else(|| {
                Error::InconsistentReplications(format!(
                    "replication {} has no column for {}",
                    replication, metric
                ))
            })?;
            keys.push(ColumnKey::new(metric, replication));
            data.push(column);
        }
    }

    Ok(AggregatedResult {
        metrics,
        replications: count,
        ticks,
        keys,
        data,
    })
}

impl AggregatedResult {
    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    pub fn replications(&self) -> usize {
        self.replications
    }

    /// Number of rows.
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn columns(&self) -> &[ColumnKey] {
        &self.keys
    }

    pub fn column_count(&self) -> usize {
        self.keys.len()
    }

    fn position(&self, metric: &str, replication: usize) -> Option<usize> {
        if replication >= self.replications {
            return None;
        }
        self.metrics
            .iter()
            .position(|m| m == metric)
            .map(|m| m * self.replications + replication)
    }

    pub fn column(&self, metric: &str, replication: usize) -> Option<&[Float]> {
        self.position(metric, replication)
            .map(|i| self.data[i].as_slice())
    }

    pub fn value(&self, metric: &str, replication: usize, tick: usize) -> Option<Float> {
        self.column(metric, replication)
            .and_then(|c| c.get(tick).copied())
    }

    /// All columns of a single metric, in replication order.
    pub fn metric_columns(&self, metric: &str) -> Option<Vec<&[Float]>> {
        let first = self.position(metric, 0)?;
        Some(
            self.data[first..first + self.replications]
                .iter()
                .map(|c| c.as_slice())
                .collect(),
        )
    }

    /// Values of a single row, in column order.
    pub fn row(&self, tick: usize) -> Option<Vec<Float>> {
        if tick >= self.ticks {
            return None;
        }
        Some(self.data.iter().map(|c| c[tick]).collect())
    }

    /// Iterates over all `(key, tick, value)` cells, column by column.
    pub fn cells(&self) -> impl Iterator<Item = (&ColumnKey, usize, Float)> {
        self.keys.iter().zip(self.data.iter()).flat_map(|(key, column)| {
            column
                .iter()
                .enumerate()
                .map(move |(tick, value)| (key, tick, *value))
        })
    }

    /// Checks the table shape: one column per `(metric, replication)` pair,
    /// keyed in metric-major order, each holding exactly `ticks` values.
    pub fn check(&self) -> Result<()> {
        check_unique(&self.metrics)?;
        let expected = self.metrics.len() * self.replications;
        if self.keys.len() != expected || self.data.len() != expected {
            return Err(Error::InconsistentReplications(format!(
                "expected {} columns, found {} keys and {} columns",
                expected,
                self.keys.len(),
                self.data.len()
            )));
        }
        for (i, (key, column)) in self.keys.iter().zip(&self.data).enumerate() {
            let metric = &self.metrics[i / self.replications];
            if &key.metric != metric || key.replication != i % self.replications {
                return Err(Error::InconsistentReplications(format!(
                    "column {} is keyed {}/{}, expected {}/{}",
                    i,
                    key.metric,
                    key.replication,
                    metric,
                    i % self.replications
                )));
            }
            if column.len() != self.ticks {
                return Err(Error::InconsistentReplications(format!(
                    "column {}/{} has {} values, expected {}",
                    key.metric,
                    key.replication,
                    column.len(),
                    self.ticks
                )));
            }
        }
        Ok(())
    }

    /// Splits the table back into per-replication results.
    pub fn split(&self) -> Result<Replications> {
        let mut out = Replications::new();
        for replication in 0..self.replications {
            let columns = self
                .metrics
                .iter()
                .map(|m| {
                    self.column(m, replication).map(|c| c.to_vec()).ok_or_else(|| {
                        Error::InconsistentReplications(format!(
                            "no column for {} in replication {}",
                            m, replication
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            out.insert(
                replication,
                ReplicationResult::from_columns(self.metrics.clone(), columns)?,
            );
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn result(reporters: &[&str], columns: Vec<Vec<Float>>) -> ReplicationResult {
        ReplicationResult::from_columns(reporters.iter().map(|r| r.to_string()).collect(), columns)
            .unwrap()
    }

    #[test]
    fn columns_grouped_by_metric() {
        let mut reps = Replications::new();
        reps.insert(0, result(&["x", "y"], vec![vec![0., 1., 2.], vec![0., 2., 4.]]));
        reps.insert(1, result(&["x", "y"], vec![vec![0., 1., 2.], vec![0., 2., 4.]]));
        let table = combine(reps).unwrap();
        assert_eq!(
            table.columns(),
            &[
                ColumnKey::new("x", 0),
                ColumnKey::new("x", 1),
                ColumnKey::new("y", 0),
                ColumnKey::new("y", 1),
            ]
        );
        assert_eq!(table.ticks(), 3);
        assert_eq!(table.row(2).unwrap(), vec![2., 2., 4., 4.]);
        assert_eq!(table.metric_columns("y").unwrap().len(), 2);
        assert_eq!(table.value("y", 1, 1), Some(2.));
        assert_eq!(table.value("y", 2, 1), None);
    }

    #[test]
    fn reporter_order_may_differ_between_replications() {
        let mut reps = Replications::new();
        reps.insert(0, result(&["x", "y"], vec![vec![1.], vec![2.]]));
        reps.insert(1, result(&["y", "x"], vec![vec![20.], vec![10.]]));
        let table = combine(reps).unwrap();
        assert_eq!(table.column("x", 1), Some(&[10.][..]));
        assert_eq!(table.column("y", 1), Some(&[20.][..]));
    }

    #[test]
    fn rejects_inconsistent_batches() {
        assert!(combine(Replications::new()).is_err());

        let mut gap = Replications::new();
        gap.insert(0, result(&["x"], vec![vec![1.]]));
        gap.insert(2, result(&["x"], vec![vec![1.]]));
        assert!(combine(gap).is_err());

        let mut ticks = Replications::new();
        ticks.insert(0, result(&["x"], vec![vec![1.]]));
        ticks.insert(1, result(&["x"], vec![vec![1., 2.]]));
        assert!(combine(ticks).is_err());

        let mut reporters = Replications::new();
        reporters.insert(0, result(&["x"], vec![vec![1.]]));
        reporters.insert(1, result(&["z"], vec![vec![1.]]));
        assert!(combine(reporters).is_err());
    }

    #[test]
    fn duplicate_reporters_rejected() {
        let err = ReplicationResult::from_columns(
            vec!["x".to_string(), "x".to_string()],
            vec![vec![1., 2.], vec![3., 4.]],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InconsistentReplications(_)));
    }

    #[test]
    fn tampered_table_fails_check() {
        let mut reps = Replications::new();
        reps.insert(0, result(&["x", "y"], vec![vec![1., 2.], vec![3., 4.]]));
        reps.insert(1, result(&["x", "y"], vec![vec![5., 6.], vec![7., 8.]]));
        let table = combine(reps).unwrap();
        assert!(table.check().is_ok());

        let mut short = table.clone();
        short.data[3].pop();
        assert!(short.check().is_err());

        let mut missing = table.clone();
        missing.keys.pop();
        missing.data.pop();
        assert!(missing.check().is_err());

        let mut swapped = table;
        swapped.keys.swap(0, 2);
        assert!(swapped.check().is_err());
    }

    fn batch() -> impl Strategy<Value = Replications> {
        (1usize..4, 1usize..4, 0usize..5).prop_flat_map(|(reps, metrics, ticks)| {
            prop::collection::vec(
                prop::collection::vec(prop::collection::vec(-1e6f64..1e6, ticks), metrics),
                reps,
            )
            .prop_map(move |data| {
                data.into_iter()
                    .enumerate()
                    .map(|(i, columns)| {
                        let names = (0..metrics).map(|m| format!("m{}", m)).collect();
                        (i, ReplicationResult::from_columns(names, columns).unwrap())
                    })
                    .collect()
            })
        })
    }

    proptest! {
        #[test]
        fn relabeling_preserves_every_cell(reps in batch()) {
            let mut before = BTreeSet::new();
            for (index, result) in &reps {
                for metric in result.reporters() {
                    for (tick, v) in result.column(metric).unwrap().iter().enumerate() {
                        before.insert((metric.clone(), *index, tick, v.to_bits()));
                    }
                }
            }
            let count = reps.len();
            let metrics = reps[&0].reporters().len();
            let ticks = reps[&0].ticks();

            let table = combine(reps.clone()).unwrap();
            prop_assert!(table.check().is_ok());
            prop_assert_eq!(table.column_count(), count * metrics);
            prop_assert_eq!(table.ticks(), ticks);

            let after: BTreeSet<_> = table
                .cells()
                .map(|(k, tick, v)| (k.metric.clone(), k.replication, tick, v.to_bits()))
                .collect();
            prop_assert_eq!(before, after);
            prop_assert_eq!(table.split().unwrap(), reps);
        }
    }
}

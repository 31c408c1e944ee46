//! Fold strategies turning a stream of rows into an output value.
//!
//! A [`Reducer`] is used once per sub-result: [`Reducer::initiate`] creates
//! an accumulator, [`Reducer::append`] folds each row into it in arrival
//! order, and [`Reducer::finalize`] produces the output. The accumulator is
//! moved through every call, so a finalized output never sees later rows.

use std::collections::HashMap;
use std::hash::Hash;

use crate::error::Result;
use crate::row::Row;

/// A fold over the rows of one sub-result.
pub trait Reducer {
    /// Accumulator threaded through `append`.
    type Acc;
    /// Final value.
    type Output;

    /// Fresh accumulator.
    fn initiate(&self) -> Self::Acc;

    /// Fold one row into the accumulator.
    fn append(&self, acc: Self::Acc, row: Row) -> Result<Self::Acc>;

    /// Convert the accumulator into the output.
    fn finalize(&self, acc: Self::Acc) -> Self::Output;
}

impl<R: Reducer + ?Sized> Reducer for &R {
    type Acc = R::Acc;
    type Output = R::Output;

    fn initiate(&self) -> Self::Acc {
        (**self).initiate()
    }

    fn append(&self, acc: Self::Acc, row: Row) -> Result<Self::Acc> {
        (**self).append(acc, row)
    }

    fn finalize(&self, acc: Self::Acc) -> Self::Output {
        (**self).finalize(acc)
    }
}

/// Rows in arrival order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Collect;

impl Reducer for Collect {
    type Acc = Vec<Row>;
    type Output = Vec<Row>;

    fn initiate(&self) -> Vec<Row> {
        Vec::new()
    }

    fn append(&self, mut acc: Vec<Row>, row: Row) -> Result<Vec<Row>> {
        acc.push(row);
        Ok(acc)
    }

    fn finalize(&self, acc: Vec<Row>) -> Vec<Row> {
        acc
    }
}

/// Rows keyed by `key(row)`; a later row replaces an earlier one with the
/// same key.
#[derive(Debug, Clone, Copy)]
pub struct IndexBy<F> {
    key: F,
}

impl<F> IndexBy<F> {
    /// Index rows with `key`.
    pub fn new(key: F) -> Self {
        Self { key }
    }
}

impl<K, F> Reducer for IndexBy<F>
where
    K: Eq + Hash,
    F: Fn(&Row) -> Result<K>,
{
    type Acc = HashMap<K, Row>;
    type Output = HashMap<K, Row>;

    fn initiate(&self) -> Self::Acc {
        HashMap::new()
    }

    fn append(&self, mut acc: Self::Acc, row: Row) -> Result<Self::Acc> {
        let key = (self.key)(&row)?;
        acc.insert(key, row);
        Ok(acc)
    }

    fn finalize(&self, acc: Self::Acc) -> Self::Output {
        acc
    }
}

/// The first row, if any.
#[derive(Debug, Clone, Copy, Default)]
pub struct First;

impl Reducer for First {
    type Acc = Option<Row>;
    type Output = Option<Row>;

    fn initiate(&self) -> Option<Row> {
        None
    }

    fn append(&self, acc: Option<Row>, row: Row) -> Result<Option<Row>> {
        Ok(acc.or(Some(row)))
    }

    fn finalize(&self, acc: Option<Row>) -> Option<Row> {
        acc
    }
}

/// Row count only.
#[derive(Debug, Clone, Copy, Default)]
pub struct Count;

impl Reducer for Count {
    type Acc = u64;
    type Output = u64;

    fn initiate(&self) -> u64 {
        0
    }

    fn append(&self, acc: u64, _row: Row) -> Result<u64> {
        Ok(acc + 1)
    }

    fn finalize(&self, acc: u64) -> u64 {
        acc
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::protocol::types::FormatCode;
    use crate::row::Column;
    use crate::types::{Value, oid};

    fn rows(values: &[(i32, &str)]) -> Vec<Row> {
        let columns: Arc<[Column]> = ["id", "name"]
            .iter()
            .map(|name| Column {
                name: name.to_string(),
                table_oid: 0,
                column_id: 0,
                type_oid: oid::TEXT,
                type_size: -1,
                type_modifier: -1,
                format: FormatCode::Text,
            })
            .collect();
        values
            .iter()
            .map(|(id, name)| {
                Row::new(
                    columns.clone(),
                    vec![Value::Int4(*id), Value::Text(name.to_string())],
                )
                .unwrap()
            })
            .collect()
    }

    fn fold<R: Reducer>(reducer: &R, rows: Vec<Row>) -> R::Output {
        let mut acc = reducer.initiate();
        for row in rows {
            acc = reducer.append(acc, row).unwrap();
        }
        reducer.finalize(acc)
    }

    #[test]
    fn test_collect_keeps_order() {
        let out = fold(&Collect, rows(&[(1, "a"), (2, "b")]));
        let ids: Vec<i32> = out.iter().map(|r| r.try_get(0).unwrap()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_index_by_last_wins() {
        let reducer = IndexBy::new(|row: &Row| row.try_get::<i32>(0));
        let out = fold(&reducer, rows(&[(1, "a"), (2, "b"), (1, "c")]));
        assert_eq!(out.len(), 2);
        assert_eq!(out[&1].try_get::<String>(1).unwrap(), "c");
    }

    #[test]
    fn test_first_and_count() {
        let first = fold(&First, rows(&[(1, "a"), (2, "b")])).unwrap();
        assert_eq!(first.try_get::<i32>(0).unwrap(), 1);
        assert_eq!(fold(&Count, rows(&[(1, "a"), (2, "b")])), 2);
        assert!(fold(&First, Vec::new()).is_none());
    }

    #[test]
    fn test_finalize_is_a_snapshot() {
        let mut acc = Collect.initiate();
        let mut source = rows(&[(1, "a"), (2, "b")]).into_iter();
        acc = Collect.append(acc, source.next().unwrap()).unwrap();
        let snapshot = Collect.finalize(acc.clone());
        acc = Collect.append(acc, source.next().unwrap()).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(acc.len(), 2);
    }
}

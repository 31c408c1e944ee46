//! Accumulation of one request cycle's backend messages into sub-results.
//!
//! A request cycle may run several statements (a multi-statement simple
//! query, or several Execute messages before one Sync). Each statement gets
//! its own [`SubResult`]. A new one starts on a RowDescription when the
//! current one is closed or already described, and on a CommandComplete
//! when none is open.

use std::sync::Arc;

use crate::error::{Error, ErrorFields, Result};
use crate::protocol::backend::query::rows_affected;
use crate::protocol::types::Oid;
use crate::reducer::Reducer;
use crate::row::{Column, Row};

/// One statement's result.
///
/// While accumulating, `value` holds the reducer's accumulator; after
/// [`QueryResult::into_sub_results`] it holds the reducer's output.
#[derive(Debug, Clone)]
pub struct SubResult<T> {
    /// Parameter types from ParameterDescription
    pub param_oids: Option<Vec<Oid>>,
    /// Columns from RowDescription
    pub columns: Option<Arc<[Column]>>,
    /// Tag from CommandComplete
    pub command_tag: Option<String>,
    /// Execute stopped at its row limit (PortalSuspended)
    pub suspended: bool,
    /// Accumulator or output
    pub value: T,
    closed: bool,
}

impl<T> SubResult<T> {
    fn new(value: T) -> Self {
        Self {
            param_oids: None,
            columns: None,
            command_tag: None,
            suspended: false,
            value,
            closed: false,
        }
    }

    /// Rows affected according to the command tag.
    pub fn rows_affected(&self) -> Option<u64> {
        self.command_tag.as_deref().and_then(rows_affected)
    }

    fn map<U>(self, f: impl FnOnce(T) -> U) -> SubResult<U> {
        SubResult {
            param_oids: self.param_oids,
            columns: self.columns,
            command_tag: self.command_tag,
            suspended: self.suspended,
            value: f(self.value),
            closed: self.closed,
        }
    }
}

/// Result of one request cycle, folded through a [`Reducer`].
pub struct QueryResult<R: Reducer> {
    reducer: R,
    subs: Vec<SubResult<Option<R::Acc>>>,
    errors: Vec<ErrorFields>,
    fold_error: Option<Error>,
}

impl<R: Reducer> std::fmt::Debug for QueryResult<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryResult")
            .field("sub_results", &self.subs.len())
            .field("errors", &self.errors)
            .finish()
    }
}

impl<R: Reducer> QueryResult<R> {
    /// Empty result folding rows with `reducer`.
    pub fn new(reducer: R) -> Self {
        Self {
            reducer,
            subs: Vec::new(),
            errors: Vec::new(),
            fold_error: None,
        }
    }

    /// The open sub-result if `reuse` accepts it, otherwise a fresh one.
    fn select(
        &mut self,
        reuse: impl Fn(&SubResult<Option<R::Acc>>) -> bool,
    ) -> &mut SubResult<Option<R::Acc>> {
        let reusable = self.subs.last().is_some_and(|s| !s.closed && reuse(s));
        if !reusable {
            let acc = self.reducer.initiate();
            self.subs.push(SubResult::new(Some(acc)));
        }
        let last = self.subs.len() - 1;
        &mut self.subs[last]
    }

    fn open(&mut self) -> Option<&mut SubResult<Option<R::Acc>>> {
        self.subs.last_mut().filter(|s| !s.closed)
    }

    /// ParameterDescription arrived.
    pub fn on_parameter_description(&mut self, oids: Vec<Oid>) {
        let sub = self.select(|s| s.param_oids.is_none() && s.columns.is_none());
        sub.param_oids = Some(oids);
    }

    /// RowDescription arrived.
    pub fn on_row_description(&mut self, columns: Arc<[Column]>) {
        let sub = self.select(|s| s.columns.is_none());
        sub.columns = Some(columns);
    }

    /// Columns of the open sub-result, used to decode the next DataRow.
    pub fn current_columns(&self) -> Option<&Arc<[Column]>> {
        self.subs
            .last()
            .filter(|s| !s.closed)
            .and_then(|s| s.columns.as_ref())
    }

    /// A decoded DataRow arrived.
    ///
    /// A row outside a described sub-result is a protocol error. Once the
    /// reducer has failed, later rows are dropped.
    pub fn on_data_row(&mut self, row: Row) -> Result<()> {
        if self.current_columns().is_none() {
            return Err(Error::Protocol("DataRow without RowDescription".into()));
        }
        if self.fold_error.is_some() {
            return Ok(());
        }
        let reducer = &self.reducer;
        let Some(sub) = self.subs.last_mut() else {
            return Ok(());
        };
        if let Some(acc) = sub.value.take() {
            match reducer.append(acc, row) {
                Ok(acc) => sub.value = Some(acc),
                Err(e) => self.fold_error = Some(e),
            }
        }
        Ok(())
    }

    /// CommandComplete arrived.
    pub fn on_command_complete(&mut self, tag: &str) {
        let sub = self.select(|_| true);
        sub.command_tag = Some(tag.to_string());
        sub.closed = true;
    }

    /// EmptyQueryResponse arrived.
    pub fn on_empty_query(&mut self) {
        self.select(|_| true).closed = true;
    }

    /// PortalSuspended arrived.
    pub fn on_portal_suspended(&mut self) {
        if let Some(sub) = self.open() {
            sub.suspended = true;
            sub.closed = true;
        }
    }

    /// ErrorResponse arrived. The statement it interrupts is closed.
    pub fn on_error(&mut self, fields: ErrorFields) {
        if let Some(sub) = self.open() {
            sub.closed = true;
        }
        self.errors.push(fields);
    }

    /// Number of sub-results so far.
    pub fn len(&self) -> usize {
        self.subs.len()
    }

    /// Check if no sub-result was started.
    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// ErrorResponses captured during the cycle.
    pub fn errors(&self) -> &[ErrorFields] {
        &self.errors
    }

    /// Check if any ErrorResponse was captured.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Rows affected by the last completed statement.
    pub fn rows_affected(&self) -> Option<u64> {
        self.subs.iter().rev().find_map(SubResult::rows_affected)
    }

    /// Check if the last statement stopped at its row limit.
    pub fn is_suspended(&self) -> bool {
        self.subs.last().is_some_and(|sub| sub.suspended)
    }

    /// Finalize every sub-result, keeping its metadata.
    ///
    /// The first captured ErrorResponse wins over any accumulated data.
    pub fn into_sub_results(mut self) -> Result<Vec<SubResult<R::Output>>> {
        if !self.errors.is_empty() {
            return Err(Error::Server(self.errors.swap_remove(0)));
        }
        if let Some(e) = self.fold_error {
            return Err(e);
        }
        let reducer = self.reducer;
        Ok(self
            .subs
            .into_iter()
            .map(|sub| {
                sub.map(|acc| {
                    let acc = acc.unwrap_or_else(|| reducer.initiate());
                    reducer.finalize(acc)
                })
            })
            .collect())
    }

    /// Finalized outputs in statement order.
    pub fn into_results(self) -> Result<Vec<R::Output>> {
        Ok(self
            .into_sub_results()?
            .into_iter()
            .map(|sub| sub.value)
            .collect())
    }

    /// Output of the last statement, or of an empty fold if none ran.
    pub fn into_last(self) -> Result<R::Output> {
        let empty = self.reducer.initiate();
        let empty = self.reducer.finalize(empty);
        Ok(self.into_results()?.pop().unwrap_or(empty))
    }
}

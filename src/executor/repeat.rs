//! Run one statement shape many times with different arguments.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{ExecMode, Target, execute};
use crate::config::RepeatOptions;
use crate::error::{MergedErrors, PapergresError};
use crate::query::Query;
use crate::results::{FromRow, QueryResult};
use crate::types::SqlValue;

/// Index-aligned results of a repeated execution plus the merged error.
///
/// `error` is set iff at least one iteration failed, or the run failed
/// before any iteration started (in which case `results` is empty).
#[derive(Debug, Default)]
pub struct RepeatOutcome {
    pub results: Vec<QueryResult>,
    pub error: Option<PapergresError>,
}

impl RepeatOutcome {
    pub(crate) fn failed(err: PapergresError) -> Self {
        Self {
            results: Vec::new(),
            error: Some(err),
        }
    }

    pub(crate) fn from_results(results: Vec<QueryResult>) -> Self {
        let mut merged = MergedErrors::new();
        for err in results.iter().filter_map(|r| r.err.as_ref()) {
            merged.push(err);
        }
        Self {
            results,
            error: merged.into_error(),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// # Errors
    /// Returns the merged error when any iteration failed.
    pub fn into_result(self) -> Result<Vec<QueryResult>, PapergresError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.results),
        }
    }
}

/// A statement executed `n` times, with iteration `i` bound to `params(i)`.
///
/// The statement is prepared once and iterations run concurrently, at most
/// [`RepeatOptions::max_concurrency`] at a time. Inserts capture each
/// generated key; other statements fetch rows into `results[i].rows`.
///
/// ```rust,no_run
/// use papergres::prelude::*;
///
/// # async fn demo(db: Database) -> Result<(), PapergresError> {
/// let titles = ["Artemis", "Project Hail Mary"];
/// let outcome = db
///     .query("SELECT * FROM paper.book WHERE title = $1", vec![])
///     .repeat(titles.len(), |i| vec![SqlValue::from(titles[i])])
///     .timeout(std::time::Duration::from_secs(5))
///     .run()
///     .await;
/// for result in outcome.into_result()? {
///     println!("{result}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Repeat<'q, F> {
    query: &'q Query,
    params: F,
    n: usize,
    options: RepeatOptions,
}

impl<'q, F> Repeat<'q, F>
where
    F: Fn(usize) -> Vec<SqlValue>,
{
    pub fn new(query: &'q Query, params: F, n: usize) -> Self {
        Self {
            query,
            params,
            n,
            options: RepeatOptions::default(),
        }
    }

    #[must_use]
    pub fn options(mut self, options: RepeatOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.options.max_concurrency = Some(limit);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.options.cancellation = Some(token);
        self
    }

    /// Run every iteration and collect the results in iteration order.
    ///
    /// A prepare failure yields `PrepareFailed` with no results. On timeout
    /// or cancellation outstanding iterations are aborted and their slots
    /// carry `Cancelled`.
    pub async fn run(self) -> RepeatOutcome {
        let Repeat {
            query,
            params,
            n,
            options,
        } = self;
        if n == 0 {
            return RepeatOutcome::default();
        }

        let conn = match query.database.connection() {
            Ok(conn) => conn,
            Err(err) => return RepeatOutcome::failed(err),
        };
        let stmt = match conn.prepare(&query.sql).await {
            Ok(stmt) => stmt,
            Err(err) => {
                warn!(target: "papergres::repeat", error = %err, sql = %query.sql, "prepare failed");
                return RepeatOutcome::failed(PapergresError::PrepareFailed(err.to_string()));
            }
        };

        let limit = options
            .max_concurrency
            .unwrap_or_else(|| conn.max_concurrency())
            .max(1);
        let semaphore = Arc::new(Semaphore::new(limit));
        let token = options
            .cancellation
            .as_ref()
            .map_or_else(CancellationToken::new, CancellationToken::child_token);
        let stop = async {
            match options.timeout {
                Some(timeout) => {
                    tokio::select! {
                        () = token.cancelled() => {}
                        () = tokio::time::sleep(timeout) => {}
                    }
                }
                None => token.cancelled().await,
            }
        };
        tokio::pin!(stop);

        let mode = if query.insert {
            ExecMode::Insert
        } else {
            ExecMode::Many
        };
        let mut slots: Vec<Option<QueryResult>> = (0..n).map(|_| None).collect();
        let mut tasks = JoinSet::new();
        let mut stopped = false;

        for i in 0..n {
            let permit = tokio::select! {
                biased;
                () = &mut stop => {
                    stopped = true;
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            let iteration = query.with_args(params(i));
            let stmt = Arc::clone(&stmt);
            let info = format!("Repeat Index: {} / {n}", i + 1);
            tasks.spawn(async move {
                let _permit = permit;
                let mut result = execute(
                    Target::Prepared(stmt.as_ref()),
                    &iteration,
                    mode,
                    Some(info.as_str()),
                )
                .await;
                if let Some(err) = result.err.take() {
                    result.err = Some(iteration_failed(i, &err));
                }
                (i, result)
            });
        }

        if stopped {
            tasks.abort_all();
        }
        let mut panicked = 0usize;
        loop {
            tokio::select! {
                biased;
                joined = tasks.join_next() => match joined {
                    Some(Ok((i, result))) => slots[i] = Some(result),
                    Some(Err(err)) if err.is_panic() => panicked += 1,
                    Some(Err(_)) => {}
                    None => break,
                },
                () = &mut stop, if !stopped => {
                    stopped = true;
                    tasks.abort_all();
                }
            }
        }
        drop(stmt);

        if stopped {
            info!(
                target: "papergres::repeat",
                completed = slots.iter().filter(|s| s.is_some()).count(),
                total = n,
                "repeat stopped before completion"
            );
        }
        if panicked > 0 {
            warn!(target: "papergres::repeat", panicked, "repeat iterations panicked");
        }

        let results = slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.unwrap_or_else(|| {
                    QueryResult::failed(if stopped {
                        PapergresError::Cancelled(format!("Repeat Index: {} / {n}", i + 1))
                    } else {
                        PapergresError::IterationFailed {
                            index: i,
                            message: "task panicked".to_string(),
                        }
                    })
                })
            })
            .collect();
        RepeatOutcome::from_results(results)
    }

    /// Run and decode each iteration's rows into `dests[i]`.
    ///
    /// A decode failure is recorded on that iteration's result.
    pub async fn run_into<T: FromRow>(self, dests: &mut [Vec<T>]) -> RepeatOutcome {
        if dests.len() != self.n {
            return RepeatOutcome::failed(PapergresError::ParameterError(format!(
                "{} destinations supplied for {} iterations",
                dests.len(),
                self.n
            )));
        }
        let outcome = self.run().await;
        if outcome.results.is_empty() {
            return outcome;
        }
        let mut results = outcome.results;
        for (i, (result, dest)) in results.iter_mut().zip(dests.iter_mut()).enumerate() {
            if !result.is_ok() {
                continue;
            }
            match result.decode_rows::<T>() {
                Ok(rows) => *dest = rows,
                Err(err) => result.err = Some(iteration_failed(i, &err)),
            }
        }
        RepeatOutcome::from_results(results)
    }
}

fn iteration_failed(index: usize, err: &PapergresError) -> PapergresError {
    PapergresError::IterationFailed {
        index,
        message: err.to_string(),
    }
}

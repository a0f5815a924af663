//! Bounded-concurrency fan-out with positional results
//!
//! [`run_pool`] applies an async unit of work to every input while keeping
//! at most `limit` invocations in flight. A finished invocation frees its
//! slot immediately and the next queued input is admitted right away, so a
//! single slow call never holds back the rest of a batch.
//!
//! Completion order is unconstrained. Each invocation carries the index of
//! its input and writes its result into a slot reserved for that index, so
//! the output lines up with the input without any re-sorting.
//!
//! All in-flight futures are polled from the caller's task. The slot vector
//! and completion counter are only touched by the loop draining the stream,
//! so no locking is involved.

use futures::stream::{self, StreamExt};
use std::future::Future;
use std::num::NonZeroUsize;
use tracing::debug;

use crate::progress::ProgressReporter;

/// Runs `work` over `items` with at most `limit` concurrent invocations
///
/// Returns one result per input, in input order. A failing invocation is
/// stored as an `Err` at its index and does not stop the others; deciding
/// whether failures matter is left to the caller.
///
/// `progress` is told `(completed, total)` after every completion. An empty
/// input reports `(0, 0)` once and returns without calling `work`.
///
/// # Examples
///
/// ```
/// use awsusers::pool::run_pool;
/// use awsusers::progress::SilentReporter;
/// use std::num::NonZeroUsize;
///
/// # async fn example() {
/// let limit = NonZeroUsize::new(2).unwrap();
/// let doubled = run_pool(vec![1, 2, 3], limit, |n| async move {
///     Ok::<_, String>(n * 2)
/// }, &SilentReporter)
/// .await;
/// assert_eq!(doubled, vec![Ok(2), Ok(4), Ok(6)]);
/// # }
/// ```
pub async fn run_pool<T, R, E, F, Fut, P>(
    items: Vec<T>,
    limit: NonZeroUsize,
    work: F,
    progress: &P,
) -> Vec<Result<R, E>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    P: ProgressReporter + ?Sized,
{
    let total = items.len();
    if total == 0 {
        progress.report(0, 0);
        return Vec::new();
    }

    debug!("Starting pool over {} items with limit {}", total, limit);

    let mut slots: Vec<Option<Result<R, E>>> =
        std::iter::repeat_with(|| None).take(total).collect();
    let mut completed = 0;

    let work = &work;
    let mut in_flight = stream::iter(items.into_iter().enumerate())
        .map(move |(index, item)| async move { (index, work(item).await) })
        .buffer_unordered(limit.get());

    while let Some((index, result)) = in_flight.next().await {
        slots[index] = Some(result);
        completed += 1;
        progress.report(completed, total);
    }

    debug_assert!(slots.iter().all(Option::is_some));
    slots.into_iter().flatten().collect()
}

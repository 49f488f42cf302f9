use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// How a [`TaskRunner`] keeps its slots busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schedule {
    /// Launch a chunk of up to `limit` items and wait for the whole chunk before the next one.
    #[default]
    Barrier,
    /// Refill a slot as soon as any in-flight item finishes.
    Pool,
}

/// Runs a work function over a batch with at most `limit` items in flight.
///
/// Results come back in input order. The runner never inspects them, so a
/// failing item (e.g. one returning `Err`) does not stop the rest of the batch.
#[derive(Debug, Clone, Copy)]
pub struct TaskRunner {
    limit: usize,
    schedule: Schedule,
}

impl TaskRunner {
    pub fn new(limit: usize, schedule: Schedule) -> Self {
        Self { limit: limit.max(1), schedule }
    }

    pub fn limit(&self) -> usize { self.limit }

    pub fn schedule(&self) -> Schedule { self.schedule }

    pub async fn run<T, R, F, Fut>(&self, items: impl IntoIterator<Item = T>, mut work: F) -> Vec<R>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = R>,
    {
        match self.schedule {
            Schedule::Barrier => {
                let mut items = items.into_iter();
                let mut out = Vec::new();
                loop {
                    let chunk: Vec<Fut> = items.by_ref().take(self.limit).map(&mut work).collect();
                    if chunk.is_empty() {
                        break;
                    }
                    out.extend(join_all(chunk).await);
                }
                out
            }
            Schedule::Pool => {
                let mut done: Vec<(usize, R)> = stream::iter(items.into_iter().enumerate())
                    .map(|(i, item)| {
                        let fut = work(item);
                        async move { (i, fut.await) }
                    })
                    .buffer_unordered(self.limit)
                    .collect()
                    .await;
                done.sort_by_key(|(i, _)| *i);
                done.into_iter().map(|(_, r)| r).collect()
            }
        }
    }
}

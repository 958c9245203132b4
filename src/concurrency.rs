/*!
 * Chunked concurrency.
 *
 * Work items are split into fixed-size chunks. Every item of a chunk runs
 * concurrently, the whole chunk is awaited, then a fixed pause separates it from
 * the next chunk. Both the single-record batch helper and the scheduled batch run
 * go through `process_in_chunks`, so there is exactly one layer of chunking.
 */

use futures::future::join_all;
use log::debug;
use std::future::Future;
use std::time::Duration;

/// Results of a chunked run, in input order
#[derive(Debug, Clone)]
pub struct ChunkedRun<R> {
    /// One result per input item
    pub results: Vec<R>,
    /// Number of chunks that were executed
    pub chunks: usize,
}

/// Number of chunks `len` items split into
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    len.div_ceil(chunk_size.max(1))
}

/// Run `task` over `items`, at most `chunk_size` at a time, pausing `delay` between chunks.
///
/// A `chunk_size` of zero is treated as one. No pause follows the last chunk.
pub async fn process_in_chunks<T, R, F, Fut>(
    items: Vec<T>,
    chunk_size: usize,
    delay: Duration,
    task: F,
) -> ChunkedRun<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let chunk_size = chunk_size.max(1);
    let total_chunks = chunk_count(items.len(), chunk_size);
    let mut results = Vec::with_capacity(items.len());
    let mut pending = items.into_iter().peekable();
    let mut chunks = 0;

    while pending.peek().is_some() {
        if chunks > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let chunk: Vec<T> = pending.by_ref().take(chunk_size).collect();
        chunks += 1;
        debug!("Processing chunk {}/{} ({} items)", chunks, total_chunks, chunk.len());

        results.extend(join_all(chunk.into_iter().map(&task)).await);
    }

    ChunkedRun { results, chunks }
}

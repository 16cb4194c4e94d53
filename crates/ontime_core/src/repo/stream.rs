//! Keyset-paginated lazy streams over SQLite queries.
//!
//! # Invariants
//! - Rows are fetched in batches of at most `STREAM_BATCH_SIZE`, only when
//!   the consumer polls past the buffered rows.
//! - A stream is single-pass; dropping it stops all further reads.
//! - After the first error the stream yields that error once and ends.

use crate::repo::appointment_repo::RepoResult;
use futures::stream::{self, LocalBoxStream, StreamExt};
use std::collections::VecDeque;

/// Maximum rows loaded per round-trip while streaming.
pub const STREAM_BATCH_SIZE: u32 = 64;

/// One fetched batch plus the cursor to resume after it.
pub(crate) struct Batch<T, K> {
    /// Rows that passed in-memory filtering, in final order.
    pub items: Vec<T>,
    /// Keyset position of the last row read, filtered or not.
    pub next_cursor: Option<K>,
    /// Whether the underlying query has no rows after `next_cursor`.
    pub exhausted: bool,
}

struct KeysetState<T, K, F> {
    fetch: F,
    cursor: Option<K>,
    buffer: VecDeque<T>,
    done: bool,
}

/// Builds a lazy stream from a batch fetcher resumed by keyset cursor.
pub(crate) fn keyset_stream<'a, T, K, F>(fetch: F) -> LocalBoxStream<'a, RepoResult<T>>
where
    T: 'a,
    K: 'a,
    F: FnMut(Option<&K>) -> RepoResult<Batch<T, K>> + 'a,
{
    let state = KeysetState {
        fetch,
        cursor: None,
        buffer: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.buffer.pop_front() {
                return Some((Ok(item), state));
            }
            if state.done {
                return None;
            }

            match (state.fetch)(state.cursor.as_ref()) {
                Ok(batch) => {
                    state.done = batch.exhausted || batch.next_cursor.is_none();
                    state.cursor = batch.next_cursor;
                    state.buffer.extend(batch.items);
                }
                Err(err) => {
                    state.done = true;
                    return Some((Err(err), state));
                }
            }
        }
    })
    .boxed_local()
}

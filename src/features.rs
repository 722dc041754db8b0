//! Batched audio-feature lookup and positional join
//!
//! Feature vectors come from a bulk endpoint that accepts up to 100 track ids
//! per request and answers with one vector per id, in the order submitted.
//! [`join_features`] buffers up to `batch_size` normalized records, looks up
//! their features in one request, and emits each record with its vector
//! appended under `audio_features`.
//!
//! Records without a track id (unavailable or local tracks) still take a slot
//! in the `ids` parameter as an empty string, so every batch stays aligned
//! with its lookup result.

use std::collections::VecDeque;

use futures::stream::{self, Stream, TryStreamExt};
use serde_json::Value;
use tracing::debug;

use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::list::fetch_list;
use crate::types::{AUDIO_FEATURES_KEY, Record, track_id};

/// Comma-joined ids of a batch, with an empty slot for each record lacking one
pub fn batch_ids(batch: &[Record]) -> String {
    batch
        .iter()
        .map(|record| track_id(record).unwrap_or(""))
        .collect::<Vec<_>>()
        .join(",")
}

/// Pair each record of a batch with the vector at the same position
///
/// # Errors
/// Returns [`Error::Misaligned`] if the counts differ; no record is emitted for
/// that batch.
pub fn attach_features(batch: Vec<Record>, features: Vec<Value>) -> Result<Vec<Record>> {
    if batch.len() != features.len() {
        return Err(Error::Misaligned {
            expected: batch.len(),
            actual: features.len(),
        });
    }

    Ok(batch
        .into_iter()
        .zip(features)
        .map(|(mut record, vector)| {
            record.insert(AUDIO_FEATURES_KEY.to_string(), vector);
            record
        })
        .collect())
}

struct JoinState<S> {
    client: ApiClient,
    url: String,
    records: std::pin::Pin<Box<S>>,
    ready: VecDeque<Record>,
    batch_size: usize,
    exhausted: bool,
    batches: usize,
}

/// Append audio features to every record, one lookup per `batch_size` records
///
/// Output order and count equal the input's. The stream pulls a whole batch
/// from upstream before emitting its first record, and issues the next lookup
/// only once the previous batch has been drained. A `batch_size` of zero is
/// treated as one.
pub fn join_features<S>(
    client: ApiClient,
    records: S,
    batch_size: usize,
) -> impl Stream<Item = Result<Record>>
where
    S: Stream<Item = Result<Record>>,
{
    let url = client.endpoints().audio_features();
    let state = JoinState {
        client,
        url,
        records: Box::pin(records),
        ready: VecDeque::new(),
        batch_size: batch_size.max(1),
        exhausted: false,
        batches: 0,
    };

    stream::try_unfold(state, |mut state| async move {
        loop {
            if let Some(record) = state.ready.pop_front() {
                return Ok(Some((record, state)));
            }
            if state.exhausted {
                return Ok(None);
            }

            let mut batch = Vec::with_capacity(state.batch_size);
            while batch.len() < state.batch_size {
                match state.records.try_next().await? {
                    Some(record) => batch.push(record),
                    None => {
                        state.exhausted = true;
                        break;
                    }
                }
            }
            if batch.is_empty() {
                debug!(batches = state.batches, "Feature join finished");
                return Ok(None);
            }

            let ids = batch_ids(&batch);
            let features = fetch_list(&state.client, &state.url, &[("ids", ids.as_str())]).await?;
            state.batches += 1;

            debug!(
                batch = state.batches,
                records = batch.len(),
                vectors = features.len(),
                "Fetched audio features"
            );

            state.ready.extend(attach_features(batch, features)?);
        }
    })
}

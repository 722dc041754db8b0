//! Track record normalization
//!
//! Track listings come in two shapes. Saved tracks and playlist entries are
//! wrapped: `{"added_at": ..., "track": {...}}`. Top tracks are bare track
//! objects carrying `"type": "track"`. [`normalize_tracks`] turns either into
//! the wrapped shape so later stages can always read `record["track"]`.
//!
//! The shape is decided from the first element alone and applied to the rest.

use futures::stream::{self, Stream, TryStreamExt};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::types::{Record, TRACK_KEY};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TrackShape {
    Wrapped,
    Bare,
}

impl TrackShape {
    fn detect(first: &Value) -> Result<Self> {
        let Value::Object(fields) = first else {
            return Err(Error::shape("expected a track object", first.clone()));
        };

        if fields.contains_key(TRACK_KEY) {
            return Ok(TrackShape::Wrapped);
        }

        match fields.get("type").and_then(Value::as_str) {
            Some("track") => Ok(TrackShape::Bare),
            _ => {
                tracing::error!(record = %first, "First record is neither wrapped nor a track");
                Err(Error::shape("expected a track object", first.clone()))
            }
        }
    }

    fn apply(self, item: Value) -> Result<Record> {
        match (self, item) {
            (TrackShape::Wrapped, Value::Object(fields)) => Ok(fields),
            (TrackShape::Bare, item @ Value::Object(_)) => {
                let mut wrapped = Map::with_capacity(1);
                wrapped.insert(TRACK_KEY.to_string(), item);
                Ok(wrapped)
            }
            (_, other) => Err(Error::shape("record is not a JSON object", other)),
        }
    }
}

/// Convert a stream of track records into the wrapped `{track: ...}` shape
///
/// Only the first element is inspected. If it has a `track` key the stream
/// passes through unchanged; if it is a bare track (`type == "track"`) every
/// element is wrapped as `{track: element}`. Anything else fails with
/// [`Error::Shape`] before a second element is pulled.
///
/// Order and count are preserved. An empty input gives an empty output.
pub fn normalize_tracks<S>(items: S) -> impl Stream<Item = Result<Record>>
where
    S: Stream<Item = Result<Value>>,
{
    let items = Box::pin(items);

    stream::try_unfold(
        (items, None::<TrackShape>),
        |(mut items, shape)| async move {
            let Some(item) = items.try_next().await? else {
                return Ok(None);
            };

            let shape = match shape {
                Some(shape) => shape,
                None => {
                    let detected = TrackShape::detect(&item)?;
                    tracing::debug!(shape = ?detected, "Detected track record shape");
                    detected
                }
            };

            let record = shape.apply(item)?;
            Ok(Some((record, (items, Some(shape)))))
        },
    )
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn source(values: Vec<Value>) -> impl Stream<Item = Result<Value>> {
        stream::iter(values.into_iter().map(Ok))
    }

    async fn normalize_all(values: Vec<Value>) -> Result<Vec<Value>> {
        normalize_tracks(source(values))
            .map_ok(Value::Object)
            .try_collect()
            .await
    }

    #[tokio::test]
    async fn wrapped_records_pass_through_unchanged() {
        let input = vec![
            json!({"added_at": "2020-01-01T00:00:00Z", "track": {"id": "a"}}),
            json!({"added_at": "2020-01-02T00:00:00Z", "track": {"id": "b"}}),
        ];
        let output = normalize_all(input.clone()).await.unwrap();
        assert_eq!(output, input);
    }

    #[tokio::test]
    async fn bare_tracks_are_wrapped() {
        let input = vec![
            json!({"id": "a", "type": "track", "name": "A"}),
            json!({"id": "b", "type": "track", "name": "B"}),
            json!({"id": "c", "type": "track", "name": "C"}),
        ];
        let output = normalize_all(input.clone()).await.unwrap();

        let expected: Vec<Value> = input.into_iter().map(|t| json!({"track": t})).collect();
        assert_eq!(output, expected);
    }

    #[tokio::test]
    async fn wrapped_record_without_added_at_stays_without_it() {
        let output = normalize_all(vec![json!({"track": {"id": "a"}})])
            .await
            .unwrap();
        assert_eq!(output, vec![json!({"track": {"id": "a"}})]);
        assert!(output[0].get("added_at").is_none());
    }

    #[tokio::test]
    async fn empty_input_gives_empty_output() {
        let output = normalize_all(vec![]).await.unwrap();
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn non_track_first_record_fails_before_pulling_more() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();
        let input = source(vec![
            json!({"type": "artist", "name": "Somebody"}),
            json!({"type": "track", "id": "a"}),
            json!({"type": "track", "id": "b"}),
        ])
        .inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let results: Vec<Result<Record>> = normalize_tracks(input).collect().await;

        assert_eq!(results.len(), 1);
        match &results[0] {
            Err(Error::Shape { payload, .. }) => assert_eq!(payload["type"], "artist"),
            other => panic!("expected shape error, got {other:?}"),
        }
        assert_eq!(pulled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn upstream_error_is_propagated() {
        let input = stream::iter(vec![
            Ok(json!({"track": {"id": "a"}})),
            Err(Error::shape("broken page", Value::Null)),
        ]);
        let results: Vec<Result<Record>> = normalize_tracks(input).collect().await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[tokio::test]
    async fn non_object_after_detection_is_rejected() {
        let err = normalize_all(vec![json!({"track": {"id": "a"}}), json!(42)])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Shape { .. }));
    }
}

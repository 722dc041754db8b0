//! Common test utilities for listen-harvest integration tests
//!
//! A [`MockApi`] wraps a wiremock server that plays the music Web API:
//! paginated track listings, a profile endpoint and an audio-features
//! endpoint that answers one vector per submitted id.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use listen_harvest::config::{ApiConfig, PipelineConfig};
use listen_harvest::{Config, Pipeline};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Answers `/audio-features?ids=...` with `{"id": <id>, "tempo": <position>}`
/// per id and `null` for empty slots
pub struct EchoFeatures;

impl Respond for EchoFeatures {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let ids = query_value(request, "ids").unwrap_or_default();
        let vectors: Vec<Value> = ids
            .split(',')
            .enumerate()
            .map(|(position, id)| {
                if id.is_empty() {
                    Value::Null
                } else {
                    json!({"id": id, "tempo": position as f64})
                }
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "audio_features": vectors }))
    }
}

/// Value of a query parameter of a received request
pub fn query_value(request: &Request, key: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Saved-track record as the library endpoint returns it
pub fn saved_track(id: &str) -> Value {
    json!({
        "added_at": "2023-02-03T04:05:06Z",
        "track": {"id": id, "type": "track", "name": format!("Track {id}"), "popularity": 50}
    })
}

/// Mock API server
pub struct MockApi {
    pub server: MockServer,
}

impl MockApi {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Configuration pointing at this server
    pub fn config(&self, batch_size: usize, attach_user: bool) -> Config {
        Config {
            api: ApiConfig {
                base_url: self.uri(),
                ..ApiConfig::default()
            },
            pipeline: PipelineConfig {
                batch_size,
                attach_user,
            },
        }
    }

    pub fn pipeline(&self, batch_size: usize, attach_user: bool) -> Pipeline {
        Pipeline::new("test-token", &self.config(batch_size, attach_user)).unwrap()
    }

    /// Serve `items` from `first_path` in pages of `page_size`, chained by `next`
    ///
    /// Page `n > 0` lives at `{first_path}/page{n}`.
    pub async fn mount_paged(&self, first_path: &str, items: Vec<Value>, page_size: usize) {
        let pages: Vec<Vec<Value>> = items.chunks(page_size).map(<[Value]>::to_vec).collect();
        let count = pages.len().max(1);

        for n in 0..count {
            let page_path = if n == 0 {
                first_path.to_string()
            } else {
                format!("{first_path}/page{n}")
            };
            let next = if n + 1 < count {
                Value::String(format!("{}{}/page{}", self.uri(), first_path, n + 1))
            } else {
                Value::Null
            };
            let page_items = pages.get(n).cloned().unwrap_or_default();

            Mock::given(method("GET"))
                .and(path(page_path.as_str()))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({"items": page_items, "next": next})),
                )
                .expect(1)
                .mount(&self.server)
                .await;
        }
    }

    pub async fn mount_features(&self) {
        Mock::given(method("GET"))
            .and(path("/audio-features"))
            .respond_with(EchoFeatures)
            .mount(&self.server)
            .await;
    }

    pub async fn mount_user(&self, display_name: &str) {
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "user-1", "display_name": display_name})),
            )
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Sizes of the `ids` lists submitted to the audio-features endpoint, in order
    pub async fn feature_batch_sizes(&self) -> Vec<usize> {
        self.server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/audio-features")
            .map(|r| query_value(r, "ids").unwrap().split(',').count())
            .collect()
    }
}

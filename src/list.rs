//! Bulk lookups answered with a single-key list
//!
//! Endpoints such as `/audio-features?ids=a,b,c` reply with one JSON object
//! holding exactly one key whose value is the list of results, e.g.
//! `{"audio_features": [...]}`. The key name is not significant.

use serde_json::Value;

use crate::client::{ApiClient, FetchRequest};
use crate::error::{Error, Result};

/// Fetch `url` with `query` and return the elements of its single list, in response order
///
/// Status checking is always on.
///
/// # Errors
/// - anything [`ApiClient::fetch_json`] can return
/// - [`Error::Shape`] if the body is not an object with exactly one array-valued key
pub async fn fetch_list(
    client: &ApiClient,
    url: &str,
    query: &[(&str, &str)],
) -> Result<Vec<Value>> {
    let request = query
        .iter()
        .fold(FetchRequest::get(url).strict(), |request, (key, value)| {
            request.query(*key, *value)
        });

    let body = client.fetch_json(&request).await?;
    single_list(body)
}

fn single_list(body: Value) -> Result<Vec<Value>> {
    let Value::Object(fields) = body else {
        return Err(Error::shape("list response is not a JSON object", body));
    };

    if fields.len() != 1 {
        return Err(Error::shape(
            format!("list response has {} keys, expected exactly one", fields.len()),
            Value::Object(fields),
        ));
    }

    match fields.into_iter().next() {
        Some((_, Value::Array(items))) => Ok(items),
        Some((key, other)) => Err(Error::shape(
            format!("list response key '{key}' does not hold an array"),
            other,
        )),
        None => Err(Error::shape("list response is empty", Value::Null)),
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn single_list_unwraps_any_key() {
        let items = single_list(json!({"artists": [{"id": "x"}, {"id": "y"}]})).unwrap();
        assert_eq!(items, vec![json!({"id": "x"}), json!({"id": "y"})]);
    }

    #[test]
    fn single_list_keeps_nulls_in_place() {
        let items = single_list(json!({"audio_features": [null, {"id": "b"}]})).unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_null());
    }

    #[test]
    fn two_keys_is_a_shape_error() {
        let err = single_list(json!({"a": [], "b": []})).unwrap_err();
        assert!(matches!(err, Error::Shape { .. }));
    }

    #[test]
    fn non_array_value_is_a_shape_error() {
        let err = single_list(json!({"error": {"status": 400}})).unwrap_err();
        assert!(matches!(err, Error::Shape { .. }));
    }

    #[test]
    fn empty_object_is_a_shape_error() {
        assert!(single_list(json!({})).is_err());
        assert!(single_list(json!("text")).is_err());
    }

    #[tokio::test]
    async fn fetch_list_passes_query_and_returns_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/audio-features"))
            .and(query_param("ids", "a,b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "audio_features": [{"id": "a"}, {"id": "b"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = ApiConfig {
            base_url: server.uri(),
            ..ApiConfig::default()
        };
        let client = ApiClient::new("token", &config).unwrap();
        let url = client.endpoints().audio_features();

        let items = fetch_list(&client, &url, &[("ids", "a,b")]).await.unwrap();
        assert_eq!(items, vec![json!({"id": "a"}), json!({"id": "b"})]);
    }

    #[tokio::test]
    async fn fetch_list_is_strict_even_for_lenient_clients() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad ids"))
            .mount(&server)
            .await;

        let config = ApiConfig {
            base_url: server.uri(),
            strict_status: false,
            ..ApiConfig::default()
        };
        let client = ApiClient::new("token", &config).unwrap();
        let url = client.endpoints().audio_features();

        let err = fetch_list(&client, &url, &[("ids", "")]).await.unwrap_err();
        assert!(matches!(err, Error::Status { .. }));
    }
}

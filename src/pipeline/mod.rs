//! End-to-end track pipeline
//!
//! A [`Pipeline`] owns one authenticated [`ApiClient`] and composes the
//! stages for a track listing:
//!
//! ```text
//! walk_pages ──▶ normalize_tracks ──▶ join_features ──▶ (attach user) ──▶ consumer
//! ```
//!
//! Every stream it returns is lazy: nothing is requested until the consumer
//! polls, and each poll issues only the requests needed for the next record.
//! The streams hold their own client clone, so the connection pool lives
//! until the last stream (and the pipeline) is dropped, whether exhausted or
//! abandoned.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde_json::Value;
use tracing::info;

use crate::client::{ApiClient, FetchRequest};
use crate::config::{Config, PipelineConfig};
use crate::error::{Error, Result};
use crate::features::join_features;
use crate::normalize::normalize_tracks;
use crate::pager::walk_pages;
use crate::types::{
    Endpoints, FetchStats, PLAYLIST_KEY, Record, TIME_RANGE_KEY, TimeRange, TopKind, USER_KEY,
};


/// Track pipeline bound to one bearer token
#[derive(Clone, Debug)]
pub struct Pipeline {
    client: ApiClient,
    config: PipelineConfig,
}

impl Pipeline {
    /// Validate `config` and create a pipeline authenticated with `token`
    ///
    /// # Errors
    /// - [`Error::Config`] if the configuration is invalid
    /// - [`Error::Auth`] if the token cannot be sent as a header
    pub fn new(token: &str, config: &Config) -> Result<Self> {
        config.validate()?;
        let client = ApiClient::new(token, &config.api)?;
        Ok(Self::from_client(client, config.pipeline.clone()))
    }

    /// Build a pipeline around an existing client
    pub fn from_client(client: ApiClient, config: PipelineConfig) -> Self {
        Self { client, config }
    }

    /// The underlying client
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Endpoint URLs under the configured base URL
    pub fn endpoints(&self) -> &Endpoints {
        self.client.endpoints()
    }

    /// Requests sent and 429s absorbed so far
    pub fn stats(&self) -> FetchStats {
        self.client.stats()
    }

    /// Profile of the token's owner
    ///
    /// # Errors
    /// Any fetch error; [`Error::Shape`] if the profile is not a JSON object.
    pub async fn current_user(&self) -> Result<Value> {
        fetch_user(&self.client).await
    }

    /// Every track of a listing, normalized and joined with its audio features
    ///
    /// `start_url` is the first page of any track listing (saved tracks,
    /// playlist tracks, top tracks). With `attach_user` set, the owner's
    /// profile is fetched once, on first poll, and added under `user`.
    pub fn tracks_with_features(&self, start_url: &str) -> BoxStream<'static, Result<Record>> {
        info!(
            url = %start_url,
            attach_user = self.config.attach_user,
            "Starting track pipeline"
        );
        let joined = self.joined_tracks(start_url);
        self.finish_logged(self.attach_user(joined), start_url.to_string())
    }

    /// Walk, normalize and join, without the user profile
    fn joined_tracks(&self, start_url: &str) -> BoxStream<'static, Result<Record>> {
        let items = walk_pages(self.client.clone(), start_url.to_string());
        join_features(
            self.client.clone(),
            normalize_tracks(items),
            self.config.batch_size,
        )
        .boxed()
    }

    /// Fetch the profile once on first poll and add it to every record of `records`
    fn attach_user(
        &self,
        records: BoxStream<'static, Result<Record>>,
    ) -> BoxStream<'static, Result<Record>> {
        if !self.config.attach_user {
            return records;
        }

        let client = self.client.clone();
        stream::once(async move {
            let user = fetch_user(&client).await?;
            Ok::<_, Error>(records.map_ok(move |mut record| {
                record.insert(USER_KEY.to_string(), user.clone());
                record
            }))
        })
        .try_flatten()
        .boxed()
    }

    /// Log record and request totals once `records` is exhausted
    fn finish_logged(
        &self,
        records: BoxStream<'static, Result<Record>>,
        url: String,
    ) -> BoxStream<'static, Result<Record>> {
        let client = self.client.clone();
        let emitted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&emitted);

        let finished = stream::once(async move {
            let stats = client.stats();
            info!(
                url = %url,
                records = emitted.load(Ordering::Relaxed),
                requests = stats.requests,
                backoffs = stats.backoffs,
                "Track pipeline finished"
            );
        })
        .filter_map(|()| future::ready(None::<Result<Record>>));

        records
            .inspect_ok(move |_| {
                counter.fetch_add(1, Ordering::Relaxed);
            })
            .chain(finished)
            .boxed()
    }

    /// The token owner's saved tracks with audio features
    pub fn library(&self) -> BoxStream<'static, Result<Record>> {
        self.tracks_with_features(&self.endpoints().library())
    }

    /// Playlist objects from a playlist listing (e.g. [`Endpoints::my_playlists`])
    pub fn playlists(&self, playlists_url: &str) -> BoxStream<'static, Result<Value>> {
        walk_pages(self.client.clone(), playlists_url.to_string()).boxed()
    }

    /// Tracks of every playlist in a listing, each tagged with its playlist under `playlist`
    ///
    /// Playlists are expanded one after another in listing order. Empty
    /// playlists contribute nothing. With `attach_user` set, the profile is
    /// fetched once for the whole listing.
    pub fn playlist_tracks(&self, playlists_url: &str) -> BoxStream<'static, Result<Record>> {
        info!(
            url = %playlists_url,
            attach_user = self.config.attach_user,
            "Starting playlist expansion"
        );
        let pipeline = self.clone();
        let expanded = self
            .playlists(playlists_url)
            .map_ok(move |playlist| pipeline.tracks_of_playlist(playlist))
            .try_flatten()
            .boxed();
        self.finish_logged(self.attach_user(expanded), playlists_url.to_string())
    }

    fn tracks_of_playlist(&self, playlist: Value) -> BoxStream<'static, Result<Record>> {
        let id = match playlist.get("id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => {
                return stream::once(future::ready(Err(Error::shape(
                    "playlist has no id",
                    playlist,
                ))))
                .boxed();
            }
        };

        info!(
            playlist_id = %id,
            name = playlist.get("name").and_then(serde_json::Value::as_str).unwrap_or(""),
            "Expanding playlist"
        );

        let url = self.endpoints().playlist_tracks(&id);
        self.joined_tracks(&url)
            .map_ok(move |mut record| {
                record.insert(PLAYLIST_KEY.to_string(), playlist.clone());
                record
            })
            .boxed()
    }

    /// Top tracks over `time_range` with audio features, tagged under `time_range`
    pub fn top_tracks(&self, time_range: TimeRange) -> BoxStream<'static, Result<Record>> {
        let url = self.endpoints().top(TopKind::Tracks, time_range);
        self.tracks_with_features(&url)
            .map_ok(move |mut record| {
                record.insert(
                    TIME_RANGE_KEY.to_string(),
                    Value::String(time_range.as_str().to_string()),
                );
                record
            })
            .boxed()
    }

    /// Top artists over `time_range` (artists have no audio features)
    pub fn top_artists(&self, time_range: TimeRange) -> BoxStream<'static, Result<Value>> {
        walk_pages(
            self.client.clone(),
            self.endpoints().top(TopKind::Artists, time_range),
        )
        .boxed()
    }
}

/// Run the track pipeline for one listing with a fresh client
///
/// The returned stream owns the client; dropping it releases the connections.
///
/// # Errors
/// As [`Pipeline::new`]. Fetch errors surface through the stream.
///
/// # Example
///
/// ```no_run
/// use futures::TryStreamExt;
/// use listen_harvest::{Config, run};
///
/// # async fn example() -> listen_harvest::Result<()> {
/// let tracks = run("BQD...", "https://api.spotify.com/v1/me/tracks", &Config::default())?;
/// let records: Vec<_> = tracks.try_collect().await?;
/// println!("{} tracks", records.len());
/// # Ok(())
/// # }
/// ```
pub fn run(
    token: &str,
    start_url: &str,
    config: &Config,
) -> Result<BoxStream<'static, Result<Record>>> {
    Ok(Pipeline::new(token, config)?.tracks_with_features(start_url))
}

async fn fetch_user(client: &ApiClient) -> Result<Value> {
    let user = client
        .fetch_json(&FetchRequest::get(client.endpoints().me()))
        .await?;
    if !user.is_object() {
        return Err(Error::shape("user profile is not a JSON object", user));
    }
    Ok(user)
}

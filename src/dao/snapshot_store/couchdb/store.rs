use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

use crate::dao::{
    models::RoundSnapshotEntity, snapshot_store::SnapshotStore, storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{ChangesResponse, CouchRoundDocument, ROUND_DOC_ID},
};

/// Buffered nudges per subscriber; laggards fall back to the next poll.
const CHANGES_CHANNEL_CAPACITY: usize = 8;
/// How long one `_changes` longpoll request is allowed to hang open.
const FEED_TIMEOUT_MS: u64 = 30_000;
/// Pause before retrying the feed after a failed poll.
const FEED_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Snapshot store keeping the round as a single CouchDB document shared by
/// every server instance.
///
/// Besides plain reads and writes, the store follows the database's
/// `_changes` feed in a background task and fans out a unit nudge whenever
/// the round document is touched, giving the sync adapter a push channel on
/// top of its polling baseline. The feed task is owned by the store: when
/// the last clone is dropped, the task is aborted with it.
#[derive(Clone)]
pub struct CouchSnapshotStore {
    inner: CouchClient,
    changes_tx: broadcast::Sender<()>,
    _feed: Arc<FeedGuard>,
}

impl CouchSnapshotStore {
    /// Establish a connection to CouchDB, ensure the database exists, and
    /// start following its `_changes` feed.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let inner = CouchClient::new(config)?;
        inner.ensure_database().await?;

        let (changes_tx, _) = broadcast::channel(CHANGES_CHANNEL_CAPACITY);
        let feed = tokio::spawn(run_changes_feed(inner.clone(), changes_tx.clone()));

        Ok(Self {
            inner,
            changes_tx,
            _feed: Arc::new(FeedGuard { handle: feed }),
        })
    }
}

impl SnapshotStore for CouchSnapshotStore {
    fn kind(&self) -> &'static str {
        "couchdb"
    }

    fn load(&self) -> BoxFuture<'static, StorageResult<Option<RoundSnapshotEntity>>> {
        let client = self.inner.clone();
        Box::pin(async move {
            let maybe_doc = client.get_document(ROUND_DOC_ID).await?;
            Ok(maybe_doc.map(CouchRoundDocument::into_entity))
        })
    }

    fn save(&self, snapshot: RoundSnapshotEntity) -> BoxFuture<'static, StorageResult<()>> {
        let client = self.inner.clone();
        Box::pin(async move {
            let mut doc = CouchRoundDocument::from_entity(snapshot);
            if let Some(existing) = client.get_document(ROUND_DOC_ID).await? {
                doc.rev = existing.rev;
            }
            client
                .put_document(ROUND_DOC_ID, &doc)
                .await
                .map_err(Into::into)
        })
    }

    fn changes(&self) -> Option<broadcast::Receiver<()>> {
        Some(self.changes_tx.subscribe())
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let client = self.inner.clone();
        Box::pin(async move { client.check_database().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let client = self.inner.clone();
        Box::pin(async move { client.ensure_database().await.map_err(Into::into) })
    }
}

/// Aborts the `_changes` follower when the owning store goes away.
struct FeedGuard {
    handle: JoinHandle<()>,
}

impl Drop for FeedGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Follow the `_changes` feed forever, nudging subscribers whenever the
/// round document changes. Failed polls back off and retry; the polling
/// sync loop papers over anything missed meanwhile.
async fn run_changes_feed(client: CouchClient, tx: broadcast::Sender<()>) {
    let mut since = String::from("now");
    loop {
        match client.poll_changes(&since).await {
            Ok(changes) => {
                since = changes.last_seq;
                if changes.results.iter().any(|row| row.id == ROUND_DOC_ID) {
                    let _ = tx.send(());
                }
            }
            Err(err) => {
                debug!(error = %err, "changes feed poll failed; backing off");
                sleep(FEED_RETRY_DELAY).await;
            }
        }
    }
}

/// Plain HTTP-level CouchDB access shared by document operations and the
/// feed follower.
#[derive(Clone)]
struct CouchClient {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchClient {
    fn new(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(user, pass)| (Arc::<str>::from(user), Arc::<str>::from(pass)));

        Ok(Self {
            client,
            base_url,
            database,
            auth,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        let builder = self.client.request(method, url);
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    fn database_request(&self, method: Method) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, self.database);
        let builder = self.client.request(method, url);
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    /// Verify the database answers at all.
    async fn check_database(&self) -> CouchResult<()> {
        let response = self
            .database_request(Method::GET)
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: self.database.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::DatabaseStatus {
                database: self.database.to_string(),
                status: response.status(),
            })
        }
    }

    /// Verify the database exists, creating it on first contact.
    async fn ensure_database(&self) -> CouchResult<()> {
        let response = self
            .database_request(Method::GET)
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: self.database.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .database_request(Method::PUT)
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: self.database.to_string(),
                        source,
                    })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database: self.database.to_string(),
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database: self.database.to_string(),
                status: other,
            }),
        }
    }

    async fn get_document(&self, doc_id: &str) -> CouchResult<Option<CouchRoundDocument>> {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<CouchRoundDocument>()
                .await
                .map(Some)
                .map_err(|source| CouchDaoError::DecodeResponse {
                    path: doc_id.to_string(),
                    source,
                }),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn put_document(&self, doc_id: &str, document: &CouchRoundDocument) -> CouchResult<()> {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: response.status(),
            })
        }
    }

    async fn poll_changes(&self, since: &str) -> CouchResult<ChangesResponse> {
        const CHANGES: &str = "_changes";
        let query = [
            ("feed", "longpoll".to_string()),
            ("timeout", FEED_TIMEOUT_MS.to_string()),
            ("since", since.to_string()),
        ];

        let response = self
            .request(Method::GET, CHANGES)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: CHANGES.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: CHANGES.to_string(),
                status: response.status(),
            });
        }

        response
            .json::<ChangesResponse>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse {
                path: CHANGES.to_string(),
                source,
            })
    }
}

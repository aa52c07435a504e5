use std::{sync::Arc, time::Duration};

use futures::{StreamExt, future::BoxFuture};
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value};
use tracing::{debug, warn};

use crate::{
    dao::{
        board_store::{BoardChange, BoardStore, BoardSubscription},
        models::{BoardRecord, FieldPath, FieldValue, WriteTag},
        storage::StorageResult,
    },
    state::board::SessionId,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{ChangesResponse, CouchBoardDocument, DatabaseInfo, board_doc_id, seq_param},
};

const MAX_CONFLICT_RETRIES: u32 = 5;
/// Server-side long-poll timeout for the `_changes` feed.
const LONGPOLL_TIMEOUT_MS: u64 = 25_000;
const CHANGES_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Board store backed by one CouchDB document per session.
#[derive(Clone)]
pub struct CouchBoardStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchBoardStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.database_url(), path);
        self.authorized(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let url = self.database_url();
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: url.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorized(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::RequestSend {
                        path: url.clone(),
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

    async fn database_info(&self) -> CouchResult<DatabaseInfo> {
        let url = self.database_url();
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: url,
                status: response.status(),
            });
        }

        response
            .json::<DatabaseInfo>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse { path: url, source })
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
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
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(CouchDaoError::Conflict {
                path: doc_id.to_string(),
            }),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    /// Read-modify-write one field, retrying when another writer bumped the revision.
    async fn patch_field(
        &self,
        session: &SessionId,
        path: FieldPath,
        value: FieldValue,
        tag: WriteTag,
    ) -> CouchResult<()> {
        let doc_id = board_doc_id(session);
        for attempt in 0..MAX_CONFLICT_RETRIES {
            let Some(mut doc) = self.get_document::<CouchBoardDocument>(&doc_id).await? else {
                return Err(CouchDaoError::MissingDocument {
                    doc_id,
                    session: session.to_string(),
                });
            };
            doc.record.apply(path, value.clone())?;
            doc.origin = Some(tag);

            match self.put_document(&doc_id, &doc).await {
                Ok(()) => return Ok(()),
                Err(CouchDaoError::Conflict { .. }) => {
                    debug!(%session, %path, attempt, "revision conflict; retrying field write");
                }
                Err(err) => return Err(err),
            }
        }

        Err(CouchDaoError::ConflictRetriesExhausted {
            path: format!("{doc_id}/{path}"),
            attempts: MAX_CONFLICT_RETRIES,
        })
    }

    async fn overwrite(
        &self,
        session: &SessionId,
        record: BoardRecord,
        tag: WriteTag,
    ) -> CouchResult<()> {
        let doc_id = board_doc_id(session);
        for _ in 0..MAX_CONFLICT_RETRIES {
            let mut doc = CouchBoardDocument::new(session, record.clone(), tag);
            if let Some(existing) = self.get_document::<CouchBoardDocument>(&doc_id).await? {
                doc.rev = existing.rev;
            }
            match self.put_document(&doc_id, &doc).await {
                Ok(()) => return Ok(()),
                Err(CouchDaoError::Conflict { .. }) => continue,
                Err(err) => return Err(err),
            }
        }

        Err(CouchDaoError::ConflictRetriesExhausted {
            path: doc_id,
            attempts: MAX_CONFLICT_RETRIES,
        })
    }

    /// Wait for the next batch of changes to `doc_id` after `since`.
    async fn poll_changes(&self, doc_id: &str, since: &str) -> CouchResult<ChangesResponse> {
        const CHANGES: &str = "_changes";
        let query = [
            ("feed", "longpoll".to_string()),
            ("since", since.to_string()),
            ("filter", "_doc_ids".to_string()),
            ("doc_ids", format!("[\"{doc_id}\"]")),
            ("include_docs", "true".to_string()),
            ("timeout", LONGPOLL_TIMEOUT_MS.to_string()),
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

fn change_from_row(doc: Option<Value>, deleted: bool) -> CouchResult<BoardChange> {
    if deleted {
        return Ok(BoardChange {
            record: None,
            origin: None,
        });
    }
    let Some(doc) = doc else {
        return Ok(BoardChange {
            record: None,
            origin: None,
        });
    };
    let doc: CouchBoardDocument =
        from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
            path: "_changes".to_string(),
            source,
        })?;
    Ok(BoardChange {
        record: Some(doc.record),
        origin: doc.origin,
    })
}

impl BoardStore for CouchBoardStore {
    fn subscribe(
        &self,
        session: &SessionId,
    ) -> BoxFuture<'static, StorageResult<BoardSubscription>> {
        let store = self.clone();
        let session = session.clone();
        Box::pin(async move {
            let doc_id = board_doc_id(&session);
            // Take the sequence before reading so later changes are never missed.
            let mut since = seq_param(&store.database_info().await?.update_seq);
            let initial = store
                .get_document::<CouchBoardDocument>(&doc_id)
                .await?
                .map(|doc| doc.record);

            let changes = async_stream::stream! {
                loop {
                    match store.poll_changes(&doc_id, &since).await {
                        Ok(batch) => {
                            since = seq_param(&batch.last_seq);
                            for row in batch.results {
                                match change_from_row(row.doc, row.deleted) {
                                    Ok(change) => yield change,
                                    Err(err) => {
                                        warn!(%session, error = %err, "skipping bad change row");
                                    }
                                }
                            }
                        }
                        Err(err) => {
                            warn!(%session, error = %err, "CouchDB changes feed failed; retrying");
                            tokio::time::sleep(CHANGES_RETRY_DELAY).await;
                        }
                    }
                }
            }
            .boxed();

            Ok(BoardSubscription { initial, changes })
        })
    }

    fn write_field(
        &self,
        session: &SessionId,
        path: FieldPath,
        value: FieldValue,
        tag: WriteTag,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let session = session.clone();
        Box::pin(async move {
            store
                .patch_field(&session, path, value, tag)
                .await
                .map_err(Into::into)
        })
    }

    fn read_once(
        &self,
        session: &SessionId,
    ) -> BoxFuture<'static, StorageResult<Option<BoardRecord>>> {
        let store = self.clone();
        let doc_id = board_doc_id(session);
        Box::pin(async move {
            let maybe_doc = store.get_document::<CouchBoardDocument>(&doc_id).await?;
            Ok(maybe_doc.map(|doc| doc.record))
        })
    }

    fn replace_all(
        &self,
        session: &SessionId,
        record: BoardRecord,
        tag: WriteTag,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let session = session.clone();
        Box::pin(async move {
            store
                .overwrite(&session, record, tag)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.database_info().await?;
            Ok(())
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}

//! The reconciler: a ticking background pass that merges the local store
//! against the server using last-writer-wins on `update_dt`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::KeeperError;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::store::LocalStore;
use crate::transport::ServerTransport;

pub const DEFAULT_TICK: Duration = Duration::from_secs(10);

/// Cooperative cancellation flag: checked between server calls within a
/// pass, never interrupts a call already in flight.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Reconciler {
    transport: Arc<dyn ServerTransport>,
    tick: Duration,
}

impl Reconciler {
    pub fn new(transport: Arc<dyn ServerTransport>, tick: Duration) -> Self {
        Self { transport, tick }
    }

    /// Run forever on a fixed tick, attempting a pass whenever a token is
    /// held. Returns when `cancel` fires.
    pub async fn run(
        &self,
        store: Arc<Mutex<LocalStore>>,
        token: Arc<Mutex<Option<String>>>,
        cancel: CancelToken,
    ) {
        let mut interval = tokio::time::interval(self.tick);
        loop {
            interval.tick().await;
            if cancel.is_cancelled() {
                info!("reconciler stopped");
                return;
            }

            let current_token = token.lock().await.clone();
            let Some(current_token) = current_token else {
                continue;
            };

            debug!("running reconciliation pass");
            let mut store = store.lock().await;
            if let Err(e) = run_pass(&mut store, self.transport.as_ref(), &current_token, &cancel).await
            {
                warn!(error = %e, "reconciliation pass failed");
            }
        }
    }
}

/// One reconciliation pass. Server records are processed before
/// local-only pushes, so a record deleted on the server this same pass is
/// never resurrected by the local-only loop.
pub async fn run_pass(
    store: &mut LocalStore,
    transport: &dyn ServerTransport,
    token: &str,
    cancel: &CancelToken,
) -> Result<(), KeeperError> {
    let external = transport.get_metadata(token).await?;
    let local = store.get_all().to_vec();

    for e in &external {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let matching = local.iter().find(|l| l.external_id == e.id);
        let Some(l) = matching else {
            if !e.is_deleted {
                pull_new(store, transport, token, e.id).await?;
            }
            continue;
        };

        if l.is_deleted || e.is_deleted {
            if !l.is_deleted {
                store.del_data(l.local_id)?;
            }
            if !e.is_deleted {
                info!(
                    local_update_dt = l.update_dt,
                    remote_update_dt = e.update_dt,
                    external_id = e.id,
                    "tombstone on one side, deleting the other"
                );
                transport.delete_secret(token, e.id).await?;
            }
            continue;
        }

        if l.update_dt < e.update_dt {
            pull_existing(store, transport, token, l.local_id, e.id).await?;
        } else if l.update_dt > e.update_dt {
            push_existing(store, transport, token, l.local_id, e.id).await?;
        }
    }

    let local = store.get_all().to_vec();
    for l in &local {
        if cancel.is_cancelled() {
            return Ok(());
        }
        if l.external_id == 0 && !l.is_deleted {
            push_new(store, transport, token, l.local_id).await?;
        }
    }

    Ok(())
}

async fn pull_new(
    store: &mut LocalStore,
    transport: &dyn ServerTransport,
    token: &str,
    external_id: i64,
) -> Result<(), KeeperError> {
    let Some(remote) = transport.get_secret(token, external_id).await? else {
        return Ok(());
    };
    store.new_data(
        external_id,
        remote.update_dt,
        remote.title,
        remote.data_type,
        String::new(),
        &remote.data,
    )?;
    Ok(())
}

async fn pull_existing(
    store: &mut LocalStore,
    transport: &dyn ServerTransport,
    token: &str,
    local_id: i64,
    external_id: i64,
) -> Result<(), KeeperError> {
    let Some(remote) = transport.get_secret(token, external_id).await? else {
        return Ok(());
    };
    let mut meta = store.get(local_id)?.clone();
    meta.update_dt = remote.update_dt;
    meta.title = remote.title;
    store.edit_data(meta, &remote.data)
}

async fn push_existing(
    store: &mut LocalStore,
    transport: &dyn ServerTransport,
    token: &str,
    local_id: i64,
    external_id: i64,
) -> Result<(), KeeperError> {
    let (meta, data) = store.get_data(local_id)?;
    transport
        .update_secret(token, external_id, meta.title, meta.data_type, data, meta.update_dt)
        .await
}

async fn push_new(
    store: &mut LocalStore,
    transport: &dyn ServerTransport,
    token: &str,
    local_id: i64,
) -> Result<(), KeeperError> {
    let (meta, data) = store.get_data(local_id)?;
    let created = transport
        .create_secret(token, meta.title.clone(), meta.data_type, data, meta.update_dt)
        .await?;

    let mut updated = meta;
    updated.external_id = created.id;
    store.upd_meta(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ExternalMeta, ExternalSecret};
    use async_trait::async_trait;
    use common::types::DataType;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct FakeServer {
        records: StdMutex<HashMap<i64, ExternalSecret>>,
        next_id: StdMutex<i64>,
    }

    impl FakeServer {
        fn with(records: Vec<ExternalSecret>) -> Self {
            let next_id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
            let mut map = HashMap::new();
            for r in records {
                map.insert(r.id, r);
            }
            Self {
                records: StdMutex::new(map),
                next_id: StdMutex::new(next_id),
            }
        }
    }

    #[async_trait]
    impl ServerTransport for FakeServer {
        async fn register(&self, _login: &str, _password: &str) -> Result<(), KeeperError> {
            Ok(())
        }
        async fn login(&self, _login: &str, _password: &str) -> Result<String, KeeperError> {
            Ok("token".into())
        }
        async fn get_metadata(&self, _token: &str) -> Result<Vec<ExternalMeta>, KeeperError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .values()
                .map(|r| ExternalMeta {
                    id: r.id,
                    title: r.title.clone(),
                    data_type: r.data_type,
                    update_dt: r.update_dt,
                    is_deleted: false,
                })
                .collect())
        }
        async fn get_secret(
            &self,
            _token: &str,
            id: i64,
        ) -> Result<Option<ExternalSecret>, KeeperError> {
            Ok(self.records.lock().unwrap().get(&id).cloned())
        }
        async fn create_secret(
            &self,
            _token: &str,
            title: String,
            data_type: DataType,
            data: Vec<u8>,
            update_dt: i64,
        ) -> Result<ExternalMeta, KeeperError> {
            let mut next_id = self.next_id.lock().unwrap();
            let id = *next_id;
            *next_id += 1;
            self.records.lock().unwrap().insert(
                id,
                ExternalSecret {
                    id,
                    title: title.clone(),
                    data_type,
                    data,
                    update_dt,
                },
            );
            Ok(ExternalMeta {
                id,
                title,
                data_type,
                update_dt,
                is_deleted: false,
            })
        }
        async fn update_secret(
            &self,
            _token: &str,
            id: i64,
            title: String,
            data_type: DataType,
            data: Vec<u8>,
            update_dt: i64,
        ) -> Result<(), KeeperError> {
            self.records.lock().unwrap().insert(
                id,
                ExternalSecret {
                    id,
                    title,
                    data_type,
                    data,
                    update_dt,
                },
            );
            Ok(())
        }
        async fn delete_secret(&self, _token: &str, id: i64) -> Result<(), KeeperError> {
            self.records.lock().unwrap().remove(&id);
            Ok(())
        }
    }

    fn store(dir: &std::path::Path) -> LocalStore {
        let mut s = LocalStore::new(dir.join("alice-store"));
        s.open("alice").unwrap();
        s
    }

    #[tokio::test]
    async fn new_local_record_is_pushed_to_an_empty_server() {
        let tmp = tempdir().unwrap();
        let mut s = store(tmp.path());
        s.new_data(0, 100, "visa".into(), DataType::Card, String::new(), b"payload")
            .unwrap();

        let server = FakeServer::default();
        let cancel = CancelToken::new();
        run_pass(&mut s, &server, "token", &cancel).await.unwrap();

        let local = s.get_all();
        assert_eq!(local.len(), 1);
        assert_ne!(local[0].external_id, 0);

        let remote = server.get_metadata("token").await.unwrap();
        assert_eq!(remote.len(), 1);
        assert_eq!(remote[0].update_dt, 100);
    }

    #[tokio::test]
    async fn server_update_pulls_into_local() {
        let tmp = tempdir().unwrap();
        let mut s = store(tmp.path());
        let meta = s
            .new_data(0, 100, "visa".into(), DataType::Card, String::new(), b"payload")
            .unwrap();

        let server = FakeServer::default();
        let cancel = CancelToken::new();
        run_pass(&mut s, &server, "token", &cancel).await.unwrap();
        let external_id = s.get(meta.local_id).unwrap().external_id;

        server
            .update_secret("token", external_id, "visa-renamed".into(), DataType::Card, b"new".to_vec(), 200)
            .await
            .unwrap();

        run_pass(&mut s, &server, "token", &cancel).await.unwrap();

        let refreshed = s.get(meta.local_id).unwrap();
        assert_eq!(refreshed.title, "visa-renamed");
        assert_eq!(refreshed.update_dt, 200);
        let (_, data) = s.get_data(meta.local_id).unwrap();
        assert_eq!(data, b"new");
    }

    #[tokio::test]
    async fn local_update_pushes_to_server() {
        let tmp = tempdir().unwrap();
        let mut s = store(tmp.path());
        let meta = s
            .new_data(0, 100, "visa".into(), DataType::Card, String::new(), b"payload")
            .unwrap();

        let server = FakeServer::default();
        let cancel = CancelToken::new();
        run_pass(&mut s, &server, "token", &cancel).await.unwrap();
        let external_id = s.get(meta.local_id).unwrap().external_id;

        let mut updated = s.get(meta.local_id).unwrap().clone();
        updated.update_dt = 300;
        s.edit_data(updated, b"local bytes").unwrap();

        run_pass(&mut s, &server, "token", &cancel).await.unwrap();

        let remote = server.get_secret("token", external_id).await.unwrap().unwrap();
        assert_eq!(remote.update_dt, 300);
        assert_eq!(remote.data, b"local bytes");
    }

    #[tokio::test]
    async fn local_delete_propagates_to_server() {
        let tmp = tempdir().unwrap();
        let mut s = store(tmp.path());
        let meta = s
            .new_data(0, 100, "visa".into(), DataType::Card, String::new(), b"payload")
            .unwrap();

        let server = FakeServer::default();
        let cancel = CancelToken::new();
        run_pass(&mut s, &server, "token", &cancel).await.unwrap();
        let external_id = s.get(meta.local_id).unwrap().external_id;

        s.del_data(meta.local_id).unwrap();
        run_pass(&mut s, &server, "token", &cancel).await.unwrap();

        assert!(server.get_secret("token", external_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reconciliation_is_idempotent_once_settled() {
        let tmp = tempdir().unwrap();
        let mut s = store(tmp.path());
        s.new_data(0, 100, "visa".into(), DataType::Card, String::new(), b"payload")
            .unwrap();

        let server = FakeServer::default();
        let cancel = CancelToken::new();
        run_pass(&mut s, &server, "token", &cancel).await.unwrap();
        let before = s.get_all().to_vec();

        run_pass(&mut s, &server, "token", &cancel).await.unwrap();
        let after = s.get_all().to_vec();

        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn cancelled_pass_stops_without_error() {
        let tmp = tempdir().unwrap();
        let mut s = store(tmp.path());
        s.new_data(0, 100, "visa".into(), DataType::Card, String::new(), b"payload")
            .unwrap();

        let server = FakeServer::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        run_pass(&mut s, &server, "token", &cancel).await.unwrap();

        // Nothing was pushed: the external-loop bailed before reaching
        // the local-only push loop.
        assert!(server.get_metadata("token").await.unwrap().is_empty());
    }
}

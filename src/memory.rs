//! In-process document store used by the demos and tests.

use crate::backend::{Address, Connection, Connector, Filter, InsertOutcome, Record, SharedConnection};
use crate::error::BackendError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

type Collections = HashMap<String, Vec<(u64, Record)>>;

#[derive(Debug, Default)]
struct Store {
    datasets: Mutex<HashMap<String, Collections>>,
    next_key: AtomicU64,
    connects: AtomicUsize,
    closes: AtomicUsize,
    inserts: AtomicUsize,
    finds: AtomicUsize,
}

impl Store {
    fn datasets(&self) -> MutexGuard<'_, HashMap<String, Collections>> {
        self.datasets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Connector for an in-memory store.
///
/// Only the configured hosts are reachable (`localhost` and `127.0.0.1` by
/// default). Records with the same `id` may be inserted any number of times.
///
/// # Examples
///
/// ```
/// use tsunagi::{Address, Connector, Filter, MemoryConnector, Record};
///
/// # tokio_test::block_on(async {
/// let connector = MemoryConnector::new();
/// let conn = connector.connect(&Address::default()).await?;
///
/// let outcome = conn.insert("employees", Record::new(1, "A. Callback")).await?;
/// let found = conn.find("employees", Filter::inserted(&outcome)).await?;
/// assert_eq!(found, vec![Record::new(1, "A. Callback")]);
///
/// conn.close().await?;
/// assert_eq!(connector.closes(), 1);
/// # Ok::<(), tsunagi::BackendError>(())
/// # });
/// ```
#[derive(Debug)]
pub struct MemoryConnector {
    store: Arc<Store>,
    reachable: HashSet<String>,
    insert_rejection: Option<String>,
    query_rejection: Option<String>,
    query_delay: Option<Duration>,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self {
            store: Arc::new(Store::default()),
            reachable: ["localhost", "127.0.0.1"]
                .into_iter()
                .map(String::from)
                .collect(),
            insert_rejection: None,
            query_rejection: None,
            query_delay: None,
        }
    }

    /// Makes `host` reachable in addition to the defaults.
    pub fn with_reachable_host(mut self, host: impl Into<String>) -> Self {
        self.reachable.insert(host.into());
        self
    }

    /// Makes every host unreachable.
    pub fn unreachable(mut self) -> Self {
        self.reachable.clear();
        self
    }

    /// Rejects every insert with `message`.
    pub fn reject_inserts(mut self, message: impl Into<String>) -> Self {
        self.insert_rejection = Some(message.into());
        self
    }

    /// Rejects every query with `message`.
    pub fn reject_queries(mut self, message: impl Into<String>) -> Self {
        self.query_rejection = Some(message.into());
        self
    }

    /// Holds every query for `delay` before it reaches the store.
    pub fn delay_queries(mut self, delay: Duration) -> Self {
        self.query_delay = Some(delay);
        self
    }

    /// Number of connections opened so far.
    pub fn connects(&self) -> usize {
        self.store.connects.load(Ordering::SeqCst)
    }

    /// Number of connections closed so far.
    pub fn closes(&self) -> usize {
        self.store.closes.load(Ordering::SeqCst)
    }

    /// Number of insert calls that reached the store, rejected or not.
    pub fn inserts(&self) -> usize {
        self.store.inserts.load(Ordering::SeqCst)
    }

    /// Number of find calls that reached the store, rejected or not.
    pub fn finds(&self) -> usize {
        self.store.finds.load(Ordering::SeqCst)
    }

    /// Snapshot of a collection in insertion order.
    pub fn records(&self, dataset: &str, collection: &str) -> Vec<Record> {
        self.store
            .datasets()
            .get(dataset)
            .and_then(|collections| collections.get(collection))
            .map(|docs| docs.iter().map(|(_, record)| record.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, address: &Address) -> Result<SharedConnection, BackendError> {
        tokio::task::yield_now().await;
        if !self.reachable.contains(address.host()) {
            return Err(BackendError::Unreachable {
                host: address.host().to_string(),
            });
        }
        self.store.connects.fetch_add(1, Ordering::SeqCst);
        debug!("Opened in-memory connection to {}", address);

        Ok(Arc::new(MemoryConnection {
            store: Arc::clone(&self.store),
            dataset: address.dataset().to_string(),
            insert_rejection: self.insert_rejection.clone(),
            query_rejection: self.query_rejection.clone(),
            query_delay: self.query_delay,
            closed: AtomicBool::new(false),
        }))
    }
}

#[derive(Debug)]
struct MemoryConnection {
    store: Arc<Store>,
    dataset: String,
    insert_rejection: Option<String>,
    query_rejection: Option<String>,
    query_delay: Option<Duration>,
    closed: AtomicBool,
}

impl MemoryConnection {
    fn ensure_open(&self) -> Result<(), BackendError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(BackendError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn insert(
        &self,
        collection: &str,
        record: Record,
    ) -> Result<InsertOutcome, BackendError> {
        tokio::task::yield_now().await;
        self.ensure_open()?;
        self.store.inserts.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.insert_rejection {
            return Err(BackendError::Rejected(message.clone()));
        }

        let inserted_id = self.store.next_key.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = InsertOutcome {
            inserted_id,
            id: record.id,
        };
        self.store
            .datasets()
            .entry(self.dataset.clone())
            .or_default()
            .entry(collection.to_string())
            .or_default()
            .push((inserted_id, record));
        Ok(outcome)
    }

    async fn find(&self, collection: &str, filter: Filter) -> Result<Vec<Record>, BackendError> {
        match self.query_delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
        self.ensure_open()?;
        self.store.finds.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.query_rejection {
            return Err(BackendError::Rejected(message.clone()));
        }

        let datasets = self.store.datasets();
        let found = datasets
            .get(&self.dataset)
            .and_then(|collections| collections.get(collection))
            .map(|docs| {
                docs.iter()
                    .filter(|(_, record)| filter.matches(record))
                    .map(|(_, record)| record.clone())
                    .collect()
            })
            .unwrap_or_default();
        Ok(found)
    }

    async fn close(&self) -> Result<(), BackendError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(BackendError::Closed);
        }
        self.store.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(raw: &str) -> Address {
        Address::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let connector = MemoryConnector::new();
        let result = connector.connect(&address("mongodb://nowhere/playground")).await;
        assert_eq!(
            result.err(),
            Some(BackendError::Unreachable {
                host: "nowhere".to_string()
            })
        );
        assert_eq!(connector.connects(), 0);
    }

    #[tokio::test]
    async fn test_extra_reachable_host() {
        let connector = MemoryConnector::new().with_reachable_host("db");
        assert!(connector.connect(&address("mongodb://db/hr")).await.is_ok());

        let connector = MemoryConnector::new().unreachable();
        assert!(connector.connect(&Address::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_insert_then_find_by_id() {
        let connector = MemoryConnector::new();
        let conn = connector.connect(&Address::default()).await.unwrap();

        let first = conn.insert("employees", Record::new(1, "A")).await.unwrap();
        let second = conn.insert("employees", Record::new(2, "B")).await.unwrap();
        assert!(second.inserted_id > first.inserted_id);

        let found = conn.find("employees", Filter::Id(2)).await.unwrap();
        assert_eq!(found, vec![Record::new(2, "B")]);

        let all = conn.find("employees", Filter::All).await.unwrap();
        assert_eq!(all.len(), 2);

        let empty = conn.find("managers", Filter::All).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        let connector = MemoryConnector::new();
        let conn = connector.connect(&Address::default()).await.unwrap();

        conn.insert("employees", Record::new(1, "A")).await.unwrap();
        conn.insert("employees", Record::new(1, "A")).await.unwrap();

        let found = conn.find("employees", Filter::Id(1)).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_datasets_are_isolated() {
        let connector = MemoryConnector::new();
        let playground = connector.connect(&Address::default()).await.unwrap();
        let other = connector
            .connect(&address("mongodb://localhost/other"))
            .await
            .unwrap();

        playground.insert("employees", Record::new(1, "A")).await.unwrap();
        assert!(other.find("employees", Filter::All).await.unwrap().is_empty());
        assert_eq!(connector.records("playground", "employees").len(), 1);
    }

    #[tokio::test]
    async fn test_rejections() {
        let connector = MemoryConnector::new()
            .reject_inserts("duplicate key")
            .reject_queries("not authorized");
        let conn = connector.connect(&Address::default()).await.unwrap();

        let insert = conn.insert("employees", Record::new(1, "A")).await;
        assert_eq!(
            insert.err(),
            Some(BackendError::Rejected("duplicate key".to_string()))
        );
        let find = conn.find("employees", Filter::All).await;
        assert_eq!(
            find.err(),
            Some(BackendError::Rejected("not authorized".to_string()))
        );
        assert_eq!(connector.inserts(), 1);
        assert_eq!(connector.finds(), 1);
    }

    #[tokio::test]
    async fn test_closed_connection() {
        let connector = MemoryConnector::new();
        let conn = connector.connect(&Address::default()).await.unwrap();

        conn.close().await.unwrap();
        assert_eq!(conn.close().await, Err(BackendError::Closed));
        assert_eq!(
            conn.insert("employees", Record::new(1, "A")).await.err(),
            Some(BackendError::Closed)
        );
        assert_eq!(connector.closes(), 1);
    }
}

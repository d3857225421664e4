//! Shard store: paginated, capacity-bounded lists kept in ledger records.
//!
//! A collection is a chain of pages `1, 2, 3, …` discovered by probing until
//! the first missing record. Each page holds at most `capacity` entries in its
//! payload field. Pages are never compacted: removals leave under-full pages
//! that later appends refill.
//!
//! Every operation is a sequence of single-record reads followed by at most
//! one single-record write. Nothing here is atomic across records, and a
//! concurrent writer to the same page can lose an update.

use dist_store::{Record, RecordStore};
use dist_types::{Clock, Timestamp};
use futures_util::{pin_mut, stream, Stream, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{Collection, RegistryError};

/// Default number of entries per page.
pub const DEFAULT_CAPACITY: usize = 50;

/// Hard bound on probing. A collection this long means the store is not
/// reporting missing pages.
pub const MAX_PAGES: usize = 10_000;

/// Anything that can live in a shard page.
pub trait ShardEntry: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> ShardEntry for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// One decoded page.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    /// 1-based page index.
    pub index: usize,
    pub entries: Vec<T>,
    /// Array items that did not decode as `T`. They are written back
    /// unchanged whenever the page is rewritten.
    pub unreadable: Vec<Value>,
    /// Whether the record exists in the ledger.
    pub exists: bool,
    /// The payload is not an array at all; `entries` is empty and the page
    /// must not be rewritten.
    pub corrupt: bool,
}

impl<T> Page<T> {
    fn vacant(index: usize) -> Self {
        Self {
            index,
            entries: Vec::new(),
            unreadable: Vec::new(),
            exists: false,
            corrupt: false,
        }
    }

    /// Number of slots taken, readable or not.
    pub fn len(&self) -> usize {
        self.entries.len() + self.unreadable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Paginated-list access to the ledger, shared by every collection.
pub struct ShardStore<S> {
    ledger: Arc<S>,
    root: String,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl<S: RecordStore> ShardStore<S> {
    /// `root` is the namespace that owns the pages (`distordia`).
    pub fn new(
        ledger: Arc<S>,
        root: impl Into<String>,
        capacity: usize,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RegistryError> {
        if capacity == 0 {
            return Err(RegistryError::InvalidCapacity);
        }
        Ok(Self {
            ledger,
            root: root.into(),
            capacity,
            clock,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn ledger(&self) -> &Arc<S> {
        &self.ledger
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Full ledger name of a page of `collection`.
    pub fn page_name(&self, collection: Collection, index: usize) -> String {
        collection.page_name(&self.root, index)
    }

    /// Read and decode one page. `Ok(None)` if the record is absent.
    ///
    /// A payload that is not an array yields an empty page flagged `corrupt`
    /// instead of an error, so one bad page never blocks the collection.
    /// Single items that do not decode are set aside in `unreadable`.
    pub async fn read_page<T: ShardEntry>(
        &self,
        collection: Collection,
        index: usize,
    ) -> Result<Option<Page<T>>, RegistryError> {
        let name = self.page_name(collection, index);
        let Some(record) = self.ledger.get_record(&name).await? else {
            return Ok(None);
        };

        let page = match decode_payload(record.get(collection.payload_field())) {
            Ok(items) => {
                let mut entries = Vec::with_capacity(items.len());
                let mut unreadable = Vec::new();
                for item in items {
                    match serde_json::from_value::<T>(item.clone()) {
                        Ok(entry) => entries.push(entry),
                        Err(e) => {
                            warn!(page = %name, error = %e, "skipping malformed shard entry");
                            unreadable.push(item);
                        }
                    }
                }
                Page {
                    index,
                    entries,
                    unreadable,
                    exists: true,
                    corrupt: false,
                }
            }
            Err(e) => {
                warn!(page = %name, error = %e, "malformed shard payload, treating page as empty");
                Page {
                    index,
                    entries: Vec::new(),
                    unreadable: Vec::new(),
                    exists: true,
                    corrupt: true,
                }
            }
        };
        Ok(Some(page))
    }

    /// Lazily probe pages from index 1 until the first missing one.
    pub fn pages<T: ShardEntry>(
        &self,
        collection: Collection,
    ) -> impl Stream<Item = Result<Page<T>, RegistryError>> + '_ {
        stream::try_unfold(1usize, move |index| async move {
            if index > MAX_PAGES {
                return Err(RegistryError::TooManyPages {
                    collection: collection.to_string(),
                    limit: MAX_PAGES,
                });
            }
            let page = self.read_page::<T>(collection, index).await?;
            Ok::<_, RegistryError>(page.map(|p| (p, index + 1)))
        })
    }

    /// Every entry of `collection`, in page order.
    pub async fn scan_all<T: ShardEntry>(
        &self,
        collection: Collection,
    ) -> Result<Vec<T>, RegistryError> {
        let pages = self.pages::<T>(collection);
        pin_mut!(pages);

        let mut all = Vec::new();
        while let Some(page) = pages.try_next().await? {
            all.extend(page.entries);
        }
        Ok(all)
    }

    /// First page with room for another entry, or the first missing page
    /// (empty, `exists == false`) when every existing page is full.
    /// Corrupt pages are never chosen.
    pub async fn find_append_target<T: ShardEntry>(
        &self,
        collection: Collection,
    ) -> Result<Page<T>, RegistryError> {
        let pages = self.pages::<T>(collection);
        pin_mut!(pages);

        let mut next_index = 1;
        while let Some(page) = pages.try_next().await? {
            if !page.corrupt && page.len() < self.capacity {
                return Ok(page);
            }
            next_index = page.index + 1;
        }
        Ok(Page::vacant(next_index))
    }

    /// Append `entry` to the first page with room, creating a page if needed.
    /// Returns the index of the page written.
    pub async fn append<T: ShardEntry>(
        &self,
        collection: Collection,
        entry: T,
    ) -> Result<usize, RegistryError> {
        let mut target = self.find_append_target::<T>(collection).await?;
        target.entries.push(entry);
        self.write_page(collection, &target).await?;
        debug!(
            collection = %collection,
            page = target.index,
            entries = target.entries.len(),
            "appended shard entry"
        );
        Ok(target.index)
    }

    /// Remove matching entries from the first page that has any, rewriting
    /// only that page. Later pages are not examined once a removal happened.
    pub async fn remove_where<T, F>(
        &self,
        collection: Collection,
        predicate: F,
    ) -> Result<bool, RegistryError>
    where
        T: ShardEntry,
        F: Fn(&T) -> bool + Send + Sync,
    {
        let pages = self.pages::<T>(collection);
        pin_mut!(pages);

        while let Some(mut page) = pages.try_next().await? {
            let before = page.entries.len();
            page.entries.retain(|e| !predicate(e));
            if page.entries.len() < before {
                self.write_page(collection, &page).await?;
                debug!(
                    collection = %collection,
                    page = page.index,
                    removed = before - page.entries.len(),
                    "removed shard entries"
                );
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Write a page's full entry list: create the record if it does not
    /// exist yet, otherwise update it in place.
    async fn write_page<T: ShardEntry>(
        &self,
        collection: Collection,
        page: &Page<T>,
    ) -> Result<(), RegistryError> {
        let name = self.page_name(collection, page.index);
        let mut items = Vec::with_capacity(page.len());
        for entry in &page.entries {
            items.push(serde_json::to_value(entry)?);
        }
        items.extend(page.unreadable.iter().cloned());

        let mut fields: Record = collection.header(self.now());
        fields.insert(collection.payload_field(), serde_json::to_string(&items)?);

        if page.exists {
            self.ledger.update_record(&name, &fields).await?;
        } else {
            self.ledger.create_record(&name, &fields).await?;
        }
        Ok(())
    }
}

/// Decode a payload field into its raw array items. The field normally holds
/// a JSON-encoded string, but pages written by other tools may carry the
/// array inline. A missing field is an empty page.
fn decode_payload(value: Option<&Value>) -> Result<Vec<Value>, String> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(encoded)) => match serde_json::from_str(encoded) {
            Ok(Value::Array(items)) => Ok(items),
            Ok(other) => Err(format!("payload is not an array: {other}")),
            Err(e) => Err(e.to_string()),
        },
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(other) => Err(format!("unexpected payload type: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dist_nullables::{NullClock, NullLedger};
    use serde::Deserialize;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Item {
        n: u32,
    }

    const COLL: Collection = Collection::Disputes;

    fn store(capacity: usize) -> (Arc<NullLedger>, ShardStore<NullLedger>) {
        let ledger = Arc::new(NullLedger::new());
        let shards =
            ShardStore::new(ledger.clone(), "root", capacity, Arc::new(NullClock::default()))
                .unwrap();
        (ledger, shards)
    }

    fn page_items(ledger: &NullLedger, index: usize) -> Vec<Item> {
        let record = ledger.record(&format!("root:disputes-{index}")).unwrap();
        serde_json::from_str(record.get_str("disputes").unwrap()).unwrap()
    }

    #[test]
    fn zero_capacity_rejected() {
        let ledger = Arc::new(NullLedger::new());
        let result = ShardStore::new(ledger, "root", 0, Arc::new(NullClock::default()));
        assert!(matches!(result, Err(RegistryError::InvalidCapacity)));
    }

    #[tokio::test]
    async fn empty_collection_scans_empty() {
        let (_, shards) = store(3);
        assert!(shards.scan_all::<Item>(COLL).await.unwrap().is_empty());
        let target = shards.find_append_target::<Item>(COLL).await.unwrap();
        assert_eq!(target.index, 1);
        assert!(!target.exists);
    }

    #[tokio::test]
    async fn capacity_plus_one_rolls_over_to_second_page() {
        let (ledger, shards) = store(3);
        for n in 0..4 {
            shards.append(COLL, Item { n }).await.unwrap();
        }
        assert_eq!(page_items(&ledger, 1).len(), 3);
        assert_eq!(page_items(&ledger, 2), vec![Item { n: 3 }]);
        assert!(ledger.record("root:disputes-3").is_none());

        let all: Vec<Item> = shards.scan_all(COLL).await.unwrap();
        assert_eq!(all.iter().map(|i| i.n).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn removal_frees_room_on_earlier_page() {
        let (ledger, shards) = store(2);
        for n in 0..4 {
            shards.append(COLL, Item { n }).await.unwrap();
        }
        let removed = shards
            .remove_where(COLL, |i: &Item| i.n == 0)
            .await
            .unwrap();
        assert!(removed);
        assert_eq!(page_items(&ledger, 1), vec![Item { n: 1 }]);

        let page = shards.append(COLL, Item { n: 9 }).await.unwrap();
        assert_eq!(page, 1);
        assert_eq!(page_items(&ledger, 1), vec![Item { n: 1 }, Item { n: 9 }]);
    }

    #[tokio::test]
    async fn remove_stops_after_first_matching_page() {
        let (ledger, shards) = store(1);
        shards.append(COLL, Item { n: 7 }).await.unwrap();
        shards.append(COLL, Item { n: 7 }).await.unwrap();

        assert!(shards.remove_where(COLL, |i: &Item| i.n == 7).await.unwrap());
        assert!(page_items(&ledger, 1).is_empty());
        assert_eq!(page_items(&ledger, 2), vec![Item { n: 7 }]);
    }

    #[tokio::test]
    async fn remove_of_absent_entry_writes_nothing() {
        let (ledger, shards) = store(2);
        shards.append(COLL, Item { n: 1 }).await.unwrap();
        let writes_before = ledger.writes().len();
        assert!(!shards.remove_where(COLL, |i: &Item| i.n == 5).await.unwrap());
        assert_eq!(ledger.writes().len(), writes_before);
    }

    #[tokio::test]
    async fn corrupt_page_is_skipped_and_never_rewritten() {
        let (ledger, shards) = store(2);
        ledger.insert_record(
            "root:disputes-1",
            Record::new().with("disputes", "{not json"),
        );
        ledger.insert_record(
            "root:disputes-2",
            Record::new().with("disputes", r#"[{"n": 4}]"#),
        );

        let all: Vec<Item> = shards.scan_all(COLL).await.unwrap();
        assert_eq!(all, vec![Item { n: 4 }]);

        assert_eq!(shards.append(COLL, Item { n: 5 }).await.unwrap(), 2);
        assert_eq!(
            ledger.record("root:disputes-1").unwrap().get_str("disputes"),
            Some("{not json")
        );
        assert_eq!(page_items(&ledger, 2), vec![Item { n: 4 }, Item { n: 5 }]);
    }

    #[tokio::test]
    async fn malformed_entry_does_not_hide_its_page() {
        let (ledger, shards) = store(3);
        ledger.insert_record(
            "root:disputes-1",
            Record::new().with("disputes", r#"[{"n": 1}, {"n": "seven"}]"#),
        );

        let all: Vec<Item> = shards.scan_all(COLL).await.unwrap();
        assert_eq!(all, vec![Item { n: 1 }]);

        // The unreadable item keeps its slot and survives the rewrite.
        assert_eq!(shards.append(COLL, Item { n: 2 }).await.unwrap(), 1);
        let raw: Vec<Value> = serde_json::from_str(
            ledger.record("root:disputes-1").unwrap().get_str("disputes").unwrap(),
        )
        .unwrap();
        assert_eq!(
            raw,
            vec![
                serde_json::json!({"n": 1}),
                serde_json::json!({"n": 2}),
                serde_json::json!({"n": "seven"}),
            ]
        );
        assert_eq!(shards.append(COLL, Item { n: 3 }).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn non_array_payload_is_corrupt() {
        let (ledger, shards) = store(3);
        ledger.insert_record(
            "root:disputes-1",
            Record::new().with("disputes", r#"{"n": 1}"#),
        );
        let page = shards.read_page::<Item>(COLL, 1).await.unwrap().unwrap();
        assert!(page.corrupt);
        assert_eq!(shards.append(COLL, Item { n: 2 }).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn inline_array_payload_is_accepted() {
        let (ledger, shards) = store(5);
        ledger.insert_record(
            "root:disputes-1",
            Record::new().with("disputes", serde_json::json!([{"n": 1}, {"n": 2}])),
        );
        let all: Vec<Item> = shards.scan_all(COLL).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn written_pages_carry_header() {
        let (ledger, shards) = store(5);
        shards
            .append(Collection::Verified(dist_types::Tier::L2), Item { n: 1 })
            .await
            .unwrap();
        let record = ledger.record("root:L2-verified-1").unwrap();
        assert_eq!(record.type_tag(), Some("verification-registry"));
        assert_eq!(record.get_str("tier"), Some("L2"));
        assert!(record.get_str("updated").unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn read_failure_propagates() {
        let (ledger, shards) = store(5);
        ledger.fail_on("root:disputes-1");
        assert!(matches!(
            shards.scan_all::<Item>(COLL).await,
            Err(RegistryError::Store(_))
        ));
    }
}

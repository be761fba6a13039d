use super::{BatchOp, Result, Storage, StorageError};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Generate a 24-hex-character id: 4 bytes of unix seconds then 8 random bytes
pub fn new_object_id() -> String {
    let mut bytes = [0u8; 12];
    let secs = Utc::now().timestamp().max(0) as u32;
    bytes[..4].copy_from_slice(&secs.to_be_bytes());
    rand::thread_rng().fill_bytes(&mut bytes[4..]);
    hex::encode(bytes)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timestamps {
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for Timestamps {
    fn default() -> Self {
        Self::now()
    }
}

/// A record stored in a [`Collection`]
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    fn timestamps_mut(&mut self) -> &mut Timestamps;

    /// Unique fields and their current values. `None` values are not indexed.
    fn unique_fields(&self) -> Vec<(&'static str, Option<String>)> {
        Vec::new()
    }
}

/// Typed view over one collection of JSON documents
pub struct Collection<T> {
    storage: Arc<dyn Storage>,
    write_lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> Collection<T> {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    fn doc_prefix() -> Vec<u8> {
        format!("{}/doc/", T::COLLECTION).into_bytes()
    }

    fn doc_key(id: &str) -> Vec<u8> {
        format!("{}/doc/{}", T::COLLECTION, id).into_bytes()
    }

    fn index_key(field: &str, value: &str) -> Vec<u8> {
        format!("{}/idx/{}/{}", T::COLLECTION, field, value).into_bytes()
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>> {
        match self.storage.get(&Self::doc_key(id)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn all(&self) -> Result<Vec<T>> {
        self.storage
            .scan_prefix(&Self::doc_prefix())
            .await?
            .into_iter()
            .map(|(_, bytes)| serde_json::from_slice(&bytes).map_err(StorageError::from))
            .collect()
    }

    pub async fn find<F>(&self, predicate: F) -> Result<Vec<T>>
    where
        F: Fn(&T) -> bool,
    {
        Ok(self.all().await?.into_iter().filter(|doc| predicate(doc)).collect())
    }

    pub async fn find_one<F>(&self, predicate: F) -> Result<Option<T>>
    where
        F: Fn(&T) -> bool,
    {
        Ok(self.all().await?.into_iter().find(|doc| predicate(doc)))
    }

    pub async fn count<F>(&self, predicate: F) -> Result<usize>
    where
        F: Fn(&T) -> bool,
    {
        Ok(self.all().await?.iter().filter(|doc| predicate(doc)).count())
    }

    pub async fn insert(&self, doc: T) -> Result<T> {
        let _guard = self.write_lock.lock().await;
        self.insert_unlocked(&doc).await?;
        Ok(doc)
    }

    pub async fn insert_many(&self, docs: Vec<T>) -> Result<Vec<T>> {
        let _guard = self.write_lock.lock().await;
        for doc in &docs {
            self.insert_unlocked(doc).await?;
        }
        Ok(docs)
    }

    /// Build and insert a document while no other writer can touch the
    /// collection. `build` sees every current document, so checks made there
    /// still hold when the insert lands.
    pub async fn insert_with<F, E>(&self, build: F) -> std::result::Result<T, E>
    where
        F: FnOnce(Vec<T>) -> std::result::Result<T, E>,
        E: From<StorageError>,
    {
        let _guard = self.write_lock.lock().await;
        let existing = self.all().await?;
        let doc = build(existing)?;
        self.insert_unlocked(&doc).await?;
        Ok(doc)
    }

    async fn insert_unlocked(&self, doc: &T) -> Result<()> {
        let mut ops = Vec::new();
        for (field, value) in doc.unique_fields() {
            let Some(value) = value else { continue };
            let key = Self::index_key(field, &value);
            if self.storage.exists(&key).await? {
                return Err(StorageError::Duplicate(field.to_string()));
            }
            ops.push(BatchOp::Put(key, doc.id().as_bytes().to_vec()));
        }
        ops.push(BatchOp::Put(Self::doc_key(doc.id()), serde_json::to_vec(doc)?));
        self.storage.write_batch(ops).await
    }

    /// Replace a stored document, refreshing `updatedAt` and moving any unique
    /// index entries whose values changed
    pub async fn update(&self, doc: T) -> Result<T> {
        let _guard = self.write_lock.lock().await;
        let previous = self
            .get(doc.id())
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", T::COLLECTION, doc.id())))?;
        self.replace_unlocked(&previous, doc).await
    }

    /// Read-modify-write of one document under the collection lock. `apply`
    /// works on the stored copy, so concurrent changes to other fields are
    /// not overwritten. Returns `None` when no document has this id.
    pub async fn modify<F, E>(&self, id: &str, apply: F) -> std::result::Result<Option<T>, E>
    where
        F: FnOnce(&mut T) -> std::result::Result<(), E>,
        E: From<StorageError>,
    {
        let _guard = self.write_lock.lock().await;
        let Some(previous) = self.get(id).await? else {
            return Ok(None);
        };
        let mut doc = previous.clone();
        apply(&mut doc)?;
        Ok(Some(self.replace_unlocked(&previous, doc).await?))
    }

    /// Update counterpart of [`Collection::insert_with`]: `apply` sees the
    /// stored document and every other document of the collection, and no
    /// other writer runs until the result is stored.
    pub async fn update_with<F, E>(&self, id: &str, apply: F) -> std::result::Result<Option<T>, E>
    where
        F: FnOnce(&mut T, &[T]) -> std::result::Result<(), E>,
        E: From<StorageError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut others = self.all().await?;
        let Some(index) = others.iter().position(|doc| doc.id() == id) else {
            return Ok(None);
        };
        let previous = others.swap_remove(index);
        let mut doc = previous.clone();
        apply(&mut doc, &others)?;
        Ok(Some(self.replace_unlocked(&previous, doc).await?))
    }

    async fn replace_unlocked(&self, previous: &T, mut doc: T) -> Result<T> {
        doc.timestamps_mut().updated_at = Utc::now();

        let old_fields = previous.unique_fields();
        let mut ops = Vec::new();
        for (field, value) in doc.unique_fields() {
            let old_value = old_fields
                .iter()
                .find(|(name, _)| *name == field)
                .and_then(|(_, v)| v.clone());
            if old_value == value {
                continue;
            }
            if let Some(value) = &value {
                let key = Self::index_key(field, value);
                if let Some(owner) = self.storage.get(&key).await? {
                    if owner != doc.id().as_bytes() {
                        return Err(StorageError::Duplicate(field.to_string()));
                    }
                }
                ops.push(BatchOp::Put(key, doc.id().as_bytes().to_vec()));
            }
            if let Some(old_value) = old_value {
                ops.push(BatchOp::Delete(Self::index_key(field, &old_value)));
            }
        }
        ops.push(BatchOp::Put(Self::doc_key(doc.id()), serde_json::to_vec(&doc)?));
        self.storage.write_batch(ops).await?;
        Ok(doc)
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let Some(doc) = self.get(id).await? else {
            return Ok(false);
        };
        let mut ops: Vec<BatchOp> = doc
            .unique_fields()
            .into_iter()
            .filter_map(|(field, value)| value.map(|v| BatchOp::Delete(Self::index_key(field, &v))))
            .collect();
        ops.push(BatchOp::Delete(Self::doc_key(id)));
        self.storage.write_batch(ops).await?;
        Ok(true)
    }

    /// Remove every document and index entry of this collection
    pub async fn clear(&self) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let prefix = format!("{}/", T::COLLECTION).into_bytes();
        let keys = self.storage.list_keys(&prefix).await?;
        let removed = keys
            .iter()
            .filter(|key| key.starts_with(&Self::doc_prefix()))
            .count();
        self.storage
            .write_batch(keys.into_iter().map(BatchOp::Delete).collect())
            .await?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Item {
        #[serde(rename = "_id")]
        id: String,
        code: String,
        tag: Option<String>,
        #[serde(flatten)]
        timestamps: Timestamps,
    }

    impl Document for Item {
        const COLLECTION: &'static str = "items";

        fn id(&self) -> &str {
            &self.id
        }

        fn timestamps_mut(&mut self) -> &mut Timestamps {
            &mut self.timestamps
        }

        fn unique_fields(&self) -> Vec<(&'static str, Option<String>)> {
            vec![("code", Some(self.code.clone())), ("tag", self.tag.clone())]
        }
    }

    fn item(code: &str, tag: Option<&str>) -> Item {
        Item {
            id: new_object_id(),
            code: code.to_string(),
            tag: tag.map(str::to_string),
            timestamps: Timestamps::now(),
        }
    }

    fn collection() -> Collection<Item> {
        Collection::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_object_id_shape() {
        let id = new_object_id();
        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_object_id());
    }

    #[tokio::test]
    async fn test_duplicate_unique_value_is_rejected() {
        let items = collection();
        items.insert(item("A", None)).await.unwrap();

        let err = items.insert(item("A", None)).await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate(field) if field == "code"));
        assert_eq!(items.count(|_| true).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_values_are_not_indexed() {
        let items = collection();
        items.insert(item("A", None)).await.unwrap();
        items.insert(item("B", None)).await.unwrap();

        let err = items.insert(item("C", Some("x"))).await;
        assert!(err.is_ok());
        let err = items.insert(item("D", Some("x"))).await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate(field) if field == "tag"));
    }

    #[tokio::test]
    async fn test_update_moves_unique_index() {
        let items = collection();
        let mut first = items.insert(item("A", None)).await.unwrap();
        items.insert(item("B", None)).await.unwrap();

        first.code = "B".to_string();
        let err = items.update(first.clone()).await.unwrap_err();
        assert!(matches!(err, StorageError::Duplicate(_)));

        first.code = "C".to_string();
        let updated = items.update(first).await.unwrap();
        assert!(updated.timestamps.updated_at >= updated.timestamps.created_at);

        // "A" was released by the update
        items.insert(item("A", None)).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_of_unknown_document_fails() {
        let items = collection();
        let err = items.update(item("A", None)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_and_clear_release_indexes() {
        let items = collection();
        let a = items.insert(item("A", Some("t"))).await.unwrap();
        assert!(items.delete(&a.id).await.unwrap());
        assert!(!items.delete(&a.id).await.unwrap());
        items.insert(item("A", Some("t"))).await.unwrap();

        items.insert(item("B", None)).await.unwrap();
        assert_eq!(items.clear().await.unwrap(), 2);
        assert!(items.all().await.unwrap().is_empty());
        items.insert(item("A", Some("t"))).await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_with_sees_existing_documents() {
        let items = collection();
        items.insert(item("A", None)).await.unwrap();

        let result: std::result::Result<Item, StorageError> = items
            .insert_with(|existing| {
                if existing.iter().any(|i| i.code == "A") {
                    return Err(StorageError::Duplicate("code".into()));
                }
                Ok(item("A", None))
            })
            .await;
        assert!(result.is_err());

        let next = items
            .insert_with::<_, StorageError>(|existing| Ok(item(&format!("N{}", existing.len()), None)))
            .await
            .unwrap();
        assert_eq!(next.code, "N1");
    }

    #[tokio::test]
    async fn test_concurrent_modify_keeps_both_changes() {
        let items = collection();
        let a = items.insert(item("A", None)).await.unwrap();

        let (tagged, renamed) = tokio::join!(
            items.modify::<_, StorageError>(&a.id, |i| {
                i.tag = Some("t".into());
                Ok(())
            }),
            items.modify::<_, StorageError>(&a.id, |i| {
                i.code = "Z".into();
                Ok(())
            }),
        );
        assert!(tagged.unwrap().is_some());
        assert!(renamed.unwrap().is_some());

        let stored = items.get(&a.id).await.unwrap().unwrap();
        assert_eq!(stored.code, "Z");
        assert_eq!(stored.tag.as_deref(), Some("t"));
        assert!(items.modify::<_, StorageError>("missing", |_| Ok(())).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_with_sees_other_documents() {
        let items = collection();
        let a = items.insert(item("A", None)).await.unwrap();
        items.insert(item("B", Some("t"))).await.unwrap();

        let result = items
            .update_with(&a.id, |i, others| {
                if others.iter().any(|o| o.tag.as_deref() == Some("t")) {
                    return Err(StorageError::Duplicate("tag".into()));
                }
                i.tag = Some("t".into());
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(StorageError::Duplicate(_))));
        assert_eq!(items.get(&a.id).await.unwrap().unwrap().tag, None);

        let updated = items
            .update_with::<_, StorageError>(&a.id, |i, others| {
                assert_eq!(others.len(), 1);
                i.tag = Some("u".into());
                Ok(())
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.tag.as_deref(), Some("u"));
    }
}

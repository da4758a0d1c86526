use crate::domain::ports::{DataSource, KeyValueStore, Storage};
use crate::utils::error::{EvalError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// 以目錄為基礎的儲存：讀取名單與設定檔，寫入匯出檔案
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = Path::new(&self.base_path).join(path);
        let data = tokio::fs::read(full_path).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }
}

#[async_trait]
impl DataSource for LocalStorage {
    fn describe(&self) -> String {
        format!("directory {}", self.base_path)
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        self.read_file(name).await
    }
}

/// 每個鍵對應目錄下的一個 JSON 檔。先寫入暫存檔再改名，讀取端不會看到寫到一半的內容
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let temp_path = self.dir.join(format!("{key}.tmp.json"));
        fs::write(&temp_path, value)?;
        fs::rename(&temp_path, self.path_for(key))?;
        tracing::debug!(key, bytes = value.len(), "Stored item");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// 行程內儲存。`compare_and_set` 在檢查與寫入期間持有鎖，因此是原子操作
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.items.lock().map_err(|_| EvalError::ProcessingError {
            message: "memory store lock poisoned".to_string(),
        })
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn compare_and_set(&self, key: &str, expected: Option<&str>, new: Option<&str>) -> Result<bool> {
        let mut items = self.lock()?;
        if items.get(key).map(String::as_str) != expected {
            return Ok(false);
        }
        match new {
            Some(value) => {
                items.insert(key.to_string(), value.to_string());
            }
            None => {
                items.remove(key);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_storage_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_string_lossy().to_string());

        storage.write_file("nested/out.csv", b"a,b\n").await.unwrap();
        let data = storage.read_file("nested/out.csv").await.unwrap();
        assert_eq!(data, b"a,b\n");

        let fetched = storage.fetch("nested/out.csv").await.unwrap();
        assert_eq!(fetched, data);
    }

    #[tokio::test]
    async fn test_local_storage_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_string_lossy().to_string());

        let result = storage.fetch("students.csv").await;
        assert!(matches!(result, Err(EvalError::IoError(_))));
    }

    #[test]
    fn test_file_store_absent_key_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp_dir.path().join("ledger"));

        assert_eq!(store.get_item("evaluationSubmissions").unwrap(), None);
        store.remove_item("evaluationSubmissions").unwrap();
    }

    #[test]
    fn test_file_store_set_get_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp_dir.path().join("ledger"));

        store.set_item("k", "[1,2]").unwrap();
        assert_eq!(store.get_item("k").unwrap().as_deref(), Some("[1,2]"));
        assert!(!temp_dir.path().join("ledger/k.tmp.json").exists());

        store.remove_item("k").unwrap();
        assert_eq!(store.get_item("k").unwrap(), None);
    }

    #[test]
    fn test_compare_and_set_rejects_stale_expectation() {
        let store = MemoryStore::new();
        store.set_item("k", "v1").unwrap();

        assert!(!store.compare_and_set("k", Some("v0"), Some("v2")).unwrap());
        assert_eq!(store.get_item("k").unwrap().as_deref(), Some("v1"));

        assert!(store.compare_and_set("k", Some("v1"), Some("v2")).unwrap());
        assert_eq!(store.get_item("k").unwrap().as_deref(), Some("v2"));

        assert!(store.compare_and_set("k", Some("v2"), None).unwrap());
        assert_eq!(store.get_item("k").unwrap(), None);
    }

    #[test]
    fn test_default_compare_and_set_on_file_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp_dir.path());

        assert!(store.compare_and_set("k", None, Some("first")).unwrap());
        assert!(!store.compare_and_set("k", None, Some("second")).unwrap());
        assert_eq!(store.get_item("k").unwrap().as_deref(), Some("first"));
    }
}

use crate::utils::error::Result;
use async_trait::async_trait;

/// 匯出檔案的寫入儲存
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 學生名單與設定檔的唯讀來源
#[async_trait]
pub trait DataSource: Send + Sync {
    /// 來源位置描述，用於日誌與錯誤訊息
    fn describe(&self) -> String;

    async fn fetch(&self, name: &str) -> Result<Vec<u8>>;
}

/// 同步的字串鍵值儲存，提交紀錄以此持久化
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;

    /// 只有目前的值等於 `expected` 時才寫入 `new`（`None` 表示刪除該鍵），
    /// 回傳是否已寫入。
    ///
    /// 預設實作只是先讀再寫，並非原子操作。
    fn compare_and_set(&self, key: &str, expected: Option<&str>, new: Option<&str>) -> Result<bool> {
        let current = self.get_item(key)?;
        if current.as_deref() != expected {
            return Ok(false);
        }
        match new {
            Some(value) => self.set_item(key, value)?,
            None => self.remove_item(key)?,
        }
        Ok(true)
    }
}

impl<K: KeyValueStore + ?Sized> KeyValueStore for &K {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }

    fn compare_and_set(&self, key: &str, expected: Option<&str>, new: Option<&str>) -> Result<bool> {
        (**self).compare_and_set(key, expected, new)
    }
}

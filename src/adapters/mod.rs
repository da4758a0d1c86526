// 轉接層：領域埠介面的具體實作

pub mod embedded;
pub mod http;
pub mod storage;

pub use embedded::EmbeddedSource;
pub use http::HttpSource;
pub use storage::{FileKeyValueStore, LocalStorage, MemoryStore};

use crate::domain::ports::DataSource;
use crate::utils::error::{EvalError, Result};
use async_trait::async_trait;

pub const EMBEDDED_STUDENTS_CSV: &str = include_str!("../../data/students.csv");
pub const EMBEDDED_CONFIG_JSON: &str = include_str!("../../data/config.json");

/// 編譯進執行檔的名單與設定
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedSource;

#[async_trait]
impl DataSource for EmbeddedSource {
    fn describe(&self) -> String {
        "embedded data".to_string()
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        match name {
            "students.csv" => Ok(EMBEDDED_STUDENTS_CSV.as_bytes().to_vec()),
            "config.json" => Ok(EMBEDDED_CONFIG_JSON.as_bytes().to_vec()),
            other => Err(EvalError::data_unavailable(
                other,
                "not part of the embedded data",
            )),
        }
    }
}

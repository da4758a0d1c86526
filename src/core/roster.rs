use crate::config::evaluation_config::EvaluationConfig;
use crate::domain::model::{Participant, RatingScale};
use crate::domain::ports::DataSource;
use crate::utils::error::{EvalError, Result};
use crate::utils::validation::Validate;
use std::collections::HashSet;

pub const STUDENTS_FILE: &str = "students.csv";
pub const CONFIG_FILE: &str = "config.json";

/// 學生名單與評分設定，載入後唯讀
#[derive(Debug, Clone)]
pub struct RosterStore {
    participants: Vec<Participant>,
    config: EvaluationConfig,
}

impl RosterStore {
    pub fn new(participants: Vec<Participant>, config: EvaluationConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| EvalError::data_unavailable(CONFIG_FILE, e.to_string()))?;

        if participants.is_empty() {
            return Err(EvalError::data_unavailable(
                STUDENTS_FILE,
                "the participant list is empty",
            ));
        }

        let mut ids = HashSet::new();
        for participant in &participants {
            if !ids.insert(participant.id.as_str()) {
                return Err(EvalError::data_unavailable(
                    STUDENTS_FILE,
                    format!("duplicate participant id '{}'", participant.id),
                ));
            }
        }

        Ok(Self {
            participants,
            config,
        })
    }

    pub async fn load(source: &dyn DataSource) -> Result<Self> {
        Self::load_with(source, STUDENTS_FILE, CONFIG_FILE).await
    }

    /// 同時讀取名單與設定檔。任何失敗都視為致命錯誤，不重試
    pub async fn load_with(
        source: &dyn DataSource,
        roster_name: &str,
        config_name: &str,
    ) -> Result<Self> {
        tracing::info!("Loading roster and configuration from {}", source.describe());

        let (roster_bytes, config_bytes) = tokio::try_join!(
            fetch_document(source, roster_name),
            fetch_document(source, config_name)
        )?;

        let roster_text = decode(roster_name, roster_bytes)?;
        let config_text = decode(config_name, config_bytes)?;

        let participants = parse_roster(&roster_text)
            .map_err(|e| EvalError::data_unavailable(roster_name, e.to_string()))?;
        let config = EvaluationConfig::from_document(config_name, &config_text)
            .map_err(|e| EvalError::data_unavailable(config_name, e.to_string()))?;

        let store = Self::new(participants, config)?;
        tracing::info!(
            participants = store.participants.len(),
            scale_levels = store.config.rating_scale.levels().len(),
            "Roster loaded"
        );
        Ok(store)
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn find_participant(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn rating_scale(&self) -> &RatingScale {
        &self.config.rating_scale
    }

    pub fn instructor_email(&self) -> &str {
        self.config.instructor_email()
    }
}

async fn fetch_document(source: &dyn DataSource, name: &str) -> Result<Vec<u8>> {
    source.fetch(name).await.map_err(|e| match e {
        EvalError::DataUnavailable { .. } => e,
        other => EvalError::data_unavailable(
            name,
            format!("could not read from {}: {}", source.describe(), other),
        ),
    })
}

fn decode(name: &str, bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| EvalError::data_unavailable(name, e.to_string()))
}

/// 解析含標題列的 `id,name` 名單，欄位不足兩個的列會被略過
pub fn parse_roster(text: &str) -> Result<Vec<Participant>> {
    let text = text.trim_start_matches('\u{feff}').trim();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut participants = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() < 2 {
            tracing::debug!("Skipping roster row with {} field(s)", record.len());
            continue;
        }
        participants.push(Participant::new(&record[0], &record[1]));
    }

    Ok(participants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::EmbeddedSource;

    #[test]
    fn test_parse_roster_trims_and_skips_short_rows() {
        let text = "id,name\n 1 , Ana \nbroken\n2,Bruno\n\n";
        let participants = parse_roster(text).unwrap();

        assert_eq!(
            participants,
            vec![Participant::new("1", "Ana"), Participant::new("2", "Bruno")]
        );
    }

    #[test]
    fn test_parse_roster_header_only_is_empty() {
        assert!(parse_roster("id,name\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_roster_quoted_names() {
        let participants = parse_roster("id,name\n7,\"Silva, Ana\"\n").unwrap();
        assert_eq!(participants, vec![Participant::new("7", "Silva, Ana")]);
    }

    #[tokio::test]
    async fn test_load_embedded() {
        let store = RosterStore::load(&EmbeddedSource).await.unwrap();

        assert!(!store.participants().is_empty());
        assert_eq!(store.rating_scale().label_for(85.0), Some("Very good"));
        assert_eq!(store.config().min_group_size(), 3);

        let first = store.participants()[0].clone();
        assert_eq!(store.find_participant(&first.id), Some(&first));
        assert_eq!(store.find_participant("no-such-id"), None);
    }

    #[test]
    fn test_duplicate_ids_are_data_unavailable() {
        let config = EvaluationConfig::from_json_str(
            r#"{"evaluation":{"minGroupSize":1,"maxGroupSize":2},"ratingScale":[{"label":"Ok","value":1}]}"#,
        )
        .unwrap();
        let participants = vec![Participant::new("1", "Ana"), Participant::new("1", "Bea")];

        let result = RosterStore::new(participants, config);
        assert!(matches!(result, Err(EvalError::DataUnavailable { .. })));
    }
}

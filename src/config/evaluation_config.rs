use crate::domain::model::RatingScale;
use crate::utils::error::{EvalError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub const DEFAULT_INSTRUCTOR_EMAIL: &str = "instructor@university.edu";

/// 評分設定檔（`config.json` 或 `config.toml`）：講師聯絡方式、分組人數限制與評分量表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationConfig {
    #[serde(default)]
    pub instructor: InstructorConfig,
    pub evaluation: GroupPolicy,
    #[serde(default)]
    pub rating_scale: RatingScale,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstructorConfig {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPolicy {
    pub min_group_size: usize,
    pub max_group_size: usize,
    #[serde(default)]
    pub allow_multiple_submissions: bool,
}

impl EvaluationConfig {
    /// 依檔名副檔名選擇 JSON 或 TOML 解析設定
    pub fn from_document(name: &str, content: &str) -> Result<Self> {
        validation::validate_file_extension("config", name, &["json", "toml"])?;
        if name.ends_with(".toml") {
            Self::from_toml_str(content)
        } else {
            Self::from_json_str(content)
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(EvalError::IoError)?;
        Self::from_document(&path.to_string_lossy(), &content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        let config: Self = serde_json::from_str(&processed).map_err(|e| EvalError::ConfigError {
            message: format!("JSON parsing error: {}", e),
        })?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        toml::from_str(&processed).map_err(|e| EvalError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${INSTRUCTOR_EMAIL})，找不到的變數保留原樣
    fn substitute_env_vars(content: &str) -> String {
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn instructor_email(&self) -> &str {
        self.instructor
            .email
            .as_deref()
            .filter(|email| !email.trim().is_empty())
            .unwrap_or(DEFAULT_INSTRUCTOR_EMAIL)
    }

    pub fn min_group_size(&self) -> usize {
        self.evaluation.min_group_size
    }

    pub fn max_group_size(&self) -> usize {
        self.evaluation.max_group_size
    }

    pub fn allows_multiple_submissions(&self) -> bool {
        self.evaluation.allow_multiple_submissions
    }
}

impl Validate for EvaluationConfig {
    fn validate(&self) -> Result<()> {
        // 空白的 email 視為未設定，改用預設收件人
        if let Some(email) = self.instructor.email.as_deref().filter(|e| !e.trim().is_empty()) {
            validation::validate_email("instructor.email", email)?;
        }

        validation::validate_positive_number("evaluation.minGroupSize", self.min_group_size(), 1)?;
        validation::validate_range(
            "evaluation.maxGroupSize",
            self.max_group_size(),
            self.min_group_size(),
            usize::MAX,
        )?;

        if self.rating_scale.is_empty() {
            return Err(EvalError::MissingConfigError {
                field: "ratingScale".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for level in self.rating_scale.levels() {
            validation::validate_non_empty_string("ratingScale[].label", &level.label)?;
            if !level.value.is_finite() || !seen.insert((level.value + 0.0).to_bits()) {
                return Err(EvalError::InvalidConfigValueError {
                    field: "ratingScale[].value".to_string(),
                    value: level.value.to_string(),
                    reason: "Rating values must be finite and unique".to_string(),
                });
            }
        }

        Ok(())
    }
}

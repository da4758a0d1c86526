use crate::core::export;
use crate::domain::model::{round_to, Statistics, Submission};
use crate::domain::ports::KeyValueStore;
use crate::utils::error::{EvalError, Result, ValidationFailure};

pub const LEDGER_KEY: &str = "evaluationSubmissions";

/// 只增不改的提交紀錄，以單一 JSON 陣列存放在 [`LEDGER_KEY`] 之下。
/// 每次讀取都從儲存重新載入，每次寫入都整份覆蓋。
pub struct SubmissionLedger<K: KeyValueStore> {
    store: K,
}

/// [`SubmissionLedger::begin`] 取得的快照，期間若有人改寫紀錄，commit 就會失敗
#[derive(Debug)]
pub struct LedgerTransaction {
    original: Option<String>,
    submissions: Vec<Submission>,
}

impl LedgerTransaction {
    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    pub fn submissions_mut(&mut self) -> &mut Vec<Submission> {
        &mut self.submissions
    }
}

impl<K: KeyValueStore> SubmissionLedger<K> {
    pub fn new(store: K) -> Self {
        Self { store }
    }

    pub fn begin(&self) -> Result<LedgerTransaction> {
        let original = self.store.get_item(LEDGER_KEY)?;
        let submissions = decode(original.as_deref())?;
        Ok(LedgerTransaction {
            original,
            submissions,
        })
    }

    pub fn commit(&self, tx: LedgerTransaction) -> Result<()> {
        let encoded = if tx.submissions.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&tx.submissions)?)
        };

        let written = self.store.compare_and_set(
            LEDGER_KEY,
            tx.original.as_deref(),
            encoded.as_deref(),
        )?;

        if !written {
            tracing::warn!("Ledger changed since it was read; commit rejected");
            return Err(EvalError::LedgerConflict);
        }
        Ok(())
    }

    /// 一次完成讀取、修改、寫入。`f` 在快照上執行，回傳錯誤時不寫入任何資料
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Submission>) -> Result<T>,
    {
        let mut tx = self.begin()?;
        let value = f(tx.submissions_mut())?;
        self.commit(tx)?;
        Ok(value)
    }

    /// 將提交加在最後，不檢查重複評分者；需要檢查時改用 [`Self::append_first`]
    pub fn append(&self, submission: Submission) -> Result<()> {
        let evaluator_id = submission.evaluator_id.clone();
        self.update(|submissions| {
            submissions.push(submission);
            Ok(())
        })?;
        tracing::info!(evaluator_id = %evaluator_id, "Submission stored");
        Ok(())
    }

    /// 僅在該評分者尚未提交時加入。檢查與寫入共用同一個快照，
    /// 若期間有其他寫入者，commit 會以 [`EvalError::LedgerConflict`] 失敗，不會產生重複提交。
    pub fn append_first(&self, submission: Submission) -> Result<()> {
        let evaluator_id = submission.evaluator_id.clone();
        self.update(|submissions| {
            if submissions.iter().any(|s| s.evaluator_id == evaluator_id) {
                return Err(ValidationFailure::AlreadySubmitted {
                    evaluator_id: evaluator_id.clone(),
                }
                .into());
            }
            submissions.push(submission);
            Ok(())
        })?;
        tracing::info!(evaluator_id = %evaluator_id, "Submission stored");
        Ok(())
    }

    pub fn has_submitted(&self, evaluator_id: &str) -> Result<bool> {
        Ok(self
            .all()?
            .iter()
            .any(|submission| submission.evaluator_id == evaluator_id))
    }

    pub fn all(&self) -> Result<Vec<Submission>> {
        let raw = self.store.get_item(LEDGER_KEY)?;
        decode(raw.as_deref())
    }

    /// 清空所有紀錄且無法復原，呼叫端須先取得使用者確認
    pub fn clear(&self) -> Result<()> {
        self.store.remove_item(LEDGER_KEY)?;
        tracing::warn!("All evaluation data has been cleared");
        Ok(())
    }

    pub fn to_csv(&self, submission: &Submission) -> Result<String> {
        export::submission_to_csv(submission)
    }

    pub fn to_csv_all(&self) -> Result<String> {
        let submissions = self.all()?;
        export::render_csv(submissions.iter().flat_map(export::submission_rows))
    }

    pub fn statistics(&self, participant_count: usize) -> Result<Statistics> {
        Ok(compute_statistics(&self.all()?, participant_count))
    }
}

fn decode(raw: Option<&str>) -> Result<Vec<Submission>> {
    match raw {
        None => Ok(Vec::new()),
        Some(text) if text.trim().is_empty() => Ok(Vec::new()),
        Some(text) => Ok(serde_json::from_str(text)?),
    }
}

pub fn compute_statistics(submissions: &[Submission], participant_count: usize) -> Statistics {
    let submission_count = submissions.len();
    let ratings: Vec<f64> = submissions
        .iter()
        .flat_map(|s| s.evaluations.iter().map(|e| e.rating))
        .collect();

    let submission_rate_percent = if participant_count == 0 {
        0.0
    } else {
        round_to(submission_count as f64 / participant_count as f64 * 100.0, 1)
    };

    let average_rating = if ratings.is_empty() {
        0.0
    } else {
        round_to(ratings.iter().sum::<f64>() / ratings.len() as f64, 1)
    };

    Statistics {
        submission_count,
        participant_count,
        submission_rate_percent,
        evaluation_count: ratings.len(),
        average_rating,
    }
}

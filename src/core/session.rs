use crate::core::export::{self, EmailDraft};
use crate::core::ledger::SubmissionLedger;
use crate::core::roster::RosterStore;
use crate::core::selection::GroupSelection;
use crate::domain::model::{Evaluation, Statistics, Submission};
use crate::domain::ports::KeyValueStore;
use crate::utils::error::{EvalError, Result, ValidationFailure};
use chrono::{NaiveDate, SecondsFormat, Utc};
use std::collections::HashMap;

/// 以學生 id 為鍵的評分與評語
#[derive(Debug, Clone, Default)]
pub struct RatingSheet {
    ratings: HashMap<String, f64>,
    comments: HashMap<String, String>,
}

impl RatingSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rate(&mut self, participant_id: impl Into<String>, value: f64) -> &mut Self {
        self.ratings.insert(participant_id.into(), value);
        self
    }

    pub fn comment(&mut self, participant_id: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.comments.insert(participant_id.into(), text.into());
        self
    }

    pub fn rating_for(&self, participant_id: &str) -> Option<f64> {
        self.ratings.get(participant_id).copied()
    }

    pub fn comment_for(&self, participant_id: &str) -> &str {
        self.comments
            .get(participant_id)
            .map(|c| c.trim())
            .unwrap_or("")
    }
}

pub fn iso_timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 應用程式物件：啟動時由名單與提交紀錄建立一次，再交給各個處理函式
pub struct EvaluationApp<K: KeyValueStore> {
    roster: RosterStore,
    ledger: SubmissionLedger<K>,
}

impl<K: KeyValueStore> EvaluationApp<K> {
    pub fn new(roster: RosterStore, ledger: SubmissionLedger<K>) -> Self {
        Self { roster, ledger }
    }

    pub fn roster(&self) -> &RosterStore {
        &self.roster
    }

    pub fn ledger(&self) -> &SubmissionLedger<K> {
        &self.ledger
    }

    fn check_not_submitted(&self, evaluator_id: &str) -> Result<()> {
        if !self.roster.config().allows_multiple_submissions()
            && self.ledger.has_submitted(evaluator_id)?
        {
            return Err(ValidationFailure::AlreadySubmitted {
                evaluator_id: evaluator_id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// 確認評分者身分，並建立已包含本人的小組選取
    pub fn login(&self, participant_id: &str) -> Result<GroupSelection> {
        let evaluator = self
            .roster
            .find_participant(participant_id)
            .ok_or_else(|| ValidationFailure::UnknownParticipant {
                id: participant_id.to_string(),
            })?
            .clone();

        self.check_not_submitted(&evaluator.id)?;

        let mut selection = GroupSelection::new(evaluator.clone(), self.roster.config().evaluation);
        selection.add(&evaluator)?;
        tracing::debug!(evaluator_id = %evaluator.id, "Evaluator logged in");
        Ok(selection)
    }

    pub fn select(&self, selection: &mut GroupSelection, participant_id: &str) -> Result<bool> {
        let participant = self
            .roster
            .find_participant(participant_id)
            .ok_or_else(|| ValidationFailure::UnknownParticipant {
                id: participant_id.to_string(),
            })?;
        Ok(selection.add(participant)?)
    }

    /// 驗證小組與評分表並建立提交內容，不寫入提交紀錄。
    ///
    /// 驗證順序：小組人數與本人、非組員的評分或評語、每位組員的評分是否存在且在量表上。
    /// 評分標籤由量表推得，評語會去除前後空白。
    pub fn build_submission(
        &self,
        selection: &GroupSelection,
        sheet: &RatingSheet,
        timestamp: String,
    ) -> Result<Submission> {
        selection.check_ready()?;

        if let Some(stray) = sheet.ratings.keys().find(|id| !selection.contains(id)) {
            return Err(ValidationFailure::RatingForNonMember { id: stray.clone() }.into());
        }
        if let Some(stray) = sheet.comments.keys().find(|id| !selection.contains(id)) {
            return Err(ValidationFailure::CommentForNonMember { id: stray.clone() }.into());
        }

        let scale = self.roster.rating_scale();
        let mut evaluations = Vec::with_capacity(selection.len());
        for member in selection.members() {
            let rating = sheet
                .rating_for(&member.id)
                .ok_or_else(|| ValidationFailure::MissingRating {
                    participant_name: member.name.clone(),
                })?;
            let level = scale
                .level_for(rating)
                .ok_or(ValidationFailure::RatingNotInScale { value: rating })?;

            evaluations.push(Evaluation {
                evaluated_id: member.id.clone(),
                evaluated_name: member.name.clone(),
                rating: level.value,
                rating_label: level.label.clone(),
                comment: sheet.comment_for(&member.id).to_string(),
            });
        }

        let evaluator = selection.evaluator();
        Ok(Submission {
            evaluator_id: evaluator.id.clone(),
            evaluator_name: evaluator.name.clone(),
            timestamp,
            evaluations,
        })
    }

    pub fn submit(&self, selection: &GroupSelection, sheet: &RatingSheet) -> Result<Submission> {
        let submission = self.build_submission(selection, sheet, iso_timestamp_now())?;
        // 重複提交的檢查與寫入在同一個交易內完成，並行寫入會得到 LedgerConflict
        if self.roster.config().allows_multiple_submissions() {
            self.ledger.append(submission.clone())?;
        } else {
            self.ledger.append_first(submission.clone())?;
        }
        Ok(submission)
    }

    pub fn email_draft(&self, submission: &Submission) -> Result<EmailDraft> {
        EmailDraft::for_submission(self.roster.instructor_email(), submission)
    }

    /// 該評分者最近一次的提交
    pub fn latest_submission(&self, evaluator_id: &str) -> Result<Option<Submission>> {
        Ok(self
            .ledger
            .all()?
            .into_iter()
            .rev()
            .find(|s| s.evaluator_id == evaluator_id))
    }

    pub fn export_all(&self) -> Result<String> {
        let csv = self.ledger.to_csv_all()?;
        if csv.lines().count() <= 1 {
            return Err(ValidationFailure::NothingToExport.into());
        }
        Ok(csv)
    }

    pub fn export_archive(&self, date: NaiveDate) -> Result<Vec<u8>> {
        let submissions = self.ledger.all()?;
        if submissions.iter().all(|s| s.evaluations.is_empty()) {
            return Err(ValidationFailure::NothingToExport.into());
        }
        export::build_archive(&submissions, date)
    }

    pub fn statistics(&self) -> Result<Statistics> {
        self.ledger.statistics(self.roster.participants().len())
    }

    pub fn clear(&self, confirmed: bool) -> Result<()> {
        if !confirmed {
            return Err(EvalError::Validation(ValidationFailure::ConfirmationRequired));
        }
        self.ledger.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::config::evaluation_config::EvaluationConfig;
    use crate::domain::model::Participant;

    fn app_with(allow_multiple: bool) -> EvaluationApp<MemoryStore> {
        let config = EvaluationConfig::from_json_str(&format!(
            r#"{{
                "instructor": {{ "email": "teacher@school.edu" }},
                "evaluation": {{ "minGroupSize": 3, "maxGroupSize": 5, "allowMultipleSubmissions": {allow_multiple} }},
                "ratingScale": [
                    {{ "label": "Excellent", "value": 100 }},
                    {{ "label": "Very good", "value": 85 }},
                    {{ "label": "Average", "value": 50 }}
                ]
            }}"#
        ))
        .unwrap();
        let participants = ["A", "B", "C", "D"]
            .iter()
            .map(|id| Participant::new(*id, format!("Student {id}")))
            .collect();
        let roster = RosterStore::new(participants, config).unwrap();
        EvaluationApp::new(roster, SubmissionLedger::new(MemoryStore::new()))
    }

    fn group_abc(app: &EvaluationApp<MemoryStore>) -> GroupSelection {
        let mut selection = app.login("A").unwrap();
        app.select(&mut selection, "B").unwrap();
        app.select(&mut selection, "C").unwrap();
        selection
    }

    fn full_sheet() -> RatingSheet {
        let mut sheet = RatingSheet::new();
        sheet.rate("A", 100.0).rate("B", 85.0).rate("C", 50.0);
        sheet
    }

    #[test]
    fn test_login_preselects_evaluator() {
        let app = app_with(false);
        let selection = app.login("A").unwrap();
        assert_eq!(selection.len(), 1);
        assert!(selection.includes_evaluator());
    }

    #[test]
    fn test_login_unknown_participant() {
        let app = app_with(false);
        assert!(matches!(
            app.login("Z"),
            Err(EvalError::Validation(ValidationFailure::UnknownParticipant { .. }))
        ));
    }

    #[test]
    fn test_rating_label_is_derived() {
        let app = app_with(false);
        let mut sheet = full_sheet();
        sheet.comment("B", "  solid work  ");

        let submission = app.submit(&group_abc(&app), &sheet).unwrap();

        let b = &submission.evaluations[1];
        assert_eq!(b.evaluated_id, "B");
        assert_eq!(b.rating, 85.0);
        assert_eq!(b.rating_label, "Very good");
        assert_eq!(b.comment, "solid work");
        assert!(submission.timestamp.ends_with('Z'));
    }

    #[test]
    fn test_missing_rating_rejected_without_mutation() {
        let app = app_with(false);
        let mut sheet = RatingSheet::new();
        sheet.rate("A", 100.0).rate("C", 50.0);

        let result = app.submit(&group_abc(&app), &sheet);
        assert!(matches!(
            result,
            Err(EvalError::Validation(ValidationFailure::MissingRating { ref participant_name }))
                if participant_name == "Student B"
        ));
        assert!(app.ledger().all().unwrap().is_empty());
    }

    #[test]
    fn test_rating_outside_scale_rejected() {
        let app = app_with(false);
        let mut sheet = full_sheet();
        sheet.rate("C", 42.0);

        assert!(matches!(
            app.submit(&group_abc(&app), &sheet),
            Err(EvalError::Validation(ValidationFailure::RatingNotInScale { .. }))
        ));
    }

    #[test]
    fn test_rating_for_non_member_rejected() {
        let app = app_with(false);
        let mut sheet = full_sheet();
        sheet.rate("D", 50.0);

        assert!(matches!(
            app.submit(&group_abc(&app), &sheet),
            Err(EvalError::Validation(ValidationFailure::RatingForNonMember { .. }))
        ));
    }

    #[test]
    fn test_comment_for_non_member_rejected() {
        let app = app_with(false);
        let mut sheet = full_sheet();
        sheet.comment("B", "kept the schedule").comment("D", "typo in the id");

        let result = app.submit(&group_abc(&app), &sheet);

        assert!(matches!(
            result,
            Err(EvalError::Validation(ValidationFailure::CommentForNonMember { ref id })) if id == "D"
        ));
        assert!(app.ledger().all().unwrap().is_empty());
    }

    #[test]
    fn test_submit_rechecks_ledger_inside_transaction() {
        let app = app_with(false);
        let selection = group_abc(&app);
        let mut other_session = app.login("A").unwrap();
        app.select(&mut other_session, "B").unwrap();
        app.select(&mut other_session, "C").unwrap();

        app.submit(&selection, &full_sheet()).unwrap();
        assert!(matches!(
            app.submit(&other_session, &full_sheet()),
            Err(EvalError::Validation(ValidationFailure::AlreadySubmitted { .. }))
        ));
        assert_eq!(app.ledger().all().unwrap().len(), 1);
    }

    #[test]
    fn test_undersized_group_rejected() {
        let app = app_with(false);
        let mut selection = app.login("A").unwrap();
        app.select(&mut selection, "B").unwrap();
        let mut sheet = RatingSheet::new();
        sheet.rate("A", 100.0).rate("B", 85.0);

        assert!(matches!(
            app.submit(&selection, &sheet),
            Err(EvalError::Validation(ValidationFailure::GroupSizeOutOfBounds { .. }))
        ));
    }

    #[test]
    fn test_second_submission_blocked_unless_allowed() {
        let app = app_with(false);
        app.submit(&group_abc(&app), &full_sheet()).unwrap();
        assert!(matches!(
            app.login("A"),
            Err(EvalError::Validation(ValidationFailure::AlreadySubmitted { .. }))
        ));

        let lenient = app_with(true);
        lenient.submit(&group_abc(&lenient), &full_sheet()).unwrap();
        lenient.submit(&group_abc(&lenient), &full_sheet()).unwrap();
        assert_eq!(lenient.ledger().all().unwrap().len(), 2);
    }

    #[test]
    fn test_export_all_requires_data() {
        let app = app_with(false);
        assert!(matches!(
            app.export_all(),
            Err(EvalError::Validation(ValidationFailure::NothingToExport))
        ));

        app.submit(&group_abc(&app), &full_sheet()).unwrap();
        let csv = app.export_all().unwrap();
        assert_eq!(csv.lines().count(), 4);
    }

    #[test]
    fn test_clear_requires_confirmation() {
        let app = app_with(false);
        app.submit(&group_abc(&app), &full_sheet()).unwrap();

        assert!(app.clear(false).is_err());
        assert_eq!(app.ledger().all().unwrap().len(), 1);

        app.clear(true).unwrap();
        assert!(app.ledger().all().unwrap().is_empty());
    }

    #[test]
    fn test_latest_submission_and_email() {
        let app = app_with(false);
        assert!(app.latest_submission("A").unwrap().is_none());

        let submission = app.submit(&group_abc(&app), &full_sheet()).unwrap();
        let latest = app.latest_submission("A").unwrap().unwrap();
        assert_eq!(latest, submission);

        let draft = app.email_draft(&latest).unwrap();
        assert_eq!(draft.to, "teacher@school.edu");
        assert!(draft.body.contains("Number of Evaluations: 3"));
    }

    #[test]
    fn test_statistics_through_app() {
        let app = app_with(false);
        app.submit(&group_abc(&app), &full_sheet()).unwrap();

        let stats = app.statistics().unwrap();
        assert_eq!(stats.submission_count, 1);
        assert_eq!(stats.participant_count, 4);
        assert_eq!(stats.submission_rate_percent, 25.0);
        assert_eq!(stats.evaluation_count, 3);
        assert_eq!(stats.average_rating, 78.3);
    }
}

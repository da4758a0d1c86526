//! 評分 CSV 的輸出與解析、匯出檔名、寄給講師的郵件草稿，以及 ZIP 匯出包

use crate::domain::model::{ExportRow, Submission};
use crate::utils::error::{EvalError, Result};
use chrono::{DateTime, NaiveDate};
use std::collections::HashMap;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const CSV_HEADER: &str =
    "Evaluator ID,Evaluator Name,Evaluated ID,Evaluated Name,Rating,Rating Label,Comment,Timestamp";

pub const EXPECTED_HEADERS: [&str; 8] = [
    "Evaluator ID",
    "Evaluator Name",
    "Evaluated ID",
    "Evaluated Name",
    "Rating",
    "Rating Label",
    "Comment",
    "Timestamp",
];

pub fn submission_rows(submission: &Submission) -> impl Iterator<Item = ExportRow> + '_ {
    submission
        .evaluations
        .iter()
        .map(move |evaluation| ExportRow::from_evaluation(submission, evaluation))
}

/// 輸出標題列與每筆資料一列。標題不加引號，資料欄位一律加雙引號，每列以 `\n` 結尾
pub fn render_csv<I>(rows: I) -> Result<String>
where
    I: IntoIterator<Item = ExportRow>,
{
    let mut output = String::from(CSV_HEADER);
    output.push('\n');

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for row in rows {
        let rating = row.rating.to_string();
        writer.write_record([
            row.evaluator_id.as_str(),
            row.evaluator_name.as_str(),
            row.evaluated_id.as_str(),
            row.evaluated_name.as_str(),
            rating.as_str(),
            row.rating_label.as_str(),
            row.comment.as_str(),
            row.timestamp.as_str(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| EvalError::ProcessingError {
        message: format!("failed to flush CSV writer: {}", e),
    })?;
    let body = String::from_utf8(bytes).map_err(|e| EvalError::ProcessingError {
        message: e.to_string(),
    })?;
    output.push_str(&body);
    Ok(output)
}

pub fn submission_to_csv(submission: &Submission) -> Result<String> {
    render_csv(submission_rows(submission))
}

/// 解析 [`render_csv`] 的輸出（或任何標題相同的 CSV）
pub fn parse_export(text: &str) -> Result<Vec<ExportRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

pub fn submission_file_name(submission: &Submission, date: NaiveDate) -> String {
    format!(
        "evaluation_{}_{}.csv",
        submission.evaluator_id,
        date.format("%Y-%m-%d")
    )
}

pub fn all_file_name(date: NaiveDate) -> String {
    format!("cooperative_evaluations_{}.csv", date.format("%Y-%m-%d"))
}

pub fn archive_file_name(date: NaiveDate) -> String {
    format!("cooperative_evaluations_{}.zip", date.format("%Y-%m-%d"))
}

/// 交給郵件程式所需的收件人、主旨與內文
#[derive(Debug, Clone, PartialEq)]
pub struct EmailDraft {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailDraft {
    pub fn for_submission(instructor_email: &str, submission: &Submission) -> Result<Self> {
        let csv_data = submission_to_csv(submission)?;
        let subject = format!(
            "Group Evaluation Submission - {} ({})",
            submission.evaluator_name, submission.evaluator_id
        );
        let submitted_at = DateTime::parse_from_rfc3339(&submission.timestamp)
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|_| submission.timestamp.clone());

        let body = format!(
            "Dear Instructor,\n\n\
             Please find my group evaluation submission below.\n\n\
             Student: {name}\n\
             Student ID: {id}\n\
             Submission Date: {submitted_at}\n\
             Number of Evaluations: {count}\n\n\
             CSV Data:\n\
             {csv_data}\n\n\
             Best regards,\n\
             {name}",
            name = submission.evaluator_name,
            id = submission.evaluator_id,
            count = submission.evaluations.len(),
        );

        Ok(Self {
            to: instructor_email.to_string(),
            subject,
            body,
        })
    }

    pub fn mailto_url(&self) -> String {
        format!(
            "mailto:{}?subject={}&body={}",
            self.to,
            urlencoding::encode(&self.subject),
            urlencoding::encode(&self.body)
        )
    }
}

/// 包含彙總 CSV 與每份提交各一個 CSV 的 ZIP
pub fn build_archive(submissions: &[Submission], date: NaiveDate) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    let all_rows = submissions.iter().flat_map(submission_rows);
    zip.start_file::<_, ()>(all_file_name(date), FileOptions::default())?;
    zip.write_all(render_csv(all_rows)?.as_bytes())?;

    let mut used: HashMap<String, usize> = HashMap::new();
    for submission in submissions {
        let base = submission_file_name(submission, date);
        let seen = used.entry(base.clone()).or_insert(0);
        *seen += 1;
        let name = if *seen == 1 {
            base
        } else {
            base.replace(".csv", &format!("_{}.csv", seen))
        };

        zip.start_file::<_, ()>(name, FileOptions::default())?;
        zip.write_all(submission_to_csv(submission)?.as_bytes())?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Evaluation;

    fn submission() -> Submission {
        Submission {
            evaluator_id: "A".to_string(),
            evaluator_name: "Ana".to_string(),
            timestamp: "2025-03-01T10:00:00.000Z".to_string(),
            evaluations: vec![
                Evaluation {
                    evaluated_id: "A".to_string(),
                    evaluated_name: "Ana".to_string(),
                    rating: 100.0,
                    rating_label: "Excellent".to_string(),
                    comment: String::new(),
                },
                Evaluation {
                    evaluated_id: "B".to_string(),
                    evaluated_name: "Bruno".to_string(),
                    rating: 71.5,
                    rating_label: "Good".to_string(),
                    comment: "Helpful, on time".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_submission_csv_layout() {
        let csv = submission_to_csv(&submission()).unwrap();
        let lines: Vec<&str> = csv.split('\n').collect();

        assert_eq!(lines.len(), 4); // header + 2 rows + trailing empty
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            r#""A","Ana","A","Ana","100","Excellent","","2025-03-01T10:00:00.000Z""#
        );
        assert_eq!(
            lines[2],
            r#""A","Ana","B","Bruno","71.5","Good","Helpful, on time","2025-03-01T10:00:00.000Z""#
        );
        assert_eq!(lines[3], "");
    }

    #[test]
    fn test_empty_rows_render_header_only() {
        assert_eq!(render_csv(Vec::new()).unwrap(), format!("{}\n", CSV_HEADER));
    }

    #[test]
    fn test_export_then_parse_preserves_ids_and_ratings() {
        let original = submission();
        let rows = parse_export(&submission_to_csv(&original).unwrap()).unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.evaluator_id == "A"));
        let evaluated: Vec<&str> = rows.iter().map(|r| r.evaluated_id.as_str()).collect();
        assert_eq!(evaluated, vec!["A", "B"]);
        let ratings: Vec<f64> = rows.iter().map(|r| r.rating).collect();
        assert_eq!(ratings, vec![100.0, 71.5]);
        assert!(rows[0].is_self_evaluation());

        // 含雙引號、逗號與換行的評語也要原樣還原
        let mut tricky = submission();
        tricky.evaluations[1].comment = "said \"done\", then\nleft early".to_string();
        let csv = submission_to_csv(&tricky).unwrap();
        assert!(csv.contains("\"said \"\"done\"\", then\nleft early\""));

        let rows = parse_export(&csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].comment, "said \"done\", then\nleft early");
        assert_eq!(rows[1].rating, 71.5);
    }

    #[test]
    fn test_file_names() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(submission_file_name(&submission(), date), "evaluation_A_2025-03-01.csv");
        assert_eq!(all_file_name(date), "cooperative_evaluations_2025-03-01.csv");
    }

    #[test]
    fn test_email_draft() {
        let draft = EmailDraft::for_submission("teacher@school.edu", &submission()).unwrap();

        assert_eq!(draft.to, "teacher@school.edu");
        assert_eq!(draft.subject, "Group Evaluation Submission - Ana (A)");
        assert!(draft.body.starts_with("Dear Instructor,\n\n"));
        assert!(draft.body.contains("Student ID: A\n"));
        assert!(draft.body.contains("Submission Date: 2025-03-01 10:00:00 UTC\n"));
        assert!(draft.body.contains("Number of Evaluations: 2\n"));
        assert!(draft.body.contains(CSV_HEADER));
        assert!(draft.body.ends_with("Best regards,\nAna"));

        let url = draft.mailto_url();
        assert!(url.starts_with("mailto:teacher@school.edu?subject=Group%20Evaluation%20Submission%20-%20Ana%20%28A%29&body="));
        assert!(!url.contains('\n'));
    }

    #[test]
    fn test_archive_contains_aggregate_and_per_submission_files() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let bytes = build_archive(&[submission(), submission()], date).unwrap();

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();

        assert_eq!(
            names,
            vec![
                "cooperative_evaluations_2025-03-01.csv",
                "evaluation_A_2025-03-01.csv",
                "evaluation_A_2025-03-01_2.csv",
            ]
        );

        let mut content = String::new();
        std::io::Read::read_to_string(
            &mut archive.by_name("cooperative_evaluations_2025-03-01.csv").unwrap(),
            &mut content,
        )
        .unwrap();
        assert_eq!(content.lines().count(), 5);
    }
}

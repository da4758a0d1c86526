use crate::core::export::EXPECTED_HEADERS;
use crate::domain::model::{round_to, ExportRow};
use crate::utils::error::{EvalError, Result};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const SOURCE_FILE_COLUMN: &str = "Source_File";

#[derive(Debug, Clone, PartialEq)]
pub struct CombinedRow {
    pub row: ExportRow,
    pub source_file: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorSummary {
    pub evaluator_id: String,
    pub evaluator_name: String,
    pub evaluations_given: usize,
    pub avg_rating_given: f64,
}

#[derive(Debug, Clone)]
pub struct CombineSummary {
    pub output_file: PathBuf,
    pub processed_files: Vec<PathBuf>,
    pub error_files: Vec<(PathBuf, String)>,
    pub total_records: usize,
    pub unique_evaluators: usize,
    pub evaluators: Vec<EvaluatorSummary>,
}

/// 將 `input_dir` 內所有 `*.csv` 合併為 `output_file`。
/// 每列標註來源檔名，並依評分者與時間排序。
pub fn combine_csv_files(input_dir: &Path, output_file: &Path) -> Result<CombineSummary> {
    fs::create_dir_all(input_dir)?;

    let csv_files = list_csv_files(input_dir, output_file)?;
    if csv_files.is_empty() {
        return Err(EvalError::ProcessingError {
            message: format!(
                "No CSV files found in {}; place student CSV files there",
                input_dir.display()
            ),
        });
    }
    tracing::info!("Found {} CSV files", csv_files.len());

    let mut combined = Vec::new();
    let mut processed_files = Vec::new();
    let mut error_files = Vec::new();

    for path in csv_files {
        tracing::info!("Processing: {}", display_name(&path));
        match read_submission_file(&path) {
            Ok(rows) => {
                let source_file = display_name(&path);
                combined.extend(rows.into_iter().map(|row| CombinedRow {
                    row,
                    source_file: source_file.clone(),
                }));
                processed_files.push(path);
            }
            Err(e) => {
                tracing::error!("Error processing {}: {}", path.display(), e);
                error_files.push((path, e.to_string()));
            }
        }
    }

    if processed_files.is_empty() {
        return Err(EvalError::ProcessingError {
            message: "No valid CSV files could be processed".to_string(),
        });
    }

    combined.sort_by(|a, b| {
        a.row
            .evaluator_id
            .cmp(&b.row.evaluator_id)
            .then_with(|| a.row.timestamp.cmp(&b.row.timestamp))
    });

    write_combined(output_file, &combined)?;

    let unique_evaluators = combined
        .iter()
        .map(|c| c.row.evaluator_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    Ok(CombineSummary {
        output_file: output_file.to_path_buf(),
        processed_files,
        error_files,
        total_records: combined.len(),
        unique_evaluators,
        evaluators: summarize_evaluators(&combined),
    })
}

fn list_csv_files(input_dir: &Path, output_file: &Path) -> Result<Vec<PathBuf>> {
    let skip = fs::canonicalize(output_file).ok();
    let mut files = Vec::new();
    for entry in fs::read_dir(input_dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv || !path.is_file() {
            continue;
        }
        if skip.is_some() && fs::canonicalize(&path).ok() == skip {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_submission_file(path: &Path) -> Result<Vec<ExportRow>> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers != EXPECTED_HEADERS {
        tracing::warn!(
            "Headers don't match expected format in {}: expected {:?}, found {:?}",
            path.display(),
            EXPECTED_HEADERS,
            headers
        );
    }

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

fn write_combined(output_file: &Path, rows: &[CombinedRow]) -> Result<()> {
    if let Some(parent) = output_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(output_file)?;
    let mut header: Vec<&str> = EXPECTED_HEADERS.to_vec();
    header.push(SOURCE_FILE_COLUMN);
    writer.write_record(&header)?;

    for combined in rows {
        let row = &combined.row;
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
            combined.source_file.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn summarize_evaluators(rows: &[CombinedRow]) -> Vec<EvaluatorSummary> {
    let mut groups: BTreeMap<(&str, &str), (usize, f64)> = BTreeMap::new();
    for combined in rows {
        let entry = groups
            .entry((
                combined.row.evaluator_id.as_str(),
                combined.row.evaluator_name.as_str(),
            ))
            .or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += combined.row.rating;
    }

    groups
        .into_iter()
        .map(|((id, name), (count, total))| EvaluatorSummary {
            evaluator_id: id.to_string(),
            evaluator_name: name.to_string(),
            evaluations_given: count,
            avg_rating_given: round_to(total / count as f64, 2),
        })
        .collect()
}

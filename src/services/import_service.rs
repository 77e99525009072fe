use std::collections::HashMap;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::dto::admin_dto::ImportResponse;
use crate::error::{Error, Result};
use crate::models::question::{NewQuestion, QuestionFields};
use crate::services::question_service::QuestionService;

/// Header names shared by import and export, in column order.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "Question", "Answer", "Category", "ChoiceA", "ChoiceB", "ChoiceC", "ChoiceD",
];
pub const IMAGE_COLUMN: &str = "ImagePath";

/// One data row of the sheet, numbered the way a spreadsheet shows it (header = 1).
#[derive(Debug)]
pub struct ParsedRow {
    pub row: usize,
    pub outcome: std::result::Result<NewQuestion, String>,
}

/// Reads the first worksheet of an xlsx/xls workbook into validated rows.
pub fn parse_workbook(bytes: Vec<u8>) -> Result<Vec<ParsedRow>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::BadRequest("The workbook has no worksheets".to_string()))??;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .ok_or_else(|| Error::BadRequest("The worksheet is empty".to_string()))?
        .iter()
        .map(|cell| cell_text(cell).trim().to_string())
        .collect();

    let positions: HashMap<&str, usize> = header
        .iter()
        .enumerate()
        .filter(|(_, name)| !name.is_empty())
        .map(|(idx, name)| (name.as_str(), idx))
        .collect();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !positions.contains_key(col))
        .collect();
    if !missing.is_empty() {
        let found: Vec<&str> = header.iter().map(String::as_str).filter(|h| !h.is_empty()).collect();
        return Err(Error::BadRequest(format!(
            "Missing required columns: {}. Found columns: {}",
            missing.join(", "),
            found.join(", ")
        )));
    }
    let image_col = positions.get(IMAGE_COLUMN).copied();

    let mut parsed = Vec::new();
    for (offset, cells) in rows.enumerate() {
        let values: Vec<String> = cells.iter().map(cell_text).collect();
        if values.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        let image = image_col.and_then(|idx| values.get(idx)).map(String::as_str);

        let outcome = NewQuestion::from_fields(QuestionFields {
            question: column(&positions, &values, "Question"),
            answer: column(&positions, &values, "Answer"),
            category: column(&positions, &values, "Category"),
            choice_a: column(&positions, &values, "ChoiceA"),
            choice_b: column(&positions, &values, "ChoiceB"),
            choice_c: Some(column(&positions, &values, "ChoiceC")),
            choice_d: Some(column(&positions, &values, "ChoiceD")),
            image_path: image,
        });
        parsed.push(ParsedRow {
            row: offset + 2,
            outcome,
        });
    }
    Ok(parsed)
}

fn column<'a>(positions: &HashMap<&str, usize>, values: &'a [String], name: &str) -> &'a str {
    positions
        .get(name)
        .and_then(|idx| values.get(*idx))
        .map(String::as_str)
        .unwrap_or("")
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[derive(Clone)]
pub struct ImportService {
    questions: QuestionService,
}

impl ImportService {
    pub fn new(questions: QuestionService) -> Self {
        Self { questions }
    }

    /// Imports every valid row in one transaction; invalid rows are logged and skipped.
    pub async fn import_workbook(&self, bytes: Vec<u8>) -> Result<ImportResponse> {
        let rows = tokio::task::spawn_blocking(move || parse_workbook(bytes))
            .await
            .map_err(|e| Error::Internal(format!("Import task failed: {}", e)))??;

        let mut log = Vec::with_capacity(rows.len());
        let mut valid = Vec::new();
        for row in rows {
            match row.outcome {
                Ok(question) => {
                    log.push(format!(
                        "Row {}: Imported - {} (Answer: {}){}",
                        row.row,
                        question.category,
                        question.answer,
                        if question.image_path.is_some() { " [with image]" } else { "" }
                    ));
                    valid.push(question);
                }
                Err(reason) => log.push(format!("Row {}: Skipped - {}", row.row, reason)),
            }
        }

        let imported = self.questions.create_many(&valid).await?;
        let skipped = log.len() - imported;
        tracing::info!(imported, skipped, "excel import finished");

        Ok(ImportResponse {
            imported,
            skipped,
            log,
        })
    }
}

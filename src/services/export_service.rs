use crate::error::Result;
use crate::models::category_weight::{CategoryCount, CategoryWeight};
use crate::models::question::Question;
use crate::services::import_service::{IMAGE_COLUMN, REQUIRED_COLUMNS};
use rust_xlsxwriter::*;
use std::collections::HashMap;

pub struct ExportService;

impl ExportService {
    /// The question bank as an xlsx workbook that the importer reads back unchanged.
    ///
    /// Sheet 1 ("Questions") uses the import header layout on row 0. Sheet 2 summarises
    /// categories with their configured weights.
    pub fn generate_questions_xlsx(
        questions: &[Question],
        counts: &[CategoryCount],
        weights: &[CategoryWeight],
    ) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();

        // ── Palette ──
        let header_bg = Color::RGB(0x0F172A);
        let header_text = Color::White;
        let alt_row_1 = Color::RGB(0xF8FAFC);
        let alt_row_2 = Color::White;
        let border_color = Color::RGB(0xE2E8F0);
        let answer_color = Color::RGB(0x10B981);

        let header_format = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(header_text)
            .set_background_color(header_bg)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);

        {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name("Questions")?;

            let widths = [60.0, 9.0, 20.0, 30.0, 30.0, 30.0, 30.0, 28.0];
            let headers = REQUIRED_COLUMNS.iter().copied().chain(std::iter::once(IMAGE_COLUMN));
            for (col, (name, width)) in headers.zip(widths).enumerate() {
                worksheet.set_column_width(col as u16, width)?;
                worksheet.write_string_with_format(0, col as u16, name, &header_format)?;
            }
            worksheet.set_row_height(0, 24)?;

            for (idx, q) in questions.iter().enumerate() {
                let row = 1 + idx as u32;
                let bg = if idx % 2 == 0 { alt_row_1 } else { alt_row_2 };

                let base_fmt = Format::new()
                    .set_font_size(10)
                    .set_background_color(bg)
                    .set_align(FormatAlign::VerticalCenter)
                    .set_border(FormatBorder::Thin)
                    .set_border_color(border_color);
                let wrap_fmt = base_fmt.clone().set_text_wrap();
                let answer_fmt = base_fmt
                    .clone()
                    .set_bold()
                    .set_font_color(answer_color)
                    .set_align(FormatAlign::Center);

                let cells = [
                    q.question.as_str(),
                    q.answer.as_str(),
                    q.category.as_str(),
                    q.choice_a.as_str(),
                    q.choice_b.as_str(),
                    q.choice_c.as_deref().unwrap_or(""),
                    q.choice_d.as_deref().unwrap_or(""),
                    q.image_path.as_deref().unwrap_or(""),
                ];
                for (col, value) in cells.iter().enumerate() {
                    let fmt = match col {
                        0 => &wrap_fmt,
                        1 => &answer_fmt,
                        _ => &base_fmt,
                    };
                    if value.is_empty() {
                        worksheet.write_blank(row, col as u16, fmt)?;
                    } else {
                        worksheet.write_string_with_format(row, col as u16, *value, fmt)?;
                    }
                }
            }

            worksheet.set_freeze_panes(1, 0)?;
            worksheet.autofilter(0, 0, (questions.len() as u32).max(1), 7)?;
        }

        {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name("Categories")?;

            let title_format = Format::new()
                .set_font_size(14)
                .set_bold()
                .set_font_color(header_text)
                .set_background_color(header_bg)
                .set_align(FormatAlign::VerticalCenter);
            worksheet.set_row_height(0, 30)?;
            worksheet.merge_range(0, 0, 0, 2, "Question bank summary", &title_format)?;

            let subtitle = format!(
                "Exported {}  •  {} questions",
                chrono::Local::now().format("%B %d, %Y %H:%M"),
                questions.len()
            );
            worksheet.merge_range(1, 0, 1, 2, &subtitle, &Format::new().set_italic())?;

            for (col, (name, width)) in [("Category", 30.0), ("Questions", 12.0), ("Percentage", 12.0)]
                .into_iter()
                .enumerate()
            {
                worksheet.set_column_width(col as u16, width)?;
                worksheet.write_string_with_format(2, col as u16, name, &header_format)?;
            }

            let percentages: HashMap<&str, i64> = weights
                .iter()
                .map(|w| (w.category.as_str(), w.percentage))
                .collect();
            for (idx, count) in counts.iter().enumerate() {
                let row = 3 + idx as u32;
                worksheet.write_string(row, 0, &count.category)?;
                worksheet.write_number(row, 1, count.question_count as f64)?;
                worksheet.write_number(
                    row,
                    2,
                    percentages.get(count.category.as_str()).copied().unwrap_or(0) as f64,
                )?;
            }
        }

        let buffer = workbook.save_to_buffer()?;
        Ok(buffer)
    }
}

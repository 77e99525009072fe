//! Test and answer-key PDFs.
//!
//! Layout is computed in PDF points (origin bottom-left, US Letter) as a list of
//! [`DrawOp`]s per page, which keeps pagination testable without a PDF parser. The
//! renderer then replays the ops through printpdf with the built-in Helvetica faces.

use std::path::{Path, PathBuf};

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::utils::calculate_points_for_circle;
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfLayerReference, Point, Polygon, Pt,
};

use crate::error::Result;
use crate::models::generated_test::GeneratedTest;
use crate::utils::time;

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;

pub const TEST_TITLE: &str = "Journey-Level Proficiency Exam";

const MARGIN: f32 = 50.0;
const QUESTION_WRAP: usize = 48;
const CHOICE_WRAP: usize = 40;
const KEY_WRAP: usize = 80;
const KEY_CHOICE_WRAP: usize = 75;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        text: String,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
    Circle {
        cx: f32,
        cy: f32,
        r: f32,
        filled: bool,
    },
    Image {
        path: PathBuf,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        /// Shown instead when the file cannot be decoded at render time.
        fallback: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub ops: Vec<DrawOp>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentLayout {
    pub pages: Vec<PageLayout>,
}

impl DocumentLayout {
    fn new_page(&mut self) -> &mut PageLayout {
        self.pages.push(PageLayout::default());
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn page(&mut self) -> &mut PageLayout {
        if self.pages.is_empty() {
            return self.new_page();
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }
}

impl PageLayout {
    fn text(&mut self, x: f32, y: f32, size: f32, bold: bool, text: impl Into<String>) {
        self.ops.push(DrawOp::Text {
            x,
            y,
            size,
            bold,
            text: text.into(),
        });
    }

    fn centered(&mut self, y: f32, size: f32, bold: bool, text: &str) {
        let x = (PAGE_WIDTH - text_width(text, size)) / 2.0;
        self.text(x, y, size, bold, text);
    }
}

/// A question image found on disk with its pixel size.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Looks up a stored image path; `None` when it is missing or unreadable.
pub trait ImageProbe {
    fn probe(&self, stored_path: &str) -> Option<ImageInfo>;
}

impl<F> ImageProbe for F
where
    F: Fn(&str) -> Option<ImageInfo>,
{
    fn probe(&self, stored_path: &str) -> Option<ImageInfo> {
        self(stored_path)
    }
}

/// Largest size fitting `max_w` x `max_h`, never enlarged.
fn fit_image(info: &ImageInfo, max_w: f32, max_h: f32) -> (f32, f32) {
    let (w, h) = (info.width.max(1) as f32, info.height.max(1) as f32);
    let scale = (max_w / w).min(max_h / h).min(1.0);
    ((w * scale).floor(), (h * scale).floor())
}

fn placeholder(stored_path: &str) -> String {
    let name = Path::new(stored_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| stored_path.to_string());
    format!("[Image not found: {}]", name)
}

/// Greedy word wrap on character counts. A word longer than `max_chars` keeps its own line.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate_len = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if candidate_len <= max_chars || current.is_empty() {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

// Helvetica advance widths (1/1000 em) for printable ASCII.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

pub fn text_width(text: &str, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| match c as u32 {
            code @ 32..=126 => HELVETICA_WIDTHS[(code - 32) as usize] as u32,
            _ => 556,
        })
        .sum();
    units as f32 * size / 1000.0
}

/// Two-column student copy.
pub fn layout_test(test: &GeneratedTest, images: &dyn ImageProbe) -> DocumentLayout {
    let mut doc = DocumentLayout::default();
    let page = doc.new_page();
    let top = PAGE_HEIGHT;

    page.centered(top - 40.0, 16.0, true, TEST_TITLE);
    page.centered(top - 60.0, 12.0, true, &format!("Test ID: {}", test.id));

    let date_text = format!("Date: {}", time::display_date(&test.generated_at));
    page.text(MARGIN, top - 90.0, 12.0, false, format!("Name: {}", test.name));
    page.text(
        PAGE_WIDTH - MARGIN - text_width(&date_text, 12.0),
        top - 90.0,
        12.0,
        false,
        date_text,
    );
    page.ops.push(DrawOp::Line {
        x1: MARGIN,
        y1: top - 95.0,
        x2: PAGE_WIDTH - MARGIN,
        y2: top - 95.0,
    });
    page.centered(
        top - 115.0,
        12.0,
        false,
        &format!("Total Points: {}", test.questions.len()),
    );

    page.text(MARGIN, top - 145.0, 12.0, true, "Directions:");
    page.text(120.0, top - 145.0, 11.0, false, "For the following questions, fill the circle");
    page.text(
        MARGIN,
        top - 160.0,
        11.0,
        false,
        "next to the option that BEST answers the question or",
    );
    page.text(MARGIN, top - 175.0, 11.0, false, "completes the statement. Show all work.");

    let column_width = PAGE_WIDTH / 2.0 - 64.0;
    let left_x = MARGIN;
    let right_x = PAGE_WIDTH / 2.0 + 14.0;

    let mut left_y = top - 210.0;
    let mut right_y = top - 210.0;

    for (idx, item) in test.questions.iter().enumerate() {
        let q = &item.question;
        let number = idx + 1;
        let is_left = number % 2 == 1;

        let image = q
            .image_path
            .as_deref()
            .map(|stored| (stored, images.probe(stored)));
        let image_height = match &image {
            Some((_, Some(info))) => fit_image(info, column_width - 20.0, 100.0).1,
            Some((_, None)) => 15.0,
            None => 0.0,
        };

        let choice_lines: usize = q
            .choices()
            .iter()
            .map(|(letter, text)| {
                wrap_text(&format!("{}. {}", letter.lower(), text), CHOICE_WRAP).len()
            })
            .sum();
        let question_lines = wrap_text(&format!("{}. {}", number, q.question), QUESTION_WRAP);
        let space_needed = 31.0
            + question_lines.len() as f32 * 14.0
            + image_height
            + choice_lines as f32 * 14.0
            + 35.0;

        let column_y = if is_left { left_y } else { right_y };
        if column_y - space_needed < MARGIN {
            let page = doc.new_page();
            page.centered(top - 40.0, 16.0, true, &format!("{} (continued)", TEST_TITLE));
            page.centered(top - 60.0, 12.0, true, &format!("Test ID: {}", test.id));
            left_y = top - 90.0;
            right_y = top - 90.0;
        }

        let x = if is_left { left_x } else { right_x };
        let mut y = if is_left { left_y } else { right_y };
        let page = doc.page();

        for line in question_lines {
            page.text(x, y, 11.0, false, line);
            y -= 14.0;
        }

        match image {
            Some((_, Some(info))) => {
                let (width, height) = fit_image(&info, column_width - 20.0, 100.0);
                let img_y = y - height - 5.0;
                page.ops.push(DrawOp::Image {
                    fallback: placeholder(&info.path.to_string_lossy()),
                    path: info.path,
                    x: x + 10.0,
                    y: img_y,
                    width,
                    height,
                });
                y = img_y - 10.0;
            }
            Some((stored, None)) => {
                page.text(x + 10.0, y - 10.0, 9.0, false, placeholder(stored));
                y -= 20.0;
            }
            None => {}
        }

        y -= 5.0;
        for (letter, text) in q.choices() {
            page.ops.push(DrawOp::Circle {
                cx: x + 5.0,
                cy: y + 3.0,
                r: 3.0,
                filled: false,
            });
            for line in wrap_text(&format!("{}. {}", letter.lower(), text), CHOICE_WRAP) {
                page.text(x + 15.0, y, 11.0, false, line);
                y -= 14.0;
            }
        }
        y -= 35.0;

        if is_left {
            left_y = y;
        } else {
            right_y = y;
        }
    }

    doc
}

/// Single-column key with the correct bubble filled.
pub fn layout_answer_key(test: &GeneratedTest, images: &dyn ImageProbe) -> DocumentLayout {
    let mut doc = DocumentLayout::default();
    let page = doc.new_page();
    let top = PAGE_HEIGHT;

    page.text(MARGIN, top - 50.0, 16.0, true, "ANSWER KEY");
    page.text(MARGIN, top - 80.0, 12.0, false, format!("Name: {}", test.name));
    page.text(
        MARGIN,
        top - 100.0,
        12.0,
        false,
        format!("Date: {}", time::display_date(&test.generated_at)),
    );
    page.text(400.0, top - 80.0, 14.0, true, format!("Test ID: {}", test.id));
    page.text(
        MARGIN,
        top - 120.0,
        12.0,
        false,
        "Instructions: Correct answers are filled in.",
    );

    let mut y = top - 160.0;

    for (idx, item) in test.questions.iter().enumerate() {
        let q = &item.question;
        let correct = q.answer_letter();

        let image = q
            .image_path
            .as_deref()
            .map(|stored| (stored, images.probe(stored)));
        let image_height = match &image {
            Some((_, Some(info))) => fit_image(info, 400.0, 150.0).1 + 25.0,
            Some((_, None)) => 30.0,
            None => 0.0,
        };

        let question_lines = wrap_text(&format!("{}. {}", idx + 1, q.question), KEY_WRAP);
        let choice_lines: Vec<(bool, Vec<String>)> = q
            .choices()
            .into_iter()
            .map(|(letter, text)| {
                (
                    Some(letter) == correct,
                    wrap_text(&format!("{}) {}", letter, text), KEY_CHOICE_WRAP),
                )
            })
            .collect();
        let extra_choice_lines: usize = choice_lines.iter().map(|(_, l)| l.len() - 1).sum();

        let space_needed = question_lines.len() as f32 * 15.0
            + image_height
            + 10.0
            + choice_lines.len() as f32 * 18.0
            + extra_choice_lines as f32 * 14.0
            + 25.0;
        if y - space_needed < MARGIN {
            doc.new_page();
            y = top - 50.0;
        }
        let page = doc.page();

        for line in question_lines {
            page.text(MARGIN, y, 11.0, false, line);
            y -= 15.0;
        }

        match image {
            Some((_, Some(info))) => {
                let (width, height) = fit_image(&info, 400.0, 150.0);
                let img_x = MARGIN + (400.0 - width) / 2.0;
                let img_y = y - height - 10.0;
                page.ops.push(DrawOp::Image {
                    fallback: placeholder(&info.path.to_string_lossy()),
                    path: info.path,
                    x: img_x,
                    y: img_y,
                    width,
                    height,
                });
                y = img_y - 15.0;
            }
            Some((stored, None)) => {
                page.text(MARGIN, y - 15.0, 10.0, false, placeholder(stored));
                y -= 30.0;
            }
            None => {}
        }

        y -= 10.0;
        for (filled, lines) in choice_lines {
            page.ops.push(DrawOp::Circle {
                cx: 70.0,
                cy: y + 4.0,
                r: 6.0,
                filled,
            });
            let mut first = true;
            for line in lines {
                if !first {
                    y -= 14.0;
                }
                page.text(85.0, y, 11.0, false, line);
                first = false;
            }
            y -= 18.0;
        }
        y -= 25.0;
    }

    doc
}

/// Resolves stored image paths against the images directory and renders documents.
#[derive(Clone)]
pub struct PdfService {
    images_dir: PathBuf,
}

impl PdfService {
    pub fn new(images_dir: PathBuf) -> Self {
        Self { images_dir }
    }

    /// Stored paths are normally `images/<file>`; bare names and absolute paths also work.
    pub fn resolve_image(&self, stored: &str) -> PathBuf {
        let stored = stored.replace('\\', "/");
        let path = Path::new(&stored);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        let file = stored.strip_prefix("images/").unwrap_or(&stored);
        let candidate = self.images_dir.join(file);
        if candidate.exists() {
            candidate
        } else {
            path.to_path_buf()
        }
    }

    fn probe_image(&self, stored: &str) -> Option<ImageInfo> {
        let path = self.resolve_image(stored);
        match printpdf::image_crate::image_dimensions(&path) {
            Ok((width, height)) => Some(ImageInfo {
                path,
                width,
                height,
            }),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "question image unavailable");
                None
            }
        }
    }

    pub fn render_test(&self, test: &GeneratedTest) -> Result<Vec<u8>> {
        let probe = |stored: &str| self.probe_image(stored);
        let layout = layout_test(test, &probe);
        render(&format!("{} - {}", TEST_TITLE, test.name), &layout)
    }

    pub fn render_answer_key(&self, test: &GeneratedTest) -> Result<Vec<u8>> {
        let probe = |stored: &str| self.probe_image(stored);
        let layout = layout_answer_key(test, &probe);
        render(&format!("Answer Key - {}", test.name), &layout)
    }
}

fn mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

fn render(title: &str, layout: &DocumentLayout) -> Result<Vec<u8>> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "Layer 1");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

    for (idx, page) in layout.pages.iter().enumerate() {
        let layer = if idx == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_idx, layer_idx) = doc.add_page(mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "Layer 1");
            doc.get_page(page_idx).get_layer(layer_idx)
        };
        layer.set_outline_thickness(0.75);

        for op in &page.ops {
            draw(&layer, op, &regular, &bold);
        }
    }

    Ok(doc.save_to_bytes()?)
}

fn draw(layer: &PdfLayerReference, op: &DrawOp, regular: &IndirectFontRef, bold: &IndirectFontRef) {
    match op {
        DrawOp::Text {
            x,
            y,
            size,
            bold: is_bold,
            text,
        } => {
            let font = if *is_bold { bold } else { regular };
            layer.use_text(text.clone(), *size, mm(*x), mm(*y), font);
        }
        DrawOp::Line { x1, y1, x2, y2 } => {
            layer.add_line(Line {
                points: vec![
                    (Point::new(mm(*x1), mm(*y1)), false),
                    (Point::new(mm(*x2), mm(*y2)), false),
                ],
                is_closed: false,
            });
        }
        DrawOp::Circle { cx, cy, r, filled } => {
            layer.add_polygon(Polygon {
                rings: vec![calculate_points_for_circle(Pt(*r), Pt(*cx), Pt(*cy))],
                mode: if *filled {
                    PaintMode::FillStroke
                } else {
                    PaintMode::Stroke
                },
                winding_order: WindingOrder::NonZero,
            });
        }
        DrawOp::Image {
            path,
            x,
            y,
            width,
            height,
            fallback,
        } => match printpdf::image_crate::open(path) {
            Ok(decoded) => {
                let (px_w, px_h) = (decoded.width().max(1) as f32, decoded.height().max(1) as f32);
                let rgb = printpdf::image_crate::DynamicImage::ImageRgb8(decoded.to_rgb8());
                Image::from_dynamic_image(&rgb).add_to_layer(
                    layer.clone(),
                    ImageTransform {
                        translate_x: Some(mm(*x)),
                        translate_y: Some(mm(*y)),
                        scale_x: Some(width / px_w),
                        scale_y: Some(height / px_h),
                        dpi: Some(72.0),
                        ..Default::default()
                    },
                );
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not decode image");
                layer.use_text(fallback.clone(), 9.0, mm(*x), mm(*y + height / 2.0), regular);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::generated_test::TestQuestion;
    use crate::models::question::Question;
    use chrono::{Local, TimeZone};

    fn question(id: i64, text: &str, image: Option<&str>) -> TestQuestion {
        TestQuestion {
            question: Question {
                id,
                question: text.to_string(),
                answer: "C".to_string(),
                category: "Code".to_string(),
                choice_a: "Six inches".to_string(),
                choice_b: "Twelve inches".to_string(),
                choice_c: Some("Eighteen inches".to_string()),
                choice_d: Some("Twenty-four inches".to_string()),
                image_path: image.map(str::to_string),
                created_at: chrono::NaiveDate::from_ymd_opt(2025, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            },
            drawn_for: Some("Code".to_string()),
        }
    }

    fn test_with(questions: Vec<TestQuestion>) -> GeneratedTest {
        GeneratedTest {
            id: "1A2B3C4D".to_string(),
            name: "Jordan".to_string(),
            generated_at: Local.with_ymd_and_hms(2025, 3, 7, 9, 30, 0).unwrap(),
            requested: questions.len(),
            questions,
        }
    }

    fn no_images(_: &str) -> Option<ImageInfo> {
        None
    }

    fn texts(page: &PageLayout) -> Vec<&str> {
        page.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn text_x(page: &PageLayout, prefix: &str) -> Option<f32> {
        page.ops.iter().find_map(|op| match op {
            DrawOp::Text { text, x, .. } if text.starts_with(prefix) => Some(*x),
            _ => None,
        })
    }

    #[test]
    fn wrap_text_respects_limit() {
        let lines = wrap_text("the quick brown fox jumps over the lazy dog", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps over", "the lazy", "dog"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));

        assert_eq!(wrap_text("supercalifragilistic is long", 8)[0], "supercalifragilistic");
        assert_eq!(wrap_text("   ", 8), vec![String::new()]);
    }

    #[test]
    fn header_carries_title_id_and_points() {
        let test = test_with(vec![question(1, "First?", None), question(2, "Second?", None)]);
        let layout = layout_test(&test, &no_images);
        let first = texts(&layout.pages[0]);
        assert!(first.contains(&TEST_TITLE));
        assert!(first.contains(&"Test ID: 1A2B3C4D"));
        assert!(first.contains(&"Name: Jordan"));
        assert!(first.contains(&"Date: March 07, 2025"));
        assert!(first.contains(&"Total Points: 2"));
    }

    #[test]
    fn odd_questions_go_left_even_right() {
        let test = test_with((1..=4).map(|i| question(i, "Which depth?", None)).collect());
        let layout = layout_test(&test, &no_images);
        let page = &layout.pages[0];
        assert_eq!(text_x(page, "1. "), Some(MARGIN));
        assert_eq!(text_x(page, "2. "), Some(PAGE_WIDTH / 2.0 + 14.0));
        assert_eq!(text_x(page, "3. "), Some(MARGIN));
        assert_eq!(text_x(page, "4. "), Some(PAGE_WIDTH / 2.0 + 14.0));

        let bubbles = page
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Circle { filled: false, .. }))
            .count();
        assert_eq!(bubbles, 16);
        assert!(texts(page).contains(&"c. Eighteen inches"));
    }

    #[test]
    fn column_questions_wrap_at_forty_eight_characters() {
        let long = vec!["alpha"; 20].join(" ");
        let test = test_with(vec![question(1, &long, None)]);
        let layout = layout_test(&test, &no_images);
        let lines = texts(&layout.pages[0]);

        let first = format!("1. {}", vec!["alpha"; 7].join(" "));
        assert!(lines.contains(&first.as_str()), "{:?}", lines);
        assert!(lines
            .iter()
            .filter(|l| l.contains("alpha"))
            .all(|l| l.chars().count() <= QUESTION_WRAP));
    }

    #[test]
    fn long_tests_continue_on_new_pages_without_overflow() {
        let long = "How many feet of clearance are required above a walking surface \
                    for service drop conductors that are accessible to pedestrians only?";
        let test = test_with((1..=40).map(|i| question(i, long, None)).collect());
        let layout = layout_test(&test, &no_images);

        assert!(layout.pages.len() > 1);
        for page in &layout.pages[1..] {
            assert!(texts(page).contains(&"Journey-Level Proficiency Exam (continued)"));
            assert!(texts(page).contains(&"Test ID: 1A2B3C4D"));
        }
        for page in &layout.pages {
            for op in &page.ops {
                if let DrawOp::Text { y, .. } = op {
                    assert!(*y >= MARGIN - 1.0, "text below bottom margin at y={}", y);
                }
            }
        }
        let numbered = layout
            .pages
            .iter()
            .flat_map(|p| texts(p))
            .filter(|t| t.ends_with("walking surface") || t.contains(". How many"))
            .count();
        assert!(numbered >= 40);
    }

    #[test]
    fn images_are_scaled_into_the_column() {
        let probe = |stored: &str| {
            Some(ImageInfo {
                path: PathBuf::from(stored),
                width: 1000,
                height: 500,
            })
        };
        let test = test_with(vec![question(1, "Identify the fitting", Some("images/fitting.png"))]);
        let layout = layout_test(&test, &probe);
        let image = layout.pages[0]
            .ops
            .iter()
            .find_map(|op| match op {
                DrawOp::Image { width, height, .. } => Some((*width, *height)),
                _ => None,
            })
            .unwrap();
        let max_w = PAGE_WIDTH / 2.0 - 64.0 - 20.0;
        assert!(image.0 <= max_w);
        assert!(image.1 <= 100.0);
        assert!((image.0 / image.1 - 2.0).abs() < 0.05);
    }

    #[test]
    fn small_images_are_not_enlarged() {
        let info = ImageInfo {
            path: PathBuf::from("x.png"),
            width: 40,
            height: 30,
        };
        assert_eq!(fit_image(&info, 400.0, 150.0), (40.0, 30.0));
    }

    #[test]
    fn missing_images_get_a_placeholder() {
        let test = test_with(vec![question(1, "Identify", Some("images/gone.png"))]);
        let layout = layout_test(&test, &no_images);
        assert!(texts(&layout.pages[0]).contains(&"[Image not found: gone.png]"));
        assert!(!layout.pages[0]
            .ops
            .iter()
            .any(|op| matches!(op, DrawOp::Image { .. })));
    }

    #[test]
    fn answer_key_fills_the_correct_bubble() {
        let test = test_with(vec![question(1, "Burial depth?", None)]);
        let layout = layout_answer_key(&test, &no_images);
        let page = &layout.pages[0];
        assert!(texts(page).contains(&"ANSWER KEY"));
        assert!(texts(page).contains(&"Test ID: 1A2B3C4D"));
        assert!(texts(page).contains(&"C) Eighteen inches"));

        let fills: Vec<bool> = page
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Circle { filled, .. } => Some(*filled),
                _ => None,
            })
            .collect();
        assert_eq!(fills, vec![false, false, true, false]);
    }

    #[test]
    fn answer_key_paginates() {
        let test = test_with((1..=30).map(|i| question(i, "Burial depth?", None)).collect());
        let layout = layout_answer_key(&test, &no_images);
        assert!(layout.pages.len() >= 2);
        let filled = layout
            .pages
            .iter()
            .flat_map(|p| p.ops.iter())
            .filter(|op| matches!(op, DrawOp::Circle { filled: true, .. }))
            .count();
        assert_eq!(filled, 30);
    }

    #[test]
    fn renders_a_pdf_document() {
        let service = PdfService::new(PathBuf::from("does-not-exist"));
        let test = test_with((1..=12).map(|i| question(i, "Burial depth?", None)).collect());
        let bytes = service.render_test(&test).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        let key = service.render_answer_key(&test).unwrap();
        assert!(key.starts_with(b"%PDF"));
    }

    #[test]
    fn resolves_stored_image_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("panel.png"), b"x").unwrap();
        let service = PdfService::new(dir.path().to_path_buf());
        assert_eq!(service.resolve_image("images/panel.png"), dir.path().join("panel.png"));
        assert_eq!(service.resolve_image("panel.png"), dir.path().join("panel.png"));
        assert_eq!(service.resolve_image("images/other.png"), PathBuf::from("images/other.png"));
    }
}

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Column list shared by every query that materialises a [`Question`].
pub const QUESTION_COLUMNS: &str =
    "id, question, answer, category, choice_a, choice_b, choice_c, choice_d, image_path, created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnswerLetter {
    A,
    B,
    C,
    D,
}

impl AnswerLetter {
    pub const ALL: [AnswerLetter; 4] = [AnswerLetter::A, AnswerLetter::B, AnswerLetter::C, AnswerLetter::D];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerLetter::A => "A",
            AnswerLetter::B => "B",
            AnswerLetter::C => "C",
            AnswerLetter::D => "D",
        }
    }

    /// Lower-case form used on the printed test (`a.` .. `d.`).
    pub fn lower(&self) -> &'static str {
        match self {
            AnswerLetter::A => "a",
            AnswerLetter::B => "b",
            AnswerLetter::C => "c",
            AnswerLetter::D => "d",
        }
    }
}

impl fmt::Display for AnswerLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnswerLetter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(AnswerLetter::A),
            "B" => Ok(AnswerLetter::B),
            "C" => Ok(AnswerLetter::C),
            "D" => Ok(AnswerLetter::D),
            other => Err(format!("'{}' is not an answer letter (A, B, C or D)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub category: String,
    pub choice_a: String,
    pub choice_b: String,
    pub choice_c: Option<String>,
    pub choice_d: Option<String>,
    pub image_path: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Question {
    /// Choices that carry text, in slot order.
    pub fn choices(&self) -> Vec<(AnswerLetter, &str)> {
        let slots = [
            (AnswerLetter::A, Some(self.choice_a.as_str())),
            (AnswerLetter::B, Some(self.choice_b.as_str())),
            (AnswerLetter::C, self.choice_c.as_deref()),
            (AnswerLetter::D, self.choice_d.as_deref()),
        ];
        slots
            .into_iter()
            .filter_map(|(letter, text)| {
                text.map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(|t| (letter, t))
            })
            .collect()
    }

    pub fn answer_letter(&self) -> Option<AnswerLetter> {
        self.answer.parse().ok()
    }
}

/// A validated question ready to be written to the bank.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub question: String,
    pub answer: AnswerLetter,
    pub category: String,
    pub choice_a: String,
    pub choice_b: String,
    pub choice_c: Option<String>,
    pub choice_d: Option<String>,
    pub image_path: Option<String>,
}

/// Raw, untrusted question fields as they arrive from a form or a spreadsheet row.
#[derive(Debug, Clone, Default)]
pub struct QuestionFields<'a> {
    pub question: &'a str,
    pub answer: &'a str,
    pub category: &'a str,
    pub choice_a: &'a str,
    pub choice_b: &'a str,
    pub choice_c: Option<&'a str>,
    pub choice_d: Option<&'a str>,
    pub image_path: Option<&'a str>,
}

impl NewQuestion {
    /// Trims every field and enforces the bank invariants: question, answer, category,
    /// choice A and choice B are required, and the answer must name a non-empty choice.
    pub fn from_fields(fields: QuestionFields<'_>) -> Result<Self, String> {
        let question = fields.question.trim();
        let answer = fields.answer.trim();
        let category = fields.category.trim();
        let choice_a = fields.choice_a.trim();
        let choice_b = fields.choice_b.trim();

        if [question, answer, category, choice_a, choice_b]
            .iter()
            .any(|v| v.is_empty())
        {
            return Err(
                "Question, Answer, Category, Choice A and Choice B are required".to_string(),
            );
        }

        let choice_c = optional_text(fields.choice_c);
        let choice_d = optional_text(fields.choice_d);

        let mut valid = vec![AnswerLetter::A, AnswerLetter::B];
        if choice_c.is_some() {
            valid.push(AnswerLetter::C);
        }
        if choice_d.is_some() {
            valid.push(AnswerLetter::D);
        }

        let letter = answer
            .parse::<AnswerLetter>()
            .ok()
            .filter(|l| valid.contains(l))
            .ok_or_else(|| {
                let names: Vec<&str> = valid.iter().map(AnswerLetter::as_str).collect();
                format!(
                    "Answer '{}' must be one of the provided choices: {}",
                    answer,
                    names.join(", ")
                )
            })?;

        Ok(Self {
            question: question.to_string(),
            answer: letter,
            category: category.to_string(),
            choice_a: choice_a.to_string(),
            choice_b: choice_b.to_string(),
            choice_c,
            choice_d,
            image_path: optional_text(fields.image_path).map(|p| p.replace('\\', "/")),
        })
    }
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

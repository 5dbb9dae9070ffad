//! Questionnaire
//!
//! The 25 lifestyle questions, each answered on a 1-7 scale.

use std::collections::HashMap;

use super::error::ValidationError;

pub const QUESTION_COUNT: usize = 25;
pub const MIN_ANSWER: u8 = 1;
pub const MAX_ANSWER: u8 = 7;
/// Neutral answer preselected for every question
pub const DEFAULT_ANSWER: u8 = 4;

pub const QUESTIONS: [&str; QUESTION_COUNT] = [
    "How clean do you like your living space?",
    "How important is it for your roommate to be quiet at night?",
    "How often do you like to have guests over?",
    "Do you prefer studying in silence or with background noise?",
    "How early do you usually wake up?",
    "How late do you usually stay up?",
    "How do you feel about sharing food with your roommate?",
    "How often do you cook in your living space?",
    "How important is it for you to have similar political views as your roommate?",
    "How comfortable are you with sharing personal belongings with your roommate?",
    "How often do you play music or watch TV in shared spaces?",
    "How well do you tolerate noise when sleeping?",
    "How often do you drink alcohol at home?",
    "How important is it for your roommate to have similar religious views?",
    "How often do you exercise at home?",
    "Do you prefer a structured or flexible household routine?",
    "How do you handle conflicts with roommates?",
    "How often do you clean shared spaces?",
    "How open are you to spontaneous social activities?",
    "How comfortable are you discussing personal matters with your roommate?",
    "How much alone time do you need daily?",
    "How do you feel about pets in the living space?",
    "How much do you value having a quiet space to relax?",
    "How often do you study or work at home?",
    "How important is it to have similar lifestyle habits as your roommate?",
];

/// A complete, validated set of answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionnaireAnswers(Vec<u8>);

impl QuestionnaireAnswers {
    /// Validate length and range
    pub fn new(answers: &[u8]) -> Result<Self, ValidationError> {
        if answers.len() != QUESTION_COUNT {
            return Err(ValidationError::IncompleteQuestionnaire {
                expected: QUESTION_COUNT,
                actual: answers.len(),
            });
        }

        if let Some((i, &value)) = answers
            .iter()
            .enumerate()
            .find(|(_, v)| !(MIN_ANSWER..=MAX_ANSWER).contains(*v))
        {
            return Err(ValidationError::AnswerOutOfRange {
                question: i + 1,
                value,
            });
        }

        Ok(Self(answers.to_vec()))
    }

    /// Every question answered with [`DEFAULT_ANSWER`]
    pub fn neutral() -> Self {
        Self(vec![DEFAULT_ANSWER; QUESTION_COUNT])
    }

    /// Rebuild from the `question1..question25` map stored by the backend
    ///
    /// Missing, null or out-of-range entries fall back to the neutral answer.
    pub fn from_stored(stored: &HashMap<String, Option<i64>>) -> Self {
        let answers = (1..=QUESTION_COUNT)
            .map(|n| {
                stored
                    .get(&format!("question{}", n))
                    .copied()
                    .flatten()
                    .and_then(|v| u8::try_from(v).ok())
                    .filter(|v| (MIN_ANSWER..=MAX_ANSWER).contains(v))
                    .unwrap_or(DEFAULT_ANSWER)
            })
            .collect();
        Self(answers)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Form fields `question1..question25` with stringified values
    pub fn to_form(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("question{}", i + 1), v.to_string()))
            .collect()
    }
}

impl Default for QuestionnaireAnswers {
    fn default() -> Self {
        Self::neutral()
    }
}

//! Questionnaire form

use super::scope::ViewScope;
use crate::api::questionnaire::{
    QuestionnaireAnswers, DEFAULT_ANSWER, MAX_ANSWER, MIN_ANSWER, QUESTIONS, QUESTION_COUNT,
};
use crate::api::{ApiClient, ValidationError};

pub const SUBMITTED_NOTICE: &str = "Questionnaire submitted successfully!";

#[derive(Debug)]
pub struct QuestionnaireForm {
    answers: Vec<u8>,
    /// Whether the backend has answers on file
    stored: bool,
    loading: bool,
    error: Option<String>,
    notice: Option<String>,
    scope: ViewScope,
}

impl Default for QuestionnaireForm {
    fn default() -> Self {
        Self {
            answers: vec![DEFAULT_ANSWER; QUESTION_COUNT],
            stored: false,
            loading: false,
            error: None,
            notice: None,
            scope: ViewScope::new(),
        }
    }
}

impl QuestionnaireForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Question texts paired with the current answers
    pub fn questions(&self) -> impl Iterator<Item = (&'static str, u8)> + '_ {
        QUESTIONS.iter().copied().zip(self.answers.iter().copied())
    }

    pub fn answers(&self) -> &[u8] {
        &self.answers
    }

    pub fn has_stored_answers(&self) -> bool {
        self.stored
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Set the answer for the question at `index` (0-based)
    pub fn set_answer(&mut self, index: usize, value: u8) -> Result<(), ValidationError> {
        if index >= QUESTION_COUNT {
            return Err(ValidationError::UnknownQuestion(index + 1));
        }
        if !(MIN_ANSWER..=MAX_ANSWER).contains(&value) {
            return Err(ValidationError::AnswerOutOfRange {
                question: index + 1,
                value,
            });
        }
        self.answers[index] = value;
        Ok(())
    }

    /// Replace every answer at once; length and range are checked
    pub fn set_answers(&mut self, answers: &[u8]) -> Result<(), ValidationError> {
        let answers = QuestionnaireAnswers::new(answers)?;
        self.answers = answers.as_slice().to_vec();
        Ok(())
    }

    /// Load stored answers, keeping the neutral defaults when there are none
    pub async fn load(&mut self, client: &ApiClient) -> bool {
        self.loading = true;
        let result = self.scope.run(client.fetch_responses()).await;
        self.loading = false;

        match result {
            None => false,
            Some(Ok(Some(stored))) => {
                self.answers = stored.as_slice().to_vec();
                self.stored = true;
                true
            }
            Some(Ok(None)) => {
                self.stored = false;
                true
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Failed to load questionnaire responses");
                self.error = Some(e.user_message());
                false
            }
        }
    }

    /// Submit, then reload what the backend stored
    pub async fn submit(&mut self, client: &ApiClient) -> bool {
        self.error = None;
        self.notice = None;

        let result = self
            .scope
            .run(client.submit_questionnaire(&self.answers))
            .await;

        match result {
            None => false,
            Some(Ok(_)) => {
                self.notice = Some(SUBMITTED_NOTICE.to_string());
                self.load(client).await;
                true
            }
            Some(Err(e)) => {
                self.error = Some(e.user_message());
                false
            }
        }
    }
}

//! RoomMatch REST Client
//!
//! HTTP client for the RoomMatch backend. Every call attaches the current
//! bearer token when a session exists and maps failures onto [`ApiError`].

use futures_util::future::join_all;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::dto::*;
use super::error::{extract_server_message, ApiError, ApiResult, ValidationError};
use super::questionnaire::QuestionnaireAnswers;
use crate::chat::{self, ChatError, ConversationId};
use crate::config::ApiConfig;
use crate::session::SessionManager;

/// REST client bound to one backend and one session
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    config: ApiConfig,
    session: Arc<SessionManager>,
}

impl ApiClient {
    /// Create a new client with the given configuration
    pub fn new(config: ApiConfig, session: Arc<SessionManager>) -> ApiResult<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::Setup(e.to_string()))?;

        Ok(Self {
            http,
            config,
            session,
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// The session this client authenticates with
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Token for calls that require a session
    fn bearer(&self) -> ApiResult<(String, String)> {
        let state = self.session.current_session();
        match state.session() {
            Some(s) => Ok((s.token.clone(), s.user_id.clone())),
            None => Err(ApiError::NotAuthenticated),
        }
    }

    fn require_admin(&self) -> ApiResult<String> {
        let state = self.session.current_session();
        match state.session() {
            Some(s) if s.is_admin => Ok(s.token.clone()),
            Some(_) => Err(ApiError::Forbidden),
            None => Err(ApiError::NotAuthenticated),
        }
    }

    /// Send a request and decode a JSON body
    async fn execute<T: DeserializeOwned>(
        &self,
        op: &'static str,
        request: RequestBuilder,
        token: Option<&str>,
    ) -> ApiResult<T> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let mut request = request.header("X-Request-Id", &request_id);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        tracing::debug!(op = op, request_id = %request_id, "Sending request");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                tracing::warn!(op = op, request_id = %request_id, "Request timed out");
            } else if e.is_connect() {
                tracing::warn!(op = op, request_id = %request_id, error = %e, "Backend unreachable");
            } else {
                tracing::warn!(op = op, request_id = %request_id, error = %e, "Request failed");
            }
            ApiError::Unreachable(e)
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(ApiError::Unreachable)?;

        if status.is_success() {
            return serde_json::from_slice(&body).map_err(|e| {
                tracing::warn!(op = op, request_id = %request_id, error = %e, "Unexpected response body");
                ApiError::InvalidResponse(e.to_string())
            });
        }

        let message = extract_server_message(&body)
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));

        // A late 401 for a token that was already replaced leaves the new session alone
        if let Some(token) = token.filter(|_| status == StatusCode::UNAUTHORIZED) {
            if self.session.invalidate_if(token, op).await {
                return Err(ApiError::Unauthorized(message));
            }
        }

        tracing::debug!(op = op, request_id = %request_id, status = status.as_u16(), message = %message, "Request rejected");
        Err(ApiError::Server {
            status: status.as_u16(),
            message,
        })
    }

    // ============ Auth ============

    /// Create an account
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        school: &str,
    ) -> ApiResult<RegisterResponse> {
        require("Email", email)?;
        require("Password", password)?;
        require("School", school)?;

        let body = RegisterRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
            school: school.trim().to_string(),
        };
        self.execute("register", self.http.post(self.url("/register")).json(&body), None)
            .await
    }

    /// Exchange credentials for a token and start a session
    pub async fn authenticate(&self, email: &str, password: &str) -> ApiResult<crate::session::Session> {
        require("Email", email)?;
        require("Password", password)?;

        let form = [("username", email.trim()), ("password", password)];
        let token: TokenResponse = self
            .execute("authenticate", self.http.post(self.url("/token")).form(&form), None)
            .await?;

        self.session
            .login(token.access_token, token.user_id)
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    /// Tell the backend the user left, then drop the local session
    ///
    /// The local logout happens even when the request fails.
    pub async fn sign_out(&self) {
        if let Ok((token, _)) = self.bearer() {
            let result: ApiResult<serde_json::Value> = self
                .execute("sign_out", self.http.post(self.url("/logout")), Some(&token))
                .await;
            if let Err(e) = result {
                tracing::debug!(error = %e, "Server logout failed");
            }
        }
        self.session.logout().await;
    }

    // ============ Profile ============

    pub async fn fetch_profile(&self) -> ApiResult<Profile> {
        let (token, _) = self.bearer()?;
        self.execute("fetch_profile", self.http.get(self.url("/user-profile")), Some(&token))
            .await
    }

    /// Submit profile edits as multipart form data
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<ProfileUpdateResponse> {
        let (token, _) = self.bearer()?;

        let mut form = reqwest::multipart::Form::new();
        for (name, value) in update.text_fields() {
            form = form.text(name, value);
        }
        if let Some(picture) = &update.picture {
            let part = reqwest::multipart::Part::bytes(picture.bytes.clone())
                .file_name(picture.file_name.clone())
                .mime_str(picture.mime_type())
                .map_err(|e| ApiError::Setup(e.to_string()))?;
            form = form.part("profile_picture", part);
        }

        self.execute(
            "update_profile",
            self.http.post(self.url("/update-profile")).multipart(form),
            Some(&token),
        )
        .await
    }

    /// Prompt texts offered on the profile page
    pub async fn fetch_prompts(&self) -> ApiResult<Vec<String>> {
        self.execute("fetch_prompts", self.http.get(self.url("/prompts")), None)
            .await
    }

    pub async fn fetch_match_profile(&self, id: &str) -> ApiResult<Profile> {
        let (token, _) = self.bearer()?;
        let path = format!("/user-profile/{}", urlencoding::encode(id));
        self.execute("fetch_match_profile", self.http.get(self.url(&path)), Some(&token))
            .await
    }

    // ============ Questionnaire ============

    /// Stored answers, `None` when the user hasn't submitted yet
    pub async fn fetch_responses(&self) -> ApiResult<Option<QuestionnaireAnswers>> {
        let (token, _) = self.bearer()?;
        let result: ApiResult<HashMap<String, Option<i64>>> = self
            .execute(
                "fetch_responses",
                self.http.get(self.url("/questionnaire/get-responses")),
                Some(&token),
            )
            .await;

        match result {
            Ok(stored) => Ok(Some(QuestionnaireAnswers::from_stored(&stored))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Submit all 25 answers; incomplete input is rejected without a request
    pub async fn submit_questionnaire(&self, answers: &[u8]) -> ApiResult<MessageResponse> {
        let answers = QuestionnaireAnswers::new(answers)?;
        let (token, _) = self.bearer()?;

        self.execute(
            "submit_questionnaire",
            self.http
                .post(self.url("/questionnaire/submit-questionnaire"))
                .form(&answers.to_form()),
            Some(&token),
        )
        .await
    }

    // ============ Matches ============

    /// Matches for the current user, each joined with the match's profile
    pub async fn list_matches(&self) -> ApiResult<Vec<Match>> {
        let (token, user_id) = self.bearer()?;

        let results: Vec<MatchResult> = match self
            .execute("list_matches", self.http.get(self.url("/match-results")), Some(&token))
            .await
        {
            Ok(results) => results,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let profiles = join_all(
            results
                .iter()
                .map(|result| self.fetch_match_profile(&result.match_id)),
        )
        .await;

        let matches = results
            .into_iter()
            .zip(profiles)
            .map(|(result, profile)| {
                let profile = match profile {
                    Ok(profile) => Some(profile),
                    Err(e) => {
                        tracing::warn!(match_id = %result.match_id, error = %e, "Failed to load match profile");
                        None
                    }
                };
                Match {
                    user_id: user_id.clone(),
                    match_id: result.match_id,
                    display_name: result.display_name,
                    score: result.score,
                    profile,
                }
            })
            .collect();

        Ok(matches)
    }

    pub async fn match_notification(&self) -> ApiResult<MatchNotification> {
        let (token, _) = self.bearer()?;
        self.execute(
            "match_notification",
            self.http.post(self.url("/match/notify")),
            Some(&token),
        )
        .await
    }

    pub async fn request_new_match(&self) -> ApiResult<MessageResponse> {
        let (token, _) = self.bearer()?;
        self.execute(
            "request_new_match",
            self.http.post(self.url("/request-new-match")),
            Some(&token),
        )
        .await
    }

    // ============ Chat ============

    /// Stored history between two users, oldest first
    pub async fn list_messages(&self, user_id: &str, match_id: &str) -> ApiResult<Vec<ChatMessage>> {
        let (token, _) = self.bearer()?;
        let path = format!(
            "/chat/messages/{}/{}",
            urlencoding::encode(user_id),
            urlencoding::encode(match_id)
        );
        self.execute("list_messages", self.http.get(self.url(&path)), Some(&token))
            .await
    }

    pub async fn send_message(
        &self,
        user_id: &str,
        match_id: &str,
        content: &str,
    ) -> ApiResult<MessageResponse> {
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }
        let (token, _) = self.bearer()?;

        let path = format!(
            "/chat/messages/{}/{}",
            urlencoding::encode(user_id),
            urlencoding::encode(match_id)
        );
        let body = SendMessageRequest {
            content: content.to_string(),
        };
        self.execute(
            "send_message",
            self.http.post(self.url(&path)).json(&body),
            Some(&token),
        )
        .await
    }

    /// WebSocket origin, from config or derived from the REST origin
    pub fn ws_origin(&self) -> Result<String, ChatError> {
        match &self.config.ws_url {
            Some(url) => Ok(url.clone()),
            None => chat::ws_origin(&self.config.base_url),
        }
    }

    /// Socket URL for a conversation between `user_id` and `peer_id`
    pub fn chat_socket_url(&self, conversation: &ConversationId) -> Result<String, ChatError> {
        Ok(chat::socket_url(&self.ws_origin()?, conversation))
    }

    // ============ Admin ============

    pub async fn admin_user_status(&self) -> ApiResult<UserStatus> {
        let token = self.require_admin()?;
        self.execute(
            "admin_user_status",
            self.http.get(self.url("/admin/user-status")),
            Some(&token),
        )
        .await
    }

    /// Trigger a matching run and return the pairings it produced
    pub async fn admin_match_users(&self) -> ApiResult<Vec<Pairing>> {
        let token = self.require_admin()?;
        let response: PairingsResponse = self
            .execute(
                "admin_match_users",
                self.http.post(self.url("/admin/match-users")),
                Some(&token),
            )
            .await?;
        tracing::info!(pairings = response.matches.len(), "Matching run completed");
        Ok(response.matches)
    }

    /// Current pairings; empty when none exist yet
    pub async fn admin_pairings(&self) -> ApiResult<Vec<Pairing>> {
        let (token, _) = self.bearer()?;
        let result: ApiResult<PairingsResponse> = self
            .execute("admin_pairings", self.http.get(self.url("/matches")), Some(&token))
            .await;
        match result {
            Ok(response) => Ok(response.matches),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    // ============ Assets ============

    /// Absolute URL for a backend-relative asset path such as a profile picture
    pub fn resolve_asset_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.config.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

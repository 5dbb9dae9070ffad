//! Data Transfer Objects
//!
//! Request and response types for the RoomMatch backend.
//! The backend returns numeric ids in some places and strings in others,
//! so every id is read leniently and normalised to a `String`.

use serde::{Deserialize, Deserializer, Serialize};

// ============================================
// ID HELPERS
// ============================================

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Text(String),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Int(n) => n.to_string(),
            RawId::Text(s) => s,
        }
    }
}

/// Accept an id as either a JSON number or string
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

/// Like [`deserialize_id`] but tolerates `null`
pub(crate) fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}

// ============================================
// AUTH DTOs
// ============================================

/// Account registration request
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub school: String,
}

/// Account registration response
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Token issued by `POST /token`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub user_id: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

// ============================================
// PROFILE DTOs
// ============================================

/// One of the three prompt/response pairs on a profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptAnswer {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub response: String,
}

/// A user profile as returned by `/user-profile`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, deserialize_with = "deserialize_text")]
    pub email: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub school: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub hometown: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub major: String,
    /// Free text, e.g. "2027"
    #[serde(default, deserialize_with = "deserialize_text")]
    pub graduation_year: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub interests: String,
    /// Path relative to the backend origin
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub prompts: Vec<PromptAnswer>,
}

/// Text field that may arrive as a number or `null`
fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?
        .map(String::from)
        .unwrap_or_default())
}

/// Picture attached to a profile update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePicture {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ProfilePicture {
    /// MIME type guessed from the file extension
    pub fn mime_type(&self) -> &'static str {
        let ext = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => "application/octet-stream",
        }
    }
}

/// Editable profile fields, sent as multipart to `/update-profile`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub hometown: String,
    pub major: String,
    pub graduation_year: String,
    pub interests: String,
    pub prompts: [PromptAnswer; 3],
    pub picture: Option<ProfilePicture>,
}

impl ProfileUpdate {
    /// Start an update from the currently stored profile
    pub fn from_profile(profile: &Profile) -> Self {
        let mut prompts: [PromptAnswer; 3] = Default::default();
        for (slot, answer) in prompts.iter_mut().zip(profile.prompts.iter()) {
            *slot = answer.clone();
        }

        Self {
            hometown: profile.hometown.clone(),
            major: profile.major.clone(),
            graduation_year: profile.graduation_year.clone(),
            interests: profile.interests.clone(),
            prompts,
            picture: None,
        }
    }

    /// Text fields in the order the backend's form expects
    pub fn text_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("hometown".to_string(), self.hometown.clone()),
            ("major".to_string(), self.major.clone()),
            ("graduation_year".to_string(), self.graduation_year.clone()),
            ("interests".to_string(), self.interests.clone()),
        ];
        for (i, answer) in self.prompts.iter().enumerate() {
            fields.push((format!("selected_prompt{}", i + 1), answer.prompt.clone()));
            fields.push((format!("response{}", i + 1), answer.response.clone()));
        }
        fields
    }
}

/// Response to a profile update
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdateResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

// ============================================
// MATCH DTOs
// ============================================

/// Entry of `/match-results`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MatchResult {
    #[serde(rename = "matchId", deserialize_with = "deserialize_id")]
    pub match_id: String,
    /// The matched user's email
    #[serde(rename = "match", default)]
    pub display_name: String,
    #[serde(default)]
    pub score: f64,
}

/// A match combined with the matched user's profile
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// The logged-in user
    pub user_id: String,
    pub match_id: String,
    pub display_name: String,
    pub score: f64,
    /// `None` when the profile fetch failed
    pub profile: Option<Profile>,
}

impl Match {
    /// Score rounded to two decimals
    pub fn score_label(&self) -> String {
        format!("{:.2}", self.score)
    }
}

/// Response of `/match/notify`
#[derive(Debug, Clone, Deserialize)]
pub struct MatchNotification {
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub match_id: Option<String>,
}

// ============================================
// CHAT DTOs
// ============================================

/// A chat message as stored by the backend or produced locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(deserialize_with = "deserialize_id")]
    pub sender: String,
    pub content: String,
    /// ISO-8601
    #[serde(default, deserialize_with = "deserialize_text")]
    pub timestamp: String,
}

/// Body of `POST /chat/messages/{user}/{match}`
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// Generic `{ "message": ... }` reply
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

// ============================================
// ADMIN DTOs
// ============================================

/// Response of `/admin/user-status`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserStatus {
    #[serde(default)]
    pub unmatched_users: u64,
    #[serde(default)]
    pub matched_users: u64,
}

/// Two users paired by a matching run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Pairing {
    #[serde(deserialize_with = "deserialize_id")]
    pub user1: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub user2: String,
}

/// `{ "matches": [...] }` envelope used by the admin endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PairingsResponse {
    #[serde(default)]
    pub matches: Vec<Pairing>,
}

//! Profile editor

use super::scope::ViewScope;
use crate::api::dto::{Profile, ProfilePicture, ProfileUpdate};
use crate::api::ApiClient;

pub const UPDATED_NOTICE: &str = "Profile updated successfully!";

#[derive(Debug, Default)]
pub struct ProfileEditor {
    profile: Option<Profile>,
    prompts: Vec<String>,
    draft: ProfileUpdate,
    loading: bool,
    error: Option<String>,
    notice: Option<String>,
    scope: ViewScope,
}

impl ProfileEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Prompt texts the user can pick from
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn draft(&self) -> &ProfileUpdate {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut ProfileUpdate {
        &mut self.draft
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

    pub fn attach_picture(&mut self, file_name: impl Into<String>, bytes: Vec<u8>) {
        self.draft.picture = Some(ProfilePicture {
            file_name: file_name.into(),
            bytes,
        });
    }

    /// Absolute URL of the stored profile picture
    pub fn picture_url(&self, client: &ApiClient) -> Option<String> {
        self.profile
            .as_ref()
            .and_then(|p| p.profile_picture.as_deref())
            .map(|path| client.resolve_asset_url(path))
    }

    /// Fetch the profile and the prompt list; the draft starts from the profile
    pub async fn load(&mut self, client: &ApiClient) -> bool {
        self.loading = true;
        self.error = None;
        let result = self
            .scope
            .run(async { tokio::join!(client.fetch_profile(), client.fetch_prompts()) })
            .await;
        self.loading = false;

        let Some((profile, prompts)) = result else {
            return false;
        };

        match prompts {
            Ok(prompts) => self.prompts = prompts,
            Err(e) => tracing::warn!(error = %e, "Failed to load prompts"),
        }

        match profile {
            Ok(profile) => {
                self.draft = ProfileUpdate::from_profile(&profile);
                self.profile = Some(profile);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load profile");
                self.error = Some(e.user_message());
                false
            }
        }
    }

    /// Send the draft; the profile is reloaded afterwards
    pub async fn submit(&mut self, client: &ApiClient) -> bool {
        self.error = None;
        self.notice = None;

        let result = self.scope.run(client.update_profile(&self.draft)).await;
        match result {
            None => false,
            Some(Ok(response)) => {
                tracing::debug!(message = %response.message, "Profile updated");
                self.notice = Some(UPDATED_NOTICE.to_string());
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::session::{MemoryStorage, SessionManager};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_load_without_session() {
        let session = Arc::new(SessionManager::new(Arc::new(MemoryStorage::new())));
        let client = ApiClient::new(ApiConfig::with_base_url("http://127.0.0.1:9"), session).unwrap();

        let mut editor = ProfileEditor::new();
        assert!(!editor.load(&client).await);
        assert_eq!(editor.error(), Some("Please log in to continue."));
        assert!(editor.picture_url(&client).is_none());
    }

    #[test]
    fn test_attach_picture() {
        let mut editor = ProfileEditor::new();
        editor.draft_mut().hometown = "Claremont".into();
        editor.attach_picture("me.png", vec![1, 2, 3]);

        assert_eq!(editor.draft().hometown, "Claremont");
        assert_eq!(editor.draft().picture.as_ref().map(|p| p.mime_type()), Some("image/png"));
    }
}

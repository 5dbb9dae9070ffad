//! View models
//!
//! Headless state for each screen: loading flags, error and notice text,
//! and the actions a screen offers. Rendering is left to the front end.
//!
//! Each view owns a [`ViewScope`]; once the view is dropped, results of
//! requests it started are discarded.

pub mod admin;
pub mod auth;
pub mod chat;
pub mod matches;
pub mod profile;
pub mod questionnaire;
pub mod scope;

pub use admin::AdminDashboard;
pub use auth::{matching_schools, LoginForm, RegisterForm, SCHOOLS};
pub use chat::ChatView;
pub use matches::MatchListView;
pub use profile::ProfileEditor;
pub use questionnaire::QuestionnaireForm;
pub use scope::{ViewHandle, ViewScope};

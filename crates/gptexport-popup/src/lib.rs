//! Popup — export configuration and account views.
//!
//! Translates one Export press into one `popup-export` request to the
//! background and surfaces the single reply as a toast.

pub mod auth;
pub mod controller;
pub mod forms;

pub use auth::{AuthGate, AuthRecord, AuthState, Credentials, AUTH_KEY};
pub use controller::{AccountMode, PopupController, View};
pub use forms::{CredentialsForm, ExportSettingsForm};

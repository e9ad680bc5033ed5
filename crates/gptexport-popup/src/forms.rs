//! Form state behind the popup views.

use gptexport_protocol::{ExportFormat, ExportRequest, IncludeMessages};

use crate::auth::Credentials;

/// Export configuration form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettingsForm {
    pub format: ExportFormat,
    pub include_messages: IncludeMessages,
}

impl Default for ExportSettingsForm {
    fn default() -> Self {
        Self::new(ExportFormat::Pdf)
    }
}

impl ExportSettingsForm {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            include_messages: IncludeMessages::all(),
        }
    }

    pub fn set_format(&mut self, format: ExportFormat) {
        self.format = format;
    }

    pub fn set_user(&mut self, checked: bool) {
        self.include_messages.user = checked;
    }

    pub fn set_assistant(&mut self, checked: bool) {
        self.include_messages.assistant = checked;
    }

    /// The Export button is enabled iff at least one message kind is checked.
    pub fn export_enabled(&self) -> bool {
        self.include_messages.is_valid()
    }

    pub fn validation_message(&self) -> Option<&'static str> {
        if self.export_enabled() {
            None
        } else {
            Some("Please select at least one message type")
        }
    }

    pub fn button_label(&self) -> String {
        format!("Export as {}", self.format.label())
    }

    pub fn status_text(&self) -> &'static str {
        self.include_messages.summary()
    }

    pub fn to_request(&self) -> ExportRequest {
        ExportRequest::new(self.format, self.include_messages)
    }
}

/// Username/password form shared by sign-in and sign-up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
    pub username_error: Option<&'static str>,
    pub password_error: Option<&'static str>,
}

impl CredentialsForm {
    pub fn fill(&mut self, username: &str, password: &str) {
        self.username = username.to_string();
        self.password = password.to_string();
    }

    /// Check required fields, recording errors inline next to each field.
    pub fn validate(&mut self) -> Option<Credentials> {
        self.username_error = self
            .username
            .is_empty()
            .then_some("Username is required");
        self.password_error = self
            .password
            .is_empty()
            .then_some("Password is required");
        if self.username_error.is_some() || self.password_error.is_some() {
            return None;
        }
        Some(Credentials::new(self.username.clone(), self.password.clone()))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_enabled_iff_any_flag() {
        let mut form = ExportSettingsForm::default();
        for (user, assistant) in [(true, true), (true, false), (false, true), (false, false)] {
            form.set_user(user);
            form.set_assistant(assistant);
            assert_eq!(form.export_enabled(), user || assistant);
            assert_eq!(form.validation_message().is_some(), !(user || assistant));
        }
        assert_eq!(form.status_text(), "No messages selected");
    }

    #[test]
    fn test_defaults_and_labels() {
        let mut form = ExportSettingsForm::default();
        assert_eq!(form.format, ExportFormat::Pdf);
        assert_eq!(form.button_label(), "Export as PDF Document");
        form.set_format(ExportFormat::Markdown);
        assert_eq!(form.button_label(), "Export as Markdown");
        assert_eq!(form.to_request().format, ExportFormat::Markdown);
    }

    #[test]
    fn test_credentials_required_fields() {
        let mut form = CredentialsForm::default();
        assert!(form.validate().is_none());
        assert_eq!(form.username_error, Some("Username is required"));
        assert_eq!(form.password_error, Some("Password is required"));

        form.fill("someone", "");
        assert!(form.validate().is_none());
        assert_eq!(form.username_error, None);

        form.fill("someone", "secret");
        assert_eq!(form.validate(), Some(Credentials::new("someone", "secret")));

        form.reset();
        assert!(form.username.is_empty());
    }
}

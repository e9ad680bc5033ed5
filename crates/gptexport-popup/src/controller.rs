//! Popup controller: view switching, the Export action, account actions.

use std::sync::Arc;
use std::time::Duration;

use gptexport_core::{Error, LocalStorage, Result};
use gptexport_protocol::{
    Endpoint, ExportFormat, MessageBus, PopupExportResponse, Request, Toast, Toaster,
    LAST_EXPORT_KEY,
};
use tracing::{error, info, warn};

use crate::auth::AuthGate;
use crate::forms::{CredentialsForm, ExportSettingsForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Export,
    Account,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountMode {
    Account,
    SignIn,
    SignUp,
}

const INVALID_CREDENTIALS: &str = "Invalid credentials. Use username: test, password: test";

pub struct PopupController {
    bus: Arc<dyn MessageBus>,
    storage: Arc<dyn LocalStorage>,
    toaster: Arc<dyn Toaster>,
    reply_timeout: Duration,
    view: View,
    account_mode: AccountMode,
    pub export_form: ExportSettingsForm,
    pub sign_in_form: CredentialsForm,
    pub sign_up_form: CredentialsForm,
    auth: AuthGate,
}

impl PopupController {
    /// Open the popup: reads the auth record once.
    pub fn open(
        bus: Arc<dyn MessageBus>,
        storage: Arc<dyn LocalStorage>,
        toaster: Arc<dyn Toaster>,
        default_format: ExportFormat,
        reply_timeout: Duration,
    ) -> Self {
        let mut auth = AuthGate::new(storage.clone());
        auth.load();
        Self {
            bus,
            storage,
            toaster,
            reply_timeout,
            view: View::Export,
            account_mode: AccountMode::Account,
            export_form: ExportSettingsForm::new(default_format),
            sign_in_form: CredentialsForm::default(),
            sign_up_form: CredentialsForm::default(),
            auth,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn account_mode(&self) -> AccountMode {
        self.account_mode
    }

    pub fn auth(&self) -> &AuthGate {
        &self.auth
    }

    pub fn show_export(&mut self) {
        self.view = View::Export;
    }

    pub fn show_account(&mut self) {
        self.view = View::Account;
    }

    pub fn open_sign_in(&mut self) {
        self.account_mode = AccountMode::SignIn;
    }

    pub fn open_sign_up(&mut self) {
        self.account_mode = AccountMode::SignUp;
    }

    pub fn back_to_account(&mut self) {
        self.account_mode = AccountMode::Account;
    }

    /// Send one `popup-export` and surface the reply as a toast.
    pub async fn export(&mut self) -> Result<PopupExportResponse> {
        let request = self.export_form.to_request();
        request.validate()?;
        info!("Export configuration: {:?}", request);

        let outcome = match tokio::time::timeout(
            self.reply_timeout,
            self.bus.send(Endpoint::Background, Request::PopupExport(request)),
        )
        .await
        {
            Ok(reply) => reply.and_then(|r| r.into_popup_export()),
            Err(_) => Err(Error::Timeout {
                endpoint: Endpoint::Background.to_string(),
                timeout_ms: self.reply_timeout.as_millis() as u64,
            }),
        };

        match outcome {
            Ok(response) => {
                let delivered = response.success
                    && response.response.as_ref().map_or(false, |r| r.is_success());
                if delivered {
                    self.remember(&request);
                    self.toaster
                        .toast(Toast::Success("Export completed successfully!".into()));
                } else {
                    warn!("Export response: {:?}", response);
                    self.toaster
                        .toast(Toast::Error("Export failed. Please try again.".into()));
                }
                Ok(response)
            }
            Err(e) => {
                error!("Export failed: {}", e);
                self.toaster
                    .toast(Toast::Error("Export failed. Please try again.".into()));
                Err(e)
            }
        }
    }

    fn remember(&self, request: &gptexport_protocol::ExportRequest) {
        let stored = serde_json::to_value(request)
            .map_err(Error::from)
            .and_then(|v| self.storage.set(LAST_EXPORT_KEY, v));
        if let Err(e) = stored {
            warn!("Failed to remember export settings: {}", e);
        }
    }

    pub fn submit_sign_in(&mut self) -> bool {
        let Some(credentials) = self.sign_in_form.validate() else {
            return false;
        };
        if self.auth.sign_in(&credentials) {
            self.toaster
                .toast(Toast::Success("Welcome back to your pro account!".into()));
            self.account_mode = AccountMode::Account;
            true
        } else {
            self.toaster.toast(Toast::Error(INVALID_CREDENTIALS.into()));
            false
        }
    }

    pub fn submit_sign_up(&mut self) -> bool {
        let Some(credentials) = self.sign_up_form.validate() else {
            return false;
        };
        if self.auth.sign_up(&credentials) {
            self.toaster.toast(Toast::Success(
                "Your pro account has been created successfully!".into(),
            ));
            self.account_mode = AccountMode::Account;
            true
        } else {
            self.toaster.toast(Toast::Error(INVALID_CREDENTIALS.into()));
            false
        }
    }

    pub fn sign_out(&mut self) {
        self.auth.sign_out();
        self.sign_in_form.reset();
        self.sign_up_form.reset();
        self.toaster
            .toast(Toast::Success("You have been successfully signed out.".into()));
    }
}

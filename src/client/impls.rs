use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::{error, info, warn};

use crate::{
    FormFlowClient,
    config::Config,
    errors::Error,
    session,
    store::TokenStore,
    telemetry::refresh::RefreshTelemetry,
    types::{
        ApiErrorResponse, AuthResponse, Attachment, EntryDraft, LoginRequest, OtpRequest,
        OtpResponse, OtpValidateRequest, ProfileUpdate, RefreshRequest, RefreshResponse,
        RegisterRequest, SubmissionReceipt, UserProfile,
    },
};

const USER_AGENT: &str = "formflow-client-rust-sdk/0.1.0";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

impl FormFlowClient {
    /// Create a new FormFlowClient
    /// # Arguments
    /// * `config` - Explicit configuration, typically loaded via
    ///   `Config::load` with a `ConfigLocation`.
    /// # ENV Vars (when using `ConfigLocation::Env`)
    /// * `FORMFLOW_URL` - API base URL
    /// * `FORMFLOW_STORAGE_PATH` - Path of the persisted session file
    /// * `FORMFLOW_TIMEOUT_SECS` - Optional request timeout
    pub fn new(config: Config) -> Result<Self, Error> {
        let base_url = config.normalized_base_url()?;
        let timeout = config.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            base_url,
            store: Arc::new(TokenStore::new(config.storage_path)),
        })
    }

    /// The session store backing this client.
    pub fn store(&self) -> Arc<TokenStore> {
        Arc::clone(&self.store)
    }

    pub async fn is_authenticated(&self) -> bool {
        session::is_authenticated(&self.store).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, Error> {
        let url = format!("{}/login", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let auth: AuthResponse = Self::parse_success(resp).await?;
        self.persist_session(&auth).await;
        info!("login ok: user='{}'", auth.user.id);
        Ok(auth.user)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, Error> {
        let url = format!("{}/register", self.base_url);
        let resp = self.http.post(&url).json(request).send().await?;
        let auth: AuthResponse = Self::parse_success(resp).await?;
        self.persist_session(&auth).await;
        info!("register ok: user='{}'", auth.user.id);
        Ok(auth.user)
    }

    /// Fetches the profile and overwrites the cached snapshot wholesale.
    pub async fn me(&self) -> Result<UserProfile, Error> {
        let url = format!("{}/me", self.base_url);
        let resp = self.send_authorized("/me", || self.http.get(&url)).await?;
        let user: UserProfile = Self::parse_success(resp).await?;
        self.store.set_user(&user).await;
        Ok(user)
    }

    /// Exchanges the stored refresh token for a new access token. On
    /// failure the session is cleared.
    pub async fn refresh(&self) -> Result<(), Error> {
        let telemetry = RefreshTelemetry::new("/refresh");
        self.run_refresh(&telemetry).await.map(|_| ())
    }

    pub async fn generate_otp(&self, phone: &str) -> Result<OtpResponse, Error> {
        let url = format!("{}/otp/generate", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&OtpRequest {
                phone: phone.to_string(),
            })
            .send()
            .await?;
        let otp: OtpResponse = Self::parse_success(resp).await?;
        info!("otp generated: sent={}", otp.sent);
        Ok(otp)
    }

    /// A successful validation is a login: tokens and the profile snapshot
    /// are persisted exactly as for `login`.
    pub async fn validate_otp(&self, phone: &str, code: &str) -> Result<UserProfile, Error> {
        let url = format!("{}/otp/validate", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&OtpValidateRequest {
                phone: phone.to_string(),
                code: code.to_string(),
            })
            .send()
            .await?;
        let auth: AuthResponse = Self::parse_success(resp).await?;
        self.persist_session(&auth).await;
        info!("otp validated: user='{}'", auth.user.id);
        Ok(auth.user)
    }

    pub async fn resend_otp(&self, phone: &str) -> Result<OtpResponse, Error> {
        let url = format!("{}/otp/resend", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&OtpRequest {
                phone: phone.to_string(),
            })
            .send()
            .await?;
        Self::parse_success(resp).await
    }

    /// Sends changed fields (and an optional avatar) as multipart form
    /// data; the server replies with the updated profile, which replaces
    /// the cached snapshot.
    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
        avatar: Option<&Attachment>,
    ) -> Result<UserProfile, Error> {
        let url = format!("{}/me/update", self.base_url);
        let resp = self
            .send_authorized("/me/update", || {
                let mut form = Form::new();
                if let Some(first_name) = &update.first_name {
                    form = form.text("firstName", first_name.clone());
                }
                if let Some(last_name) = &update.last_name {
                    form = form.text("lastName", last_name.clone());
                }
                if let Some(phone) = &update.phone {
                    form = form.text("phone", phone.clone());
                }
                if let Some(locale) = &update.locale {
                    form = form.text("locale", locale.clone());
                }
                if let Some(enabled) = update.notifications_enabled {
                    form = form.text("notificationsEnabled", enabled.to_string());
                }
                if let Some(avatar) = avatar {
                    form = form.part("avatar", attachment_part(avatar));
                }
                self.http.post(&url).multipart(form)
            })
            .await?;
        let user: UserProfile = Self::parse_success(resp).await?;
        self.store.set_user(&user).await;
        info!("profile updated: user='{}'", user.id);
        Ok(user)
    }

    /// Uploads a collected entry: the serialized answers as the `payload`
    /// part plus one `attachments` part per file.
    pub async fn submit_entry(&self, draft: &EntryDraft) -> Result<SubmissionReceipt, Error> {
        let payload = serde_json::to_string(&draft.payload)?;
        let url = format!("{}/submissions", self.base_url);
        let resp = self
            .send_authorized("/submissions", || {
                let mut form = Form::new()
                    .text("formId", draft.form_id.clone())
                    .text("payload", payload.clone());
                for attachment in &draft.attachments {
                    form = form.part("attachments", attachment_part(attachment));
                }
                self.http.post(&url).multipart(form)
            })
            .await?;
        let receipt: SubmissionReceipt = Self::parse_success(resp).await?;
        info!(
            "entry submitted: id='{}' form='{}'",
            receipt.id, receipt.form_id
        );
        Ok(receipt)
    }

    /// Local-only: clears the persisted session. No server call is made.
    pub async fn logout(&self) -> bool {
        info!("logging out; clearing local session");
        self.store.clear().await
    }

    /// Sends a bearer-authorized request, replaying it exactly once after
    /// a 401 if a refresh succeeds. The closure rebuilds the request for
    /// each attempt (multipart bodies cannot be cloned). Concurrent
    /// requests each run their own refresh; the store's last writer wins.
    async fn send_authorized<F>(&self, endpoint: &str, mut build: F) -> Result<Response, Error>
    where
        F: FnMut() -> RequestBuilder,
    {
        let Some(access) = self.store.access_token().await else {
            warn!("authorized call without a session: endpoint='{}'", endpoint);
            return Err(Error::Unauthorized);
        };

        let resp = build()
            .header("Authorization", format!("Bearer {access}"))
            .send()
            .await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        warn!("401 received: endpoint='{}'; refreshing session", endpoint);
        let telemetry = RefreshTelemetry::new(endpoint);
        let access = self.run_refresh(&telemetry).await?;

        let retry = build()
            .header("Authorization", format!("Bearer {access}"))
            .send()
            .await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            // The refresh itself succeeded, so the new tokens stay put.
            error!("still unauthorized after refresh: endpoint='{}'", endpoint);
            return Err(Error::Unauthorized);
        }
        Ok(retry)
    }

    /// One refresh attempt. Success persists the new access token (and the
    /// refresh token when rotated) and returns the access token; failure
    /// clears the session and surfaces `Unauthorized`.
    async fn run_refresh(&self, telemetry: &RefreshTelemetry) -> Result<String, Error> {
        let Some(refresh) = self.store.refresh_token().await else {
            warn!("no refresh token; clearing session");
            self.store.clear().await;
            return Err(Error::Unauthorized);
        };

        telemetry.emit_start();
        match self.request_refresh(&refresh).await {
            Ok(refreshed) => {
                telemetry.emit_success(refreshed.refresh_token.is_some());
                match &refreshed.refresh_token {
                    Some(rotated) => {
                        self.store
                            .set_tokens(&refreshed.access_token, rotated)
                            .await
                    }
                    None => self.store.set_access(&refreshed.access_token).await,
                };
                Ok(refreshed.access_token)
            }
            Err(err) => {
                telemetry.emit_failure(&err);
                self.store.clear().await;
                Err(Error::Unauthorized)
            }
        }
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<RefreshResponse, Error> {
        let url = format!("{}/refresh", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&RefreshRequest {
                refresh_token: refresh_token.to_string(),
            })
            .send()
            .await?;
        Self::parse_success(resp).await
    }

    async fn persist_session(&self, auth: &AuthResponse) {
        self.store
            .set_tokens(&auth.access_token, &auth.refresh_token)
            .await;
        self.store.set_user(&auth.user).await;
    }

    async fn parse_success<T>(resp: Response) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
    {
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            error!("api error: status={} message='{}'", status, message);
            return Err(Error::Api(status, message));
        }
        Ok(resp.json().await?)
    }
}

fn attachment_part(attachment: &Attachment) -> Part {
    let part = Part::bytes(attachment.bytes.clone()).file_name(attachment.file_name.clone());
    match part.mime_str(&attachment.mime_type) {
        Ok(part) => part,
        Err(err) => {
            warn!(
                "invalid mime type '{}' on '{}'; sending without one: {}",
                attachment.mime_type, attachment.file_name, err
            );
            Part::bytes(attachment.bytes.clone()).file_name(attachment.file_name.clone())
        }
    }
}

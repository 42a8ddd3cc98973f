use std::sync::Arc;

use axum::http::StatusCode;
use thiserror::Error;

use super::anthropic::{CompletionClient, CompletionError, CompletionRequest};
use super::models::{CoachRequest, CoachResponse, PromptMode};
use super::prompts::{render, strip_code_fences, truncate_chars};
use crate::clock::Clock;
use crate::config::{AppConfig, PricingConfig};
use crate::error::HttpError;
use crate::impl_into_response;
use crate::quota::{Admission, UsageLimiter};

/// Key used when a request carries neither a user id nor a forwarding header
const ANONYMOUS_USER: &str = "anon";

/// Characters of the user key written to the monitoring log
const LOGGED_USER_CHARS: usize = 8;

/// Characters of unparseable model output written to the log
const LOGGED_OUTPUT_CHARS: usize = 200;

#[derive(Error, Debug)]
pub enum CoachError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("AI features are temporarily paused. Try again later! 🔧")]
    ServicePaused,

    #[error("Missing prompt or mode")]
    MissingField,

    #[error("LearnBot is resting — too many students today! Try again tomorrow. 📚")]
    GlobalQuotaExceeded,

    #[error("Slow down! Take a break and try again in a bit. ⏳")]
    UserQuotaExceeded,

    #[error("Invalid mode")]
    InvalidMode,

    #[error("AI is busy, try again in a moment.")]
    UpstreamRateLimited,

    #[error("AI service error")]
    UpstreamServiceError,

    #[error("Failed to parse AI response")]
    ResponseParseError,

    #[error("Internal server error")]
    InternalError,
}

impl HttpError for CoachError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::ServicePaused => StatusCode::SERVICE_UNAVAILABLE,
            Self::MissingField | Self::InvalidMode => StatusCode::BAD_REQUEST,
            Self::GlobalQuotaExceeded | Self::UserQuotaExceeded | Self::UpstreamRateLimited => {
                StatusCode::TOO_MANY_REQUESTS
            }
            Self::UpstreamServiceError | Self::ResponseParseError | Self::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::ServicePaused => "SERVICE_PAUSED",
            Self::MissingField => "MISSING_FIELD",
            Self::GlobalQuotaExceeded => "GLOBAL_QUOTA_EXCEEDED",
            Self::UserQuotaExceeded => "USER_QUOTA_EXCEEDED",
            Self::InvalidMode => "INVALID_MODE",
            Self::UpstreamRateLimited => "UPSTREAM_RATE_LIMITED",
            Self::UpstreamServiceError => "UPSTREAM_SERVICE_ERROR",
            Self::ResponseParseError => "RESPONSE_PARSE_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl_into_response!(CoachError);

impl From<CompletionError> for CoachError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::RateLimited => Self::UpstreamRateLimited,
            CompletionError::Status(_) => Self::UpstreamServiceError,
            CompletionError::Transport(e) => {
                tracing::error!(error = %e, "Completion API unreachable");
                Self::InternalError
            }
            CompletionError::Decode(_) => Self::InternalError,
        }
    }
}

/// Request-independent settings the service needs from the app config
#[derive(Debug, Clone)]
pub struct CoachSettings {
    pub kill_switch: bool,
    pub max_prompt_chars: usize,
    pub model: String,
    pub pricing: PricingConfig,
}

impl From<&AppConfig> for CoachSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            kill_switch: config.api_kill_switch,
            max_prompt_chars: config.max_prompt_chars,
            model: config.upstream.model.clone(),
            pricing: config.pricing,
        }
    }
}

/// Snapshot of the daily budget
#[derive(Debug, Clone, Copy)]
pub struct UsageSnapshot {
    pub used_today: u32,
    pub daily_limit: u32,
}

pub struct CoachService {
    settings: CoachSettings,
    limiter: Arc<UsageLimiter>,
    client: Arc<dyn CompletionClient>,
    clock: Arc<dyn Clock>,
}

impl CoachService {
    pub fn new(
        settings: CoachSettings,
        limiter: Arc<UsageLimiter>,
        client: Arc<dyn CompletionClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            limiter,
            client,
            clock,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.settings.kill_switch
    }

    pub fn usage(&self) -> UsageSnapshot {
        UsageSnapshot {
            used_today: self.limiter.used_today(self.clock.today()),
            daily_limit: self.limiter.daily_limit(),
        }
    }

    /// Run one study request through kill switch, quotas, templating, the
    /// completion call and output parsing.
    ///
    /// `forwarded_for` is the client address reported by the proxy, used as
    /// the user key when the body has no `userId`.
    pub async fn generate(
        &self,
        request: CoachRequest,
        forwarded_for: Option<&str>,
    ) -> Result<CoachResponse, CoachError> {
        if self.settings.kill_switch {
            return Err(CoachError::ServicePaused);
        }

        let (Some(prompt), Some(mode)) = (
            non_empty(request.prompt.as_deref()),
            non_empty(request.mode.as_deref()),
        ) else {
            return Err(CoachError::MissingField);
        };

        let user_key = non_empty(request.user_id.as_deref())
            .or(non_empty(forwarded_for))
            .unwrap_or(ANONYMOUS_USER);

        let used_today = match self.limiter.admit(user_key, self.clock.now()) {
            Admission::Admitted { used_today } => used_today,
            Admission::GlobalExhausted => return Err(CoachError::GlobalQuotaExceeded),
            Admission::UserExhausted => return Err(CoachError::UserQuotaExceeded),
        };

        let notes = truncate_chars(prompt, self.settings.max_prompt_chars);

        // Lookup happens after admission, so an unknown mode still spends quota
        let mode: PromptMode = mode.parse().map_err(|_| CoachError::InvalidMode)?;

        let completion_request = CompletionRequest::user(
            self.settings.model.as_str(),
            mode.max_tokens(),
            render(mode, notes),
        );

        let completion = self.client.complete(&completion_request).await?;

        let cleaned = strip_code_fences(&completion.text());

        let usage = completion.usage;
        let cost = self
            .settings
            .pricing
            .estimate_usd(usage.input_tokens, usage.output_tokens);
        tracing::info!(
            mode = %mode,
            user = %truncate_chars(user_key, LOGGED_USER_CHARS),
            cost = %format!("${cost:.4}"),
            daily = %format!("{}/{}", used_today, self.limiter.daily_limit()),
            "[AI] completion"
        );

        let result = serde_json::from_str(&cleaned).map_err(|e| {
            tracing::error!(
                error = %e,
                output = %truncate_chars(&cleaned, LOGGED_OUTPUT_CHARS),
                "Failed to parse model output"
            );
            CoachError::ResponseParseError
        })?;

        Ok(CoachResponse { result })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

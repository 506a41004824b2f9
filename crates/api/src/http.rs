use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use tracing::debug;
use url::Url;

use exam_core::model::{
    ExamPaper, Question, QuestionId, ResultId, SessionId, SubmissionPayload, TestId,
};

use crate::gateway::{ApiError, ExamGateway, GradeReceipt, PaperFetch};

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Connection settings for the assessment backend.
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    base_url: Url,
    bearer_token: Option<String>,
}

impl HttpGatewayConfig {
    /// Creates a config pointing at the given backend base URL.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the URL cannot be parsed.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::Config(e.to_string()))?;
        Ok(Self {
            base_url,
            bearer_token: None,
        })
    }

    /// Attach the user's bearer token to every request.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Read settings from `EXAM_API_BASE_URL` and (optionally)
    /// `EXAM_API_TOKEN`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base = env::var("EXAM_API_BASE_URL").ok()?;
        let mut config = Self::new(&base).ok()?;
        if let Ok(token) = env::var("EXAM_API_TOKEN") {
            if !token.trim().is_empty() {
                config = config.with_bearer_token(token);
            }
        }
        Some(config)
    }
}

//
// ─── HTTP GATEWAY ──────────────────────────────────────────────────────────────
//

/// `ExamGateway` implementation against the assessment backend's REST API.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    config: HttpGatewayConfig,
}

impl HttpGateway {
    #[must_use]
    pub fn new(config: HttpGatewayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self, test: TestId, suffix: &str) -> String {
        format!(
            "{}/exam/tests/{test}{suffix}",
            self.config.base_url.as_str().trim_end_matches('/')
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait::async_trait]
impl ExamGateway for HttpGateway {
    async fn fetch_paper(&self, test: TestId) -> Result<PaperFetch, ApiError> {
        let url = self.endpoint(test, "");
        debug!(%test, "fetching exam paper");

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response).await?;

        let body: PaperResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Malformed(e.to_string()))?;
        map_paper(test, body)
    }

    async fn submit(
        &self,
        test: TestId,
        payload: &SubmissionPayload,
    ) -> Result<GradeReceipt, ApiError> {
        let url = self.endpoint(test, "/finish");
        let request = FinishRequest::from_payload(payload);
        debug!(%test, disqualified = request.disqualified, "submitting for grading");

        let response = self
            .authorize(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .map_err(transport)?;
        let response = check_status(response).await?;

        let body: FinishResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Malformed(e.to_string()))?;
        Ok(GradeReceipt {
            result_id: ResultId::new(body.result_id.into_string()),
        })
    }
}

fn transport(err: reqwest::Error) -> ApiError {
    ApiError::Transport(err.to_string())
}

/// Turn a non-success response into an `ApiError`, surfacing the backend's
/// `{detail}` message when it sent one.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound);
    }

    let detail = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.detail)
        .unwrap_or_else(|| "request failed".to_string());
    Err(ApiError::Rejected {
        status: status.as_u16(),
        detail,
    })
}

fn map_paper(test: TestId, body: PaperResponse) -> Result<PaperFetch, ApiError> {
    if body.already_completed {
        let result_id = body
            .result_id
            .ok_or_else(|| {
                ApiError::Malformed("already-completed response missing result_id".to_string())
            })?
            .into_string();
        return Ok(PaperFetch::AlreadyCompleted {
            result_id: ResultId::new(result_id),
        });
    }

    let title = body
        .title
        .ok_or_else(|| ApiError::Malformed("paper response missing title".to_string()))?;
    let duration = body
        .duration
        .ok_or_else(|| ApiError::Malformed("paper response missing duration".to_string()))?;
    let questions = body
        .questions
        .into_iter()
        .map(|q| Question::new(QuestionId::new(q.id), q.kind, q.content, q.marks))
        .collect();
    let session_id = body.session_id.map(|id| SessionId::new(id.into_string()));

    let paper = ExamPaper::new(test, title, duration, questions, session_id)
        .map_err(|e| ApiError::Malformed(e.to_string()))?;
    Ok(PaperFetch::Paper(paper))
}

//
// ─── WIRE TYPES ────────────────────────────────────────────────────────────────
//

/// Backend ids appear as integers for stored tests and as strings for
/// template sessions; accept both and normalize to strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdWire {
    Num(u64),
    Str(String),
}

impl IdWire {
    fn into_string(self) -> String {
        match self {
            IdWire::Num(n) => n.to_string(),
            IdWire::Str(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaperResponse {
    #[serde(default)]
    already_completed: bool,
    result_id: Option<IdWire>,
    session_id: Option<IdWire>,
    title: Option<String>,
    duration: Option<u32>,
    #[serde(default)]
    questions: Vec<QuestionWire>,
}

#[derive(Debug, Deserialize)]
struct QuestionWire {
    id: u64,
    #[serde(rename = "type")]
    kind: String,
    content: serde_json::Value,
    marks: u32,
}

#[derive(Debug, Serialize)]
struct FinishRequest {
    answers: BTreeMap<String, String>,
    // The grader reads the violation tally from both fields.
    flags: u32,
    tab_switches: u32,
    disqualified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
}

impl FinishRequest {
    fn from_payload(payload: &SubmissionPayload) -> Self {
        let answers = payload
            .answers
            .iter()
            .map(|(id, value)| (id.to_string(), value.clone()))
            .collect();
        Self {
            answers,
            flags: payload.violation_count,
            tab_switches: payload.violation_count,
            disqualified: payload.disqualified,
            session_id: payload
                .session_id
                .as_ref()
                .map(|id| id.as_str().to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FinishResponse {
    result_id: IdWire,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

//! HTTP client for the Advent of Code site.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::StatusCode;

use crate::error::{Error, Result};
use crate::race::Part;
use crate::{rlog_debug, rlog_trace};

use super::html;
use super::{
    final_day, CompletionStatus, PuzzleSource, PuzzleText, SourceConnector, SubmissionResponse,
};

const USER_AGENT: &str = concat!("aoc-race/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const BOTH_PARTS_COMPLETE: &str = "Both parts of this puzzle are complete!";
const ANSWER_MARKER: &str = "Your puzzle answer was";

#[derive(Debug, Clone)]
pub struct AocClient {
    http: reqwest::Client,
    base_url: String,
}

impl AocClient {
    pub fn new(base_url: &str, session: &str) -> Result<Self> {
        let session = session.trim();
        if session.is_empty() {
            return Err(Error::MissingSession);
        }
        let cookie = HeaderValue::from_str(&format!("session={session}"))
            .map_err(|e| Error::Validation(format!("invalid session token: {e}")))?;
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie);

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn day_url(&self, year: u16, day: u8) -> String {
        format!("{}/{}/day/{}", self.base_url, year, day)
    }

    async fn day_page(&self, year: u16, day: u8) -> Result<String> {
        let url = self.day_url(year, day);
        rlog_debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::PartLocked {
                year,
                day,
                part: Part::One,
            }),
            status if !status.is_success() => Err(Error::PuzzleFetchFailed(format!(
                "{url} returned HTTP {status}"
            ))),
            _ => Ok(response.text().await?),
        }
    }

    /// Pick one part out of a day page.
    pub fn parse_puzzle(page: &str, part: Part) -> Option<PuzzleText> {
        let index = usize::from(part.number() - 1);
        let article = *html::articles(page).get(index)?;
        Some(PuzzleText {
            title: html::title(page).unwrap_or_default(),
            markdown: html::to_markdown(article),
        })
    }

    /// The final day of an event has a single puzzle.
    pub fn parse_completion(page: &str, year: u16, day: u8) -> CompletionStatus {
        let both = page.contains(BOTH_PARTS_COMPLETE);
        let mut answers = html::solved_answers(page).into_iter();
        let available = html::articles(page).len().min(2) as u8;
        CompletionStatus {
            part1_complete: both || page.contains(ANSWER_MARKER),
            part2_complete: both,
            part1_answer: answers.next(),
            part2_answer: answers.next(),
            available_parts: available,
            single_part: day == final_day(year),
        }
    }
}

#[async_trait]
impl PuzzleSource for AocClient {
    async fn fetch_puzzle(&self, year: u16, day: u8, part: Part) -> Result<PuzzleText> {
        let page = match self.day_page(year, day).await {
            Err(Error::PartLocked { .. }) => return Err(Error::PartLocked { year, day, part }),
            other => other?,
        };
        Self::parse_puzzle(&page, part).ok_or(Error::PartLocked { year, day, part })
    }

    async fn fetch_input(&self, year: u16, day: u8) -> Result<String> {
        let url = self.input_url(year, day);
        rlog_debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::PuzzleFetchFailed(format!(
                "{url} returned HTTP {}",
                response.status()
            )));
        }
        Ok(response.text().await?)
    }

    async fn submit_answer(
        &self,
        year: u16,
        day: u8,
        part: Part,
        answer: &str,
    ) -> Result<SubmissionResponse> {
        let url = format!("{}/answer", self.day_url(year, day));
        let level = part.number().to_string();
        rlog_debug!("POST {} level={} answer={}", url, level, answer);

        let response = self
            .http
            .post(&url)
            .form(&[("level", level.as_str()), ("answer", answer)])
            .send()
            .await?;
        let status_code = response.status().as_u16();
        if !response.status().is_success() {
            return Err(Error::PuzzleFetchFailed(format!(
                "{url} returned HTTP {status_code}"
            )));
        }
        let body = response.text().await?;
        rlog_trace!("Submission response body: {}", body);

        Ok(SubmissionResponse {
            status_code,
            message: html::main_text(&body),
        })
    }

    async fn fetch_completion_status(&self, year: u16, day: u8) -> Result<CompletionStatus> {
        let page = self.day_page(year, day).await?;
        Ok(Self::parse_completion(&page, year, day))
    }

    fn input_url(&self, year: u16, day: u8) -> String {
        format!("{}/input", self.day_url(year, day))
    }
}

/// Connects [`AocClient`]s against a fixed base URL.
#[derive(Debug, Clone)]
pub struct AocConnector {
    base_url: String,
}

impl AocConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl SourceConnector for AocConnector {
    fn connect(&self, session: &str) -> Result<Arc<dyn PuzzleSource>> {
        Ok(Arc::new(AocClient::new(&self.base_url, session)?))
    }
}

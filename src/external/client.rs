use std::sync::LazyLock;
use std::time::Duration;

use reqwest::Response;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Response bodies quoted in errors are cut to this many bytes
const MAX_ERROR_BODY: usize = 512;

/// Process-wide HTTP client shared by every sender, the enrichment client and
/// diagnostics. Callers set per-request timeouts from their own settings.
/// Redirects are not followed; a 3xx answer is a failed delivery.
pub static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(16)
        .pool_idle_timeout(Duration::from_secs(90))
        .gzip(true)
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(concat!("checkrelay/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to build HTTP client")
});

#[derive(Debug, Error)]
pub enum ExternalApiError {
    #[error("{api} request failed: {source}")]
    Transport {
        api: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Any status of 300 or above
    #[error("{api} returned HTTP {status}: {body}")]
    Status {
        api: &'static str,
        status: u16,
        body: String,
    },

    #[error("{api} returned an unreadable response: {source}")]
    Decode {
        api: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl ExternalApiError {
    pub fn api(&self) -> &'static str {
        match self {
            ExternalApiError::Transport { api, .. }
            | ExternalApiError::Status { api, .. }
            | ExternalApiError::Decode { api, .. } => api,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ExternalApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// POSTs `body` as JSON; statuses of 300 and above become `Status` errors.
pub async fn post_json<B>(
    api: &'static str,
    url: &str,
    body: &B,
    timeout: Duration,
    bearer: Option<&str>,
) -> Result<Response, ExternalApiError>
where
    B: Serialize + ?Sized,
{
    let mut request = HTTP_CLIENT.post(url).timeout(timeout).json(body);
    if let Some(token) = bearer {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .map_err(|source| ExternalApiError::Transport { api, source })?;

    let status = response.status().as_u16();
    if status >= 300 {
        let mut body = response.text().await.unwrap_or_default();
        truncate_utf8(&mut body, MAX_ERROR_BODY);
        return Err(ExternalApiError::Status { api, status, body });
    }

    Ok(response)
}

/// `post_json` followed by decoding the JSON response
pub async fn post_json_for<B, T>(
    api: &'static str,
    url: &str,
    body: &B,
    timeout: Duration,
    bearer: Option<&str>,
) -> Result<T, ExternalApiError>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    post_json(api, url, body, timeout, bearer)
        .await?
        .json()
        .await
        .map_err(|source| ExternalApiError::Decode { api, source })
}

/// Joins a base URL and a path without doubling slashes
pub fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn truncate_utf8(text: &mut String, max: usize) {
    if text.len() > max {
        let mut cut = max;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
}

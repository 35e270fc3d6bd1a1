use std::process::ExitStatus;

pub type HostingResult<T> = Result<T, HostingError>;

#[derive(Debug, thiserror::Error)]
pub enum HostingError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("API error: {}", render_errors(.errors))]
    Api { errors: Vec<serde_json::Value> },

    #[error("unexpected API response: {0}")]
    UnexpectedResponse(String),

    #[error("ambiguous resource: {0}")]
    AmbiguousResource(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("{0} did not become active after {1} attempts")]
    ProvisioningTimeout(String, u32),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("command failed: {command}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl From<ureq::Error> for HostingError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Http(format!("server responded with status {code}")),
            other => Self::Http(other.to_string()),
        }
    }
}

fn render_errors(errors: &[serde_json::Value]) -> String {
    serde_json::Value::Array(errors.to_vec()).to_string()
}

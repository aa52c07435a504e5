use super::error::{CouchDaoError, CouchResult};

/// Database used when `COUCH_DB` is not set.
pub const DEFAULT_DATABASE: &str = "scrapbook";

/// Where the shared board documents live.
///
/// Every server pointing at the same database sees the same boards.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Server root without a trailing slash, e.g. `http://couch:5984`.
    pub base_url: String,
    /// Database holding one document per session board.
    pub database: String,
    /// Basic-auth user.
    pub username: Option<String>,
    /// Basic-auth password.
    pub password: Option<String>,
}

impl CouchConfig {
    /// Board database `database` on the server at `base_url`.
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            database: database.into(),
            username: None,
            password: None,
        }
    }

    /// Authenticate every board request with these credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Read `COUCH_BASE_URL` (required), `COUCH_DB` and the optional
    /// `COUCH_USERNAME`/`COUCH_PASSWORD` pair.
    pub fn from_env() -> CouchResult<Self> {
        let base_url = std::env::var("COUCH_BASE_URL").map_err(|_| {
            CouchDaoError::MissingEnvVar {
                var: "COUCH_BASE_URL",
            }
        })?;
        let database = std::env::var("COUCH_DB").unwrap_or_else(|_| DEFAULT_DATABASE.into());

        let config = Self::new(base_url, database);
        match (
            std::env::var("COUCH_USERNAME").ok(),
            std::env::var("COUCH_PASSWORD").ok(),
        ) {
            (Some(username), Some(password)) => Ok(config.with_credentials(username, password)),
            _ => Ok(config),
        }
    }
}

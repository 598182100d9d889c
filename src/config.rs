use secrecy::SecretString;
use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub openai_api_key: Option<SecretString>,
    pub essay_model: String,
    pub default_page_size: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            mongo_conn_string: env::var("MONGO_CONN_STRING")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db_name: env::var("MONGO_DB_NAME")
                .unwrap_or_else(|_| "provetta-local".to_string()),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            web_server_port: env::var("WEB_SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            openai_api_key: env::var("OPENAI_API_KEY").ok().map(SecretString::from),
            essay_model: env::var("ESSAY_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            default_page_size: env::var("DEFAULT_PAGE_SIZE")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(50),
        }
    }

    /// Validate that production-critical configuration is set.
    /// Panics when the server would silently run without a remote essay scorer.
    pub fn validate_for_production(&self) {
        if self.openai_api_key.is_none() {
            panic!(
                "FATAL: OPENAI_API_KEY is not set. Essay answers would only ever receive heuristic scores. Set OPENAI_API_KEY or run with a non-production profile."
            );
        }

        if self.mongo_conn_string.contains("localhost") {
            panic!(
                "FATAL: MONGO_CONN_STRING points at localhost. Set MONGO_CONN_STRING to the production cluster."
            );
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            mongo_conn_string: "mongodb://localhost:27017".to_string(),
            mongo_db_name: "provetta-test".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            openai_api_key: None,
            essay_model: "gpt-4o-mini".to_string(),
            default_page_size: 50,
        }
    }
}

//! Configuração do sqlreview carregada a partir de `sqlreview.toml`.
//!
//! A struct [`SqlReviewConfig`] agrupa as seções `[output]`, `[review]` e
//! `[logging]`. Valores ausentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `ZAI_API_KEY` e `ZAI_API_URL` têm precedência
//! sobre o arquivo.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::PipelineError;
use crate::retry::RetryPolicy;
use crate::review::bypass::DEFAULT_ASSESSMENT;
use crate::zai::client::API_URL;

/// Caminho padrão do arquivo de configuração.
pub const DEFAULT_CONFIG_PATH: &str = "sqlreview.toml";

/// Configuração de nível superior.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SqlReviewConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub review: ReviewConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Diretórios de entrada e saída, relativos a `base_dir` (exceto `logs_dir`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub base_dir: PathBuf,
    /// Arquivos `.sql` capturados.
    pub sql_dir: PathBuf,
    /// Registros de execução, um `<item>.json` por consulta.
    pub sql_info_dir: PathBuf,
    /// Metadados de schema, um `<item>.json` por consulta.
    pub metadata_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("outputs"),
            sql_dir: PathBuf::from("fetchers/sql"),
            sql_info_dir: PathBuf::from("fetchers/sql_info"),
            metadata_dir: PathBuf::from("metadata"),
            logs_dir: PathBuf::from("logs"),
        }
    }
}

/// Parâmetros da etapa de revisão.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub api_url: String,
    /// Chave da API Z.ai.
    pub api_key: String,
    pub model: String,
    pub system_prompt_file: PathBuf,
    /// Subdiretório de `base_dir` onde as revisões são gravadas.
    pub review_dir: PathBuf,
    pub file_pattern: String,
    pub max_workers: usize,
    /// Vale para as duas camadas de retentativa, cada uma com seu contador.
    pub max_retries: u32,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Texto de avaliação usado nas revisões de comandos ALTER SESSION.
    pub bypass_assessment: String,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            api_url: API_URL.to_string(),
            api_key: String::new(),
            model: "glm-4.6".to_string(),
            system_prompt_file: PathBuf::from("resources/review_prompt.txt"),
            review_dir: PathBuf::from("review"),
            file_pattern: "*.sql".to_string(),
            max_workers: 3,
            max_retries: 15,
            initial_retry_delay_ms: 2000,
            max_retry_delay_ms: 10_000,
            request_timeout_secs: 120,
            max_tokens: 4096,
            temperature: 0.1,
            bypass_assessment: DEFAULT_ASSESSMENT.to_string(),
        }
    }
}

impl ReviewConfig {
    /// Política de retentativa usada em cada uma das duas camadas.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_max_retries(
            self.max_retries,
            Duration::from_millis(self.initial_retry_delay_ms),
            Duration::from_millis(self.max_retry_delay_ms),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filtro no formato do `EnvFilter` (ex.: `info`, `sqlreview=debug`).
    pub level: String,
    pub console_output: bool,
    pub file_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: true,
        }
    }
}

impl SqlReviewConfig {
    /// Carrega a configuração de `path`, ou de `sqlreview.toml` no diretório
    /// atual. Sem caminho explícito, a ausência do arquivo resulta nos valores
    /// padrão; com caminho explícito, é um erro de configuração.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        let mut config = match path {
            Some(path) if !path.exists() => {
                return Err(PipelineError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            Some(path) => Self::from_file(path)?,
            None if default_path.exists() => Self::from_file(default_path)?,
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Variáveis de ambiente não vazias sobrescrevem o arquivo.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("ZAI_API_KEY")
            && !key.is_empty()
        {
            self.review.api_key = key;
        }
        if let Some(url) = lookup("ZAI_API_URL")
            && !url.is_empty()
        {
            self.review.api_url = url;
        }
    }

    /// Validação única antes de qualquer processamento.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let review = &self.review;
        if review.api_key.trim().is_empty() {
            return Err(PipelineError::Config(
                "ZAI_API_KEY is required (environment or [review].api_key)".into(),
            ));
        }
        if review.max_workers == 0 {
            return Err(PipelineError::Config("review.max_workers must be at least 1".into()));
        }
        if review.request_timeout_secs == 0 {
            return Err(PipelineError::Config(
                "review.request_timeout_secs must be at least 1".into(),
            ));
        }
        if review.initial_retry_delay_ms > review.max_retry_delay_ms {
            return Err(PipelineError::Config(format!(
                "review.initial_retry_delay_ms ({}) exceeds review.max_retry_delay_ms ({})",
                review.initial_retry_delay_ms, review.max_retry_delay_ms
            )));
        }
        Ok(())
    }

    pub fn sql_dir(&self) -> PathBuf {
        self.output.base_dir.join(&self.output.sql_dir)
    }

    pub fn sql_info_dir(&self) -> PathBuf {
        self.output.base_dir.join(&self.output.sql_info_dir)
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.output.base_dir.join(&self.output.metadata_dir)
    }

    pub fn review_dir(&self) -> PathBuf {
        self.output.base_dir.join(&self.review.review_dir)
    }

    pub fn logs_dir(&self) -> &Path {
        &self.output.logs_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn valid() -> SqlReviewConfig {
        let mut config = SqlReviewConfig::default();
        config.review.api_key = "zai-test".into();
        config
    }

    #[test]
    fn default_config_values() {
        let config = SqlReviewConfig::default();
        assert_eq!(config.review.model, "glm-4.6");
        assert_eq!(config.review.max_workers, 3);
        assert_eq!(config.review.max_retries, 15);
        assert_eq!(config.review.api_url, API_URL);
        assert_eq!(config.logging.level, "info");
        assert!(config.review.api_key.is_empty());
        assert_eq!(config.sql_dir(), PathBuf::from("outputs/fetchers/sql"));
        assert_eq!(config.review_dir(), PathBuf::from("outputs/review"));
        assert_eq!(config.logs_dir(), Path::new("logs"));
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            [output]
            base_dir = "/data/run1"

            [review]
            api_key = "zai-123"
            max_workers = 8
            initial_retry_delay_ms = 500

            [logging]
            file_output = false
        "#;
        let config: SqlReviewConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.review.api_key, "zai-123");
        assert_eq!(config.review.max_workers, 8);
        assert_eq!(config.review.max_retries, 15);
        assert_eq!(config.output.sql_dir, PathBuf::from("fetchers/sql"));
        assert_eq!(config.metadata_dir(), PathBuf::from("/data/run1/metadata"));
        assert!(!config.logging.file_output);
        assert!(config.logging.console_output);

        let policy = config.review.retry_policy();
        assert_eq!(policy.max_attempts, 16);
        assert_eq!(policy.initial_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_secs(10));
    }

    #[test]
    fn env_takes_precedence_over_file() {
        let toml_str = "[review]\napi_key = \"from-file\"";
        let mut config: SqlReviewConfig = toml::from_str(toml_str).unwrap();
        config.apply_env(|key| match key {
            "ZAI_API_KEY" => Some("from-env".into()),
            "ZAI_API_URL" => Some("http://localhost:9000/v4/chat".into()),
            _ => None,
        });
        assert_eq!(config.review.api_key, "from-env");
        assert_eq!(config.review.api_url, "http://localhost:9000/v4/chat");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = valid();
        config.apply_env(|_| Some(String::new()));
        assert_eq!(config.review.api_key, "zai-test");
        assert_eq!(config.review.api_url, API_URL);
    }

    #[test]
    fn validate_rejects_missing_key() {
        let err = SqlReviewConfig::default().validate().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("ZAI_API_KEY"));
    }

    #[test]
    fn validate_rejects_bad_numbers() {
        assert!(valid().validate().is_ok());

        let mut config = valid();
        config.review.max_workers = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.review.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.review.initial_retry_delay_ms = 20_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reads_explicit_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        std::fs::write(&path, "[review]\nmodel = \"glm-4.5\"\n").unwrap();

        let config = SqlReviewConfig::load(Some(&path)).unwrap();
        assert_eq!(config.review.model, "glm-4.5");
    }

    #[test]
    fn load_rejects_missing_explicit_file() {
        let missing = Path::new("/definitely/not/here.toml");
        let err = SqlReviewConfig::load(Some(missing)).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        std::fs::write(&path, "[review\nmodel = ").unwrap();
        let err = SqlReviewConfig::load(Some(&path)).unwrap_err();
        assert!(err.is_config());
    }
}

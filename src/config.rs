// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CONFIGURAÇÃO DO RUNTIME, LLM, BUSCA E PIPELINE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Tudo vem de variáveis de ambiente (o CLI carrega o .env antes).
// O pipeline em si não lê o ambiente: recebe clientes já construídos.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::fmt;
use std::str::FromStr;

use crate::agent::Topology;
use crate::llm::OPENAI_BASE_URL;
use crate::search::TAVILY_ENDPOINT;

/// Endpoint compatível com OpenAI exposto pelo Gemini
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Erros de configuração
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingApiKey(&'static str),
}

/// Provedor de LLM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// OpenAI (padrão)
    #[default]
    OpenAi,
    /// Google Gemini via endpoint compatível com OpenAI
    Gemini,
}

impl LlmProvider {
    /// Converte string do .env para LlmProvider.
    ///
    /// Case-insensitive: "gemini"/"google" → Gemini, qualquer outro → OpenAi
    pub fn from_env(value: &str) -> Self {
        match value.to_lowercase().trim() {
            "gemini" | "google" => Self::Gemini,
            _ => Self::OpenAi,
        }
    }

    /// Variável de ambiente com a API key
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }

    /// Modelo padrão do provedor
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4-turbo-preview",
            Self::Gemini => "gemini-2.0-flash",
        }
    }

    /// URL base padrão do provedor
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => OPENAI_BASE_URL,
            Self::Gemini => GEMINI_BASE_URL,
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "OpenAI"),
            Self::Gemini => write!(f, "Gemini"),
        }
    }
}

/// Configuração do cliente LLM
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    /// Provedor
    pub provider: LlmProvider,
    /// Modelo
    pub model: String,
    /// API key
    pub api_key: String,
    /// URL base compatível com OpenAI
    pub base_url: String,
    /// Temperatura (0.0 = determinístico)
    pub temperature: f32,
    /// Timeout por requisição HTTP
    pub timeout_secs: u64,
}

/// Configuração do cliente de busca
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// API key do Tavily
    pub api_key: String,
    /// Endpoint de busca
    pub endpoint: String,
    /// Timeout por requisição HTTP
    pub timeout_secs: u64,
}

/// Configuração do pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineConfig {
    /// Topologia do grafo
    pub topology: Topology,
    /// Override do número de resultados de busca (limitado a 5..=10)
    pub max_results: Option<usize>,
}

/// Carrega a configuração do LLM a partir das variáveis de ambiente.
///
/// Variáveis suportadas:
/// - `LLM_PROVIDER`: "openai" (padrão) ou "gemini"
/// - `LLM_MODEL`: modelo (padrão depende do provedor)
/// - `LLM_API_BASE_URL`: URL base customizada (opcional)
/// - `LLM_TEMPERATURE`: temperatura (padrão: 0.0)
/// - `LLM_TIMEOUT_SECS`: timeout HTTP (padrão: 120)
/// - `OPENAI_API_KEY` / `GEMINI_API_KEY`: conforme o provedor
pub fn load_llm_config() -> Result<LlmConfig, ConfigError> {
    llm_config_from(env_lookup)
}

/// Carrega a configuração de busca (`TAVILY_API_KEY`, `TAVILY_ENDPOINT`,
/// `SEARCH_TIMEOUT_SECS`).
pub fn load_search_config() -> Result<SearchConfig, ConfigError> {
    search_config_from(env_lookup)
}

/// Carrega a configuração do pipeline (`RESEARCH_TOPOLOGY`,
/// `SEARCH_MAX_RESULTS`).
pub fn load_pipeline_config() -> PipelineConfig {
    pipeline_config_from(env_lookup)
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn llm_config_from<F>(lookup: F) -> Result<LlmConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let provider = lookup("LLM_PROVIDER")
        .map(|v| LlmProvider::from_env(&v))
        .unwrap_or_default();

    let api_key_var = provider.api_key_var();
    let api_key = lookup(api_key_var).ok_or(ConfigError::MissingApiKey(api_key_var))?;

    let config = LlmConfig {
        provider,
        model: lookup("LLM_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
        api_key,
        base_url: lookup("LLM_API_BASE_URL")
            .unwrap_or_else(|| provider.default_base_url().to_string()),
        temperature: parse_or(&lookup, "LLM_TEMPERATURE", 0.0),
        timeout_secs: parse_or(&lookup, "LLM_TIMEOUT_SECS", 120),
    };

    log::info!(
        "📦 LLM: {} model={} temperature={}",
        config.provider,
        config.model,
        config.temperature
    );

    Ok(config)
}

fn search_config_from<F>(lookup: F) -> Result<SearchConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let api_key = lookup("TAVILY_API_KEY").ok_or(ConfigError::MissingApiKey("TAVILY_API_KEY"))?;

    Ok(SearchConfig {
        api_key,
        endpoint: lookup("TAVILY_ENDPOINT").unwrap_or_else(|| TAVILY_ENDPOINT.to_string()),
        timeout_secs: parse_or(&lookup, "SEARCH_TIMEOUT_SECS", 60),
    })
}

fn pipeline_config_from<F>(lookup: F) -> PipelineConfig
where
    F: Fn(&str) -> Option<String>,
{
    let topology = lookup("RESEARCH_TOPOLOGY")
        .map(|v| Topology::from_env(&v))
        .unwrap_or_default();

    let max_results = lookup("SEARCH_MAX_RESULTS").and_then(|v| match v.trim().parse::<usize>() {
        Ok(n) => Some(n),
        Err(_) => {
            log::warn!("⚠ SEARCH_MAX_RESULTS inválido ({}), usando padrão", v);
            None
        }
    });

    log::info!("📦 RESEARCH_TOPOLOGY={}", topology);

    PipelineConfig {
        topology,
        max_results,
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("⚠ {} inválido ({}), usando padrão {}", key, raw, default);
            default
        }),
    }
}

/// Cria o runtime Tokio do CLI.
///
/// Runtime single-thread: o pipeline é estritamente sequencial e não há
/// trabalho para distribuir entre threads.
pub fn create_tokio_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

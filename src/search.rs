// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CLIENTE DE BUSCA
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Trait e implementações para busca web estruturada.
// Provedor padrão: Tavily (busca + conteúdo bruto + resumo opcional).
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::SearchConfig;
use crate::types::{SearchHit, SearchRequest, SearchResults};

/// Erros do cliente de busca
#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    #[error("Search API error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded")]
    RateLimitError,

    #[error("Invalid response format: {0}")]
    ParseError(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Trait principal para clientes de busca
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Executa uma única busca
    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, SearchError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO MOCK PARA TESTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Cliente mock para testes unitários
#[derive(Debug, Default)]
pub struct MockSearchClient {
    mock_results: Option<SearchResults>,
    mock_error: Option<SearchError>,
    calls: AtomicUsize,
    last_request: Mutex<Option<SearchRequest>>,
}

impl MockSearchClient {
    /// Mock que retorna um único hit genérico
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock que retorna sempre os resultados dados
    pub fn with_results(results: SearchResults) -> Self {
        Self {
            mock_results: Some(results),
            ..Default::default()
        }
    }

    /// Mock que falha sempre com o erro dado
    pub fn failing(error: SearchError) -> Self {
        Self {
            mock_error: Some(error),
            ..Default::default()
        }
    }

    /// Número de buscas recebidas
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Última requisição recebida
    pub fn last_request(&self) -> Option<SearchRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl SearchClient for MockSearchClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        if let Some(error) = &self.mock_error {
            return Err(error.clone());
        }

        Ok(self.mock_results.clone().unwrap_or_else(|| {
            SearchResults::from_hits(vec![SearchHit::new(
                "https://example.com/mock",
                "Mock snippet",
                Some(1.0),
            )])
        }))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO TAVILY
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Endpoint padrão da API Tavily
pub const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

#[derive(Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
    include_answer: bool,
    include_raw_content: bool,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    raw_content: Option<String>,
    #[serde(default)]
    score: Option<f32>,
}

impl From<TavilyResponse> for SearchResults {
    fn from(response: TavilyResponse) -> Self {
        SearchResults {
            answer: response.answer.filter(|a| !a.trim().is_empty()),
            hits: response
                .results
                .into_iter()
                .map(|r| SearchHit {
                    source_id: r.url,
                    title: r.title,
                    content: r.content,
                    raw_content: r.raw_content,
                    score: r.score,
                })
                .collect(),
        }
    }
}

/// Cliente para a API de busca Tavily
pub struct TavilyClient {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl TavilyClient {
    /// Cria um cliente com o endpoint padrão
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            endpoint: TAVILY_ENDPOINT.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Cria um cliente a partir da configuração carregada do ambiente
    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        Self::new(config.api_key.clone())
            .with_endpoint(&config.endpoint)
            .with_timeout(Duration::from_secs(config.timeout_secs))
    }

    /// Define o endpoint (útil para proxies)
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Define o timeout de cada requisição HTTP
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, SearchError> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::NetworkError(format!("cannot build HTTP client: {}", e)))?;
        Ok(self)
    }
}

#[async_trait]
impl SearchClient for TavilyClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, SearchError> {
        let body = TavilyRequest {
            query: &request.query,
            search_depth: request.depth.as_str(),
            max_results: request.max_results,
            include_answer: request.include_answer,
            include_raw_content: request.include_raw_content,
        };

        log::debug!(
            "🔍 Tavily: '{}' depth={} max_results={}",
            request.query,
            body.search_depth,
            body.max_results
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimitError);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SearchError::ApiError(format!("{}: {}", status, error_text)));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| SearchError::ParseError(e.to_string()))?;

        let results = SearchResults::from(parsed);
        log::debug!("🔍 Tavily: {} resultados", results.hits.len());

        Ok(results)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// UTILITÁRIOS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Extrai hostname de uma URL
pub fn extract_hostname(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
}

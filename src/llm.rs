// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CLIENTE LLM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Trait e implementações para interação com modelos de linguagem.
// Qualquer endpoint compatível com OpenAI `/chat/completions` serve
// (OpenAI, Gemini via camada de compatibilidade, servidores locais).
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::prompts::{render_template, TemplateError, TemplateVars};
use crate::types::Message;

/// Erros do cliente LLM
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded")]
    RateLimitError,

    #[error("Invalid response format: {0}")]
    ParseError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Template error: {0}")]
    TemplateError(#[from] TemplateError),
}

/// Uma chamada ao LLM: instrução de sistema, histórico e variáveis de template
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    /// Instrução de sistema (pode conter placeholders `{nome}`)
    pub system_instruction: String,
    /// Turnos da conversa, em ordem
    pub conversation: Vec<Message>,
    /// Valores dos placeholders da instrução
    pub variables: TemplateVars,
}

impl CompletionRequest {
    /// Cria uma requisição sem variáveis
    pub fn new(system_instruction: impl Into<String>, conversation: Vec<Message>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            conversation,
            variables: TemplateVars::new(),
        }
    }

    /// Adiciona uma variável de template
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Renderiza a instrução de sistema com as variáveis
    pub fn render_system(&self) -> Result<String, TemplateError> {
        render_template(&self.system_instruction, &self.variables)
    }
}

/// Trait principal para clientes LLM
///
/// Qualquer provedor implementa apenas `complete`. Retry, backoff e timeout
/// são responsabilidade da implementação, nunca do pipeline.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Gera uma resposta de texto para a requisição
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO MOCK PARA TESTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Cliente mock com respostas roteirizadas.
///
/// Cada chamada consome a próxima resposta da fila; com a fila vazia, usa a
/// resposta de fallback. Toda requisição é registrada para asserções.
#[derive(Debug)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: Result<String, LlmError>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    /// Mock que responde sempre o mesmo texto
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Ok("Mock generated answer".into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Mock que responde na ordem dada e falha quando a fila acaba
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            fallback: Err(LlmError::ApiError("mock has no scripted response left".into())),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Mock que falha em toda chamada
    pub fn failing(error: LlmError) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Enfileira mais uma resposta (ou erro)
    pub fn push_response(&self, response: Result<String, LlmError>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
    }

    /// Número de chamadas recebidas
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Cópia das requisições recebidas, em ordem
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        // Mesmo contrato de template do cliente real
        request.render_system()?;

        let next = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        next.unwrap_or_else(|| self.fallback.clone())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// IMPLEMENTAÇÃO OPENAI-COMPATÍVEL
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// URL base padrão da OpenAI
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Cliente para APIs compatíveis com OpenAI chat completions
pub struct OpenAiClient {
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Cria um cliente com modelo e endpoint padrão da OpenAI
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: "gpt-4-turbo-preview".into(),
            base_url: OPENAI_BASE_URL.into(),
            temperature: 0.0,
            client: reqwest::Client::new(),
        }
    }

    /// Cria um cliente a partir da configuração carregada do ambiente
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Self::new(config.api_key.clone())
            .with_model(&config.model)
            .with_base_url(&config.base_url)
            .with_temperature(config.temperature)
            .with_timeout(Duration::from_secs(config.timeout_secs))
    }

    /// Define o modelo
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.into();
        self
    }

    /// Define a URL base (sem `/chat/completions`)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').into();
        self
    }

    /// Define a temperatura
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Define o timeout de cada requisição HTTP
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, LlmError> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::NetworkError(format!("cannot build HTTP client: {}", e)))?;
        Ok(self)
    }

    /// Modelo configurado
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let system = request.render_system()?;

        let mut messages = Vec::with_capacity(request.conversation.len() + 1);
        messages.push(ChatMessage {
            role: "system",
            content: &system,
        });
        messages.extend(request.conversation.iter().map(|m| ChatMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));

        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        log::debug!(
            "🤖 LLM request: model={} turns={} system_chars={}",
            self.model,
            request.conversation.len(),
            system.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimitError);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError(format!("{}: {}", status, error_text)));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ParseError("response has no choices".into()))?
            .message
            .content
            .unwrap_or_default();

        log::debug!("🤖 LLM response: {} chars", content.len());

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{closed_port_url, serve_once, serve_once_after};

    #[tokio::test]
    async fn test_mock_client_default_answer() {
        let client = MockLlmClient::new();
        let request = CompletionRequest::new("system", vec![Message::user("hi")]);

        let answer = client.complete(&request).await.unwrap();
        assert_eq!(answer, "Mock generated answer");
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_client_scripted_order() {
        let client = MockLlmClient::with_responses(["first", "second"]);
        let request = CompletionRequest::new("s", vec![]);

        assert_eq!(client.complete(&request).await.unwrap(), "first");
        assert_eq!(client.complete(&request).await.unwrap(), "second");
        assert!(matches!(
            client.complete(&request).await,
            Err(LlmError::ApiError(_))
        ));
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_client_failing() {
        let client = MockLlmClient::failing(LlmError::RateLimitError);
        let result = client.complete(&CompletionRequest::default()).await;
        assert!(matches!(result, Err(LlmError::RateLimitError)));
    }

    #[tokio::test]
    async fn test_mock_client_enforces_template_variables() {
        let client = MockLlmClient::new();
        let request = CompletionRequest::new("Plan: {research_plan}", vec![]);

        let result = client.complete(&request).await;
        assert!(matches!(result, Err(LlmError::TemplateError(_))));

        let ok = request.with_variable("research_plan", "p");
        assert!(client.complete(&ok).await.is_ok());
    }

    #[test]
    fn test_openai_client_builder() {
        let client = OpenAiClient::new("key".into())
            .with_model("gemini-2.0-flash")
            .with_base_url("https://example.com/v1/");
        assert_eq!(client.model(), "gemini-2.0-flash");
        assert_eq!(client.endpoint(), "https://example.com/v1/chat/completions");
    }

    fn stub_client(base_url: &str) -> OpenAiClient {
        OpenAiClient::new("sk-test".into())
            .with_model("test-model")
            .with_base_url(base_url)
    }

    fn user_request() -> CompletionRequest {
        CompletionRequest::new("Be brief.", vec![Message::user("What is 2+2?")])
    }

    #[test]
    fn test_from_config_keeps_settings() {
        let config = LlmConfig {
            provider: crate::config::LlmProvider::Gemini,
            model: "gemini-2.0-flash".into(),
            api_key: "g-key".into(),
            base_url: "https://example.com/v1".into(),
            temperature: 0.2,
            timeout_secs: 5,
        };

        let client = OpenAiClient::from_config(&config).unwrap();
        assert_eq!(client.model(), "gemini-2.0-flash");
        assert_eq!(client.endpoint(), "https://example.com/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_openai_success_sends_system_and_conversation() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"4"}}]}"#,
        )
        .await;

        let answer = stub_client(&url).complete(&user_request()).await.unwrap();
        assert_eq!(answer, "4");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /chat/completions"));
        assert!(raw.to_lowercase().contains("authorization: bearer sk-test"));
        assert!(raw.contains(r#""role":"system""#));
        assert!(raw.contains("Be brief."));
        assert!(raw.contains("What is 2+2?"));
        assert!(raw.contains(r#""model":"test-model""#));
    }

    #[tokio::test]
    async fn test_openai_429_is_rate_limit() {
        let (url, _server) = serve_once("429 Too Many Requests", r#"{"error":"slow down"}"#).await;
        let result = stub_client(&url).complete(&user_request()).await;
        assert!(matches!(result, Err(LlmError::RateLimitError)));
    }

    #[tokio::test]
    async fn test_openai_non_success_is_api_error() {
        let (url, _server) = serve_once("401 Unauthorized", r#"{"error":"bad key"}"#).await;
        match stub_client(&url).complete(&user_request()).await {
            Err(LlmError::ApiError(msg)) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("bad key"));
            }
            other => panic!("expected ApiError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_openai_bad_json_is_parse_error() {
        let (url, _server) = serve_once("200 OK", "not json").await;
        let result = stub_client(&url).complete(&user_request()).await;
        assert!(matches!(result, Err(LlmError::ParseError(_))));
    }

    #[tokio::test]
    async fn test_openai_no_choices_is_parse_error() {
        let (url, _server) = serve_once("200 OK", r#"{"choices":[]}"#).await;
        match stub_client(&url).complete(&user_request()).await {
            Err(LlmError::ParseError(msg)) => assert!(msg.contains("no choices")),
            other => panic!("expected ParseError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_openai_null_content_is_empty_string() {
        let (url, _server) =
            serve_once("200 OK", r#"{"choices":[{"message":{"content":null}}]}"#).await;
        let answer = stub_client(&url).complete(&user_request()).await.unwrap();
        assert!(answer.is_empty());
    }

    #[tokio::test]
    async fn test_openai_connection_refused_is_network_error() {
        let url = closed_port_url().await;
        let result = stub_client(&url).complete(&user_request()).await;
        assert!(matches!(result, Err(LlmError::NetworkError(_))));
    }

    #[tokio::test]
    async fn test_openai_timeout_is_applied() {
        let (url, _server) = serve_once_after(
            Duration::from_secs(2),
            "200 OK",
            r#"{"choices":[{"message":{"content":"late"}}]}"#,
        )
        .await;

        let client = stub_client(&url)
            .with_timeout(Duration::from_millis(100))
            .unwrap();
        let result = client.complete(&user_request()).await;
        assert!(matches!(result, Err(LlmError::NetworkError(_))));
    }

    #[tokio::test]
    async fn test_openai_missing_template_variable_never_sends() {
        let url = closed_port_url().await;
        let request = CompletionRequest::new("Plan: {research_plan}", vec![]);
        let result = stub_client(&url).complete(&request).await;
        assert!(matches!(result, Err(LlmError::TemplateError(_))));
    }

    #[test]
    fn test_chat_response_parses_null_content() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}

//! # Research Pipeline
//!
//! Pipeline linear de pesquisa assistida por LLM: recebe uma pergunta, busca
//! na web e devolve uma resposta sintetizada.
//!
//! ## Topologias
//!
//! ```text
//! four-stage: planning ──▶ research ──▶ fact_checking ──▶ answer ──▶ END
//! two-stage:  research ──▶ answer ──▶ END
//! ```
//!
//! - **planning**: o LLM quebra a pergunta em sub-questões (`research_plan`)
//! - **research**: o provedor de busca devolve os resultados brutos (`research_results`)
//! - **fact_checking**: o LLM emite um veredito por fonte (`validated_sources`)
//! - **answer**: o LLM redige a resposta final (`final_answer`)
//!
//! Cada step lê campos já escritos e escreve exatamente um campo novo. O
//! orquestrador (`agent::CompiledGraph`) confere isso antes e depois de cada
//! nó, e qualquer falha de colaborador interrompe a execução.
//!
//! ## Exemplo de Uso
//!
//! ```rust,ignore
//! use research_pipeline::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let llm = Arc::new(OpenAiClient::from_config(&load_llm_config()?)?);
//!     let search = Arc::new(TavilyClient::from_config(&load_search_config()?)?);
//!     let pipeline = ResearchPipeline::with_defaults(Topology::FourStage, llm, search)?;
//!
//!     println!("{}", pipeline.run_research("What is 2+2?").await?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Tipos fundamentais compartilhados por todo o sistema.
///
/// - [`Message`]: turno da conversa
/// - [`SearchRequest`] / [`SearchResults`]: contrato com o provedor de busca
/// - [`ValidatedSource`]: veredito do fact-checker por fonte
pub mod types;

/// Estado, steps, orquestrador e superfície de entrada do pipeline.
pub mod agent;

/// Erros do pipeline (execução) e do grafo (construção).
pub mod error;

/// Clientes para Large Language Models (LLMs).
///
/// Define a trait `LlmClient` e implementações para:
/// - OpenAI e endpoints compatíveis (Gemini)
/// - Mock para testes
pub mod llm;

/// Clientes para busca web.
///
/// Define a trait `SearchClient` e implementações para:
/// - Tavily
/// - Mock para testes
pub mod search;

/// Instruções fixas dos steps e renderização de templates.
pub mod prompts;

/// Utilitários diversos (timing, formatação de texto).
pub mod utils;

/// Configuração do runtime, LLM, busca e pipeline.
///
/// Fornece configuração dinâmica via variáveis de ambiente:
///
/// **LLM:**
/// - `LLM_PROVIDER`: Provider ("openai", "gemini") - padrão: "openai"
/// - `LLM_MODEL`: Modelo (padrão depende do provider)
/// - `LLM_API_BASE_URL`: URL base customizada (opcional)
/// - `LLM_TEMPERATURE`: Temperatura (padrão: 0.0)
/// - `LLM_TIMEOUT_SECS`: Timeout HTTP (padrão: 120)
///
/// **Busca:**
/// - `TAVILY_API_KEY`, `TAVILY_ENDPOINT`, `SEARCH_TIMEOUT_SECS`
///
/// **Pipeline:**
/// - `RESEARCH_TOPOLOGY`: "four-stage" (padrão) ou "two-stage"
/// - `SEARCH_MAX_RESULTS`: resultados por busca (limitado a 5..=10)
pub mod config;

#[cfg(test)]
mod test_support;

// Re-exports principais
pub use agent::{ResearchPipeline, Topology};
pub use config::{
    create_tokio_runtime, load_llm_config, load_pipeline_config, load_search_config, LlmConfig,
    LlmProvider, PipelineConfig, SearchConfig,
};
pub use error::{ExternalError, GraphError, PipelineError};
pub use types::*;

/// Versão da biblioteca.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude com imports comuns para uso rápido.
///
/// Importar tudo de uma vez:
/// ```rust,ignore
/// use research_pipeline::prelude::*;
/// ```
pub mod prelude {
    pub use crate::agent::{
        ResearchOptions, ResearchPipeline, ResearchState, RunTrace, StateField, Topology,
    };
    pub use crate::config::{load_llm_config, load_pipeline_config, load_search_config};
    pub use crate::error::{GraphError, PipelineError};
    pub use crate::llm::{LlmClient, MockLlmClient, OpenAiClient};
    pub use crate::search::{MockSearchClient, SearchClient, TavilyClient};
    pub use crate::types::*;
}

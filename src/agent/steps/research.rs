// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RESEARCH STEP
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use async_trait::async_trait;
use std::sync::Arc;

use super::Step;
use crate::agent::state::{ResearchState, StateField, StateUpdate};
use crate::error::PipelineError;
use crate::search::{extract_hostname, SearchClient};
use crate::types::{SearchDepth, SearchRequest};

/// Limites do número de resultados pedidos ao provedor
pub const MIN_RESULTS: usize = 5;
/// Limite superior do número de resultados
pub const MAX_RESULTS: usize = 10;

/// Parâmetros da busca feita pelo step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResearchOptions {
    max_results: usize,
    include_answer: bool,
    include_raw_content: bool,
}

impl ResearchOptions {
    /// Busca completa: 10 resultados, resumo e conteúdo bruto
    pub fn thorough() -> Self {
        Self {
            max_results: MAX_RESULTS,
            include_answer: true,
            include_raw_content: true,
        }
    }

    /// Busca enxuta: 5 resultados, sem resumo nem conteúdo bruto
    pub fn quick() -> Self {
        Self {
            max_results: MIN_RESULTS,
            include_answer: false,
            include_raw_content: false,
        }
    }

    /// Define o número de resultados, limitado a 5..=10
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.clamp(MIN_RESULTS, MAX_RESULTS);
        self
    }

    /// Número de resultados efetivo
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    fn request(&self, query: &str) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            depth: SearchDepth::Advanced,
            max_results: self.max_results,
            include_answer: self.include_answer,
            include_raw_content: self.include_raw_content,
        }
    }
}

impl Default for ResearchOptions {
    fn default() -> Self {
        Self::thorough()
    }
}

/// Busca na web usando a última pergunta do usuário
pub struct ResearchStep {
    search: Arc<dyn SearchClient>,
    options: ResearchOptions,
    after_planning: bool,
}

impl ResearchStep {
    /// Nome do step
    pub const NAME: &'static str = "research";

    /// Step que roda logo após a entrada (sem plano)
    pub fn new(search: Arc<dyn SearchClient>, options: ResearchOptions) -> Self {
        Self {
            search,
            options,
            after_planning: false,
        }
    }

    /// Step que roda depois do planner e recebe o plano como contexto
    pub fn after_planning(search: Arc<dyn SearchClient>, options: ResearchOptions) -> Self {
        Self {
            search,
            options,
            after_planning: true,
        }
    }
}

#[async_trait]
impl Step for ResearchStep {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn reads(&self) -> &'static [StateField] {
        if self.after_planning {
            &[StateField::Messages, StateField::ResearchPlan]
        } else {
            &[StateField::Messages]
        }
    }

    fn writes(&self) -> StateField {
        StateField::ResearchResults
    }

    async fn run(&self, state: &ResearchState) -> Result<StateUpdate, PipelineError> {
        let query = state
            .last_user_message()
            .map(|m| m.content.as_str())
            .ok_or_else(|| PipelineError::precondition(Self::NAME, "no user message in history"))?;

        if self.after_planning {
            // O plano é só contexto: a query continua sendo a pergunta do usuário
            log::debug!("📝 Plano disponível ({} chars)", state.research_plan().len());
        }

        let request = self.options.request(query);
        let results = self
            .search
            .search(&request)
            .await
            .map_err(|e| PipelineError::external(Self::NAME, e))?;

        if results.is_empty() {
            log::warn!("⚠ Nenhum resultado para '{}'", query);
        }

        log::info!("🔍 {} resultados para '{}'", results.hits.len(), query);
        for hit in &results.hits {
            let host = extract_hostname(&hit.source_id).unwrap_or_else(|| hit.source_id.clone());
            log::debug!("   📄 {} score={:?}", host, hit.score);
        }

        Ok(StateUpdate::research_results(results))
    }
}

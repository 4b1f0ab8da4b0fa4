// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STEPS DO PIPELINE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Cada step transforma State → State delegando a UMA chamada externa:
// - PlanningStep:   LLM  → research_plan
// - ResearchStep:   busca → research_results
// - ValidationStep: LLM  → validated_sources
// - SynthesisStep:  LLM  → final_answer
//
// Os steps não validam pré-condições: isso é trabalho do orquestrador, que
// confere `reads()` antes e `writes()` depois de cada execução.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod planning;
mod research;
mod synthesis;
mod validation;

pub use planning::PlanningStep;
pub use research::{ResearchOptions, ResearchStep};
pub use synthesis::{format_search_results, format_validated_sources, SynthesisStep};
pub use validation::{parse_verdicts, ValidationStep};

use async_trait::async_trait;

use super::state::{ResearchState, StateField, StateUpdate};
use crate::error::{ExternalError, PipelineError};

/// Um nó executável do pipeline
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Step: Send + Sync {
    /// Nome usado em logs e erros
    fn name(&self) -> &'static str;

    /// Campos que precisam estar escritos antes da execução
    fn reads(&self) -> &'static [StateField];

    /// Único campo que o step escreve
    fn writes(&self) -> StateField;

    /// Executa o step e retorna a atualização parcial do estado
    async fn run(&self, state: &ResearchState) -> Result<StateUpdate, PipelineError>;
}

/// Rejeita conteúdo vazio vindo de um colaborador
pub(crate) fn require_content(step: &str, content: String) -> Result<String, PipelineError> {
    if content.trim().is_empty() {
        Err(PipelineError::external(step, ExternalError::EmptyResponse))
    } else {
        Ok(content)
    }
}

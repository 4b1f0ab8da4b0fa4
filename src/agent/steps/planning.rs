// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PLANNING STEP
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use async_trait::async_trait;
use std::sync::Arc;

use super::{require_content, Step};
use crate::agent::state::{ResearchState, StateField, StateUpdate};
use crate::error::PipelineError;
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompts::PLANNER_INSTRUCTION;

/// Quebra a pergunta em sub-questões e produz o plano de pesquisa
pub struct PlanningStep {
    llm: Arc<dyn LlmClient>,
}

impl PlanningStep {
    /// Nome do step
    pub const NAME: &'static str = "planning";

    /// Cria o step com o cliente LLM injetado
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Step for PlanningStep {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn reads(&self) -> &'static [StateField] {
        &[StateField::Messages]
    }

    fn writes(&self) -> StateField {
        StateField::ResearchPlan
    }

    async fn run(&self, state: &ResearchState) -> Result<StateUpdate, PipelineError> {
        let request = CompletionRequest::new(PLANNER_INSTRUCTION, state.messages().to_vec());

        let plan = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| PipelineError::external(Self::NAME, e))?;

        let plan = require_content(Self::NAME, plan)?;
        log::debug!("📝 Plano: {} chars", plan.len());

        Ok(StateUpdate::research_plan(plan))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SYNTHESIS STEP
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use async_trait::async_trait;
use std::fmt::Write;
use std::sync::Arc;

use super::{require_content, Step};
use crate::agent::state::{ResearchState, StateField, StateUpdate};
use crate::error::PipelineError;
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompts::{ANSWER_INSTRUCTION, BASIC_ANSWER_INSTRUCTION};
use crate::types::{SearchResults, ValidatedSource};
use crate::utils::word_count;

/// De onde vêm as fontes entregues ao sintetizador
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceView {
    /// Plano + fontes aprovadas pelo fact-checker
    Validated,
    /// Resultados brutos da busca
    Raw,
}

/// Redige a resposta final (step terminal)
pub struct SynthesisStep {
    llm: Arc<dyn LlmClient>,
    view: SourceView,
}

impl SynthesisStep {
    /// Nome do step
    pub const NAME: &'static str = "answer";

    /// Síntese a partir do plano e das fontes validadas
    pub fn validated(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            view: SourceView::Validated,
        }
    }

    /// Síntese direto dos resultados de busca
    pub fn direct(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            view: SourceView::Raw,
        }
    }

    fn request(&self, state: &ResearchState) -> CompletionRequest {
        let messages = state.messages().to_vec();
        match self.view {
            SourceView::Validated => CompletionRequest::new(ANSWER_INSTRUCTION, messages)
                .with_variable("research_plan", state.research_plan())
                .with_variable(
                    "validated_sources",
                    format_validated_sources(state.validated_sources(), state.research_results()),
                ),
            SourceView::Raw => CompletionRequest::new(BASIC_ANSWER_INSTRUCTION, messages)
                .with_variable("research_results", format_search_results(state.research_results())),
        }
    }
}

#[async_trait]
impl Step for SynthesisStep {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn reads(&self) -> &'static [StateField] {
        match self.view {
            SourceView::Validated => &[
                StateField::Messages,
                StateField::ResearchPlan,
                StateField::ResearchResults,
                StateField::ValidatedSources,
            ],
            SourceView::Raw => &[StateField::Messages, StateField::ResearchResults],
        }
    }

    fn writes(&self) -> StateField {
        StateField::FinalAnswer
    }

    async fn run(&self, state: &ResearchState) -> Result<StateUpdate, PipelineError> {
        let request = self.request(state);

        let answer = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| PipelineError::external(Self::NAME, e))?;
        let answer = require_content(Self::NAME, answer)?;
        log::info!("✍️  Resposta final: {} palavras", word_count(&answer));

        Ok(StateUpdate::final_answer(answer))
    }
}

/// Formata os resultados de busca como contexto numerado
pub fn format_search_results(results: &SearchResults) -> String {
    if results.is_empty() {
        return "No search results.".to_string();
    }

    let mut out = String::new();

    if let Some(answer) = &results.answer {
        let _ = writeln!(out, "Search summary: {}\n", answer);
    }

    for (i, hit) in results.hits.iter().enumerate() {
        let title = if hit.title.is_empty() { &hit.source_id } else { &hit.title };
        let _ = write!(out, "[{}] {} ({})", i + 1, title, hit.source_id);
        if let Some(score) = hit.score {
            let _ = write!(out, " score={:.2}", score);
        }
        let _ = writeln!(out, "\n{}\n", hit.content.trim());
    }

    out.trim_end().to_string()
}

/// Formata apenas as fontes aprovadas, com a justificativa do fact-checker.
///
/// O resumo do provedor não tem `source_id` e não passa pelo fact-checker;
/// quando existe, vai na frente marcado como não verificado.
pub fn format_validated_sources(sources: &[ValidatedSource], results: &SearchResults) -> String {
    let mut out = String::new();

    if let Some(answer) = &results.answer {
        let _ = writeln!(out, "Search summary (unverified): {}
", answer);
    }

    let mut passed = sources.iter().filter(|s| s.passed).peekable();
    if passed.peek().is_none() {
        out.push_str("No source passed validation.");
        return out;
    }

    for (i, source) in passed.enumerate() {
        let _ = writeln!(out, "[{}] {}", i + 1, source.source_id);
        let _ = writeln!(out, "Validation: {}", source.reason.trim());
        if let Some(hit) = results.find(&source.source_id) {
            let _ = writeln!(out, "{}", hit.content.trim());
        }
        out.push('\n');
    }

    out.trim_end().to_string()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// VALIDATION STEP (FACT-CHECKING)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// O rigor da checagem é todo do LLM. Localmente só conferimos o FORMATO da
// resposta: lista JSON com uma entrada por fonte conhecida, sem duplicatas e
// com justificativa. A lista só pode vir vazia quando a busca não trouxe
// nenhum hit (resultado vazio ou só com o resumo do provedor).
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use super::{require_content, Step};
use crate::agent::state::{ResearchState, StateField, StateUpdate};
use crate::error::{ExternalError, PipelineError};
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompts::FACT_CHECK_INSTRUCTION;
use crate::types::{Message, SearchResults, ValidatedSource};

/// Envia os resultados brutos ao fact-checker e guarda os vereditos
pub struct ValidationStep {
    llm: Arc<dyn LlmClient>,
}

impl ValidationStep {
    /// Nome do step
    pub const NAME: &'static str = "fact_checking";

    /// Cria o step com o cliente LLM injetado
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Step for ValidationStep {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn reads(&self) -> &'static [StateField] {
        &[StateField::ResearchResults]
    }

    fn writes(&self) -> StateField {
        StateField::ValidatedSources
    }

    async fn run(&self, state: &ResearchState) -> Result<StateUpdate, PipelineError> {
        let results = state.research_results();
        let serialized = serde_json::to_string_pretty(results).map_err(|e| {
            PipelineError::precondition(Self::NAME, format!("cannot serialize research results: {}", e))
        })?;

        let request = CompletionRequest::new(FACT_CHECK_INSTRUCTION, vec![Message::user(serialized)]);

        let reply = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| PipelineError::external(Self::NAME, e))?;
        let reply = require_content(Self::NAME, reply)?;

        let verdicts = parse_verdicts(&reply, results)
            .map_err(|reason| PipelineError::external(Self::NAME, ExternalError::MalformedResponse(reason)))?;

        let passed = verdicts.iter().filter(|v| v.passed).count();
        log::info!("✅ Fact-check: {} de {} fontes aprovadas", passed, verdicts.len());

        Ok(StateUpdate::validated_sources(verdicts))
    }
}

/// Extrai e valida a lista de vereditos devolvida pelo LLM.
///
/// Aceita o JSON puro, dentro de um bloco cercado por ``` (com ou sem tag de
/// linguagem) ou cercado de texto livre. Retorna a descrição do problema
/// quando o formato não confere.
pub fn parse_verdicts(reply: &str, results: &SearchResults) -> Result<Vec<ValidatedSource>, String> {
    let json_str = extract_json_block(reply);

    let verdicts: Vec<ValidatedSource> = serde_json::from_str(json_str).map_err(|e| {
        format!(
            "expected a JSON array of verdicts: {}. Response was: {}",
            e,
            json_str.chars().take(200).collect::<String>()
        )
    })?;

    if verdicts.is_empty() && !results.hits.is_empty() {
        return Err("verdict list is empty".into());
    }

    let mut seen = HashSet::new();
    for verdict in &verdicts {
        if results.find(&verdict.source_id).is_none() {
            return Err(format!("unknown source_id '{}'", verdict.source_id));
        }
        if !seen.insert(verdict.source_id.as_str()) {
            return Err(format!("duplicate verdict for '{}'", verdict.source_id));
        }
        if verdict.reason.trim().is_empty() {
            return Err(format!("verdict for '{}' has no reason", verdict.source_id));
        }
    }

    Ok(verdicts)
}

fn extract_json_block(response: &str) -> &str {
    if let Some((_, after)) = response.split_once("```") {
        // Pula a tag de linguagem (json, JSON, ...) se houver
        let body = after.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
        return body.split("```").next().unwrap_or(body).trim();
    }

    match (response.find('['), response.rfind(']')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => response.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::types::SearchHit;

    fn results() -> SearchResults {
        SearchResults::from_hits(vec![
            SearchHit::new("https://a.com", "2+2=4", Some(0.9)),
            SearchHit::new("https://b.com", "2+2=5", Some(0.2)),
        ])
    }

    const GOOD_REPLY: &str = r#"[
        {"source_id": "https://a.com", "passed": true, "reason": "consistent"},
        {"source_id": "https://b.com", "passed": false, "reason": "contradicts arithmetic"}
    ]"#;

    #[test]
    fn test_parse_plain_json() {
        let verdicts = parse_verdicts(GOOD_REPLY, &results()).unwrap();
        assert_eq!(verdicts.len(), 2);
        assert!(verdicts[0].passed);
        assert!(!verdicts[1].passed);
    }

    #[test]
    fn test_parse_fenced_json() {
        let reply = format!("Here you go:\n```json\n{}\n```\nDone.", GOOD_REPLY);
        assert_eq!(parse_verdicts(&reply, &results()).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_rejects_free_text() {
        let err = parse_verdicts("All sources look fine.", &results()).unwrap_err();
        assert!(err.contains("JSON array"));
    }

    #[test]
    fn test_parse_rejects_unknown_source() {
        let reply = r#"[{"source_id": "https://z.com", "passed": true, "reason": "ok"}]"#;
        assert!(parse_verdicts(reply, &results()).unwrap_err().contains("unknown"));
    }

    #[test]
    fn test_parse_rejects_duplicates_and_empty() {
        let dup = r#"[
            {"source_id": "https://a.com", "passed": true, "reason": "ok"},
            {"source_id": "https://a.com", "passed": false, "reason": "no"}
        ]"#;
        assert!(parse_verdicts(dup, &results()).unwrap_err().contains("duplicate"));
        assert!(parse_verdicts("[]", &results()).unwrap_err().contains("empty"));
    }

    #[test]
    fn test_parse_accepts_empty_list_without_hits() {
        let summary_only = SearchResults {
            answer: Some("4".into()),
            hits: vec![],
        };
        assert!(parse_verdicts("[]", &summary_only).unwrap().is_empty());
        assert!(parse_verdicts("```json\n[]\n```", &SearchResults::default())
            .unwrap()
            .is_empty());

        let reply = r#"[{"source_id": "summary", "passed": true, "reason": "ok"}]"#;
        assert!(parse_verdicts(reply, &summary_only).unwrap_err().contains("unknown"));
    }

    #[test]
    fn test_parse_uppercase_fence() {
        let reply = format!("```JSON\n{}\n```", GOOD_REPLY);
        assert_eq!(parse_verdicts(&reply, &results()).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_bare_array_inside_prose() {
        let reply = format!("Verdicts follow: {} Let me know if you need more.", GOOD_REPLY);
        assert_eq!(parse_verdicts(&reply, &results()).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_rejects_missing_reason() {
        let reply = r#"[{"source_id": "https://a.com", "passed": true, "reason": " "}]"#;
        assert!(parse_verdicts(reply, &results()).unwrap_err().contains("no reason"));
    }

    #[tokio::test]
    async fn test_validation_sends_serialized_results() {
        let llm = Arc::new(MockLlmClient::with_responses([GOOD_REPLY]));
        let step = ValidationStep::new(llm.clone());

        let state = ResearchState::from_query("What is 2+2?")
            .unwrap()
            .merge(StateUpdate::research_results(results()))
            .unwrap();

        let update = step.run(&state).await.unwrap();
        assert_eq!(update.written_fields(), vec![StateField::ValidatedSources]);

        let request = &llm.requests()[0];
        assert_eq!(request.system_instruction, FACT_CHECK_INSTRUCTION);
        let sent: SearchResults = serde_json::from_str(&request.conversation[0].content).unwrap();
        assert_eq!(sent, results());
    }

    #[tokio::test]
    async fn test_summary_only_results_pass_with_empty_verdicts() {
        let step = ValidationStep::new(Arc::new(MockLlmClient::with_responses(["[]"])));
        let state = ResearchState::from_query("q")
            .unwrap()
            .merge(StateUpdate::research_results(SearchResults {
                answer: Some("4".into()),
                hits: vec![],
            }))
            .unwrap();

        let next = state.merge(step.run(&state).await.unwrap()).unwrap();
        assert!(next.validated_sources().is_empty());
        assert!(next.is_written(StateField::ValidatedSources));
    }

    #[tokio::test]
    async fn test_malformed_reply_is_external() {
        let step = ValidationStep::new(Arc::new(MockLlmClient::with_responses(["looks good"])));
        let state = ResearchState::from_query("q")
            .unwrap()
            .merge(StateUpdate::research_results(results()))
            .unwrap();

        let err = step.run(&state).await.unwrap_err();
        assert!(err.is_external());
        assert!(err.to_string().contains("malformed"));
    }
}

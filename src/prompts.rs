// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PROMPTS E TEMPLATES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Instruções fixas de cada step e renderização de placeholders `{nome}`.
// Só identificadores em minúsculas/underscore são placeholders, então JSON
// literal dentro das instruções passa intacto.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Variáveis de template (nome → valor)
pub type TemplateVars = BTreeMap<String, String>;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-z_][a-z0-9_]*)\}").expect("placeholder regex"));

/// Erro de renderização de template
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("missing template variable '{0}'")]
    MissingVariable(String),
}

/// Instrução do planner
pub const PLANNER_INSTRUCTION: &str = r#"You are an expert research planner. Your task is to break down the research query into specific sub-questions and create a research plan.

For the given query, create a detailed research plan that:
1. Identifies key areas to investigate
2. Specifies what information needs to be gathered
3. Suggests potential sources to consult
4. Outlines the structure of the final answer"#;

/// Instrução do fact-checker.
///
/// Exige saída em JSON para que os vereditos possam ser validados localmente.
pub const FACT_CHECK_INSTRUCTION: &str = r#"You are an expert fact-checker. Your task is to validate the research results and identify reliable sources.

For each source in the research results:
1. Evaluate the credibility of the source
2. Check for consistency with other sources
3. Identify any potential biases
4. Flag any unverified claims

Respond with ONLY a JSON array, one entry per source you evaluated, using the exact source_id from the input:
[{"source_id": "<source_id>", "passed": true, "reason": "<why the source passed or failed>"}]"#;

/// Instrução de síntese (pipeline com planner e fact-checker)
pub const ANSWER_INSTRUCTION: &str = r#"You are an expert research assistant. Your task is to synthesize the research findings into a comprehensive, well-structured answer.

Research Plan:
{research_plan}

Validated Sources:
{validated_sources}

Please provide a detailed answer that:
1. Follows the research plan structure
2. Incorporates only verified information
3. Provides proper citations
4. Is well-organized and easy to read
5. Includes a summary of key findings
6. Notes any limitations or uncertainties"#;

/// Instrução de síntese (pipeline curto, direto dos resultados de busca)
pub const BASIC_ANSWER_INSTRUCTION: &str = r#"You are an expert research assistant. Your task is to synthesize the research findings into a comprehensive, well-structured answer.

Research Results:
{research_results}

Please provide a detailed answer that:
1. Addresses the original question
2. Incorporates key findings from the research
3. Provides citations where appropriate
4. Is well-structured and easy to read"#;

/// Nomes dos placeholders de um template, em ordem de aparição
pub fn placeholders(template: &str) -> Vec<&str> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Substitui cada `{nome}` pelo valor correspondente em `vars`.
///
/// Variáveis sobrando são ignoradas; placeholders sem valor são erro.
pub fn render_template(template: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
    if let Some(missing) = placeholders(template)
        .into_iter()
        .find(|name| !vars.contains_key(*name))
    {
        return Err(TemplateError::MissingVariable(missing.to_string()));
    }

    let rendered = PLACEHOLDER.replace_all(template, |caps: &regex::Captures<'_>| {
        vars.get(&caps[1]).cloned().unwrap_or_default()
    });

    Ok(rendered.into_owned())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ESTADO DA PESQUISA
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::PipelineError;
use crate::types::{Message, Role, SearchResults, ValidatedSource};

/// Campos do estado, usados para declarar leituras e escritas dos steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    /// Histórico da conversa (semeado pelo driver de entrada)
    Messages,
    /// Plano de pesquisa
    ResearchPlan,
    /// Resultados brutos da busca
    ResearchResults,
    /// Fontes validadas pelo fact-checker
    ValidatedSources,
    /// Resposta final
    FinalAnswer,
}

impl StateField {
    /// Nome do campo em snake_case
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Messages => "messages",
            Self::ResearchPlan => "research_plan",
            Self::ResearchResults => "research_results",
            Self::ValidatedSources => "validated_sources",
            Self::FinalAnswer => "final_answer",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Violação da regra de escrita única
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WriteConflict {
    #[error("field '{0}' was already written in this run")]
    AlreadyWritten(StateField),

    #[error("field '{0}' cannot be written with an empty value")]
    EmptyValue(StateField),
}

/// Estado threaded pelo pipeline.
///
/// Registro de formato fixo: todo campo ainda não escrito contém seu valor
/// vazio. Os campos são privados; a única forma de produzir um novo estado é
/// [`ResearchState::merge`], que devolve uma cópia e nunca altera `self`.
///
/// Cada campo derivado é escrito uma única vez por execução. Quais campos já
/// foram escritos fica registrado à parte: uma busca sem resultados ou um
/// fact-check sem fontes são escritas legítimas de valores vazios.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchState {
    messages: Vec<Message>,
    research_plan: String,
    research_results: SearchResults,
    validated_sources: Vec<ValidatedSource>,
    final_answer: String,
    #[serde(skip)]
    written: BTreeSet<StateField>,
}

impl ResearchState {
    /// Cria o estado inicial com exatamente um turno do usuário
    pub fn from_query(query: &str) -> Result<Self, PipelineError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::precondition("entry", "query is empty"));
        }

        Ok(Self {
            messages: vec![Message::user(query)],
            research_plan: String::new(),
            research_results: SearchResults::default(),
            validated_sources: Vec::new(),
            final_answer: String::new(),
            written: BTreeSet::from([StateField::Messages]),
        })
    }

    /// Histórico da conversa
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Plano de pesquisa (vazio até o planner rodar)
    pub fn research_plan(&self) -> &str {
        &self.research_plan
    }

    /// Resultados de busca (vazios até o research rodar)
    pub fn research_results(&self) -> &SearchResults {
        &self.research_results
    }

    /// Fontes validadas (vazias até o fact-checker rodar)
    pub fn validated_sources(&self) -> &[ValidatedSource] {
        &self.validated_sources
    }

    /// Resposta final (vazia até a síntese rodar)
    pub fn final_answer(&self) -> &str {
        &self.final_answer
    }

    /// Turno do usuário mais recente
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }

    /// Verifica se um campo já foi escrito nesta execução
    pub fn is_written(&self, field: StateField) -> bool {
        self.written.contains(&field)
    }

    /// Aplica uma atualização parcial e retorna um NOVO estado.
    ///
    /// Os campos presentes em `update` são sobrescritos; os demais são
    /// copiados. Falha se algum campo já tiver sido escrito, ou se o plano ou
    /// a resposta vierem em branco. Resultados e fontes vazios são aceitos.
    pub fn merge(&self, update: StateUpdate) -> Result<Self, WriteConflict> {
        let fields = update.written_fields();
        for &field in &fields {
            if self.is_written(field) {
                return Err(WriteConflict::AlreadyWritten(field));
            }
        }

        let mut next = self.clone();

        if let Some(plan) = update.research_plan {
            if plan.trim().is_empty() {
                return Err(WriteConflict::EmptyValue(StateField::ResearchPlan));
            }
            next.research_plan = plan;
        }
        if let Some(results) = update.research_results {
            next.research_results = results;
        }
        if let Some(sources) = update.validated_sources {
            next.validated_sources = sources;
        }
        if let Some(answer) = update.final_answer {
            if answer.trim().is_empty() {
                return Err(WriteConflict::EmptyValue(StateField::FinalAnswer));
            }
            next.final_answer = answer;
        }

        next.written.extend(fields);
        Ok(next)
    }
}

/// Atualização parcial produzida por um step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    research_plan: Option<String>,
    research_results: Option<SearchResults>,
    validated_sources: Option<Vec<ValidatedSource>>,
    final_answer: Option<String>,
}

impl StateUpdate {
    /// Atualização que escreve `research_plan`
    pub fn research_plan(plan: impl Into<String>) -> Self {
        Self {
            research_plan: Some(plan.into()),
            ..Default::default()
        }
    }

    /// Atualização que escreve `research_results`
    pub fn research_results(results: SearchResults) -> Self {
        Self {
            research_results: Some(results),
            ..Default::default()
        }
    }

    /// Atualização que escreve `validated_sources`
    pub fn validated_sources(sources: Vec<ValidatedSource>) -> Self {
        Self {
            validated_sources: Some(sources),
            ..Default::default()
        }
    }

    /// Atualização que escreve `final_answer`
    pub fn final_answer(answer: impl Into<String>) -> Self {
        Self {
            final_answer: Some(answer.into()),
            ..Default::default()
        }
    }

    /// Campos tocados por esta atualização
    pub fn written_fields(&self) -> Vec<StateField> {
        let mut fields = Vec::new();
        if self.research_plan.is_some() {
            fields.push(StateField::ResearchPlan);
        }
        if self.research_results.is_some() {
            fields.push(StateField::ResearchResults);
        }
        if self.validated_sources.is_some() {
            fields.push(StateField::ValidatedSources);
        }
        if self.final_answer.is_some() {
            fields.push(StateField::FinalAnswer);
        }
        fields
    }
}

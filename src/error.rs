// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ERROS DO PIPELINE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Taxonomia de erros em duas camadas:
// - `PipelineError`: o que `run`/`run_research` propagam (chamada externa ou
//   pré-condição violada). Nunca é capturado dentro do pipeline.
// - `GraphError`: erros de montagem do grafo, detectados em `compile()`.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::llm::LlmError;
use crate::search::SearchError;

/// Falha de um colaborador externo (LLM ou busca).
///
/// Rede, autenticação, rate limit e resposta malformada colapsam aqui:
/// o pipeline não precisa distingui-los para decidir o que fazer.
#[derive(Debug, thiserror::Error)]
pub enum ExternalError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("collaborator returned empty content")]
    EmptyResponse,

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Erro propagado por uma execução do pipeline
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Um colaborador externo falhou durante o step `step`
    #[error("external call failed in step '{step}': {source}")]
    ExternalCall {
        step: String,
        #[source]
        source: ExternalError,
    },

    /// O estado não satisfaz o que o nó `node` exige
    #[error("precondition violated at '{node}': {reason}")]
    Precondition { node: String, reason: String },
}

impl PipelineError {
    /// Cria um erro de chamada externa
    pub fn external(step: impl Into<String>, source: impl Into<ExternalError>) -> Self {
        Self::ExternalCall {
            step: step.into(),
            source: source.into(),
        }
    }

    /// Cria um erro de pré-condição
    pub fn precondition(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Precondition {
            node: node.into(),
            reason: reason.into(),
        }
    }

    /// Verdadeiro para falhas de colaborador
    pub fn is_external(&self) -> bool {
        matches!(self, Self::ExternalCall { .. })
    }

    /// Verdadeiro para pré-condições violadas
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. })
    }

    /// Nome do step/nó onde o erro ocorreu
    pub fn location(&self) -> &str {
        match self {
            Self::ExternalCall { step, .. } => step,
            Self::Precondition { node, .. } => node,
        }
    }
}

/// Erros de construção do grafo (retornados por `compile`)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("node '{0}' registered twice")]
    DuplicateNode(String),

    #[error("'{0}' is reserved for the terminal marker")]
    ReservedName(String),

    #[error("edge references unknown node '{0}'")]
    UnknownNode(String),

    #[error("no entry point set")]
    MissingEntryPoint,

    #[error("node '{0}' has more than one outgoing edge")]
    Branching(String),

    #[error("cycle detected at node '{0}'")]
    Cycle(String),

    #[error("node '{0}' has no outgoing edge and cannot reach the end")]
    Unreachable(String),

    #[error("node '{0}' is not on the path from the entry point")]
    DanglingNode(String),

    #[error("node '{node}' reads '{field}' but no earlier node writes it")]
    UnsatisfiedRead { node: String, field: String },

    #[error("field '{field}' is written by both '{first}' and '{second}'")]
    DuplicateWriter {
        field: String,
        first: String,
        second: String,
    },
}

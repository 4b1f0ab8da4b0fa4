// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TIPOS COMPARTILHADOS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tipo de URL (alias para String)
pub type Url = String;

/// Papel de um turno na conversa
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instrução de sistema
    System,
    /// Turno do usuário
    User,
    /// Turno do modelo
    Assistant,
}

impl Role {
    /// Retorna o papel como string (formato OpenAI)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Um turno da conversa (papel + conteúdo)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Quem falou
    pub role: Role,
    /// Texto do turno
    pub content: String,
}

impl Message {
    /// Cria um turno do usuário
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Cria um turno do modelo
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Cria uma instrução de sistema
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Profundidade de busca suportada pelo provedor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    /// Busca rápida, snippets curtos
    Basic,
    /// Busca aprofundada (padrão do pipeline)
    #[default]
    Advanced,
}

impl SearchDepth {
    /// Retorna a profundidade no formato da API
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
        }
    }
}

/// Requisição de busca web
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Texto da query
    pub query: String,
    /// Profundidade
    pub depth: SearchDepth,
    /// Número máximo de resultados
    pub max_results: usize,
    /// Pedir ao provedor um resumo-resposta
    pub include_answer: bool,
    /// Incluir o conteúdo bruto das páginas
    pub include_raw_content: bool,
}

impl SearchRequest {
    /// Cria uma requisição com os padrões do pipeline (advanced, 10 resultados)
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            depth: SearchDepth::Advanced,
            max_results: 10,
            include_answer: true,
            include_raw_content: true,
        }
    }
}

/// Um resultado estruturado de busca
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Identificador da fonte (URL)
    pub source_id: Url,
    /// Título da página
    #[serde(default)]
    pub title: String,
    /// Trecho relevante
    pub content: String,
    /// Conteúdo completo da página, quando solicitado
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
    /// Score de relevância do provedor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl SearchHit {
    /// Cria um hit sem título nem conteúdo bruto
    pub fn new(source_id: impl Into<String>, content: impl Into<String>, score: Option<f32>) -> Self {
        Self {
            source_id: source_id.into(),
            title: String::new(),
            content: content.into(),
            raw_content: None,
            score,
        }
    }
}

/// Resposta completa do provedor de busca
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Resumo gerado pelo provedor (se `include_answer`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Hits em ordem de relevância
    pub hits: Vec<SearchHit>,
}

impl SearchResults {
    /// Cria resultados a partir de hits, sem resumo
    pub fn from_hits(hits: Vec<SearchHit>) -> Self {
        Self { answer: None, hits }
    }

    /// Verdadeiro se nada foi retornado
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty() && self.answer.is_none()
    }

    /// Procura um hit pelo identificador da fonte
    pub fn find(&self, source_id: &str) -> Option<&SearchHit> {
        self.hits.iter().find(|h| h.source_id == source_id)
    }
}

/// Veredito do fact-checker sobre uma fonte
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedSource {
    /// Fonte avaliada (deve existir nos resultados de busca)
    pub source_id: Url,
    /// Se a fonte passou na validação
    pub passed: bool,
    /// Justificativa do veredito
    pub reason: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PIPELINE DE PESQUISA
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Monta o grafo de uma das duas topologias com os colaboradores injetados e
// expõe a superfície de entrada: pergunta → resposta final.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::fmt;
use std::sync::Arc;

use super::graph::{CompiledGraph, ResearchGraph, RunTrace, END};
use super::state::ResearchState;
use super::steps::{PlanningStep, ResearchOptions, ResearchStep, SynthesisStep, ValidationStep};
use crate::error::{ExternalError, GraphError, PipelineError};
use crate::llm::LlmClient;
use crate::search::SearchClient;

/// Formato do pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Topology {
    /// planning → research → fact_checking → answer
    #[default]
    FourStage,
    /// research → answer
    TwoStage,
}

impl Topology {
    /// Interpreta o valor de `RESEARCH_TOPOLOGY`.
    ///
    /// Valores desconhecidos caem no padrão (quatro estágios).
    pub fn from_env(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "two-stage" | "two_stage" | "basic" | "2" => Self::TwoStage,
            "four-stage" | "four_stage" | "advanced" | "4" => Self::FourStage,
            other => {
                log::warn!("⚠ RESEARCH_TOPOLOGY desconhecida ({}), usando four-stage", other);
                Self::FourStage
            }
        }
    }

    /// Opções de busca padrão da topologia
    pub fn default_options(&self) -> ResearchOptions {
        match self {
            Self::FourStage => ResearchOptions::thorough(),
            Self::TwoStage => ResearchOptions::quick(),
        }
    }

    /// Monta e compila o grafo da topologia
    pub fn build(
        &self,
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn SearchClient>,
        options: ResearchOptions,
    ) -> Result<CompiledGraph, GraphError> {
        match self {
            Self::FourStage => four_stage(llm, search, options),
            Self::TwoStage => two_stage(llm, search, options),
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FourStage => write!(f, "four-stage"),
            Self::TwoStage => write!(f, "two-stage"),
        }
    }
}

/// planning → research → fact_checking → answer → END
pub fn four_stage(
    llm: Arc<dyn LlmClient>,
    search: Arc<dyn SearchClient>,
    options: ResearchOptions,
) -> Result<CompiledGraph, GraphError> {
    let mut graph = ResearchGraph::new();
    graph
        .add_node(PlanningStep::NAME, PlanningStep::new(llm.clone()))
        .add_node(ResearchStep::NAME, ResearchStep::after_planning(search, options))
        .add_node(ValidationStep::NAME, ValidationStep::new(llm.clone()))
        .add_node(SynthesisStep::NAME, SynthesisStep::validated(llm))
        .set_entry_point(PlanningStep::NAME)
        .add_edge(PlanningStep::NAME, ResearchStep::NAME)
        .add_edge(ResearchStep::NAME, ValidationStep::NAME)
        .add_edge(ValidationStep::NAME, SynthesisStep::NAME)
        .add_edge(SynthesisStep::NAME, END);

    graph.compile()
}

/// research → answer → END
pub fn two_stage(
    llm: Arc<dyn LlmClient>,
    search: Arc<dyn SearchClient>,
    options: ResearchOptions,
) -> Result<CompiledGraph, GraphError> {
    let mut graph = ResearchGraph::new();
    graph
        .add_node(ResearchStep::NAME, ResearchStep::new(search, options))
        .add_node(SynthesisStep::NAME, SynthesisStep::direct(llm))
        .set_entry_point(ResearchStep::NAME)
        .add_edge(ResearchStep::NAME, SynthesisStep::NAME)
        .add_edge(SynthesisStep::NAME, END);

    graph.compile()
}

/// Pipeline pronto para responder perguntas
pub struct ResearchPipeline {
    topology: Topology,
    graph: CompiledGraph,
}

impl ResearchPipeline {
    /// Cria o pipeline com os colaboradores injetados
    pub fn new(
        topology: Topology,
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn SearchClient>,
        options: ResearchOptions,
    ) -> Result<Self, GraphError> {
        let graph = topology.build(llm, search, options)?;
        log::debug!("🧭 Topologia {}: {}", topology, graph.path().join(" → "));
        Ok(Self { topology, graph })
    }

    /// Cria o pipeline com as opções de busca padrão da topologia
    pub fn with_defaults(
        topology: Topology,
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn SearchClient>,
    ) -> Result<Self, GraphError> {
        Self::new(topology, llm, search, topology.default_options())
    }

    /// Topologia em uso
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Nós na ordem de execução
    pub fn path(&self) -> Vec<&str> {
        self.graph.path()
    }

    /// Responde a pergunta e retorna a resposta final
    pub async fn run_research(&self, query: &str) -> Result<String, PipelineError> {
        let (state, _) = self.run(query).await?;
        let answer = state.final_answer();

        if answer.trim().is_empty() {
            return Err(PipelineError::external(
                SynthesisStep::NAME,
                ExternalError::EmptyResponse,
            ));
        }

        Ok(answer.to_string())
    }

    /// Executa o pipeline e retorna o estado final com a trilha de execução
    pub async fn run(&self, query: &str) -> Result<(ResearchState, RunTrace), PipelineError> {
        let initial = ResearchState::from_query(query)?;
        log::info!("❓ Pergunta: {}", crate::utils::preview(query, 120));
        self.graph.run_traced(initial).await
    }
}

impl fmt::Debug for ResearchPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResearchPipeline")
            .field("topology", &self.topology)
            .field("path", &self.graph.path())
            .finish()
    }
}

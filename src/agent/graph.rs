// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GRAFO DE EXECUÇÃO
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Nós nomeados + arestas "roda depois de" + um ponto de entrada + o marcador
// terminal `END`. `compile()` valida a estrutura uma vez; `run()` percorre o
// caminho único da entrada até `END`, sem retries, sem paralelismo e sem
// roteamento condicional.
//
//   planning ──▶ research ──▶ fact_checking ──▶ answer ──▶ END
//   research ──▶ answer ──▶ END
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

use super::state::{ResearchState, StateField};
use super::steps::Step;
use crate::error::{GraphError, PipelineError};
use crate::utils::ActionTimer;

/// Marcador terminal do grafo
pub const END: &str = "__end__";

/// Builder do grafo.
///
/// Erros de `add_node` são adiados e devolvidos por [`ResearchGraph::compile`],
/// para que a montagem possa ser encadeada.
#[derive(Default)]
pub struct ResearchGraph {
    nodes: BTreeMap<String, Box<dyn Step>>,
    edges: Vec<(String, String)>,
    entry: Option<String>,
    deferred: Option<GraphError>,
}

impl ResearchGraph {
    /// Cria um grafo vazio
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra um nó
    pub fn add_node(&mut self, name: impl Into<String>, step: impl Step + 'static) -> &mut Self {
        let name = name.into();
        if self.deferred.is_none() {
            if name == END {
                self.deferred = Some(GraphError::ReservedName(name));
            } else if self.nodes.contains_key(&name) {
                self.deferred = Some(GraphError::DuplicateNode(name));
            } else {
                self.nodes.insert(name, Box::new(step));
            }
        }
        self
    }

    /// Adiciona a aresta `from → to` (`to` pode ser [`END`])
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    /// Define o nó de entrada
    pub fn set_entry_point(&mut self, name: impl Into<String>) -> &mut Self {
        self.entry = Some(name.into());
        self
    }

    /// Valida a estrutura e produz o grafo executável.
    ///
    /// Exige: caminho linear da entrada até `END`, cada nó com exatamente uma
    /// aresta de saída, sem ciclos, sem nós fora do caminho, e cada campo lido
    /// por um nó escrito por algum nó anterior (ou ser `messages`).
    pub fn compile(self) -> Result<CompiledGraph, GraphError> {
        let Self {
            mut nodes,
            edges,
            entry,
            deferred,
        } = self;

        if let Some(err) = deferred {
            return Err(err);
        }

        let entry = entry.ok_or(GraphError::MissingEntryPoint)?;
        if !nodes.contains_key(&entry) {
            return Err(GraphError::UnknownNode(entry));
        }

        let mut successors: HashMap<&str, &str> = HashMap::new();
        for (from, to) in &edges {
            if from == END {
                return Err(GraphError::ReservedName(from.clone()));
            }
            if !nodes.contains_key(from) {
                return Err(GraphError::UnknownNode(from.clone()));
            }
            if to != END && !nodes.contains_key(to) {
                return Err(GraphError::UnknownNode(to.clone()));
            }
            if successors.insert(from.as_str(), to.as_str()).is_some() {
                return Err(GraphError::Branching(from.clone()));
            }
        }

        if let Some(name) = nodes.keys().find(|n| !successors.contains_key(n.as_str())) {
            return Err(GraphError::Unreachable(name.clone()));
        }

        // Caminho único a partir da entrada
        let mut path: Vec<String> = Vec::with_capacity(nodes.len());
        let mut visited: HashSet<&str> = HashSet::new();
        let mut current = entry.as_str();
        loop {
            if !visited.insert(current) {
                return Err(GraphError::Cycle(current.to_string()));
            }
            path.push(current.to_string());
            match successors.get(current) {
                Some(&next) if next == END => break,
                Some(&next) => current = next,
                None => return Err(GraphError::Unreachable(current.to_string())),
            }
        }

        if let Some(name) = nodes.keys().find(|n| !visited.contains(n.as_str())) {
            return Err(GraphError::DanglingNode(name.clone()));
        }

        check_data_flow(&path, &nodes)?;

        let compiled = path
            .into_iter()
            .filter_map(|name| nodes.remove(&name).map(|step| GraphNode { name, step }))
            .collect();

        Ok(CompiledGraph { nodes: compiled })
    }
}

/// Garante estaticamente que toda leitura tem um escritor anterior e que
/// nenhum campo tem dois escritores.
fn check_data_flow(path: &[String], nodes: &BTreeMap<String, Box<dyn Step>>) -> Result<(), GraphError> {
    let mut writers: HashMap<StateField, &str> = HashMap::new();
    writers.insert(StateField::Messages, "entry");

    for name in path {
        let Some(step) = nodes.get(name) else {
            return Err(GraphError::UnknownNode(name.clone()));
        };

        for field in step.reads() {
            if !writers.contains_key(field) {
                return Err(GraphError::UnsatisfiedRead {
                    node: name.clone(),
                    field: field.to_string(),
                });
            }
        }

        let field = step.writes();
        if let Some(first) = writers.get(&field) {
            return Err(GraphError::DuplicateWriter {
                field: field.to_string(),
                first: first.to_string(),
                second: name.clone(),
            });
        }
        writers.insert(field, name.as_str());
    }

    Ok(())
}

struct GraphNode {
    name: String,
    step: Box<dyn Step>,
}

/// Registro de execução de um nó
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// Nome do nó
    pub node: String,
    /// Campo escrito
    pub field: StateField,
    /// Início da execução
    pub started_at: DateTime<Utc>,
    /// Duração em milissegundos
    pub elapsed_ms: u128,
}

/// Trilha de auditoria de uma execução
#[derive(Debug, Clone, Serialize)]
pub struct RunTrace {
    /// Identificador da execução (apenas para logs)
    pub run_id: Uuid,
    /// Um registro por nó, na ordem de execução
    pub records: Vec<StepRecord>,
}

impl RunTrace {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            records: Vec::new(),
        }
    }

    /// Nós executados, em ordem
    pub fn nodes(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.node.as_str()).collect()
    }

    /// Tempo total somado dos nós
    pub fn total_ms(&self) -> u128 {
        self.records.iter().map(|r| r.elapsed_ms).sum()
    }
}

/// Grafo validado, pronto para execução
pub struct CompiledGraph {
    nodes: Vec<GraphNode>,
}

impl std::fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("path", &self.path())
            .finish()
    }
}

impl CompiledGraph {
    /// Nomes dos nós na ordem de execução
    pub fn path(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    /// Executa o caminho inteiro e retorna o estado no marcador terminal
    pub async fn run(&self, initial: ResearchState) -> Result<ResearchState, PipelineError> {
        self.run_traced(initial).await.map(|(state, _)| state)
    }

    /// Como [`CompiledGraph::run`], devolvendo também a trilha de execução
    pub async fn run_traced(
        &self,
        initial: ResearchState,
    ) -> Result<(ResearchState, RunTrace), PipelineError> {
        let mut trace = RunTrace::new();
        let mut state = initial;

        log::info!(
            "🚀 [{}] Pipeline: {} → END",
            trace.run_id,
            self.path().join(" → ")
        );

        for node in &self.nodes {
            let step = node.step.as_ref();
            let field = step.writes();

            check_preconditions(&node.name, step, &state)?;

            let started_at = Utc::now();
            let timer = ActionTimer::start(&node.name);

            let update = step.run(&state).await.map_err(|e| {
                log::error!("❌ [{}] {} falhou: {}", trace.run_id, node.name, e);
                e
            })?;

            let written = update.written_fields();
            if written != [field] {
                return Err(PipelineError::precondition(
                    &node.name,
                    format!("step must write exactly '{}', wrote {:?}", field, written),
                ));
            }

            state = state
                .merge(update)
                .map_err(|conflict| PipelineError::precondition(&node.name, conflict.to_string()))?;

            trace.records.push(StepRecord {
                node: node.name.clone(),
                field,
                started_at,
                elapsed_ms: timer.stop_and_log(),
            });
        }

        log::info!(
            "🏁 [{}] Pipeline concluído em {}ms",
            trace.run_id,
            trace.total_ms()
        );

        Ok((state, trace))
    }
}

fn check_preconditions(node: &str, step: &dyn Step, state: &ResearchState) -> Result<(), PipelineError> {
    if let Some(missing) = step.reads().iter().find(|f| !state.is_written(**f)) {
        return Err(PipelineError::precondition(
            node,
            format!("'{}' has not been written", missing),
        ));
    }

    let field = step.writes();
    if state.is_written(field) {
        return Err(PipelineError::precondition(
            node,
            format!("'{}' was already written before this step", field),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::state::StateUpdate;
    use crate::agent::steps::MockStep;
    use crate::error::ExternalError;
    use crate::search::SearchError;
    use crate::types::{SearchHit, SearchResults};
    use async_trait::async_trait;

    /// Step fixo para testes de estrutura
    struct StubStep {
        reads: &'static [StateField],
        writes: StateField,
    }

    #[async_trait]
    impl Step for StubStep {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn reads(&self) -> &'static [StateField] {
            self.reads
        }

        fn writes(&self) -> StateField {
            self.writes
        }

        async fn run(&self, _state: &ResearchState) -> Result<StateUpdate, PipelineError> {
            Ok(update_for(self.writes))
        }
    }

    const USER_ONLY: &[StateField] = &[StateField::Messages];

    fn stub(reads: &'static [StateField], writes: StateField) -> StubStep {
        StubStep { reads, writes }
    }

    fn results() -> SearchResults {
        SearchResults::from_hits(vec![SearchHit::new("x", "4", Some(1.0))])
    }

    fn update_for(field: StateField) -> StateUpdate {
        match field {
            StateField::ResearchPlan => StateUpdate::research_plan("plan"),
            StateField::ResearchResults => StateUpdate::research_results(results()),
            StateField::ValidatedSources => StateUpdate::validated_sources(vec![
                crate::types::ValidatedSource {
                    source_id: "x".into(),
                    passed: true,
                    reason: "ok".into(),
                },
            ]),
            StateField::FinalAnswer | StateField::Messages => StateUpdate::final_answer("4"),
        }
    }

    fn mock_step(
        reads: &'static [StateField],
        writes: StateField,
        expected_runs: usize,
    ) -> MockStep {
        let mut step = MockStep::new();
        step.expect_name().return_const("mock");
        step.expect_reads().return_const(reads);
        step.expect_writes().return_const(writes);
        step.expect_run()
            .times(expected_runs)
            .returning(move |_| Ok(update_for(writes)));
        step
    }

    fn two_node_graph() -> ResearchGraph {
        let mut graph = ResearchGraph::new();
        graph
            .add_node("research", stub(&[StateField::Messages], StateField::ResearchResults))
            .add_node(
                "answer",
                stub(
                    &[StateField::Messages, StateField::ResearchResults],
                    StateField::FinalAnswer,
                ),
            )
            .add_edge("research", "answer")
            .add_edge("answer", END)
            .set_entry_point("research");
        graph
    }

    #[test]
    fn test_compile_linear_path() {
        let compiled = two_node_graph().compile().unwrap();
        assert_eq!(compiled.path(), vec!["research", "answer"]);
    }

    #[test]
    fn test_compile_path_follows_edges_not_insertion_order() {
        let mut graph = ResearchGraph::new();
        graph
            .add_node("b", stub(&[StateField::ResearchPlan], StateField::FinalAnswer))
            .add_node("a", stub(&[], StateField::ResearchPlan))
            .add_edge("b", END)
            .add_edge("a", "b")
            .set_entry_point("a");

        assert_eq!(graph.compile().unwrap().path(), vec!["a", "b"]);
    }

    #[test]
    fn test_compile_rejects_duplicate_and_reserved_names() {
        let mut graph = two_node_graph();
        graph.add_node("research", stub(&[], StateField::ResearchPlan));
        assert_eq!(
            graph.compile().unwrap_err(),
            GraphError::DuplicateNode("research".into())
        );

        let mut graph = ResearchGraph::new();
        graph.add_node(END, stub(&[], StateField::ResearchPlan));
        assert_eq!(graph.compile().unwrap_err(), GraphError::ReservedName(END.into()));
    }

    #[test]
    fn test_compile_rejects_missing_or_unknown_entry() {
        let mut graph = ResearchGraph::new();
        graph
            .add_node("a", stub(&[], StateField::ResearchPlan))
            .add_edge("a", END);
        assert_eq!(graph.compile().unwrap_err(), GraphError::MissingEntryPoint);

        let mut graph = two_node_graph();
        graph.set_entry_point("nope");
        assert_eq!(graph.compile().unwrap_err(), GraphError::UnknownNode("nope".into()));
    }

    #[test]
    fn test_compile_rejects_unknown_edge_target() {
        let mut graph = two_node_graph();
        graph.add_edge("answer", "ghost");
        assert!(matches!(
            graph.compile().unwrap_err(),
            GraphError::UnknownNode(n) if n == "ghost"
        ));
    }

    #[test]
    fn test_compile_rejects_branching() {
        let mut graph = two_node_graph();
        graph.add_edge("research", END);
        assert_eq!(graph.compile().unwrap_err(), GraphError::Branching("research".into()));
    }

    #[test]
    fn test_compile_rejects_cycle() {
        let mut graph = ResearchGraph::new();
        graph
            .add_node("a", stub(&[], StateField::ResearchPlan))
            .add_node("b", stub(&[], StateField::FinalAnswer))
            .add_edge("a", "b")
            .add_edge("b", "a")
            .set_entry_point("a");
        assert_eq!(graph.compile().unwrap_err(), GraphError::Cycle("a".into()));
    }

    #[test]
    fn test_compile_rejects_node_without_exit() {
        let mut graph = ResearchGraph::new();
        graph
            .add_node("a", stub(&[], StateField::ResearchPlan))
            .set_entry_point("a");
        assert_eq!(graph.compile().unwrap_err(), GraphError::Unreachable("a".into()));
    }

    #[test]
    fn test_compile_rejects_dangling_node() {
        let mut graph = two_node_graph();
        graph
            .add_node("orphan", stub(&[], StateField::ValidatedSources))
            .add_edge("orphan", END);
        assert_eq!(graph.compile().unwrap_err(), GraphError::DanglingNode("orphan".into()));
    }

    #[test]
    fn test_compile_rejects_unsatisfied_read() {
        let mut graph = ResearchGraph::new();
        graph
            .add_node(
                "answer",
                stub(&[StateField::ValidatedSources], StateField::FinalAnswer),
            )
            .add_edge("answer", END)
            .set_entry_point("answer");

        assert_eq!(
            graph.compile().unwrap_err(),
            GraphError::UnsatisfiedRead {
                node: "answer".into(),
                field: "validated_sources".into(),
            }
        );
    }

    #[test]
    fn test_compile_rejects_duplicate_writer() {
        let mut graph = ResearchGraph::new();
        graph
            .add_node("a", stub(&[], StateField::ResearchPlan))
            .add_node("b", stub(&[], StateField::ResearchPlan))
            .add_edge("a", "b")
            .add_edge("b", END)
            .set_entry_point("a");

        assert!(matches!(
            graph.compile().unwrap_err(),
            GraphError::DuplicateWriter { second, .. } if second == "b"
        ));
    }

    #[test]
    fn test_run_threads_state_through_path() {
        let compiled = two_node_graph().compile().unwrap();
        let initial = ResearchState::from_query("What is 2+2?").unwrap();

        let (state, trace) = tokio_test::block_on(compiled.run_traced(initial)).unwrap();

        assert_eq!(state.research_results(), &results());
        assert_eq!(state.final_answer(), "4");
        assert_eq!(trace.nodes(), vec!["research", "answer"]);
        assert_eq!(trace.records[1].field, StateField::FinalAnswer);
    }

    #[tokio::test]
    async fn test_failure_stops_the_run() {
        let mut failing = MockStep::new();
        failing.expect_name().return_const("research");
        failing.expect_reads().return_const(USER_ONLY);
        failing.expect_writes().return_const(StateField::ResearchResults);
        failing.expect_run().times(1).returning(|_| {
            Err(PipelineError::external(
                "research",
                ExternalError::Search(SearchError::RateLimitError),
            ))
        });

        let synthesis = mock_step(
            &[StateField::Messages, StateField::ResearchResults],
            StateField::FinalAnswer,
            0,
        );

        let mut graph = ResearchGraph::new();
        graph
            .add_node("research", failing)
            .add_node("answer", synthesis)
            .add_edge("research", "answer")
            .add_edge("answer", END)
            .set_entry_point("research");

        let err = graph
            .compile()
            .unwrap()
            .run(ResearchState::from_query("q").unwrap())
            .await
            .unwrap_err();

        assert!(err.is_external());
        assert_eq!(err.location(), "research");
    }

    #[tokio::test]
    async fn test_each_node_runs_once_in_order() {
        let mut graph = ResearchGraph::new();
        graph
            .add_node("planning", mock_step(&[StateField::Messages], StateField::ResearchPlan, 1))
            .add_node(
                "research",
                mock_step(&[StateField::Messages], StateField::ResearchResults, 1),
            )
            .add_node(
                "fact_checking",
                mock_step(&[StateField::ResearchResults], StateField::ValidatedSources, 1),
            )
            .add_node(
                "answer",
                mock_step(
                    &[StateField::ResearchPlan, StateField::ValidatedSources],
                    StateField::FinalAnswer,
                    1,
                ),
            )
            .add_edge("planning", "research")
            .add_edge("research", "fact_checking")
            .add_edge("fact_checking", "answer")
            .add_edge("answer", END)
            .set_entry_point("planning");

        let (state, trace) = graph
            .compile()
            .unwrap()
            .run_traced(ResearchState::from_query("q").unwrap())
            .await
            .unwrap();

        assert_eq!(
            trace.nodes(),
            vec!["planning", "research", "fact_checking", "answer"]
        );
        assert_eq!(state.final_answer(), "4");
    }

    #[tokio::test]
    async fn test_already_written_field_is_precondition_error() {
        let compiled = two_node_graph().compile().unwrap();
        let initial = ResearchState::from_query("q")
            .unwrap()
            .merge(StateUpdate::research_results(results()))
            .unwrap();

        let err = compiled.run(initial).await.unwrap_err();
        assert!(err.is_precondition());
        assert_eq!(err.location(), "research");
    }

    #[tokio::test]
    async fn test_step_writing_wrong_field_is_precondition_error() {
        let mut rogue = MockStep::new();
        rogue.expect_name().return_const("rogue");
        rogue.expect_reads().return_const(USER_ONLY);
        rogue.expect_writes().return_const(StateField::ResearchPlan);
        rogue
            .expect_run()
            .times(1)
            .returning(|_| Ok(StateUpdate::final_answer("sneaky")));

        let mut graph = ResearchGraph::new();
        graph
            .add_node("planning", rogue)
            .add_edge("planning", END)
            .set_entry_point("planning");

        let err = graph
            .compile()
            .unwrap()
            .run(ResearchState::from_query("q").unwrap())
            .await
            .unwrap_err();

        assert!(err.is_precondition());
        assert!(err.to_string().contains("research_plan"));
    }

    #[test]
    fn test_trace_serializes() {
        let compiled = two_node_graph().compile().unwrap();
        let (_, trace) =
            tokio_test::block_on(compiled.run_traced(ResearchState::from_query("q").unwrap()))
                .unwrap();

        let json = serde_json::to_value(&trace).unwrap();
        assert_eq!(json["records"][0]["node"], "research");
        assert_eq!(json["records"][0]["field"], "research_results");
    }
}

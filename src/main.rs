// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RESEARCH PIPELINE CLI
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// CLI para execução do pipeline de pesquisa.
//
// Uso:
//   research-pipeline-cli "What is 2+2?"
//   RESEARCH_TOPOLOGY=two-stage research-pipeline-cli "pergunta"
//
// Apenas a resposta vai para stdout; logs e diagnósticos vão para stderr.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use anyhow::Context;
use research_pipeline::agent::ResearchPipeline;
use research_pipeline::llm::OpenAiClient;
use research_pipeline::search::TavilyClient;
use research_pipeline::{
    create_tokio_runtime, load_llm_config, load_pipeline_config, load_search_config,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Tenta carregar o arquivo .env de múltiplos locais possíveis
fn load_dotenv() {
    let possible_paths = [
        // Diretório atual
        PathBuf::from(".env"),
        // Diretório pai
        PathBuf::from("../.env"),
    ];

    for path in &possible_paths {
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(_) => {
                    eprintln!(
                        "✓ Carregado .env de: {:?}",
                        path.canonicalize().unwrap_or(path.clone())
                    );
                    return;
                }
                Err(e) => {
                    eprintln!("⚠ Erro ao carregar {:?}: {}", path, e);
                }
            }
        }
    }

    if dotenvy::dotenv().is_err() {
        eprintln!("⚠ Nenhum arquivo .env encontrado. Certifique-se de que as API keys estão definidas.");
    }
}

fn print_usage(program: &str) {
    eprintln!("Research Pipeline CLI v{}", research_pipeline::VERSION);
    eprintln!();
    eprintln!("Uso: {} <pergunta>", program);
    eprintln!();
    eprintln!("Variáveis de ambiente:");
    eprintln!("  RESEARCH_TOPOLOGY   four-stage (padrão) | two-stage");
    eprintln!("  LLM_PROVIDER        openai (padrão) | gemini");
    eprintln!("  SEARCH_MAX_RESULTS  resultados por busca (5..=10)");
    eprintln!();
    eprintln!("Exemplo:");
    eprintln!("  {} \"What is 2+2?\"", program);
}

fn main() -> anyhow::Result<()> {
    // Carregar .env PRIMEIRO, antes de qualquer coisa
    load_dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let program = args
        .first()
        .map(String::as_str)
        .unwrap_or("research-pipeline-cli");

    let question = args.get(1..).map(|rest| rest.join(" ")).unwrap_or_default();
    if question.trim().is_empty() {
        print_usage(program);
        std::process::exit(1);
    }

    // Configuração completa antes de qualquer chamada externa
    let llm_config = load_llm_config().context("configuração do LLM")?;
    let search_config = load_search_config().context("configuração da busca")?;
    let pipeline_config = load_pipeline_config();

    let llm = Arc::new(OpenAiClient::from_config(&llm_config).context("cliente LLM")?);
    let search = Arc::new(TavilyClient::from_config(&search_config).context("cliente de busca")?);

    let topology = pipeline_config.topology;
    let mut options = topology.default_options();
    if let Some(max_results) = pipeline_config.max_results {
        options = options.with_max_results(max_results);
    }

    let pipeline = ResearchPipeline::new(topology, llm, search, options)
        .context("falha ao montar o grafo do pipeline")?;

    let runtime = create_tokio_runtime().context("falha ao criar o runtime tokio")?;
    let (state, trace) = runtime.block_on(pipeline.run(&question))?;

    let answer = state.final_answer();
    if answer.trim().is_empty() {
        anyhow::bail!("pipeline terminou sem resposta final");
    }

    for record in &trace.records {
        log::debug!("   {} → {} ({}ms)", record.node, record.field, record.elapsed_ms);
    }
    log::info!(
        "📊 {} nós em {}ms (run {})",
        trace.records.len(),
        trace.total_ms(),
        trace.run_id
    );

    println!("{}", answer);
    Ok(())
}

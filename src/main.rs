use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tracing::{info, warn};

use qrag_agent::{CHUNK_INDEX_NAME, QUESTION_INDEX_NAME, QuestionInfo, RAGAgent};
use qrag_core::{Chunk, EmbeddingModel, LLMProvider, Node, Question, SimilarityMetric};
use qrag_graph::{GraphDatabase, Neo4jGraphStore};
use qrag_llm::{ClientConfig, ClientKind, EmbeddingConfig, build_client, build_embedding_model};

mod dataset;

use dataset::{Predictions, SquadDataset, load_chunks, write_predictions};

type Database = GraphDatabase<Neo4jGraphStore, Box<dyn EmbeddingModel>>;
type Agent = RAGAgent<Box<dyn LLMProvider>, Neo4jGraphStore, Box<dyn EmbeddingModel>>;

#[derive(Parser)]
#[command(name = "qrag")]
#[command(about = "Question-augmented graph RAG over Neo4j", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Model client to use (overrides QRAG_CLIENT)
    #[arg(long, global = true)]
    client: Option<ClientKind>,

    /// Log every prompt and model response
    #[arg(long, global = true)]
    log_prompts: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Declare the chunk and question vector indexes
    InitIndexes {
        /// Embedding dimension (defaults to QRAG_EMBEDDING_DIMENSION)
        #[arg(long)]
        dimension: Option<usize>,
        #[arg(long, default_value = "cosine")]
        metric: SimilarityMetric,
    },
    /// Store and embed chunks from a JSON array of {id, text, header?} objects
    IndexChunks {
        #[arg(long)]
        file: PathBuf,
    },
    /// Answer a question from the graph
    Ask {
        question: String,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        #[arg(long, default_value_t = 1)]
        top_k_question: usize,
        #[arg(long, default_value_t = 0.0)]
        threshold: f32,
        /// Print the retrieved context before the answer
        #[arg(long)]
        show_context: bool,
    },
    /// Link dataset questions to the chunks supporting their reference answers
    Feedback {
        #[arg(long)]
        dataset_file: PathBuf,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        #[arg(long, default_value_t = 0.0)]
        threshold: f32,
    },
    /// Answer every dataset question and write SQuAD-format predictions
    Generate {
        #[arg(long)]
        dataset_file: PathBuf,
        #[arg(long, default_value = "results/prediction")]
        prediction_path: PathBuf,
        /// Output file name, defaults to a random UUID
        #[arg(long)]
        run_id: Option<String>,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        #[arg(long, default_value_t = 1)]
        top_k_question: usize,
        #[arg(long, default_value_t = 0.0)]
        threshold: f32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        format!(
            "qrag={0},qrag_agent={0},qrag_graph={0},qrag_llm={0}",
            log_level
        )
    });
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(env_filter))
        .init();

    match cli.command {
        Commands::InitIndexes { dimension, metric } => {
            let embedding_config = EmbeddingConfig::from_env()?;
            let dimension = dimension.unwrap_or(embedding_config.dimension);
            let database = connect_database(&embedding_config)?;

            database
                .initiate_vector_indexing(Chunk::TYPE_LABEL, CHUNK_INDEX_NAME, dimension, metric)
                .await?;
            database
                .initiate_vector_indexing(Question::TYPE_LABEL, QUESTION_INDEX_NAME, dimension, metric)
                .await?;

            println!(
                "{} {} and {} ({} dimensions, {})",
                "✅ Vector indexes ready:".green(),
                CHUNK_INDEX_NAME,
                QUESTION_INDEX_NAME,
                dimension,
                metric
            );
        }
        Commands::IndexChunks { file } => {
            let database = connect_database(&EmbeddingConfig::from_env()?)?;
            let records = load_chunks(&file)?;
            let total = records.len();

            let mut embedded = 0;
            for record in records {
                let chunk: Node = record.into_chunk()?.into();
                database.add_node(&chunk).await?;
                if database.generate_vector_index(&chunk).await? {
                    embedded += 1;
                }
            }

            println!(
                "{} {} chunks stored, {} newly embedded",
                "✅".green(),
                total,
                embedded
            );
        }
        Commands::Ask {
            question,
            top_k,
            top_k_question,
            threshold,
            show_context,
        } => {
            let agent = build_agent(cli.client)?;
            let context = agent
                .retrieve_context(&question, top_k, top_k_question, threshold)
                .await?;

            if context.is_empty() {
                warn!("no context retrieved for the question");
            }
            if show_context {
                println!("{}", "Context:".cyan().bold());
                println!("{}\n", context);
            }

            let answer = agent
                .generate_response(&question, &context, cli.log_prompts)
                .await?;
            println!("{}", "Answer:".green().bold());
            println!("{}", answer);
        }
        Commands::Feedback {
            dataset_file,
            top_k,
            threshold,
        } => {
            let agent = build_agent(cli.client)?;
            let dataset = SquadDataset::load(&dataset_file)?;

            let mut recorded = 0;
            let mut links = 0;
            for qa in dataset.questions() {
                let Some(answer) = qa.first_answer() else {
                    warn!(id = %qa.id, "question has no reference answer, skipping");
                    continue;
                };

                let info = QuestionInfo::new(&qa.id, &qa.question);
                links += agent.loop_qrag(answer, &info, top_k, threshold).await?.len();
                recorded += 1;
            }

            println!(
                "{} {} questions recorded with {} answer links",
                "✅".green(),
                recorded,
                links
            );
        }
        Commands::Generate {
            dataset_file,
            prediction_path,
            run_id,
            top_k,
            top_k_question,
            threshold,
        } => {
            let agent = build_agent(cli.client)?;
            let dataset = SquadDataset::load(&dataset_file)?;
            let run_id = run_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

            let mut predictions = Predictions::new();
            for qa in dataset.questions() {
                let answer = agent
                    .answer(&qa.question, top_k, top_k_question, threshold, cli.log_prompts)
                    .await?;
                info!(id = %qa.id, "answered");
                predictions.insert(qa.id.clone(), answer.trim().to_string());
            }

            let path = write_predictions(&prediction_path, &run_id, &predictions)?;
            println!(
                "{} {} predictions written to {}",
                "✅".green(),
                predictions.len(),
                path.display()
            );
        }
    }

    Ok(())
}

fn connect_database(embedding_config: &EmbeddingConfig) -> Result<Database> {
    let store = Neo4jGraphStore::from_env()?;
    let embedding_model = build_embedding_model(embedding_config)?;
    info!(
        uri = %store.config().uri,
        database = %store.config().database,
        embedding_model = %embedding_model.model_name(),
        "connected to graph store"
    );

    Ok(GraphDatabase::new(store, embedding_model))
}

fn build_agent(client: Option<ClientKind>) -> Result<Agent> {
    let client_config = match client {
        Some(kind) => ClientConfig::from_env_for(kind)?,
        None => ClientConfig::from_env()?,
    };
    let llm = build_client(&client_config)?;
    let database = connect_database(&EmbeddingConfig::from_env()?)?;

    Ok(RAGAgent::new(llm, database))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask_defaults() {
        let cli = Cli::parse_from(["qrag", "ask", "Who is hateful?"]);
        let Commands::Ask {
            question,
            top_k,
            top_k_question,
            threshold,
            show_context,
        } = cli.command
        else {
            panic!("expected ask");
        };

        assert_eq!(question, "Who is hateful?");
        assert_eq!((top_k, top_k_question), (10, 1));
        assert_eq!(threshold, 0.0);
        assert!(!show_context);
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::parse_from([
            "qrag",
            "generate",
            "--dataset-file",
            "dev-v1.1.json",
            "--run-id",
            "baseline",
            "--client",
            "openai",
            "--log-prompts",
        ]);

        assert_eq!(cli.client, Some(ClientKind::OpenAI));
        assert!(cli.log_prompts);
        let Commands::Generate { prediction_path, run_id, .. } = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(prediction_path, PathBuf::from("results/prediction"));
        assert_eq!(run_id.as_deref(), Some("baseline"));
    }

    #[test]
    fn test_parse_metric() {
        let cli = Cli::parse_from(["qrag", "init-indexes", "--dimension", "768", "--metric", "EUCLIDEAN"]);
        let Commands::InitIndexes { dimension, metric } = cli.command else {
            panic!("expected init-indexes");
        };
        assert_eq!(dimension, Some(768));
        assert_eq!(metric, SimilarityMetric::Euclidean);
    }
}

//! RAG orchestrator

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use qrag_core::{
    Chunk, EmbeddingModel, GraphStore, LLMProvider, Node, Passage, Question, Result,
};
use qrag_graph::GraphDatabase;

use crate::prompts::answer_with_context_prompt;

/// Vector index over `Chunk` embeddings
pub const CHUNK_INDEX_NAME: &str = "chunk_similarity";
/// Vector index over `Question` embeddings
pub const QUESTION_INDEX_NAME: &str = "question_similarity";
/// Relationship from a question to the chunks that answer it
pub const HAS_ANSWER: &str = "HAS_ANSWER";

/// A question to record in the feedback graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionInfo {
    pub id: String,
    pub text: String,
}

impl QuestionInfo {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Render passages as a context block.
///
/// Each passage becomes `Title: {header}\n{text}` when it carries a header, or
/// just its text otherwise. Segments keep their input order and are separated
/// by a blank line.
pub fn construct_context<'a>(passages: impl IntoIterator<Item = &'a Passage>) -> String {
    passages
        .into_iter()
        .map(|passage| match &passage.header {
            Some(header) => format!("Title: {}\n{}", header, passage.text),
            None => passage.text.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Question-augmented RAG agent
pub struct RAGAgent<L: LLMProvider, S: GraphStore, E: EmbeddingModel> {
    llm: L,
    database: GraphDatabase<S, E>,
}

impl<L: LLMProvider, S: GraphStore, E: EmbeddingModel> RAGAgent<L, S, E> {
    /// Create a new agent over a model client and a graph database
    pub fn new(llm: L, database: GraphDatabase<S, E>) -> Self {
        Self { llm, database }
    }

    pub fn llm(&self) -> &L {
        &self.llm
    }

    pub fn database(&self) -> &GraphDatabase<S, E> {
        &self.database
    }

    /// Build the context for a query from similar chunks and from the chunks
    /// linked to the most similar previously seen question.
    ///
    /// Both searches drop results scoring below `threshold`. Only the first
    /// qualifying question contributes; when none qualifies the chunk block is
    /// returned alone.
    pub async fn retrieve_context(
        &self,
        query: &str,
        top_k: usize,
        top_k_question: usize,
        threshold: f32,
    ) -> Result<String> {
        let chunks = self
            .database
            .retrieve_similar_nodes(query, top_k, CHUNK_INDEX_NAME, threshold)
            .await?;

        let questions = self
            .database
            .retrieve_similar_nodes_neighbours(query, HAS_ANSWER, top_k_question, QUESTION_INDEX_NAME)
            .await?;

        let chunk_context = construct_context(chunks.iter().map(|chunk| &chunk.passage));

        let question_context = match questions.iter().find(|m| m.node.score >= threshold) {
            Some(matched) => {
                debug!(question = %matched.node.passage.id, score = matched.node.score, "using question neighbourhood");
                construct_context(&matched.neighbours)
            }
            None => {
                debug!(query, threshold, "no similar question above threshold");
                String::new()
            }
        };

        Ok([chunk_context, question_context]
            .into_iter()
            .filter(|block| !block.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    /// Ask the model to answer `question` from `context`
    pub async fn generate_response(&self, question: &str, context: &str, logging: bool) -> Result<String> {
        let prompt = answer_with_context_prompt()
            .format(&[("context", context), ("question", question)])?;

        self.llm.run(&prompt, logging).await
    }

    /// Retrieve context for `question` and generate the answer
    pub async fn answer(
        &self,
        question: &str,
        top_k: usize,
        top_k_question: usize,
        threshold: f32,
        logging: bool,
    ) -> Result<String> {
        let context = self
            .retrieve_context(question, top_k, top_k_question, threshold)
            .await?;
        self.generate_response(question, &context, logging).await
    }

    /// Record a question together with the chunks that support its known answer.
    ///
    /// Chunks similar to `ground_truth_answer` are linked from the question by
    /// `HAS_ANSWER`. The question itself is stored and embedded so later queries
    /// can reach it through the question index. Returns the linked chunk ids.
    pub async fn loop_qrag(
        &self,
        ground_truth_answer: &str,
        question_info: &QuestionInfo,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<String>> {
        let chunks = self
            .database
            .retrieve_similar_nodes(ground_truth_answer, top_k, CHUNK_INDEX_NAME, threshold)
            .await?;

        let question: Node = Question::from_text(&question_info.id, &question_info.text).into();
        self.database.add_node(&question).await?;
        self.database.generate_vector_index(&question).await?;

        let mut linked = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let chunk_node = self
                .database
                .get_node_with_id(&chunk.passage.id, Chunk::TYPE_LABEL)
                .await?;
            self.database
                .add_relationship(&question, &chunk_node, HAS_ANSWER)
                .await?;
            linked.push(chunk_node.id);
        }

        info!(question = %question.id, linked = linked.len(), "question linked to answer chunks");
        Ok(linked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(id: &str, text: &str, header: Option<&str>) -> Passage {
        Passage {
            id: id.to_string(),
            text: text.to_string(),
            header: header.map(str::to_string),
        }
    }

    #[test]
    fn test_construct_context_renders_headers() {
        let passages = [passage("1", "A", None), passage("2", "B", Some("H"))];
        let context = construct_context(&passages);

        assert_eq!(context, "A\n\nTitle: H\nB");
        let segments: Vec<&str> = context.split("\n\n").collect();
        assert!(segments.contains(&"A"));
        assert!(segments.contains(&"Title: H\nB"));
    }

    #[test]
    fn test_construct_context_is_deterministic() {
        let passages: Vec<Passage> = (0..8)
            .map(|i| passage(&i.to_string(), &format!("text {}", i), None))
            .collect();

        assert_eq!(construct_context(&passages), construct_context(&passages));
        assert!(construct_context(&passages).starts_with("text 0\n\ntext 1"));
    }

    #[test]
    fn test_construct_context_empty() {
        assert_eq!(construct_context(&Vec::<Passage>::new()), "");
    }
}

//! SQuAD-style datasets, chunk files and prediction output

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use qrag_core::{Chunk, Metadata};
use serde_json::Value;

/// SQuAD v1.1 dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadDataset {
    #[serde(default)]
    pub version: Option<String>,
    pub data: Vec<Article>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub title: String,
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paragraph {
    pub context: String,
    pub qas: Vec<QuestionAnswers>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnswers {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    #[serde(default)]
    pub answer_start: usize,
}

impl SquadDataset {
    /// Load a dataset from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse dataset {}", path.display()))
    }

    /// Every question in document order
    pub fn questions(&self) -> impl Iterator<Item = &QuestionAnswers> {
        self.data
            .iter()
            .flat_map(|article| &article.paragraphs)
            .flat_map(|paragraph| &paragraph.qas)
    }
}

impl QuestionAnswers {
    /// The first reference answer, if any
    pub fn first_answer(&self) -> Option<&str> {
        self.answers.first().map(|answer| answer.text.as_str())
    }
}

/// Predictions keyed by question id, the format the SQuAD evaluator reads
pub type Predictions = BTreeMap<String, String>;

/// Write predictions to `{dir}/{run_id}.json`, creating `dir` if needed
pub fn write_predictions(dir: &Path, run_id: &str, predictions: &Predictions) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create prediction directory {}", dir.display()))?;

    let path = dir.join(format!("{}.json", run_id));
    let json = serde_json::to_string_pretty(predictions)?;
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(path)
}

/// One entry of a chunk file: `text` is required, `id` defaults to a fresh
/// UUID, and any other keys are kept as metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(flatten)]
    pub extra: Metadata,
}

impl ChunkRecord {
    pub fn into_chunk(self) -> Result<Chunk> {
        let id = self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut metadata = self.extra;
        metadata.insert("text".to_string(), Value::String(self.text));
        if let Some(header) = self.header {
            metadata.insert("header".to_string(), Value::String(header));
        }

        Ok(Chunk::new(id, metadata)?)
    }
}

/// Load a JSON array of chunk records
pub fn load_chunks(path: &Path) -> Result<Vec<ChunkRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read chunk file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse chunk file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use tempfile::TempDir;

    const SQUAD: &str = r#"{
        "version": "1.1",
        "data": [{
            "title": "Characters",
            "paragraphs": [{
                "context": "Peter is hateful. Marley plays the guitar.",
                "qas": [
                    {"id": "q1", "question": "Who is hateful?", "answers": [{"text": "Peter", "answer_start": 0}]},
                    {"id": "q2", "question": "What does Marley play?", "answers": [{"text": "the guitar", "answer_start": 31}, {"text": "guitar", "answer_start": 35}]},
                    {"id": "q3", "question": "Who is kind?", "answers": []}
                ]
            }]
        }]
    }"#;

    #[test]
    fn test_load_squad_dataset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dev.json");
        fs::write(&path, SQUAD).unwrap();

        let dataset = SquadDataset::load(&path).unwrap();
        let questions: Vec<&QuestionAnswers> = dataset.questions().collect();

        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0].question, "Who is hateful?");
        assert_eq!(questions[1].first_answer(), Some("the guitar"));
        assert_eq!(questions[2].first_answer(), None);
    }

    #[test]
    fn test_missing_dataset_names_path() {
        let err = SquadDataset::load(Path::new("/nonexistent/dev.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/dev.json"));
    }

    #[test]
    fn test_write_predictions() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("prediction");

        let mut predictions = Predictions::new();
        predictions.insert("q2".to_string(), "the guitar".to_string());
        predictions.insert("q1".to_string(), "Peter".to_string());

        let path = write_predictions(&output, "run-1", &predictions).unwrap();
        assert_eq!(path, output.join("run-1.json"));
        assert_snapshot!(fs::read_to_string(&path).unwrap(), @r#"
        {
          "q1": "Peter",
          "q2": "the guitar"
        }
        "#);
    }

    #[test]
    fn test_chunk_records() {
        let records: Vec<ChunkRecord> = serde_json::from_str(
            r#"[
                {"id": "c1", "text": "Peter is hateful", "header": "Characters", "source": "notes.pdf"},
                {"text": "Marley plays the guitar"}
            ]"#,
        )
        .unwrap();

        let mut chunks = records.into_iter().map(|r| r.into_chunk().unwrap());
        let first = chunks.next().unwrap();
        assert_eq!(first.node().id, "c1");
        assert_eq!(first.node().header(), Some("Characters"));
        assert_eq!(first.node().metadata["source"], "notes.pdf");

        let second = chunks.next().unwrap();
        assert!(uuid::Uuid::parse_str(&second.node().id).is_ok());
        assert_eq!(second.node().text(), Some("Marley plays the guitar"));
    }
}

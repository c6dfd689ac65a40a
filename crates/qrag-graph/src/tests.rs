//! Adapter tests against the in-memory store

#[cfg(test)]
mod snapshot_tests {
    use crate::{Chunk, Error, GraphDatabase, MemoryGraphStore, Metadata, Node, Question, SimilarityMetric};
    use insta::{assert_json_snapshot, assert_snapshot};
    use qrag_llm::HashingEmbeddings;
    use serde_json::json;

    const DIMENSION: usize = 256;

    fn database() -> GraphDatabase<MemoryGraphStore, HashingEmbeddings> {
        GraphDatabase::new(MemoryGraphStore::new(), HashingEmbeddings::new(DIMENSION).unwrap())
    }

    fn chunk(id: &str, text: &str) -> Node {
        let mut metadata = Metadata::new();
        metadata.insert("text".to_string(), json!(text));
        Chunk::new(id, metadata).unwrap().into()
    }

    async fn seeded() -> GraphDatabase<MemoryGraphStore, HashingEmbeddings> {
        let db = database();
        db.initiate_vector_indexing("Chunk", "chunk_similarity", DIMENSION, SimilarityMetric::Cosine)
            .await
            .unwrap();
        for (id, text) in [
            ("c1", "Peter is hateful"),
            ("c2", "Marley plays the guitar"),
            ("c3", "The weather is mild today"),
        ] {
            let node = chunk(id, text);
            db.add_node(&node).await.unwrap();
            assert!(db.generate_vector_index(&node).await.unwrap());
        }
        db
    }

    #[tokio::test]
    async fn test_add_node_then_lookup() {
        let db = database();
        let mut metadata = Metadata::new();
        metadata.insert("text".to_string(), json!("Peter is hateful"));
        metadata.insert("header".to_string(), json!("People"));
        let node: Node = Chunk::new("42", metadata.clone()).unwrap().into();

        db.add_node(&node).await.unwrap();
        let found = db.get_node_with_id("42", "Chunk").await.unwrap();
        assert_eq!(found.metadata, metadata);

        let mut changed = metadata.clone();
        changed.insert("text".to_string(), json!("Peter is kind"));
        db.add_node(&Node::new("42", "Chunk", changed)).await.unwrap();
        let found = db.get_node_with_id("42", "Chunk").await.unwrap();
        assert_eq!(found.text(), Some("Peter is hateful"));
        assert_eq!(db.store().node_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_node_is_an_error() {
        let db = database();
        let err = db.get_node_with_id("404", "Chunk").await.unwrap_err();
        assert_snapshot!(err.to_string(), @"Node not found: (Chunk {id: 404})");
    }

    #[tokio::test]
    async fn test_relationship_is_idempotent() {
        let db = database();
        let question: Node = Question::from_text("q1", "Who is hateful?").into();
        let answer = chunk("c1", "Peter is hateful");
        db.add_node(&question).await.unwrap();
        db.add_node(&answer).await.unwrap();

        db.add_relationship(&question, &answer, "HAS_ANSWER").await.unwrap();
        db.add_relationship(&question, &answer, "HAS_ANSWER").await.unwrap();

        assert_eq!(
            db.store().relationship_count(&question, &answer, "HAS_ANSWER").unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_embedding_is_written_once() {
        let db = seeded().await;
        let node = chunk("c1", "Peter is hateful");
        let before = db.store().embedding_of(&node).unwrap();

        assert!(!db.generate_vector_index(&node).await.unwrap());
        assert_eq!(db.store().embedding_of(&node).unwrap(), before);
    }

    #[tokio::test]
    async fn test_embedding_requires_text() {
        let db = database();
        let node = Node::new("c9", "Chunk", Metadata::new());
        db.add_node(&node).await.unwrap();

        let err = db.generate_vector_index(&node).await.unwrap_err();
        assert!(matches!(err, Error::MissingMetadata(ref key) if key == "text"));
    }

    #[tokio::test]
    async fn test_zero_dimension_is_rejected() {
        let db = database();
        let err = db
            .initiate_vector_indexing("Chunk", "chunk_similarity", 0, SimilarityMetric::Cosine)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_best_match_ranks_first() {
        let db = seeded().await;
        let results = db
            .retrieve_similar_nodes("Who is hateful?", 3, "chunk_similarity", 0.0)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].passage.id, "c1");
        assert!(results.windows(2).all(|pair| pair[0].score >= pair[1].score));
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let db = seeded().await;
        let all = db
            .retrieve_similar_nodes("Who is hateful?", 3, "chunk_similarity", 0.0)
            .await
            .unwrap();
        let lowest = all.last().unwrap().score;

        let kept = db
            .retrieve_similar_nodes("Who is hateful?", 3, "chunk_similarity", lowest)
            .await
            .unwrap();
        assert_eq!(kept.len(), all.len());
        assert!(kept.iter().all(|node| node.score >= lowest));

        let none = db
            .retrieve_similar_nodes("Who is hateful?", 3, "chunk_similarity", 1.01)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_neighbours_follow_relationship() {
        let db = seeded().await;
        db.initiate_vector_indexing("Question", "question_similarity", DIMENSION, SimilarityMetric::Cosine)
            .await
            .unwrap();

        let question: Node = Question::from_text("q1", "Who is hateful?").into();
        db.add_node(&question).await.unwrap();
        db.generate_vector_index(&question).await.unwrap();
        db.add_relationship(&question, &chunk("c1", "Peter is hateful"), "HAS_ANSWER")
            .await
            .unwrap();

        let matches = db
            .retrieve_similar_nodes_neighbours("Who is hateful?", "HAS_ANSWER", 1, "question_similarity")
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_json_snapshot!(matches[0].neighbours, @r#"
        [
          {
            "id": "c1",
            "text": "Peter is hateful",
            "header": null
          }
        ]
        "#);
    }
}

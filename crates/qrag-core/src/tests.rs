//! Snapshot tests for core types

#[cfg(test)]
mod snapshot_tests {
    use crate::{
        ChatRole, Error, NeighbourhoodMatch, Passage, PromptTemplate, SimilarNode,
        SimilarityMetric,
    };
    use insta::{assert_json_snapshot, assert_snapshot};

    fn passage(id: &str, text: &str, header: Option<&str>) -> Passage {
        Passage {
            id: id.to_string(),
            text: text.to_string(),
            header: header.map(str::to_string),
        }
    }

    #[test]
    fn test_neighbourhood_match_snapshot() {
        let matched = NeighbourhoodMatch {
            node: SimilarNode {
                passage: passage("q1", "Who is hateful?", None),
                score: 0.5,
            },
            neighbours: vec![passage("c1", "Peter is hateful", Some("People"))],
        };

        assert_json_snapshot!(matched, @r#"
        {
          "id": "q1",
          "text": "Who is hateful?",
          "header": null,
          "score": 0.5,
          "neighbours": [
            {
              "id": "c1",
              "text": "Peter is hateful",
              "header": "People"
            }
          ]
        }
        "#);
    }

    #[test]
    fn test_two_role_prompt_snapshot() {
        let template = PromptTemplate::from_messages([
            (ChatRole::System, ""),
            (ChatRole::Human, "### Context\n{context}\n### Question\n{question}"),
        ]);
        let prompt = template
            .format(&[("question", "Who is hateful?"), ("context", "Peter is hateful")])
            .unwrap();

        assert_eq!(prompt.messages[0].content, "");
        assert_snapshot!(prompt.messages[1].content, @r"
        ### Context
        Peter is hateful
        ### Question
        Who is hateful?
        ");
    }

    #[test]
    fn test_similarity_metric_parsing() {
        assert_eq!("COSINE".parse::<SimilarityMetric>().unwrap(), SimilarityMetric::Cosine);
        assert_eq!("Euclidean".parse::<SimilarityMetric>().unwrap(), SimilarityMetric::Euclidean);
        assert!(matches!(
            "manhattan".parse::<SimilarityMetric>(),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(SimilarityMetric::default().to_string(), "cosine");
    }

    #[test]
    fn test_node_not_found_message() {
        let err = Error::NodeNotFound {
            type_label: "Chunk".to_string(),
            id: "42".to_string(),
        };
        assert_snapshot!(err.to_string(), @"Node not found: (Chunk {id: 42})");
    }
}

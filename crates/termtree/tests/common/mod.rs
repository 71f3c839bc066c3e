use termtree_engine::{Document, EngineConfig, FieldConfig, SearchEngine};

pub fn sample_config() -> EngineConfig {
    EngineConfig {
        fields: vec![
            FieldConfig::new("title", 2.0),
            FieldConfig::new("body", 1.0),
            FieldConfig::new("meta.tags", 0.5),
        ],
        ..EngineConfig::new()
    }
}

pub fn sample_documents() -> Vec<Document> {
    vec![
        Document::new("tokio")
            .with_field("title", "Tokio runtime")
            .with_field("body", "An asynchronous runtime for writing network applications")
            .with_field("meta.tags", "async network"),
        Document::new("serde")
            .with_field("title", "Serde")
            .with_field("body", "A framework for serializing and deserializing data structures")
            .with_field("meta.tags", "serialization"),
        Document::new("regex")
            .with_field("title", "Regex")
            .with_field("body", "Regular expressions with linear time matching")
            .with_field("meta.tags", "text parsing"),
        Document::new("hyper")
            .with_field("title", "Hyper")
            .with_field("body", "A fast HTTP implementation built on the tokio runtime")
            .with_field("meta.tags", "http network"),
    ]
}

pub fn sample_engine() -> SearchEngine {
    let mut engine = SearchEngine::new(sample_config()).unwrap();
    engine.add_documents(&sample_documents()).unwrap();
    engine
}

//! Shared fixtures for relationship graph integration tests.
#![allow(dead_code)]

use relationship_service::config::{GraphConfig, StoreBackend, TextUpdatePolicy};
use relationship_service::repository::{GraphStore, MemoryGraphStore};
use relationship_service::RelationshipGraph;
use std::sync::Arc;

pub const PROFILES: [&str; 3] = ["alice", "bob", "carol"];

pub struct TestGraph {
    pub store: MemoryGraphStore,
    pub graph: RelationshipGraph,
    /// A post owned by alice
    pub post_id: i64,
}

pub async fn setup() -> TestGraph {
    setup_with_policy(TextUpdatePolicy::Keep).await
}

pub async fn setup_with_policy(text_update_policy: TextUpdatePolicy) -> TestGraph {
    let config = GraphConfig {
        store: StoreBackend::Memory,
        text_update_policy,
        ..GraphConfig::default()
    };

    let store = MemoryGraphStore::new();
    let shared: Arc<dyn GraphStore> = Arc::new(store.clone());
    let graph = RelationshipGraph::new(shared, &config);

    for username in PROFILES {
        graph
            .content
            .register_profile(username)
            .await
            .expect("Failed to register profile");
    }
    let post = graph
        .content
        .publish("alice")
        .await
        .expect("Failed to publish post");

    TestGraph {
        store,
        graph,
        post_id: post.id,
    }
}

impl TestGraph {
    pub async fn num_of_comments(&self, content_id: i64) -> i64 {
        self.graph
            .content
            .get_content(content_id)
            .await
            .expect("content exists")
            .num_of_comments
    }

    /// Add a text-only comment and return its id
    pub async fn comment(&self, content_id: i64, author: &str, text: &str) -> i64 {
        self.graph
            .comments
            .add_comment(content_id, author, None, Some(text.to_string()))
            .await
            .expect("Failed to add comment")
            .id
    }
}

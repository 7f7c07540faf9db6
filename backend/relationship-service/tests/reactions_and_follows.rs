//! Integration Tests: reactions, follow edges and content roots

mod common;

use common::setup;
use relationship_service::domain::ReactionType;
use relationship_service::ServiceError;

#[tokio::test]
async fn test_react_is_unique_per_reactor() {
    let t = setup().await;

    let first = t
        .graph
        .reactions
        .react(t.post_id, "bob", ReactionType::Like)
        .await
        .unwrap();
    let second = t
        .graph
        .reactions
        .react(t.post_id, "bob", ReactionType::Love)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.reaction_type, ReactionType::Love);

    let reactions = t.graph.reactions.get_reactions(t.post_id).await.unwrap();
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0].reaction_type, ReactionType::Love);
    assert_eq!(reactions[0].reactor, "bob");
}

#[tokio::test]
async fn test_reactions_target_comments_too() {
    let t = setup().await;
    let comment_id = t.comment(t.post_id, "bob", "react to me").await;

    t.graph
        .reactions
        .react(comment_id, "alice", ReactionType::Support)
        .await
        .unwrap();
    t.graph
        .reactions
        .react(comment_id, "carol", ReactionType::Haha)
        .await
        .unwrap();

    let reactors: Vec<String> = t
        .graph
        .reactions
        .get_reactions(comment_id)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.reactor)
        .collect();
    assert_eq!(reactors, vec!["alice".to_string(), "carol".to_string()]);
    assert!(t
        .graph
        .reactions
        .get_reactions(t.post_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_react_rejects_unknown_targets_and_reactors() {
    let t = setup().await;

    assert!(matches!(
        t.graph.reactions.react(77, "bob", ReactionType::Like).await,
        Err(ServiceError::ContentNotFound(77))
    ));
    assert!(matches!(
        t.graph
            .reactions
            .react(t.post_id, "mallory", ReactionType::Like)
            .await,
        Err(ServiceError::ProfileNotFound(_))
    ));
    assert_eq!(t.store.counts().await.reactions, 0);
}

#[tokio::test]
async fn test_remove_reaction_keeps_profile() {
    let t = setup().await;
    let other_post = t.graph.content.publish("carol").await.unwrap();
    let reaction = t
        .graph
        .reactions
        .react(t.post_id, "bob", ReactionType::Dislike)
        .await
        .unwrap();

    assert!(matches!(
        t.graph
            .reactions
            .remove_reaction(other_post.id, reaction.id)
            .await,
        Err(ServiceError::ReactionNotOnContent { .. })
    ));
    assert!(matches!(
        t.graph.reactions.remove_reaction(t.post_id, 555).await,
        Err(ServiceError::ReactionNotFound(555))
    ));

    let profiles_before = t.store.counts().await.profiles;
    t.graph
        .reactions
        .remove_reaction(t.post_id, reaction.id)
        .await
        .unwrap();

    let counts = t.store.counts().await;
    assert_eq!(counts.reactions, 0);
    assert_eq!(counts.profiles, profiles_before);
}

#[tokio::test]
async fn test_is_reactor() {
    let t = setup().await;
    let reaction = t
        .graph
        .reactions
        .react(t.post_id, "carol", ReactionType::Like)
        .await
        .unwrap();

    assert!(t.graph.reactions.is_reactor("carol", reaction.id).await.unwrap());
    assert!(!t.graph.reactions.is_reactor("bob", reaction.id).await.unwrap());
    assert!(!t.graph.reactions.is_reactor("carol", 9001).await.unwrap());
}

#[tokio::test]
async fn test_follow_edges_are_visible_from_both_sides() {
    let t = setup().await;

    let follower = t.graph.follows.add_follower("alice", "bob").await.unwrap();
    assert_eq!(follower.username, "bob");
    t.graph.follows.add_follower("alice", "carol").await.unwrap();
    // idempotent
    t.graph.follows.add_follower("alice", "bob").await.unwrap();

    let followers: Vec<String> = t
        .graph
        .follows
        .get_followers("alice")
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.username)
        .collect();
    assert_eq!(followers, vec!["bob".to_string(), "carol".to_string()]);

    let following = t.graph.follows.get_following("bob").await.unwrap();
    assert_eq!(following.len(), 1);
    assert_eq!(following[0].username, "alice");

    assert_eq!(
        t.graph
            .follows
            .get_follower("alice", "carol")
            .await
            .unwrap()
            .username,
        "carol"
    );
    assert_eq!(
        t.graph
            .follows
            .get_followed("carol", "alice")
            .await
            .unwrap()
            .username,
        "alice"
    );
    assert_eq!(t.store.counts().await.follows, 2);
}

#[tokio::test]
async fn test_unfollow_from_either_side() {
    let t = setup().await;
    t.graph.follows.add_follower("alice", "bob").await.unwrap();
    t.graph.follows.add_follower("carol", "bob").await.unwrap();

    assert!(t.graph.follows.delete_follower("alice", "bob").await.unwrap());
    assert!(!t.graph.follows.delete_follower("alice", "bob").await.unwrap());
    assert!(t.graph.follows.delete_following("bob", "carol").await.unwrap());

    assert!(t.graph.follows.get_following("bob").await.unwrap().is_empty());
    assert!(t.graph.follows.get_followers("alice").await.unwrap().is_empty());
    assert_eq!(t.store.counts().await.profiles, 3);
}

#[tokio::test]
async fn test_follow_rejections() {
    let t = setup().await;

    assert!(matches!(
        t.graph.follows.add_follower("alice", "alice").await,
        Err(ServiceError::CannotFollowSelf(_))
    ));
    assert!(matches!(
        t.graph.follows.add_follower("alice", "mallory").await,
        Err(ServiceError::ProfileNotFound(ref name)) if name == "mallory"
    ));
    assert!(matches!(
        t.graph.follows.delete_following("mallory", "alice").await,
        Err(ServiceError::ProfileNotFound(_))
    ));
    assert!(matches!(
        t.graph.follows.get_follower("alice", "bob").await,
        Err(ServiceError::ProfileNotFound(ref name)) if name == "bob"
    ));
    assert!(matches!(
        t.graph.follows.get_followed("bob", "alice").await,
        Err(ServiceError::ProfileNotFound(ref name)) if name == "alice"
    ));
    assert_eq!(t.store.counts().await.follows, 0);
}

#[tokio::test]
async fn test_publish_and_register_profile() {
    let t = setup().await;

    let again = t.graph.content.register_profile("alice").await.unwrap();
    assert_eq!(again.username, "alice");
    assert_eq!(t.store.counts().await.profiles, 3);

    assert!(matches!(
        t.graph.content.register_profile("   ").await,
        Err(ServiceError::InvalidInput(_))
    ));
    assert!(matches!(
        t.graph.content.publish("mallory").await,
        Err(ServiceError::ProfileNotFound(_))
    ));

    let post = t.graph.content.publish("bob").await.unwrap();
    assert_eq!(post.owner, "bob");
    assert_eq!(post.num_of_comments, 0);
    assert!(matches!(
        t.graph.content.get_content(12345).await,
        Err(ServiceError::ContentNotFound(12345))
    ));
    assert!(t.graph.ping().await.is_ok());
}

#[tokio::test]
async fn test_register_profile_rejects_surrounding_whitespace() {
    let t = setup().await;

    for name in [" alice", "dave ", "\tdave\n"] {
        assert!(matches!(
            t.graph.content.register_profile(name).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }
    assert_eq!(t.store.counts().await.profiles, 3);

    // the stored name is the one every lookup resolves
    let dave = t.graph.content.register_profile("dave").await.unwrap();
    assert_eq!(dave.username, "dave");
    assert_eq!(
        t.graph.follows.add_follower("alice", "dave").await.unwrap().username,
        "dave"
    );
    assert!(matches!(
        t.graph.follows.add_follower("alice", " dave").await,
        Err(ServiceError::ProfileNotFound(_))
    ));
}

fn tracked_operations(operation: &str) -> u64 {
    prometheus::gather()
        .iter()
        .filter(|family| family.get_name() == "relationship_graph_operations_total")
        .flat_map(|family| family.get_metric())
        .filter(|metric| {
            metric
                .get_label()
                .iter()
                .any(|label| label.get_name() == "operation" && label.get_value() == operation)
        })
        .map(|metric| metric.get_counter().get_value() as u64)
        .sum()
}

#[tokio::test]
async fn test_read_operations_are_tracked() {
    let t = setup().await;
    let comment_id = t.comment(t.post_id, "bob", "tracked").await;
    let reaction = t
        .graph
        .reactions
        .react(t.post_id, "carol", ReactionType::Like)
        .await
        .unwrap();
    t.graph.follows.add_follower("alice", "bob").await.unwrap();

    let reads = [
        "get_content",
        "register_profile",
        "is_comment_author",
        "is_reactor",
        "get_followers",
        "get_following",
        "get_follower",
        "get_followed",
    ];
    let before: Vec<u64> = reads.iter().map(|op| tracked_operations(op)).collect();

    t.graph.content.get_content(t.post_id).await.unwrap();
    t.graph.content.register_profile("bob").await.unwrap();
    t.graph
        .comments
        .is_comment_author("bob", comment_id)
        .await
        .unwrap();
    t.graph
        .reactions
        .is_reactor("carol", reaction.id)
        .await
        .unwrap();
    t.graph.follows.get_followers("alice").await.unwrap();
    t.graph.follows.get_following("bob").await.unwrap();
    t.graph.follows.get_follower("alice", "bob").await.unwrap();
    t.graph.follows.get_followed("bob", "alice").await.unwrap();

    for (op, before) in reads.iter().zip(before) {
        assert!(
            tracked_operations(op) > before,
            "{} was not recorded",
            op
        );
    }
}

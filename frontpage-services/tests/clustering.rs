//! Grouping a day's stories into clusters

mod common;

use std::sync::Arc;

use common::*;
use frontpage_core::{FrontpageError, ItemId};
use frontpage_services::{
    ClusterScope, ClusteringAlgorithm, ClusteringParams, SimilarityService,
};

/// Stories 1 and 2 at similarity 0.95, stories 3 and 4 unrelated to everything
fn seed_four_stories(repository: &frontpage_embedding::SqliteRepository) -> Vec<i64> {
    let fixtures = [
        ("Storm floods downtown", "Herald", vec![1.0, 0.0, 0.0, 0.0]),
        ("Storm floods downtown streets overnight", "Gazette", vec![0.95, 0.312_25, 0.0, 0.0]),
        ("Council approves budget", "Herald", vec![0.0, 0.0, 1.0, 0.0]),
        ("Team wins title", "Courier", vec![0.0, 0.0, 0.0, 1.0]),
    ];

    fixtures
        .into_iter()
        .map(|(headline, paper, embedding)| {
            repository
                .insert_story(&story(headline, None, day(20), paper, Some(embedding)))
                .unwrap()
        })
        .collect()
}

fn service(repository: Arc<dyn frontpage_embedding::ContentRepository>) -> SimilarityService {
    SimilarityService::new(repository, KeywordProvider::new(), engine_config())
}

#[tokio::test]
async fn test_hierarchical_groups_near_duplicates() {
    let repository = repository();
    let ids = seed_four_stories(&repository);
    let service = service(Arc::new(repository));

    let params = ClusteringParams {
        similarity_threshold: 0.6,
        ..Default::default()
    };
    let clusters = service.group_similar_stories(day(20), &params).await.unwrap();

    assert_eq!(clusters.len(), 1);
    let cluster = &clusters[0];
    assert_eq!(cluster.cluster_id, 1);
    assert_eq!(cluster.size, 2);
    assert_eq!(member_ids(cluster), vec![ids[0], ids[1]]);
    assert_eq!(cluster.representative_headline, "Storm floods downtown");
    assert!((cluster.cohesion - 0.95).abs() < 1e-3);
    assert_eq!(cluster.newspaper_distribution.len(), 2);
    assert_eq!(cluster.sentiment_distribution.neutral, 2);
}

#[tokio::test]
async fn test_hierarchical_never_returns_singletons() {
    let repository = repository();
    seed_four_stories(&repository);
    let service = service(Arc::new(repository));

    for threshold in [0.0, 0.3, 0.6, 0.9, 0.99] {
        let params = ClusteringParams {
            similarity_threshold: threshold,
            ..Default::default()
        };
        let clusters = service.group_similar_stories(day(20), &params).await.unwrap();
        assert!(clusters.iter().all(|c| c.size >= 2), "threshold {}", threshold);
    }
}

#[tokio::test]
async fn test_min_cluster_size_one_keeps_singletons() {
    let repository = repository();
    seed_four_stories(&repository);
    let service = service(Arc::new(repository));

    let params = ClusteringParams {
        similarity_threshold: 0.6,
        min_cluster_size: 1,
        ..Default::default()
    };
    let clusters = service.group_similar_stories(day(20), &params).await.unwrap();

    let sizes: Vec<usize> = clusters.iter().map(|c| c.size).collect();
    assert_eq!(sizes, vec![2, 1, 1]);
    let ids: Vec<usize> = clusters.iter().map(|c| c.cluster_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(clusters[1].cohesion, 1.0);
    assert_eq!(clusters[1].representative_headline, "Council approves budget");
}

#[tokio::test]
async fn test_empty_day_returns_no_clusters() {
    let repository = repository();
    seed_four_stories(&repository);
    let service = service(Arc::new(repository));

    let clusters = service
        .group_similar_stories(day(21), &ClusteringParams::default())
        .await
        .unwrap();
    assert!(clusters.is_empty());
}

#[tokio::test]
async fn test_kmeans_is_deterministic() {
    let repository = repository();
    seed_four_stories(&repository);
    let service = service(Arc::new(repository));

    let params = ClusteringParams {
        algorithm: ClusteringAlgorithm::KMeans,
        k: 2,
        ..Default::default()
    };

    let first = service.group_similar_stories(day(20), &params).await.unwrap();
    let first_members: Vec<Vec<i64>> = first.iter().map(member_ids).collect();
    assert_eq!(first_members.iter().map(Vec::len).sum::<usize>(), 4);

    for _ in 0..3 {
        let again = service.group_similar_stories(day(20), &params).await.unwrap();
        let members: Vec<Vec<i64>> = again.iter().map(member_ids).collect();
        assert_eq!(members, first_members);
    }
}

#[tokio::test]
async fn test_kmeans_keeps_small_clusters() {
    let repository = repository();
    let ids = seed_four_stories(&repository);
    let service = service(Arc::new(repository));

    let params = ClusteringParams {
        algorithm: ClusteringAlgorithm::KMeans,
        k: 4,
        ..Default::default()
    };
    let clusters = service.group_similar_stories(day(20), &params).await.unwrap();

    let members: Vec<Vec<i64>> = clusters.iter().map(member_ids).collect();
    assert_eq!(members.iter().map(Vec::len).sum::<usize>(), 4);
    assert!(members.iter().all(|m| !m.is_empty()));
    assert!(members.contains(&vec![ids[2]]));
    assert!(members.contains(&vec![ids[3]]));
}

#[tokio::test]
async fn test_invalid_params_fail_before_repository() {
    let counting = CountingRepository::new(repository());
    let service = service(counting.clone());

    let bad = [
        ClusteringParams {
            algorithm: ClusteringAlgorithm::KMeans,
            k: 0,
            ..Default::default()
        },
        ClusteringParams {
            min_cluster_size: 0,
            ..Default::default()
        },
        ClusteringParams {
            similarity_threshold: -1.5,
            ..Default::default()
        },
    ];

    for params in &bad {
        let err = service.group_similar_stories(day(20), params).await.unwrap_err();
        assert!(err.is_config_error(), "{}", err);
    }
    assert_eq!(counting.calls(), 0);

    let err = "spectral".parse::<ClusteringAlgorithm>().unwrap_err();
    assert!(matches!(err, FrontpageError::UnknownAlgorithm(ref name) if name == "spectral"));
}

#[tokio::test]
async fn test_unavailable_repository_yields_no_clusters() {
    let service = service(Arc::new(UnavailableRepository));

    for algorithm in [ClusteringAlgorithm::Hierarchical, ClusteringAlgorithm::KMeans] {
        let params = ClusteringParams {
            algorithm,
            ..Default::default()
        };
        let clusters = service.group_similar_stories(day(20), &params).await.unwrap();
        assert!(clusters.is_empty());
    }
}

#[tokio::test]
async fn test_malformed_vector_is_excluded() {
    let repository = repository();
    let ids = seed_four_stories(&repository);
    let broken = repository
        .insert_story(&story("Storm floods again", None, day(20), "Herald", None))
        .unwrap();
    repository
        .set_raw_embedding(ItemId::Story(broken), "[1.0,0.0,nope]")
        .unwrap();
    let short = repository
        .insert_story(&story("Storm floods", None, day(20), "Herald", None))
        .unwrap();
    repository
        .set_raw_embedding(ItemId::Story(short), "[1.0,0.0]")
        .unwrap();

    let service = service(Arc::new(repository));
    let params = ClusteringParams {
        similarity_threshold: 0.6,
        ..Default::default()
    };
    let clusters = service.group_similar_stories(day(20), &params).await.unwrap();

    assert_eq!(clusters.len(), 1);
    assert_eq!(member_ids(&clusters[0]), vec![ids[0], ids[1]]);
}

#[tokio::test]
async fn test_theme_scope_clusters_themes() {
    let repository = repository();
    seed_four_stories(&repository);
    for (headline, embedding) in [
        ("Storm season", vec![1.0, 0.0, 0.0, 0.0]),
        ("Storm aftermath", vec![0.9, 0.1, 0.0, 0.0]),
        ("Markets rally", vec![0.0, 0.0, 1.0, 0.0]),
    ] {
        repository
            .insert_theme(&theme(headline, "Summary", day(20), Some(embedding)))
            .unwrap();
    }
    let service = service(Arc::new(repository));

    let params = ClusteringParams {
        scope: ClusterScope::Themes,
        ..Default::default()
    };
    let clusters = service.group_similar_stories(day(20), &params).await.unwrap();

    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].size, 2);
    assert_eq!(clusters[0].representative_headline, "Storm season");
    assert!(clusters[0].newspaper_distribution.is_empty());
    assert!(member_ids(&clusters[0]).is_empty());
}

#[tokio::test]
async fn test_cluster_json_shape() {
    let repository = repository();
    seed_four_stories(&repository);
    let service = service(Arc::new(repository));

    let params = ClusteringParams {
        similarity_threshold: 0.6,
        ..Default::default()
    };
    let clusters = service.group_similar_stories(day(20), &params).await.unwrap();
    let json = serde_json::to_value(&clusters[0]).unwrap();

    assert_eq!(json["clusterId"], 1);
    assert_eq!(json["size"], 2);
    assert_eq!(json["representativeHeadline"], "Storm floods downtown");
    assert_eq!(json["newspaperDistribution"]["Herald"], 1);
    assert_eq!(json["stories"][0]["newspaper"]["slug"], "herald");
    assert!(json.get("centroid").is_none());
}

//! Front Page CLI
//!
//! Operator tool over the similarity engine: backfills embeddings,
//! clusters a day's front pages and lists related stories as JSON.

mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use frontpage_core::ItemKind;
use frontpage_embedding::{
    ContentRepository, EmbeddingClient, EmbeddingGenerator, EmbeddingProvider, OfflineProvider,
    SqliteRepository,
};
use frontpage_services::{
    ClusterScope, EmbeddingBackfill, EngineConfig, SearchOptions, SimilarityConfig,
    SimilarityService,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,frontpage_cli=debug")),
        )
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::from_env()?;

    info!("Opening front page database at: {}", cli.db_path);
    let repository = Arc::new(
        SqliteRepository::new(&cli.db_path)
            .with_context(|| format!("failed to open {}", cli.db_path))?
            .with_dimension(config.dimension),
    );

    match cli.command {
        Commands::Stats => {
            let stats = repository.stats()?;
            let output = serde_json::json!({
                "stories": {
                    "total": stats.stories.total,
                    "withEmbedding": stats.stories.with_embedding,
                    "malformed": stats.stories.malformed,
                    "missing": stats.stories.missing(),
                },
                "themes": {
                    "total": stats.themes.total,
                    "withEmbedding": stats.themes.with_embedding,
                    "malformed": stats.themes.malformed,
                    "missing": stats.themes.missing(),
                },
                "databaseSizeBytes": stats.database_size_bytes,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Commands::Backfill {
            delay_ms,
            concurrency,
        } => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY must be set to generate embeddings")?;
            let provider = Arc::new(EmbeddingClient::with_model(
                api_key,
                config.model.clone(),
                config.dimension,
            ));

            let mut backfill_config = config.backfill;
            if let Some(delay_ms) = delay_ms {
                backfill_config.delay_ms = delay_ms;
            }
            if let Some(concurrency) = concurrency {
                backfill_config.concurrency = concurrency;
            }

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, stopping after in-flight items");
                    on_signal.cancel();
                }
            });

            let backfill = EmbeddingBackfill::new(
                repository,
                EmbeddingGenerator::new(provider),
                backfill_config,
            );
            let report = backfill.run(&cancel).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Cluster {
            date,
            algorithm,
            threshold,
            min_size,
            k,
            themes,
        } => {
            let mut params = config.clustering.clone();
            if let Some(algorithm) = algorithm {
                params.algorithm = algorithm.parse()?;
            }
            if let Some(threshold) = threshold {
                params.similarity_threshold = threshold;
            }
            if let Some(min_size) = min_size {
                params.min_cluster_size = min_size;
            }
            if let Some(k) = k {
                params.k = k;
            }
            if themes {
                params.scope = ClusterScope::Themes;
            }

            let service = similarity_service(repository, config);
            let clusters = service.group_similar_stories(date, &params).await?;
            println!("{}", serde_json::to_string_pretty(&clusters)?);
        }

        Commands::Similar {
            id,
            threshold,
            days,
            limit,
        } => {
            let reference = repository
                .find_item_by_id(id)
                .await?
                .with_context(|| format!("{} not found", id))?;

            let mut options = SearchOptions::from(SimilarityConfig::for_related_stories());
            if let Some(threshold) = threshold {
                options.threshold = threshold;
            }
            if let Some(days) = days {
                options.time_window_days = days;
            }
            options.limit = limit;
            if id.kind() == ItemKind::Story {
                options.exclude_id = Some(id);
            }

            let service = similarity_service(repository, config);
            let matches = service.find_similar(&reference, &options).await;
            println!("{}", serde_json::to_string_pretty(&matches)?);
        }
    }

    Ok(())
}

/// Service backed by OpenAI; without a key, only stored embeddings are used
fn similarity_service(repository: Arc<SqliteRepository>, config: EngineConfig) -> SimilarityService {
    let provider: Arc<dyn EmbeddingProvider> = match std::env::var("OPENAI_API_KEY") {
        Ok(api_key) => Arc::new(EmbeddingClient::with_model(
            api_key,
            config.model.clone(),
            config.dimension,
        )),
        Err(_) => {
            warn!("OPENAI_API_KEY not set, only stored embeddings will be used");
            Arc::new(OfflineProvider::new(config.model.clone(), config.dimension))
        }
    };
    SimilarityService::new(repository, provider, config)
}

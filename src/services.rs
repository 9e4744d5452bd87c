use crate::config::Config;
use crate::dataset::{DatasetRow, DatasetStore};
use crate::errors::{AppError, ResultExt};
use crate::models::{
    ActivityReasons, ActivityScore, ProfileReasons, ProfileScore, ReasonsResponse, ScoreRequest,
    ScoreResponse,
};
use crate::normalizer::{self, CanonicalRecord, CompanyDirectory};
use crate::scoring::{self, Assessment};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Scores requests against the shared dataset.
///
/// Cloning is cheap: the dataset and the lookup cache are shared.
#[derive(Clone)]
pub struct ScoreService {
    store: Arc<DatasetStore>,
    /// Lookup results keyed by lower-cased name, misses included.
    lookups: Cache<String, Option<DatasetRow>>,
}

impl ScoreService {
    /// A `ttl_secs` of zero keeps entries until evicted by capacity.
    pub fn new(store: Arc<DatasetStore>, capacity: u64, ttl_secs: u64) -> Self {
        let mut builder = Cache::builder().max_capacity(capacity);
        if ttl_secs > 0 {
            builder = builder.time_to_live(Duration::from_secs(ttl_secs));
        }

        Self {
            store,
            lookups: builder.build(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let store = Arc::new(DatasetStore::from_dir(config.data_dir.clone()));
        tracing::info!(
            "Company lookup cache initialized ({} entries, {}s TTL)",
            config.lookup_cache_capacity,
            config.lookup_cache_ttl_secs
        );
        Self::new(
            store,
            config.lookup_cache_capacity,
            config.lookup_cache_ttl_secs,
        )
    }

    pub fn store(&self) -> &Arc<DatasetStore> {
        &self.store
    }

    async fn assess(&self, request: &ScoreRequest) -> Result<(CanonicalRecord, Assessment), AppError> {
        let record = normalizer::normalize(request, self).await?;
        let assessment = scoring::assess(&record);
        Ok((record, assessment))
    }

    /// Computes the score, approval, limit and (profile only) risk band.
    pub async fn score(&self, request: &ScoreRequest) -> Result<ScoreResponse, AppError> {
        let response = match self.assess(request).await? {
            (CanonicalRecord::Profile(record), Assessment::Profile(result)) => {
                tracing::info!(
                    "Profile score for '{}': {} ({}, approved: {})",
                    record.name,
                    result.score,
                    result.band,
                    result.approved
                );
                ScoreResponse::Profile(ProfileScore {
                    empresa: record.name,
                    score: result.score,
                    aprovado: result.approved,
                    limite_sugerido: result.limit,
                    faixa_risco: result.band,
                })
            }
            (CanonicalRecord::Activity(record), Assessment::Activity(result)) => {
                tracing::info!(
                    "Activity score for {:?}: {} (approved: {})",
                    record.cnpj.as_deref().or(record.company.as_deref()),
                    result.score,
                    result.approved
                );
                ScoreResponse::Activity(ActivityScore {
                    cnpj: record.cnpj,
                    empresa: record.company,
                    score: result.score,
                    aprovado: result.approved,
                    limite_sugerido: result.limit,
                })
            }
            _ => return Err(AppError::Internal("record and assessment modes differ".into())),
        };

        Ok(response)
    }

    /// Same computation as [`score`](Self::score), returning the factors behind it.
    pub async fn explain(&self, request: &ScoreRequest) -> Result<ReasonsResponse, AppError> {
        let response = match self.assess(request).await? {
            (CanonicalRecord::Profile(record), Assessment::Profile(result)) => {
                ReasonsResponse::Profile(ProfileReasons {
                    empresa: record.name,
                    score: result.score,
                    motivos: result.reasons,
                })
            }
            (CanonicalRecord::Activity(_), Assessment::Activity(result)) => {
                ReasonsResponse::Activity(ActivityReasons {
                    score: result.score,
                    aprovado: result.approved,
                    breakdown: result.breakdown,
                })
            }
            _ => return Err(AppError::Internal("record and assessment modes differ".into())),
        };

        Ok(response)
    }
}

impl CompanyDirectory for ScoreService {
    async fn find_company(&self, name: &str) -> Result<Option<DatasetRow>, AppError> {
        let key = name.trim().to_lowercase();

        if let Some(cached) = self.lookups.get(&key).await {
            tracing::debug!("Company lookup cache HIT: {}", key);
            return Ok(cached);
        }

        tracing::debug!("Company lookup cache MISS: {}", key);
        let dataset = self
            .store
            .get()
            .await
            .context("Falha ao carregar o dataset de empresas")?;
        let row = dataset.find(&key).cloned();
        self.lookups.insert(key, row.clone()).await;

        Ok(row)
    }
}

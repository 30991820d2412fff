use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::{options::Options, repo::AdRepository, repo_types::Ad};

#[derive(Debug, thiserror::Error)]
pub enum AdError {
    /// No ad matched the query. Listing treats an empty page as an error.
    #[error("ads not found")]
    NotFound,
    #[error("failed to save ad")]
    SaveFailed(#[source] sqlx::Error),
    #[error("failed to load ads: {0}")]
    Persistence(#[source] sqlx::Error),
}

#[derive(Clone)]
pub struct AdService {
    repo: Arc<dyn AdRepository>,
}

impl AdService {
    pub fn new(repo: Arc<dyn AdRepository>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self, ad), fields(ad_id = %ad.id, author = %ad.author.username))]
    pub async fn create(&self, ad: &Ad) -> Result<(), AdError> {
        self.repo.save(ad).await.map_err(AdError::SaveFailed)?;
        info!("ad published");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list(&self, options: &Options) -> Result<Vec<Ad>, AdError> {
        let ads = self
            .repo
            .find_all(options)
            .await
            .map_err(AdError::Persistence)?;
        if ads.is_empty() {
            return Err(AdError::NotFound);
        }
        debug!(count = ads.len(), "ads listed");
        Ok(ads)
    }
}

use std::sync::Arc;

use crate::{
    ads::{repo::PgAdRepository, services::AdService},
    auth::{jwt::JwtKeys, repo::PgUserRepository, services::CredentialService},
    config::AppConfig,
    db,
    images::{HttpImageInspector, ImageInspector},
};

#[derive(Clone)]
pub struct AppState {
    pub jwt: JwtKeys,
    pub users: CredentialService,
    pub ads: AdService,
    pub images: Arc<dyn ImageInspector>,
}

impl AppState {
    pub async fn init(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        db::migrate(&pool).await?;

        let jwt = JwtKeys::from_config(&config.jwt);
        let user_repo = Arc::new(PgUserRepository::new(pool.clone()));
        let users = CredentialService::new(user_repo, jwt.clone());
        let ads = AdService::new(Arc::new(PgAdRepository::new(pool)));
        let images: Arc<dyn ImageInspector> = Arc::new(HttpImageInspector::new(&config.images)?);

        Ok(Self {
            jwt,
            users,
            ads,
            images,
        })
    }

    /// In-memory state whose image inspector accepts every URL.
    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with_images(Arc::new(crate::images::services::StubImageInspector::default()))
    }

    #[cfg(test)]
    pub fn fake_with_images(images: Arc<dyn ImageInspector>) -> Self {
        use std::time::Duration;

        use crate::{ads::repo::MemoryAdRepository, auth::repo::MemoryUserRepository};

        let jwt = JwtKeys::new("test", Duration::from_secs(300));
        Self {
            users: CredentialService::new(Arc::new(MemoryUserRepository::default()), jwt.clone()),
            ads: AdService::new(Arc::new(MemoryAdRepository::default())),
            jwt,
            images,
        }
    }
}

use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::database::RelationalStore;
use crate::services::{
    DashboardService, NewspaperService, PublicationService, SeminarService, ServiceCatalog, UploadService,
    WhistleblowerService,
};
use crate::storage::FileStore;

/// Shared by every handler. Cloning is cheap: all members are handles.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RelationalStore>,
    pub files: FileStore,
    pub auth: AuthService,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn RelationalStore>, config: AppConfig) -> Self {
        let auth = AuthService::new(
            store.clone(),
            &config.security.jwt_secret,
            config.security.jwt_expiry_hours,
        );
        Self {
            files: FileStore::new(config.uploads.clone()),
            store,
            auth,
            config: Arc::new(config),
        }
    }

    pub fn publications(&self) -> PublicationService {
        PublicationService::new(self.store.clone(), self.files.clone())
    }

    pub fn services(&self) -> ServiceCatalog {
        ServiceCatalog::new(self.store.clone())
    }

    pub fn seminars(&self) -> SeminarService {
        SeminarService::new(self.store.clone(), self.files.clone())
    }

    pub fn newspapers(&self) -> NewspaperService {
        NewspaperService::new(self.store.clone(), self.files.clone())
    }

    pub fn whistleblower(&self) -> WhistleblowerService {
        WhistleblowerService::new(self.store.clone())
    }

    pub fn uploads(&self) -> UploadService {
        UploadService::new(self.files.clone())
    }

    pub fn dashboard(&self) -> DashboardService {
        DashboardService::new(self.store.clone())
    }
}

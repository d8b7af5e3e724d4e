use std::sync::Arc;

use crate::auth::{AuthError, CsrfSigner};
use crate::config::AppConfig;
use crate::database::CertificateStore;
use crate::middleware::RateLimiter;
use crate::services::Services;
use crate::types::Page;

/// Shared handler state. Built once in `main` and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn CertificateStore>,
    pub services: Services,
    pub csrf: CsrfSigner,
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn CertificateStore>) -> Result<Self, AuthError> {
        let services = Services::new(store.clone(), &config)?;
        let csrf = CsrfSigner::new(&config.security.csrf_secret_key);
        let limiter = RateLimiter::new(config.api.rate_limit_requests, config.api.rate_limit_window_secs);
        Ok(Self { config: Arc::new(config), store, services, csrf, limiter })
    }

    pub fn page(&self, skip: Option<i64>, limit: Option<i64>) -> Page {
        Page::new(skip, limit, self.config.api.default_page_limit, self.config.api.max_page_limit)
    }
}

use std::sync::Arc;

use civic_core::{Lifecycle, Store};

use crate::moderation::ModerationClient;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub lifecycle: Lifecycle<ModerationClient>,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

impl AppStateInner {
    pub fn new(
        store: Arc<dyn Store>,
        moderator: ModerationClient,
        jwt_secret: String,
        token_ttl: chrono::Duration,
    ) -> AppState {
        Arc::new(Self {
            lifecycle: Lifecycle::new(store, moderator),
            jwt_secret,
            token_ttl,
        })
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        self.lifecycle.store()
    }
}

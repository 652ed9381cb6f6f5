use std::sync::Arc;

use scaleout_core::Config;
use scaleout_storage::ObjectStorage;

/// Shared, read-only state handed to every handler.
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Arc<dyn ObjectStorage>,
}

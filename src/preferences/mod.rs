mod storage;
mod types;

pub use storage::PreferenceStorage;
pub use types::Theme;

use crate::Result;
use tracing::{debug, info, warn};

pub const THEME_KEY: &str = "theme";

/// The persisted theme choice. Load order: stored value, then the OS
/// preference, then `light`. Every change is written through.
pub struct ThemePreference {
    storage: PreferenceStorage,
    system: Option<Theme>,
}

impl ThemePreference {
    pub fn new(storage: PreferenceStorage, system: Option<Theme>) -> Self {
        Self { storage, system }
    }

    /// Uses `GTK_THEME` for the OS preference.
    pub fn with_system_detection(storage: PreferenceStorage) -> Self {
        let gtk_theme = std::env::var("GTK_THEME").ok();
        let system = Theme::from_system(gtk_theme.as_deref());
        debug!("System theme preference: {:?}", system);
        Self::new(storage, system)
    }

    pub async fn load(&self) -> Result<Theme> {
        if let Some(stored) = self.storage.get(THEME_KEY).await? {
            match stored.parse::<Theme>() {
                Ok(theme) => return Ok(theme),
                Err(e) => warn!("Ignoring stored theme: {}", e),
            }
        }
        Ok(self.system.unwrap_or_default())
    }

    pub async fn set(&self, theme: Theme) -> Result<Theme> {
        self.storage.set(THEME_KEY, theme.as_str()).await?;
        info!("Theme set to {}", theme);
        Ok(theme)
    }

    pub async fn toggle(&self) -> Result<Theme> {
        let current = self.load().await?;
        self.set(current.toggled()).await
    }
}

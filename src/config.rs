use std::path::PathBuf;

/// Overrides the directory textures are loaded from.
pub const ASSET_DIR_ENV: &str = "BOLTVIEW_ASSET_DIR";
/// Log filter, taking precedence over `RUST_LOG`.
pub const LOG_FILTER_ENV: &str = "BOLTVIEW_LOG";

/// Window and asset settings for the viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub asset_dir: PathBuf,
    pub log_filter: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Washer and Screw".to_string(),
            width: 800,
            height: 600,
            asset_dir: PathBuf::from("assets"),
            log_filter: None,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with any environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(ASSET_DIR_ENV).filter(|dir| !dir.is_empty()) {
            self.asset_dir = PathBuf::from(dir);
        }
        if let Some(filter) = lookup(LOG_FILTER_ENV).filter(|filter| !filter.is_empty()) {
            self.log_filter = Some(filter);
        }
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.asset_dir = dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_window() {
        let config = AppConfig::default();
        assert_eq!(config.title, "Washer and Screw");
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.asset_dir, PathBuf::from("assets"));
    }

    #[test]
    fn overrides_apply_when_set() {
        let config = AppConfig::new().with_overrides(|key| match key {
            ASSET_DIR_ENV => Some("/srv/textures".to_string()),
            LOG_FILTER_ENV => Some("debug".to_string()),
            _ => None,
        });

        assert_eq!(config.asset_dir, PathBuf::from("/srv/textures"));
        assert_eq!(config.log_filter.as_deref(), Some("debug"));
    }

    #[test]
    fn empty_overrides_are_ignored() {
        let config = AppConfig::new().with_overrides(|_| Some(String::new()));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn builder_chains() {
        let config = AppConfig::new().title("Bolt").size(1024, 768).asset_dir("res");
        assert_eq!(config.title, "Bolt");
        assert_eq!(config.width, 1024);
        assert_eq!(config.asset_dir, PathBuf::from("res"));
    }
}

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::Settings;

use crate::error::AppResult;

pub fn resolve_profile(requested: &str) -> String {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        return "default".to_string();
    }

    trimmed.to_string()
}

pub fn load_settings(paths: &AppPaths, profile: &str) -> AppResult<Settings> {
    settings::load(paths.settings_file(profile))
}

pub const APP_NAME: &str = "Recipe Margin Scanner";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_TAG: Option<&str> = option_env!("GIT_TAG");

const USER_AGENT_NAME: &str = "recipe-margin-scanner";

pub fn version_label() -> String {
    if let Some(tag) = GIT_TAG {
        tag.to_string()
    } else {
        format!("v{}", APP_VERSION)
    }
}

/// User agent sent to the price feed when the settings do not override it.
pub fn default_user_agent() -> String {
    format!("{USER_AGENT_NAME}/{} (price margin evaluation)", version_label())
}

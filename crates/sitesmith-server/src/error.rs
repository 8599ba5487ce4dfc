use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration. Set the {env_var} environment variable.")]
    MissingEnvVar { env_var: String },

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// Map a configuration field path like `provider.api_key` to the environment
/// variable that supplies it.
pub fn to_env_var(field: &str) -> String {
    format!("SITESMITH_{}", field.replace('.', "__").to_uppercase())
}

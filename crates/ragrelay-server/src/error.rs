use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration: set {env_var}")]
    MissingEnvVar { env_var: String },

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// Map a settings field path like `upstream.host` to the environment
/// variable an operator must set (`RAGRELAY_UPSTREAM__HOST`).
pub fn to_env_var(field: &str) -> String {
    format!("RAGRELAY_{}", field.replace('.', "__").to_uppercase())
}

use regex::{Captures, Regex};
use std::env;
use std::sync::OnceLock;

static ENV_VAR_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_env_var_regex() -> &'static Regex {
    ENV_VAR_REGEX.get_or_init(|| {
        Regex::new(r"\$\{env:([^:}]+)(?::([^}]*))?\}").expect("Failed to compile env var regex")
    })
}

/// Interpolate environment variables in a string
/// Supports syntax: ${env:VAR_NAME} or ${env:VAR_NAME:default_value}
pub fn interpolate_env_vars(input: &str) -> String {
    get_env_var_regex()
        .replace_all(input, |caps: &Captures| {
            match (env::var(&caps[1]), caps.get(2)) {
                (Ok(value), _) => value,
                (Err(_), Some(default)) => default.as_str().to_string(),
                // Unknown variable without a default stays as written
                (Err(_), None) => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Interpolate environment variables in YAML text before it is parsed
pub fn interpolate_yaml_string(yaml_content: &str) -> String {
    interpolate_env_vars(yaml_content)
}

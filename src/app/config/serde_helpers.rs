/// Parses `name` into `target` when the variable is set; keeps the default otherwise.
pub fn load_env_var<T>(name: &str, target: &mut T) -> Result<(), super::ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(value) = std::env::var(name) {
        *target = value
            .parse()
            .map_err(|e| super::ConfigError::EnvError(format!("Invalid {name}: {e}")))?;
    }
    Ok(())
}

/// Like [`load_env_var`] for optional settings.
pub fn load_env_var_opt<T>(name: &str, target: &mut Option<T>) -> Result<(), super::ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(value) = std::env::var(name) {
        *target = Some(
            value
                .parse()
                .map_err(|e| super::ConfigError::EnvError(format!("Invalid {name}: {e}")))?,
        );
    }
    Ok(())
}

pub fn load_env_string(name: &str, target: &mut String) {
    if let Ok(value) = std::env::var(name) {
        *target = value;
    }
}

pub fn load_env_string_opt(name: &str, target: &mut Option<String>) {
    if let Ok(value) = std::env::var(name) {
        *target = Some(value);
    }
}

pub fn load_env_path_opt(name: &str, target: &mut Option<std::path::PathBuf>) {
    if let Ok(value) = std::env::var(name) {
        *target = Some(std::path::PathBuf::from(value));
    }
}

/// Boolean switches accept the spellings the host runtime does.
pub fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

pub fn load_env_switch(name: &str, target: &mut bool) -> Result<(), super::ConfigError> {
    if let Ok(value) = std::env::var(name) {
        *target = parse_switch(&value).ok_or_else(|| {
            super::ConfigError::EnvError(format!("Invalid {name}: expected a boolean, got {value}"))
        })?;
    }
    Ok(())
}

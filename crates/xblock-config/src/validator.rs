//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Converts the first error into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_platform(config, &mut result);
        Self::validate_timing(config, &mut result);

        result
    }

    fn validate_platform(config: &Config, result: &mut ValidationResult) {
        let platform = &config.platform;

        if !platform.base_url.starts_with("http://") && !platform.base_url.starts_with("https://") {
            result.add_error(ValidationError::new(
                "platform.base_url",
                "base_url must start with http:// or https://",
            ));
        }

        if !platform.api_prefix.starts_with('/') {
            result.add_error(ValidationError::new(
                "platform.api_prefix",
                "api_prefix must be an absolute path",
            ));
        }

        if platform.csrf_cookie.is_empty() {
            result.add_error(ValidationError::new(
                "platform.csrf_cookie",
                "csrf_cookie cannot be empty",
            ));
        }

        if platform.public_bearer.is_empty() {
            result.add_warning(ValidationWarning::new(
                "platform.public_bearer",
                "public_bearer is empty, actions need a captured credential pair",
            ));
        }
    }

    fn validate_timing(config: &Config, result: &mut ValidationResult) {
        let timing = &config.timing;

        for (name, value) in timing.durations() {
            if value == 0 {
                result.add_error(ValidationError::new(
                    format!("timing.{name}"),
                    format!("{name} must be greater than 0"),
                ));
            }
        }

        if timing.action_timeout_ms < timing.relationship_timeout_ms {
            result.add_warning(ValidationWarning::new(
                "timing.action_timeout_ms",
                "action_timeout_ms is shorter than relationship_timeout_ms",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;

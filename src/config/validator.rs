use thiserror::Error;

use crate::config::{DevSettings, ExtractorSettings, GeneratorSettings, Settings, WidgetSettings};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Duplicate entry: {0}")]
    Duplicate(String),
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_server(&settings.server) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_dev(&settings.dev) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_widgets(&settings.widgets) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_generator(&settings.generator) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_extractor(&settings.extractor) {
            errors.extend(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(server: &crate::config::ServerSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if server.host.is_empty() {
            errors.push(ValidationError::MissingField("server.host".to_string()));
        }

        if server.port == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_dev(dev: &DevSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if dev.shell_documents.is_empty() {
            errors.push(ValidationError::MissingField("dev.shell_documents".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for document in &dev.shell_documents {
            let trimmed = document.trim_start_matches('/');
            if trimmed.is_empty() || trimmed.split('/').any(|segment| segment == "..") {
                errors.push(ValidationError::InvalidValue {
                    field: "dev.shell_documents".to_string(),
                    reason: format!("'{}' must be a path inside the dev root", document),
                });
            }
            if !seen.insert(trimmed) {
                errors.push(ValidationError::Duplicate(format!("shell document '{}'", document)));
            }
        }

        if !dev.livereload_script.starts_with('/') {
            errors.push(ValidationError::InvalidValue {
                field: "dev.livereload_script".to_string(),
                reason: "Script reference must be root-absolute".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_widgets(widgets: &WidgetSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if widgets.extensions.is_empty() {
            errors.push(ValidationError::MissingField("widgets.extensions".to_string()));
        }

        if widgets.default_widget.is_empty() {
            errors.push(ValidationError::MissingField("widgets.default_widget".to_string()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_generator(generator: &GeneratorSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (field, probability) in [
            ("generator.optional_probability", generator.optional_probability),
            ("generator.nullable_probability", generator.nullable_probability),
        ] {
            if !(0.0..=1.0).contains(&probability) {
                errors.push(ValidationError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("{} is not a probability", probability),
                });
            }
        }

        if generator.array_min > generator.array_max {
            errors.push(ValidationError::InvalidValue {
                field: "generator.array_min".to_string(),
                reason: "array_min must not exceed array_max".to_string(),
            });
        }

        if generator.number_min > generator.number_max {
            errors.push(ValidationError::InvalidValue {
                field: "generator.number_min".to_string(),
                reason: "number_min must not exceed number_max".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_extractor(extractor: &ExtractorSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if extractor.marker.trim().is_empty() {
            errors.push(ValidationError::MissingField("extractor.marker".to_string()));
        }

        if extractor.example_keys.is_empty() && extractor.schema_keys.is_empty() {
            errors.push(ValidationError::MissingField(
                "extractor.example_keys or extractor.schema_keys".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

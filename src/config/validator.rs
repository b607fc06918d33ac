//! Stack validation.
//!
//! This module checks a stack file for problems that can be found without
//! building the graph: malformed names, outputs a kind never produces, and
//! suspicious values. Duplicate ids, dangling references and cycles are
//! left to the planning pipeline, which reports them with their stage.

use crate::error::{ConfigError, Result, StackplanError};
use std::collections::BTreeMap;
use tracing::debug;

use crate::model::{KindRegistry, KindTable, OutputSet, PropertyValue, ResourceKind};

use super::spec::{ProjectConfig, ResourceDeclaration, StackConfig};

/// Validator for stack files.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a stack.
    ///
    /// # Errors
    ///
    /// Returns the first error if validation fails.
    pub fn validate(&self, config: &StackConfig) -> Result<ValidationResult> {
        let result = self.check(config);

        if result.errors.is_empty() {
            debug!("Stack validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(StackplanError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    /// Collects every error and warning without failing.
    #[must_use]
    pub fn check(&self, config: &StackConfig) -> ValidationResult {
        let mut result = ValidationResult::default();
        let table = config.kind_table();

        Self::validate_project(&config.project, &mut result);
        Self::validate_output(config, &mut result);
        Self::validate_kinds(&config.kinds, &mut result);
        Self::validate_resources(&config.resources, &table, &mut result);

        result
    }

    /// Validates project configuration.
    fn validate_project(project: &ProjectConfig, result: &mut ValidationResult) {
        if project.name.is_empty() {
            result.errors.push(ValidationError {
                field: String::from("project.name"),
                message: String::from("Project name cannot be empty"),
            });
        } else if !is_valid_name(&project.name) {
            result.errors.push(ValidationError {
                field: String::from("project.name"),
                message: format!(
                    "Project name '{}' is invalid. Must be lowercase alphanumeric with hyphens.",
                    project.name
                ),
            });
        }

        if project.environment.is_empty() {
            result.errors.push(ValidationError {
                field: String::from("project.environment"),
                message: String::from("Environment cannot be empty"),
            });
        }
    }

    /// Validates output configuration.
    fn validate_output(config: &StackConfig, result: &mut ValidationResult) {
        if config.output.path.trim().is_empty() {
            result.errors.push(ValidationError {
                field: String::from("output.path"),
                message: String::from("Output path cannot be empty"),
            });
        }
    }

    /// Validates extra kind outputs.
    fn validate_kinds(kinds: &BTreeMap<ResourceKind, Vec<String>>, result: &mut ValidationResult) {
        for (kind, outputs) in kinds {
            if *kind == ResourceKind::Custom {
                result.warnings.push(String::from(
                    "kinds.custom: Custom resources accept any output; extra outputs are ignored",
                ));
            }

            for (i, output) in outputs.iter().enumerate() {
                if !is_valid_id(output) {
                    result.errors.push(ValidationError {
                        field: format!("kinds.{kind}[{i}]"),
                        message: format!("Output name '{output}' is invalid"),
                    });
                }
                if kind.builtin_outputs().is_some_and(|b| b.contains(&output.as_str())) {
                    result.warnings.push(format!(
                        "kinds.{kind}[{i}]: '{output}' is already a built-in output"
                    ));
                }
            }
        }
    }

    /// Validates all resource declarations.
    fn validate_resources(
        resources: &[ResourceDeclaration],
        table: &KindTable,
        result: &mut ValidationResult,
    ) {
        if resources.is_empty() {
            result.warnings.push(String::from("No resources declared in stack"));
            return;
        }

        for (i, resource) in resources.iter().enumerate() {
            let prefix = format!("resources[{i}]");

            if !is_valid_id(&resource.id) {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.id"),
                    message: format!(
                        "Resource id '{}' is invalid. Must start with a letter and contain only letters, digits, '-' or '_'.",
                        resource.id
                    ),
                });
            }

            for (name, value) in &resource.properties {
                if name.is_empty() {
                    result.errors.push(ValidationError {
                        field: format!("{prefix}.properties"),
                        message: format!("Resource '{}' has an empty property name", resource.id),
                    });
                }
                Self::check_malformed_refs(value, &format!("{prefix}.properties.{name}"), result);
            }

            Self::validate_outputs(resource, &prefix, table, result);
        }
    }

    /// Checks declared outputs against the kind registry.
    fn validate_outputs(
        resource: &ResourceDeclaration,
        prefix: &str,
        table: &KindTable,
        result: &mut ValidationResult,
    ) {
        let valid = table.valid_outputs(resource.kind);

        for (name, value) in &resource.outputs {
            if !valid.contains(name) {
                let expected = match &valid {
                    OutputSet::Closed(names) => names.iter().cloned().collect::<Vec<_>>().join(", "),
                    OutputSet::Open => String::new(),
                };
                result.errors.push(ValidationError {
                    field: format!("{prefix}.outputs.{name}"),
                    message: format!(
                        "Kind '{}' does not produce output '{name}'. Expected one of: {expected}",
                        resource.kind
                    ),
                });
            }

            if value.is_null() {
                result.warnings.push(format!(
                    "{prefix}.outputs.{name}: Output value is null"
                ));
            }
        }
    }

    /// Rejects maps that carry the reserved `ref` key but did not parse as a
    /// reference; left alone they would be planned as plain literals.
    fn check_malformed_refs(value: &PropertyValue, field: &str, result: &mut ValidationResult) {
        match value {
            PropertyValue::Map(entries) => {
                if entries.contains_key("ref") {
                    result.errors.push(ValidationError {
                        field: field.to_string(),
                        message: String::from(
                            "'ref' is reserved for references; expected { ref: { target, output } } with no other keys",
                        ),
                    });
                }
                for (key, item) in entries {
                    Self::check_malformed_refs(item, &format!("{field}.{key}"), result);
                }
            }
            PropertyValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    Self::check_malformed_refs(item, &format!("{field}[{i}]"), result);
                }
            }
            PropertyValue::Literal(_) | PropertyValue::Reference(_) | PropertyValue::Resolved(_) => {}
        }
    }
}

/// Validates that a project name follows the naming convention.
/// Names must be lowercase alphanumeric with hyphens, starting with a letter.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }

    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return false;
    }

    !name.ends_with('-') && !name.contains("--")
}

/// Validates a resource id or output name.
/// Must start with a letter; letters, digits, '-' and '_' are allowed.
fn is_valid_id(id: &str) -> bool {
    let mut chars = id.chars();

    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

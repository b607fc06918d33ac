//! Stack file parser.
//!
//! This module handles loading stack files from YAML and applying
//! environment variable overrides, with proper precedence and error handling.

use crate::error::{ConfigError, Result, StackplanError};
use std::path::Path;
use tracing::{debug, info};

use super::spec::StackConfig;

/// Parser for loading stack files.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<std::path::PathBuf>,
}

impl ConfigParser {
    /// Creates a new stack file parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a stack file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<StackConfig> {
        let path = path.as_ref();
        info!("Loading stack from: {}", path.display());

        if !path.exists() {
            return Err(StackplanError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            StackplanError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses a stack from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<StackConfig> {
        debug!("Parsing YAML stack");

        let config: StackConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            StackplanError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Parsed stack for project {} with {} resources",
            config.project.name,
            config.resources.len()
        );
        Ok(config)
    }

    /// Loads a stack file with environment variable overrides.
    ///
    /// Environment variables are checked in the format
    /// `STACKPLAN_<SECTION>_<KEY>` (e.g., `STACKPLAN_PROJECT_NAME`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<StackConfig> {
        let mut config = self.load_file(path)?;
        Self::apply_env_overrides(&mut config);
        Ok(config)
    }

    /// Applies environment variable overrides to the stack.
    fn apply_env_overrides(config: &mut StackConfig) {
        if let Ok(name) = std::env::var("STACKPLAN_PROJECT_NAME") {
            debug!("Overriding project.name from environment");
            config.project.name = name;
        }

        if let Ok(env) = std::env::var("STACKPLAN_PROJECT_ENVIRONMENT") {
            debug!("Overriding project.environment from environment");
            config.project.environment = env;
        }

        if let Ok(path) = std::env::var("STACKPLAN_OUTPUT_PATH") {
            debug!("Overriding output.path from environment");
            config.output.path = path;
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| std::path::PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                StackplanError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Resolves the output directory against the base path.
    #[must_use]
    pub fn resolve_output_dir(&self, config: &StackConfig) -> std::path::PathBuf {
        let output = Path::new(&config.output.path);
        match &self.base_path {
            Some(base) if output.is_relative() => base.join(output),
            _ => output.to_path_buf(),
        }
    }
}

/// Default stack file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "stackplan.yaml",
    "stackplan.yml",
    "stack.yaml",
    "stack.yml",
];

/// Finds the stack file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no stack file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found stack file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(StackplanError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlanFormat;
    use crate::model::{PropertyValue, ResourceKind};

    #[test]
    fn test_parse_minimal_stack() {
        let yaml = r"
project:
  name: test-project
";
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).unwrap();

        assert_eq!(config.project.name, "test-project");
        assert_eq!(config.project.environment, "dev");
        assert_eq!(config.output.path, "stackplan.out");
        assert!(config.resources.is_empty());
    }

    #[test]
    fn test_parse_full_stack() {
        let yaml = r"
project:
  name: ml-pipeline
  environment: prod

output:
  path: build/plans
  format: yaml

kinds:
  bucket: [websiteUrl]

resources:
  - id: NetworkStack
    kind: network
    properties:
      cidr: 10.0.0.0/16
      maxAzs: 2
    outputs:
      vpcId: vpc-0a1b2c

  - id: SageMakerStack
    kind: model_endpoint
    properties:
      vpc: { ref: { target: NetworkStack, output: vpcId } }
      instanceType: ml.m5.large
    outputs:
      endpointName: inference
";
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).unwrap();

        assert_eq!(config.output.format, PlanFormat::Yaml);
        assert_eq!(config.kinds[&ResourceKind::Bucket], vec![String::from("websiteUrl")]);
        assert_eq!(config.resource_ids(), vec!["NetworkStack", "SageMakerStack"]);
        assert_eq!(
            config.resources[1].properties["vpc"],
            PropertyValue::reference("NetworkStack", "vpcId")
        );
    }

    #[test]
    fn test_unknown_kind_is_parse_error() {
        let yaml = r"
project:
  name: p
resources:
  - id: x
    kind: mainframe
";
        let err = ConfigParser::new().parse_yaml(yaml, None).unwrap_err();
        assert!(matches!(err, StackplanError::Config(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_resolve_output_dir() {
        let config = ConfigParser::new()
            .parse_yaml("project:\n  name: p\n", None)
            .unwrap();

        let parser = ConfigParser::new().with_base_path("/work/infra");
        assert_eq!(
            parser.resolve_output_dir(&config),
            std::path::PathBuf::from("/work/infra/stackplan.out")
        );
    }

    #[test]
    fn test_find_config_file_walks_up() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("stack.yml"), "project:\n  name: p\n").unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, dir.path().join("stack.yml"));
    }
}

//! Configuration module for stackplan.
//!
//! This module handles all stack-file functionality:
//! - Parsing and deserializing `stackplan.yaml`
//! - Validation of names, kinds and declared outputs
//! - Computing declaration hashes for change detection

mod spec;
mod parser;
mod validator;
mod hash;

pub use spec::{OutputConfig, PlanFormat, ProjectConfig, ResourceDeclaration, StackConfig};
pub use parser::{ConfigParser, DEFAULT_CONFIG_FILES, find_config_file};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
pub use hash::DeclarationHasher;

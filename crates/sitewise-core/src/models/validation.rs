use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of parameter validation for one intent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub missing_required: Vec<String>,
    pub invalid_values: Vec<InvalidValue>,
    /// Required parameters resolved from the loaded project
    pub satisfied_by_context: Vec<String>,
    pub warnings: Vec<String>,
    pub context_used: bool,
}

/// Parameter value violating its constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidValue {
    pub parameter: String,
    pub value: Value,
    pub reason: String,
}

impl ValidationResult {
    /// Recompute `is_valid` from the collected errors
    pub fn finalize(mut self) -> Self {
        self.is_valid = self.missing_required.is_empty() && self.invalid_values.is_empty();
        self.context_used = !self.satisfied_by_context.is_empty();
        self
    }

    /// One line per problem, for error rendering
    pub fn error_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .missing_required
            .iter()
            .map(|p| format!("missing required parameter '{}'", p))
            .collect();
        lines.extend(
            self.invalid_values
                .iter()
                .map(|v| format!("'{}' = {}: {}", v.parameter, v.value, v.reason)),
        );
        lines
    }
}

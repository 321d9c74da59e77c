use crate::error::LoadError;
use crate::message::{MessageToken, tokenize};
use serde::Deserialize;
use std::collections::HashSet;

/// A block definition as loaded from JSON.
///
/// The `message` template interleaves label text with `%N` placeholders that
/// reference entries of `args` (1-based), fixing the display order of fields
/// and inputs.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockDefinition {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, alias = "message0")]
    pub message: Option<String>,
    #[serde(default, alias = "args0")]
    pub args: Vec<ArgumentDefinition>,
    #[serde(default)]
    pub output: bool,
    #[serde(default, alias = "previousStatement")]
    pub previous: bool,
    #[serde(default, alias = "nextStatement")]
    pub next: bool,
    #[serde(default, alias = "colour")]
    pub color: Option<u32>,
    #[serde(default)]
    pub tooltip: Option<String>,
    #[serde(default, alias = "inputsInline")]
    pub inputs_inline: Option<bool>,
    #[serde(default)]
    pub mutator: Option<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// One `args` entry: an input slot or a field, discriminated by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArgumentDefinition {
    InputValue {
        name: String,
    },
    InputStatement {
        name: String,
    },
    InputDummy {
        #[serde(default)]
        name: Option<String>,
    },
    FieldLabel {
        #[serde(default)]
        name: Option<String>,
        text: String,
    },
    FieldText {
        name: String,
        #[serde(default)]
        text: String,
    },
    FieldNumber {
        name: String,
        #[serde(default)]
        value: f64,
    },
    FieldCheckbox {
        name: String,
        #[serde(default)]
        checked: bool,
    },
    FieldDropdown {
        name: String,
        options: Vec<(String, String)>,
    },
    FieldVariable {
        name: String,
        #[serde(default)]
        variable: Option<String>,
    },
}

impl ArgumentDefinition {
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            ArgumentDefinition::InputValue { .. }
                | ArgumentDefinition::InputStatement { .. }
                | ArgumentDefinition::InputDummy { .. }
        )
    }
}

impl BlockDefinition {
    /// Parses a single definition from JSON.
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let definition: BlockDefinition =
            serde_json::from_str(json).map_err(|e| LoadError::DefinitionParse(e.to_string()))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Checks internal consistency: a non-empty type name, exclusive upward
    /// slots, and a message whose placeholders reference each arg exactly
    /// once.
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.type_name.is_empty() {
            return Err(LoadError::InvalidDefinition(
                "definition has an empty type name".to_string(),
            ));
        }
        if self.output && self.previous {
            return Err(LoadError::InvalidDefinition(format!(
                "'{}' requests both an output and a previous connection",
                self.type_name
            )));
        }
        let message = self.message.as_deref().unwrap_or("");
        if self.message.is_none() && !self.args.is_empty() {
            return Err(LoadError::InvalidDefinition(format!(
                "'{}' declares args but no message",
                self.type_name
            )));
        }

        let mut seen = HashSet::new();
        for token in tokenize(message) {
            if let MessageToken::Placeholder(index) = token {
                if index == 0 || index as usize > self.args.len() {
                    return Err(LoadError::InvalidDefinition(format!(
                        "'{}' message references %{} but defines {} args",
                        self.type_name,
                        index,
                        self.args.len()
                    )));
                }
                if !seen.insert(index) {
                    return Err(LoadError::InvalidDefinition(format!(
                        "'{}' message references %{} more than once",
                        self.type_name, index
                    )));
                }
            }
        }
        if seen.len() != self.args.len() {
            return Err(LoadError::InvalidDefinition(format!(
                "'{}' defines {} args but its message references {}",
                self.type_name,
                self.args.len(),
                seen.len()
            )));
        }
        Ok(())
    }
}

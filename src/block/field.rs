use std::fmt;

/// Discriminant for the closed set of field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Label,
    Text,
    Number,
    Checkbox,
    Dropdown,
    Variable,
}

/// One selectable entry of a dropdown field: display text plus stored value.
#[derive(Debug, Clone, PartialEq)]
pub struct DropdownOption {
    pub display: String,
    pub value: String,
}

/// A leaf editable value inside an input.
///
/// Fields are created with their input and owned by it; they are never shared
/// between inputs. `Variable` fields are special throughout: a shadow block
/// may not contain one.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// Static label text. Not editable, not serialized.
    Label { name: Option<String>, text: String },
    Text { name: String, value: String },
    Number { name: String, value: f64 },
    Checkbox { name: String, checked: bool },
    Dropdown {
        name: String,
        options: Vec<DropdownOption>,
        selected: usize,
    },
    Variable { name: String, variable: String },
}

impl Field {
    pub fn kind(&self) -> FieldKind {
        match self {
            Field::Label { .. } => FieldKind::Label,
            Field::Text { .. } => FieldKind::Text,
            Field::Number { .. } => FieldKind::Number,
            Field::Checkbox { .. } => FieldKind::Checkbox,
            Field::Dropdown { .. } => FieldKind::Dropdown,
            Field::Variable { .. } => FieldKind::Variable,
        }
    }

    /// The field's name, if it has one. Labels may be anonymous.
    pub fn name(&self) -> Option<&str> {
        match self {
            Field::Label { name, .. } => name.as_deref(),
            Field::Text { name, .. }
            | Field::Number { name, .. }
            | Field::Checkbox { name, .. }
            | Field::Dropdown { name, .. }
            | Field::Variable { name, .. } => Some(name),
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Field::Variable { .. })
    }

    /// Whether this field participates in serialization. Labels carry no
    /// user state and are skipped.
    pub fn is_serializable(&self) -> bool {
        !matches!(self, Field::Label { .. })
    }

    /// The field value rendered as serialized text.
    pub fn value_text(&self) -> String {
        match self {
            Field::Label { text, .. } => text.clone(),
            Field::Text { value, .. } => value.clone(),
            Field::Number { value, .. } => {
                if value.fract() == 0.0 {
                    format!("{}", *value as i64)
                } else {
                    format!("{}", value)
                }
            }
            Field::Checkbox { checked, .. } => checked.to_string(),
            Field::Dropdown {
                options, selected, ..
            } => options
                .get(*selected)
                .map(|o| o.value.clone())
                .unwrap_or_default(),
            Field::Variable { variable, .. } => variable.clone(),
        }
    }

    /// Sets the field value from serialized text. Returns a message describing
    /// the problem when the text does not fit the field kind.
    pub fn set_from_text(&mut self, text: &str) -> Result<(), String> {
        match self {
            Field::Label { .. } => Err("label fields are not editable".to_string()),
            Field::Text { value, .. } => {
                *value = text.to_string();
                Ok(())
            }
            Field::Number { value, .. } => match text.parse::<f64>() {
                Ok(parsed) if parsed.is_finite() => {
                    *value = parsed;
                    Ok(())
                }
                _ => Err("expected a finite number".to_string()),
            },
            Field::Checkbox { checked, .. } => match text {
                "true" | "TRUE" => {
                    *checked = true;
                    Ok(())
                }
                "false" | "FALSE" => {
                    *checked = false;
                    Ok(())
                }
                _ => Err("expected 'true' or 'false'".to_string()),
            },
            Field::Dropdown {
                options, selected, ..
            } => match options.iter().position(|o| o.value == text) {
                Some(index) => {
                    *selected = index;
                    Ok(())
                }
                None => Err("no dropdown option with that value".to_string()),
            },
            Field::Variable { variable, .. } => {
                if text.is_empty() {
                    return Err("variable name cannot be empty".to_string());
                }
                *variable = text.to_string();
                Ok(())
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}={}", name, self.value_text()),
            None => write!(f, "{}", self.value_text()),
        }
    }
}

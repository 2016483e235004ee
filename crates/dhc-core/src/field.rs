//! HL7 field, component, and subcomponent structures

use crate::delimiters::Delimiters;

/// A subcomponent within a component
///
/// This is the smallest unit in the HL7 message hierarchy. The stored value
/// is the raw wire text, escape sequences included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubComponent {
    pub value: String,
}

impl SubComponent {
    /// Create a new subcomponent
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Check if subcomponent is empty
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Get the raw value
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl From<&str> for SubComponent {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A component within a field
///
/// Components can contain subcomponents separated by `&`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Component {
    pub subcomponents: Vec<SubComponent>,
}

impl Component {
    /// Create a new empty component
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a component from a single value
    pub fn from_value<S: Into<String>>(value: S) -> Self {
        Self {
            subcomponents: vec![SubComponent::new(value)],
        }
    }

    /// Add a subcomponent
    pub fn add_subcomponent(&mut self, subcomponent: SubComponent) {
        self.subcomponents.push(subcomponent);
    }

    /// Get a subcomponent by index (0-based)
    pub fn get_subcomponent(&self, index: usize) -> Option<&SubComponent> {
        self.subcomponents.get(index)
    }

    /// Check if component is empty
    pub fn is_empty(&self) -> bool {
        self.subcomponents.is_empty() || self.subcomponents.iter().all(|s| s.is_empty())
    }

    /// Get the first subcomponent value (most common case)
    pub fn value(&self) -> Option<&str> {
        self.subcomponents.first().map(|s| s.as_str())
    }

    /// Encode the component
    pub fn encode(&self, delimiters: &Delimiters) -> String {
        self.subcomponents
            .iter()
            .map(|sc| sc.value.clone())
            .collect::<Vec<_>>()
            .join(&delimiters.subcomponent_separator.to_string())
    }
}

/// A repetition of a field
///
/// Fields can repeat, each repetition containing components.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repetition {
    pub components: Vec<Component>,
}

impl Repetition {
    /// Create a new empty repetition
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from a single value
    pub fn from_value<S: Into<String>>(value: S) -> Self {
        Self {
            components: vec![Component::from_value(value)],
        }
    }

    /// Add a component
    pub fn add_component(&mut self, component: Component) {
        self.components.push(component);
    }

    /// Get a component by index (0-based)
    pub fn get_component(&self, index: usize) -> Option<&Component> {
        self.components.get(index)
    }

    /// Check if repetition is empty
    pub fn is_empty(&self) -> bool {
        self.components.is_empty() || self.components.iter().all(|c| c.is_empty())
    }

    /// Get the first component's value (most common case)
    pub fn value(&self) -> Option<&str> {
        self.components.first().and_then(|c| c.value())
    }

    /// Encode the repetition
    pub fn encode(&self, delimiters: &Delimiters) -> String {
        self.components
            .iter()
            .map(|c| c.encode(delimiters))
            .collect::<Vec<_>>()
            .join(&delimiters.component_separator.to_string())
    }
}

/// A field within a segment
///
/// The hierarchy is: Field -> Repetitions -> Components -> Subcomponents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Field {
    pub repetitions: Vec<Repetition>,
}

impl Field {
    /// Create a new empty field
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from a single value
    pub fn from_value<S: Into<String>>(value: S) -> Self {
        Self {
            repetitions: vec![Repetition::from_value(value)],
        }
    }

    /// Add a repetition
    pub fn add_repetition(&mut self, repetition: Repetition) {
        self.repetitions.push(repetition);
    }

    /// Get a repetition by index (0-based)
    pub fn get_repetition(&self, index: usize) -> Option<&Repetition> {
        self.repetitions.get(index)
    }

    /// Number of repetitions present
    pub fn repetition_count(&self) -> usize {
        self.repetitions.len()
    }

    /// Check if field is empty
    pub fn is_empty(&self) -> bool {
        self.repetitions.is_empty() || self.repetitions.iter().all(|r| r.is_empty())
    }

    /// Get the first repetition's value (most common case)
    pub fn value(&self) -> Option<&str> {
        self.repetitions.first().and_then(|r| r.value())
    }

    /// Encode the field
    pub fn encode(&self, delimiters: &Delimiters) -> String {
        self.repetitions
            .iter()
            .map(|r| r.encode(delimiters))
            .collect::<Vec<_>>()
            .join(&delimiters.repetition_separator.to_string())
    }

    /// Get component at (repetition, component), both 0-based
    pub fn get_component(&self, rep_index: usize, comp_index: usize) -> Option<&Component> {
        self.get_repetition(rep_index)
            .and_then(|r| r.get_component(comp_index))
    }
}

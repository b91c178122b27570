use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "template_test.rs"]
mod template_test;

const PLACEHOLDER: &str = "{}";

/// A string with positional `{}` placeholders, formatted at runtime.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Template(String);

impl Template {
    pub fn new(template: &str) -> Self {
        Self(template.to_string())
    }

    pub fn placeholder_count(&self) -> usize {
        self.0.matches(PLACEHOLDER).count()
    }

    /// Substitutes `args` into the placeholders, in order.
    ///
    /// # Panics
    /// If the number of arguments differs from the number of placeholders.
    pub fn format(&self, args: &[&dyn Display]) -> String {
        let expected = self.placeholder_count();
        assert_eq!(
            expected,
            args.len(),
            "Template {:?} expects {} arguments, got {}.",
            self.0,
            expected,
            args.len()
        );

        let mut formatted = String::with_capacity(self.0.len());
        let mut parts = self.0.split(PLACEHOLDER);
        if let Some(first) = parts.next() {
            formatted.push_str(first);
        }
        for (part, arg) in parts.zip(args) {
            formatted.push_str(&arg.to_string());
            formatted.push_str(part);
        }
        formatted
    }
}

impl Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//! Human-readable rendering of dynamic values for diagnostics.
//!
//! Output is bounded by [`RenderConfig`]: nesting beyond `max_depth` collapses to
//! `{…} (n)` and containers longer than `max_items` are truncated, so effects and
//! substitutions of any size stay printable inside error messages.

use serde_json::{Map, Value};

use crate::config::RenderConfig;

/// Render `value` with the default layout.
pub fn render(value: &Value) -> String {
    Renderer::default().render(value)
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn render(&self, value: &Value) -> String {
        let indent = self.indent(1);
        format!("{}{}", indent, self.value(value, 0))
    }

    fn value(&self, value: &Value, depth: usize) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::String(_) => value.to_string(),
            Value::Bool(flag) => flag.to_string(),
            Value::Number(number) => number.to_string(),
            Value::Array(items) => self.container(
                ('[', ']'),
                items.len(),
                depth,
                items.iter().map(|item| self.value(item, depth + 1)),
            ),
            Value::Object(fields) => self.object(fields, depth),
        }
    }

    fn object(&self, fields: &Map<String, Value>, depth: usize) -> String {
        self.container(
            ('{', '}'),
            fields.len(),
            depth,
            fields
                .iter()
                .map(|(key, value)| format!("{}: {}", key, self.value(value, depth + 1))),
        )
    }

    fn container<I>(&self, (start, end): (char, char), size: usize, depth: usize, items: I) -> String
    where
        I: Iterator<Item = String>,
    {
        if size == 0 {
            return format!("{}{}", start, end);
        }
        if depth >= self.config.max_depth {
            return format!("{}\u{2026}{} ({})", start, end, size);
        }

        let inner = self.indent(depth + 2);
        let mut lines: Vec<String> = items
            .take(self.config.max_items)
            .map(|item| format!("{}{}", inner, item))
            .collect();
        if size > self.config.max_items {
            lines.push(format!(
                "{}\u{2026} ({} more)",
                inner,
                size - self.config.max_items
            ));
        }

        format!(
            "{}\n{}\n{}{}",
            start,
            lines.join(",\n"),
            self.indent(depth + 1),
            end
        )
    }

    fn indent(&self, levels: usize) -> String {
        " ".repeat(self.config.tab_width * levels)
    }
}

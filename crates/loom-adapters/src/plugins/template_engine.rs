//! `{{NAME}}` substitution engine.

use std::collections::BTreeMap;

use loom_core::{
    application::{
        ApplicationError,
        plugins::{PluginManifest, capabilities},
        ports::TemplateEngine,
    },
    error::LoomResult,
};

pub const ID: &str = "loom.simple-template";

/// Replaces `{{NAME}}` with its value. Names are letters, digits and `_`.
///
/// Placeholders without a value are left in place so the output shows what
/// was missing.
#[derive(Debug, Clone)]
pub struct SimpleTemplateEngine {
    manifest: PluginManifest,
}

impl SimpleTemplateEngine {
    pub fn new() -> Self {
        Self {
            manifest: PluginManifest::new(ID, loom_core::VERSION)
                .with_capability(capabilities::TEMPLATE_ENGINE),
        }
    }
}

impl Default for SimpleTemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

enum Segment<'t> {
    Text(&'t str),
    Placeholder(&'t str),
}

/// Split a template into literal text and placeholder names.
fn segments(template: &str) -> Result<Vec<Segment<'_>>, String> {
    let mut out = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push(Segment::Text(&rest[..start]));
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| format!("unclosed '{{{{' at byte {}", template.len() - rest.len() + start))?;
        let name = after[..end].trim();
        if is_placeholder_name(name) {
            out.push(Segment::Placeholder(name));
        } else {
            // not ours, keep verbatim
            out.push(Segment::Text(&rest[start..start + 2 + end + 2]));
        }
        rest = &after[end + 2..];
    }
    out.push(Segment::Text(rest));
    Ok(out)
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl TemplateEngine for SimpleTemplateEngine {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    fn placeholders(&self, template: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for segment in segments(template).unwrap_or_default() {
            if let Segment::Placeholder(name) = segment {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }

    fn render(&self, template: &str, values: &BTreeMap<String, String>) -> LoomResult<String> {
        let segments =
            segments(template).map_err(|reason| ApplicationError::RenderingFailed { reason })?;

        let mut out = String::with_capacity(template.len());
        for segment in segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(name) => match values.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(name);
                        out.push_str("}}");
                    }
                },
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn lists_placeholders_once_in_first_use_order() {
        let engine = SimpleTemplateEngine::new();
        assert_eq!(
            engine.placeholders("{{B}} {{A}} {{ B }} {{not a name}}"),
            vec!["B", "A"]
        );
    }

    #[test]
    fn renders_known_and_keeps_unknown() {
        let engine = SimpleTemplateEngine::new();
        let out = engine
            .render("mod {{NAME}}; // {{OTHER}}", &values(&[("NAME", "sales")]))
            .unwrap();
        assert_eq!(out, "mod sales; // {{OTHER}}");
    }

    #[test]
    fn foreign_braces_survive() {
        let engine = SimpleTemplateEngine::new();
        let out = engine
            .render("format!(\"{{{{}}}}\") {{X}}", &values(&[("X", "1")]))
            .unwrap();
        assert!(out.ends_with(" 1"));
    }

    #[test]
    fn unclosed_placeholder_fails() {
        let engine = SimpleTemplateEngine::new();
        assert!(engine.render("hello {{NAME", &BTreeMap::new()).is_err());
        assert!(engine.placeholders("hello {{NAME").is_empty());
    }

    #[test]
    fn manifest_is_a_valid_engine() {
        let engine = SimpleTemplateEngine::new();
        assert!(
            engine
                .manifest()
                .validate(capabilities::TEMPLATE_ENGINE)
                .is_ok()
        );
    }
}

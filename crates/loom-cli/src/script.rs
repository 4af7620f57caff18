//! Edit scripts for `loom apply`.
//!
//! One step per line. Blank lines and `#` comments are skipped; arguments are
//! separated by whitespace and may be double-quoted to contain spaces.

use thiserror::Error;

use loom_core::prelude::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    AddScope(String),
    RenameScope { from: String, to: String },
    RemoveScope(String),
    AddEntity {
        scope: String,
        name: String,
        table: Option<String>,
    },
    Set {
        path: String,
        key: String,
        value: Value,
    },
    Copy(String),
    Cut(String),
    /// Paste into the named scope, or into the scope list when `None`.
    Paste(Option<String>),
    Undo,
    Redo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLine {
    pub number: usize,
    pub step: Step,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

/// Parse a whole script; the first bad line aborts.
pub fn parse(source: &str) -> Result<Vec<ScriptLine>, ParseError> {
    let mut steps = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let number = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let step = tokenize(line)
            .and_then(|tokens| parse_step(&tokens))
            .map_err(|message| ParseError {
                line: number,
                message,
            })?;
        steps.push(ScriptLine { number, step });
    }
    Ok(steps)
}

fn parse_step(tokens: &[String]) -> Result<Step, String> {
    let words: Vec<&str> = tokens.iter().map(String::as_str).collect();
    match words.as_slice() {
        ["scope", "add", name] => Ok(Step::AddScope(name.to_string())),
        ["scope", "rename", from, to] => Ok(Step::RenameScope {
            from: from.to_string(),
            to: to.to_string(),
        }),
        ["scope", "remove", name] => Ok(Step::RemoveScope(name.to_string())),
        ["entity", "add", scope, name] => Ok(Step::AddEntity {
            scope: scope.to_string(),
            name: name.to_string(),
            table: None,
        }),
        ["entity", "add", scope, name, table] => Ok(Step::AddEntity {
            scope: scope.to_string(),
            name: name.to_string(),
            table: Some(table.to_string()),
        }),
        ["set", path, assignment] => {
            let (key, raw) = assignment
                .split_once('=')
                .ok_or_else(|| format!("expected KEY=VALUE, got '{assignment}'"))?;
            if key.is_empty() {
                return Err("property key is empty".into());
            }
            Ok(Step::Set {
                path: path.to_string(),
                key: key.to_string(),
                value: parse_value(raw),
            })
        }
        ["copy", path] => Ok(Step::Copy(path.to_string())),
        ["cut", path] => Ok(Step::Cut(path.to_string())),
        ["paste"] => Ok(Step::Paste(None)),
        ["paste", scope] => Ok(Step::Paste(Some(scope.to_string()))),
        ["undo"] => Ok(Step::Undo),
        ["redo"] => Ok(Step::Redo),
        _ => Err(format!("unknown or malformed step '{}'", words.join(" "))),
    }
}

/// `true`/`false`, integers, floats and `null` keep their type; anything
/// else is text.
fn parse_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => raw
            .parse::<i64>()
            .map(Value::Int)
            .or_else(|_| raw.parse::<f64>().map(Value::Float))
            .unwrap_or_else(|_| Value::Text(raw.to_string())),
    }
}

fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    tokens.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if quoted {
        return Err("unterminated quote".into());
    }
    if pending {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_step_and_skips_comments() {
        let script = r#"
            # set up billing
            scope add Billing
            entity add Billing Invoice invoices
            entity add Billing Payment
            set Billing/Invoice audited=true
            scope rename Billing "Accounts Receivable"
            copy "Accounts Receivable/Invoice"
            paste Sales
            cut Sales
            paste
            scope remove Legacy
            undo
            redo
        "#;
        let steps: Vec<Step> = parse(script).unwrap().into_iter().map(|l| l.step).collect();
        assert_eq!(steps.len(), 12);
        assert_eq!(steps[0], Step::AddScope("Billing".into()));
        assert_eq!(
            steps[1],
            Step::AddEntity {
                scope: "Billing".into(),
                name: "Invoice".into(),
                table: Some("invoices".into())
            }
        );
        assert_eq!(
            steps[3],
            Step::Set {
                path: "Billing/Invoice".into(),
                key: "audited".into(),
                value: Value::Bool(true)
            }
        );
        assert_eq!(
            steps[4],
            Step::RenameScope {
                from: "Billing".into(),
                to: "Accounts Receivable".into()
            }
        );
        assert_eq!(steps[5], Step::Copy("Accounts Receivable/Invoice".into()));
        assert_eq!(steps[8], Step::Paste(None));
        assert_eq!(steps[11], Step::Redo);
    }

    #[test]
    fn line_numbers_count_skipped_lines() {
        let lines = parse("# header\n\nscope add A\n").unwrap();
        assert_eq!(lines[0].number, 3);
    }

    #[test]
    fn unknown_step_reports_its_line() {
        let err = parse("scope add A\nfrobnicate all\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("frobnicate"));
    }

    #[test]
    fn missing_arguments_are_rejected() {
        assert!(parse("scope add").is_err());
        assert!(parse("entity add Sales").is_err());
        assert!(parse("set Sales nokey").is_err());
        assert!(parse("set Sales =1").is_err());
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let err = parse("scope add \"Sales").unwrap_err();
        assert_eq!(err.message, "unterminated quote");
    }

    #[test]
    fn values_keep_their_type() {
        assert_eq!(parse_value("42"), Value::Int(42));
        assert_eq!(parse_value("1.5"), Value::Float(1.5));
        assert_eq!(parse_value("null"), Value::Null);
        assert_eq!(parse_value("orders"), Value::Text("orders".into()));
    }

    #[test]
    fn quoted_empty_argument_is_kept() {
        assert_eq!(tokenize(r#"scope add """#).unwrap(), vec!["scope", "add", ""]);
    }
}

//! Parser for declarative environment sources such as the engine suite's `amber.sh`.
//!
//! The file is read line by line and never executed. Only variable assignments
//! (`export KEY=VALUE` or `KEY=VALUE`) are honoured; everything else, including
//! shell control flow, is skipped. Values may reference previously defined
//! variables with `$NAME`, `${NAME}` or `${NAME:-fallback}`.

use std::collections::BTreeMap;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable {
        name: String,
        fallback: Option<String>,
    },
}

/// A single `KEY=VALUE` statement, with its value still unexpanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub line: usize,
    pub key: String,
    segments: Vec<Segment>,
}

impl Assignment {
    /// Expands the value against the variables defined so far.
    pub fn evaluate(&self, vars: &BTreeMap<String, String>) -> String {
        let mut value = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => value.push_str(text),
                Segment::Variable { name, fallback } => {
                    match (vars.get(name).filter(|v| !v.is_empty()), fallback) {
                        (Some(v), _) => value.push_str(v),
                        (None, Some(fb)) => value.push_str(fb),
                        (None, None) => {}
                    }
                }
            }
        }
        value
    }
}

/// Parses every assignment in `text`, in source order.
pub fn parse(text: &str) -> Vec<Assignment> {
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| parse_line(i + 1, line))
        .collect()
}

/// Applies the assignments in `text` on top of `vars`, returning how many were applied.
pub fn apply(text: &str, vars: &mut BTreeMap<String, String>) -> usize {
    let assignments = parse(text);
    for assignment in &assignments {
        let value = assignment.evaluate(vars);
        trace!(line = assignment.line, key = %assignment.key, "Applying environment assignment.");
        vars.insert(assignment.key.clone(), value);
    }
    assignments.len()
}

fn parse_line(number: usize, line: &str) -> Option<Assignment> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let statement = strip_keyword(trimmed, "export").unwrap_or(trimmed);
    let Some((key, raw_value)) = statement.split_once('=') else {
        debug!(line = number, "Skipping non-assignment line in environment source.");
        return None;
    };
    if !is_identifier(key) {
        debug!(line = number, "Skipping unsupported statement in environment source.");
        return None;
    }

    Some(Assignment {
        line: number,
        key: key.to_string(),
        segments: parse_value(raw_value),
    })
}

fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    rest.starts_with(char::is_whitespace)
        .then(|| rest.trim_start())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

struct ValueParser {
    segments: Vec<Segment>,
    literal: String,
}

impl ValueParser {
    fn flush(&mut self) {
        if !self.literal.is_empty() {
            self.segments
                .push(Segment::Literal(std::mem::take(&mut self.literal)));
        }
    }

    fn variable(&mut self, name: String, fallback: Option<String>) {
        self.flush();
        self.segments.push(Segment::Variable { name, fallback });
    }
}

fn parse_value(raw: &str) -> Vec<Segment> {
    let mut parser = ValueParser {
        segments: Vec::new(),
        literal: String::new(),
    };
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                for inner in chars.by_ref() {
                    if inner == '\'' {
                        break;
                    }
                    parser.literal.push(inner);
                }
            }
            '"' => {
                while let Some(inner) = chars.next() {
                    match inner {
                        '"' => break,
                        '\\' => match chars.peek() {
                            Some(&next) if matches!(next, '"' | '\\' | '$') => {
                                parser.literal.push(next);
                                chars.next();
                            }
                            _ => parser.literal.push('\\'),
                        },
                        '$' => expand(&mut parser, &mut chars),
                        other => parser.literal.push(other),
                    }
                }
            }
            '\\' => {
                if let Some(next) = chars.next() {
                    parser.literal.push(next);
                }
            }
            '$' => expand(&mut parser, &mut chars),
            // An unquoted blank or `;` ends the value; anything after is a comment or
            // another command.
            c if c.is_whitespace() || c == ';' => break,
            other => parser.literal.push(other),
        }
    }

    parser.flush();
    parser.segments
}

fn expand(parser: &mut ValueParser, chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    match chars.peek() {
        Some('{') => {
            chars.next();
            let mut body = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                body.push(c);
            }
            if !closed {
                parser.literal.push_str("${");
                parser.literal.push_str(&body);
                return;
            }
            let (name, fallback) = match body.split_once(":-") {
                Some((name, fallback)) => (name.to_string(), Some(fallback.to_string())),
                None => (body, None),
            };
            if is_identifier(&name) {
                parser.variable(name, fallback);
            } else {
                parser.literal.push_str("${");
                parser.literal.push_str(&name);
                parser.literal.push('}');
            }
        }
        Some(&c) if c.is_ascii_alphabetic() || c == '_' => {
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            parser.variable(name, None);
        }
        _ => parser.literal.push('$'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_amber_style_source() {
        let source = r#"
# Amber environment
export AMBERHOME="/opt/amber24"
export PATH="${AMBERHOME}/bin:${PATH}"

if [ -z "$LD_LIBRARY_PATH" ]; then
   export LD_LIBRARY_PATH="${AMBERHOME}/lib"
else
   export LD_LIBRARY_PATH="${AMBERHOME}/lib:${LD_LIBRARY_PATH}"
fi
test -f "$AMBERHOME/.env" && source "$AMBERHOME/.env"
"#;
        let mut env = vars(&[("PATH", "/usr/bin")]);
        let applied = apply(source, &mut env);

        assert_eq!(applied, 4);
        assert_eq!(env["AMBERHOME"], "/opt/amber24");
        assert_eq!(env["PATH"], "/opt/amber24/bin:/usr/bin");
        assert_eq!(env["LD_LIBRARY_PATH"], "/opt/amber24/lib:/opt/amber24/lib");
    }

    #[test]
    fn single_quotes_are_literal() {
        let mut env = vars(&[("HOME", "/home/md")]);
        apply("A='$HOME/x'\nB=\"$HOME/x\"\nC=$HOME/x", &mut env);
        assert_eq!(env["A"], "$HOME/x");
        assert_eq!(env["B"], "/home/md/x");
        assert_eq!(env["C"], "/home/md/x");
    }

    #[test]
    fn fallback_applies_to_unset_or_empty_variables() {
        let mut env = vars(&[("EMPTY", "")]);
        apply(
            "A=${MISSING:-/default}\nB=${EMPTY:-fb}\nC=pre${MISSING}post",
            &mut env,
        );
        assert_eq!(env["A"], "/default");
        assert_eq!(env["B"], "fb");
        assert_eq!(env["C"], "prepost");
    }

    #[test]
    fn unquoted_values_stop_at_whitespace_and_semicolons() {
        let mut env = BTreeMap::new();
        apply("A=one two\nB=x;export C=y\nD=a\\ b # note", &mut env);
        assert_eq!(env["A"], "one");
        assert_eq!(env["B"], "x");
        assert_eq!(env["D"], "a b");
        assert!(!env.contains_key("C"));
    }

    #[test]
    fn non_assignments_are_skipped() {
        let parsed = parse("echo hi\nexport PATH\n1BAD=x\nexportFOO=1\n  export   OK=1\n");
        let keys: Vec<_> = parsed.iter().map(|a| (a.line, a.key.as_str())).collect();
        assert_eq!(keys, [(4, "exportFOO"), (5, "OK")]);
    }

    #[test]
    fn escaped_dollar_and_unterminated_braces_stay_literal() {
        let mut env = vars(&[("X", "1")]);
        apply("A=\"cost \\$X\"\nB=${X\nC=$\nD=\"${1bad}\"", &mut env);
        assert_eq!(env["A"], "cost $X");
        assert_eq!(env["B"], "${X");
        assert_eq!(env["C"], "$");
        assert_eq!(env["D"], "${1bad}");
    }

    #[test]
    fn later_assignments_see_earlier_ones() {
        let mut env = BTreeMap::new();
        apply("ROOT=/a\nBIN=$ROOT/bin\nROOT=/b\nOTHER=$ROOT", &mut env);
        assert_eq!(env["BIN"], "/a/bin");
        assert_eq!(env["OTHER"], "/b");
    }
}

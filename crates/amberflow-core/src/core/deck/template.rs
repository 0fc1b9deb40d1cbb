use crate::core::stage::Stage;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TemplateError {
    #[error("No value for placeholder '{{{key}}}' in the {stage} deck")]
    MissingValue { stage: Stage, key: String },

    #[error("Unterminated placeholder at byte {offset} of the {stage} deck template")]
    UnterminatedPlaceholder { stage: Stage, offset: usize },

    #[error("Empty placeholder at byte {offset} of the {stage} deck template")]
    EmptyPlaceholder { stage: Stage, offset: usize },

    #[error(
        "The {stage} deck needs the coordinates of {}, but was given {}",
        .expected.map_or("no stage".to_string(), |s| s.to_string()),
        .found.map_or("none".to_string(), |s| s.to_string())
    )]
    PredecessorMismatch {
        stage: Stage,
        expected: Option<Stage>,
        found: Option<Stage>,
    },
}

impl TemplateError {
    pub fn stage(&self) -> Stage {
        match self {
            TemplateError::MissingValue { stage, .. }
            | TemplateError::UnterminatedPlaceholder { stage, .. }
            | TemplateError::EmptyPlaceholder { stage, .. }
            | TemplateError::PredecessorMismatch { stage, .. } => *stage,
        }
    }
}

pub type Values = BTreeMap<&'static str, String>;

/// Substitutes every `{key}` in `template` with its value.
///
/// Rendering is all-or-nothing: a placeholder without a value, or whose value
/// is empty, fails the whole deck.
pub fn render(stage: Stage, template: &str, values: &Values) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len() + 64);
    let mut rest = template;
    let mut consumed = 0;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let offset = consumed + open;
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            return Err(TemplateError::UnterminatedPlaceholder { stage, offset });
        };
        let key = after[..close].trim();
        if key.is_empty() {
            return Err(TemplateError::EmptyPlaceholder { stage, offset });
        }
        match values.get(key).filter(|v| !v.is_empty()) {
            Some(value) => out.push_str(value),
            None => {
                return Err(TemplateError::MissingValue {
                    stage,
                    key: key.to_string(),
                });
            }
        }
        let advance = open + 1 + close + 1;
        consumed += advance;
        rest = &rest[advance..];
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&'static str, &str)]) -> Values {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn substitutes_all_placeholders() {
        let rendered = render(
            Stage::HeatNvt,
            "nstlim={steps}, temp0={temp}, again={steps}\n",
            &values(&[("steps", "25000"), ("temp", "300.0")]),
        )
        .unwrap();
        assert_eq!(rendered, "nstlim=25000, temp0=300.0, again=25000\n");
    }

    #[test]
    fn missing_or_empty_value_fails_the_whole_deck() {
        let err = render(Stage::ProdNpt, "nstlim={steps}", &Values::new()).unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingValue {
                stage: Stage::ProdNpt,
                key: "steps".to_string()
            }
        );

        let err = render(Stage::ProdNpt, "nstlim={steps}", &values(&[("steps", "")])).unwrap_err();
        assert!(matches!(err, TemplateError::MissingValue { .. }));
    }

    #[test]
    fn malformed_placeholders_are_reported_with_offsets() {
        assert_eq!(
            render(Stage::Prep, "ok {a} then {b", &values(&[("a", "1")])),
            Err(TemplateError::UnterminatedPlaceholder {
                stage: Stage::Prep,
                offset: 12
            })
        );
        assert_eq!(
            render(Stage::Prep, "x{ }", &Values::new()),
            Err(TemplateError::EmptyPlaceholder {
                stage: Stage::Prep,
                offset: 1
            })
        );
    }

    #[test]
    fn text_without_placeholders_is_unchanged() {
        let text = " &cntrl\n   imin=1,\n /\n";
        assert_eq!(render(Stage::MinFree, text, &Values::new()).unwrap(), text);
    }
}

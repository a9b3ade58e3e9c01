//! Chat adapter: turns a signature plus inputs into chat messages and parses
//! the completion back into typed outputs.
//!
//! Every field travels under a `[[ ## name ## ]]` header line, and the model
//! is asked to close its reply with `[[ ## completed ## ]]`.

use crate::signature::{Field, FieldType, Signature};
use augur_core::{AppError, AppResult};
use augur_llm::ChatMessage;
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::{Map, Number, Value};

const SYSTEM_TEMPLATE: &str = r#"Your input fields are:
{{#each inputs}}{{index}}. `{{name}}` ({{ty}})
{{/each}}Your output fields are:
{{#each outputs}}{{index}}. `{{name}}` ({{ty}})
{{/each}}All interactions will be structured in the following way, with the appropriate values filled in.

{{#each inputs}}[[ ## {{name}} ## ]]
{{placeholder}}

{{/each}}{{#each outputs}}[[ ## {{name}} ## ]]
{{placeholder}}

{{/each}}[[ ## completed ## ]]
In adhering to this structure, your objective is:
        {{instructions}}"#;

const USER_TEMPLATE: &str = r#"{{#each inputs}}[[ ## {{name}} ## ]]
{{value}}

{{/each}}Respond with the corresponding output fields, starting with the field {{output_sequence}}, and then ending with the marker for `[[ ## completed ## ]]`."#;

#[derive(Serialize)]
struct FieldView {
    index: usize,
    name: String,
    ty: String,
    placeholder: String,
}

#[derive(Serialize)]
struct SystemView {
    inputs: Vec<FieldView>,
    outputs: Vec<FieldView>,
    instructions: String,
}

#[derive(Serialize)]
struct InputView {
    name: String,
    value: String,
}

#[derive(Serialize)]
struct UserView {
    inputs: Vec<InputView>,
    output_sequence: String,
}

/// Formats prompts and parses completions using field header markers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatAdapter;

impl ChatAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Build the system and user messages for one call.
    ///
    /// Every declared input must be present in `inputs`; undeclared entries
    /// are ignored with a warning.
    #[tracing::instrument(
        name = "ChatAdapter.format",
        skip_all,
        fields(openinference.span.kind = "CHAIN")
    )]
    pub fn format(
        &self,
        signature: &Signature,
        inputs: &Map<String, Value>,
    ) -> AppResult<Vec<ChatMessage>> {
        for name in inputs.keys() {
            if signature.input(name).is_none() {
                tracing::warn!("Ignoring input `{}` not declared by the signature", name);
            }
        }

        let input_values = signature
            .inputs()
            .iter()
            .map(|field| {
                let value = inputs.get(&field.name).ok_or_else(|| {
                    AppError::Adapter(format!("Missing input field `{}`", field.name))
                })?;
                Ok(InputView {
                    name: field.name.clone(),
                    value: render_value(value),
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        let system = render_template(SYSTEM_TEMPLATE, &self.system_view(signature))?;
        let user = render_template(
            USER_TEMPLATE,
            &UserView {
                inputs: input_values,
                output_sequence: output_sequence(signature.outputs()),
            },
        )?;

        tracing::debug!("Formatted prompt for signature: {}", signature);

        Ok(vec![ChatMessage::system(system), ChatMessage::user(user)])
    }

    /// Extract the signature's output fields from a completion.
    #[tracing::instrument(
        name = "ChatAdapter.parse",
        skip_all,
        fields(openinference.span.kind = "CHAIN")
    )]
    pub fn parse(&self, signature: &Signature, completion: &str) -> AppResult<Map<String, Value>> {
        let sections = split_sections(completion);

        let mut outputs = Map::new();
        for field in signature.outputs() {
            let raw = sections
                .iter()
                .find(|(name, _)| name.as_deref() == Some(field.name.as_str()))
                .map(|(_, body)| body.trim())
                .ok_or_else(|| {
                    AppError::Adapter(format!(
                        "Expected field `{}` in completion: {:?}",
                        field.name, completion
                    ))
                })?;

            outputs.insert(field.name.clone(), coerce(field, raw)?);
        }

        Ok(outputs)
    }

    fn system_view(&self, signature: &Signature) -> SystemView {
        let view = |fields: &[Field], with_note: bool| {
            fields
                .iter()
                .enumerate()
                .map(|(i, field)| {
                    let mut placeholder = format!("{{{}}}", field.name);
                    if with_note {
                        if let Some(note) = type_note(&field.ty) {
                            placeholder.push_str(&format!(
                                "        # note: the value you produce {}",
                                note
                            ));
                        }
                    }
                    FieldView {
                        index: i + 1,
                        name: field.name.clone(),
                        ty: field.ty.to_string(),
                        placeholder,
                    }
                })
                .collect::<Vec<_>>()
        };

        SystemView {
            inputs: view(signature.inputs(), false),
            outputs: view(signature.outputs(), true),
            instructions: signature.instructions().to_string(),
        }
    }
}

/// Render a Handlebars template without HTML escaping.
fn render_template<T: Serialize>(template: &str, data: &T) -> AppResult<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("message", template)
        .map_err(|e| AppError::Adapter(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("message", data)
        .map_err(|e| AppError::Adapter(format!("Failed to render template: {}", e)))
}

/// Strings verbatim, everything else as compact JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn type_note(ty: &FieldType) -> Option<String> {
    match ty {
        FieldType::Str => None,
        FieldType::Int => Some("must be a single int value".to_string()),
        FieldType::Float => Some("must be a single float value".to_string()),
        FieldType::Bool => Some("must be True or False".to_string()),
        FieldType::List(inner) => Some(format!("must be a JSON array of {} values", inner)),
    }
}

fn output_sequence(outputs: &[Field]) -> String {
    outputs
        .iter()
        .map(|field| match type_note(&field.ty) {
            Some(note) => format!("`[[ ## {} ## ]]` ({})", field.name, note),
            None => format!("`[[ ## {} ## ]]`", field.name),
        })
        .collect::<Vec<_>>()
        .join(", then ")
}

/// Parse a `[[ ## name ## ]]` header line into the name and any trailing text.
fn parse_header(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim_start().strip_prefix("[[ ## ")?;
    let end = rest.find(" ## ]]")?;
    let name = rest[..end].trim();
    if name.is_empty() {
        return None;
    }
    Some((name, &rest[end + " ## ]]".len()..]))
}

/// Split a completion into `(header, body)` sections.
///
/// Text before the first header is kept under `None`.
fn split_sections(completion: &str) -> Vec<(Option<String>, String)> {
    let mut sections: Vec<(Option<String>, String)> = vec![(None, String::new())];

    for line in completion.lines() {
        match parse_header(line) {
            Some((name, trailing)) => {
                sections.push((Some(name.to_string()), trailing.trim().to_string()));
            }
            None => {
                if let Some((_, body)) = sections.last_mut() {
                    if !body.is_empty() {
                        body.push('\n');
                    }
                    body.push_str(line);
                }
            }
        }
    }

    sections
}

fn coerce(field: &Field, raw: &str) -> AppResult<Value> {
    let invalid = || {
        AppError::Adapter(format!(
            "Field `{}` expected {} but got {:?}",
            field.name, field.ty, raw
        ))
    };

    match &field.ty {
        FieldType::Str => Ok(Value::String(raw.to_string())),
        FieldType::Int => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid()),
        FieldType::Float => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(invalid),
        FieldType::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
        FieldType::List(_) => {
            let value: Value = serde_json::from_str(raw).map_err(|_| invalid())?;
            if conforms(&value, &field.ty) {
                Ok(value)
            } else {
                Err(invalid())
            }
        }
    }
}

fn conforms(value: &Value, ty: &FieldType) -> bool {
    match (ty, value) {
        (FieldType::Str, Value::String(_)) => true,
        (FieldType::Int, Value::Number(n)) => n.is_i64() || n.is_u64(),
        (FieldType::Float, Value::Number(_)) => true,
        (FieldType::Bool, Value::Bool(_)) => true,
        (FieldType::List(inner), Value::Array(items)) => {
            items.iter().all(|item| conforms(item, inner))
        }
        _ => false,
    }
}

//! Typed input/output signatures.
//!
//! A signature is written `inputs -> outputs`, each side a comma-separated
//! list of `name` or `name: type`:
//!
//! ```text
//! question: str -> answer: str
//! context, question -> answer, confidence: float
//! ```

use augur_core::{AppError, AppResult};
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Declared type of a signature field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Str,
    Int,
    Float,
    Bool,
    List(Box<FieldType>),
}

impl FieldType {
    /// Parse a type annotation such as `str` or `list[int]`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s {
            "str" => Some(Self::Str),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "bool" => Some(Self::Bool),
            _ => {
                let inner = s.strip_prefix("list[")?.strip_suffix(']')?;
                Self::parse(inner).map(|ty| Self::List(Box::new(ty)))
            }
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str => write!(f, "str"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Bool => write!(f, "bool"),
            Self::List(inner) => write!(f, "list[{}]", inner),
        }
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A named, typed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

/// Input and output fields plus the instruction given to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    inputs: Vec<Field>,
    outputs: Vec<Field>,
    instructions: String,
}

impl Signature {
    /// Parse a signature string.
    ///
    /// # Example
    /// ```
    /// use augur_predict::Signature;
    ///
    /// let sig = Signature::parse("question: str -> answer: str").unwrap();
    /// assert_eq!(sig.inputs()[0].name, "question");
    /// assert_eq!(sig.outputs()[0].name, "answer");
    /// ```
    pub fn parse(text: &str) -> AppResult<Self> {
        let mut sides = text.split("->");
        let (inputs, outputs) = match (sides.next(), sides.next(), sides.next()) {
            (Some(inputs), Some(outputs), None) => (inputs, outputs),
            (_, None, _) => {
                return Err(AppError::Signature(format!(
                    "Expected 'inputs -> outputs', missing '->' in {:?}",
                    text
                )))
            }
            _ => {
                return Err(AppError::Signature(format!(
                    "Only one '->' is allowed in {:?}",
                    text
                )))
            }
        };

        let inputs = parse_fields(inputs, "input")?;
        let outputs = parse_fields(outputs, "output")?;

        let mut seen = HashSet::new();
        for field in inputs.iter().chain(outputs.iter()) {
            if !seen.insert(field.name.as_str()) {
                return Err(AppError::Signature(format!(
                    "Duplicate field name `{}`",
                    field.name
                )));
            }
        }

        let instructions = default_instructions(&inputs, &outputs);
        Ok(Self {
            inputs,
            outputs,
            instructions,
        })
    }

    /// Replace the instruction text.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn inputs(&self) -> &[Field] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Field] {
        &self.outputs
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn input(&self, name: &str) -> Option<&Field> {
        self.inputs.iter().find(|f| f.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&Field> {
        self.outputs.iter().find(|f| f.name == name)
    }
}

impl FromStr for Signature {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |fields: &[Field]| {
            fields
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(f, "{} -> {}", join(&self.inputs[..]), join(&self.outputs[..]))
    }
}

fn parse_fields(side: &str, kind: &str) -> AppResult<Vec<Field>> {
    if side.trim().is_empty() {
        return Err(AppError::Signature(format!(
            "Signature declares no {} fields",
            kind
        )));
    }

    side.split(',').map(|part| parse_field(part, kind)).collect()
}

fn parse_field(part: &str, kind: &str) -> AppResult<Field> {
    let part = part.trim();
    if part.is_empty() {
        return Err(AppError::Signature(format!("Empty {} field", kind)));
    }

    let (name, ty) = match part.split_once(':') {
        Some((name, ty)) => {
            let ty = FieldType::parse(ty).ok_or_else(|| {
                AppError::Signature(format!("Unsupported type {:?} for `{}`", ty.trim(), name.trim()))
            })?;
            (name.trim(), ty)
        }
        None => (part, FieldType::Str),
    };

    if !is_identifier(name) {
        return Err(AppError::Signature(format!(
            "Invalid {} field name {:?}",
            kind, name
        )));
    }

    Ok(Field::new(name, ty))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn default_instructions(inputs: &[Field], outputs: &[Field]) -> String {
    let quote = |fields: &[Field]| {
        fields
            .iter()
            .map(|f| format!("`{}`", f.name))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "Given the fields {}, produce the fields {}.",
        quote(inputs),
        quote(outputs)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_question_answer() {
        let sig = Signature::parse("question: str -> answer: str").unwrap();
        assert_eq!(sig.inputs(), &[Field::new("question", FieldType::Str)]);
        assert_eq!(sig.outputs(), &[Field::new("answer", FieldType::Str)]);
        assert_eq!(
            sig.instructions(),
            "Given the fields `question`, produce the fields `answer`."
        );
    }

    #[test]
    fn test_parse_untyped_and_typed_fields() {
        let sig: Signature = "context, question -> answer, confidence: float, tags: list[str]"
            .parse()
            .unwrap();
        assert_eq!(sig.inputs().len(), 2);
        assert_eq!(sig.inputs()[0].ty, FieldType::Str);
        assert_eq!(sig.output("confidence").unwrap().ty, FieldType::Float);
        assert_eq!(
            sig.output("tags").unwrap().ty,
            FieldType::List(Box::new(FieldType::Str))
        );
    }

    #[test]
    fn test_with_instructions() {
        let sig = Signature::parse("question -> answer")
            .unwrap()
            .with_instructions("Answer only the question.");
        assert_eq!(sig.instructions(), "Answer only the question.");
        assert_eq!(sig.inputs()[0].name, "question");
    }

    #[test]
    fn test_display_is_canonical() {
        let sig = Signature::parse("  question->answer:int ").unwrap();
        assert_eq!(sig.to_string(), "question: str -> answer: int");
    }

    #[test]
    fn test_malformed_signatures() {
        let cases = [
            "question: str",
            "question -> answer -> extra",
            " -> answer",
            "question -> ",
            "question, -> answer",
            "question: string -> answer",
            "question: -> answer",
            "1question -> answer",
            "the question -> answer",
            "question -> question",
            "question: list[] -> answer",
        ];
        for case in cases {
            let result = Signature::parse(case);
            assert!(
                matches!(result, Err(AppError::Signature(_))),
                "expected {:?} to be rejected",
                case
            );
        }
    }

    #[test]
    fn test_field_type_display_round_trip() {
        for ty in ["str", "int", "float", "bool", "list[list[int]]"] {
            assert_eq!(FieldType::parse(ty).unwrap().to_string(), ty);
        }
    }

    #[test]
    fn test_signature_serialization() {
        let sig = Signature::parse("question -> answer: bool").unwrap();
        let json = serde_json::to_value(&sig).unwrap();
        assert_eq!(json["outputs"][0]["type"], "bool");
        assert_eq!(json["inputs"][0]["name"], "question");
    }
}

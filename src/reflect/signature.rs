use serde::Serialize;

/// Built-in scalar hints that are never re-emitted on a proxy parameter.
///
/// Emitting them changes call semantics on older hosts (they are read as
/// class names there), so the proxy declares such parameters untyped.
pub const SUPPRESSED_TYPE_HINTS: &[&str] = &[
    "string", "int", "integer", "float", "double", "bool", "boolean", "callable", "iterable",
    "mixed", "resource", "void", "object", "null", "false", "true", "never",
];

/// Names resolved relative to the declaring class; `\self` is not a class
const RELATIVE_CLASS_NAMES: &[&str] = &["self", "static", "parent"];

/// Type hint carried over to a proxy parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeHint {
    /// Untyped, or a suppressed built-in scalar
    None,
    /// `array`
    Array,
    /// Fully-qualified class or interface name, without leading `\`
    Class(String),
}

impl TypeHint {
    /// Normalize a declared type as written in the class source
    ///
    /// Leading `\` is dropped; `array` (any case) becomes [`TypeHint::Array`].
    /// Anything the proxy cannot re-declare as a single class name widens to
    /// [`TypeHint::None`]: suppressed scalars, nullable `?T`, union and
    /// intersection types, and the relative names `self`, `static`, `parent`.
    pub fn from_declared(declared: Option<&str>) -> Self {
        let Some(raw) = declared else {
            return TypeHint::None;
        };
        let raw = raw.trim();
        if raw.starts_with('?') || raw.contains(&['|', '&', '('][..]) {
            return TypeHint::None;
        }

        let name = raw.trim_start_matches('\\');
        if name.is_empty() {
            return TypeHint::None;
        }

        let lower = name.to_ascii_lowercase();
        if lower == "array" {
            TypeHint::Array
        } else if SUPPRESSED_TYPE_HINTS.contains(&lower.as_str())
            || RELATIVE_CLASS_NAMES.contains(&lower.as_str())
        {
            TypeHint::None
        } else {
            TypeHint::Class(name.to_string())
        }
    }

    /// Hint for a parameter, taking its default into account
    ///
    /// `?T $x = null` keeps `T`: a `null` default makes the re-declared hint
    /// nullable again. Without it a nullable hint widens to untyped.
    pub fn from_parameter(declared: Option<&str>, default: Option<&DefaultLiteral>) -> Self {
        match declared.map(str::trim) {
            Some(raw) if raw.starts_with('?') && default == Some(&DefaultLiteral::Null) => {
                Self::from_declared(Some(&raw[1..]))
            }
            other => Self::from_declared(other),
        }
    }

    /// Source form of the hint, empty for [`TypeHint::None`]
    pub fn render(&self) -> String {
        match self {
            TypeHint::None => String::new(),
            TypeHint::Array => "array".to_string(),
            TypeHint::Class(name) => format!("\\{}", name),
        }
    }
}

/// Default value literal supported on proxy parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DefaultLiteral {
    Null,
    EmptyArray,
    /// Scalar already rendered as source text (`5`, `true`, `'abc'`)
    Scalar(String),
}

impl DefaultLiteral {
    pub fn render(&self) -> &str {
        match self {
            DefaultLiteral::Null => "null",
            DefaultLiteral::EmptyArray => "array()",
            DefaultLiteral::Scalar(text) => text,
        }
    }
}

/// One parameter of a reflected method
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSpec {
    pub name: String,
    pub type_hint: TypeHint,
    pub by_reference: bool,
    pub default: Option<DefaultLiteral>,
}

impl ParameterSpec {
    /// Plain by-value parameter without hint or default
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: TypeHint::None,
            by_reference: false,
            default: None,
        }
    }

    pub fn with_type_hint(mut self, hint: TypeHint) -> Self {
        self.type_hint = hint;
        self
    }

    pub fn by_reference(mut self) -> Self {
        self.by_reference = true;
        self
    }

    pub fn with_default(mut self, default: DefaultLiteral) -> Self {
        self.default = Some(default);
        self
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// Public instance method as seen by the synthesizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSignature {
    pub name: String,
    pub parameters: Vec<ParameterSpec>,
}

impl MethodSignature {
    pub fn new(name: impl Into<String>, parameters: Vec<ParameterSpec>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }
}

/// Render `value` as a single-quoted source string literal
pub fn single_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

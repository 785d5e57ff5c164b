use crate::error::ReflectionError;
use crate::reflect::signature::{
    single_quoted, DefaultLiteral, MethodSignature, ParameterSpec, TypeHint,
};
use crate::reflect::Reflector;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Lifecycle and magic methods that are never proxied.
///
/// Re-declaring them on the proxy breaks object construction, cloning or
/// serialization of the hook instance.
pub const PROXY_DENYLIST: &[&str] = &[
    "__construct",
    "__destruct",
    "__clone",
    "__wakeup",
    "__sleep",
    "__set_state",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

/// Raw parameter as dumped from the host's class source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,

    /// Declared type as written, e.g. `array`, `?\Vendor\Foo`, `string`
    #[serde(default, rename = "type")]
    pub declared_type: Option<String>,

    #[serde(default)]
    pub by_ref: bool,

    #[serde(default)]
    pub optional: bool,

    /// Default value; only read when `optional` is set
    #[serde(default)]
    pub default: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,

    #[serde(default)]
    pub visibility: Visibility,

    #[serde(default, rename = "static")]
    pub is_static: bool,

    #[serde(default)]
    pub params: Vec<ParameterDescriptor>,
}

impl MethodDescriptor {
    /// Public, non-static, and not on the denylist
    pub fn is_proxyable(&self) -> bool {
        self.visibility == Visibility::Public
            && !self.is_static
            && !PROXY_DENYLIST
                .iter()
                .any(|denied| denied.eq_ignore_ascii_case(&self.name))
    }
}

/// A class or interface known to the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    /// Fully-qualified name without leading `\`
    pub name: String,

    #[serde(default)]
    pub parent: Option<String>,

    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
}

/// Class catalog backing the [`Reflector`]
///
/// The host dumps its hook classes (own API plus ancestors) into a JSON
/// manifest; the catalog answers reflection queries from it.
///
/// # Example
/// ```no_run
/// use hookcheck::reflect::{ClassCatalog, Reflector};
///
/// let catalog = ClassCatalog::from_file("classes.json")?;
/// for method in catalog.reflect("Vendor\\Ext\\Hook\\DataHandlerHook")? {
///     println!("{}({} params)", method.name, method.parameters.len());
/// }
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct ClassCatalog {
    classes: Vec<ClassDescriptor>,

    /// Lowercased class name → index into `classes`
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct CatalogFile {
    classes: Vec<ClassDescriptor>,
}

fn lookup_key(name: &str) -> String {
    name.trim().trim_start_matches('\\').to_ascii_lowercase()
}

impl ClassCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from its JSON form: `{"classes": [...]}`
    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: CatalogFile =
            serde_json::from_str(content).context("Invalid class catalog JSON")?;

        let mut catalog = Self::new();
        for class in file.classes {
            if class.name.trim().is_empty() {
                anyhow::bail!("Class catalog contains an entry without a name");
            }
            catalog.insert(class);
        }
        Ok(catalog)
    }

    /// Load a catalog from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read class catalog: {}", path.as_ref().display())
        })?;
        Self::from_json_str(&content)
            .with_context(|| format!("Failed to parse {}", path.as_ref().display()))
    }

    /// Add a class, replacing an existing one with the same name
    pub fn insert(&mut self, mut class: ClassDescriptor) {
        class.name = class.name.trim().trim_start_matches('\\').to_string();
        let key = lookup_key(&class.name);
        match self.index.get(&key) {
            Some(&slot) => self.classes[slot] = class,
            None => {
                self.index.insert(key, self.classes.len());
                self.classes.push(class);
            }
        }
    }

    /// Case-insensitive lookup, leading `\` ignored
    pub fn get(&self, name: &str) -> Option<&ClassDescriptor> {
        self.index.get(&lookup_key(name)).map(|&i| &self.classes[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn classes(&self) -> &[ClassDescriptor] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    fn signature_of(
        class: &ClassDescriptor,
        method: &MethodDescriptor,
    ) -> Result<MethodSignature, ReflectionError> {
        let mut parameters = Vec::with_capacity(method.params.len());
        for param in &method.params {
            let default = if param.optional {
                Some(default_literal(&param.default).ok_or_else(|| {
                    ReflectionError::UnsupportedDefault {
                        class: class.name.clone(),
                        method: method.name.clone(),
                        parameter: param.name.clone(),
                        value: param.default.to_string(),
                    }
                })?)
            } else {
                None
            };

            parameters.push(ParameterSpec {
                name: param.name.trim_start_matches('$').to_string(),
                type_hint: TypeHint::from_parameter(
                    param.declared_type.as_deref(),
                    default.as_ref(),
                ),
                by_reference: param.by_ref,
                default,
            });
        }
        Ok(MethodSignature::new(method.name.clone(), parameters))
    }
}

/// Map a raw default onto the supported literal set
fn default_literal(value: &Value) -> Option<DefaultLiteral> {
    match value {
        Value::Null => Some(DefaultLiteral::Null),
        Value::Array(items) if items.is_empty() => Some(DefaultLiteral::EmptyArray),
        Value::Bool(b) => Some(DefaultLiteral::Scalar(b.to_string())),
        Value::Number(n) => Some(DefaultLiteral::Scalar(n.to_string())),
        Value::String(s) => Some(DefaultLiteral::Scalar(single_quoted(s))),
        Value::Array(_) | Value::Object(_) => None,
    }
}

impl Reflector for ClassCatalog {
    /// Own methods in declaration order, then inherited ones that are not
    /// overridden, walking the parent chain.
    fn reflect(&self, class: &str) -> Result<Vec<MethodSignature>, ReflectionError> {
        let mut current = self
            .get(class)
            .ok_or_else(|| ReflectionError::UnknownClass(class.to_string()))?;

        let mut visited = HashSet::new();
        let mut declared = HashSet::new();
        let mut methods = Vec::new();

        loop {
            if !visited.insert(lookup_key(&current.name)) {
                return Err(ReflectionError::InheritanceCycle(current.name.clone()));
            }

            for method in &current.methods {
                // Overridden further down the chain, whatever its visibility
                if !declared.insert(method.name.to_ascii_lowercase()) {
                    continue;
                }
                if method.is_proxyable() {
                    methods.push(Self::signature_of(current, method)?);
                }
            }

            match &current.parent {
                None => break,
                Some(parent) => {
                    current = self
                        .get(parent)
                        .ok_or_else(|| ReflectionError::UnknownParent {
                            class: current.name.clone(),
                            parent: parent.clone(),
                        })?;
                }
            }
        }

        Ok(methods)
    }
}

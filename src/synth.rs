//! Proxy class synthesis
//!
//! Produces the source of a subclass that re-declares every public method of
//! the target with its exact signature, forwards the call to the parent, and
//! reports calls slower than [`MIN_REPORT_SECONDS`] to the debug sink.
//!
//! Output is a pure function of the reflected signatures and the
//! synthesizer's settings, so two runs over the same class state yield
//! byte-identical source.

use crate::reflect::{MethodSignature, ParameterSpec, Reflector};
use sha2::{Digest, Sha256};
use std::fmt;

/// Calls faster than this (seconds) are not reported
pub const MIN_REPORT_SECONDS: f64 = 0.001;

/// Default namespace for generated proxy classes
pub const DEFAULT_NAMESPACE: &str = "Hookcheck\\Proxy";

/// Default static call receiving `(elapsed, label)` in generated code
pub const DEFAULT_REPORT_SINK: &str = "\\TYPO3\\CMS\\Core\\Utility\\DebugUtility::debug";

const INDENT: &str = "    ";

/// Label attached to a slow-call report: `<ClassName>:<methodName>`
pub fn report_label(class: &str, method: &str) -> String {
    format!("{}:{}", class.trim_start_matches('\\'), method)
}

/// Source text of one generated proxy class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSource {
    text: String,
}

impl GeneratedSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Hex SHA-256 of the source text
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.text.as_bytes()))
    }
}

impl fmt::Display for GeneratedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Generates proxy class source from reflected signatures
#[derive(Debug, Clone)]
pub struct ProxySynthesizer {
    namespace: String,
    report_sink: String,
}

impl Default for ProxySynthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE, DEFAULT_REPORT_SINK)
    }
}

impl ProxySynthesizer {
    pub fn new(namespace: impl Into<String>, report_sink: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into().trim_matches('\\').to_string(),
            report_sink: report_sink.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Synthesize `new_class` extending `target`
    ///
    /// When the target cannot be reflected the class is still emitted, with
    /// no methods at all: a partial method list is never produced.
    pub fn synthesize<R: Reflector + ?Sized>(
        &self,
        reflector: &R,
        target: &str,
        new_class: &str,
    ) -> GeneratedSource {
        let target = target.trim_start_matches('\\');
        let methods = match reflector.reflect(target) {
            Ok(methods) => methods,
            Err(e) => {
                tracing::warn!(
                    "Generating {} without methods, reflection of {} failed: {}",
                    new_class,
                    target,
                    e
                );
                Vec::new()
            }
        };
        self.render_class(target, new_class, &methods)
    }

    /// Render a proxy class from already reflected signatures
    pub fn render_class(
        &self,
        target: &str,
        new_class: &str,
        methods: &[MethodSignature],
    ) -> GeneratedSource {
        let target = target.trim_start_matches('\\');
        let mut rows = Vec::new();
        rows.push(format!("namespace {};", self.namespace));
        rows.push(String::new());
        rows.push(format!("class {} extends \\{}", new_class, target));
        rows.push("{".to_string());

        for (i, method) in methods.iter().enumerate() {
            if i > 0 {
                rows.push(String::new());
            }
            self.render_method(target, method, &mut rows);
        }

        rows.push("}".to_string());
        GeneratedSource::new(rows.join("\n"))
    }

    fn render_method(&self, target: &str, method: &MethodSignature, rows: &mut Vec<String>) {
        let declared: Vec<String> = method.parameters.iter().map(declare_parameter).collect();
        let forwarded: Vec<String> = method
            .parameters
            .iter()
            .map(|p| format!("${}", p.name))
            .collect();
        let label = crate::reflect::single_quoted(&report_label(target, &method.name));

        let start = unused_local("hookcheckStart", method);
        let result = unused_local("hookcheckResult", method);
        let elapsed = unused_local("hookcheckElapsed", method);

        let body = [
            format!("${} = microtime(true);", start),
            format!(
                "${} = parent::{}({});",
                result,
                method.name,
                forwarded.join(", ")
            ),
            format!("${} = microtime(true) - ${};", elapsed, start),
            format!("if (${} > {}) {{", elapsed, MIN_REPORT_SECONDS),
            format!("{}{}(${}, {});", INDENT, self.report_sink, elapsed, label),
            "}".to_string(),
            format!("return ${};", result),
        ];

        rows.push(format!(
            "{}public function {}({})",
            INDENT,
            method.name,
            declared.join(", ")
        ));
        rows.push(format!("{}{{", INDENT));
        for line in body {
            rows.push(format!("{}{}{}", INDENT, INDENT, line));
        }
        rows.push(format!("{}}}", INDENT));
    }
}

/// `base`, or `base_N` for the first N that no parameter of `method` uses
fn unused_local(base: &str, method: &MethodSignature) -> String {
    let taken = |name: &str| method.parameters.iter().any(|p| p.name == name);
    if !taken(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}_{}", base, n))
        .find(|name| !taken(name))
        .unwrap_or_else(|| base.to_string())
}

/// Parameter as declared on the proxy: `[hint ]&?$name[ = default]`
fn declare_parameter(param: &ParameterSpec) -> String {
    let mut out = param.type_hint.render();
    if !out.is_empty() {
        out.push(' ');
    }
    if param.by_reference {
        out.push('&');
    }
    out.push('$');
    out.push_str(&param.name);
    if let Some(default) = &param.default {
        out.push_str(" = ");
        out.push_str(default.render());
    }
    out
}

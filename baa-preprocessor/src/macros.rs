//! The macro table and the redefinition policy.

use std::collections::HashMap;

use chrono::Local;
use tracing::debug;

/// A single macro definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    pub name: String,
    pub body: String,
    pub is_function_like: bool,
    pub is_variadic: bool,
    /// Named parameters; the variadic tail is not listed here.
    pub params: Vec<String>,
}

impl Macro {
    pub fn object_like(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
            is_function_like: false,
            is_variadic: false,
            params: vec![],
        }
    }
}

/// The names installed before processing begins. Redefining any of them
/// with a different body is an error.
pub const PREDEFINED_MACROS: &[&str] = &[
    "__الملف__",
    "__السطر__",
    "__التاريخ__",
    "__الوقت__",
    "__الدالة__",
    "__إصدار_المعيار_باء__",
];

/// In macro bodies the name that binds the variadic argument tail.
pub const VA_ARGS_NAME: &str = "__وسائط_متغيرة__";

/// In `#تعريف` parameter lists the trailing marker that makes the macro
/// variadic.
pub const VARIADIC_MARKER: &str = "وسائط_إضافية";

pub fn is_predefined(name: &str) -> bool {
    PREDEFINED_MACROS.contains(&name)
}

/// What happened when a definition was added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineOutcome {
    Added,
    /// An equivalent definition already existed; silently kept.
    Identical,
    /// An incompatible user definition existed; it was replaced. The caller
    /// reports the warning.
    Replaced,
    /// An incompatible redefinition of a predefined macro; rejected. The
    /// caller reports the error.
    RejectedPredefined,
}

#[derive(Debug, Default)]
pub struct MacroTable {
    map: HashMap<String, Macro>,
}

impl MacroTable {
    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Adds a definition, applying the redefinition policy: equivalent
    /// definitions are a silent no-op, incompatible user redefinitions
    /// replace the old one, and incompatible redefinitions of predefined
    /// macros are rejected.
    pub fn define(&mut self, new: Macro) -> DefineOutcome {
        if let Some(existing) = self.map.get(&new.name) {
            if macros_equivalent(existing, &new) {
                return DefineOutcome::Identical;
            }
            if is_predefined(&new.name) {
                return DefineOutcome::RejectedPredefined;
            }
            debug!(name = %new.name, "macro redefined");
            self.map.insert(new.name.clone(), new);
            return DefineOutcome::Replaced;
        }
        // `__الملف__` and `__السطر__` never live in the table but may not
        // be user-defined either.
        if is_predefined(&new.name) {
            return DefineOutcome::RejectedPredefined;
        }
        self.map.insert(new.name.clone(), new);
        DefineOutcome::Added
    }

    /// Raw insertion for the per-run predefined entries; skips the
    /// redefinition policy.
    fn install(&mut self, entry: Macro) {
        self.map.insert(entry.name.clone(), entry);
    }

    /// Removes a macro; a no-op when absent.
    pub fn undefine(&mut self, name: &str) -> bool {
        self.map.remove(name).is_some()
    }
}

/// Collapses whitespace runs to single spaces and trims the ends, the form
/// macro bodies are compared in.
fn normalize_body(body: &str) -> String {
    let mut normalized = String::with_capacity(body.len());
    let mut in_whitespace = false;
    for c in body.trim().chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                normalized.push(' ');
                in_whitespace = true;
            }
        } else {
            normalized.push(c);
            in_whitespace = false;
        }
    }
    normalized
}

/// Signatures compare by arity and variadic flag only; parameter names do
/// not participate.
fn signatures_equivalent(a: &Macro, b: &Macro) -> bool {
    a.is_function_like == b.is_function_like
        && (!a.is_function_like
            || (a.params.len() == b.params.len() && a.is_variadic == b.is_variadic))
}

fn macros_equivalent(a: &Macro, b: &Macro) -> bool {
    signatures_equivalent(a, b) && normalize_body(&a.body) == normalize_body(&b.body)
}

/// Installs the table-backed predefined macros with their per-run values.
/// `__الملف__` and `__السطر__` are dynamic and substituted by the expander
/// instead.
pub fn install_predefined(table: &mut MacroTable) {
    let now = Local::now();
    // The C-standard "Mmm dd yyyy" shape, English month abbreviation.
    let date = now.format("%b %d %Y").to_string();
    let time = now.format("%H:%M:%S").to_string();

    table.install(Macro::object_like("__التاريخ__", format!("\"{date}\"")));
    table.install(Macro::object_like("__الوقت__", format!("\"{time}\"")));
    table.install(Macro::object_like("__إصدار_المعيار_باء__", "10150L"));
    table.install(Macro::object_like(
        "__الدالة__",
        "\"__BAA_FUNCTION_PLACEHOLDER__\"",
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_then_undefine_restores_state() {
        let mut table = MacroTable::default();
        assert_eq!(
            table.define(Macro::object_like("س", "100")),
            DefineOutcome::Added
        );
        assert!(table.contains("س"));
        assert!(table.undefine("س"));
        assert!(!table.contains("س"));
        assert!(!table.undefine("س"));
    }

    #[test]
    fn identical_redefinition_is_silent() {
        let mut table = MacroTable::default();
        table.define(Macro::object_like("أقصى", "10 + 20"));
        // Whitespace differences do not matter.
        assert_eq!(
            table.define(Macro::object_like("أقصى", "  10  +  20 ")),
            DefineOutcome::Identical
        );
    }

    #[test]
    fn incompatible_redefinition_replaces() {
        let mut table = MacroTable::default();
        table.define(Macro::object_like("أقصى", "10"));
        assert_eq!(
            table.define(Macro::object_like("أقصى", "20")),
            DefineOutcome::Replaced
        );
        assert_eq!(table.get("أقصى").unwrap().body, "20");
    }

    #[test]
    fn signatures_ignore_parameter_names() {
        let mut table = MacroTable::default();
        table.define(Macro {
            name: "مربع".into(),
            body: "((x) * (x))".into(),
            is_function_like: true,
            is_variadic: false,
            params: vec!["x".into()],
        });
        // Same arity, same body text: parameter names differ but that alone
        // does not make it incompatible. The body differs textually though,
        // so this is a replacement.
        let outcome = table.define(Macro {
            name: "مربع".into(),
            body: "((y) * (y))".into(),
            is_function_like: true,
            is_variadic: false,
            params: vec!["y".into()],
        });
        assert_eq!(outcome, DefineOutcome::Replaced);
    }

    #[test]
    fn arity_changes_are_incompatible() {
        let mut table = MacroTable::default();
        table.define(Macro {
            name: "دمج".into(),
            body: "a".into(),
            is_function_like: true,
            is_variadic: false,
            params: vec!["a".into()],
        });
        assert_eq!(
            table.define(Macro {
                name: "دمج".into(),
                body: "a".into(),
                is_function_like: true,
                is_variadic: false,
                params: vec!["a".into(), "b".into()],
            }),
            DefineOutcome::Replaced
        );
    }

    #[test]
    fn predefined_redefinition_is_rejected() {
        let mut table = MacroTable::default();
        install_predefined(&mut table);
        assert_eq!(
            table.define(Macro::object_like("__إصدار_المعيار_باء__", "0")),
            DefineOutcome::RejectedPredefined
        );
        assert_eq!(table.get("__إصدار_المعيار_باء__").unwrap().body, "10150L");
    }

    #[test]
    fn predefined_values() {
        let mut table = MacroTable::default();
        install_predefined(&mut table);
        assert_eq!(table.get("__إصدار_المعيار_باء__").unwrap().body, "10150L");
        assert_eq!(
            table.get("__الدالة__").unwrap().body,
            "\"__BAA_FUNCTION_PLACEHOLDER__\""
        );
        let date = &table.get("__التاريخ__").unwrap().body;
        assert!(date.starts_with('"') && date.ends_with('"'));
        // "Mmm dd yyyy" is 11 characters plus the quotes.
        assert_eq!(date.chars().count(), 13);
    }
}

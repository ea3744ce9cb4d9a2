// src/config/defaults.rs

//! Built-in defaults, presets, and the deep-default merge that layers them.
//!
//! Merge order is `built-in defaults < preset < user`. Lower layers only
//! fill keys that higher layers leave out; nested tables recurse, while
//! arrays and scalars are taken whole from the highest layer defining them.

use toml::{Table, Value};

use crate::types::Preset;

fn table<const N: usize>(entries: [(&str, Value); N]) -> Table {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn string(s: &str) -> Value {
    Value::String(s.to_string())
}

/// The base layer. Provides every top-level field of
/// [`crate::config::model::RawConfigFile`].
pub fn builtin_defaults() -> Table {
    table([
        ("preset", string(Preset::default().as_str())),
        ("minify", Value::Boolean(false)),
        ("modules", Value::Array(Vec::new())),
        (
            "server",
            Value::Table(table([
                ("module", string("commonjs")),
                (
                    "command",
                    string("tsc --module {module} --sourceMap --outDir {out_dir} {input}"),
                ),
                ("minify_flag", string("")),
            ])),
        ),
        (
            "client",
            Value::Table(table([
                ("module", string("commonjs")),
                (
                    "command",
                    string("esbuild {input} --bundle --sourcemap --format=cjs {minify} --outfile={output}"),
                ),
                ("minify_flag", string("--minify")),
            ])),
        ),
        (
            "styles",
            Value::Table(table([
                ("style", string("expanded")),
                ("sourcemap", Value::Boolean(true)),
                ("command", string("sass --style={style} {sourcemap} {input}")),
            ])),
        ),
    ])
}

/// The preset layer for a named preset.
pub fn preset_table(preset: Preset) -> Table {
    table([("minify", Value::Boolean(preset.minify()))])
}

/// Fill every key of `defaults` that `target` does not already define.
///
/// When both sides hold a table for the same key, recurse; otherwise the
/// value already in `target` wins untouched.
pub fn defaults_deep(target: &mut Table, defaults: &Table) {
    for (key, default_value) in defaults {
        match target.get_mut(key) {
            None => {
                target.insert(key.clone(), default_value.clone());
            }
            Some(Value::Table(existing)) => {
                if let Value::Table(default_table) = default_value {
                    defaults_deep(existing, default_table);
                }
            }
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_scalars_win_over_defaults() {
        let mut user = table([("minify", Value::Boolean(false))]);
        defaults_deep(&mut user, &preset_table(Preset::Production));
        assert_eq!(user.get("minify"), Some(&Value::Boolean(false)));
    }

    #[test]
    fn nested_tables_are_filled_not_replaced() {
        let mut user = table([(
            "styles",
            Value::Table(table([("style", string("compressed"))])),
        )]);
        defaults_deep(&mut user, &builtin_defaults());

        let styles = user["styles"].as_table().unwrap();
        assert_eq!(styles["style"].as_str(), Some("compressed"));
        assert_eq!(styles["sourcemap"].as_bool(), Some(true));
        assert!(styles.contains_key("command"));
    }

    #[test]
    fn arrays_are_not_merged() {
        let mut user = table([("modules", Value::Array(vec![string("x")]))]);
        defaults_deep(&mut user, &builtin_defaults());
        assert_eq!(user["modules"].as_array().map(Vec::len), Some(1));
    }
}

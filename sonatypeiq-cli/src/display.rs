//! Terminal rendering of plans, states and schemas

use std::collections::HashMap;

use colored::Colorize;

use sonatypeiq_core::effect::Effect;
use sonatypeiq_core::plan::{Plan, format_effect_brief};
use sonatypeiq_core::resource::{State, Value};
use sonatypeiq_core::schema::ResourceSchema;

pub const SENSITIVE: &str = "(sensitive)";

pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let strs: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Map(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort();
            let strs: Vec<_> = keys
                .into_iter()
                .map(|k| format!("{}: {}", k, format_value(&map[k])))
                .collect();
            format!("{{{}}}", strs.join(", "))
        }
        Value::ResourceRef(binding, attr) => format!("${{{}.{}}}", binding, attr),
    }
}

/// Render an attribute, hiding sensitive and write-only values
pub fn format_attribute(schema: Option<&ResourceSchema>, key: &str, value: &Value) -> String {
    let hidden = schema.is_some_and(|s| s.is_sensitive(key) || s.is_write_only(key));
    if hidden {
        SENSITIVE.to_string()
    } else {
        format_value(value)
    }
}

/// Attribute keys in display order: `name` first, then alphabetical
fn display_keys(attributes: &HashMap<String, Value>) -> Vec<&String> {
    let mut keys: Vec<_> = attributes.keys().filter(|k| !k.starts_with('_')).collect();
    keys.sort_by(|a, b| match (a.as_str(), b.as_str()) {
        ("name", _) => std::cmp::Ordering::Less,
        (_, "name") => std::cmp::Ordering::Greater,
        _ => a.cmp(b),
    });
    keys
}

/// Lines describing one effect, without color
pub fn effect_lines(effect: &Effect, schemas: &HashMap<String, ResourceSchema>) -> Vec<String> {
    let schema = schemas.get(&effect.resource_id().resource_type);
    let mut lines = vec![format_effect_brief(effect)];

    match effect {
        Effect::Read(resource) | Effect::Create(resource) => {
            for key in display_keys(&resource.attributes) {
                lines.push(format!(
                    "    {}: {}",
                    key,
                    format_attribute(schema, key, &resource.attributes[key])
                ));
            }
        }
        Effect::Update {
            from,
            to,
            changed_attributes,
            ..
        }
        | Effect::Replace {
            from,
            to,
            changed_attributes,
            ..
        } => {
            let replacing = matches!(effect, Effect::Replace { .. });
            for key in changed_attributes {
                let old = from
                    .attributes
                    .get(key)
                    .map(|v| format_attribute(schema, key, v))
                    .unwrap_or_else(|| "(none)".to_string());
                let new = to
                    .attributes
                    .get(key)
                    .map(|v| format_attribute(schema, key, v))
                    .unwrap_or_else(|| "(none)".to_string());
                let forces = replacing && schema.is_some_and(|s| s.forces_replacement(key));
                lines.push(format!(
                    "    {}: {} → {}{}",
                    key,
                    old,
                    new,
                    if forces { " (forces replacement)" } else { "" }
                ));
            }
        }
        Effect::Delete(state) => {
            if let Some(identifier) = &state.identifier {
                lines.push(format!("    identifier: \"{}\"", identifier));
            }
        }
    }

    lines
}

fn colored_symbol(effect: &Effect) -> colored::ColoredString {
    let symbol = effect.symbol().bold();
    match effect {
        Effect::Read(_) => symbol.cyan(),
        Effect::Create(_) => symbol.green(),
        Effect::Update { .. } => symbol.yellow(),
        Effect::Replace { .. } => symbol.magenta(),
        Effect::Delete(_) => symbol.red(),
    }
}

pub fn print_plan(plan: &Plan, schemas: &HashMap<String, ResourceSchema>) {
    if plan.is_empty() {
        println!("{}", "No changes. IQ Server configuration is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    for effect in plan.effects() {
        let mut lines = effect_lines(effect, schemas).into_iter();
        if lines.next().is_some() {
            println!(
                "  {} {}",
                colored_symbol(effect),
                effect.resource_id().to_string().cyan().bold()
            );
        }
        for line in lines {
            println!("  {}", line);
        }
        println!();
    }

    println!("{}", plan.summary().to_string().bold());
}

/// Print a stored state with sensitive values masked
pub fn print_state(state: &State, schema: Option<&ResourceSchema>) {
    println!("{}", state.id.to_string().cyan().bold());
    if let Some(identifier) = &state.identifier {
        println!("  {}: \"{}\"", "identifier".bold(), identifier);
    }
    for key in display_keys(&state.attributes) {
        println!(
            "  {}: {}",
            key,
            format_attribute(schema, key, &state.attributes[key])
        );
    }
}

/// One line per attribute with its type and flags
pub fn schema_lines(schema: &ResourceSchema) -> Vec<String> {
    let mut lines = Vec::new();
    for name in schema.attribute_names() {
        let attr = &schema.attributes[name];
        let mut flags = Vec::new();
        if attr.required {
            flags.push("required");
        } else if attr.computed && !attr.optional {
            flags.push("computed");
        } else {
            flags.push("optional");
            if attr.computed {
                flags.push("computed");
            }
        }
        if attr.sensitive {
            flags.push("sensitive");
        }
        if attr.write_only {
            flags.push("write-only");
        }
        if attr.requires_replace {
            flags.push("forces replacement");
        }

        let mut line = format!("  {} ({}) [{}]", name, attr.attr_type, flags.join(", "));
        if let Some(default) = &attr.default {
            line.push_str(&format!(" default {}", format_value(default)));
        }
        if let Some(description) = &attr.description {
            line.push_str(&format!(" - {}", description));
        }
        lines.push(line);
    }
    for group in &schema.exactly_one_of {
        lines.push(format!("  exactly one of: {}", group.join(", ")));
    }
    lines
}

pub fn print_schema(kind: &str, schema: &ResourceSchema) {
    println!("{} {}", kind.dimmed(), schema.resource_type.cyan().bold());
    if let Some(description) = &schema.description {
        println!("  {}", description);
    }
    for line in schema_lines(schema) {
        println!("{}", line);
    }
}

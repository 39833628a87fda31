//! Indented structural dump of the object graph (`print(level)`), for debugging and `--dump`.

use crate::category::{Category, CategoryId};
use crate::compiler::Compiler;
use crate::object::{Docs, Lineage};
use crate::parameter::{ParamId, ParamKind, Parameter, ParameterListEntry};
use crate::paramset::{EnumeratorList, ParamSetId, ParameterSet};

fn pad(level: usize) -> String {
    "  ".repeat(level)
}

fn docs_lines(docs: &Docs, level: usize, lines: &mut Vec<String>) {
    for raw in docs.raw.iter().filter(|r| !r.trim().is_empty()) {
        lines.push(format!("{}doc: {}", pad(level), raw.trim()));
    }
    for e in &docs.dox {
        lines.push(format!("{}dox: {}", pad(level), e.text));
    }
}

fn lineage_suffix<Id: Copy + PartialEq>(lineage: &Lineage<Id>, name_of: impl Fn(Id) -> String) -> String {
    let mut s = String::new();
    if let Some(p) = lineage.parent() {
        s.push_str(&format!(" : {}", name_of(p)));
    }
    if !lineage.children().is_empty() {
        let names: Vec<String> = lineage.children().iter().map(|&c| name_of(c)).collect();
        s.push_str(&format!(" <{}>", names.join(", ")));
    }
    s
}

/// One bag field: `[direction] [optional] [multiple] set::name [as field]`.
pub fn entry_to_dump(c: &Compiler, e: &ParameterListEntry) -> String {
    let mut s = String::new();
    if e.direction != crate::parameter::Direction::None {
        s.push_str(&format!("{} ", e.direction));
    }
    if e.optional {
        s.push_str("optional ");
    }
    if e.multiple {
        s.push_str("multiple ");
    }
    let set = c
        .parameter_sets
        .get(e.paramset.index())
        .map_or("?", |ps| ps.name.as_str());
    s.push_str(&format!("{}::{}", set, e.name));
    if let Some(f) = &e.field_name {
        s.push_str(&format!(" as {}", f));
    }
    s
}

fn kind_details(p: &Parameter) -> String {
    let mut parts = Vec::new();
    match &p.kind {
        ParamKind::Int(i) => {
            if let Some(v) = i.min {
                parts.push(format!("min={}", v));
            }
            if let Some(v) = i.max {
                parts.push(format!("max={}", v));
            }
            if let Some(v) = i.default {
                parts.push(format!("default={}", v));
            }
        }
        ParamKind::Bool(b) => {
            if let Some(v) = b.default {
                parts.push(format!("default={}", v));
            }
        }
        ParamKind::Enum(e) => {
            if let Some(v) = &e.values {
                parts.push(format!("values={}", v));
            }
            if let Some(v) = &e.default {
                parts.push(format!("default={}", v));
            }
        }
        ParamKind::String(s) => {
            if let Some(v) = s.max_len {
                parts.push(format!("max={}", v));
            }
            if let Some(v) = &s.default {
                parts.push(format!("default=\"{}\"", v));
            }
        }
        ParamKind::Array(a) => {
            if let Some(v) = a.max_len {
                parts.push(format!("max={}", v));
            }
        }
        ParamKind::Tuple(_) | ParamKind::Bag(_) | ParamKind::Addr => {}
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" [{}]", parts.join(" "))
    }
}

pub fn parameter_to_dump(c: &Compiler, id: ParamId, level: usize) -> String {
    let p = &c.parameters[id];
    let mut lines = Vec::new();
    let id_str = c
        .param_id(id)
        .map(|n| format!(" #0x{:08x}", n))
        .unwrap_or_default();
    lines.push(format!(
        "{}{}{} {}{}{}{}",
        pad(level),
        if p.is_virtual { "virtual " } else { "" },
        p.type_name,
        p.name,
        lineage_suffix(&p.lineage, |o| c.parameters[o].name.clone()),
        kind_details(p),
        id_str
    ));
    docs_lines(&p.docs, level + 1, &mut lines);
    for e in p.parameter_list().unwrap_or(&[]) {
        lines.push(format!("{}- {}", pad(level + 1), entry_to_dump(c, e)));
    }
    lines.join("\n")
}

fn enum_list_to_dump(l: &EnumeratorList, level: usize) -> String {
    let values: Vec<String> = l
        .resolved_values()
        .iter()
        .map(|(n, v)| format!("{}={}", n, v))
        .collect();
    format!("{}enumerator_list {} {{ {} }}", pad(level), l.name, values.join(", "))
}

pub fn paramset_to_dump(c: &Compiler, id: ParamSetId, level: usize) -> String {
    let set: &ParameterSet = c.paramset(id);
    let mut lines = vec![format!(
        "{}parameter_set {} (short_name {}, prefix \"{}\", id {})",
        pad(level),
        set.name,
        c.short_name(id),
        set.prefix(),
        set.id()
    )];
    docs_lines(&set.docs, level + 1, &mut lines);
    for l in &set.enumerator_lists {
        lines.push(enum_list_to_dump(l, level + 1));
    }
    for r in &set.number_ranges {
        lines.push(format!("{}number_range {} = {}..{}", pad(level + 1), r.name, r.first, r.last));
    }
    for g in &set.groups {
        let tied = g.category.as_deref().map(|c| format!(" for {}", c)).unwrap_or_default();
        lines.push(format!("{}group {}{}", pad(level + 1), g.name, tied));
        docs_lines(&g.docs, level + 2, &mut lines);
        for &p in &g.parameters {
            lines.push(parameter_to_dump(c, p, level + 2));
        }
    }
    lines.join("\n")
}

pub fn category_to_dump(c: &Compiler, id: CategoryId, level: usize) -> String {
    let cat: &Category = c.category(id);
    let set_name = c
        .category_paramset(id)
        .map(|s| c.paramset(s).name.clone())
        .unwrap_or_else(|| "-".to_string());
    let mut lines = vec![format!(
        "{}category {}{} (parameter_set {})",
        pad(level),
        cat.name,
        lineage_suffix(&cat.lineage, |o| c.categories[o].name.clone()),
        set_name
    )];
    docs_lines(&cat.docs, level + 1, &mut lines);
    for kind in [
        crate::category::MessageKind::Command,
        crate::category::MessageKind::Response,
        crate::category::MessageKind::Event,
    ] {
        if let Some(spec) = cat.spec(kind) {
            lines.push(format!(
                "{}{}_bag {} ({})",
                pad(level + 1),
                kind.spec_name(),
                c.parameters[spec.bag].name,
                spec.enumerator_list
            ));
        }
    }
    let bag_name = |b: Option<ParamId>| b.map_or("-".to_string(), |b| c.parameters[b].name.clone());
    for cmd in &cat.commands {
        lines.push(format!(
            "{}command {} ({} / {})",
            pad(level + 1),
            cmd.name,
            bag_name(cmd.command_bag),
            bag_name(cmd.response_bag)
        ));
        docs_lines(&cmd.docs, level + 2, &mut lines);
    }
    for ev in &cat.events {
        lines.push(format!("{}event {} ({})", pad(level + 1), ev.name, bag_name(ev.event_bag)));
        docs_lines(&ev.docs, level + 2, &mut lines);
    }
    lines.join("\n")
}

impl Compiler {
    /// Whole-graph dump: options, parameter sets, then categories.
    pub fn dump(&self) -> String {
        let mut out = vec![format!("compiler (mode {})", self.mode)];
        for (scope, key, value) in self.options.iter() {
            out.push(format!("  option {} {} = {}", scope, key, value));
        }
        for id in self.paramset_ids() {
            out.push(paramset_to_dump(self, id, 1));
        }
        for (id, _) in self.categories.iter() {
            out.push(category_to_dump(self, id, 1));
        }
        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Position;

    #[test]
    fn dump_shows_lineage_and_fields() {
        let mut c = Compiler::new();
        let set = c.add_parameter_set("P", Position::default()).unwrap();
        let g = c.parameter_sets[0].group("default", None, &Position::default());
        c.create_parameter(set, "uint8", "x", g, Position::default()).unwrap();
        let base = c.create_parameter(set, "bag", "base", g, Position::default()).unwrap();
        let b = c.create_parameter(set, "bag", "b", g, Position::default()).unwrap();
        c.add_parent_parameter(b, base).unwrap();
        c.add_bag_entry(b, ParameterListEntry::new(set, "x", Position::default()))
            .unwrap();
        let text = c.dump();
        assert!(text.contains("parameter_set P"));
        assert!(text.contains("bag base <b>"));
        assert!(text.contains("bag b : base"));
        assert!(text.contains("- P::x"));
    }
}

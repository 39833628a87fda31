//! `doxygen` mode: one `.dox` page per parameter set, documenting the generated symbols
//! with the derived Doxygen entries.

use super::{describe, doc_lines, fields, param_paramid};
use crate::compiler::Compiler;
use crate::error::CompileResult;
use crate::escape;
use crate::names;
use crate::object::DocEntry;
use crate::parameter::ParamId;
use crate::paramset::ParamSetId;
use std::io::Write;

fn comment_lines(entries: &[DocEntry], out: &mut dyn Write) -> CompileResult<()> {
    for line in doc_lines(entries) {
        for l in line.lines() {
            writeln!(out, " * {}", l)?;
        }
    }
    Ok(())
}

fn write_fields(c: &Compiler, title: &str, bag: Option<ParamId>, out: &mut dyn Write) -> CompileResult<()> {
    let Some(bag) = bag else { return Ok(()) };
    let fs = fields(c, bag);
    if fs.is_empty() {
        return Ok(());
    }
    writeln!(out, " * @par {}", title)?;
    for f in fs {
        let mut card = String::new();
        if f.entry.optional {
            card.push_str(" optional");
        }
        if f.entry.multiple {
            card.push_str(" multiple");
        }
        writeln!(
            out,
            " * - @c {} ({}{}) @ref {}",
            f.entry.field(),
            escape::dox(&describe(c, f.param)),
            card,
            super::entry_paramid(c, f.entry)
        )?;
    }
    Ok(())
}

pub fn write(c: &Compiler, set: ParamSetId, out: &mut dyn Write) -> CompileResult<()> {
    let ps = c.paramset(set);
    let sn = names::lower(c.short_name(set));
    writeln!(out, "/**")?;
    writeln!(out, " * @defgroup {} Parameter set {}", sn, ps.name)?;
    comment_lines(&ps.docs.dox, out)?;
    writeln!(out, " *")?;
    writeln!(out, " * Prefix \"{}\", parameter set id {}.", escape::dox(ps.prefix()), ps.id())?;
    writeln!(out, " */")?;
    writeln!(out)?;

    for list in &ps.enumerator_lists {
        writeln!(out, "/**")?;
        writeln!(out, " * @enum {}", names::enum_type(&sn, &list.name))?;
        writeln!(out, " * @ingroup {}", sn)?;
        comment_lines(&list.docs.dox, out)?;
        for (v, (name, n)) in list.values.iter().zip(list.resolved_values()) {
            let text = v.docs.dox.first().map(|e| e.text.as_str()).unwrap_or("");
            writeln!(out, " * - @c {} = {} {}", name, n, text)?;
        }
        writeln!(out, " */")?;
        writeln!(out)?;
    }

    for g in &ps.groups {
        let group_id = format!("{}_{}", sn, g.name);
        writeln!(out, "/**")?;
        writeln!(out, " * @defgroup {} {}", group_id, g.name)?;
        writeln!(out, " * @ingroup {}", sn)?;
        comment_lines(&g.docs.dox, out)?;
        writeln!(out, " */")?;
        writeln!(out)?;
        for &id in &g.parameters {
            let p = &c.parameters[id];
            writeln!(out, "/**")?;
            writeln!(out, " * @var {}", param_paramid(c, id))?;
            writeln!(out, " * @ingroup {}", group_id)?;
            writeln!(
                out,
                " * @brief {}{} ({})",
                if p.is_virtual { "virtual " } else { "" },
                p.name,
                escape::dox(&describe(c, p))
            )?;
            comment_lines(&p.docs.dox, out)?;
            if let Some(parent) = p.lineage.parent() {
                writeln!(out, " * Inherits from @ref {}.", param_paramid(c, parent))?;
            }
            if p.is_bag() {
                write_fields(c, "Fields", Some(id), out)?;
            }
            writeln!(out, " */")?;
            writeln!(out)?;
        }
    }

    for cat in c.categories_of_set(set) {
        let category = c.category(cat);
        let page = format!("{}_{}", sn, category.name);
        writeln!(out, "/**")?;
        writeln!(out, " * @page {} Category {}", page, category.name)?;
        comment_lines(&category.docs.dox, out)?;
        if let Some(parent) = category.lineage.parent() {
            writeln!(out, " * Extends @ref {}_{}.", sn, c.category(parent).name)?;
        }
        for cmd in &category.commands {
            writeln!(out, " *")?;
            writeln!(out, " * @section {}_{} Command {}", page, cmd.name, cmd.name)?;
            comment_lines(&cmd.docs.dox, out)?;
            write_fields(c, "Parameters", cmd.command_bag, out)?;
            if !cmd.response_docs.dox.is_empty() {
                writeln!(out, " * @par Response")?;
                comment_lines(&cmd.response_docs.dox, out)?;
            }
            write_fields(c, "Response parameters", cmd.response_bag, out)?;
        }
        for ev in &category.events {
            writeln!(out, " *")?;
            writeln!(out, " * @section {}_{} Event {}", page, ev.name, ev.name)?;
            comment_lines(&ev.docs.dox, out)?;
            write_fields(c, "Parameters", ev.event_bag, out)?;
        }
        writeln!(out, " */")?;
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::NoLocalTags;
    use crate::error::Position;
    use crate::object::Docs;

    #[test]
    fn derived_entries_are_emitted() {
        let mut c = Compiler::new();
        let set = c.add_parameter_set("P", Position::default()).unwrap();
        let g = c.parameter_sets[0].group("default", None, &Position::default());
        let x = c.create_parameter(set, "uint8", "x", g, Position::default()).unwrap();
        c.parameters[x].docs = Docs::from_raw(vec!["Counts <things> #1".to_string()]);
        c.finish(&NoLocalTags).unwrap();
        let mut buf = Vec::new();
        write(&c, set, &mut buf).unwrap();
        let s = String::from_utf8(buf).unwrap();
        assert!(s.contains("@defgroup p Parameter set P"));
        assert!(s.contains("@var p_paramid_x"));
        assert!(s.contains(" * Counts \\<things> \\#1"));
    }
}

//! `latex` mode: a `.tex` fragment per parameter set, meant to be `\input` into a manual.

use super::{describe, doc_lines, fields};
use crate::compiler::Compiler;
use crate::error::CompileResult;
use crate::escape;
use crate::object::DocEntry;
use crate::parameter::{ParamId, ParamKind};
use crate::paramset::ParamSetId;
use std::io::Write;

fn paragraphs(entries: &[DocEntry], out: &mut dyn Write) -> CompileResult<()> {
    // @param entries render as \item and are listed with the fields instead
    for line in doc_lines(entries).into_iter().filter(|l| !l.starts_with("\\item")) {
        writeln!(out, "{}", line)?;
        writeln!(out)?;
    }
    Ok(())
}

fn field_table(c: &Compiler, bag: Option<ParamId>, docs: &[DocEntry], out: &mut dyn Write) -> CompileResult<()> {
    let Some(bag) = bag else { return Ok(()) };
    let fs = fields(c, bag);
    if fs.is_empty() {
        return Ok(());
    }
    writeln!(out, "\\begin{{description}}")?;
    for f in fs {
        let doc = docs
            .iter()
            .find(|e| e.label.as_deref() == Some("param") && e.arg.as_deref() == Some(f.entry.field()))
            .map(|e| {
                // drop the "\item[...]" head, keep the text
                e.text.split_once("] ").map_or("", |(_, t)| t).to_string()
            })
            .unwrap_or_default();
        let mut card = Vec::new();
        if f.entry.optional {
            card.push("optional");
        }
        if f.entry.multiple {
            card.push("multiple");
        }
        let card = if card.is_empty() { String::new() } else { format!(", {}", card.join(", ")) };
        writeln!(
            out,
            "\\item[\\texttt{{{}}}] ({}{}) {}",
            escape::latex(f.entry.field()),
            escape::latex(&describe(c, f.param)),
            card,
            doc
        )?;
    }
    writeln!(out, "\\end{{description}}")?;
    writeln!(out)?;
    Ok(())
}

pub fn write(c: &Compiler, set: ParamSetId, out: &mut dyn Write) -> CompileResult<()> {
    let ps = c.paramset(set);
    writeln!(out, "% Generated by mplcomp from parameter set {}. Do not edit.", ps.name)?;
    writeln!(out, "\\section{{Parameter set {}}}", escape::latex(&ps.name))?;
    writeln!(out, "\\label{{ps:{}}}", ps.name)?;
    writeln!(out)?;
    paragraphs(&ps.docs.latex, out)?;
    writeln!(
        out,
        "Prefix \\texttt{{{}}}, identifier {}.",
        escape::latex(ps.prefix()),
        ps.id()
    )?;
    writeln!(out)?;

    for g in &ps.groups {
        writeln!(out, "\\subsection{{{}}}", escape::latex(&g.name))?;
        paragraphs(&g.docs.latex, out)?;
        writeln!(out, "\\begin{{description}}")?;
        for &id in &g.parameters {
            let p = &c.parameters[id];
            let text: Vec<&str> = doc_lines(&p.docs.latex);
            writeln!(
                out,
                "\\item[\\texttt{{{}}}] {}({}) {}",
                escape::latex(&p.name),
                if p.is_virtual { "virtual " } else { "" },
                escape::latex(&describe(c, p)),
                text.join(" ")
            )?;
            if let ParamKind::Enum(e) = &p.kind {
                if let Some(list) = e.values.as_deref().and_then(|l| ps.find_enumerator_list(l)) {
                    let values: Vec<String> = list
                        .resolved_values()
                        .iter()
                        .map(|(n, v)| format!("\\texttt{{{}}}={}", escape::latex(n), v))
                        .collect();
                    writeln!(out, "Values: {}.", values.join(", "))?;
                }
            }
        }
        writeln!(out, "\\end{{description}}")?;
        writeln!(out)?;
    }

    for cat in c.categories_of_set(set) {
        let category = c.category(cat);
        writeln!(out, "\\section{{Category {}}}", escape::latex(&category.name))?;
        writeln!(out, "\\label{{cat:{}}}", category.name)?;
        writeln!(out)?;
        if let Some(parent) = category.lineage.parent() {
            writeln!(out, "Extends category \\ref{{cat:{}}}.", c.category(parent).name)?;
            writeln!(out)?;
        }
        paragraphs(&category.docs.latex, out)?;
        for cmd in &category.commands {
            writeln!(out, "\\subsection{{Command {}}}", escape::latex(&cmd.name))?;
            paragraphs(&cmd.docs.latex, out)?;
            writeln!(out, "\\paragraph{{Parameters}}")?;
            field_table(c, cmd.command_bag, &cmd.docs.latex, out)?;
            writeln!(out, "\\paragraph{{Response}}")?;
            paragraphs(&cmd.response_docs.latex, out)?;
            field_table(c, cmd.response_bag, &cmd.response_docs.latex, out)?;
        }
        for ev in &category.events {
            writeln!(out, "\\subsection{{Event {}}}", escape::latex(&ev.name))?;
            paragraphs(&ev.docs.latex, out)?;
            field_table(c, ev.event_bag, &ev.docs.latex, out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::NoLocalTags;
    use crate::error::Position;

    #[test]
    fn names_are_escaped() {
        let mut c = Compiler::new();
        let set = c.add_parameter_set("my_set", Position::default()).unwrap();
        let g = c.parameter_sets[0].group("default", None, &Position::default());
        c.create_parameter(set, "uint8", "max_len", g, Position::default()).unwrap();
        c.finish(&NoLocalTags).unwrap();
        let mut buf = Vec::new();
        write(&c, set, &mut buf).unwrap();
        let s = String::from_utf8(buf).unwrap();
        assert!(s.contains("\\section{Parameter set my\\_set}"));
        assert!(s.contains("\\item[\\texttt{max\\_len}] (uint8)"));
    }
}

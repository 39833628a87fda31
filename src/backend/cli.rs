//! `cli` mode: line completion and inline help for every category and command of a
//! parameter set.
//!
//! Completion functions share one signature and chain through the runtime's completion
//! stack: when the token being completed opens a bag-typed field (`field={`), the function
//! pushes that bag's completer with `mpl_cli_push_stack`, and a bag completer pops itself
//! on the closing `}`.

use super::{bags_of, doc_lines, fields, Field};
use crate::category::CategoryId;
use crate::compiler::Compiler;
use crate::error::CompileResult;
use crate::escape;
use crate::names;
use crate::parameter::{ParamId, ParamKind};
use crate::paramset::ParamSetId;
use std::io::Write;

const COMPLETE_ARGS: &str = "(const char *token_p, mpl_cli_completions_t *out_p, mpl_cli_stack_t *stack_p)";

pub fn write_header(c: &Compiler, set: ParamSetId, out: &mut dyn Write) -> CompileResult<()> {
    let ps = c.paramset(set);
    let sn = c.short_name(set);
    let (h, _) = names::cli_files(&ps.name);
    let guard = names::header_guard(h.trim_end_matches(".h"));
    writeln!(out, "/* Generated by mplcomp from parameter set {}. Do not edit. */", ps.name)?;
    writeln!(out, "#ifndef {}", guard)?;
    writeln!(out, "#define {}", guard)?;
    writeln!(out)?;
    writeln!(out, "#include \"mpl_cli.h\"")?;
    writeln!(out, "#include \"{}\"", names::mpl_files(&ps.name).0)?;
    writeln!(out)?;
    for bag in bags_of(c, set) {
        writeln!(out, "int {}{};", names::cli_complete_bag(sn, &c.parameters[bag].name), COMPLETE_ARGS)?;
    }
    for cat in c.categories_of_set(set) {
        let cname = &c.category(cat).name;
        writeln!(out)?;
        writeln!(out, "int {}{};", names::cli_complete_category(sn, cname), COMPLETE_ARGS)?;
        writeln!(out, "const char *{}(void);", names::cli_help_category(sn, cname))?;
        for cmd in &c.category(cat).commands {
            writeln!(out, "int {}{};", names::cli_complete_command(sn, cname, &cmd.name), COMPLETE_ARGS)?;
            writeln!(out, "const char *{}(void);", names::cli_help_command(sn, cname, &cmd.name))?;
        }
        writeln!(out, "extern const mpl_cli_command_t {}[];", names::cli_command_table(sn, cname))?;
    }
    writeln!(out)?;
    writeln!(out, "#endif /* {} */", guard)?;
    Ok(())
}

/// Completion body shared by bag and command completers: nested bags recurse, enum fields
/// offer their enumerators, every other field offers `name=`.
fn write_field_completion(c: &Compiler, fs: &[Field<'_>], out: &mut dyn Write) -> CompileResult<()> {
    for f in fs {
        let field = f.entry.field();
        let opener = format!("{}=", field);
        match &f.param.kind {
            ParamKind::Bag(_) => {
                let fsn = c.short_name(f.param.paramset);
                writeln!(out, "    if (strncmp(token_p, \"{}{{\", {}) == 0)", opener, opener.len() + 1)?;
                writeln!(
                    out,
                    "        return mpl_cli_push_stack(stack_p, {});",
                    names::cli_complete_bag(fsn, &f.param.name)
                )?;
            }
            ParamKind::Enum(e) => {
                let set = c.paramset(f.param.paramset);
                if let Some(list) = e.values.as_deref().and_then(|l| set.find_enumerator_list(l)) {
                    writeln!(out, "    if (strncmp(token_p, \"{}\", {}) == 0) {{", opener, opener.len())?;
                    for v in list.names() {
                        writeln!(out, "        mpl_cli_add_completion(out_p, \"{}{}\");", opener, escape::c_string(v))?;
                    }
                    writeln!(out, "        return 0;")?;
                    writeln!(out, "    }}")?;
                }
            }
            _ => {}
        }
    }
    for f in fs {
        writeln!(out, "    mpl_cli_add_completion(out_p, \"{}=\");", f.entry.field())?;
    }
    Ok(())
}

fn write_bag_completer(c: &Compiler, sn: &str, bag: ParamId, out: &mut dyn Write) -> CompileResult<()> {
    writeln!(out, "int {}{}", names::cli_complete_bag(sn, &c.parameters[bag].name), COMPLETE_ARGS)?;
    writeln!(out, "{{")?;
    writeln!(out, "    if (strcmp(token_p, \"}}\") == 0)")?;
    writeln!(out, "        return mpl_cli_pop_stack(stack_p);")?;
    write_field_completion(c, &fields(c, bag), out)?;
    writeln!(out, "    return 0;")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

/// Help text of a command: its own help entries, then one line per in/out field.
fn command_help(c: &Compiler, cat: CategoryId, idx: usize) -> String {
    let cmd = &c.category(cat).commands[idx];
    let mut lines: Vec<String> = vec![format!("{} {}", c.category(cat).name, cmd.name)];
    lines.extend(doc_lines(&cmd.docs.help).into_iter().map(|l| format!("  {}", l)));
    let mut side = |label: &str, bag: Option<ParamId>, help: &[crate::object::DocEntry]| {
        let Some(bag) = bag else { return };
        let fs = fields(c, bag);
        if fs.is_empty() {
            return;
        }
        lines.push(format!("  {}:", label));
        for f in fs {
            let card = match (f.entry.optional, f.entry.multiple) {
                (true, true) => " [0..n]",
                (true, false) => " [optional]",
                (false, true) => " [1..n]",
                (false, false) => "",
            };
            let documented = help
                .iter()
                .find(|e| e.label.as_deref() == Some("param") && e.arg.as_deref() == Some(f.entry.field()));
            let text = documented.map(|e| format!(" - {}", e.text)).unwrap_or_default();
            lines.push(format!(
                "    {}=<{}>{}{}",
                f.entry.field(),
                super::describe(c, f.param),
                card,
                text
            ));
        }
    };
    side("parameters", cmd.command_bag, &cmd.docs.help);
    side("returns", cmd.response_bag, &cmd.response_docs.help);
    lines.join("\n")
}

pub fn write_source(c: &Compiler, set: ParamSetId, out: &mut dyn Write) -> CompileResult<()> {
    let ps = c.paramset(set);
    let sn = c.short_name(set);
    writeln!(out, "/* Generated by mplcomp from parameter set {}. Do not edit. */", ps.name)?;
    writeln!(out, "#include <string.h>")?;
    writeln!(out, "#include \"{}\"", names::cli_files(&ps.name).0)?;
    writeln!(out)?;
    for bag in bags_of(c, set) {
        write_bag_completer(c, sn, bag, out)?;
    }
    for cat in c.categories_of_set(set) {
        let category = c.category(cat);
        let cname = &category.name;

        writeln!(out, "int {}{}", names::cli_complete_category(sn, cname), COMPLETE_ARGS)?;
        writeln!(out, "{{")?;
        writeln!(out, "    (void)token_p;")?;
        writeln!(out, "    (void)stack_p;")?;
        for cmd in &category.commands {
            writeln!(out, "    mpl_cli_add_completion(out_p, \"{}\");", cmd.name)?;
        }
        writeln!(out, "    return 0;")?;
        writeln!(out, "}}")?;
        writeln!(out)?;

        let mut summary = vec![format!("{} commands:", cname)];
        for (i, cmd) in category.commands.iter().enumerate() {
            let fs = cmd.command_bag.map(|b| fields(c, b)).unwrap_or_default();
            writeln!(out, "int {}{}", names::cli_complete_command(sn, cname, &cmd.name), COMPLETE_ARGS)?;
            writeln!(out, "{{")?;
            write_field_completion(c, &fs, out)?;
            writeln!(out, "    return 0;")?;
            writeln!(out, "}}")?;
            writeln!(out)?;

            writeln!(out, "const char *{}(void)", names::cli_help_command(sn, cname, &cmd.name))?;
            writeln!(out, "{{")?;
            writeln!(out, "    return \"{}\\n\";", escape::c_string(&command_help(c, cat, i)))?;
            writeln!(out, "}}")?;
            writeln!(out)?;

            let first = cmd.docs.help.iter().find(|e| e.label.is_none()).map(|e| e.text.as_str());
            summary.push(match first {
                Some(t) => format!("  {} - {}", cmd.name, t),
                None => format!("  {}", cmd.name),
            });
        }

        writeln!(out, "const char *{}(void)", names::cli_help_category(sn, cname))?;
        writeln!(out, "{{")?;
        writeln!(out, "    return \"{}\\n\";", escape::c_string(&summary.join("\n")))?;
        writeln!(out, "}}")?;
        writeln!(out)?;

        writeln!(out, "const mpl_cli_command_t {}[] = {{", names::cli_command_table(sn, cname))?;
        for cmd in &category.commands {
            writeln!(
                out,
                "    {{ \"{}\", {}, {} }},",
                cmd.name,
                names::cli_complete_command(sn, cname, &cmd.name),
                names::cli_help_command(sn, cname, &cmd.name)
            )?;
        }
        writeln!(out, "    {{ NULL, NULL, NULL }}")?;
        writeln!(out, "}};")?;
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
    use crate::parameter::{Direction, ParameterListEntry};

    #[test]
    fn nested_bags_chain_through_the_stack() {
        let mut c = Compiler::new();
        let set = c.add_parameter_set("P", Position::default()).unwrap();
        let g = c.parameter_sets[0].group("default", None, &Position::default());
        c.create_parameter(set, "uint8", "x", g, Position::default()).unwrap();
        let inner = c.create_parameter(set, "bag", "inner", g, Position::default()).unwrap();
        c.add_bag_entry(inner, ParameterListEntry::new(set, "x", Position::default()))
            .unwrap();
        let cat = c.add_category("Cat", None, Position::default()).unwrap();
        c.set_category_paramset(cat, set);
        c.add_command_bag(cat, None, Position::default()).unwrap();
        c.add_response_bag(cat, None, Position::default()).unwrap();
        let docs = Docs::from_raw(vec!["Configure things.".to_string()]);
        let i = c.add_command(cat, "Set", docs, Position::default()).unwrap();
        let mut e = ParameterListEntry::new(set, "inner", Position::default());
        e.direction = Direction::In;
        c.add_command_parameter_list_entry(cat, i, e).unwrap();
        c.finish(&NoLocalTags).unwrap();

        let mut buf = Vec::new();
        write_source(&c, set, &mut buf).unwrap();
        let s = String::from_utf8(buf).unwrap();
        assert!(s.contains("return mpl_cli_push_stack(stack_p, p_cli_complete_bag_inner);"));
        assert!(s.contains("int p_cli_complete_bag_inner(const char *token_p"));
        assert!(s.contains("return mpl_cli_pop_stack(stack_p);"));
        assert!(s.contains("Set - Configure things."));
        assert!(s.contains("{ \"Set\", p_cli_complete_Cat_Set, p_cli_help_Cat_Set },"));
    }
}

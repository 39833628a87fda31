//! `deja` mode: a DejaGnu expect script that drives the generated CLI. For every command it
//! checks the help text and issues one invocation with sample values for the mandatory
//! parameters.

use super::{fields, Field};
use crate::compiler::Compiler;
use crate::error::CompileResult;
use crate::escape;
use crate::parameter::ParamKind;
use crate::paramset::ParamSetId;
use std::io::Write;

/// A value the CLI will accept for `f`, or `None` when the field cannot be filled in on
/// one line.
fn sample_value(c: &Compiler, f: &Field<'_>) -> Option<String> {
    match &f.param.kind {
        ParamKind::Int(i) => {
            let v = i.default.unwrap_or(match (i.min, i.max) {
                (Some(min), _) if min > 0 => min,
                (_, Some(max)) if max < 0 => max,
                _ => 0,
            });
            Some(v.to_string())
        }
        ParamKind::Bool(b) => Some(b.default.unwrap_or(true).to_string()),
        ParamKind::Enum(e) => e.default.clone().or_else(|| {
            let set = c.paramset(f.param.paramset);
            let list = set.find_enumerator_list(e.values.as_deref()?)?;
            list.names().first().map(|n| n.to_string())
        }),
        ParamKind::String(s) => Some(s.default.clone().unwrap_or_else(|| "x".to_string())),
        ParamKind::Tuple(_) => Some("a:1".to_string()),
        ParamKind::Array(_) => Some("00".to_string()),
        ParamKind::Addr => Some("0x0".to_string()),
        ParamKind::Bag(_) => {
            let bag = c.resolve(f.entry)?;
            let inner: Option<Vec<String>> = fields(c, bag)
                .iter()
                .filter(|g| !g.entry.optional)
                .map(|g| sample_value(c, g).map(|v| format!("{}={}", g.entry.field(), v)))
                .collect();
            inner.map(|v| format!("{{{}}}", v.join(",")))
        }
    }
}

pub fn write(c: &Compiler, set: ParamSetId, out: &mut dyn Write) -> CompileResult<()> {
    let ps = c.paramset(set);
    writeln!(out, "# Generated by mplcomp from parameter set {}. Do not edit.", ps.name)?;
    writeln!(out, "#")?;
    writeln!(out, "# Expects the CLI under test to be spawned by the tool init file,")?;
    writeln!(out, "# with its prompt in $prompt.")?;
    writeln!(out)?;
    writeln!(out, "proc mpl_check {{ cmd pattern name }} {{")?;
    writeln!(out, "    global prompt")?;
    writeln!(out, "    send \"$cmd\\r\"")?;
    writeln!(out, "    expect {{")?;
    writeln!(out, "        -re $pattern {{ pass $name }}")?;
    writeln!(out, "        -re \"error\" {{ fail $name }}")?;
    writeln!(out, "        timeout {{ fail \"$name (timeout)\" }}")?;
    writeln!(out, "    }}")?;
    writeln!(out, "    expect -re $prompt")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    for cat in c.categories_of_set(set) {
        let category = c.category(cat);
        let cname = escape::tcl(&category.name);
        writeln!(out, "# ---- category {}", category.name)?;
        writeln!(out, "mpl_check \"help {}\" \"{} commands:\" \"help {}\"", cname, cname, cname)?;
        for cmd in &category.commands {
            let name = escape::tcl(&cmd.name);
            writeln!(
                out,
                "mpl_check \"help {} {}\" \"{} {}\" \"help {} {}\"",
                cname, name, cname, name, cname, name
            )?;
            let fs = cmd.command_bag.map(|b| fields(c, b)).unwrap_or_default();
            let args: Option<Vec<String>> = fs
                .iter()
                .filter(|f| !f.entry.optional)
                .map(|f| sample_value(c, f).map(|v| format!("{}={}", f.entry.field(), v)))
                .collect();
            match args {
                Some(args) => {
                    let mut line = format!("{} {}", category.name, cmd.name);
                    for a in &args {
                        line.push(' ');
                        line.push_str(a);
                    }
                    writeln!(
                        out,
                        "mpl_check \"{}\" \"{}\" \"{} {}\"",
                        escape::tcl(&line),
                        name,
                        cname,
                        name
                    )?;
                }
                None => writeln!(out, "unsupported \"{} {}: no sample arguments\"", cname, name)?,
            }
        }
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
    fn commands_get_sample_invocations() {
        let mut c = Compiler::new();
        let set = c.add_parameter_set("P", Position::default()).unwrap();
        let g = c.parameter_sets[0].group("default", None, &Position::default());
        let n = c.create_parameter(set, "sint16", "n", g, Position::default()).unwrap();
        if let ParamKind::Int(i) = &mut c.parameters[n].kind {
            i.min = Some(3);
        }
        let cat = c.add_category("Cat", None, Position::default()).unwrap();
        c.set_category_paramset(cat, set);
        c.add_command_bag(cat, None, Position::default()).unwrap();
        c.add_response_bag(cat, None, Position::default()).unwrap();
        let i = c.add_command(cat, "Set", Docs::default(), Position::default()).unwrap();
        let mut e = ParameterListEntry::new(set, "n", Position::default());
        e.direction = Direction::In;
        c.add_command_parameter_list_entry(cat, i, e).unwrap();
        c.finish(&NoLocalTags).unwrap();

        let mut buf = Vec::new();
        write(&c, set, &mut buf).unwrap();
        let s = String::from_utf8(buf).unwrap();
        assert!(s.contains("mpl_check \"help Cat\" \"Cat commands:\" \"help Cat\""));
        assert!(s.contains("mpl_check \"Cat Set n=3\" \"Set\" \"Cat Set\""));
    }
}

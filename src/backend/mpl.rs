//! `mpl` mode: C header and source per parameter set with the parameter-ID enum,
//! enumerator tables, bag field indices, the ADD/GET/EXISTS/PARAM_COUNT macro families
//! and the bag check functions.

use super::{bags_of, entry_paramid, fields, param_paramid, Field};
use crate::category::{CategoryId, MessageKind};
use crate::compiler::Compiler;
use crate::error::CompileResult;
use crate::escape;
use crate::names;
use crate::object::flat_child_list;
use crate::parameter::{ParamId, ParamKind, Parameter};
use crate::paramset::{ParamSetId, VIRTUAL_PARAMID_FLAG};
use std::collections::HashMap;
use std::io::Write;

/// How a family macro passes values in and out of the runtime list.
enum Passing {
    /// Scalar copied through a temporary.
    Value(&'static str),
    /// Pointer passed through as is (strings, bags, addresses).
    Pointer(&'static str),
    /// Struct passed by address (tuples, arrays).
    Struct(&'static str),
}

fn passing(p: &Parameter) -> Passing {
    match &p.kind {
        ParamKind::Int(_) | ParamKind::Bool(_) | ParamKind::Enum(_) => Passing::Value(p.c_type()),
        ParamKind::String(_) | ParamKind::Bag(_) | ParamKind::Addr => Passing::Pointer(p.c_type()),
        ParamKind::Tuple(_) | ParamKind::Array(_) => Passing::Struct(p.c_type()),
    }
}

/// One representative parameter per type family, in first-use order.
fn families(c: &Compiler, set: ParamSetId) -> Vec<&Parameter> {
    let mut out: Vec<&Parameter> = Vec::new();
    for id in c.paramset(set).parameters() {
        let p = &c.parameters[id];
        if !out.iter().any(|o| o.type_name == p.type_name) {
            out.push(p);
        }
    }
    out
}

fn write_families(c: &Compiler, set: ParamSetId, out: &mut dyn Write) -> CompileResult<()> {
    let sn = c.short_name(set);
    let exists_tag = names::param_exists_tag(sn);
    writeln!(out, "/* Generic accessors */")?;
    writeln!(
        out,
        "#define {}(list_p, paramid, tag) (mpl_param_list_find_tag(paramid, tag, list_p) != NULL)",
        exists_tag
    )?;
    writeln!(out, "#define {}(list_p, paramid) {}(list_p, paramid, 0)", names::param_exists(sn), exists_tag)?;
    writeln!(
        out,
        "#define {}(list_p, paramid) mpl_param_list_param_count(list_p, paramid)",
        names::param_count(sn)
    )?;
    writeln!(out)?;
    writeln!(out, "/* Type families */")?;
    for p in families(c, set) {
        let family = p.family();
        let add = names::add_family(sn, &family);
        let add_tag = names::add_family_tag(sn, &family);
        let get = names::get_family(sn, &family);
        let get_tag = names::get_family_tag(sn, &family);
        match passing(p) {
            Passing::Value(ty) => {
                writeln!(
                    out,
                    "#define {}(list_pp, paramid, tag, value) \\\n    do {{ {} __v = ({}); mpl_add_param_to_list_tag(list_pp, paramid, tag, &__v); }} while (0)",
                    add_tag, ty, ty
                )?;
                writeln!(
                    out,
                    "#define {}(list_p, paramid, tag) (*({}*)mpl_param_list_find_value_tag(paramid, tag, list_p))",
                    get_tag, ty
                )?;
            }
            Passing::Pointer(ty) => {
                writeln!(
                    out,
                    "#define {}(list_pp, paramid, tag, value) mpl_add_param_to_list_tag(list_pp, paramid, tag, (value))",
                    add_tag
                )?;
                writeln!(
                    out,
                    "#define {}(list_p, paramid, tag) (({})mpl_param_list_find_value_tag(paramid, tag, list_p))",
                    get_tag, ty
                )?;
            }
            Passing::Struct(ty) => {
                writeln!(
                    out,
                    "#define {}(list_pp, paramid, tag, value_p) mpl_add_param_to_list_tag(list_pp, paramid, tag, (value_p))",
                    add_tag
                )?;
                writeln!(
                    out,
                    "#define {}(list_p, paramid, tag) (({}*)mpl_param_list_find_value_tag(paramid, tag, list_p))",
                    get_tag, ty
                )?;
            }
        }
        writeln!(out, "#define {}(list_pp, paramid, value) {}(list_pp, paramid, 0, value)", add, add_tag)?;
        writeln!(out, "#define {}(list_p, paramid) {}(list_p, paramid, 0)", get, get_tag)?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_enumerators(c: &Compiler, set: ParamSetId, out: &mut dyn Write) -> CompileResult<()> {
    let sn = c.short_name(set);
    let ps = c.paramset(set);
    if ps.enumerator_lists.is_empty() {
        return Ok(());
    }
    writeln!(out, "/* Enumerator lists */")?;
    for list in &ps.enumerator_lists {
        writeln!(out, "typedef enum {{")?;
        for (name, value) in list.resolved_values() {
            writeln!(out, "    {} = {},", names::enum_value(sn, &list.name, name), value)?;
        }
        writeln!(out, "}} {};", names::enum_type(sn, &list.name))?;
        writeln!(
            out,
            "extern const mpl_enumerator_t {}[];",
            names::enum_values_table(sn, &list.name)
        )?;
        writeln!(out)?;
    }
    for r in &ps.number_ranges {
        writeln!(out, "#define {} {}", names::number_range_macro(sn, &r.name, "FIRST"), r.first)?;
        writeln!(out, "#define {} {}", names::number_range_macro(sn, &r.name, "LAST"), r.last)?;
    }
    if !ps.number_ranges.is_empty() {
        writeln!(out)?;
    }
    Ok(())
}

fn write_paramids(c: &Compiler, set: ParamSetId, out: &mut dyn Write) -> CompileResult<()> {
    let sn = c.short_name(set);
    let ps = c.paramset(set);
    writeln!(out, "/* Parameter IDs */")?;
    writeln!(out, "typedef enum {{")?;
    for (n, id) in ps.param_ids() {
        writeln!(out, "    {} = 0x{:08x},", param_paramid(c, *id), n)?;
    }
    writeln!(out, "}} {};", names::paramid_type(sn))?;
    writeln!(out, "#define {} {}", names::paramid_count(sn), ps.param_ids().len())?;
    writeln!(out, "#define {}_IS_VIRTUAL(paramid) (((paramid) & 0x{:08x}) != 0)", names::upper(sn), VIRTUAL_PARAMID_FLAG)?;
    writeln!(out)?;
    Ok(())
}

fn field_macros(c: &Compiler, sn: &str, bag: &str, f: &Field<'_>, out: &mut dyn Write) -> CompileResult<()> {
    let fsn = c.short_name(f.entry.paramset);
    let family = f.param.family();
    let id = entry_paramid(c, f.entry);
    let field = f.entry.field();
    writeln!(
        out,
        "#define {}(list_pp, value) {}(list_pp, {}, {}, value)",
        names::field_add(sn, bag, field),
        names::add_family_tag(fsn, &family),
        id,
        f.tag
    )?;
    writeln!(
        out,
        "#define {}(list_p) {}(list_p, {}, {})",
        names::field_get(sn, bag, field),
        names::get_family_tag(fsn, &family),
        id,
        f.tag
    )?;
    writeln!(
        out,
        "#define {}(list_p) {}(list_p, {}, {})",
        names::field_exists(sn, bag, field),
        names::param_exists_tag(fsn),
        id,
        f.tag
    )?;
    writeln!(
        out,
        "#define {}(list_p) {}(list_p, {})",
        names::field_param_count(sn, bag, field),
        names::param_count(fsn),
        id
    )?;
    Ok(())
}

fn write_bags(c: &Compiler, set: ParamSetId, out: &mut dyn Write) -> CompileResult<()> {
    let sn = c.short_name(set);
    let suffix = c.paramset(set).bag_field_table_suffix();
    for bag in bags_of(c, set) {
        let name = &c.parameters[bag].name;
        let fs = fields(c, bag);
        writeln!(out, "/* Bag {} */", name)?;
        writeln!(out, "enum {{")?;
        for f in &fs {
            writeln!(out, "    {},", names::bag_field(sn, name, f.entry.field()))?;
        }
        writeln!(out, "    {}", names::bag_field_count(sn, name))?;
        writeln!(out, "}};")?;
        writeln!(
            out,
            "extern const mpl_bag_field_t {}[];",
            names::bag_field_table(sn, name, suffix)
        )?;
        writeln!(out, "int {}(const mpl_list_t *bag_p);", names::bag_check_fn(sn, name))?;
        for f in &fs {
            field_macros(c, sn, name, f, out)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Concrete descendants of a message family bag: the per-message bags a decoder can see.
fn concrete_family(c: &Compiler, family: ParamId) -> Vec<ParamId> {
    flat_child_list(&c.parameters, family)
        .into_iter()
        .filter(|&id| !c.parameters[id].is_virtual)
        .collect()
}

fn kind_test_macro(sn: &str, cat: &str, kind: MessageKind) -> String {
    match kind {
        MessageKind::Command => names::is_command(sn, cat),
        MessageKind::Response => names::is_response(sn, cat),
        MessageKind::Event => names::is_event(sn, cat),
    }
}

/// Per-message bag and name of every message of `kind` declared in `cat`.
pub(crate) fn messages(c: &Compiler, cat: CategoryId, kind: MessageKind) -> Vec<(ParamId, &str)> {
    let category = c.category(cat);
    match kind {
        MessageKind::Command => category
            .commands
            .iter()
            .filter_map(|m| m.command_bag.map(|b| (b, m.name.as_str())))
            .collect(),
        MessageKind::Response => category
            .commands
            .iter()
            .filter_map(|m| m.response_bag.map(|b| (b, m.name.as_str())))
            .collect(),
        MessageKind::Event => category
            .events
            .iter()
            .filter_map(|m| m.event_bag.map(|b| (b, m.name.as_str())))
            .collect(),
    }
}

/// Case label and enumerator of every message bag in the concrete family under `family`,
/// in family order. A message answers with the enumerator of the spec it was registered in.
fn family_messages(c: &Compiler, family: ParamId, kind: MessageKind) -> Vec<(ParamId, String)> {
    let mut enumerators = HashMap::new();
    for cat in c.categories.ids() {
        let Some((_, spec)) = c.message_spec(cat, kind) else {
            continue;
        };
        let list_sn = c.short_name(c.parameters[spec.bag].paramset);
        for (bag, msg) in messages(c, cat, kind) {
            enumerators.insert(bag, names::enum_value(list_sn, &spec.enumerator_list, msg));
        }
    }
    concrete_family(c, family)
        .into_iter()
        .filter_map(|bag| enumerators.remove(&bag).map(|e| (bag, e)))
        .collect()
}

const KINDS: [MessageKind; 3] = [MessageKind::Command, MessageKind::Response, MessageKind::Event];

fn write_category_macros(c: &Compiler, set: ParamSetId, out: &mut dyn Write) -> CompileResult<()> {
    let sn = c.short_name(set);
    for cat in c.categories_of_set(set) {
        let name = &c.category(cat).name;
        writeln!(out, "/* Category {} */", name)?;
        for kind in KINDS {
            let Some((_, spec)) = c.message_spec(cat, kind) else {
                continue;
            };
            let ids: Vec<String> = concrete_family(c, spec.bag)
                .into_iter()
                .map(|id| format!("((paramid) == {})", param_paramid(c, id)))
                .collect();
            let test = if ids.is_empty() { "(0)".to_string() } else { format!("({})", ids.join(" || ")) };
            writeln!(out, "#define {}(paramid) {}", kind_test_macro(sn, name, kind), test)?;
            writeln!(
                out,
                "int {}(int paramid);",
                names::message_index_fn(sn, name, kind.spec_name())
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn write_header(c: &Compiler, set: ParamSetId, out: &mut dyn Write) -> CompileResult<()> {
    let ps = c.paramset(set);
    let sn = c.short_name(set);
    let guard = names::header_guard(&ps.name);
    writeln!(out, "/* Generated by mplcomp from parameter set {}. Do not edit. */", ps.name)?;
    writeln!(out, "#ifndef {}", guard)?;
    writeln!(out, "#define {}", guard)?;
    writeln!(out)?;
    writeln!(out, "#include \"mpl_param.h\"")?;
    writeln!(out, "#include \"mpl_list.h\"")?;
    writeln!(out)?;
    writeln!(out, "#define {} {}", names::paramset_id_macro(sn), ps.id())?;
    writeln!(
        out,
        "#define {} \"{}\"",
        names::paramset_prefix_macro(sn),
        escape::c_string(ps.prefix())
    )?;
    writeln!(out)?;
    write_enumerators(c, set, out)?;
    write_paramids(c, set, out)?;
    writeln!(
        out,
        "extern const mpl_param_descr_t {}[];",
        names::param_descr_table(sn)
    )?;
    writeln!(out)?;
    write_families(c, set, out)?;
    write_bags(c, set, out)?;
    write_category_macros(c, set, out)?;
    writeln!(out, "#endif /* {} */", guard)?;
    Ok(())
}

fn parent_paramid(c: &Compiler, id: ParamId) -> String {
    c.parameters[id]
        .lineage
        .parent()
        .map_or_else(|| "0".to_string(), |p| param_paramid(c, p))
}

fn write_descr_table(c: &Compiler, set: ParamSetId, out: &mut dyn Write) -> CompileResult<()> {
    let sn = c.short_name(set);
    writeln!(out, "const mpl_param_descr_t {}[] = {{", names::param_descr_table(sn))?;
    for (_, id) in c.paramset(set).param_ids() {
        let p = &c.parameters[*id];
        let (min, max, max_len) = match &p.kind {
            ParamKind::Int(i) => (i.min, i.max, None),
            ParamKind::String(s) => (None, None, s.max_len),
            ParamKind::Array(a) => (None, None, a.max_len),
            _ => (None, None, None),
        };
        let opt = |v: Option<i64>| v.map_or_else(|| "MPL_NO_LIMIT".to_string(), |n| n.to_string());
        writeln!(
            out,
            "    {{ {}, \"{}\", \"{}\", {}, {}, {}, {}, {} }},",
            param_paramid(c, *id),
            escape::c_string(&p.name),
            p.type_name,
            parent_paramid(c, *id),
            u8::from(p.is_virtual),
            opt(min),
            opt(max),
            opt(max_len)
        )?;
    }
    writeln!(out, "    {{ 0, NULL, NULL, 0, 0, 0, 0, 0 }}")?;
    writeln!(out, "}};")?;
    writeln!(out)?;
    Ok(())
}

fn write_enum_tables(c: &Compiler, set: ParamSetId, out: &mut dyn Write) -> CompileResult<()> {
    let sn = c.short_name(set);
    for list in &c.paramset(set).enumerator_lists {
        writeln!(out, "const mpl_enumerator_t {}[] = {{", names::enum_values_table(sn, &list.name))?;
        for (name, _) in list.resolved_values() {
            writeln!(
                out,
                "    {{ \"{}\", {} }},",
                escape::c_string(name),
                names::enum_value(sn, &list.name, name)
            )?;
        }
        writeln!(out, "    {{ NULL, 0 }}")?;
        writeln!(out, "}};")?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_bag_checks(c: &Compiler, set: ParamSetId, out: &mut dyn Write) -> CompileResult<()> {
    let sn = c.short_name(set);
    let suffix = c.paramset(set).bag_field_table_suffix();
    for bag in bags_of(c, set) {
        let name = &c.parameters[bag].name;
        let fs = fields(c, bag);
        writeln!(out, "const mpl_bag_field_t {}[] = {{", names::bag_field_table(sn, name, suffix))?;
        for f in &fs {
            writeln!(
                out,
                "    {{ {}, {}, {}, {}, {} }},",
                names::bag_field(sn, name, f.entry.field()),
                entry_paramid(c, f.entry),
                f.tag,
                u8::from(f.entry.optional),
                u8::from(f.entry.multiple)
            )?;
        }
        writeln!(out, "    {{ {}, 0, 0, 0, 0 }}", names::bag_field_count(sn, name))?;
        writeln!(out, "}};")?;
        writeln!(out)?;
        writeln!(out, "int {}(const mpl_list_t *bag_p)", names::bag_check_fn(sn, name))?;
        writeln!(out, "{{")?;
        for f in &fs {
            if !f.entry.optional {
                writeln!(
                    out,
                    "    if (!{}(bag_p))\n        return -1;",
                    names::field_exists(sn, name, f.entry.field())
                )?;
            }
            let repeated = fs.iter().filter(|o| o.entry.name == f.entry.name && o.entry.paramset == f.entry.paramset).count();
            if !f.entry.multiple && repeated == 1 {
                writeln!(
                    out,
                    "    if ({}(bag_p) > 1)\n        return -1;",
                    names::field_param_count(sn, name, f.entry.field())
                )?;
            }
        }
        writeln!(out, "    return 0;")?;
        writeln!(out, "}}")?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_index_functions(c: &Compiler, set: ParamSetId, out: &mut dyn Write) -> CompileResult<()> {
    let sn = c.short_name(set);
    for cat in c.categories_of_set(set) {
        let name = &c.category(cat).name;
        for kind in KINDS {
            let Some((_, spec)) = c.message_spec(cat, kind) else {
                continue;
            };
            writeln!(out, "int {}(int paramid)", names::message_index_fn(sn, name, kind.spec_name()))?;
            writeln!(out, "{{")?;
            writeln!(out, "    switch (paramid) {{")?;
            for (bag, enumerator) in family_messages(c, spec.bag, kind) {
                writeln!(out, "    case {}: return {};", param_paramid(c, bag), enumerator)?;
            }
            writeln!(out, "    default: return -1;")?;
            writeln!(out, "    }}")?;
            writeln!(out, "}}")?;
            writeln!(out)?;
        }
    }
    Ok(())
}

pub fn write_source(c: &Compiler, set: ParamSetId, out: &mut dyn Write) -> CompileResult<()> {
    let ps = c.paramset(set);
    writeln!(out, "/* Generated by mplcomp from parameter set {}. Do not edit. */", ps.name)?;
    writeln!(out, "#include \"{}\"", names::mpl_files(&ps.name).0)?;
    writeln!(out)?;
    write_enum_tables(c, set, out)?;
    write_descr_table(c, set, out)?;
    write_bag_checks(c, set, out)?;
    write_index_functions(c, set, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::NoLocalTags;
    use crate::error::Position;
    use crate::object::Docs;
    use crate::parameter::{Direction, ParameterListEntry};

    fn graph() -> Compiler {
        let mut c = Compiler::new();
        let set = c.add_parameter_set("P", Position::default()).unwrap();
        let g = c.parameter_sets[0].group("default", None, &Position::default());
        c.create_parameter(set, "uint8", "x", g, Position::default()).unwrap();
        c.create_parameter(set, "string", "y", g, Position::default()).unwrap();
        let cat = c.add_category("Cat", None, Position::default()).unwrap();
        c.set_category_paramset(cat, set);
        c.add_command_bag(cat, None, Position::default()).unwrap();
        c.add_response_bag(cat, None, Position::default()).unwrap();
        let i = c.add_command(cat, "Do", Docs::default(), Position::default()).unwrap();
        let mut e = ParameterListEntry::new(set, "x", Position::default());
        e.direction = Direction::In;
        c.add_command_parameter_list_entry(cat, i, e).unwrap();
        let mut e = ParameterListEntry::new(set, "y", Position::default());
        e.direction = Direction::Out;
        c.add_command_parameter_list_entry(cat, i, e).unwrap();
        c
    }

    fn compiled() -> Compiler {
        let mut c = graph();
        c.finish(&NoLocalTags).unwrap();
        c
    }

    #[test]
    fn header_has_ids_families_and_dispatch() {
        let c = compiled();
        let mut buf = Vec::new();
        write_header(&c, ParamSetId(0), &mut buf).unwrap();
        let h = String::from_utf8(buf).unwrap();
        assert!(h.contains("p_paramid_x = 0x00000001,"));
        assert!(h.contains(&format!("p_paramid_Cat_cmd = 0x{:08x},", 3 | VIRTUAL_PARAMID_FLAG)));
        assert!(h.contains("#define P_ADD_UINT8(list_pp, paramid, value) P_ADD_UINT8_TAG(list_pp, paramid, 0, value)"));
        assert!(h.contains("#define P_Cat_IS_COMMAND(paramid) (((paramid) == p_paramid_Cat_cmd_Do))"));
        assert!(h.contains("p_Cat_cmd_Do_field_x,"));
        assert!(h.contains("p_Cat_commands_Do = 0,"));
    }

    #[test]
    fn source_has_checks_and_index() {
        let c = compiled();
        let mut buf = Vec::new();
        write_source(&c, ParamSetId(0), &mut buf).unwrap();
        let s = String::from_utf8(buf).unwrap();
        assert!(s.contains("int p_check_bag_Cat_cmd_Do(const mpl_list_t *bag_p)"));
        assert!(s.contains("case p_paramid_Cat_resp_Do: return p_Cat_responses_Do;"));
    }

    #[test]
    fn index_covers_inheriting_categories() {
        let mut c = graph();
        let sub = c.add_category("Sub", Some("Cat"), Position::default()).unwrap();
        c.add_command(sub, "More", Docs::default(), Position::default()).unwrap();
        let own = c.add_category("Own", Some("Cat"), Position::default()).unwrap();
        c.add_command_bag(own, None, Position::default()).unwrap();
        c.add_response_bag(own, None, Position::default()).unwrap();
        c.add_command(own, "Mine", Docs::default(), Position::default()).unwrap();
        c.finish(&NoLocalTags).unwrap();

        let mut buf = Vec::new();
        write_header(&c, ParamSetId(0), &mut buf).unwrap();
        let h = String::from_utf8(buf).unwrap();
        let test = h.lines().find(|l| l.starts_with("#define P_Cat_IS_COMMAND(paramid)")).unwrap();
        assert!(test.contains("p_paramid_Cat_cmd_More"));

        let mut buf = Vec::new();
        write_source(&c, ParamSetId(0), &mut buf).unwrap();
        let s = String::from_utf8(buf).unwrap();
        let switch = |f: &str| {
            let body = s.split(&format!("int {}(int paramid)", f)).nth(1).unwrap();
            body[..body.find("default:").unwrap()].to_string()
        };
        for f in ["p_Cat_command_index", "p_Sub_command_index"] {
            let body = switch(f);
            assert!(body.contains("case p_paramid_Cat_cmd_Do: return p_Cat_commands_Do;"), "{}", f);
            assert!(body.contains("case p_paramid_Cat_cmd_More: return p_Cat_commands_More;"), "{}", f);
            assert!(body.contains("case p_paramid_Own_cmd_Mine: return p_Own_commands_Mine;"), "{}", f);
        }
        let own_body = switch("p_Own_command_index");
        assert!(own_body.contains("case p_paramid_Own_cmd_Mine: return p_Own_commands_Mine;"));
        assert!(!own_body.contains("Cat_cmd_Do"));
    }
}

//! `api` mode: C++ classes per top-level category.
//!
//! Namespaces mirror the parameter set and the category tree. Every message becomes a
//! class derived from the abstract `BAG`: `<cmd>_Command` encodes the command's in
//! parameters, `<cmd>_Response` and `<ev>_Event` decode out parameters. `receive()`
//! dispatches an incoming message in two stages: first on the family test macro
//! (`IS_RESPONSE`, `IS_EVENT`), then on the per-message parameter id. Child categories
//! nest their own namespace and `receive()`, tried after the parent's own messages.

use super::{entry_paramid, fields, param_paramid, Field};
use crate::backend::mpl::messages;
use crate::category::{CategoryId, MessageKind};
use crate::compiler::Compiler;
use crate::error::CompileResult;
use crate::names;
use crate::object::flat_child_list;
use crate::parameter::{ParamId, ParamKind, Parameter};
use crate::paramset::ParamSetId;
use crate::types::tuple_field_names;
use std::io::Write;

fn indent(level: usize) -> String {
    "    ".repeat(level)
}

/// The category and all its descendants, parents first.
fn tree(c: &Compiler, root: CategoryId) -> Vec<CategoryId> {
    let mut out = vec![root];
    out.extend(flat_child_list(&c.categories, root));
    out
}

/// Every per-message bag of the tree, with its class name and message kind.
fn message_classes(c: &Compiler, cat: CategoryId) -> Vec<(ParamId, String, MessageKind)> {
    let mut out = Vec::new();
    for (bag, name) in messages(c, cat, MessageKind::Command) {
        out.push((bag, names::api_command_class(name), MessageKind::Command));
    }
    for (bag, name) in messages(c, cat, MessageKind::Response) {
        out.push((bag, names::api_response_class(name), MessageKind::Response));
    }
    for (bag, name) in messages(c, cat, MessageKind::Event) {
        out.push((bag, names::api_event_class(name), MessageKind::Event));
    }
    out
}

/// Tuple and array parameters used by any message of the tree, first use first.
fn value_params(c: &Compiler, root: CategoryId) -> Vec<&Parameter> {
    let mut out: Vec<&Parameter> = Vec::new();
    for cat in tree(c, root) {
        for (bag, _, _) in message_classes(c, cat) {
            for f in fields(c, bag) {
                if (f.param.is_tuple() || f.param.is_array()) && !out.iter().any(|p| std::ptr::eq(*p, f.param)) {
                    out.push(f.param);
                }
            }
        }
    }
    out
}

/// Parameter sets referenced by the tree, for includes.
fn sets_of(c: &Compiler, root: CategoryId) -> Vec<ParamSetId> {
    let mut out = Vec::new();
    for cat in tree(c, root) {
        if let Some(s) = c.category_paramset(cat) {
            if !out.contains(&s) {
                out.push(s);
            }
        }
        for (bag, _, _) in message_classes(c, cat) {
            for f in fields(c, bag) {
                if !out.contains(&f.param.paramset) {
                    out.push(f.param.paramset);
                }
            }
        }
    }
    out
}

fn tuple_types(code: i32) -> (&'static str, &'static str) {
    match code {
        1 => ("std::string", "std::string"),
        -1 => ("int", "int"),
        2 => ("std::string", "int"),
        _ => ("std::string", "uint8_t"),
    }
}

/// C++ type of one field value.
fn cpp_type(p: &Parameter) -> String {
    match &p.kind {
        ParamKind::String(s) if s.wide => "std::wstring".to_string(),
        ParamKind::String(_) => "std::string".to_string(),
        ParamKind::Tuple(_) | ParamKind::Array(_) => names::api_value_class(&p.name),
        _ => p.c_type().to_string(),
    }
}

fn member_type(f: &Field<'_>) -> String {
    if f.entry.multiple {
        format!("std::vector<{}>", cpp_type(f.param))
    } else {
        cpp_type(f.param)
    }
}

fn write_value_classes(c: &Compiler, root: CategoryId, level: usize, out: &mut dyn Write) -> CompileResult<()> {
    let pad = indent(level);
    for p in value_params(c, root) {
        let class = names::api_value_class(&p.name);
        writeln!(out, "{}class {} {{", pad, class)?;
        writeln!(out, "{}public:", pad)?;
        match &p.kind {
            ParamKind::Tuple(t) => {
                let (k, v) = tuple_types(t.code);
                writeln!(out, "{}    {} key;", pad, k)?;
                writeln!(out, "{}    {} value;", pad, v)?;
            }
            ParamKind::Array(a) => {
                writeln!(out, "{}    std::vector<uint{}_t> data;", pad, a.width)?;
            }
            _ => {}
        }
        writeln!(out, "{}    void print(std::ostream &os) const;", pad)?;
        writeln!(out, "{}}};", pad)?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_class_decl(
    c: &Compiler,
    bag: ParamId,
    class: &str,
    kind: MessageKind,
    level: usize,
    out: &mut dyn Write,
) -> CompileResult<()> {
    let pad = indent(level);
    writeln!(out, "{}class {} : public {} {{", pad, class, names::API_BAG_CLASS)?;
    writeln!(out, "{}public:", pad)?;
    for f in fields(c, bag) {
        if f.entry.optional && !f.entry.multiple {
            writeln!(out, "{}    bool has_{};", pad, f.entry.field())?;
        }
        writeln!(out, "{}    {} {};", pad, member_type(&f), f.entry.field())?;
    }
    writeln!(out, "{}    {}();", pad, class)?;
    writeln!(out, "{}    mpl_list_t *encode() const;", pad)?;
    if kind != MessageKind::Command {
        writeln!(out, "{}    static {} *decode(const mpl_list_t *list_p);", pad, class)?;
    }
    writeln!(out, "{}    void print(std::ostream &os) const;", pad)?;
    writeln!(out, "{}}};", pad)?;
    writeln!(out)?;
    Ok(())
}

fn write_category_decl(c: &Compiler, cat: CategoryId, level: usize, out: &mut dyn Write) -> CompileResult<()> {
    let pad = indent(level);
    let category = c.category(cat);
    writeln!(out, "{}namespace {} {{", pad, category.name)?;
    writeln!(out)?;
    for (bag, class, kind) in message_classes(c, cat) {
        write_class_decl(c, bag, &class, kind, level + 1, out)?;
    }
    for &child in category.lineage.children() {
        write_category_decl(c, child, level + 1, out)?;
    }
    writeln!(out, "{}    {} *receive(const mpl_list_t *msg_p);", pad, names::API_BAG_CLASS)?;
    writeln!(out)?;
    writeln!(out, "{}}} // namespace {}", pad, category.name)?;
    writeln!(out)?;
    Ok(())
}

fn namespace_of(c: &Compiler, root: CategoryId) -> String {
    c.category_paramset(root)
        .map_or_else(|| "mpl".to_string(), |s| c.paramset(s).name.clone())
}

pub fn write_header(c: &Compiler, root: CategoryId, out: &mut dyn Write) -> CompileResult<()> {
    let name = &c.category(root).name;
    let (hh, _) = names::api_files(name);
    let guard = names::header_guard(hh.trim_end_matches(".hh"));
    writeln!(out, "// Generated by mplcomp from category {}. Do not edit.", name)?;
    writeln!(out, "#ifndef {}", guard)?;
    writeln!(out, "#define {}", guard)?;
    writeln!(out)?;
    writeln!(out, "#include <ostream>")?;
    writeln!(out, "#include <string>")?;
    writeln!(out, "#include <vector>")?;
    writeln!(out, "extern \"C\" {{")?;
    for s in sets_of(c, root) {
        writeln!(out, "#include \"{}\"", names::mpl_files(&c.paramset(s).name).0)?;
    }
    writeln!(out, "}}")?;
    writeln!(out)?;
    let ns = namespace_of(c, root);
    writeln!(out, "namespace {} {{", ns)?;
    writeln!(out)?;
    writeln!(out, "#ifndef MPL_API_BAG_DEFINED")?;
    writeln!(out, "#define MPL_API_BAG_DEFINED")?;
    writeln!(out, "class {} {{", names::API_BAG_CLASS)?;
    writeln!(out, "public:")?;
    writeln!(out, "    virtual ~{}() {{}}", names::API_BAG_CLASS)?;
    writeln!(out, "    virtual mpl_list_t *encode() const = 0;")?;
    writeln!(out, "    virtual void print(std::ostream &os) const = 0;")?;
    writeln!(out, "}};")?;
    writeln!(out, "#endif")?;
    writeln!(out)?;
    write_value_classes(c, root, 0, out)?;
    write_category_decl(c, root, 0, out)?;
    writeln!(out, "}} // namespace {}", ns)?;
    writeln!(out)?;
    writeln!(out, "#endif /* {} */", guard)?;
    Ok(())
}

/// Statements adding one value expression `v` of field `f` to `list_pp`.
fn encode_value(c: &Compiler, f: &Field<'_>, v: &str, pad: &str, out: &mut dyn Write) -> CompileResult<()> {
    let sn = c.short_name(f.param.paramset);
    let add = names::add_family_tag(sn, &f.param.family());
    let id = entry_paramid(c, f.entry);
    match &f.param.kind {
        ParamKind::String(s) => {
            let ch = if s.wide { "wchar_t" } else { "char" };
            writeln!(out, "{}{}(&list_p, {}, {}, const_cast<{} *>({}.c_str()));", pad, add, id, f.tag, ch, v)?;
        }
        ParamKind::Tuple(t) => {
            let (key, value) = tuple_field_names(t.code);
            let (kt, vt) = tuple_types(t.code);
            let conv = |ty: &str, expr: String| {
                if ty == "std::string" {
                    format!("const_cast<char *>({}.c_str())", expr)
                } else {
                    expr
                }
            };
            writeln!(out, "{}{{", pad)?;
            writeln!(out, "{}    {} t;", pad, f.param.c_type())?;
            writeln!(out, "{}    t.{} = {};", pad, key, conv(kt, format!("{}.key", v)))?;
            writeln!(out, "{}    t.{} = {};", pad, value, conv(vt, format!("{}.value", v)))?;
            writeln!(out, "{}    {}(&list_p, {}, {}, &t);", pad, add, id, f.tag)?;
            writeln!(out, "{}}}", pad)?;
        }
        ParamKind::Array(a) => {
            writeln!(out, "{}{{", pad)?;
            writeln!(out, "{}    {} a;", pad, f.param.c_type())?;
            writeln!(out, "{}    a.len = {}.data.size();", pad, v)?;
            writeln!(out, "{}    a.arr_p = const_cast<uint{}_t *>({}.data.data());", pad, a.width, v)?;
            writeln!(out, "{}    {}(&list_p, {}, {}, &a);", pad, add, id, f.tag)?;
            writeln!(out, "{}}}", pad)?;
        }
        _ => {
            writeln!(out, "{}{}(&list_p, {}, {}, {});", pad, add, id, f.tag, v)?;
        }
    }
    Ok(())
}

/// Expression converting the runtime value at `src` (a `GET_*_TAG` result) to the member type.
fn decode_value(f: &Field<'_>, src: &str, dest: &str, pad: &str, out: &mut dyn Write) -> CompileResult<()> {
    match &f.param.kind {
        ParamKind::Tuple(t) => {
            let (key, value) = tuple_field_names(t.code);
            writeln!(out, "{}{{", pad)?;
            writeln!(out, "{}    const {} *t_p = {};", pad, f.param.c_type(), src)?;
            writeln!(out, "{}    {}.key = t_p->{};", pad, dest, key)?;
            writeln!(out, "{}    {}.value = t_p->{};", pad, dest, value)?;
            writeln!(out, "{}}}", pad)?;
        }
        ParamKind::Array(_) => {
            writeln!(out, "{}{{", pad)?;
            writeln!(out, "{}    const {} *a_p = {};", pad, f.param.c_type(), src)?;
            writeln!(out, "{}    {}.data.assign(a_p->arr_p, a_p->arr_p + a_p->len);", pad, dest)?;
            writeln!(out, "{}}}", pad)?;
        }
        _ => {
            writeln!(out, "{}{} = {};", pad, dest, src)?;
        }
    }
    Ok(())
}

fn write_class_impl(
    c: &Compiler,
    bag: ParamId,
    scope: &str,
    class: &str,
    kind: MessageKind,
    out: &mut dyn Write,
) -> CompileResult<()> {
    let fs = fields(c, bag);
    let q = format!("{}::{}", scope, class);

    let init: Vec<String> = fs
        .iter()
        .filter(|f| f.entry.optional && !f.entry.multiple)
        .map(|f| format!("has_{}(false)", f.entry.field()))
        .collect();
    if init.is_empty() {
        writeln!(out, "{}::{}() {{}}", q, class)?;
    } else {
        writeln!(out, "{}::{}() : {} {{}}", q, class, init.join(", "))?;
    }
    writeln!(out)?;

    writeln!(out, "mpl_list_t *{}::encode() const", q)?;
    writeln!(out, "{{")?;
    writeln!(out, "    mpl_list_t *list_p = NULL;")?;
    for f in &fs {
        let field = f.entry.field();
        if f.entry.multiple {
            writeln!(out, "    for (size_t i = 0; i < {}.size(); i++)", field)?;
            encode_value(c, f, &format!("{}[i]", field), "        ", out)?;
        } else if f.entry.optional {
            writeln!(out, "    if (has_{})", field)?;
            encode_value(c, f, field, "        ", out)?;
        } else {
            encode_value(c, f, field, "    ", out)?;
        }
    }
    let bag_sn = c.short_name(c.parameters[bag].paramset);
    writeln!(out, "    mpl_list_t *msg_p = NULL;")?;
    writeln!(
        out,
        "    {}(&msg_p, {}, 0, list_p);",
        names::add_family_tag(bag_sn, &c.parameters[bag].family()),
        param_paramid(c, bag)
    )?;
    writeln!(out, "    return msg_p;")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    if kind != MessageKind::Command {
        writeln!(out, "{} *{}::decode(const mpl_list_t *list_p)", q, q)?;
        writeln!(out, "{{")?;
        writeln!(out, "    {} *m_p = new {}();", q, q)?;
        for f in &fs {
            let sn = c.short_name(f.param.paramset);
            let field = f.entry.field();
            let id = entry_paramid(c, f.entry);
            let get = names::get_family_tag(sn, &f.param.family());
            if f.entry.multiple {
                writeln!(
                    out,
                    "    for (int i = 0; i < {}(list_p, {}); i++) {{",
                    names::param_count(sn),
                    id
                )?;
                writeln!(out, "        {} v;", cpp_type(f.param))?;
                decode_value(f, &format!("{}(list_p, {}, i)", get, id), "v", "        ", out)?;
                writeln!(out, "        m_p->{}.push_back(v);", field)?;
                writeln!(out, "    }}")?;
            } else {
                let src = format!("{}(list_p, {}, {})", get, id, f.tag);
                writeln!(
                    out,
                    "    if ({}(list_p, {}, {})) {{",
                    names::param_exists_tag(sn),
                    id,
                    f.tag
                )?;
                if f.entry.optional {
                    writeln!(out, "        m_p->has_{} = true;", field)?;
                }
                decode_value(f, &src, &format!("m_p->{}", field), "        ", out)?;
                writeln!(out, "    }}")?;
            }
        }
        writeln!(out, "    return m_p;")?;
        writeln!(out, "}}")?;
        writeln!(out)?;
    }

    writeln!(out, "void {}::print(std::ostream &os) const", q)?;
    writeln!(out, "{{")?;
    writeln!(out, "    os << \"{}\";", class)?;
    for f in &fs {
        if f.param.is_basic() && !f.entry.multiple {
            writeln!(out, "    os << \" {}=\" << {};", f.entry.field(), f.entry.field())?;
        } else {
            writeln!(out, "    os << \" {}=...\";", f.entry.field())?;
        }
    }
    writeln!(out, "    os << std::endl;")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

fn write_receive(c: &Compiler, cat: CategoryId, scope: &str, out: &mut dyn Write) -> CompileResult<()> {
    let category = c.category(cat);
    let sn = c.category_paramset(cat).map_or("mpl", |s| c.short_name(s));
    writeln!(out, "{} *{}::receive(const mpl_list_t *msg_p)", names::API_BAG_CLASS, scope)?;
    writeln!(out, "{{")?;
    writeln!(out, "    const mpl_param_element_t *elem_p = mpl_list_first_param(msg_p);")?;
    writeln!(out, "    if (elem_p == NULL)")?;
    writeln!(out, "        return NULL;")?;
    writeln!(out, "    int paramid = elem_p->id;")?;
    writeln!(out, "    const mpl_list_t *body_p = (const mpl_list_t *)elem_p->value_p;")?;
    for (kind, test, make) in [
        (MessageKind::Response, names::is_response(sn, &category.name), names::api_response_class as fn(&str) -> String),
        (MessageKind::Event, names::is_event(sn, &category.name), names::api_event_class),
    ] {
        let msgs = messages(c, cat, kind);
        if msgs.is_empty() || c.message_spec(cat, kind).is_none() {
            continue;
        }
        writeln!(out, "    if ({}(paramid)) {{", test)?;
        writeln!(out, "        switch (paramid) {{")?;
        for (bag, name) in msgs {
            writeln!(
                out,
                "        case {}: return {}::decode(body_p);",
                param_paramid(c, bag),
                make(name)
            )?;
        }
        writeln!(out, "        default: break;")?;
        writeln!(out, "        }}")?;
        writeln!(out, "    }}")?;
    }
    for &child in category.lineage.children() {
        let child_name = &c.category(child).name;
        writeln!(out, "    if ({} *b_p = {}::receive(msg_p))", names::API_BAG_CLASS, child_name)?;
        writeln!(out, "        return b_p;")?;
    }
    writeln!(out, "    return NULL;")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

fn write_category_impl(c: &Compiler, cat: CategoryId, outer: &str, out: &mut dyn Write) -> CompileResult<()> {
    let scope = format!("{}::{}", outer, c.category(cat).name);
    for (bag, class, kind) in message_classes(c, cat) {
        write_class_impl(c, bag, &scope, &class, kind, out)?;
    }
    for &child in c.category(cat).lineage.children() {
        write_category_impl(c, child, &scope, out)?;
    }
    write_receive(c, cat, &scope, out)
}

pub fn write_source(c: &Compiler, root: CategoryId, out: &mut dyn Write) -> CompileResult<()> {
    let name = &c.category(root).name;
    let ns = namespace_of(c, root);
    writeln!(out, "// Generated by mplcomp from category {}. Do not edit.", name)?;
    writeln!(out, "#include \"{}\"", names::api_files(name).0)?;
    writeln!(out)?;
    for p in value_params(c, root) {
        let class = names::api_value_class(&p.name);
        writeln!(out, "void {}::{}::print(std::ostream &os) const", ns, class)?;
        writeln!(out, "{{")?;
        if p.is_tuple() {
            writeln!(out, "    os << key << \":\" << value;")?;
        } else {
            writeln!(out, "    os << data.size() << \" elements\";")?;
        }
        writeln!(out, "}}")?;
        writeln!(out)?;
    }
    write_category_impl(c, root, &ns, out)
}

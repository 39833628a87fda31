//! MPL front-end tests: syntax (parse success/failure) and semantics (resolve, references,
//! inheritance, validation passes).

use mplc::{parse_str, CompileError, Compiler, Direction, MessageKind, NoLocalTags, ParamKind};

fn parse(src: &str) -> Result<Compiler, CompileError> {
    let mut c = Compiler::new();
    parse_str(&mut c, src, "dsl.mpl")?;
    Ok(c)
}

fn finished(src: &str) -> Result<Compiler, CompileError> {
    let mut c = parse(src)?;
    c.finish(&NoLocalTags)?;
    Ok(c)
}

const BASE: &str = r#"
parameter_set P {
    prefix = "P";
    enumerator_list colors { red, green = 3 }
    group basic {
        uint8 x min = 0 max = 10 default = 1;
        sint32 y;
        enum8 c values = colors default = red;
        string s max = 20;
    }
}
"#;

// ==================== Syntax: valid programs ====================

#[test]
fn parse_empty_source() {
    let c = parse("").expect("empty source can parse");
    assert!(c.parameter_sets.is_empty());
    assert!(c.categories.is_empty());
}

#[test]
fn parse_every_parameter_type() {
    let src = r#"
parameter_set T {
    int i; uint8 u8; uint16 u16; uint32 u32; uint64 u64;
    sint8 s8; sint16 s16; sint32 s32; sint64 s64;
    bool b; bool8 b8;
    enum e { a } enum16 e16 { b } signed_enum32 se { c }
    string s; wstring ws;
    string_tuple st; int_tuple it; strint_tuple sit; struint8_tuple su8;
    uint8_array a8; uint16_array a16; uint32_array a32;
    bag bg;
    addr ad;
}
"#;
    let c = parse(src).expect("parse");
    assert_eq!(c.parameters.len(), 25);
    let a16 = c.find_parameter(c.find_parameter_set("T").unwrap(), "a16").unwrap();
    assert!(matches!(c.parameters[a16].kind, ParamKind::Array(ref a) if a.width == 16));
}

#[test]
fn parse_with_comments() {
    let src = r#"
// line comment
parameter_set P {
    /* block */ uint8 x; // trailing
    /**/
}
"#;
    let c = parse(src).expect("parse");
    assert_eq!(c.parameters.len(), 1);
}

#[test]
fn parse_option_short_name() {
    let c = parse("parameter_set LongName { uint8 x; }\noption LongName short_name = ln;").expect("parse");
    let set = c.find_parameter_set("LongName").unwrap();
    assert_eq!(c.short_name(set), "ln");
}

#[test]
fn parse_group_for_category() {
    let c = parse("parameter_set P { group g for Cat { uint8 x; } }").expect("parse");
    let ps = &c.parameter_sets[0];
    let g = ps.find_group("g").unwrap();
    assert_eq!(ps.groups[g].category.as_deref(), Some("Cat"));
}

#[test]
fn parse_number_ranges_synthesize_range_id() {
    let c = parse("parameter_set P { range_id = ranges; number_range low = 0..9; number_range high = 10..99; }")
        .expect("parse");
    let ps = &c.parameter_sets[0];
    let list = ps.find_enumerator_list("ranges").expect("range id list");
    assert_eq!(list.names(), vec!["anonymous", "low", "high"]);
    assert_eq!(ps.find_number_range("high").map(|r| (r.first, r.last)), Some((10, 99)));
}

#[test]
fn range_id_after_first_range_rejected() {
    let err = parse("parameter_set P { number_range a = 0..1; range_id = r; number_range b = 2..3; }").unwrap_err();
    assert!(matches!(err, CompileError::Invalid { ref message, .. } if message.contains("range_id")));
}

#[test]
fn parse_command_response_doc() {
    let src = format!(
        "{}\n{}",
        BASE,
        r#"
category Cat {
    parameter_set = P;
    command_bag;
    response_bag;
    /** Run it. */
    command Do(x) /** Result. */ => (y);
}
"#
    );
    let c = parse(&src).expect("parse");
    let cat = c.find_category("Cat").unwrap();
    let cmd = &c.category(cat).commands[0];
    assert_eq!(cmd.docs.raw, vec!["Run it."]);
    assert_eq!(cmd.response_docs.raw, vec!["Result."]);
}

// ==================== Syntax: invalid programs ====================

#[test]
fn parse_missing_semicolon() {
    assert!(matches!(parse("parameter_set P { uint8 x }"), Err(CompileError::Parse { .. })));
}

#[test]
fn parse_unknown_type() {
    let err = parse("parameter_set P { float f; }").unwrap_err();
    assert!(matches!(err, CompileError::UnknownType { ref type_name, .. } if type_name == "float"));
    assert_eq!(err.position().map(|p| p.line), Some(1));
}

#[test]
fn parse_invalid_property() {
    let err = parse("parameter_set P { string s min = 3; }").unwrap_err();
    assert!(matches!(err, CompileError::InvalidProperty { ref property, .. } if property == "min"));
}

#[test]
fn parse_duplicate_parameter_set() {
    let err = parse("parameter_set P { } parameter_set P { }").unwrap_err();
    assert!(matches!(err, CompileError::Duplicate { what: "parameter set", .. }));
}

#[test]
fn parse_undefined_parent_category() {
    let err = parse("category Child : Missing { }").unwrap_err();
    assert!(matches!(err, CompileError::UndefinedReference { what: "category", .. }));
}

#[test]
fn parse_undefined_parent_parameter() {
    let err = parse("parameter_set P { bag b : nothing; }").unwrap_err();
    assert!(matches!(err, CompileError::UndefinedReference { what: "parameter", .. }));
}

#[test]
fn parse_missing_include() {
    let err = parse("include \"does/not/exist.mpl\";").unwrap_err();
    assert!(matches!(err, CompileError::UndefinedReference { what: "include file", .. }));
}

#[test]
fn parse_members_on_scalar() {
    let err = parse("parameter_set P { uint8 x { a } }").unwrap_err();
    assert!(matches!(err, CompileError::Invalid { .. }));
}

// ==================== Semantics ====================

#[test]
fn event_entries_are_forced_out() {
    let src = format!(
        "{}\n{}",
        BASE,
        "category Cat { parameter_set = P; event_bag; event Happened(x, optional s); }"
    );
    let c = finished(&src).expect("finish");
    let cat = c.find_category("Cat").unwrap();
    let bag = c.category(cat).events[0].event_bag.unwrap();
    let list = c.parameters[bag].parameter_list().unwrap();
    assert!(list.iter().all(|e| e.direction == Direction::Out));
}

#[test]
fn event_in_direction_rejected() {
    let src = format!("{}\n{}", BASE, "category Cat { parameter_set = P; event_bag; event E(in x); }");
    assert!(matches!(parse(&src), Err(CompileError::Direction { .. })));
}

#[test]
fn lone_command_spec_rejected() {
    let src = format!("{}\n{}", BASE, "category Cat { parameter_set = P; command_bag; }");
    let mut c = parse(&src).expect("parse");
    assert!(matches!(c.finish(&NoLocalTags), Err(CompileError::MissingSpec { .. })));
}

#[test]
fn command_creates_missing_response_spec() {
    let src = format!("{}\n{}", BASE, "category Cat { parameter_set = P; command_bag; command Do(x) => (y); }");
    let c = finished(&src).expect("finish");
    let cat = c.find_category("Cat").unwrap();
    assert!(c.category(cat).command_spec.is_some());
    assert!(c.category(cat).response_spec.is_some());
    let names = c.message_enumerators(cat, MessageKind::Response).unwrap().names();
    assert_eq!(names, vec!["Do"]);
}

#[test]
fn spec_after_command_is_duplicate() {
    let src = format!(
        "{}\n{}",
        BASE,
        "category Cat { parameter_set = P; command A(); command_bag; response_bag; command B(); }"
    );
    assert!(matches!(parse(&src), Err(CompileError::Duplicate { .. })));

    let src = format!("{}\n{}", BASE, "category Cat { parameter_set = P; command A(); command B(); }");
    let c = finished(&src).expect("finish");
    let cat = c.find_category("Cat").unwrap();
    let names = c.message_enumerators(cat, MessageKind::Command).unwrap().names();
    assert_eq!(names, vec!["A", "B"]);
}

#[test]
fn child_category_inherits_specs_and_paramset() {
    let src = format!(
        "{}\n{}",
        BASE,
        r#"
category Base {
    parameter_set = P;
    command_bag;
    response_bag;
    command Get() => (x);
}
category Sub : Base {
    command Put(x, s);
}
"#
    );
    let c = finished(&src).expect("finish");
    let base = c.find_category("Base").unwrap();
    let sub = c.find_category("Sub").unwrap();
    assert_eq!(c.get_command_bag(sub), c.get_command_bag(base));
    assert_eq!(c.category_paramset(sub), c.category_paramset(base));
    let names = c.message_enumerators(sub, MessageKind::Command).unwrap().names();
    assert_eq!(names, vec!["Get", "Put"]);
}

#[test]
fn dangling_bag_entry_rejected_by_check() {
    let mut c = parse("parameter_set P { bag b { nope } }").expect("parse");
    let err = c.finish(&NoLocalTags).unwrap_err();
    assert!(matches!(err, CompileError::UndefinedReference { what: "parameter", ref name, .. } if name == "P::nope"));
}

#[test]
fn enum_default_must_be_enumerator() {
    // the inline list parses; the check pass rejects the default
    let mut c = parse("parameter_set P { enum e default = c { a, b } }").expect("parse");
    let err = c.finish(&NoLocalTags).unwrap_err();
    assert!(matches!(err, CompileError::Invalid { .. }));
}

#[test]
fn int_default_outside_range_rejected() {
    let mut c = parse("parameter_set P { uint8 x min = 1 max = 5 default = 9; }").expect("parse");
    assert!(matches!(c.finish(&NoLocalTags), Err(CompileError::Invalid { .. })));
}

#[test]
fn undocumented_param_tag_rejected() {
    let src = format!(
        "{}\n{}",
        BASE,
        r#"
category Cat {
    parameter_set = P;
    command_bag;
    response_bag;
    /** @param nothing not here */
    command Do(x) => (y);
}
"#
    );
    let mut c = parse(&src).expect("parse");
    assert!(matches!(
        c.finish(&NoLocalTags),
        Err(CompileError::UnknownDocParameter { ref name, .. }) if name == "nothing"
    ));
}

#[test]
fn unknown_doc_tag_needs_hook() {
    let src = "parameter_set P { /** @at +CGMI Manufacturer */ uint8 x; }";
    let mut c = parse(src).expect("parse");
    assert!(matches!(c.finish(&NoLocalTags), Err(CompileError::UnsupportedDocTag { .. })));

    let mut c = parse(src).expect("parse");
    c.finish(&mplc::AtCommandTags).expect("hook accepts @at");
    let x = c.find_parameter(c.find_parameter_set("P").unwrap(), "x").unwrap();
    assert!(c.parameters[x].docs.help.iter().any(|e| e.text == "AT command: +CGMI Manufacturer"));
}

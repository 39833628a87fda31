//! Graph-level properties that must hold for any well-formed MPL program: stable IDs,
//! inheritance of message specs, direction routing and idempotent passes.

use mplc::paramset::{check_paramlist_parameters, prefix_to_paramset_id, VIRTUAL_PARAMID_FLAG};
use mplc::{parse_str, Compiler, Direction, MessageKind, NoLocalTags, ParameterListEntry, Position};

const SOURCE: &str = r#"
parameter_set P {
    prefix = "PP";
    group values {
        uint8 x max = 10;
        sint32 y;
        string s;
    }
    virtual bag base;
    bag leaf : base { x, optional s }
}

category Base {
    parameter_set = P;
    command_bag;
    response_bag;
    event_bag;
    /** @param x the input */
    command Do(x, inout s) => (y);
    event Tick(y);
}

category Sub : Base {
    command More(y) => (x);
}

category Own : Base {
    command_bag;
    response_bag;
    command Mine() => (s);
}
"#;

fn finished(src: &str) -> Compiler {
    let mut c = Compiler::new();
    parse_str(&mut c, src, "props.mpl").expect("parse");
    c.finish(&NoLocalTags).expect("finish");
    c
}

#[test]
fn param_ids_are_deterministic() {
    let c = finished(SOURCE);
    let set = c.find_parameter_set("P").unwrap();
    let ps = c.paramset(set);
    let first = ps.assign_param_ids(&c.parameters);
    let second = ps.assign_param_ids(&c.parameters);
    assert_eq!(first, second);
    assert_eq!(first.as_slice(), ps.param_ids());

    for (n, id) in &first {
        let virtual_flag = n & VIRTUAL_PARAMID_FLAG != 0;
        assert_eq!(virtual_flag, c.parameters[*id].is_virtual, "{}", c.parameters[*id].name);
    }
    let plain: Vec<u32> = first.iter().map(|(n, _)| n & !VIRTUAL_PARAMID_FLAG).collect();
    assert_eq!(plain, (1..=first.len() as u32).collect::<Vec<_>>());
}

#[test]
fn paramset_id_from_prefix() {
    let expected = (u32::from(b'A') + 2 * u32::from(b'B')) % 32768;
    assert_eq!(prefix_to_paramset_id("AB"), expected);
    let c = finished(SOURCE);
    let set = c.find_parameter_set("P").unwrap();
    assert_eq!(c.paramset(set).id(), prefix_to_paramset_id("PP"));
}

#[test]
fn message_specs_are_inherited_until_redeclared() {
    let c = finished(SOURCE);
    let base = c.find_category("Base").unwrap();
    let sub = c.find_category("Sub").unwrap();
    let own = c.find_category("Own").unwrap();

    assert_eq!(c.get_command_bag(sub), c.get_command_bag(base));
    assert_eq!(c.get_event_bag(sub), c.get_event_bag(base));

    let own_bag = c.get_command_bag(own).unwrap();
    assert_ne!(Some(own_bag), c.get_command_bag(base));
    assert_eq!(c.parameters[own_bag].lineage.parent(), c.get_command_bag(base));
    // event spec was not redeclared
    assert_eq!(c.get_event_bag(own), c.get_event_bag(base));

    let own_cmds = c.message_enumerators(own, MessageKind::Command).unwrap().names();
    assert_eq!(own_cmds, vec!["Mine"]);
}

#[test]
fn enumerators_parallel_messages() {
    let c = finished(SOURCE);
    let base = c.find_category("Base").unwrap();
    let cmds = c.message_enumerators(base, MessageKind::Command).unwrap().names();
    let resps = c.message_enumerators(base, MessageKind::Response).unwrap().names();
    assert_eq!(cmds, vec!["Do", "More"]);
    assert_eq!(cmds, resps);
    let events = c.message_enumerators(base, MessageKind::Event).unwrap().names();
    assert_eq!(events, vec!["Tick"]);
}

#[test]
fn directions_route_entries() {
    let c = finished(SOURCE);
    let base = c.find_category("Base").unwrap();
    let cmd = &c.category(base).commands[0];
    let command = c.parameters[cmd.command_bag.unwrap()].parameter_list().unwrap();
    let response = c.parameters[cmd.response_bag.unwrap()].parameter_list().unwrap();

    let names = |l: &[ParameterListEntry]| l.iter().map(|e| e.name.clone()).collect::<Vec<_>>();
    assert_eq!(names(command), vec!["x", "s"]);
    assert_eq!(names(response), vec!["s", "y"]);

    // the inout entry lands in both bags as equal but independent copies
    assert!(command[1].is_same_as(&response[0]));
    assert_eq!(command[1].direction, Direction::InOut);
    assert_eq!(response[0].direction, Direction::InOut);
    assert_eq!(command[0].direction, Direction::In);
    assert_eq!(response[1].direction, Direction::Out);
}

#[test]
fn virtual_without_concrete_child_fails_check() {
    let mut c = Compiler::new();
    parse_str(&mut c, "parameter_set P { virtual bag a; virtual bag b : a; }", "v.mpl").unwrap();
    c.wrap_up_definition().unwrap();
    assert!(c.check_parameters().is_err());

    let mut c = Compiler::new();
    parse_str(&mut c, "parameter_set P { virtual bag a; virtual bag b : a; bag d : b; }", "v.mpl").unwrap();
    c.wrap_up_definition().unwrap();
    c.check_parameters().expect("concrete grandchild satisfies both");
}

#[test]
fn cloned_entries_are_independent() {
    let c = finished(SOURCE);
    let set = c.find_parameter_set("P").unwrap();
    let original = ParameterListEntry::new(set, "x", Position::new("props.mpl", 1));
    let mut copies = Vec::new();
    original.clone_into(&mut copies);
    assert!(copies[0].is_same_as(&original));
    copies[0].field_name = Some("renamed".to_string());
    assert!(!copies[0].is_same_as(&original));
    assert_eq!(original.field(), "x");
    assert_eq!(copies[0].field(), "renamed");
}

#[test]
fn doc_conversion_is_idempotent() {
    let mut c = finished(SOURCE);
    let before: Vec<_> = c.parameters.iter().map(|(_, p)| p.docs.clone()).collect();
    let base = c.find_category("Base").unwrap();
    let cmd_docs = c.category(base).commands[0].docs.clone();
    assert!(!cmd_docs.dox.is_empty());

    c.convert_doc(&NoLocalTags).unwrap();
    let after: Vec<_> = c.parameters.iter().map(|(_, p)| p.docs.clone()).collect();
    assert_eq!(before, after);
    assert_eq!(c.category(base).commands[0].docs, cmd_docs);
}

#[test]
fn minimal_command_resolves_every_entry() {
    let c = finished(
        r#"
parameter_set P { int x; int y; }
category Cat {
    parameter_set = P;
    command_bag;
    response_bag;
    command Do(x) => (y);
}
"#,
    );
    let cat = c.find_category("Cat").unwrap();
    let cmd = &c.category(cat).commands[0];
    let mut errors = Vec::new();
    for bag in [cmd.command_bag.unwrap(), cmd.response_bag.unwrap()] {
        let list = c.parameters[bag].parameter_list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(check_paramlist_parameters(list, &c.parameter_sets, &c.parameters, &mut errors), 0);
    }
    assert!(errors.is_empty());
}

#[test]
fn first_command_declares_its_specs() {
    let c = finished(
        r#"
parameter_set P { prefix = "P"; int x; int y; }
category Cat {
    parameter_set = P;
    command Do(x) => (y);
}
"#,
    );
    let cat = c.find_category("Cat").unwrap();
    let cmds = c.message_enumerators(cat, MessageKind::Command).unwrap().names();
    let resps = c.message_enumerators(cat, MessageKind::Response).unwrap().names();
    assert_eq!(cmds, vec!["Do"]);
    assert_eq!(resps, vec!["Do"]);
    assert!(c.get_event_bag(cat).is_none());

    let family = c.get_command_bag(cat).unwrap();
    assert!(c.parameters[family].is_virtual);
    assert_eq!(c.parameters[family].name, "Cat_cmd");

    let cmd = &c.category(cat).commands[0];
    let mut errors = Vec::new();
    for (bag, field) in [(cmd.command_bag.unwrap(), "x"), (cmd.response_bag.unwrap(), "y")] {
        let list = c.parameters[bag].parameter_list().unwrap();
        let names: Vec<_> = list.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec![field]);
        assert_eq!(check_paramlist_parameters(list, &c.parameter_sets, &c.parameters, &mut errors), 0);
    }
    assert!(errors.is_empty());
}

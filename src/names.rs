//! Every identifier the backends emit, derived by fixed concatenation from the parameter
//! set short name, category, message and field names. Generated C/C++ and hand-written
//! code on top of it both depend on these exact spellings.

/// Lower-case short name prefix of C identifiers.
pub fn lower(sn: &str) -> String {
    sn.to_lowercase()
}

/// Upper-case short name prefix of C macros.
pub fn upper(sn: &str) -> String {
    sn.to_uppercase()
}

// ---- parameter set

pub fn paramset_id_macro(sn: &str) -> String {
    format!("{}_PARAMSET_ID", upper(sn))
}

pub fn paramset_prefix_macro(sn: &str) -> String {
    format!("{}_PARAMSET_PREFIX", upper(sn))
}

pub fn paramid_type(sn: &str) -> String {
    format!("{}_paramid_t", lower(sn))
}

pub fn paramid(sn: &str, param: &str) -> String {
    format!("{}_paramid_{}", lower(sn), param)
}

pub fn paramid_count(sn: &str) -> String {
    format!("{}_PARAMID_COUNT", upper(sn))
}

pub fn param_descr_table(sn: &str) -> String {
    format!("{}_param_descr", lower(sn))
}

pub fn header_guard(file_stem: &str) -> String {
    let mut s: String = file_stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    s.push_str("_H");
    s
}

// ---- enumerators

pub fn enum_type(sn: &str, list: &str) -> String {
    format!("{}_{}_t", lower(sn), list)
}

pub fn enum_value(sn: &str, list: &str, value: &str) -> String {
    format!("{}_{}_{}", lower(sn), list, value)
}

pub fn enum_values_table(sn: &str, list: &str) -> String {
    format!("{}_{}_values", lower(sn), list)
}

pub fn number_range_macro(sn: &str, range: &str, end: &str) -> String {
    format!("{}_RANGE_{}_{}", upper(sn), range, end)
}

// ---- bags

pub fn bag_field(sn: &str, bag: &str, field: &str) -> String {
    format!("{}_{}_field_{}", lower(sn), bag, field)
}

pub fn bag_field_count(sn: &str, bag: &str) -> String {
    format!("{}_{}_field_count", lower(sn), bag)
}

pub fn bag_field_table(sn: &str, bag: &str, suffix: &str) -> String {
    format!("{}_{}{}", lower(sn), bag, suffix)
}

pub fn bag_check_fn(sn: &str, bag: &str) -> String {
    format!("{}_check_bag_{}", lower(sn), bag)
}

// ---- macro families

pub fn add_family(sn: &str, family: &str) -> String {
    format!("{}_ADD_{}", upper(sn), family)
}

pub fn add_family_tag(sn: &str, family: &str) -> String {
    format!("{}_ADD_{}_TAG", upper(sn), family)
}

pub fn get_family(sn: &str, family: &str) -> String {
    format!("{}_GET_{}", upper(sn), family)
}

pub fn get_family_tag(sn: &str, family: &str) -> String {
    format!("{}_GET_{}_TAG", upper(sn), family)
}

pub fn param_exists_tag(sn: &str) -> String {
    format!("{}_PARAM_EXISTS_TAG", upper(sn))
}

pub fn param_exists(sn: &str) -> String {
    format!("{}_PARAM_EXISTS", upper(sn))
}

pub fn param_count(sn: &str) -> String {
    format!("{}_PARAM_COUNT", upper(sn))
}

pub fn field_add(sn: &str, bag: &str, field: &str) -> String {
    format!("{}_ADD_{}_{}", upper(sn), bag, field)
}

pub fn field_get(sn: &str, bag: &str, field: &str) -> String {
    format!("{}_GET_{}_{}", upper(sn), bag, field)
}

pub fn field_exists(sn: &str, bag: &str, field: &str) -> String {
    format!("{}_{}_{}_EXISTS", upper(sn), bag, field)
}

pub fn field_param_count(sn: &str, bag: &str, field: &str) -> String {
    format!("{}_{}_{}_PARAM_COUNT", upper(sn), bag, field)
}

// ---- categories

pub fn is_command(sn: &str, cat: &str) -> String {
    format!("{}_{}_IS_COMMAND", upper(sn), cat)
}

pub fn is_response(sn: &str, cat: &str) -> String {
    format!("{}_{}_IS_RESPONSE", upper(sn), cat)
}

pub fn is_event(sn: &str, cat: &str) -> String {
    format!("{}_{}_IS_EVENT", upper(sn), cat)
}

/// Maps a message parameter id to its index in the category's enumerator list.
pub fn message_index_fn(sn: &str, cat: &str, kind: &str) -> String {
    format!("{}_{}_{}_index", lower(sn), cat, kind)
}

// ---- cli

pub fn cli_complete_category(sn: &str, cat: &str) -> String {
    format!("{}_cli_complete_{}", lower(sn), cat)
}

pub fn cli_complete_command(sn: &str, cat: &str, cmd: &str) -> String {
    format!("{}_cli_complete_{}_{}", lower(sn), cat, cmd)
}

pub fn cli_complete_bag(sn: &str, bag: &str) -> String {
    format!("{}_cli_complete_bag_{}", lower(sn), bag)
}

pub fn cli_help_command(sn: &str, cat: &str, cmd: &str) -> String {
    format!("{}_cli_help_{}_{}", lower(sn), cat, cmd)
}

pub fn cli_command_table(sn: &str, cat: &str) -> String {
    format!("{}_cli_{}_commands", lower(sn), cat)
}

pub fn cli_help_category(sn: &str, cat: &str) -> String {
    format!("{}_cli_help_{}", lower(sn), cat)
}

// ---- api

pub fn api_command_class(cmd: &str) -> String {
    format!("{}_Command", cmd)
}

pub fn api_response_class(cmd: &str) -> String {
    format!("{}_Response", cmd)
}

pub fn api_event_class(ev: &str) -> String {
    format!("{}_Event", ev)
}

/// Value class of a tuple or array parameter.
pub fn api_value_class(param: &str) -> String {
    format!("{}_Value", param)
}

pub const API_BAG_CLASS: &str = "BAG";

// ---- files

pub fn mpl_files(ps: &str) -> (String, String) {
    (format!("{}.h", ps), format!("{}.c", ps))
}

pub fn cli_files(ps: &str) -> (String, String) {
    (format!("{}_cli.h", ps), format!("{}_cli.c", ps))
}

pub fn api_files(cat: &str) -> (String, String) {
    (format!("{}_api.hh", cat), format!("{}_api.cc", cat))
}

pub fn dox_file(ps: &str) -> String {
    format!("{}.dox", ps)
}

pub fn latex_file(ps: &str) -> String {
    format!("{}.tex", ps)
}

pub fn deja_file(ps: &str) -> String {
    format!("{}.exp", ps)
}

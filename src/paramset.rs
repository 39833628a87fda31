//! Parameter sets: the named registries that own parameter groups, enumerator lists and
//! number ranges, and that assign numeric parameter IDs.

use crate::error::{CompileError, CompileResult, Position};
use crate::object::{flat_child_list, Docs};
use crate::parameter::{EnumSpec, ParamId, ParamKind, Parameter, ParameterListEntry, Parameters};
use std::collections::HashSet;

/// Index of a parameter set in the compiler's set list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParamSetId(pub(crate) usize);

impl ParamSetId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Set on the numeric ID of every virtual parameter.
pub const VIRTUAL_PARAMID_FLAG: u32 = 0x2000_0000;
/// Name of the range-identity enum when the set declares no `range_id`.
pub const DEFAULT_RANGE_ID: &str = "number_range_id";
/// Enumerator every range-identity enum starts with.
pub const ANONYMOUS_RANGE: &str = "anonymous";
pub const DEFAULT_GROUP: &str = "default";
pub const DEFAULT_BAG_FIELD_TABLE_SUFFIX: &str = "_field_table";
/// Highest tag distinguishing repeated occurrences of one parameter in a list.
pub const MAX_TAG: usize = 99;

/// Numeric parameter-set id derived from the wire prefix: sum of each byte times its
/// 1-based position, modulo 32768.
pub fn prefix_to_paramset_id(prefix: &str) -> u32 {
    let sum: u64 = prefix
        .bytes()
        .enumerate()
        .map(|(i, b)| u64::from(b) * (i as u64 + 1))
        .sum();
    (sum % 32768) as u32
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub value: Option<i64>,
    pub docs: Docs,
    pub pos: Position,
}

impl EnumValue {
    pub fn new(name: impl Into<String>, value: Option<i64>, pos: Position) -> Self {
        EnumValue {
            name: name.into(),
            value,
            docs: Docs::default(),
            pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumeratorList {
    pub name: String,
    pub values: Vec<EnumValue>,
    pub docs: Docs,
    pub pos: Position,
}

impl EnumeratorList {
    pub fn new(name: impl Into<String>, pos: Position) -> Self {
        EnumeratorList {
            name: name.into(),
            values: Vec::new(),
            docs: Docs::default(),
            pos,
        }
    }

    pub fn find(&self, name: &str) -> Option<&EnumValue> {
        self.values.iter().find(|v| v.name == name)
    }

    pub fn add_value(&mut self, value: EnumValue) -> CompileResult<()> {
        if self.find(&value.name).is_some() {
            return Err(CompileError::Duplicate {
                pos: value.pos,
                what: "enumerator",
                name: value.name,
            });
        }
        if value.value.is_none() && self.resolved_values().last().map(|&(_, n)| n) == Some(i64::MAX) {
            return Err(CompileError::Invalid {
                message: format!("enumerator '{}' in '{}' would exceed {}", value.name, self.name, i64::MAX),
                pos: value.pos,
            });
        }
        self.values.push(value);
        Ok(())
    }

    /// `(name, number)` pairs: an explicit value resets the counter, otherwise previous + 1
    /// starting at 0.
    pub fn resolved_values(&self) -> Vec<(&str, i64)> {
        let mut next = 0i64;
        self.values
            .iter()
            .map(|v| {
                let n = v.value.unwrap_or(next);
                next = n.saturating_add(1);
                (v.name.as_str(), n)
            })
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.values.iter().map(|v| v.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberRange {
    pub name: String,
    pub first: i64,
    pub last: i64,
    pub docs: Docs,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterGroup {
    pub name: String,
    /// Category the group is tied to, if any.
    pub category: Option<String>,
    pub parameters: Vec<ParamId>,
    pub docs: Docs,
    pub pos: Position,
}

#[derive(Debug, Clone)]
pub struct ParameterSet {
    pub name: String,
    pub prefix: Option<String>,
    pub numeric_id: Option<u32>,
    pub range_id: Option<String>,
    pub bag_field_table_suffix: Option<String>,
    pub groups: Vec<ParameterGroup>,
    pub enumerator_lists: Vec<EnumeratorList>,
    pub number_ranges: Vec<NumberRange>,
    range_param: Option<ParamId>,
    param_ids: Vec<(u32, ParamId)>,
    pub docs: Docs,
    pub pos: Position,
}

impl ParameterSet {
    pub fn new(name: impl Into<String>, pos: Position) -> Self {
        ParameterSet {
            name: name.into(),
            prefix: None,
            numeric_id: None,
            range_id: None,
            bag_field_table_suffix: None,
            groups: Vec::new(),
            enumerator_lists: Vec::new(),
            number_ranges: Vec::new(),
            range_param: None,
            param_ids: Vec::new(),
            docs: Docs::default(),
            pos,
        }
    }

    /// Wire prefix; the set name when none was declared.
    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(&self.name)
    }

    /// Numeric id: explicit, or derived from the prefix.
    pub fn id(&self) -> u32 {
        self.numeric_id
            .unwrap_or_else(|| prefix_to_paramset_id(self.prefix()))
    }

    pub fn bag_field_table_suffix(&self) -> &str {
        self.bag_field_table_suffix
            .as_deref()
            .unwrap_or(DEFAULT_BAG_FIELD_TABLE_SUFFIX)
    }

    pub fn find_group(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.name == name)
    }

    /// Index of the group named `name`, created on first use.
    pub fn group(&mut self, name: &str, category: Option<&str>, pos: &Position) -> usize {
        if let Some(i) = self.find_group(name) {
            if self.groups[i].category.is_none() {
                self.groups[i].category = category.map(str::to_string);
            }
            return i;
        }
        self.groups.push(ParameterGroup {
            name: name.to_string(),
            category: category.map(str::to_string),
            parameters: Vec::new(),
            docs: Docs::default(),
            pos: pos.clone(),
        });
        self.groups.len() - 1
    }

    /// All parameters in group declaration order.
    pub fn parameters(&self) -> impl Iterator<Item = ParamId> + '_ {
        self.groups.iter().flat_map(|g| g.parameters.iter().copied())
    }

    /// Linear scan over all groups in declaration order; first match wins.
    pub fn find_parameter(&self, params: &Parameters, name: &str) -> Option<ParamId> {
        self.parameters().find(|&id| params[id].name == name)
    }

    /// Single factory for parameters: classifies `type_name`, rejects unknown types and
    /// names already used anywhere in the set.
    pub fn create_parameter_in_group(
        &mut self,
        params: &mut Parameters,
        set_id: ParamSetId,
        type_name: &str,
        name: &str,
        group: usize,
        pos: Position,
    ) -> CompileResult<ParamId> {
        if self.find_parameter(params, name).is_some() {
            return Err(CompileError::Duplicate {
                pos,
                what: "parameter",
                name: name.to_string(),
            });
        }
        let p = Parameter::from_type(type_name, name, set_id, group, pos)?;
        let id = params.push(p);
        self.groups[group].parameters.push(id);
        log::trace!("{}: created {} {} (#{})", self.name, type_name, name, id.index());
        Ok(id)
    }

    pub fn find_enumerator_list(&self, name: &str) -> Option<&EnumeratorList> {
        self.enumerator_lists.iter().find(|l| l.name == name)
    }

    pub fn find_enumerator_list_mut(&mut self, name: &str) -> Option<&mut EnumeratorList> {
        self.enumerator_lists.iter_mut().find(|l| l.name == name)
    }

    pub fn add_enumerator_list(&mut self, list: EnumeratorList) -> CompileResult<()> {
        if self.find_enumerator_list(&list.name).is_some() {
            return Err(CompileError::Duplicate {
                pos: list.pos,
                what: "enumerator list",
                name: list.name,
            });
        }
        self.enumerator_lists.push(list);
        Ok(())
    }

    pub fn find_number_range(&self, name: &str) -> Option<&NumberRange> {
        self.number_ranges.iter().find(|r| r.name == name)
    }

    /// Enum parameter tagging number ranges, once any range exists.
    pub fn range_parameter(&self) -> Option<ParamId> {
        self.range_param
    }

    /// Name of the range-identity enum.
    pub fn range_id_name(&self) -> &str {
        self.range_id.as_deref().unwrap_or(DEFAULT_RANGE_ID)
    }

    /// Declare a number range. The first range creates the range-identity enum parameter
    /// and its enumerator list, which always starts with the anonymous value.
    pub fn add_number_range(
        &mut self,
        params: &mut Parameters,
        set_id: ParamSetId,
        name: &str,
        first: i64,
        last: i64,
        pos: Position,
    ) -> CompileResult<()> {
        if self.find_number_range(name).is_some() || name == ANONYMOUS_RANGE {
            return Err(CompileError::Duplicate {
                pos,
                what: "number range",
                name: name.to_string(),
            });
        }
        if first > last {
            return Err(CompileError::Invalid {
                pos,
                message: format!("number range '{}' is empty ({}..{})", name, first, last),
            });
        }
        let list_name = match self.range_param.map(|id| &params[id].kind) {
            Some(ParamKind::Enum(EnumSpec { values: Some(values), .. })) => values.clone(),
            _ => self.range_id_name().to_string(),
        };
        if self.range_param.is_none() {
            let group = self.group(DEFAULT_GROUP, None, &pos);
            let id = self.create_parameter_in_group(
                params,
                set_id,
                "enum",
                &list_name,
                group,
                Position::synthesized(),
            )?;
            if let ParamKind::Enum(e) = &mut params[id].kind {
                e.values = Some(list_name.clone());
            }
            let mut list = EnumeratorList::new(list_name.clone(), Position::synthesized());
            let mut anonymous = EnumValue::new(ANONYMOUS_RANGE, None, Position::synthesized());
            anonymous.docs = Docs::from_raw(vec![
                "Ranges not explicitly named fall here.".to_string(),
            ]);
            list.values.push(anonymous);
            self.add_enumerator_list(list)?;
            self.range_param = Some(id);
            log::debug!("{}: synthesized range id enum '{}'", self.name, list_name);
        }
        let list = self
            .find_enumerator_list_mut(&list_name)
            .ok_or_else(|| CompileError::UndefinedReference {
                pos: pos.clone(),
                what: "enumerator list",
                name: list_name.clone(),
            })?;
        list.add_value(EnumValue::new(name, None, pos.clone()))?;
        self.number_ranges.push(NumberRange {
            name: name.to_string(),
            first,
            last,
            docs: Docs::default(),
            pos,
        });
        Ok(())
    }

    /// Numeric IDs in group declaration order, starting at 1; virtual parameters carry
    /// [`VIRTUAL_PARAMID_FLAG`]. Pure: two calls on the same set give the same table.
    pub fn assign_param_ids(&self, params: &Parameters) -> Vec<(u32, ParamId)> {
        self.parameters()
            .enumerate()
            .map(|(i, id)| {
                let mut n = (i + 1) as u32;
                if params[id].is_virtual {
                    n |= VIRTUAL_PARAMID_FLAG;
                }
                (n, id)
            })
            .collect()
    }

    /// ID table assigned at wrap-up.
    pub fn param_ids(&self) -> &[(u32, ParamId)] {
        &self.param_ids
    }

    pub fn param_id(&self, id: ParamId) -> Option<u32> {
        self.param_ids
            .iter()
            .find(|(_, p)| *p == id)
            .map(|(n, _)| *n)
    }

    /// Derive the numeric id and bag-field-table suffix when not declared, wrap up the
    /// range-identity enum, and fix the parameter ID table.
    pub fn wrap_up_definition(&mut self, params: &mut Parameters) -> CompileResult<()> {
        if self.numeric_id.is_none() {
            self.numeric_id = Some(prefix_to_paramset_id(self.prefix()));
        }
        if self.bag_field_table_suffix.is_none() {
            self.bag_field_table_suffix = Some(DEFAULT_BAG_FIELD_TABLE_SUFFIX.to_string());
        }
        if let Some(id) = self.range_param {
            if let ParamKind::Enum(EnumSpec { default, .. }) = &mut params[id].kind {
                if default.is_none() {
                    *default = Some(ANONYMOUS_RANGE.to_string());
                }
            }
        }
        self.param_ids = self.assign_param_ids(params);
        log::debug!(
            "{}: prefix '{}' id {} with {} parameters",
            self.name,
            self.prefix(),
            self.id(),
            self.param_ids.len()
        );
        Ok(())
    }

    /// Validate every parameter of the set: bag references resolve (recursively through
    /// nested bags), virtual parameters have a concrete descendant, enum and int properties
    /// are consistent. Returns the first error.
    pub fn check_parameters(&self, sets: &[ParameterSet], params: &Parameters) -> CompileResult<()> {
        let mut errors = Vec::new();
        let mut visited = HashSet::new();
        for id in self.parameters() {
            let p = &params[id];
            if p.is_bag() {
                check_bag(id, sets, params, &mut visited, &mut errors);
            }
            if p.is_virtual
                && !flat_child_list(params, id)
                    .iter()
                    .any(|&c| !params[c].is_virtual)
            {
                errors.push(CompileError::VirtualWithoutConcrete {
                    pos: p.pos.clone(),
                    name: p.name.clone(),
                });
            }
            self.check_properties(p, &mut errors);
        }
        for e in &errors {
            log::debug!("{}: {}", self.name, e);
        }
        match errors.into_iter().next() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn check_properties(&self, p: &Parameter, errors: &mut Vec<CompileError>) {
        let invalid = |message: String| CompileError::Invalid {
            pos: p.pos.clone(),
            message,
        };
        match &p.kind {
            ParamKind::Enum(e) => match e.values.as_deref() {
                None => errors.push(invalid(format!("enum '{}' has no values", p.name))),
                Some(list_name) => match self.find_enumerator_list(list_name) {
                    None => errors.push(CompileError::UndefinedReference {
                        pos: p.pos.clone(),
                        what: "enumerator list",
                        name: list_name.to_string(),
                    }),
                    Some(list) => {
                        if let Some(d) = &e.default {
                            if list.find(d).is_none() {
                                errors.push(invalid(format!(
                                    "default '{}' of '{}' is not in '{}'",
                                    d, p.name, list_name
                                )));
                            }
                        }
                    }
                },
            },
            ParamKind::Int(i) => {
                if let (Some(min), Some(max)) = (i.min, i.max) {
                    if min > max {
                        errors.push(invalid(format!("min {} > max {} for '{}'", min, max, p.name)));
                    }
                }
                if let Some(d) = i.default {
                    let below = i.min.map_or(false, |m| d < m);
                    let above = i.max.map_or(false, |m| d > m);
                    if below || above {
                        errors.push(invalid(format!("default {} of '{}' out of range", d, p.name)));
                    }
                }
            }
            _ => {}
        }
    }
}

/// Resolve an entry to the parameter it names.
pub fn resolve_entry(
    sets: &[ParameterSet],
    params: &Parameters,
    entry: &ParameterListEntry,
) -> Option<ParamId> {
    sets.get(entry.paramset.0)?.find_parameter(params, &entry.name)
}

/// Tag of `list[index]`: how many earlier entries of the list name the same parameter.
pub fn entry_tag(list: &[ParameterListEntry], index: usize) -> usize {
    let e = &list[index];
    list[..index]
        .iter()
        .filter(|o| o.name == e.name && o.paramset == e.paramset)
        .count()
}

/// Check one parameter list: every entry resolves, and no parameter occurs more often
/// than tags allow. Pushes errors to `errors` and returns how many were found.
pub fn check_paramlist_parameters(
    list: &[ParameterListEntry],
    sets: &[ParameterSet],
    params: &Parameters,
    errors: &mut Vec<CompileError>,
) -> usize {
    let before = errors.len();
    for (i, e) in list.iter().enumerate() {
        if resolve_entry(sets, params, e).is_none() {
            let set_name = sets.get(e.paramset.0).map_or("?", |s| s.name.as_str());
            errors.push(CompileError::UndefinedReference {
                pos: e.pos.clone(),
                what: "parameter",
                name: format!("{}::{}", set_name, e.name),
            });
        }
        if entry_tag(list, i) > MAX_TAG {
            errors.push(CompileError::Invalid {
                pos: e.pos.clone(),
                message: format!("'{}' occurs more than {} times", e.name, MAX_TAG + 1),
            });
        }
    }
    errors.len() - before
}

fn check_bag(
    id: ParamId,
    sets: &[ParameterSet],
    params: &Parameters,
    visited: &mut HashSet<ParamId>,
    errors: &mut Vec<CompileError>,
) {
    if !visited.insert(id) {
        return;
    }
    let list = params[id].parameter_list().unwrap_or(&[]);
    check_paramlist_parameters(list, sets, params, errors);
    for e in list {
        if let Some(field) = resolve_entry(sets, params, e) {
            if params[field].is_bag() {
                check_bag(field, sets, params, visited, errors);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_with(params: &mut Parameters, decls: &[(&str, &str)]) -> ParameterSet {
        let mut set = ParameterSet::new("P", Position::default());
        let g = set.group(DEFAULT_GROUP, None, &Position::default());
        for (ty, name) in decls {
            set.create_parameter_in_group(params, ParamSetId(0), ty, name, g, Position::default())
                .unwrap();
        }
        set
    }

    #[test]
    fn prefix_hash() {
        assert_eq!(prefix_to_paramset_id("AB"), (65 + 66 * 2) % 32768);
        assert_eq!(prefix_to_paramset_id(""), 0);
        let long = "z".repeat(400);
        assert!(prefix_to_paramset_id(&long) < 32768);
    }

    #[test]
    fn duplicate_names_rejected_across_groups() {
        let mut params = Parameters::default();
        let mut set = set_with(&mut params, &[("int", "x")]);
        let g2 = set.group("other", None, &Position::default());
        let r = set.create_parameter_in_group(&mut params, ParamSetId(0), "bool", "x", g2, Position::default());
        assert!(matches!(r, Err(CompileError::Duplicate { .. })));
    }

    #[test]
    fn ids_follow_group_order_and_flag_virtual() {
        let mut params = Parameters::default();
        let mut set = set_with(&mut params, &[("int", "a"), ("bag", "v"), ("bag", "b")]);
        let v = set.find_parameter(&params, "v").unwrap();
        params[v].is_virtual = true;
        set.wrap_up_definition(&mut params).unwrap();
        let ids: Vec<u32> = set.param_ids().iter().map(|(n, _)| *n).collect();
        assert_eq!(ids, vec![1, 2 | VIRTUAL_PARAMID_FLAG, 3]);
        assert_eq!(set.assign_param_ids(&params), set.param_ids().to_vec());
    }

    #[test]
    fn number_ranges_share_one_enum() {
        let mut params = Parameters::default();
        let mut set = set_with(&mut params, &[]);
        set.add_number_range(&mut params, ParamSetId(0), "low", 0, 9, Position::default())
            .unwrap();
        set.add_number_range(&mut params, ParamSetId(0), "high", 10, 19, Position::default())
            .unwrap();
        let list = set.find_enumerator_list(DEFAULT_RANGE_ID).unwrap();
        assert_eq!(list.names(), vec![ANONYMOUS_RANGE, "low", "high"]);
        assert!(set.range_parameter().is_some());
        assert!(set
            .add_number_range(&mut params, ParamSetId(0), "low", 0, 1, Position::default())
            .is_err());
    }

    #[test]
    fn range_id_renamed_after_first_range_keeps_one_list() {
        let mut params = Parameters::default();
        let mut set = set_with(&mut params, &[]);
        set.add_number_range(&mut params, ParamSetId(0), "a", 0, 1, Position::default())
            .unwrap();
        set.range_id = Some("r".to_string());
        set.add_number_range(&mut params, ParamSetId(0), "b", 2, 3, Position::default())
            .unwrap();
        let list = set.find_enumerator_list(DEFAULT_RANGE_ID).unwrap();
        assert_eq!(list.names(), vec![ANONYMOUS_RANGE, "a", "b"]);
        assert!(set.find_enumerator_list("r").is_none());
    }

    #[test]
    fn enumerator_after_max_value_rejected() {
        let mut l = EnumeratorList::new("e", Position::default());
        l.add_value(EnumValue::new("a", Some(i64::MAX), Position::default())).unwrap();
        assert_eq!(l.resolved_values(), vec![("a", i64::MAX)]);
        let r = l.add_value(EnumValue::new("b", None, Position::default()));
        assert!(matches!(r, Err(CompileError::Invalid { .. })));
        l.add_value(EnumValue::new("c", Some(-1), Position::default())).unwrap();
        l.add_value(EnumValue::new("d", None, Position::default())).unwrap();
        assert_eq!(l.resolved_values(), vec![("a", i64::MAX), ("c", -1), ("d", 0)]);
    }

    #[test]
    fn enumerator_values_count_on() {
        let mut l = EnumeratorList::new("e", Position::default());
        l.add_value(EnumValue::new("a", None, Position::default())).unwrap();
        l.add_value(EnumValue::new("b", Some(5), Position::default())).unwrap();
        l.add_value(EnumValue::new("c", None, Position::default())).unwrap();
        assert_eq!(l.resolved_values(), vec![("a", 0), ("b", 5), ("c", 6)]);
    }

    #[test]
    fn virtual_without_children_fails_check() {
        let mut params = Parameters::default();
        let mut set = set_with(&mut params, &[("bag", "v")]);
        let v = set.find_parameter(&params, "v").unwrap();
        params[v].is_virtual = true;
        set.wrap_up_definition(&mut params).unwrap();
        let sets = vec![set];
        let r = sets[0].check_parameters(&sets, &params);
        assert!(matches!(r, Err(CompileError::VirtualWithoutConcrete { .. })));
    }

    #[test]
    fn bag_references_must_resolve() {
        let mut params = Parameters::default();
        let set = set_with(&mut params, &[("int", "x"), ("bag", "b")]);
        let b = set.find_parameter(&params, "b").unwrap();
        let list = params[b].parameter_list_mut().unwrap();
        list.push(ParameterListEntry::new(ParamSetId(0), "x", Position::default()));
        list.push(ParameterListEntry::new(ParamSetId(0), "missing", Position::default()));
        let sets = vec![set];
        let mut errors = Vec::new();
        let list = params[b].parameter_list().unwrap();
        assert_eq!(check_paramlist_parameters(list, &sets, &params, &mut errors), 1);
        assert!(sets[0].check_parameters(&sets, &params).is_err());
    }

    #[test]
    fn tags_count_repeated_parameters() {
        let e = |f: &str| {
            let mut e = ParameterListEntry::new(ParamSetId(0), "x", Position::default());
            e.field_name = Some(f.to_string());
            e
        };
        let list = vec![e("a"), e("b"), ParameterListEntry::new(ParamSetId(0), "y", Position::default()), e("c")];
        assert_eq!(entry_tag(&list, 0), 0);
        assert_eq!(entry_tag(&list, 1), 1);
        assert_eq!(entry_tag(&list, 2), 0);
        assert_eq!(entry_tag(&list, 3), 2);
    }
}

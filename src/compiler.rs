//! The compiler context: owns every parameter set, parameter and category, the option
//! table and the parse cursor, and runs the passes in order:
//!
//! 1. the parser builds the graph through the `add_*` operations,
//! 2. [`Compiler::wrap_up_definition`] creates deferred command/event bags, normalizes
//!    directions and fixes parameter IDs,
//! 3. [`Compiler::convert_doc`] derives Doxygen/LaTeX/help entries,
//! 4. [`Compiler::check_parameters`] validates the whole graph,
//!
//! after which the backends only read it. [`Compiler::finish`] runs 2-4.

use crate::category::{Categories, Category, CategoryId, Command, Event, MessageKind, MessageSpec};
use crate::doc::{self, LocalTagHandler};
use crate::error::{CompileError, CompileResult, Position};
use crate::object::{parent_list, self_and_parents, Docs};
use crate::parameter::{Direction, ParamId, Parameter, ParameterListEntry, Parameters};
use crate::paramset::{resolve_entry, EnumValue, EnumeratorList, ParamSetId, ParameterSet};
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;

/// Option keys accepted by `option <paramset> <key> = <value>;`.
pub const OPTION_SHORT_NAME: &str = "short_name";
const KNOWN_OPTIONS: [&str; 1] = [OPTION_SHORT_NAME];

/// Which backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodegenMode {
    #[default]
    Mpl,
    Cli,
    Api,
    Doxygen,
    Latex,
    Deja,
}

impl CodegenMode {
    pub const ALL: [CodegenMode; 6] = [
        CodegenMode::Mpl,
        CodegenMode::Cli,
        CodegenMode::Api,
        CodegenMode::Doxygen,
        CodegenMode::Latex,
        CodegenMode::Deja,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CodegenMode::Mpl => "mpl",
            CodegenMode::Cli => "cli",
            CodegenMode::Api => "api",
            CodegenMode::Doxygen => "doxygen",
            CodegenMode::Latex => "latex",
            CodegenMode::Deja => "deja",
        }
    }
}

impl fmt::Display for CodegenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodegenMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CodegenMode::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown codegen mode '{}'", s))
    }
}

/// Compiler-wide options, scoped by parameter set name.
#[derive(Debug, Clone, Default)]
pub struct OptionTable {
    entries: IndexMap<String, IndexMap<String, String>>,
}

impl OptionTable {
    pub fn set(&mut self, scope: &str, key: &str, value: &str, pos: &Position) -> CompileResult<()> {
        if !KNOWN_OPTIONS.contains(&key) {
            return Err(CompileError::InvalidOption {
                pos: pos.clone(),
                key: key.to_string(),
            });
        }
        self.entries
            .entry(scope.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn get(&self, scope: &str, key: &str) -> Option<&str> {
        self.entries.get(scope)?.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.entries.iter().flat_map(|(scope, kv)| {
            kv.iter()
                .map(move |(k, v)| (scope.as_str(), k.as_str(), v.as_str()))
        })
    }
}

/// What the parser is currently inside of.
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    pub paramset: Option<ParamSetId>,
    pub category: Option<CategoryId>,
    pub group: Option<usize>,
}

#[derive(Debug, Default)]
pub struct Compiler {
    pub parameter_sets: Vec<ParameterSet>,
    pub parameters: Parameters,
    pub categories: Categories,
    pub options: OptionTable,
    pub mode: CodegenMode,
    pub cursor: Cursor,
}

impl Compiler {
    pub fn new() -> Self {
        Compiler::default()
    }

    // ---------------------------------------------------------------- parameter sets

    pub fn paramset(&self, id: ParamSetId) -> &ParameterSet {
        &self.parameter_sets[id.0]
    }

    pub fn paramset_ids(&self) -> impl Iterator<Item = ParamSetId> {
        (0..self.parameter_sets.len()).map(ParamSetId)
    }

    pub fn find_parameter_set(&self, name: &str) -> Option<ParamSetId> {
        self.parameter_sets
            .iter()
            .position(|s| s.name == name)
            .map(ParamSetId)
    }

    pub fn add_parameter_set(&mut self, name: &str, pos: Position) -> CompileResult<ParamSetId> {
        if self.find_parameter_set(name).is_some() {
            return Err(CompileError::Duplicate {
                pos,
                what: "parameter set",
                name: name.to_string(),
            });
        }
        self.parameter_sets.push(ParameterSet::new(name, pos));
        let id = ParamSetId(self.parameter_sets.len() - 1);
        self.cursor.paramset = Some(id);
        self.cursor.group = None;
        log::debug!("parameter set '{}'", name);
        Ok(id)
    }

    /// Name used in generated identifiers: the `short_name` option, else the set name.
    pub fn short_name(&self, id: ParamSetId) -> &str {
        let set = self.paramset(id);
        self.options
            .get(&set.name, OPTION_SHORT_NAME)
            .unwrap_or(&set.name)
    }

    pub fn parameter(&self, id: ParamId) -> &Parameter {
        &self.parameters[id]
    }

    pub fn find_parameter(&self, set: ParamSetId, name: &str) -> Option<ParamId> {
        self.paramset(set).find_parameter(&self.parameters, name)
    }

    pub fn create_parameter(
        &mut self,
        set: ParamSetId,
        type_name: &str,
        name: &str,
        group: usize,
        pos: Position,
    ) -> CompileResult<ParamId> {
        self.parameter_sets[set.0].create_parameter_in_group(
            &mut self.parameters,
            set,
            type_name,
            name,
            group,
            pos,
        )
    }

    /// Make `child` inherit from `parent`.
    pub fn add_parent_parameter(&mut self, child: ParamId, parent: ParamId) -> CompileResult<()> {
        self.parameters.link(parent, child)
    }

    pub fn add_bag_entry(&mut self, bag: ParamId, entry: ParameterListEntry) -> CompileResult<()> {
        let p = &mut self.parameters[bag];
        let name = p.name.clone();
        let pos = entry.pos.clone();
        match p.parameter_list_mut() {
            Some(list) => {
                list.push(entry);
                Ok(())
            }
            None => Err(CompileError::Invalid {
                pos,
                message: format!("'{}' is not a bag", name),
            }),
        }
    }

    pub fn add_enumerator_list(&mut self, set: ParamSetId, list: EnumeratorList) -> CompileResult<()> {
        self.parameter_sets[set.0].add_enumerator_list(list)
    }

    pub fn add_number_range(
        &mut self,
        set: ParamSetId,
        name: &str,
        first: i64,
        last: i64,
        pos: Position,
    ) -> CompileResult<()> {
        self.parameter_sets[set.0].add_number_range(&mut self.parameters, set, name, first, last, pos)
    }

    /// Parameter an entry refers to, if it resolves.
    pub fn resolve(&self, entry: &ParameterListEntry) -> Option<ParamId> {
        resolve_entry(&self.parameter_sets, &self.parameters, entry)
    }

    pub fn entry_parameter(&self, entry: &ParameterListEntry) -> Option<&Parameter> {
        self.resolve(entry).map(|id| &self.parameters[id])
    }

    /// Fields of a bag including those inherited from its parent bags, topmost ancestor
    /// first. An inherited field that the bag redeclares is listed once, at its first place.
    pub fn bag_fields(&self, bag: ParamId) -> Vec<&ParameterListEntry> {
        let mut chain = parent_list(&self.parameters, bag);
        chain.reverse();
        chain.push(bag);
        let mut out: Vec<&ParameterListEntry> = Vec::new();
        for id in chain {
            for e in self.parameters[id].parameter_list().unwrap_or(&[]) {
                if !out.iter().any(|o| o.is_same_as(e)) {
                    out.push(e);
                }
            }
        }
        out
    }

    // ---------------------------------------------------------------- categories

    pub fn category(&self, id: CategoryId) -> &Category {
        &self.categories[id]
    }

    pub fn find_category(&self, name: &str) -> Option<CategoryId> {
        self.categories.find(name)
    }

    pub fn add_category(&mut self, name: &str, parent: Option<&str>, pos: Position) -> CompileResult<CategoryId> {
        if self.find_category(name).is_some() {
            return Err(CompileError::Duplicate {
                pos,
                what: "category",
                name: name.to_string(),
            });
        }
        let parent_id = match parent {
            Some(p) => Some(self.find_category(p).ok_or_else(|| CompileError::UndefinedReference {
                pos: pos.clone(),
                what: "category",
                name: p.to_string(),
            })?),
            None => None,
        };
        let id = self.categories.push(Category::new(name, pos));
        if let Some(p) = parent_id {
            self.categories.link(p, id);
        }
        self.cursor.category = Some(id);
        log::debug!("category '{}' (parent {:?})", name, parent);
        Ok(id)
    }

    pub fn set_category_paramset(&mut self, cat: CategoryId, set: ParamSetId) {
        self.categories[cat].paramset = Some(set);
    }

    /// Parameter set of the nearest category in the chain that declares one; the cursor's
    /// set when none does.
    pub fn category_paramset(&self, cat: CategoryId) -> Option<ParamSetId> {
        self_and_parents(&self.categories, cat)
            .find_map(|c| self.categories[c].paramset)
            .or(self.cursor.paramset)
    }

    /// Nearest message spec of `kind`, with the category defining it.
    pub fn message_spec(&self, cat: CategoryId, kind: MessageKind) -> Option<(CategoryId, &MessageSpec)> {
        self_and_parents(&self.categories, cat)
            .find_map(|c| self.categories[c].spec(kind).map(|s| (c, s)))
    }

    pub fn get_command_bag(&self, cat: CategoryId) -> Option<ParamId> {
        self.message_spec(cat, MessageKind::Command).map(|(_, s)| s.bag)
    }

    pub fn get_response_bag(&self, cat: CategoryId) -> Option<ParamId> {
        self.message_spec(cat, MessageKind::Response).map(|(_, s)| s.bag)
    }

    pub fn get_event_bag(&self, cat: CategoryId) -> Option<ParamId> {
        self.message_spec(cat, MessageKind::Event).map(|(_, s)| s.bag)
    }

    /// Enumerator list of the nearest spec of `kind`.
    pub fn message_enumerators(&self, cat: CategoryId, kind: MessageKind) -> Option<&EnumeratorList> {
        let (_, spec) = self.message_spec(cat, kind)?;
        let set = self.parameters[spec.bag].paramset;
        self.paramset(set).find_enumerator_list(&spec.enumerator_list)
    }

    fn require_paramset(&self, cat: CategoryId, pos: &Position) -> CompileResult<ParamSetId> {
        self.category_paramset(cat).ok_or_else(|| CompileError::Invalid {
            pos: pos.clone(),
            message: format!("category '{}' has no parameter set", self.categories[cat].name),
        })
    }

    /// Group of `cat` in its parameter set, holding the parameters synthesized for it.
    fn category_group(&mut self, cat: CategoryId, set: ParamSetId, pos: &Position) -> usize {
        let name = self.categories[cat].name.clone();
        self.parameter_sets[set.0].group(&name, Some(&name), pos)
    }

    /// Declare a local message spec: a virtual bag heading the family (child of the
    /// inherited bag of the same kind, if any) and an enumerator list `<category>_<kind>s`.
    pub fn add_message_bag(
        &mut self,
        cat: CategoryId,
        kind: MessageKind,
        bag_name: Option<&str>,
        pos: Position,
    ) -> CompileResult<ParamId> {
        let cat_name = self.categories[cat].name.clone();
        if self.categories[cat].spec(kind).is_some() {
            return Err(CompileError::Duplicate {
                pos,
                what: kind.spec_name(),
                name: cat_name,
            });
        }
        let inherited = self.message_spec(cat, kind).map(|(_, s)| s.bag);
        let set = self.require_paramset(cat, &pos)?;
        let group = self.category_group(cat, set, &pos);
        let bag_name = bag_name
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}_{}", cat_name, kind.bag_suffix()));
        let bag = self.create_parameter(set, "bag", &bag_name, group, pos.clone())?;
        self.parameters[bag].is_virtual = true;
        if let Some(parent) = inherited {
            self.add_parent_parameter(bag, parent)?;
        }
        let list_name = format!("{}_{}", cat_name, kind.list_suffix());
        self.add_enumerator_list(set, EnumeratorList::new(list_name.clone(), pos))?;
        *self.categories[cat].spec_slot(kind) = Some(MessageSpec {
            kind,
            bag,
            enumerator_list: list_name,
        });
        log::debug!("{}: {} bag '{}'", cat_name, kind.spec_name(), bag_name);
        Ok(bag)
    }

    pub fn add_command_bag(&mut self, cat: CategoryId, name: Option<&str>, pos: Position) -> CompileResult<ParamId> {
        self.add_message_bag(cat, MessageKind::Command, name, pos)
    }

    pub fn add_response_bag(&mut self, cat: CategoryId, name: Option<&str>, pos: Position) -> CompileResult<ParamId> {
        self.add_message_bag(cat, MessageKind::Response, name, pos)
    }

    pub fn add_event_bag(&mut self, cat: CategoryId, name: Option<&str>, pos: Position) -> CompileResult<ParamId> {
        self.add_message_bag(cat, MessageKind::Event, name, pos)
    }

    /// Declare a command. The command and response specs are created on `cat` when no
    /// category in its chain has one yet, so the message is registered in declaration order.
    pub fn add_command(&mut self, cat: CategoryId, name: &str, docs: Docs, pos: Position) -> CompileResult<usize> {
        if self.categories[cat].find_command(name).is_some() {
            return Err(CompileError::Duplicate {
                pos,
                what: "command",
                name: name.to_string(),
            });
        }
        if self.get_command_bag(cat).is_none() {
            self.add_command_bag(cat, None, pos.clone())?;
        }
        if self.get_response_bag(cat).is_none() {
            self.add_response_bag(cat, None, pos.clone())?;
        }
        let mut command = Command::new(name, pos);
        command.docs = docs;
        self.categories[cat].commands.push(command);
        let idx = self.categories[cat].commands.len() - 1;
        self.ensure_command_bags(cat, idx)?;
        Ok(idx)
    }

    pub fn add_event(&mut self, cat: CategoryId, name: &str, docs: Docs, pos: Position) -> CompileResult<usize> {
        if self.categories[cat].find_event(name).is_some() {
            return Err(CompileError::Duplicate {
                pos,
                what: "event",
                name: name.to_string(),
            });
        }
        if self.get_event_bag(cat).is_none() {
            self.add_event_bag(cat, None, pos.clone())?;
        }
        let mut event = Event::new(name, pos);
        event.docs = docs;
        self.categories[cat].events.push(event);
        let idx = self.categories[cat].events.len() - 1;
        self.ensure_event_bag(cat, idx)?;
        Ok(idx)
    }

    /// Append `name` to the enumerator list of the nearest spec of `kind`.
    fn register_message_name(&mut self, cat: CategoryId, kind: MessageKind, name: &str, pos: &Position) -> CompileResult<()> {
        let (bag, list_name) = match self.message_spec(cat, kind) {
            Some((_, spec)) => (spec.bag, spec.enumerator_list.clone()),
            None => return Ok(()),
        };
        let set = self.parameters[bag].paramset;
        if let Some(list) = self.parameter_sets[set.0].find_enumerator_list_mut(&list_name) {
            list.add_value(EnumValue::new(name, None, pos.clone()))?;
        }
        Ok(())
    }

    /// Create a message's own bag as a child of the family bag `parent`.
    fn create_message_bag(
        &mut self,
        cat: CategoryId,
        parent: ParamId,
        message: &str,
        pos: &Position,
    ) -> CompileResult<ParamId> {
        let set = self.require_paramset(cat, pos)?;
        let group = self.category_group(cat, set, pos);
        let name = format!("{}_{}", self.parameters[parent].name, message);
        let bag = self.create_parameter(set, "bag", &name, group, pos.clone())?;
        self.add_parent_parameter(bag, parent)?;
        Ok(bag)
    }

    /// Create the command's bags once both the command and response specs are in scope.
    /// Returns false while either spec is still missing.
    fn ensure_command_bags(&mut self, cat: CategoryId, idx: usize) -> CompileResult<bool> {
        if self.categories[cat].commands[idx].command_bag.is_some() {
            return Ok(true);
        }
        let (cmd_parent, resp_parent) = match (self.get_command_bag(cat), self.get_response_bag(cat)) {
            (Some(c), Some(r)) => (c, r),
            _ => return Ok(false),
        };
        let name = self.categories[cat].commands[idx].name.clone();
        let pos = self.categories[cat].commands[idx].pos.clone();
        self.register_message_name(cat, MessageKind::Command, &name, &pos)?;
        self.register_message_name(cat, MessageKind::Response, &name, &pos)?;
        let command_bag = self.create_message_bag(cat, cmd_parent, &name, &pos)?;
        let response_bag = self.create_message_bag(cat, resp_parent, &name, &pos)?;
        let command = &mut self.categories[cat].commands[idx];
        command.command_bag = Some(command_bag);
        command.response_bag = Some(response_bag);
        log::trace!("command '{}' bags #{} / #{}", name, command_bag.index(), response_bag.index());
        Ok(true)
    }

    fn ensure_event_bag(&mut self, cat: CategoryId, idx: usize) -> CompileResult<bool> {
        if self.categories[cat].events[idx].event_bag.is_some() {
            return Ok(true);
        }
        let parent = match self.get_event_bag(cat) {
            Some(p) => p,
            None => return Ok(false),
        };
        let name = self.categories[cat].events[idx].name.clone();
        let pos = self.categories[cat].events[idx].pos.clone();
        self.register_message_name(cat, MessageKind::Event, &name, &pos)?;
        let bag = self.create_message_bag(cat, parent, &name, &pos)?;
        self.categories[cat].events[idx].event_bag = Some(bag);
        Ok(true)
    }

    fn missing_spec(&self, cat: CategoryId, what: &'static str, spec: &'static str, pos: &Position) -> CompileError {
        CompileError::MissingSpec {
            pos: pos.clone(),
            category: self.categories[cat].name.clone(),
            what,
            spec,
        }
    }

    /// Route a command parameter by direction: `in` to the command bag, `out` to the
    /// response bag, `inout` cloned into both.
    pub fn add_command_parameter_list_entry(
        &mut self,
        cat: CategoryId,
        idx: usize,
        entry: ParameterListEntry,
    ) -> CompileResult<()> {
        if !self.ensure_command_bags(cat, idx)? {
            return Err(self.missing_spec(cat, "commands", "command/response", &entry.pos));
        }
        let command = &self.categories[cat].commands[idx];
        let command_name = command.name.clone();
        let (cmd_bag, resp_bag) = match (command.command_bag, command.response_bag) {
            (Some(c), Some(r)) => (c, r),
            _ => return Err(self.missing_spec(cat, "commands", "command/response", &entry.pos)),
        };
        match entry.direction {
            Direction::In => self.add_bag_entry(cmd_bag, entry),
            Direction::Out => self.add_bag_entry(resp_bag, entry),
            Direction::InOut => {
                self.add_bag_entry(cmd_bag, entry.clone())?;
                self.add_bag_entry(resp_bag, entry)
            }
            Direction::None => Err(CompileError::Direction {
                pos: entry.pos.clone(),
                direction: entry.direction,
                context: format!("command '{}'", command_name),
            }),
        }
    }

    /// Event parameters go to the event bag; only `out` (or unmarked) is legal.
    pub fn add_event_parameter_list_entry(
        &mut self,
        cat: CategoryId,
        idx: usize,
        entry: ParameterListEntry,
    ) -> CompileResult<()> {
        if !self.ensure_event_bag(cat, idx)? {
            return Err(self.missing_spec(cat, "events", "event", &entry.pos));
        }
        let event = &self.categories[cat].events[idx];
        let event_name = event.name.clone();
        match (entry.direction, event.event_bag) {
            (Direction::Out | Direction::None, Some(bag)) => self.add_bag_entry(bag, entry),
            (Direction::In | Direction::InOut, _) => Err(CompileError::Direction {
                pos: entry.pos.clone(),
                direction: entry.direction,
                context: format!("event '{}'", event_name),
            }),
            (_, None) => Err(self.missing_spec(cat, "events", "event", &entry.pos)),
        }
    }

    // ---------------------------------------------------------------- passes

    fn wrap_up_category(&mut self, cat: CategoryId) -> CompileResult<()> {
        let c = &self.categories[cat];
        match (&c.command_spec, &c.response_spec) {
            (Some(_), None) => return Err(self.missing_spec(cat, "a command spec", "response", &c.pos)),
            (None, Some(_)) => return Err(self.missing_spec(cat, "a response spec", "command", &c.pos)),
            _ => {}
        }
        for idx in 0..self.categories[cat].commands.len() {
            if !self.ensure_command_bags(cat, idx)? {
                let pos = self.categories[cat].commands[idx].pos.clone();
                let spec = if self.get_command_bag(cat).is_none() { "command" } else { "response" };
                return Err(self.missing_spec(cat, "commands", spec, &pos));
            }
        }
        for idx in 0..self.categories[cat].events.len() {
            if !self.ensure_event_bag(cat, idx)? {
                let pos = self.categories[cat].events[idx].pos.clone();
                return Err(self.missing_spec(cat, "events", "event", &pos));
            }
        }
        let out_bags: Vec<ParamId> = {
            let c = &self.categories[cat];
            c.commands
                .iter()
                .filter_map(|cmd| cmd.response_bag)
                .chain(c.events.iter().filter_map(|e| e.event_bag))
                .collect()
        };
        for bag in out_bags {
            if let Some(list) = self.parameters[bag].parameter_list_mut() {
                for e in list.iter_mut().filter(|e| e.direction != Direction::InOut) {
                    e.direction = Direction::Out;
                }
            }
        }
        Ok(())
    }

    /// Finalize the graph: categories first (their bags are parameters), then every
    /// parameter set.
    pub fn wrap_up_definition(&mut self) -> CompileResult<()> {
        for cat in self.categories.ids().collect::<Vec<_>>() {
            self.wrap_up_category(cat)?;
        }
        for set in &mut self.parameter_sets {
            set.wrap_up_definition(&mut self.parameters)?;
        }
        log::info!(
            "wrapped up {} parameter set(s), {} categor(ies), {} parameter(s)",
            self.parameter_sets.len(),
            self.categories.len(),
            self.parameters.len()
        );
        Ok(())
    }

    /// Derive documentation for every object. Safe to run more than once.
    pub fn convert_doc(&mut self, hooks: &dyn LocalTagHandler) -> CompileResult<()> {
        doc::convert_all(self, hooks)
    }

    /// Validate every parameter set; categories with messages must resolve a parameter set.
    pub fn check_parameters(&self) -> CompileResult<()> {
        for (id, c) in self.categories.iter() {
            if (!c.commands.is_empty() || !c.events.is_empty()) && self.category_paramset(id).is_none() {
                return Err(CompileError::Invalid {
                    pos: c.pos.clone(),
                    message: format!("category '{}' has no parameter set", c.name),
                });
            }
        }
        for set in &self.parameter_sets {
            set.check_parameters(&self.parameter_sets, &self.parameters)?;
        }
        Ok(())
    }

    /// Run wrap-up, doc conversion and validation: after this the graph is read-only.
    pub fn finish(&mut self, hooks: &dyn LocalTagHandler) -> CompileResult<()> {
        self.wrap_up_definition()?;
        self.trace_pass("wrap_up_definition");
        self.convert_doc(hooks)?;
        self.trace_pass("convert_doc");
        self.check_parameters()?;
        self.trace_pass("check_parameters");
        Ok(())
    }

    #[cfg(feature = "pass_trace")]
    fn trace_pass(&self, pass: &str) {
        log::trace!("after {}:\n{}", pass, self.dump());
    }

    #[cfg(not(feature = "pass_trace"))]
    fn trace_pass(&self, _pass: &str) {}

    /// Categories whose (inherited) parameter set is `set`, in declaration order.
    pub fn categories_of_set(&self, set: ParamSetId) -> Vec<CategoryId> {
        self.categories
            .ids()
            .filter(|&c| self.category_paramset(c) == Some(set))
            .collect()
    }

    /// Numeric ID of a parameter, as assigned by its parameter set at wrap-up.
    pub fn param_id(&self, id: ParamId) -> Option<u32> {
        self.paramset(self.parameters[id].paramset).param_id(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::NoLocalTags;

    fn entry(name: &str, dir: Direction) -> ParameterListEntry {
        let mut e = ParameterListEntry::new(ParamSetId(0), name, Position::default());
        e.direction = dir;
        e
    }

    fn base() -> (Compiler, CategoryId) {
        let mut c = Compiler::new();
        let set = c.add_parameter_set("P", Position::default()).unwrap();
        let g = c.parameter_sets[0].group("default", None, &Position::default());
        c.create_parameter(set, "int", "x", g, Position::default()).unwrap();
        c.create_parameter(set, "int", "y", g, Position::default()).unwrap();
        let cat = c.add_category("Cat", None, Position::default()).unwrap();
        c.set_category_paramset(cat, set);
        (c, cat)
    }

    #[test]
    fn command_enumerators_are_parallel() {
        let (mut c, cat) = base();
        c.add_command_bag(cat, None, Position::default()).unwrap();
        c.add_response_bag(cat, None, Position::default()).unwrap();
        c.add_command(cat, "A", Docs::default(), Position::default()).unwrap();
        c.add_command(cat, "B", Docs::default(), Position::default()).unwrap();
        let cmds = c.message_enumerators(cat, MessageKind::Command).unwrap().names();
        let resps = c.message_enumerators(cat, MessageKind::Response).unwrap().names();
        assert_eq!(cmds, vec!["A", "B"]);
        assert_eq!(cmds, resps);
    }

    #[test]
    fn inout_goes_to_both_bags() {
        let (mut c, cat) = base();
        c.add_command_bag(cat, None, Position::default()).unwrap();
        c.add_response_bag(cat, None, Position::default()).unwrap();
        let idx = c.add_command(cat, "Do", Docs::default(), Position::default()).unwrap();
        let e = entry("x", Direction::InOut);
        c.add_command_parameter_list_entry(cat, idx, e).unwrap();
        let cmd = &c.categories[cat].commands[idx];
        let cl = c.parameters[cmd.command_bag.unwrap()].parameter_list().unwrap();
        let rl = c.parameters[cmd.response_bag.unwrap()].parameter_list().unwrap();
        assert_eq!(cl.len(), 1);
        assert_eq!(rl.len(), 1);
        assert!(cl[0].is_same_as(&rl[0]));
    }

    #[test]
    fn unmarked_command_entry_is_rejected() {
        let (mut c, cat) = base();
        c.add_command_bag(cat, None, Position::default()).unwrap();
        c.add_response_bag(cat, None, Position::default()).unwrap();
        let idx = c.add_command(cat, "Do", Docs::default(), Position::default()).unwrap();
        let e = entry("x", Direction::None);
        assert!(matches!(
            c.add_command_parameter_list_entry(cat, idx, e),
            Err(CompileError::Direction { .. })
        ));
    }

    #[test]
    fn event_rejects_in_and_is_forced_out() {
        let (mut c, cat) = base();
        c.add_event_bag(cat, None, Position::default()).unwrap();
        let idx = c.add_event(cat, "Ev", Docs::default(), Position::default()).unwrap();
        let e = entry("x", Direction::In);
        assert!(c.add_event_parameter_list_entry(cat, idx, e).is_err());
        let e = entry("y", Direction::None);
        c.add_event_parameter_list_entry(cat, idx, e).unwrap();
        c.wrap_up_definition().unwrap();
        let bag = c.categories[cat].events[idx].event_bag.unwrap();
        assert_eq!(c.parameters[bag].parameter_list().unwrap()[0].direction, Direction::Out);
    }

    #[test]
    fn first_command_creates_specs() {
        let (mut c, cat) = base();
        let idx = c.add_command(cat, "Do", Docs::default(), Position::default()).unwrap();
        let cmd_bag = c.get_command_bag(cat).unwrap();
        let resp_bag = c.get_response_bag(cat).unwrap();
        assert_eq!(c.parameters[cmd_bag].name, "Cat_cmd");
        assert_eq!(c.parameters[resp_bag].name, "Cat_resp");
        assert!(c.parameters[cmd_bag].is_virtual);
        assert_eq!(c.message_enumerators(cat, MessageKind::Command).unwrap().names(), vec!["Do"]);
        assert_eq!(c.message_enumerators(cat, MessageKind::Response).unwrap().names(), vec!["Do"]);
        assert!(c.get_event_bag(cat).is_none());

        c.add_event(cat, "Ev", Docs::default(), Position::default()).unwrap();
        assert_eq!(c.message_enumerators(cat, MessageKind::Event).unwrap().names(), vec!["Ev"]);
        c.wrap_up_definition().unwrap();
        assert!(c.categories[cat].commands[idx].command_bag.is_some());
    }

    #[test]
    fn commands_register_in_declaration_order() {
        let (mut c, cat) = base();
        c.add_command(cat, "A", Docs::default(), Position::default()).unwrap();
        c.add_command(cat, "B", Docs::default(), Position::default()).unwrap();
        assert_eq!(c.message_enumerators(cat, MessageKind::Command).unwrap().names(), vec!["A", "B"]);
        // the spec already exists once a command has been seen
        assert!(matches!(
            c.add_command_bag(cat, None, Position::default()),
            Err(CompileError::Duplicate { .. })
        ));
    }

    #[test]
    fn child_command_uses_inherited_spec() {
        let (mut c, cat) = base();
        let parent_bag = c.add_command_bag(cat, None, Position::default()).unwrap();
        c.add_response_bag(cat, None, Position::default()).unwrap();
        let child = c.add_category("Sub", Some("Cat"), Position::default()).unwrap();
        c.add_command(child, "More", Docs::default(), Position::default()).unwrap();
        assert!(c.categories[child].command_spec.is_none());
        assert_eq!(c.get_command_bag(child), Some(parent_bag));
        assert_eq!(c.message_enumerators(cat, MessageKind::Command).unwrap().names(), vec!["More"]);
    }

    #[test]
    fn lone_command_spec_fails_wrap_up() {
        let (mut c, cat) = base();
        c.add_command_bag(cat, None, Position::default()).unwrap();
        assert!(matches!(c.wrap_up_definition(), Err(CompileError::MissingSpec { .. })));
    }

    #[test]
    fn child_category_inherits_then_overrides_bag() {
        let (mut c, cat) = base();
        let parent_bag = c.add_command_bag(cat, None, Position::default()).unwrap();
        let child = c.add_category("Sub", Some("Cat"), Position::default()).unwrap();
        assert_eq!(c.get_command_bag(child), Some(parent_bag));
        let own = c.add_command_bag(child, None, Position::default()).unwrap();
        assert_eq!(c.get_command_bag(child), Some(own));
        assert_ne!(own, parent_bag);
        assert_eq!(c.parameters[own].lineage.parent(), Some(parent_bag));
    }

    #[test]
    fn options_reject_unknown_keys() {
        let mut t = OptionTable::default();
        t.set("P", OPTION_SHORT_NAME, "p", &Position::default()).unwrap();
        assert_eq!(t.get("P", OPTION_SHORT_NAME), Some("p"));
        assert!(t.set("P", "colour", "red", &Position::default()).is_err());
    }

    #[test]
    fn finish_runs_all_passes() {
        let (mut c, cat) = base();
        c.add_command_bag(cat, None, Position::default()).unwrap();
        c.add_response_bag(cat, None, Position::default()).unwrap();
        let idx = c.add_command(cat, "Do", Docs::default(), Position::default()).unwrap();
        c.add_command_parameter_list_entry(cat, idx, entry("x", Direction::In)).unwrap();
        c.finish(&NoLocalTags).unwrap();
        let cmd_bag = c.categories[cat].commands[idx].command_bag.unwrap();
        assert!(c.param_id(cmd_bag).is_some());
        assert!("mpl".parse::<CodegenMode>().is_ok());
        assert!("xml".parse::<CodegenMode>().is_err());
    }
}

//! Categories, their message specs, commands and events.
//!
//! A category's command, response and event bags are virtual bag parameters heading an
//! inheritance family: every command's own bags are created as children of the
//! category-level bag in scope. The operations that need both the category tree and the
//! parameter arena live on [`Compiler`](crate::compiler::Compiler).

use crate::error::Position;
use crate::object::{Docs, Lineage, LineageArena};
use crate::parameter::ParamId;
use crate::paramset::ParamSetId;
use std::ops::{Index, IndexMut};

/// Index of a category in the compiler's category arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CategoryId(pub(crate) usize);

impl CategoryId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The three message kinds a category can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Command,
    Response,
    Event,
}

impl MessageKind {
    /// Suffix of the synthesized enumerator list (`<category>_commands`, ...).
    pub fn list_suffix(self) -> &'static str {
        match self {
            MessageKind::Command => "commands",
            MessageKind::Response => "responses",
            MessageKind::Event => "events",
        }
    }

    /// Suffix of the default category-level bag name (`<category>_cmd`, ...).
    pub fn bag_suffix(self) -> &'static str {
        match self {
            MessageKind::Command => "cmd",
            MessageKind::Response => "resp",
            MessageKind::Event => "evt",
        }
    }

    pub fn spec_name(self) -> &'static str {
        match self {
            MessageKind::Command => "command",
            MessageKind::Response => "response",
            MessageKind::Event => "event",
        }
    }
}

/// Virtual bag plus enumerator list backing one message kind of a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSpec {
    pub kind: MessageKind,
    pub bag: ParamId,
    /// Enumerator list (in the category's parameter set) naming every message of the family.
    pub enumerator_list: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub command_bag: Option<ParamId>,
    pub response_bag: Option<ParamId>,
    pub docs: Docs,
    /// Derived documentation for the response side; `raw` is always empty.
    pub response_docs: Docs,
    pub pos: Position,
}

impl Command {
    pub fn new(name: impl Into<String>, pos: Position) -> Self {
        Command {
            name: name.into(),
            command_bag: None,
            response_bag: None,
            docs: Docs::default(),
            response_docs: Docs::default(),
            pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub event_bag: Option<ParamId>,
    pub docs: Docs,
    pub pos: Position,
}

impl Event {
    pub fn new(name: impl Into<String>, pos: Position) -> Self {
        Event {
            name: name.into(),
            event_bag: None,
            docs: Docs::default(),
            pos,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    /// Locally declared parameter set; see `Compiler::category_paramset` for the inherited one.
    pub paramset: Option<ParamSetId>,
    pub command_spec: Option<MessageSpec>,
    pub response_spec: Option<MessageSpec>,
    pub event_spec: Option<MessageSpec>,
    pub commands: Vec<Command>,
    pub events: Vec<Event>,
    pub lineage: Lineage<CategoryId>,
    pub docs: Docs,
    pub pos: Position,
}

impl Category {
    pub fn new(name: impl Into<String>, pos: Position) -> Self {
        Category {
            name: name.into(),
            paramset: None,
            command_spec: None,
            response_spec: None,
            event_spec: None,
            commands: Vec::new(),
            events: Vec::new(),
            lineage: Lineage::default(),
            docs: Docs::default(),
            pos,
        }
    }

    pub fn spec(&self, kind: MessageKind) -> Option<&MessageSpec> {
        match kind {
            MessageKind::Command => self.command_spec.as_ref(),
            MessageKind::Response => self.response_spec.as_ref(),
            MessageKind::Event => self.event_spec.as_ref(),
        }
    }

    pub(crate) fn spec_slot(&mut self, kind: MessageKind) -> &mut Option<MessageSpec> {
        match kind {
            MessageKind::Command => &mut self.command_spec,
            MessageKind::Response => &mut self.response_spec,
            MessageKind::Event => &mut self.event_spec,
        }
    }

    pub fn find_command(&self, name: &str) -> Option<usize> {
        self.commands.iter().position(|c| c.name == name)
    }

    pub fn find_event(&self, name: &str) -> Option<usize> {
        self.events.iter().position(|e| e.name == name)
    }
}

/// Arena of all categories, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Categories(Vec<Category>);

impl Categories {
    pub(crate) fn push(&mut self, c: Category) -> CategoryId {
        self.0.push(c);
        CategoryId(self.0.len() - 1)
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.0.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CategoryId, &Category)> {
        self.0.iter().enumerate().map(|(i, c)| (CategoryId(i), c))
    }

    pub fn ids(&self) -> impl Iterator<Item = CategoryId> {
        (0..self.0.len()).map(CategoryId)
    }

    pub fn find(&self, name: &str) -> Option<CategoryId> {
        self.0.iter().position(|c| c.name == name).map(CategoryId)
    }

    /// Categories without a parent, in declaration order.
    pub fn top_level(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.iter()
            .filter(|(_, c)| c.lineage.parent().is_none())
            .map(|(id, _)| id)
    }

    /// Parents always exist before children: `parent` is an existing id and `child` is new.
    pub(crate) fn link(&mut self, parent: CategoryId, child: CategoryId) {
        if self.0[child.0].lineage.set_parent(parent).is_ok() {
            self.0[parent.0].lineage.push_child(child);
        }
    }
}

impl Index<CategoryId> for Categories {
    type Output = Category;

    fn index(&self, id: CategoryId) -> &Category {
        &self.0[id.0]
    }
}

impl IndexMut<CategoryId> for Categories {
    fn index_mut(&mut self, id: CategoryId) -> &mut Category {
        &mut self.0[id.0]
    }
}

impl LineageArena<CategoryId> for Categories {
    fn lineage(&self, id: CategoryId) -> &Lineage<CategoryId> {
        &self.0[id.0].lineage
    }
}

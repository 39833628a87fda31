//! Shared object model: documentation carried by every listable object, and the
//! parent/child lineage of inheritable objects (categories, parameters).
//!
//! Objects live in flat arenas owned by the [`Compiler`](crate::compiler::Compiler) and refer
//! to each other by index. A [`Lineage`] holds non-owning links only: the arena owns the
//! objects, the lineage records who inherits from whom. Parents must be created before their
//! children, so every parent chain is finite and acyclic.

/// One derived documentation line (Doxygen, LaTeX or CLI help).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocEntry {
    /// Tag the entry came from (`param`, `see`, ...); `None` for free text.
    pub label: Option<String>,
    /// Tag argument, e.g. the parameter name of `@param`.
    pub arg: Option<String>,
    /// Rendered text in the target syntax.
    pub text: String,
}

impl DocEntry {
    pub fn text(text: impl Into<String>) -> Self {
        DocEntry {
            label: None,
            arg: None,
            text: text.into(),
        }
    }

    pub fn tagged(label: &str, arg: Option<&str>, text: impl Into<String>) -> Self {
        DocEntry {
            label: Some(label.to_string()),
            arg: arg.map(str::to_string),
            text: text.into(),
        }
    }
}

/// Raw doc comments of an object plus the three lists derived from them by the doc
/// conversion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Docs {
    pub raw: Vec<String>,
    pub dox: Vec<DocEntry>,
    pub latex: Vec<DocEntry>,
    pub help: Vec<DocEntry>,
}

impl Docs {
    pub fn from_raw(raw: Vec<String>) -> Self {
        Docs {
            raw,
            ..Docs::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.iter().all(|r| r.trim().is_empty())
    }

    /// Raw doc text joined into one block, as fed to the doc re-parse.
    pub fn raw_text(&self) -> String {
        self.raw.join("\n")
    }

    /// Replace all derived lists at once; re-running the conversion never accumulates.
    pub fn set_derived(&mut self, dox: Vec<DocEntry>, latex: Vec<DocEntry>, help: Vec<DocEntry>) {
        self.dox = dox;
        self.latex = latex;
        self.help = help;
    }
}

/// Non-owning parent/child links of an inheritable object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lineage<Id> {
    parent: Option<Id>,
    children: Vec<Id>,
}

impl<Id> Default for Lineage<Id> {
    fn default() -> Self {
        Lineage {
            parent: None,
            children: Vec::new(),
        }
    }
}

impl<Id: Copy + PartialEq> Lineage<Id> {
    pub fn parent(&self) -> Option<Id> {
        self.parent
    }

    pub fn children(&self) -> &[Id] {
        &self.children
    }

    /// Set the parent. A parent is set at most once; returns the existing parent on conflict.
    pub(crate) fn set_parent(&mut self, parent: Id) -> Result<(), Id> {
        match self.parent {
            Some(existing) if existing != parent => Err(existing),
            _ => {
                self.parent = Some(parent);
                Ok(())
            }
        }
    }

    pub(crate) fn push_child(&mut self, child: Id) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }
}

/// An arena whose objects carry a [`Lineage`].
pub trait LineageArena<Id: Copy + PartialEq> {
    fn lineage(&self, id: Id) -> &Lineage<Id>;
}

/// All descendants of `id`. Each object's immediate children come first, then the
/// descendants of each child in turn. The returned ids are weak; dropping the list frees nothing.
pub fn flat_child_list<A, Id>(arena: &A, id: Id) -> Vec<Id>
where
    A: LineageArena<Id> + ?Sized,
    Id: Copy + PartialEq,
{
    let mut out = Vec::new();
    append_flat_children(arena, id, &mut out);
    out
}

fn append_flat_children<A, Id>(arena: &A, id: Id, out: &mut Vec<Id>)
where
    A: LineageArena<Id> + ?Sized,
    Id: Copy + PartialEq,
{
    let children = arena.lineage(id).children();
    out.extend_from_slice(children);
    for &child in children {
        append_flat_children(arena, child, out);
    }
}

/// Ancestors of `id`, nearest first.
pub fn parent_list<A, Id>(arena: &A, id: Id) -> Vec<Id>
where
    A: LineageArena<Id> + ?Sized,
    Id: Copy + PartialEq,
{
    let mut out = Vec::new();
    let mut cur = arena.lineage(id).parent();
    while let Some(p) = cur {
        out.push(p);
        cur = arena.lineage(p).parent();
    }
    out
}

/// Root of the parent chain; `id` itself when it has no parent.
pub fn topmost_parent<A, Id>(arena: &A, id: Id) -> Id
where
    A: LineageArena<Id> + ?Sized,
    Id: Copy + PartialEq,
{
    parent_list(arena, id).last().copied().unwrap_or(id)
}

/// `id` followed by its ancestors: the lookup order for "nearest defined" properties.
pub fn self_and_parents<A, Id>(arena: &A, id: Id) -> impl Iterator<Item = Id>
where
    A: LineageArena<Id> + ?Sized,
    Id: Copy + PartialEq,
{
    std::iter::once(id).chain(parent_list(arena, id))
}

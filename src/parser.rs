//! Parse MPL source into the compiler's object graph using PEST.
//!
//! The front-end is thin: every declaration is handed straight to the [`Compiler`]
//! operations that build and validate the graph, so all semantic errors come from the
//! same place whether the graph was built from text or programmatically.

use crate::category::{CategoryId, MessageKind};
use crate::compiler::Compiler;
use crate::error::{CompileError, CompileResult, Position};
use crate::object::Docs;
use crate::parameter::{Direction, ParamId, ParamKind, ParameterListEntry, PropertyValue};
use crate::paramset::{EnumValue, EnumeratorList, ParamSetId, DEFAULT_GROUP};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;
use std::path::{Path, PathBuf};

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct MplParser;

/// Parse `source` (named `file` in diagnostics) into `c`. Includes are looked up relative
/// to the current directory.
pub fn parse_str(c: &mut Compiler, source: &str, file: &str) -> CompileResult<()> {
    let mut frontend = Frontend::new(c, Vec::new());
    frontend.parse_source(source, file, Path::new("."))
}

/// Parse the file at `path` into `c`. Includes are looked up next to the including file,
/// then in each of `include_dirs` in order.
pub fn parse_file(c: &mut Compiler, path: &Path, include_dirs: &[PathBuf]) -> CompileResult<()> {
    let mut frontend = Frontend::new(c, include_dirs.to_vec());
    frontend.parse_path(path)
}

struct Frontend<'c> {
    c: &'c mut Compiler,
    include_dirs: Vec<PathBuf>,
    /// Files currently being parsed, outermost first.
    stack: Vec<PathBuf>,
    file: String,
}

impl<'c> Frontend<'c> {
    fn new(c: &'c mut Compiler, include_dirs: Vec<PathBuf>) -> Self {
        Frontend {
            c,
            include_dirs,
            stack: Vec::new(),
            file: String::new(),
        }
    }

    fn parse_path(&mut self, path: &Path) -> CompileResult<()> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if self.stack.contains(&canonical) {
            return Err(CompileError::Invalid {
                pos: Position::new(self.file.clone(), 0),
                message: format!("recursive include of '{}'", path.display()),
            });
        }
        let source = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        log::debug!("parsing {}", path.display());
        self.stack.push(canonical);
        let result = self.parse_source(&source, &path.display().to_string(), &dir);
        self.stack.pop();
        result
    }

    fn parse_source(&mut self, source: &str, file: &str, dir: &Path) -> CompileResult<()> {
        let saved = std::mem::replace(&mut self.file, file.to_string());
        let result = self.build_file(source, dir);
        self.file = saved;
        result
    }

    fn build_file(&mut self, source: &str, dir: &Path) -> CompileResult<()> {
        let pairs = MplParser::parse(Rule::file, source).map_err(|e| CompileError::Parse {
            file: self.file.clone(),
            message: e.to_string(),
        })?;
        let pair = pairs.into_iter().next().ok_or_else(|| CompileError::Parse {
            file: self.file.clone(),
            message: "empty parse".to_string(),
        })?;
        for item in pair.into_inner() {
            match item.as_rule() {
                Rule::include => self.build_include(item, dir)?,
                Rule::option_decl => self.build_option(item)?,
                Rule::paramset_decl => self.build_paramset(item)?,
                Rule::category_decl => self.build_category(item)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn pos(&self, pair: &Pair<Rule>) -> Position {
        Position::new(self.file.clone(), pair.as_span().start_pos().line_col().0)
    }

    // ==================== Top level ====================

    fn build_include(&mut self, pair: Pair<Rule>, dir: &Path) -> CompileResult<()> {
        let pos = self.pos(&pair);
        let name = pair
            .into_inner()
            .next()
            .map(|s| unquote(&s))
            .unwrap_or_default();
        let candidates = std::iter::once(dir.join(&name)).chain(self.include_dirs.iter().map(|d| d.join(&name)));
        let found = candidates.into_iter().find(|p| p.is_file());
        match found {
            Some(path) => self.parse_path(&path),
            None => Err(CompileError::UndefinedReference {
                pos,
                what: "include file",
                name,
            }),
        }
    }

    fn build_option(&mut self, pair: Pair<Rule>) -> CompileResult<()> {
        let pos = self.pos(&pair);
        let mut it = pair.into_inner();
        let scope = it.next().map(|p| p.as_str()).unwrap_or_default();
        let key = it.next().map(|p| p.as_str()).unwrap_or_default();
        let value = it.next().map(|p| value_text(&p)).unwrap_or_default();
        self.c.options.set(scope, key, &value, &pos)
    }

    // ==================== Parameter sets ====================

    fn build_paramset(&mut self, pair: Pair<Rule>) -> CompileResult<()> {
        let pos = self.pos(&pair);
        let mut docs = Docs::default();
        let mut set = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::doc if set.is_none() => docs = doc_text(&inner),
                Rule::ident => {
                    let id = self.c.add_parameter_set(inner.as_str(), self.pos(&inner))?;
                    self.c.parameter_sets[id.index()].docs = std::mem::take(&mut docs);
                    set = Some(id);
                }
                Rule::set_property => self.build_set_property(current(set)?, inner)?,
                Rule::enum_list => self.build_enum_list(current(set)?, inner)?,
                Rule::number_range => self.build_number_range(current(set)?, inner)?,
                Rule::group_decl => self.build_group(current(set)?, inner)?,
                Rule::param_decl => {
                    let set = current(set)?;
                    let g = self.c.parameter_sets[set.index()].group(DEFAULT_GROUP, None, &pos);
                    self.build_param(set, g, inner)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn build_set_property(&mut self, set: ParamSetId, pair: Pair<Rule>) -> CompileResult<()> {
        let pos = self.pos(&pair);
        let mut it = pair.into_inner();
        let key = it.next().map(|p| p.as_str().to_string()).unwrap_or_default();
        let value = it.next().ok_or_else(|| invalid(&pos, "missing value"))?;
        let text = value_text(&value);
        let ps = &mut self.c.parameter_sets[set.index()];
        match key.as_str() {
            "prefix" => ps.prefix = Some(text),
            "id" => {
                let n = parse_int(&text)
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| invalid(&pos, &format!("invalid parameter set id '{}'", text)))?;
                ps.numeric_id = Some(n);
            }
            "range_id" if ps.range_parameter().is_some() => {
                return Err(invalid(&pos, "range_id must precede the first number_range"))
            }
            "range_id" => ps.range_id = Some(text),
            "bag_field_table_suffix" => ps.bag_field_table_suffix = Some(text),
            _ => return Err(invalid(&pos, &format!("unknown parameter set property '{}'", key))),
        }
        Ok(())
    }

    fn build_enum_list(&mut self, set: ParamSetId, pair: Pair<Rule>) -> CompileResult<()> {
        let pos = self.pos(&pair);
        let mut docs = Docs::default();
        let mut list = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::doc => docs = doc_text(&inner),
                Rule::ident => {
                    let mut l = EnumeratorList::new(inner.as_str(), pos.clone());
                    l.docs = std::mem::take(&mut docs);
                    list = Some(l);
                }
                Rule::member_list => {
                    if let Some(l) = list.as_mut() {
                        self.fill_enumerators(l, inner)?;
                    }
                }
                _ => {}
            }
        }
        match list {
            Some(l) => self.c.add_enumerator_list(set, l),
            None => Err(invalid(&pos, "enumerator list without a name")),
        }
    }

    fn fill_enumerators(&self, list: &mut EnumeratorList, pair: Pair<Rule>) -> CompileResult<()> {
        for member in pair.into_inner().filter(|p| p.as_rule() == Rule::member) {
            let pos = self.pos(&member);
            let mut docs = Docs::default();
            let mut name = None;
            let mut value = None;
            for part in member.into_inner() {
                match part.as_rule() {
                    Rule::doc => docs = doc_text(&part),
                    Rule::qualified if part.as_str().contains("::") => {
                        return Err(invalid(&pos, &format!("'{}' is not a valid enumerator name", part.as_str())));
                    }
                    Rule::qualified => name = Some(part.as_str().to_string()),
                    Rule::int => {
                        value = Some(
                            parse_int(part.as_str())
                                .ok_or_else(|| invalid(&pos, &format!("invalid number '{}'", part.as_str())))?,
                        )
                    }
                    _ => {
                        return Err(invalid(
                            &pos,
                            &format!("unexpected '{}' in enumerator list '{}'", part.as_str(), list.name),
                        ))
                    }
                }
            }
            let Some(name) = name else { continue };
            let mut v = EnumValue::new(name, value, pos);
            v.docs = docs;
            list.add_value(v)?;
        }
        Ok(())
    }

    fn build_number_range(&mut self, set: ParamSetId, pair: Pair<Rule>) -> CompileResult<()> {
        let pos = self.pos(&pair);
        let mut docs = Docs::default();
        let mut name = String::new();
        let mut bounds = Vec::with_capacity(2);
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::doc => docs = doc_text(&inner),
                Rule::ident => name = inner.as_str().to_string(),
                Rule::int => bounds.push(
                    parse_int(inner.as_str())
                        .ok_or_else(|| invalid(&pos, &format!("invalid number '{}'", inner.as_str())))?,
                ),
                _ => {}
            }
        }
        let (first, last) = match bounds[..] {
            [first, last] => (first, last),
            _ => return Err(invalid(&pos, "number range needs two bounds")),
        };
        self.c.add_number_range(set, &name, first, last, pos)?;
        if let Some(range) = self.c.parameter_sets[set.index()].number_ranges.last_mut() {
            range.docs = docs;
        }
        Ok(())
    }

    fn build_group(&mut self, set: ParamSetId, pair: Pair<Rule>) -> CompileResult<()> {
        let pos = self.pos(&pair);
        let mut docs = Docs::default();
        let mut idents = Vec::new();
        let mut group = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::doc if group.is_none() => docs = doc_text(&inner),
                Rule::ident => idents.push(inner.as_str().to_string()),
                Rule::param_decl => {
                    let g = match group {
                        Some(g) => g,
                        None => {
                            let g = self.open_group(set, &idents, std::mem::take(&mut docs), &pos);
                            group = Some(g);
                            g
                        }
                    };
                    self.build_param(set, g, inner)?;
                }
                _ => {}
            }
        }
        if group.is_none() {
            self.open_group(set, &idents, docs, &pos);
        }
        self.c.cursor.group = None;
        Ok(())
    }

    fn open_group(&mut self, set: ParamSetId, idents: &[String], docs: Docs, pos: &Position) -> usize {
        let name = idents.first().map(String::as_str).unwrap_or(DEFAULT_GROUP);
        let category = idents.get(1).map(String::as_str);
        let ps = &mut self.c.parameter_sets[set.index()];
        let g = ps.group(name, category, pos);
        if !docs.is_empty() {
            ps.groups[g].docs = docs;
        }
        self.c.cursor.group = Some(g);
        g
    }

    fn build_param(&mut self, set: ParamSetId, group: usize, pair: Pair<Rule>) -> CompileResult<()> {
        let pos = self.pos(&pair);
        let mut docs = Docs::default();
        let mut is_virtual = false;
        let mut idents = Vec::with_capacity(2);
        let mut id = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::doc => docs = doc_text(&inner),
                Rule::kw_virtual => is_virtual = true,
                Rule::ident => {
                    idents.push(inner.as_str().to_string());
                    if let [type_name, name] = &idents[..] {
                        let p = self.c.create_parameter(set, type_name, name, group, self.pos(&inner))?;
                        self.c.parameters[p].is_virtual = is_virtual;
                        self.c.parameters[p].docs = std::mem::take(&mut docs);
                        id = Some(p);
                    }
                }
                Rule::parent => {
                    let p = id.ok_or_else(|| invalid(&pos, "parent before parameter name"))?;
                    let target = inner.into_inner().next().ok_or_else(|| invalid(&pos, "missing parent"))?;
                    let parent = self.resolve_qualified(set, &target)?;
                    self.c.add_parent_parameter(p, parent)?;
                }
                Rule::property => {
                    let p = id.ok_or_else(|| invalid(&pos, "property before parameter name"))?;
                    let mut it = inner.into_inner();
                    let key = it.next().map(|k| k.as_str().to_string()).unwrap_or_default();
                    let value = it.next().ok_or_else(|| invalid(&pos, "missing property value"))?;
                    let value = match value.as_rule() {
                        Rule::int => PropertyValue::Number(
                            parse_int(value.as_str())
                                .ok_or_else(|| invalid(&pos, &format!("invalid number '{}'", value.as_str())))?,
                        ),
                        Rule::string => PropertyValue::Str(unquote(&value)),
                        _ => PropertyValue::Ident(value.as_str().to_string()),
                    };
                    self.c.parameters[p].set_property(&key, value)?;
                }
                Rule::member_list => {
                    let p = id.ok_or_else(|| invalid(&pos, "members before parameter name"))?;
                    self.build_members(set, p, inner)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Inline enumerators synthesize a list named after the parameter; bag members become
    /// parameter list entries.
    fn build_members(&mut self, set: ParamSetId, param: ParamId, pair: Pair<Rule>) -> CompileResult<()> {
        let pos = self.pos(&pair);
        let name = self.c.parameters[param].name.clone();
        match self.c.parameters[param].kind {
            ParamKind::Enum(_) => {
                let mut list = EnumeratorList::new(name.clone(), pos);
                self.fill_enumerators(&mut list, pair)?;
                self.c.add_enumerator_list(set, list)?;
                self.c.parameters[param].set_property("values", PropertyValue::Ident(name.clone()))?;
                log::debug!("enum '{}': synthesized enumerator list", name);
                Ok(())
            }
            ParamKind::Bag(_) => {
                for member in pair.into_inner().filter(|p| p.as_rule() == Rule::member) {
                    let entry = self.build_entry(set, member, Direction::None)?;
                    self.c.add_bag_entry(param, entry)?;
                }
                Ok(())
            }
            _ => Err(invalid(&pos, &format!("parameter '{}' does not take a member list", name))),
        }
    }

    /// A parameter reference with its modifiers; `default` applies when no direction is
    /// written.
    fn build_entry(&self, set: ParamSetId, pair: Pair<Rule>, default: Direction) -> CompileResult<ParameterListEntry> {
        let pos = self.pos(&pair);
        let mut entry = ParameterListEntry::new(set, String::new(), pos.clone());
        entry.direction = default;
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::direction => {
                    entry.direction = Direction::parse(part.as_str())
                        .ok_or_else(|| invalid(&pos, &format!("invalid direction '{}'", part.as_str())))?;
                }
                Rule::kw_optional => entry.optional = true,
                Rule::kw_multiple => entry.multiple = true,
                Rule::qualified => {
                    let (qualifier, name) = split_qualified(&part);
                    if let Some(q) = qualifier {
                        entry.paramset = self.c.find_parameter_set(q).ok_or_else(|| CompileError::UndefinedReference {
                            pos: pos.clone(),
                            what: "parameter set",
                            name: q.to_string(),
                        })?;
                    }
                    entry.name = name.to_string();
                }
                Rule::ident => entry.field_name = Some(part.as_str().to_string()),
                Rule::doc => {}
                _ => {
                    return Err(invalid(&pos, &format!("unexpected '{}' in parameter list", part.as_str())));
                }
            }
        }
        Ok(entry)
    }

    fn resolve_qualified(&self, set: ParamSetId, pair: &Pair<Rule>) -> CompileResult<ParamId> {
        let pos = self.pos(pair);
        let (qualifier, name) = split_qualified(pair);
        let set = match qualifier {
            Some(q) => self.c.find_parameter_set(q).ok_or_else(|| CompileError::UndefinedReference {
                pos: pos.clone(),
                what: "parameter set",
                name: q.to_string(),
            })?,
            None => set,
        };
        self.c.find_parameter(set, name).ok_or_else(|| CompileError::UndefinedReference {
            pos,
            what: "parameter",
            name: pair.as_str().to_string(),
        })
    }

    // ==================== Categories ====================

    fn build_category(&mut self, pair: Pair<Rule>) -> CompileResult<()> {
        let pos = self.pos(&pair);
        let mut docs = Docs::default();
        let mut idents = Vec::with_capacity(2);
        let mut cat = None;
        for inner in pair.into_inner() {
            if cat.is_none() && !matches!(inner.as_rule(), Rule::doc | Rule::ident) {
                cat = Some(self.open_category(&idents, std::mem::take(&mut docs), &pos)?);
            }
            match inner.as_rule() {
                Rule::doc if cat.is_none() => docs = doc_text(&inner),
                Rule::ident => idents.push(inner.as_str().to_string()),
                Rule::category_paramset => {
                    let cat = current(cat)?;
                    let name = inner.into_inner().next().map(|p| p.as_str()).unwrap_or_default();
                    let set = self.c.find_parameter_set(name).ok_or_else(|| CompileError::UndefinedReference {
                        pos: pos.clone(),
                        what: "parameter set",
                        name: name.to_string(),
                    })?;
                    self.c.set_category_paramset(cat, set);
                }
                Rule::message_bag => self.build_message_bag(current(cat)?, inner)?,
                Rule::command_decl => self.build_command(current(cat)?, inner)?,
                Rule::event_decl => self.build_event(current(cat)?, inner)?,
                _ => {}
            }
        }
        if cat.is_none() {
            self.open_category(&idents, docs, &pos)?;
        }
        self.c.cursor.category = None;
        Ok(())
    }

    fn open_category(&mut self, idents: &[String], docs: Docs, pos: &Position) -> CompileResult<CategoryId> {
        let name = idents.first().map(String::as_str).unwrap_or_default();
        let parent = idents.get(1).map(String::as_str);
        let cat = self.c.add_category(name, parent, pos.clone())?;
        self.c.categories[cat].docs = docs;
        Ok(cat)
    }

    fn build_message_bag(&mut self, cat: CategoryId, pair: Pair<Rule>) -> CompileResult<()> {
        let pos = self.pos(&pair);
        let mut it = pair.into_inner();
        let kind = match it.next().map(|p| p.as_str()) {
            Some("command_bag") => MessageKind::Command,
            Some("response_bag") => MessageKind::Response,
            Some("event_bag") => MessageKind::Event,
            other => return Err(invalid(&pos, &format!("unknown message bag '{}'", other.unwrap_or_default()))),
        };
        let name = it.next().map(|p| p.as_str());
        self.c.add_message_bag(cat, kind, name, pos)?;
        Ok(())
    }

    fn category_set(&self, cat: CategoryId, pos: &Position) -> CompileResult<ParamSetId> {
        self.c.category_paramset(cat).ok_or_else(|| {
            invalid(
                pos,
                &format!("category '{}' has no parameter set", self.c.category(cat).name),
            )
        })
    }

    fn build_command(&mut self, cat: CategoryId, pair: Pair<Rule>) -> CompileResult<()> {
        let pos = self.pos(&pair);
        let set = self.category_set(cat, &pos)?;
        let mut docs = Docs::default();
        let mut idx = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::doc => docs = doc_text(&inner),
                Rule::ident => {
                    idx = Some(self.c.add_command(cat, inner.as_str(), std::mem::take(&mut docs), pos.clone())?);
                }
                Rule::command_args | Rule::response_args => {
                    let i = idx.ok_or_else(|| invalid(&pos, "arguments before command name"))?;
                    let default = if inner.as_rule() == Rule::command_args {
                        Direction::In
                    } else {
                        Direction::Out
                    };
                    for e in inner.into_inner() {
                        let entry = self.build_entry(set, e, default)?;
                        self.c.add_command_parameter_list_entry(cat, i, entry)?;
                    }
                }
                Rule::response_doc => {
                    let i = idx.ok_or_else(|| invalid(&pos, "response doc before command name"))?;
                    if let Some(doc) = inner.into_inner().next() {
                        self.c.categories[cat].commands[i].response_docs = doc_text(&doc);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn build_event(&mut self, cat: CategoryId, pair: Pair<Rule>) -> CompileResult<()> {
        let pos = self.pos(&pair);
        let set = self.category_set(cat, &pos)?;
        let mut docs = Docs::default();
        let mut idx = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::doc => docs = doc_text(&inner),
                Rule::ident => {
                    idx = Some(self.c.add_event(cat, inner.as_str(), std::mem::take(&mut docs), pos.clone())?);
                }
                Rule::event_args => {
                    let i = idx.ok_or_else(|| invalid(&pos, "arguments before event name"))?;
                    for e in inner.into_inner() {
                        let entry = self.build_entry(set, e, Direction::None)?;
                        self.c.add_event_parameter_list_entry(cat, i, entry)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

// ==================== Helpers ====================

fn current<T: Copy>(id: Option<T>) -> CompileResult<T> {
    id.ok_or_else(|| CompileError::Parse {
        file: String::new(),
        message: "declaration outside of its container".to_string(),
    })
}

fn invalid(pos: &Position, message: &str) -> CompileError {
    CompileError::Invalid {
        pos: pos.clone(),
        message: message.to_string(),
    }
}

fn split_qualified<'a>(pair: &Pair<'a, Rule>) -> (Option<&'a str>, &'a str) {
    match pair.as_str().split_once("::") {
        Some((set, name)) => (Some(set), name),
        None => (None, pair.as_str()),
    }
}

/// Decimal or `0x` hex, optionally negative.
fn parse_int(s: &str) -> Option<i64> {
    let (neg, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let n = match digits.strip_prefix("0x") {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if neg { -n } else { n })
}

fn unquote(pair: &Pair<Rule>) -> String {
    let inner = pair
        .clone()
        .into_inner()
        .next()
        .map(|p| p.as_str())
        .unwrap_or_default();
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            },
            _ => out.push(ch),
        }
    }
    out
}

fn value_text(pair: &Pair<Rule>) -> String {
    match pair.as_rule() {
        Rule::string => unquote(pair),
        _ => pair.as_str().to_string(),
    }
}

/// Strip comment markers: `/** ... */` loses its delimiters and the leading `*` of each
/// line, `///` loses the slashes and one space.
fn doc_text(pair: &Pair<Rule>) -> Docs {
    let mut lines = Vec::new();
    for part in pair.clone().into_inner() {
        let s = part.as_str();
        match part.as_rule() {
            Rule::doc_block => {
                let body = s.trim_start_matches("/**").trim_end_matches("*/");
                for line in body.lines() {
                    let t = line.trim();
                    let t = t.strip_prefix('*').map(|r| r.strip_prefix(' ').unwrap_or(r)).unwrap_or(t);
                    lines.push(t.trim_end().to_string());
                }
            }
            Rule::doc_line => {
                let t = s.trim_start_matches('/');
                lines.push(t.strip_prefix(' ').unwrap_or(t).trim_end().to_string());
            }
            _ => {}
        }
    }
    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    Docs::from_raw(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> CompileResult<Compiler> {
        let mut c = Compiler::new();
        parse_str(&mut c, src, "test.mpl")?;
        Ok(c)
    }

    #[test]
    fn test_parse_paramset() {
        let c = parse(
            r#"
            parameter_set P {
                prefix = "pp";
                id = 0x10;
                enumerator_list colors { red, green = 3, blue }
                number_range small = 0..99;
                group basic {
                    uint8 x min = 0 max = 10 default = 1;
                    enum8 c values = colors default = red;
                }
                bool flag;
            }
            "#,
        )
        .unwrap();
        let ps = &c.parameter_sets[0];
        assert_eq!(ps.prefix(), "pp");
        assert_eq!(ps.numeric_id, Some(16));
        let colors = ps.find_enumerator_list("colors").unwrap();
        assert_eq!(colors.resolved_values(), vec![("red", 0), ("green", 3), ("blue", 4)]);
        assert!(ps.find_number_range("small").is_some());
        assert!(ps.find_group("basic").is_some());
        let flag = c.find_parameter(ParamSetId(0), "flag").unwrap();
        assert_eq!(ps.groups[c.parameters[flag].group].name, DEFAULT_GROUP);
        let x = c.find_parameter(ParamSetId(0), "x").unwrap();
        match &c.parameters[x].kind {
            ParamKind::Int(i) => assert_eq!((i.min, i.max, i.default), (Some(0), Some(10), Some(1))),
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn test_inline_enum_synthesizes_list() {
        let c = parse("parameter_set P { enum e { a, b = 4 } }").unwrap();
        let list = c.parameter_sets[0].find_enumerator_list("e").unwrap();
        assert_eq!(list.names(), vec!["a", "b"]);
        let e = c.find_parameter(ParamSetId(0), "e").unwrap();
        match &c.parameters[e].kind {
            ParamKind::Enum(spec) => assert_eq!(spec.values.as_deref(), Some("e")),
            k => panic!("unexpected kind {:?}", k),
        }
    }

    #[test]
    fn test_bag_members_and_parent() {
        let c = parse(
            r#"
            parameter_set P {
                string s;
                virtual bag base;
                bag b : base { x, optional multiple s as name }
                uint8 x;
            }
            "#,
        )
        .unwrap();
        let b = c.find_parameter(ParamSetId(0), "b").unwrap();
        let base = c.find_parameter(ParamSetId(0), "base").unwrap();
        assert!(c.parameters[base].is_virtual);
        assert_eq!(c.parameters[b].lineage.parent(), Some(base));
        let entries = c.parameters[b].parameter_list().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[1].optional && entries[1].multiple);
        assert_eq!(entries[1].field(), "name");
    }

    #[test]
    fn test_doc_comments_are_stripped() {
        let c = parse(
            "/**\n * Set docs.\n * @note second\n */\nparameter_set P {\n    /// the x\n    /// more\n    uint8 x;\n}\n",
        )
        .unwrap();
        assert_eq!(c.parameter_sets[0].docs.raw, vec!["Set docs.", "@note second"]);
        let x = c.find_parameter(ParamSetId(0), "x").unwrap();
        assert_eq!(c.parameters[x].docs.raw, vec!["the x", "more"]);
        assert_eq!(c.parameters[x].pos.line, 8);
    }

    #[test]
    fn test_command_directions() {
        let c = parse(
            r#"
            parameter_set P { uint8 x; uint8 y; string s; }
            category Cat {
                parameter_set = P;
                command_bag;
                response_bag;
                command Do(x, inout optional s) => (y);
            }
            "#,
        )
        .unwrap();
        let cat = c.find_category("Cat").unwrap();
        let cmd = &c.category(cat).commands[0];
        let names = |bag: Option<ParamId>| -> Vec<String> {
            c.parameters[bag.unwrap()]
                .parameter_list()
                .unwrap()
                .iter()
                .map(|e| e.name.clone())
                .collect()
        };
        assert_eq!(names(cmd.command_bag), vec!["x", "s"]);
        assert_eq!(names(cmd.response_bag), vec!["s", "y"]);
    }

    #[test]
    fn test_qualified_reference() {
        let c = parse(
            r#"
            parameter_set A { uint8 shared; }
            parameter_set B { bag b { A::shared } }
            "#,
        )
        .unwrap();
        let b = c.find_parameter(ParamSetId(1), "b").unwrap();
        let entry = &c.parameters[b].parameter_list().unwrap()[0];
        assert_eq!(entry.paramset, ParamSetId(0));
        assert!(c.resolve(entry).is_some());
    }

    #[test]
    fn test_parse_error_has_location() {
        let err = parse("parameter_set P { uint8 ; }").unwrap_err();
        match err {
            CompileError::Parse { file, message } => {
                assert_eq!(file, "test.mpl");
                assert!(message.contains("1:"), "{}", message);
            }
            e => panic!("unexpected error {}", e),
        }
    }

    #[test]
    fn test_unknown_option_rejected() {
        let err = parse("option P colour = red;").unwrap_err();
        assert!(matches!(err, CompileError::InvalidOption { .. }));
    }
}

//! Documentation conversion.
//!
//! Raw doc comments are re-parsed into a token stream of free text and `@tag` entries,
//! then rendered three ways: Doxygen, LaTeX and plain CLI help. What a tag may refer to
//! depends on the object it documents: `@param` is only meaningful on commands, events
//! and bags, and on a command it is split by direction between the command side and the
//! response side. Labels the core does not know are offered to a [`LocalTagHandler`]
//! before being rejected.

use crate::category::CategoryId;
use crate::compiler::Compiler;
use crate::error::{CompileError, CompileResult, Position};
use crate::escape;
use crate::object::{DocEntry, Docs};
use crate::parameter::{Direction, ParamId, ParameterListEntry};

/// Tags whose first word is text rather than an argument.
const NO_ARG_TAGS: [&str; 3] = ["brief", "note", "return"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocToken {
    /// Free text. `continuation` is set when it directly follows a tag line with no blank
    /// line in between, and then belongs to that tag.
    Text { text: String, continuation: bool },
    Tag {
        label: String,
        arg: Option<String>,
        text: String,
    },
}

/// Split raw doc text into tokens. Consecutive text lines are joined with a space; a blank
/// line ends a paragraph.
pub fn tokenize(raw: &str) -> Vec<DocToken> {
    let mut tokens = Vec::new();
    let mut pending: Vec<&str> = Vec::new();
    let mut pending_continues = false;
    let mut after_tag = false;

    fn flush(tokens: &mut Vec<DocToken>, pending: &mut Vec<&str>, continuation: bool) {
        if !pending.is_empty() {
            tokens.push(DocToken::Text {
                text: pending.join(" "),
                continuation,
            });
            pending.clear();
        }
    }

    for line in raw.lines().map(str::trim) {
        if line.is_empty() {
            flush(&mut tokens, &mut pending, pending_continues);
            after_tag = false;
        } else if let Some(rest) = line.strip_prefix('@') {
            flush(&mut tokens, &mut pending, pending_continues);
            let (label, rest) = split_word(rest);
            let (arg, text) = if NO_ARG_TAGS.contains(&label) {
                (None, rest)
            } else {
                let (a, t) = split_word(rest);
                (Some(a).filter(|a| !a.is_empty()), t)
            };
            tokens.push(DocToken::Tag {
                label: label.to_string(),
                arg: arg.map(str::to_string),
                text: text.to_string(),
            });
            after_tag = true;
        } else {
            if pending.is_empty() {
                pending_continues = after_tag;
            }
            pending.push(line);
        }
    }
    flush(&mut tokens, &mut pending, pending_continues);
    tokens
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

/// Output flavour of a derived doc list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocTarget {
    Dox,
    Latex,
    Help,
}

const TARGETS: [DocTarget; 3] = [DocTarget::Dox, DocTarget::Latex, DocTarget::Help];

/// Hook for tags the core conversion does not recognize. Returning `None` leaves the tag
/// unsupported, which is an error.
pub trait LocalTagHandler {
    fn convert_locally_defined_dox_entry(&self, label: &str, arg: Option<&str>, text: &str) -> Option<DocEntry>;
    fn convert_locally_defined_latex_entry(&self, label: &str, arg: Option<&str>, text: &str) -> Option<DocEntry>;
    fn convert_locally_defined_help_entry(&self, label: &str, arg: Option<&str>, text: &str) -> Option<DocEntry>;
}

/// Recognizes nothing beyond the core tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocalTags;

impl LocalTagHandler for NoLocalTags {
    fn convert_locally_defined_dox_entry(&self, _: &str, _: Option<&str>, _: &str) -> Option<DocEntry> {
        None
    }
    fn convert_locally_defined_latex_entry(&self, _: &str, _: Option<&str>, _: &str) -> Option<DocEntry> {
        None
    }
    fn convert_locally_defined_help_entry(&self, _: &str, _: Option<&str>, _: &str) -> Option<DocEntry> {
        None
    }
}

/// `@at <COMMAND> text`: the AT command a message maps to, used by modem-facing
/// parameter sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtCommandTags;

impl LocalTagHandler for AtCommandTags {
    fn convert_locally_defined_dox_entry(&self, label: &str, arg: Option<&str>, text: &str) -> Option<DocEntry> {
        (label == "at").then(|| {
            let body = format!("{} {}", escape::dox(arg.unwrap_or_default()), escape::dox(text));
            DocEntry::tagged("at", arg, format!("@par AT command:\n{}", body.trim_end()))
        })
    }

    fn convert_locally_defined_latex_entry(&self, label: &str, arg: Option<&str>, text: &str) -> Option<DocEntry> {
        (label == "at").then(|| {
            let cmd = escape::latex(arg.unwrap_or_default());
            let body = format!("\\textbf{{AT command:}} \\texttt{{{}}} {}", cmd, escape::latex(text));
            DocEntry::tagged("at", arg, body.trim_end().to_string())
        })
    }

    fn convert_locally_defined_help_entry(&self, label: &str, arg: Option<&str>, text: &str) -> Option<DocEntry> {
        (label == "at").then(|| {
            let body = format!("AT command: {} {}", arg.unwrap_or_default(), text);
            DocEntry::tagged("at", arg, body.trim_end().to_string())
        })
    }
}

/// Which `@param` names an object accepts, and which of them it documents.
struct ParamScope<'a> {
    /// Entries rendered on this side.
    side: Vec<&'a ParameterListEntry>,
    /// Every entry of the owner on any side; names outside this set are errors.
    all: Vec<&'a ParameterListEntry>,
}

impl ParamScope<'_> {
    fn names<'e>(entries: &[&'e ParameterListEntry], name: &str) -> Option<&'e ParameterListEntry> {
        entries.iter().copied().find(|e| e.field() == name || e.name == name)
    }
}

/// What the tags of one object may refer to.
struct Subject<'a> {
    owner: String,
    params: Option<ParamScope<'a>>,
    ingroup: bool,
    pos: Position,
}

impl<'a> Subject<'a> {
    fn plain(owner: &str, pos: &Position) -> Self {
        Subject {
            owner: owner.to_string(),
            params: None,
            ingroup: false,
            pos: pos.clone(),
        }
    }
}

enum Rendered {
    Entry(DocEntry),
    /// Recognized, renders nothing for this target.
    Nothing,
    /// `@param` belonging to the other side of a command; its continuation is dropped too.
    Skip,
}

fn render(
    target: DocTarget,
    subject: &Subject<'_>,
    label: &str,
    arg: Option<&str>,
    text: &str,
    hooks: &dyn LocalTagHandler,
) -> CompileResult<Rendered> {
    let a = arg.unwrap_or_default();
    let entry = |dox: String, latex: String, help: String| {
        let t = match target {
            DocTarget::Dox => dox,
            DocTarget::Latex => latex,
            DocTarget::Help => help,
        };
        Rendered::Entry(DocEntry::tagged(label, arg, t.trim_end().to_string()))
    };
    match label {
        "brief" => Ok(entry(
            format!("@brief {}", escape::dox(text)),
            escape::latex(text),
            text.to_string(),
        )),
        "note" => Ok(entry(
            format!("@note {}", escape::dox(text)),
            format!("\\textbf{{Note:}} {}", escape::latex(text)),
            format!("Note: {}", text),
        )),
        "return" => Ok(entry(
            format!("@return {}", escape::dox(text)),
            format!("\\textbf{{Returns:}} {}", escape::latex(text)),
            format!("Returns: {}", text),
        )),
        "see" => Ok(entry(
            format!("@see {} {}", a, escape::dox(text)),
            format!("\\textit{{See also}} \\texttt{{{}}} {}", escape::latex(a), escape::latex(text)),
            format!("See also: {} {}", a, text),
        )),
        "ingroup" if subject.ingroup => Ok(match target {
            DocTarget::Dox => Rendered::Entry(DocEntry::tagged(label, arg, format!("@ingroup {}", a))),
            DocTarget::Latex | DocTarget::Help => Rendered::Nothing,
        }),
        "param" if subject.params.is_some() => {
            let scope = match &subject.params {
                Some(s) => s,
                None => return Ok(Rendered::Nothing),
            };
            if ParamScope::names(&scope.all, a).is_none() {
                return Err(CompileError::UnknownDocParameter {
                    pos: subject.pos.clone(),
                    owner: subject.owner.clone(),
                    name: a.to_string(),
                });
            }
            if ParamScope::names(&scope.side, a).is_none() {
                return Ok(Rendered::Skip);
            }
            Ok(entry(
                format!("@param {} {}", a, escape::dox(text)),
                format!("\\item[\\texttt{{{}}}] {}", escape::latex(a), escape::latex(text)),
                format!("{}: {}", a, text),
            ))
        }
        _ => {
            let local = match target {
                DocTarget::Dox => hooks.convert_locally_defined_dox_entry(label, arg, text),
                DocTarget::Latex => hooks.convert_locally_defined_latex_entry(label, arg, text),
                DocTarget::Help => hooks.convert_locally_defined_help_entry(label, arg, text),
            };
            local.map(Rendered::Entry).ok_or_else(|| CompileError::UnsupportedDocTag {
                pos: subject.pos.clone(),
                label: label.to_string(),
            })
        }
    }
}

fn render_text(target: DocTarget, text: &str) -> String {
    match target {
        DocTarget::Dox => escape::dox(text),
        DocTarget::Latex => escape::latex(text),
        DocTarget::Help => text.to_string(),
    }
}

/// Convert one token stream for one target.
fn convert_tokens(
    tokens: &[DocToken],
    target: DocTarget,
    subject: &Subject<'_>,
    hooks: &dyn LocalTagHandler,
) -> CompileResult<Vec<DocEntry>> {
    let mut out: Vec<DocEntry> = Vec::new();
    // Whether the last tag produced the entry a continuation should extend.
    let mut last_tag_kept = false;
    let mut skipping = false;
    for token in tokens {
        match token {
            DocToken::Text { text, continuation } => {
                if *continuation && skipping {
                    continue;
                }
                let rendered = render_text(target, text);
                match out.last_mut() {
                    Some(last) if *continuation && last_tag_kept => {
                        last.text.push(' ');
                        last.text.push_str(&rendered);
                    }
                    _ => out.push(DocEntry::text(rendered)),
                }
                skipping = false;
                last_tag_kept = false;
            }
            DocToken::Tag { label, arg, text } => {
                match render(target, subject, label, arg.as_deref(), text, hooks)? {
                    Rendered::Entry(e) => {
                        out.push(e);
                        last_tag_kept = true;
                        skipping = false;
                    }
                    Rendered::Nothing => {
                        last_tag_kept = false;
                        skipping = false;
                    }
                    Rendered::Skip => {
                        last_tag_kept = false;
                        skipping = true;
                    }
                }
            }
        }
    }
    Ok(out)
}

type Derived = (Vec<DocEntry>, Vec<DocEntry>, Vec<DocEntry>);

/// Derive all three lists of `raw` for `subject`.
fn derive(raw: &Docs, subject: &Subject<'_>, hooks: &dyn LocalTagHandler) -> CompileResult<Derived> {
    let tokens = tokenize(&raw.raw_text());
    let mut lists = TARGETS
        .iter()
        .map(|&t| convert_tokens(&tokens, t, subject, hooks))
        .collect::<CompileResult<Vec<_>>>()?
        .into_iter();
    let mut next = || lists.next().unwrap_or_default();
    Ok((next(), next(), next()))
}

fn apply(docs: &mut Docs, derived: Derived) {
    let (dox, latex, help) = derived;
    docs.set_derived(dox, latex, help);
}

fn bag_entries(c: &Compiler, bag: Option<ParamId>) -> Vec<&ParameterListEntry> {
    bag.and_then(|b| c.parameters[b].parameter_list())
        .map(|l| l.iter().collect())
        .unwrap_or_default()
}

/// Scope of one side of a command: entries of `side` whose direction passes `dir`.
fn sided<'a>(
    side: &[&'a ParameterListEntry],
    all: &[&'a ParameterListEntry],
    dir: fn(Direction) -> bool,
) -> ParamScope<'a> {
    ParamScope {
        side: side.iter().copied().filter(|e| dir(e.direction)).collect(),
        all: all.to_vec(),
    }
}

/// Which object a derived doc block belongs to.
enum Target {
    ParamSet(usize),
    Group(usize, usize),
    EnumList(usize, usize),
    EnumValue(usize, usize, usize),
    Range(usize, usize),
    Parameter(ParamId),
    Category(CategoryId),
    Command(CategoryId, usize),
    CommandResponse(CategoryId, usize),
    Event(CategoryId, usize),
}

/// Run the conversion over every object, parameter sets and categories first. Derived
/// lists are replaced, so running twice gives the same result.
pub fn convert_all(c: &mut Compiler, hooks: &dyn LocalTagHandler) -> CompileResult<()> {
    let mut results: Vec<(Target, Derived)> = Vec::new();

    for (si, set) in c.parameter_sets.iter().enumerate() {
        let mut subject = Subject::plain(&set.name, &set.pos);
        results.push((Target::ParamSet(si), derive(&set.docs, &subject, hooks)?));
        for (gi, g) in set.groups.iter().enumerate() {
            subject = Subject::plain(&g.name, &g.pos);
            subject.ingroup = true;
            results.push((Target::Group(si, gi), derive(&g.docs, &subject, hooks)?));
        }
        for (li, l) in set.enumerator_lists.iter().enumerate() {
            results.push((Target::EnumList(si, li), derive(&l.docs, &Subject::plain(&l.name, &l.pos), hooks)?));
            for (vi, v) in l.values.iter().enumerate() {
                results.push((
                    Target::EnumValue(si, li, vi),
                    derive(&v.docs, &Subject::plain(&v.name, &v.pos), hooks)?,
                ));
            }
        }
        for (ri, r) in set.number_ranges.iter().enumerate() {
            results.push((Target::Range(si, ri), derive(&r.docs, &Subject::plain(&r.name, &r.pos), hooks)?));
        }
    }

    for (cid, cat) in c.categories.iter() {
        let mut subject = Subject::plain(&cat.name, &cat.pos);
        subject.ingroup = true;
        results.push((Target::Category(cid), derive(&cat.docs, &subject, hooks)?));

        for (i, cmd) in cat.commands.iter().enumerate() {
            let cmd_side = bag_entries(c, cmd.command_bag);
            let resp_side = bag_entries(c, cmd.response_bag);
            let all: Vec<&ParameterListEntry> = cmd_side.iter().chain(resp_side.iter()).copied().collect();
            let owner = format!("{}.{}", cat.name, cmd.name);
            let command_subject = Subject {
                owner: owner.clone(),
                params: Some(sided(&cmd_side, &all, Direction::is_in)),
                ingroup: false,
                pos: cmd.pos.clone(),
            };
            let response_subject = Subject {
                owner,
                params: Some(sided(&resp_side, &all, Direction::is_out)),
                ingroup: false,
                pos: cmd.pos.clone(),
            };
            results.push((Target::Command(cid, i), derive(&cmd.docs, &command_subject, hooks)?));
            results.push((
                Target::CommandResponse(cid, i),
                derive(&cmd.docs, &response_subject, hooks)?,
            ));
        }
        for (i, ev) in cat.events.iter().enumerate() {
            let side = bag_entries(c, ev.event_bag);
            let subject = Subject {
                owner: format!("{}.{}", cat.name, ev.name),
                params: Some(ParamScope {
                    side: side.clone(),
                    all: side,
                }),
                ingroup: false,
                pos: ev.pos.clone(),
            };
            results.push((Target::Event(cid, i), derive(&ev.docs, &subject, hooks)?));
        }
    }

    for (pid, p) in c.parameters.iter() {
        let subject = match p.parameter_list() {
            Some(_) => {
                let fields = c.bag_fields(pid);
                Subject {
                    owner: p.name.clone(),
                    params: Some(ParamScope {
                        side: fields.clone(),
                        all: fields,
                    }),
                    ingroup: false,
                    pos: p.pos.clone(),
                }
            }
            None => Subject::plain(&p.name, &p.pos),
        };
        results.push((Target::Parameter(pid), derive(&p.docs, &subject, hooks)?));
    }

    let count = results.len();
    for (target, derived) in results {
        match target {
            Target::ParamSet(s) => apply(&mut c.parameter_sets[s].docs, derived),
            Target::Group(s, g) => apply(&mut c.parameter_sets[s].groups[g].docs, derived),
            Target::EnumList(s, l) => apply(&mut c.parameter_sets[s].enumerator_lists[l].docs, derived),
            Target::EnumValue(s, l, v) => {
                apply(&mut c.parameter_sets[s].enumerator_lists[l].values[v].docs, derived)
            }
            Target::Range(s, r) => apply(&mut c.parameter_sets[s].number_ranges[r].docs, derived),
            Target::Parameter(p) => apply(&mut c.parameters[p].docs, derived),
            Target::Category(cid) => apply(&mut c.categories[cid].docs, derived),
            Target::Command(cid, i) => apply(&mut c.categories[cid].commands[i].docs, derived),
            Target::CommandResponse(cid, i) => {
                apply(&mut c.categories[cid].commands[i].response_docs, derived)
            }
            Target::Event(cid, i) => apply(&mut c.categories[cid].events[i].docs, derived),
        }
    }
    log::debug!("converted documentation of {} objects", count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paramset::ParamSetId;

    fn entry(name: &str, dir: Direction) -> ParameterListEntry {
        let mut e = ParameterListEntry::new(ParamSetId(0), name, Position::default());
        e.direction = dir;
        e
    }

    #[test]
    fn tokenize_tags_and_continuations() {
        let toks = tokenize("Does a thing.\n\n@param x the x\n  more about x\n\nTrailing.");
        assert_eq!(toks.len(), 4);
        assert_eq!(
            toks[1],
            DocToken::Tag {
                label: "param".into(),
                arg: Some("x".into()),
                text: "the x".into()
            }
        );
        assert_eq!(
            toks[2],
            DocToken::Text {
                text: "more about x".into(),
                continuation: true
            }
        );
        assert_eq!(
            toks[3],
            DocToken::Text {
                text: "Trailing.".into(),
                continuation: false
            }
        );
    }

    #[test]
    fn wrong_side_param_and_its_continuation_dropped() {
        let x = entry("x", Direction::In);
        let y = entry("y", Direction::Out);
        let subject = Subject {
            owner: "C.Do".into(),
            params: Some(ParamScope {
                side: vec![&x],
                all: vec![&x, &y],
            }),
            ingroup: false,
            pos: Position::default(),
        };
        let toks = tokenize("@param x in x\n@param y out y\nstill y\n\nEnd.");
        let dox = convert_tokens(&toks, DocTarget::Dox, &subject, &NoLocalTags).unwrap();
        let texts: Vec<&str> = dox.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["@param x in x", "End."]);
    }

    #[test]
    fn unknown_param_name_is_an_error() {
        let x = entry("x", Direction::In);
        let subject = Subject {
            owner: "C.Do".into(),
            params: Some(ParamScope {
                side: vec![&x],
                all: vec![&x],
            }),
            ingroup: false,
            pos: Position::default(),
        };
        let toks = tokenize("@param z nope");
        assert!(matches!(
            convert_tokens(&toks, DocTarget::Help, &subject, &NoLocalTags),
            Err(CompileError::UnknownDocParameter { .. })
        ));
    }

    #[test]
    fn local_tags_go_through_the_hook() {
        let subject = Subject::plain("p", &Position::default());
        let toks = tokenize("@at +CFUN sets functionality");
        assert!(matches!(
            convert_tokens(&toks, DocTarget::Dox, &subject, &NoLocalTags),
            Err(CompileError::UnsupportedDocTag { .. })
        ));
        let help = convert_tokens(&toks, DocTarget::Help, &subject, &AtCommandTags).unwrap();
        assert_eq!(help[0].text, "AT command: +CFUN sets functionality");
    }

    #[test]
    fn param_not_recognized_on_plain_objects() {
        let subject = Subject::plain("p", &Position::default());
        let toks = tokenize("@param x whatever");
        assert!(convert_tokens(&toks, DocTarget::Dox, &subject, &NoLocalTags).is_err());
    }

    #[test]
    fn latex_text_is_escaped() {
        let subject = Subject::plain("p", &Position::default());
        let toks = tokenize("50% of a_b");
        let latex = convert_tokens(&toks, DocTarget::Latex, &subject, &NoLocalTags).unwrap();
        assert_eq!(latex[0].text, "50\\% of a\\_b");
    }
}

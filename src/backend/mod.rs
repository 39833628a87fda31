//! Codegen backends. Each one walks the finished graph read-only and writes straight to a
//! `dyn Write`; none of them assigns or recomputes parameter IDs, they only refer to
//! parameters through the generated symbolic names.
//!
//! [`render`] produces every artifact of a mode in memory, so a failure part way through
//! never leaves a truncated file behind; [`write_all`] then writes them out.

pub mod api;
pub mod cli;
pub mod deja;
pub mod dox;
pub mod latex;
pub mod mpl;

use crate::category::CategoryId;
use crate::compiler::{CodegenMode, Compiler};
use crate::error::{CompileError, CompileResult};
use crate::names;
use crate::parameter::{ParamId, Parameter, ParameterListEntry};
use crate::paramset::ParamSetId;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One output file of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    MplHeader(ParamSetId),
    MplSource(ParamSetId),
    CliHeader(ParamSetId),
    CliSource(ParamSetId),
    ApiHeader(CategoryId),
    ApiSource(CategoryId),
    Dox(ParamSetId),
    Latex(ParamSetId),
    Deja(ParamSetId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// File name relative to the output directory.
    pub file_name: String,
    pub kind: ArtifactKind,
}

/// Artifacts `mode` produces for this graph, in emission order.
pub fn artifacts(c: &Compiler, mode: CodegenMode) -> Vec<Artifact> {
    let mut out = Vec::new();
    let mut push = |file_name: String, kind| out.push(Artifact { file_name, kind });
    match mode {
        CodegenMode::Mpl => {
            for id in c.paramset_ids() {
                let (h, src) = names::mpl_files(&c.paramset(id).name);
                push(h, ArtifactKind::MplHeader(id));
                push(src, ArtifactKind::MplSource(id));
            }
        }
        CodegenMode::Cli => {
            for id in c.paramset_ids().filter(|&id| !c.categories_of_set(id).is_empty()) {
                let (h, src) = names::cli_files(&c.paramset(id).name);
                push(h, ArtifactKind::CliHeader(id));
                push(src, ArtifactKind::CliSource(id));
            }
        }
        CodegenMode::Api => {
            for id in c.categories.top_level() {
                let (h, src) = names::api_files(&c.category(id).name);
                push(h, ArtifactKind::ApiHeader(id));
                push(src, ArtifactKind::ApiSource(id));
            }
        }
        CodegenMode::Doxygen => {
            for id in c.paramset_ids() {
                push(names::dox_file(&c.paramset(id).name), ArtifactKind::Dox(id));
            }
        }
        CodegenMode::Latex => {
            for id in c.paramset_ids() {
                push(names::latex_file(&c.paramset(id).name), ArtifactKind::Latex(id));
            }
        }
        CodegenMode::Deja => {
            for id in c.paramset_ids().filter(|&id| !c.categories_of_set(id).is_empty()) {
                push(names::deja_file(&c.paramset(id).name), ArtifactKind::Deja(id));
            }
        }
    }
    out
}

/// Emit one artifact.
pub fn write_artifact(c: &Compiler, kind: ArtifactKind, out: &mut dyn Write) -> CompileResult<()> {
    match kind {
        ArtifactKind::MplHeader(id) => mpl::write_header(c, id, out),
        ArtifactKind::MplSource(id) => mpl::write_source(c, id, out),
        ArtifactKind::CliHeader(id) => cli::write_header(c, id, out),
        ArtifactKind::CliSource(id) => cli::write_source(c, id, out),
        ArtifactKind::ApiHeader(id) => api::write_header(c, id, out),
        ArtifactKind::ApiSource(id) => api::write_source(c, id, out),
        ArtifactKind::Dox(id) => dox::write(c, id, out),
        ArtifactKind::Latex(id) => latex::write(c, id, out),
        ArtifactKind::Deja(id) => deja::write(c, id, out),
    }
}

/// Render every artifact of `mode` into memory.
pub fn render(c: &Compiler, mode: CodegenMode) -> CompileResult<Vec<(Artifact, Vec<u8>)>> {
    artifacts(c, mode)
        .into_iter()
        .map(|a| {
            let mut buf = Vec::new();
            write_artifact(c, a.kind, &mut buf)?;
            log::debug!("rendered {} ({} bytes)", a.file_name, buf.len());
            Ok((a, buf))
        })
        .collect()
}

/// Render all artifacts of `mode`, then write them under `out_dir`. If one write fails the
/// files already written are removed, so a failed run leaves no partial output.
pub fn write_all(c: &Compiler, mode: CodegenMode, out_dir: &Path) -> CompileResult<Vec<PathBuf>> {
    let rendered = render(c, mode)?;
    let mut written: Vec<PathBuf> = Vec::with_capacity(rendered.len());
    for (artifact, bytes) in rendered {
        let path = out_dir.join(&artifact.file_name);
        if let Err(source) = std::fs::write(&path, bytes) {
            for done in &written {
                if let Err(e) = std::fs::remove_file(done) {
                    log::warn!("could not remove {}: {}", done.display(), e);
                }
            }
            return Err(CompileError::Io {
                path: path.display().to_string(),
                source,
            });
        }
        log::info!("wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

// ---- helpers shared by the backends

/// Short name of the set an entry's parameter lives in.
pub(crate) fn entry_sn<'c>(c: &'c Compiler, e: &ParameterListEntry) -> &'c str {
    c.short_name(e.paramset)
}

pub(crate) fn entry_paramid(c: &Compiler, e: &ParameterListEntry) -> String {
    names::paramid(entry_sn(c, e), &e.name)
}

pub(crate) fn param_sn(c: &Compiler, id: ParamId) -> &str {
    c.short_name(c.parameters[id].paramset)
}

pub(crate) fn param_paramid(c: &Compiler, id: ParamId) -> String {
    names::paramid(param_sn(c, id), &c.parameters[id].name)
}

/// A bag field resolved for emission: the entry, its parameter and its tag.
pub(crate) struct Field<'c> {
    pub entry: &'c ParameterListEntry,
    pub param: &'c Parameter,
    pub tag: usize,
}

/// Fields of a bag including inherited ones. Entries that do not resolve are skipped;
/// the check pass has already rejected them.
pub(crate) fn fields<'c>(c: &'c Compiler, bag: ParamId) -> Vec<Field<'c>> {
    let entries = c.bag_fields(bag);
    entries
        .iter()
        .enumerate()
        .filter_map(|(i, &entry)| {
            let param = c.entry_parameter(entry)?;
            let tag = entries[..i]
                .iter()
                .filter(|o| o.name == entry.name && o.paramset == entry.paramset)
                .count();
            Some(Field { entry, param, tag })
        })
        .collect()
}

/// Bag parameters of a set, in ID order.
pub(crate) fn bags_of(c: &Compiler, set: ParamSetId) -> Vec<ParamId> {
    c.paramset(set)
        .parameters()
        .filter(|&id| c.parameters[id].is_bag())
        .collect()
}

/// Text of a derived doc list, one entry per line.
pub(crate) fn doc_lines(entries: &[crate::object::DocEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.text.as_str()).collect()
}

/// Short human description of a parameter's type and limits.
pub(crate) fn describe(c: &Compiler, p: &Parameter) -> String {
    use crate::parameter::ParamKind;
    let mut s = p.type_name.clone();
    match &p.kind {
        ParamKind::Int(i) => {
            if let (Some(min), Some(max)) = (i.min, i.max) {
                s.push_str(&format!(", {}..{}", min, max));
            }
            if let Some(d) = i.default {
                s.push_str(&format!(", default {}", d));
            }
        }
        ParamKind::Enum(e) => {
            if let Some(list) = e.values.as_deref().and_then(|l| c.paramset(p.paramset).find_enumerator_list(l)) {
                s.push_str(&format!(", one of {}", list.names().join("|")));
            }
            if let Some(d) = &e.default {
                s.push_str(&format!(", default {}", d));
            }
        }
        ParamKind::String(st) => {
            if let Some(m) = st.max_len {
                s.push_str(&format!(", max {} chars", m));
            }
        }
        ParamKind::Array(a) => {
            if let Some(m) = a.max_len {
                s.push_str(&format!(", max {} elements", m));
            }
        }
        ParamKind::Bool(_) | ParamKind::Tuple(_) | ParamKind::Bag(_) | ParamKind::Addr => {}
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Position;
    use crate::parameter::ParameterListEntry;

    #[test]
    fn repeated_fields_get_increasing_tags() {
        let mut c = Compiler::new();
        let set = c.add_parameter_set("P", Position::default()).unwrap();
        let g = c.parameter_sets[0].group("default", None, &Position::default());
        c.create_parameter(set, "uint8", "x", g, Position::default()).unwrap();
        let b = c.create_parameter(set, "bag", "b", g, Position::default()).unwrap();
        for f in ["first", "second"] {
            let mut e = ParameterListEntry::new(set, "x", Position::default());
            e.field_name = Some(f.to_string());
            c.add_bag_entry(b, e).unwrap();
        }
        let tags: Vec<usize> = fields(&c, b).iter().map(|f| f.tag).collect();
        assert_eq!(tags, vec![0, 1]);
    }

    #[test]
    fn artifact_names_per_mode() {
        let mut c = Compiler::new();
        c.add_parameter_set("P", Position::default()).unwrap();
        let names: Vec<String> = artifacts(&c, CodegenMode::Mpl)
            .into_iter()
            .map(|a| a.file_name)
            .collect();
        assert_eq!(names, vec!["P.h", "P.c"]);
        assert!(artifacts(&c, CodegenMode::Cli).is_empty());
    }
}

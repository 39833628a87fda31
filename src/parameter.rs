//! Parameters: the closed set of parameter kinds, their capability queries, and the
//! parameter list entries that describe bag fields.

use crate::error::{CompileError, CompileResult, Position};
use crate::object::{Docs, Lineage, LineageArena};
use crate::paramset::ParamSetId;
use crate::types::{classify, TypeClass};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Index of a parameter in the compiler's parameter arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParamId(pub(crate) usize);

impl ParamId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Direction of a parameter in a command or event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    None,
    In,
    Out,
    InOut,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Direction> {
        match s {
            "in" => Some(Direction::In),
            "out" => Some(Direction::Out),
            "inout" => Some(Direction::InOut),
            _ => None,
        }
    }

    pub fn is_in(self) -> bool {
        matches!(self, Direction::In | Direction::InOut)
    }

    pub fn is_out(self) -> bool {
        matches!(self, Direction::Out | Direction::InOut)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::None => "none",
            Direction::In => "in",
            Direction::Out => "out",
            Direction::InOut => "inout",
        })
    }
}

/// One field occurrence of a parameter inside a bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterListEntry {
    /// Parameter set the referenced parameter lives in.
    pub paramset: ParamSetId,
    /// Name of the referenced parameter.
    pub name: String,
    /// Field-level rename, distinct from the parameter's own name.
    pub field_name: Option<String>,
    pub direction: Direction,
    pub optional: bool,
    pub multiple: bool,
    pub pos: Position,
}

impl ParameterListEntry {
    pub fn new(paramset: ParamSetId, name: impl Into<String>, pos: Position) -> Self {
        ParameterListEntry {
            paramset,
            name: name.into(),
            field_name: None,
            direction: Direction::None,
            optional: false,
            multiple: false,
            pos,
        }
    }

    /// Name of the field: the rename if present, else the parameter name.
    pub fn field(&self) -> &str {
        self.field_name.as_deref().unwrap_or(&self.name)
    }

    /// Same parameter, same parameter set, same field name. Direction and cardinality
    /// are not part of the identity.
    pub fn is_same_as(&self, other: &ParameterListEntry) -> bool {
        self.name == other.name
            && self.paramset == other.paramset
            && self.field_name == other.field_name
    }

    /// Append an independent copy to `dest`.
    pub fn clone_into(&self, dest: &mut Vec<ParameterListEntry>) {
        dest.push(self.clone());
    }
}

/// True if `list` holds an entry that [`ParameterListEntry::is_same_as`] `entry`.
pub fn list_contains(list: &[ParameterListEntry], entry: &ParameterListEntry) -> bool {
    list.iter().any(|e| e.is_same_as(entry))
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntSpec {
    /// Classifier code: 1 for `int`, N for `uintN`, -N for `sintN`.
    pub width: i32,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub default: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoolSpec {
    pub width: i32,
    pub default: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumSpec {
    pub width: i32,
    /// Enumerator list (in the parameter's own set) holding the values.
    pub values: Option<String>,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StringSpec {
    pub wide: bool,
    pub max_len: Option<i64>,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleSpec {
    pub code: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArraySpec {
    pub width: i32,
    pub max_len: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BagSpec {
    pub entries: Vec<ParameterListEntry>,
}

/// Parameter kinds. Backends match on this instead of testing flags one by one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    Int(IntSpec),
    Bool(BoolSpec),
    Enum(EnumSpec),
    String(StringSpec),
    Tuple(TupleSpec),
    Array(ArraySpec),
    Bag(BagSpec),
    Addr,
}

impl ParamKind {
    pub fn from_class(class: TypeClass) -> ParamKind {
        match class {
            TypeClass::Int(width) => ParamKind::Int(IntSpec {
                width,
                ..IntSpec::default()
            }),
            TypeClass::Bool(width) => ParamKind::Bool(BoolSpec {
                width,
                default: None,
            }),
            TypeClass::Enum(width) => ParamKind::Enum(EnumSpec {
                width,
                ..EnumSpec::default()
            }),
            TypeClass::String(code) => ParamKind::String(StringSpec {
                wide: code == 2,
                ..StringSpec::default()
            }),
            TypeClass::Tuple(code) => ParamKind::Tuple(TupleSpec { code }),
            TypeClass::Array(width) => ParamKind::Array(ArraySpec {
                width,
                max_len: None,
            }),
            TypeClass::Bag => ParamKind::Bag(BagSpec::default()),
            TypeClass::Addr => ParamKind::Addr,
        }
    }
}

/// Value of a `key = value` property in a parameter declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Number(i64),
    Str(String),
    Ident(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Number(n) => write!(f, "{}", n),
            PropertyValue::Str(s) => write!(f, "\"{}\"", s),
            PropertyValue::Ident(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    /// Type string as declared (`uint8`, `enum16`, `bag`, ...).
    pub type_name: String,
    pub kind: ParamKind,
    pub paramset: ParamSetId,
    /// Index of the owning group in the parameter set.
    pub group: usize,
    pub is_virtual: bool,
    pub lineage: Lineage<ParamId>,
    pub docs: Docs,
    pub pos: Position,
}

impl Parameter {
    /// Build a parameter from its declared type string.
    pub fn from_type(
        type_name: &str,
        name: &str,
        paramset: ParamSetId,
        group: usize,
        pos: Position,
    ) -> CompileResult<Parameter> {
        let class = classify(type_name).ok_or_else(|| CompileError::UnknownType {
            pos: pos.clone(),
            type_name: type_name.to_string(),
            name: name.to_string(),
        })?;
        Ok(Parameter {
            name: name.to_string(),
            type_name: type_name.to_string(),
            kind: ParamKind::from_class(class),
            paramset,
            group,
            is_virtual: false,
            lineage: Lineage::default(),
            docs: Docs::default(),
            pos,
        })
    }

    pub fn is_int(&self) -> bool {
        matches!(self.kind, ParamKind::Int(_))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.kind, ParamKind::Bool(_))
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.kind, ParamKind::Enum(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self.kind, ParamKind::String(_))
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self.kind, ParamKind::Tuple(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, ParamKind::Array(_))
    }

    pub fn is_bag(&self) -> bool {
        matches!(self.kind, ParamKind::Bag(_))
    }

    pub fn is_addr(&self) -> bool {
        matches!(self.kind, ParamKind::Addr)
    }

    /// Scalar kinds carried by value: int, bool, enum, string.
    pub fn is_basic(&self) -> bool {
        matches!(
            self.kind,
            ParamKind::Int(_) | ParamKind::Bool(_) | ParamKind::Enum(_) | ParamKind::String(_)
        )
    }

    /// Field list of a bag parameter.
    pub fn parameter_list(&self) -> Option<&[ParameterListEntry]> {
        match &self.kind {
            ParamKind::Bag(b) => Some(&b.entries),
            _ => None,
        }
    }

    pub fn parameter_list_mut(&mut self) -> Option<&mut Vec<ParameterListEntry>> {
        match &mut self.kind {
            ParamKind::Bag(b) => Some(&mut b.entries),
            _ => None,
        }
    }

    /// Upper-case macro family name of the type (`UINT8`, `STRINT_TUPLE`, `BAG`, ...).
    pub fn family(&self) -> String {
        self.type_name.to_uppercase()
    }

    /// C type of a value of this parameter. Enums use their width's integer type; the
    /// backends cast to the generated enum typedef where one exists.
    pub fn c_type(&self) -> &'static str {
        match &self.kind {
            ParamKind::Int(s) => int_c_type(s.width),
            ParamKind::Bool(s) if s.width == 8 => "uint8_t",
            ParamKind::Bool(_) => "bool",
            ParamKind::Enum(s) => int_c_type(s.width),
            ParamKind::String(s) if s.wide => "wchar_t*",
            ParamKind::String(_) => "char*",
            ParamKind::Tuple(t) => match t.code {
                1 => "mpl_string_tuple_t",
                -1 => "mpl_int_tuple_t",
                2 => "mpl_strint_tuple_t",
                _ => "mpl_struint8_tuple_t",
            },
            ParamKind::Array(a) => match a.width {
                8 => "mpl_uint8_array_t",
                16 => "mpl_uint16_array_t",
                _ => "mpl_uint32_array_t",
            },
            ParamKind::Bag(_) => "mpl_list_t*",
            ParamKind::Addr => "void*",
        }
    }

    /// Apply a `key = value` property from the declaration.
    pub fn set_property(&mut self, key: &str, value: PropertyValue) -> CompileResult<()> {
        let applied = match (&mut self.kind, key, &value) {
            (ParamKind::Int(s), "min", PropertyValue::Number(n)) => {
                s.min = Some(*n);
                true
            }
            (ParamKind::Int(s), "max", PropertyValue::Number(n)) => {
                s.max = Some(*n);
                true
            }
            (ParamKind::Int(s), "default", PropertyValue::Number(n)) => {
                s.default = Some(*n);
                true
            }
            (ParamKind::Bool(s), "default", PropertyValue::Ident(v)) if v == "true" || v == "false" => {
                s.default = Some(v == "true");
                true
            }
            (ParamKind::Enum(s), "values", PropertyValue::Ident(v)) => {
                s.values = Some(v.clone());
                true
            }
            (ParamKind::Enum(s), "default", PropertyValue::Ident(v)) => {
                s.default = Some(v.clone());
                true
            }
            (ParamKind::String(s), "max", PropertyValue::Number(n)) if *n > 0 => {
                s.max_len = Some(*n);
                true
            }
            (ParamKind::String(s), "default", PropertyValue::Str(v)) => {
                s.default = Some(v.clone());
                true
            }
            (ParamKind::Array(s), "max", PropertyValue::Number(n)) if *n > 0 => {
                s.max_len = Some(*n);
                true
            }
            _ => false,
        };
        if !applied {
            return Err(CompileError::InvalidProperty {
                pos: self.pos.clone(),
                name: self.name.clone(),
                property: key.to_string(),
                value: value.to_string(),
            });
        }
        Ok(())
    }
}

fn int_c_type(width: i32) -> &'static str {
    match width {
        8 => "uint8_t",
        16 => "uint16_t",
        32 => "uint32_t",
        64 => "uint64_t",
        -8 => "int8_t",
        -16 => "int16_t",
        -32 => "int32_t",
        -64 => "int64_t",
        _ => "int",
    }
}

/// Arena of all parameters of all parameter sets.
#[derive(Debug, Clone, Default)]
pub struct Parameters(Vec<Parameter>);

impl Parameters {
    pub(crate) fn push(&mut self, p: Parameter) -> ParamId {
        self.0.push(p);
        ParamId(self.0.len() - 1)
    }

    pub fn get(&self, id: ParamId) -> Option<&Parameter> {
        self.0.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamId, &Parameter)> {
        self.0.iter().enumerate().map(|(i, p)| (ParamId(i), p))
    }

    /// Link `child` under `parent`. Parents must be older than their children.
    pub(crate) fn link(&mut self, parent: ParamId, child: ParamId) -> CompileResult<()> {
        if parent >= child {
            let c = &self.0[child.0];
            return Err(CompileError::Invalid {
                pos: c.pos.clone(),
                message: format!(
                    "parent '{}' of '{}' must be declared first",
                    self.0[parent.0].name, c.name
                ),
            });
        }
        if let Err(existing) = self.0[child.0].lineage.set_parent(parent) {
            let c = &self.0[child.0];
            return Err(CompileError::Invalid {
                pos: c.pos.clone(),
                message: format!(
                    "'{}' already inherits from '{}'",
                    c.name, self.0[existing.0].name
                ),
            });
        }
        self.0[parent.0].lineage.push_child(child);
        Ok(())
    }
}

impl Index<ParamId> for Parameters {
    type Output = Parameter;

    fn index(&self, id: ParamId) -> &Parameter {
        &self.0[id.0]
    }
}

impl IndexMut<ParamId> for Parameters {
    fn index_mut(&mut self, id: ParamId) -> &mut Parameter {
        &mut self.0[id.0]
    }
}

impl LineageArena<ParamId> for Parameters {
    fn lineage(&self, id: ParamId) -> &Lineage<ParamId> {
        &self.0[id.0].lineage
    }
}

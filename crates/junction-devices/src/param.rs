//! Declarative parameter tables shared by device models.

use junction_core::NodeId;

use crate::error::{Error, Result};

/// A parameter value passed to or returned from a device.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Real(f64),
    Flag(bool),
    Int(i64),
    RealVec(Vec<f64>),
    Node(NodeId),
}

impl ParamValue {
    pub fn as_real(&self, name: &'static str) -> Result<f64> {
        match self {
            ParamValue::Real(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            other => Err(invalid(name, other)),
        }
    }

    pub fn as_flag(&self, name: &'static str) -> Result<bool> {
        match self {
            ParamValue::Flag(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v != 0),
            other => Err(invalid(name, other)),
        }
    }

    pub fn as_vec(&self, name: &'static str) -> Result<&[f64]> {
        match self {
            ParamValue::RealVec(v) => Ok(v),
            other => Err(invalid(name, other)),
        }
    }
}

fn invalid(name: &'static str, value: &ParamValue) -> Error {
    Error::InvalidValue {
        name,
        value: format!("{value:?}"),
    }
}

/// Semantic type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Real,
    Flag,
    Int,
    RealVec,
    Node,
}

/// Whether a parameter can be written, read, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Set,
    Ask,
    SetAsk,
}

impl Access {
    pub fn can_set(self) -> bool {
        matches!(self, Access::Set | Access::SetAsk)
    }

    pub fn can_ask(self) -> bool {
        matches!(self, Access::Ask | Access::SetAsk)
    }
}

/// One row of a parameter table. Aliases are separate rows sharing `param`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamInfo<P> {
    pub name: &'static str,
    pub param: P,
    pub kind: ParamKind,
    pub access: Access,
    pub description: &'static str,
}

impl<P> ParamInfo<P> {
    pub const fn new(
        name: &'static str,
        param: P,
        kind: ParamKind,
        access: Access,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            param,
            kind,
            access,
            description,
        }
    }
}

/// A parameter enum with stable numeric tags.
pub trait ParamTag: Copy + Eq {
    fn tag(self) -> u32;
}

/// Find a table row by name, ignoring ASCII case.
pub fn find_by_name<'a, P>(table: &'a [ParamInfo<P>], name: &str) -> Result<&'a ParamInfo<P>> {
    table
        .iter()
        .find(|info| info.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::UnknownParameter(name.to_string()))
}

/// Find the first table row carrying `tag`.
pub fn find_by_tag<P: ParamTag>(table: &[ParamInfo<P>], tag: u32) -> Result<&ParamInfo<P>> {
    table
        .iter()
        .find(|info| info.param.tag() == tag)
        .ok_or(Error::BadParameter { tag })
}

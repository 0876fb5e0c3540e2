//! Effect descriptors
//!
//! Descriptors are written as short strings in effect tables:
//! - positions: `ret`, `arg0`, `arg1`, ...
//! - copy sources: `argN`, `*argN`, `*[argN + x]`, `null`, `universal`, `static`
//! - copy destinations: `argN`/`ret`, `*argN`/`*ret`, `*[argN + x]`/`*[ret + x]`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

/// A call operand: the return value or an argument (indexing every
/// argument, pointer-typed or not)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Position {
    Ret,
    Arg(u32),
}

impl Position {
    pub fn is_ret(self) -> bool {
        matches!(self, Position::Ret)
    }
}

impl FromStr for Position {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "ret" {
            return Ok(Position::Ret);
        }
        s.strip_prefix("arg")
            .and_then(|n| n.parse::<u32>().ok())
            .map(Position::Arg)
            .ok_or_else(|| ConfigError::InvalidDescriptor(s.to_string()))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Ret => write!(f, "ret"),
            Position::Arg(n) => write!(f, "arg{}", n),
        }
    }
}

/// Where a copied points-to set comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CopySource {
    /// The operand's own points-to set
    Value(Position),
    /// What the operand's targets point to
    DirectMemory(Position),
    /// Every pointer field reachable from the operand's targets
    ReachableMemory(Position),
    Null,
    Universal,
    /// Static storage owned by the library; modeled as universal
    Static,
}

/// Where a copied points-to set goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CopyDest {
    Value(Position),
    DirectMemory(Position),
    ReachableMemory(Position),
}

impl CopyDest {
    pub fn position(self) -> Position {
        match self {
            CopyDest::Value(p) | CopyDest::DirectMemory(p) | CopyDest::ReachableMemory(p) => p,
        }
    }
}

/// `pos`, `*pos` or `*[pos + x]`
enum Access {
    Value(Position),
    Direct(Position),
    Reachable(Position),
}

fn parse_access(s: &str) -> Result<Access, ConfigError> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidDescriptor(s.to_string());
    match s.strip_prefix('*') {
        None => Ok(Access::Value(s.parse()?)),
        Some(rest) => {
            let rest = rest.trim();
            match rest.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
                Some(inner) => {
                    let (pos, suffix) = inner.split_once('+').ok_or_else(invalid)?;
                    if suffix.trim() != "x" {
                        return Err(invalid());
                    }
                    Ok(Access::Reachable(pos.parse().map_err(|_| invalid())?))
                }
                None => Ok(Access::Direct(rest.parse().map_err(|_| invalid())?)),
            }
        }
    }
}

impl FromStr for CopySource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "null" => return Ok(CopySource::Null),
            "universal" => return Ok(CopySource::Universal),
            "static" => return Ok(CopySource::Static),
            _ => {}
        }
        Ok(match parse_access(s)? {
            Access::Value(p) => CopySource::Value(p),
            Access::Direct(p) => CopySource::DirectMemory(p),
            Access::Reachable(p) => CopySource::ReachableMemory(p),
        })
    }
}

impl FromStr for CopyDest {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match parse_access(s)? {
            Access::Value(p) => CopyDest::Value(p),
            Access::Direct(p) => CopyDest::DirectMemory(p),
            Access::Reachable(p) => CopyDest::ReachableMemory(p),
        })
    }
}

impl fmt::Display for CopySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopySource::Value(p) => write!(f, "{}", p),
            CopySource::DirectMemory(p) => write!(f, "*{}", p),
            CopySource::ReachableMemory(p) => write!(f, "*[{} + x]", p),
            CopySource::Null => write!(f, "null"),
            CopySource::Universal => write!(f, "universal"),
            CopySource::Static => write!(f, "static"),
        }
    }
}

impl fmt::Display for CopyDest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyDest::Value(p) => write!(f, "{}", p),
            CopyDest::DirectMemory(p) => write!(f, "*{}", p),
            CopyDest::ReachableMemory(p) => write!(f, "*[{} + x]", p),
        }
    }
}

macro_rules! string_conversions {
    ($($ty:ty),*) => {$(
        impl TryFrom<String> for $ty {
            type Error = ConfigError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> String {
                value.to_string()
            }
        }
    )*};
}

string_conversions!(Position, CopySource, CopyDest);

/// One modeled effect of an external call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum PointerEffect {
    /// Return a fresh heap object; `size` names the operand holding its byte size
    Alloc {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<Position>,
    },
    Copy { from: CopySource, to: CopyDest },
    /// Control never returns to the caller
    Exit,
}

impl PointerEffect {
    pub fn alloc(size: Option<Position>) -> Self {
        PointerEffect::Alloc { size }
    }

    pub fn copy(from: CopySource, to: CopyDest) -> Self {
        PointerEffect::Copy { from, to }
    }

    /// Reachable sources only make sense with reachable destinations
    pub(crate) fn check(&self) -> Result<(), ConfigError> {
        match self {
            PointerEffect::Copy {
                from: from @ CopySource::ReachableMemory(_),
                to,
            } if !matches!(to, CopyDest::ReachableMemory(_)) => Err(ConfigError::InvalidDescriptor(
                format!("{} -> {}: reachable memory can only be copied to reachable memory", from, to),
            )),
            PointerEffect::Copy {
                from: CopySource::ReachableMemory(Position::Ret),
                ..
            } => Err(ConfigError::InvalidDescriptor("*[ret + x] as a copy source".into())),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positions() {
        assert_eq!("ret".parse::<Position>().unwrap(), Position::Ret);
        assert_eq!("arg12".parse::<Position>().unwrap(), Position::Arg(12));
        assert!("arg".parse::<Position>().is_err());
        assert!("argx".parse::<Position>().is_err());
        assert!("return".parse::<Position>().is_err());
    }

    #[test]
    fn test_parse_sources() {
        assert_eq!("arg1".parse::<CopySource>().unwrap(), CopySource::Value(Position::Arg(1)));
        assert_eq!("*arg0".parse::<CopySource>().unwrap(), CopySource::DirectMemory(Position::Arg(0)));
        assert_eq!(
            "*[arg1 + x]".parse::<CopySource>().unwrap(),
            CopySource::ReachableMemory(Position::Arg(1))
        );
        assert_eq!("*[arg1+x]".parse::<CopySource>().unwrap(), CopySource::ReachableMemory(Position::Arg(1)));
        assert_eq!("static".parse::<CopySource>().unwrap(), CopySource::Static);
        assert!("*[arg1 + y]".parse::<CopySource>().is_err());
        assert!("*[arg1]".parse::<CopySource>().is_err());
    }

    #[test]
    fn test_parse_dests() {
        assert_eq!("*ret".parse::<CopyDest>().unwrap(), CopyDest::DirectMemory(Position::Ret));
        assert_eq!("ret".parse::<CopyDest>().unwrap(), CopyDest::Value(Position::Ret));
        assert!("null".parse::<CopyDest>().is_err());
    }

    #[test]
    fn test_display_reparses() {
        for text in ["arg0", "*arg2", "*[arg1 + x]", "null", "universal", "static", "ret"] {
            let source: CopySource = text.parse().unwrap();
            assert_eq!(source.to_string(), text);
        }
    }

    #[test]
    fn test_reachable_source_needs_reachable_dest() {
        let bad = PointerEffect::copy(
            CopySource::ReachableMemory(Position::Arg(1)),
            CopyDest::Value(Position::Ret),
        );
        assert!(bad.check().is_err());

        let memcpy = PointerEffect::copy(
            CopySource::ReachableMemory(Position::Arg(1)),
            CopyDest::ReachableMemory(Position::Arg(0)),
        );
        assert!(memcpy.check().is_ok());
    }
}

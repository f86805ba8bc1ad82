//! Host runtime term representation
//!
//! Just enough of the VM's term model for the binding surface: integers,
//! atoms, tuples, lists and opaque ADC handles, plus proplist lookup.

use alloc::vec::Vec;

use heapless::String;

use crate::handle::AdcHandle;

/// Longest atom text kept; longer names are truncated.
pub const ATOM_MAX_LEN: usize = 32;

/// Interned symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Atom(String<ATOM_MAX_LEN>);

impl Atom {
    pub fn new(name: &str) -> Self {
        let mut end = name.len().min(ATOM_MAX_LEN);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        let mut text = String::new();
        // Cannot fail: `end` is within capacity.
        let _ = text.push_str(&name[..end]);
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Integer(i64),
    Atom(Atom),
    Tuple(Vec<Term>),
    List(Vec<Term>),
    Resource(AdcHandle),
}

impl Term {
    pub fn atom(name: &str) -> Self {
        Self::Atom(Atom::new(name))
    }

    pub fn int(value: impl Into<i64>) -> Self {
        Self::Integer(value.into())
    }

    pub fn boolean(value: bool) -> Self {
        Self::atom(if value { "true" } else { "false" })
    }

    pub fn undefined() -> Self {
        Self::atom("undefined")
    }

    pub fn ok() -> Self {
        Self::atom("ok")
    }

    pub fn tuple<const N: usize>(elements: [Term; N]) -> Self {
        Self::Tuple(elements.into())
    }

    pub fn list<const N: usize>(elements: [Term; N]) -> Self {
        Self::List(elements.into())
    }

    /// `{ok, Value}`
    pub fn ok_tuple(value: Term) -> Self {
        Self::tuple([Self::ok(), value])
    }

    /// `{error, Reason}`
    pub fn error_tuple(reason: Term) -> Self {
        Self::tuple([Self::atom("error"), reason])
    }

    /// `{Key, Value}` proplist entry
    pub fn property(key: &str, value: Term) -> Self {
        Self::tuple([Self::atom(key), value])
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Self::Atom(atom) => Some(atom.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.as_atom()? {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    pub fn is_atom(&self, name: &str) -> bool {
        self.as_atom() == Some(name)
    }

    /// Look `key` up in a proplist.
    ///
    /// Matches `{key, Value}` tuples and bare `key` atoms (shorthand for
    /// `{key, true}`); the first match wins. Returns `None` when `self` is
    /// not a list or the key is absent.
    pub fn proplist_get(&self, key: &str) -> Option<PropValue<'_>> {
        let Self::List(items) = self else {
            return None;
        };
        items.iter().find_map(|item| match item {
            Self::Tuple(pair) if pair.len() == 2 && pair[0].is_atom(key) => {
                Some(PropValue::Term(&pair[1]))
            }
            Self::Atom(atom) if atom.as_str() == key => Some(PropValue::True),
            _ => None,
        })
    }
}

/// Value found by [`Term::proplist_get`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropValue<'a> {
    /// Bare atom entry
    True,
    Term(&'a Term),
}

impl<'a> PropValue<'a> {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::True => Some(true),
            Self::Term(term) => term.as_bool(),
        }
    }

    pub fn as_int(self) -> Option<i64> {
        match self {
            Self::True => None,
            Self::Term(term) => term.as_int(),
        }
    }

    pub fn as_atom(self) -> Option<&'a str> {
        match self {
            Self::True => None,
            Self::Term(term) => term.as_atom(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_truncates_long_names() {
        let long = "a".repeat(40);
        assert_eq!(Atom::new(&long).as_str().len(), ATOM_MAX_LEN);
        assert_eq!(Atom::new("db_11").as_str(), "db_11");
    }

    #[test]
    fn test_proplist_lookup() {
        let options = Term::list([
            Term::property("samples", Term::int(16)),
            Term::atom("raw"),
            Term::property("voltage", Term::boolean(false)),
            Term::property("samples", Term::int(99)),
        ]);

        assert_eq!(options.proplist_get("samples").and_then(|v| v.as_int()), Some(16));
        assert_eq!(options.proplist_get("raw").and_then(|v| v.as_bool()), Some(true));
        assert_eq!(options.proplist_get("voltage").and_then(|v| v.as_bool()), Some(false));
        assert!(options.proplist_get("pin").is_none());
    }

    #[test]
    fn test_proplist_on_non_list() {
        assert!(Term::int(3).proplist_get("raw").is_none());
    }
}

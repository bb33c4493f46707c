//! Modification expressions. A [`ModifyList`] is the ordered series of changes a modify
//! operation applies to an entry, with LDAP semantics: removing with no values deletes the
//! whole attribute, replacing with no values deletes it, and an attribute whose last value
//! is removed disappears.

use std::slice;

use crate::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modify {
    // These values *should* exist.
    Add(Attribute, Vec<String>),
    // These values *should not* exist. No values means the attribute should not exist.
    Remove(Attribute, Vec<String>),
    // The attribute holds exactly these values.
    Replace(Attribute, Vec<String>),
}

pub fn m_add(attr: Attribute, v: &str) -> Modify {
    Modify::Add(attr, vec![v.to_string()])
}

pub fn m_remove(attr: Attribute, v: &str) -> Modify {
    Modify::Remove(attr, vec![v.to_string()])
}

pub fn m_replace(attr: Attribute, v: &str) -> Modify {
    Modify::Replace(attr, vec![v.to_string()])
}

pub fn m_purge(attr: Attribute) -> Modify {
    Modify::Remove(attr, Vec::with_capacity(0))
}

impl Modify {
    pub fn attr(&self) -> &Attribute {
        match self {
            Modify::Add(a, _) | Modify::Remove(a, _) | Modify::Replace(a, _) => a,
        }
    }

    pub fn values(&self) -> &[String] {
        match self {
            Modify::Add(_, v) | Modify::Remove(_, v) | Modify::Replace(_, v) => v,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModifyList {
    // The order of this list matters. Each change must be done in order.
    mods: Vec<Modify>,
}

impl<'a> IntoIterator for &'a ModifyList {
    type IntoIter = slice::Iter<'a, Modify>;
    type Item = &'a Modify;

    fn into_iter(self) -> Self::IntoIter {
        self.mods.iter()
    }
}

impl ModifyList {
    pub fn new() -> Self {
        ModifyList {
            mods: Vec::with_capacity(0),
        }
    }

    pub fn new_list(mods: Vec<Modify>) -> Self {
        ModifyList { mods }
    }

    pub fn new_append(attr: Attribute, v: &str) -> Self {
        Self::new_list(vec![m_add(attr, v)])
    }

    pub fn new_remove(attr: Attribute, v: &str) -> Self {
        Self::new_list(vec![m_remove(attr, v)])
    }

    pub fn new_purge(attr: Attribute) -> Self {
        Self::new_list(vec![m_purge(attr)])
    }

    pub fn push_mod(&mut self, modify: Modify) {
        self.mods.push(modify)
    }

    pub fn iter(&self) -> slice::Iter<'_, Modify> {
        self.mods.iter()
    }

    pub fn len(&self) -> usize {
        self.mods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mods.is_empty()
    }

    /// True if any modification in the list changes `attr`.
    pub fn touches(&self, attr: &Attribute) -> bool {
        self.mods.iter().any(|m| m.attr() == attr)
    }

    /// Every attribute changed by the list, in first-touched order.
    pub fn attrs(&self) -> Vec<&Attribute> {
        let mut attrs: Vec<&Attribute> = Vec::new();
        for m in self.mods.iter() {
            if !attrs.contains(&m.attr()) {
                attrs.push(m.attr());
            }
        }
        attrs
    }
}

impl FromIterator<Modify> for ModifyList {
    fn from_iter<I: IntoIterator<Item = Modify>>(iter: I) -> Self {
        ModifyList {
            mods: iter.into_iter().collect(),
        }
    }
}

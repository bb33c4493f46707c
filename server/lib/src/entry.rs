//! Entries are the base unit of object storage in the server. Along with [`Dn`]s and
//! [`filter`]s they are what every operation is built upon.
//!
//! An [`Entry`] is a named collection of attribute-value sets. The attribute is a "key" and
//! it holds 1 to infinite associated values. A pseudo example:
//!
//! ```text
//! dn: cn=william,ou=people,dc=example,dc=com
//! objectClass: top
//! objectClass: person
//! cn: william
//! ```
//!
//! There are two rules for entries:
//! * Any attribute with zero values will be removed.
//! * Values within an attribute are unique, compared case insensitively.
//!
//! [`filter`]: ../filter/index.html

use std::collections::BTreeMap;
use std::slice;

use crate::modify::{Modify, ModifyList};
use crate::prelude::*;
use crate::schema::normalizers::deep_trim;

fn value_key(v: &str) -> String {
    deep_trim(v).to_lowercase()
}

/// An ordered set of values. Insertion order is kept, membership is case insensitive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValueSet {
    values: Vec<String>,
}

impl ValueSet {
    pub fn new() -> Self {
        ValueSet { values: Vec::new() }
    }

    /// Returns true if the value was not already present.
    pub fn insert<V: Into<String>>(&mut self, value: V) -> bool {
        let value = value.into();
        if self.contains(&value) {
            false
        } else {
            self.values.push(value);
            true
        }
    }

    pub fn remove(&mut self, value: &str) -> bool {
        let key = value_key(value);
        let before = self.values.len();
        self.values.retain(|v| value_key(v) != key);
        before != self.values.len()
    }

    pub fn contains(&self, value: &str) -> bool {
        let key = value_key(value);
        self.values.iter().any(|v| value_key(v) == key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, String> {
        self.values.iter()
    }

    pub fn first(&self) -> Option<&str> {
        self.values.first().map(|s| s.as_str())
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.values.clone()
    }
}

impl<V: Into<String>> FromIterator<V> for ValueSet {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let mut vs = ValueSet::new();
        for v in iter {
            vs.insert(v);
        }
        vs
    }
}

impl<'a> IntoIterator for &'a ValueSet {
    type IntoIter = slice::Iter<'a, String>;
    type Item = &'a String;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    dn: Dn,
    attrs: BTreeMap<Attribute, ValueSet>,
}

impl Entry {
    pub fn new(dn: Dn) -> Self {
        Entry {
            dn,
            attrs: BTreeMap::new(),
        }
    }

    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    pub fn set_dn(&mut self, dn: Dn) {
        self.dn = dn;
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&Attribute, &ValueSet)> {
        self.attrs.iter()
    }

    pub fn attr_names(&self) -> impl Iterator<Item = &Attribute> {
        self.attrs.keys()
    }

    pub fn get_ava(&self, attr: &Attribute) -> Option<&ValueSet> {
        self.attrs.get(attr)
    }

    /// The first value of an attribute.
    pub fn get_ava_single(&self, attr: &Attribute) -> Option<&str> {
        self.attrs.get(attr).and_then(|vs| vs.first())
    }

    pub fn attribute_pres(&self, attr: &Attribute) -> bool {
        self.attrs.contains_key(attr)
    }

    pub fn attribute_equality(&self, attr: &Attribute, value: &str) -> bool {
        self.attrs
            .get(attr)
            .map(|vs| vs.contains(value))
            .unwrap_or(false)
    }

    pub fn add_ava<V: Into<String>>(&mut self, attr: Attribute, value: V) {
        self.attrs.entry(attr).or_default().insert(value);
    }

    pub fn add_avas<V: Into<String>, I: IntoIterator<Item = V>>(&mut self, attr: Attribute, values: I) {
        for v in values {
            self.add_ava(attr.clone(), v);
        }
    }

    /// Remove one value. The attribute is dropped when its last value goes.
    pub fn remove_ava(&mut self, attr: &Attribute, value: &str) -> bool {
        let Some(vs) = self.attrs.get_mut(attr) else {
            return false;
        };
        let removed = vs.remove(value);
        if vs.is_empty() {
            self.attrs.remove(attr);
        }
        removed
    }

    pub fn purge_ava(&mut self, attr: &Attribute) -> Option<ValueSet> {
        self.attrs.remove(attr)
    }

    /// Set the attribute to exactly these values. No values removes it.
    pub fn set_ava<V: Into<String>, I: IntoIterator<Item = V>>(&mut self, attr: Attribute, values: I) {
        let vs: ValueSet = values.into_iter().collect();
        if vs.is_empty() {
            self.attrs.remove(&attr);
        } else {
            self.attrs.insert(attr, vs);
        }
    }

    /// Keep only the attributes the predicate accepts.
    pub fn retain_attrs<F: FnMut(&Attribute) -> bool>(&mut self, mut f: F) {
        self.attrs.retain(|k, _| f(k));
    }

    pub fn apply_modify(&mut self, modify: &Modify) {
        match modify {
            Modify::Add(attr, values) => self.add_avas(attr.clone(), values.iter().cloned()),
            Modify::Remove(attr, values) if values.is_empty() => {
                self.purge_ava(attr);
            }
            Modify::Remove(attr, values) => {
                for v in values {
                    self.remove_ava(attr, v);
                }
            }
            Modify::Replace(attr, values) => self.set_ava(attr.clone(), values.iter().cloned()),
        }
    }

    pub fn apply_modlist(&mut self, modlist: &ModifyList) {
        trace!(?modlist, "applying modlist");
        for modify in modlist {
            self.apply_modify(modify);
        }
    }

    pub fn object_classes(&self) -> Option<&ValueSet> {
        self.get_ava(&Attribute::ObjectClass)
    }

    pub fn has_class(&self, class: EntryClass) -> bool {
        self.attribute_equality(&Attribute::ObjectClass, class.as_ref())
    }

    pub fn is_subentry(&self) -> bool {
        self.has_class(EntryClass::Subentry)
    }

    pub fn is_referral(&self) -> bool {
        self.has_class(EntryClass::Referral)
    }

    /// An entry with an `administrativeRole` is the root of one or more administrative
    /// areas.
    pub fn is_administrative_point(&self) -> bool {
        self.get_ava(&Attribute::AdministrativeRole)
            .map(|vs| !vs.is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    fn test_entry() -> Entry {
        entry_init!(
            Dn::parse("cn=william,dc=example,dc=com").expect("dn"),
            (Attribute::ObjectClass, EntryClass::Top.as_ref()),
            (Attribute::ObjectClass, EntryClass::Person.as_ref()),
            (Attribute::Cn, "william"),
            (Attribute::Sn, "brown")
        )
    }

    #[test]
    fn test_entry_values_case_insensitive() {
        let mut e = test_entry();
        e.add_ava(Attribute::Cn, "WILLIAM");
        assert_eq!(e.get_ava(&Attribute::Cn).map(|vs| vs.len()), Some(1));
        assert!(e.attribute_equality(&Attribute::ObjectClass, "PERSON"));
        assert!(e.has_class(EntryClass::Person));
        assert!(!e.is_subentry());
    }

    #[test]
    fn test_entry_apply_modlist() {
        let mut e = test_entry();
        e.apply_modlist(&ModifyList::new_list(vec![
            m_add(Attribute::Description, "one"),
            m_add(Attribute::Description, "two"),
            m_remove(Attribute::Description, "ONE"),
            m_replace(Attribute::Sn, "smith"),
            m_purge(Attribute::Cn),
        ]));
        assert_eq!(e.get_ava_single(&Attribute::Description), Some("two"));
        assert_eq!(e.get_ava_single(&Attribute::Sn), Some("smith"));
        assert!(!e.attribute_pres(&Attribute::Cn));

        // Removing the last value drops the attribute.
        assert!(e.remove_ava(&Attribute::Description, "two"));
        assert!(!e.attribute_pres(&Attribute::Description));

        // Replace with nothing deletes.
        e.apply_modify(&Modify::Replace(Attribute::Sn, Vec::new()));
        assert!(!e.attribute_pres(&Attribute::Sn));

        // Removing something absent is lenient.
        assert!(!e.remove_ava(&Attribute::Uid, "x"));
    }

    #[test]
    fn test_entry_administrative_point() {
        let mut e = test_entry();
        assert!(!e.is_administrative_point());
        e.add_ava(Attribute::AdministrativeRole, "autonomousArea");
        assert!(e.is_administrative_point());
    }
}

//! Distinguished names. A [`Dn`] is held leaf first: `rdns[0]` is the entry's own
//! [`Rdn`] and the last element is the top of the naming context.
//!
//! Equality and hashing are always over the normalised form (attribute names lower cased,
//! values deep trimmed and lower cased) so that two spellings of the same name compare
//! equal, while [`Display`](std::fmt::Display) renders the values as they were given.
//! Schema aware normalisation, which folds attribute aliases and OIDs onto one name and
//! respects each attribute's equality rule, is applied by [`Dn::normalize`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use itertools::Itertools;

use crate::prelude::*;
use crate::schema::normalizers::{deep_trim, NormalizerMapping};

#[derive(Clone, Debug)]
pub struct Ava {
    pub attr: Attribute,
    pub value: String,
}

impl Ava {
    pub fn new<V: Into<String>>(attr: Attribute, value: V) -> Self {
        Ava {
            attr,
            value: value.into(),
        }
    }

    fn norm_value(&self) -> String {
        deep_trim(&self.value).to_lowercase()
    }

    fn norm_string(&self) -> String {
        format!("{}={}", self.attr, escape_value(&self.norm_value()))
    }
}

impl PartialEq for Ava {
    fn eq(&self, other: &Self) -> bool {
        self.attr == other.attr && self.norm_value() == other.norm_value()
    }
}

impl Eq for Ava {}

impl fmt::Display for Ava {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attr, escape_value(&self.value))
    }
}

#[derive(Clone, Debug)]
pub struct Rdn {
    avas: Vec<Ava>,
}

impl Rdn {
    pub fn new<V: Into<String>>(attr: Attribute, value: V) -> Self {
        Rdn {
            avas: vec![Ava::new(attr, value)],
        }
    }

    pub fn from_avas(avas: Vec<Ava>) -> Result<Self, OperationError> {
        if avas.is_empty() {
            return Err(OperationError::InvalidDnSyntax(String::new()));
        }
        Ok(Rdn { avas })
    }

    pub fn parse(value: &str) -> Result<Self, OperationError> {
        let dn = Dn::parse(value)?;
        match dn.rdns.as_slice() {
            [rdn] => Ok(rdn.clone()),
            _ => Err(OperationError::InvalidDnSyntax(value.to_string())),
        }
    }

    pub fn avas(&self) -> &[Ava] {
        &self.avas
    }

    /// The first attribute value assertion. For single valued RDNs, the only one.
    pub fn ava(&self) -> &Ava {
        // An Rdn is never built without at least one ava.
        &self.avas[0]
    }

    pub fn norm_string(&self) -> String {
        self.avas
            .iter()
            .map(|a| a.norm_string())
            .sorted()
            .join("+")
    }

    /// Fold each attribute onto its primary name and normalise its value by the
    /// attribute's equality rule.
    pub fn normalize(&self, mapping: &NormalizerMapping) -> Rdn {
        Rdn {
            avas: self
                .avas
                .iter()
                .map(|a| {
                    let attr = mapping.canonical(&a.attr);
                    let value = mapping.normalize(&attr, &a.value);
                    Ava::new(attr, value)
                })
                .collect(),
        }
    }
}

impl PartialEq for Rdn {
    fn eq(&self, other: &Self) -> bool {
        self.norm_string() == other.norm_string()
    }
}

impl Eq for Rdn {}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.avas.iter().join("+"))
    }
}

impl FromStr for Rdn {
    type Err = OperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rdn::parse(s)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Dn {
    rdns: Vec<Rdn>,
}

impl Dn {
    /// The empty name of the root DSE.
    pub fn root() -> Self {
        Dn { rdns: Vec::new() }
    }

    pub fn parse(value: &str) -> Result<Self, OperationError> {
        if value.trim().is_empty() {
            return Ok(Dn::root());
        }
        let invalid = || OperationError::InvalidDnSyntax(value.to_string());

        let mut rdns = Vec::new();
        for rdn_str in split_unescaped(value, &[',', ';']) {
            let mut avas = Vec::new();
            for ava_str in split_unescaped(rdn_str, &['+']) {
                let (attr, raw) = split_once_unescaped(ava_str, '=').ok_or_else(invalid)?;
                let attr = attr.trim();
                if attr.is_empty() || !attr.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.') {
                    return Err(invalid());
                }
                let value = unescape_value(raw.trim()).ok_or_else(invalid)?;
                avas.push(Ava::new(Attribute::from_str(attr), value));
            }
            rdns.push(Rdn::from_avas(avas).map_err(|_| invalid())?);
        }
        Ok(Dn { rdns })
    }

    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// The number of RDN components.
    pub fn size(&self) -> usize {
        self.rdns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    pub fn rdn(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    pub fn parent(&self) -> Option<Dn> {
        if self.rdns.is_empty() {
            None
        } else {
            Some(Dn {
                rdns: self.rdns[1..].to_vec(),
            })
        }
    }

    /// Descendant or equal.
    pub fn is_descendant_of(&self, ancestor: &Dn) -> bool {
        if ancestor.size() > self.size() {
            return false;
        }
        let offset = self.size() - ancestor.size();
        self.rdns[offset..]
            .iter()
            .zip(ancestor.rdns.iter())
            .all(|(a, b)| a == b)
    }

    pub fn is_strict_descendant_of(&self, ancestor: &Dn) -> bool {
        self.size() > ancestor.size() && self.is_descendant_of(ancestor)
    }

    /// The leading components of this name beneath `ancestor`, or `None` if this name is not
    /// beneath it. A name relative to itself is empty.
    pub fn relative_to(&self, ancestor: &Dn) -> Option<Dn> {
        if self.is_descendant_of(ancestor) {
            Some(Dn {
                rdns: self.rdns[..self.size() - ancestor.size()].to_vec(),
            })
        } else {
            None
        }
    }

    /// Append a relative name beneath this one.
    pub fn concat(&self, relative: &Dn) -> Dn {
        let mut rdns = relative.rdns.clone();
        rdns.extend(self.rdns.iter().cloned());
        Dn { rdns }
    }

    /// The child of this name with the given RDN.
    pub fn with_rdn(&self, rdn: Rdn) -> Dn {
        let mut rdns = Vec::with_capacity(self.size() + 1);
        rdns.push(rdn);
        rdns.extend(self.rdns.iter().cloned());
        Dn { rdns }
    }

    /// Move this name from beneath `old_base` to beneath `new_base`.
    pub fn rebase(&self, old_base: &Dn, new_base: &Dn) -> Option<Dn> {
        self.relative_to(old_base).map(|rel| new_base.concat(&rel))
    }

    /// This name and each of its ancestors, nearest first. The root is not included.
    pub fn ancestors(&self) -> impl Iterator<Item = Dn> + '_ {
        (0..self.rdns.len()).map(move |i| Dn {
            rdns: self.rdns[i..].to_vec(),
        })
    }

    pub fn norm_string(&self) -> String {
        self.rdns.iter().map(|r| r.norm_string()).join(",")
    }

    pub fn normalize(&self, mapping: &NormalizerMapping) -> Dn {
        Dn {
            rdns: self.rdns.iter().map(|r| r.normalize(mapping)).collect(),
        }
    }
}

impl PartialEq for Dn {
    fn eq(&self, other: &Self) -> bool {
        self.rdns == other.rdns
    }
}

impl Eq for Dn {}

impl Hash for Dn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.norm_string().hash(state)
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rdns.iter().join(","))
    }
}

impl FromStr for Dn {
    type Err = OperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dn::parse(s)
    }
}

impl TryFrom<&str> for Dn {
    type Error = OperationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Dn::parse(value)
    }
}

fn split_unescaped<'a>(value: &'a str, separators: &[char]) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (idx, c) in value.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if separators.contains(&c) {
            parts.push(&value[start..idx]);
            start = idx + c.len_utf8();
        }
    }
    parts.push(&value[start..]);
    parts
}

fn split_once_unescaped(value: &str, separator: char) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (idx, c) in value.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == separator {
            return Some((&value[..idx], &value[idx + c.len_utf8()..]));
        }
    }
    None
}

fn unescape_value(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let next = chars.next()?;
        if next.is_ascii_hexdigit() {
            let low = chars.next()?;
            let byte = u8::from_str_radix(&format!("{}{}", next, low), 16).ok()?;
            out.push(char::from(byte));
        } else {
            out.push(next);
        }
    }
    Some(out)
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (idx, c) in value.chars().enumerate() {
        match c {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                out.push('\\');
                out.push(c);
            }
            '#' if idx == 0 => out.push_str("\\#"),
            ' ' if idx == 0 || idx == last => out.push_str("\\ "),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{Dn, Rdn};
    use crate::prelude::*;

    fn dn(s: &str) -> Dn {
        Dn::parse(s).expect("valid dn")
    }

    #[test]
    fn test_dn_parse_and_display() {
        let d = dn("CN=William Brown, OU=People ,dc=example,dc=com");
        assert_eq!(d.size(), 4);
        assert_eq!(d.to_string(), "cn=William Brown,ou=People,dc=example,dc=com");
        assert_eq!(d.norm_string(), "cn=william brown,ou=people,dc=example,dc=com");

        let d = dn("cn=Smith\\, John+uid=jsmith,dc=example,dc=com");
        assert_eq!(d.size(), 3);
        let rdn = d.rdn().expect("rdn");
        assert_eq!(rdn.avas().len(), 2);
        assert_eq!(rdn.ava().value, "Smith, John");
        assert_eq!(d.to_string(), "cn=Smith\\, John+uid=jsmith,dc=example,dc=com");

        assert!(dn("").is_empty());
        assert!(Dn::parse("cn").is_err());
        assert!(Dn::parse("=foo,dc=com").is_err());
        assert!(Dn::parse("cn=a\\").is_err());
    }

    #[test]
    fn test_dn_multi_ava_order_insensitive() {
        assert_eq!(dn("cn=a+uid=b,dc=com"), dn("uid=B+cn=A,dc=com"));
    }

    #[test]
    fn test_dn_hierarchy() {
        let base = dn("dc=example,dc=com");
        let child = dn("ou=People,dc=Example,dc=com");
        let grand = dn("cn=a,ou=people,dc=example,dc=com");

        assert!(child.is_descendant_of(&base));
        assert!(base.is_descendant_of(&base));
        assert!(!base.is_strict_descendant_of(&base));
        assert!(grand.is_strict_descendant_of(&base));
        assert!(!base.is_descendant_of(&child));
        assert!(base.is_descendant_of(&Dn::root()));

        assert_eq!(child.parent(), Some(base.clone()));
        assert_eq!(grand.relative_to(&base), Some(dn("cn=a,ou=people")));
        assert_eq!(base.relative_to(&base).map(|d| d.size()), Some(0));
        assert_eq!(base.relative_to(&grand), None);
        assert_eq!(base.concat(&dn("cn=a,ou=people")), grand);
        assert_eq!(
            child.with_rdn(Rdn::new(Attribute::Cn, "a")),
            grand
        );
        assert_eq!(
            grand.rebase(&child, &dn("ou=groups,dc=example,dc=com")),
            Some(dn("cn=a,ou=groups,dc=example,dc=com"))
        );
        let ancestors: Vec<_> = grand.ancestors().map(|d| d.size()).collect();
        assert_eq!(ancestors, vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_rdn_parse() {
        let rdn = Rdn::parse("cn=Foo").expect("rdn");
        assert_eq!(rdn.ava().attr, Attribute::Cn);
        assert!(Rdn::parse("cn=a,dc=b").is_err());
    }
}

//! LDIF change records. The change log stores the forward record of every mutation along
//! with the records that undo it, computed from the entry as it was before the change.

use std::fmt;

use crate::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LdifEntry {
    Add(Entry),
    Delete(Dn),
    Modify {
        dn: Dn,
        mods: ModifyList,
    },
    ModDn {
        dn: Dn,
        new_rdn: Rdn,
        delete_old_rdn: bool,
        new_superior: Option<Dn>,
    },
}

impl LdifEntry {
    pub fn dn(&self) -> &Dn {
        match self {
            LdifEntry::Add(e) => e.dn(),
            LdifEntry::Delete(dn) | LdifEntry::Modify { dn, .. } | LdifEntry::ModDn { dn, .. } => {
                dn
            }
        }
    }

    pub fn reverse_add(dn: &Dn) -> LdifEntry {
        LdifEntry::Delete(dn.clone())
    }

    pub fn reverse_delete(before: &Entry) -> LdifEntry {
        LdifEntry::Add(before.clone())
    }

    /// Restore every attribute the modification touched to its prior values.
    pub fn reverse_modify(before: &Entry, mods: &ModifyList) -> LdifEntry {
        let reverse = mods
            .attrs()
            .into_iter()
            .map(|attr| {
                let values = before.get_ava(attr).map(|vs| vs.to_vec()).unwrap_or_default();
                Modify::Replace(attr.clone(), values)
            })
            .collect();
        LdifEntry::Modify {
            dn: before.dn().clone(),
            mods: reverse,
        }
    }

    /// Undo a rename, move, or both. The old RDN value is removed on the way back only if
    /// the entry didn't hold the new one beforehand.
    pub fn reverse_moddn(before: &Entry, new_dn: &Dn) -> Result<LdifEntry, OperationError> {
        let old_dn = before.dn();
        let (old_rdn, new_rdn) = match (old_dn.rdn(), new_dn.rdn()) {
            (Some(o), Some(n)) => (o.clone(), n),
            _ => {
                return Err(OperationError::UnwillingToPerform(
                    "can't reverse a rename of the root".to_string(),
                ))
            }
        };
        let had_new_rdn = new_rdn
            .avas()
            .iter()
            .all(|ava| before.attribute_equality(&ava.attr, &ava.value));
        let new_superior = if old_dn.parent() != new_dn.parent() {
            old_dn.parent()
        } else {
            None
        };
        Ok(LdifEntry::ModDn {
            dn: new_dn.clone(),
            new_rdn: old_rdn,
            delete_old_rdn: !had_new_rdn,
            new_superior,
        })
    }
}

fn write_mod(f: &mut fmt::Formatter<'_>, op: &str, attr: &Attribute, values: &[String]) -> fmt::Result {
    writeln!(f, "{}: {}", op, attr)?;
    for v in values {
        writeln!(f, "{}: {}", attr, v)?;
    }
    writeln!(f, "-")
}

impl fmt::Display for LdifEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "dn: {}", self.dn())?;
        match self {
            LdifEntry::Add(e) => {
                writeln!(f, "changetype: add")?;
                for (attr, vs) in e.attrs() {
                    for v in vs {
                        writeln!(f, "{}: {}", attr, v)?;
                    }
                }
            }
            LdifEntry::Delete(_) => writeln!(f, "changetype: delete")?,
            LdifEntry::Modify { mods, .. } => {
                writeln!(f, "changetype: modify")?;
                for m in mods {
                    match m {
                        Modify::Add(a, v) => write_mod(f, "add", a, v)?,
                        Modify::Remove(a, v) => write_mod(f, "delete", a, v)?,
                        Modify::Replace(a, v) => write_mod(f, "replace", a, v)?,
                    }
                }
            }
            LdifEntry::ModDn {
                new_rdn,
                delete_old_rdn,
                new_superior,
                ..
            } => {
                writeln!(f, "changetype: moddn")?;
                writeln!(f, "newrdn: {}", new_rdn)?;
                writeln!(f, "deleteoldrdn: {}", u8::from(*delete_old_rdn))?;
                if let Some(sup) = new_superior {
                    writeln!(f, "newsuperior: {}", sup)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LdifEntry;
    use crate::prelude::*;

    fn dn(s: &str) -> Dn {
        Dn::parse(s).expect("dn")
    }

    #[test]
    fn test_ldif_reverse_modify() {
        let before = entry_init!(
            dn("cn=a,dc=example,dc=com"),
            (Attribute::Cn, "a"),
            (Attribute::Description, "old")
        );
        let mods = ModifyList::new_list(vec![
            m_replace(Attribute::Description, "new"),
            m_add(Attribute::Sn, "b"),
        ]);
        let reverse = LdifEntry::reverse_modify(&before, &mods);
        let LdifEntry::Modify { mods: rmods, .. } = &reverse else {
            unreachable!("reverse of a modify is a modify");
        };
        let mut after = before.clone();
        after.apply_modlist(&mods);
        after.apply_modlist(rmods);
        assert_eq!(after, before);
        assert!(reverse.to_string().contains("replace: description\ndescription: old\n-"));
    }

    #[test]
    fn test_ldif_reverse_moddn() {
        let before = entry_init!(dn("cn=a,ou=people,dc=example,dc=com"), (Attribute::Cn, "a"));

        let reverse =
            LdifEntry::reverse_moddn(&before, &dn("cn=b,ou=people,dc=example,dc=com")).expect("rev");
        assert_eq!(
            reverse,
            LdifEntry::ModDn {
                dn: dn("cn=b,ou=people,dc=example,dc=com"),
                new_rdn: Rdn::new(Attribute::Cn, "a"),
                delete_old_rdn: true,
                new_superior: None,
            }
        );

        let reverse =
            LdifEntry::reverse_moddn(&before, &dn("cn=a,ou=groups,dc=example,dc=com")).expect("rev");
        assert_eq!(
            reverse,
            LdifEntry::ModDn {
                dn: dn("cn=a,ou=groups,dc=example,dc=com"),
                new_rdn: Rdn::new(Attribute::Cn, "a"),
                delete_old_rdn: false,
                new_superior: Some(dn("ou=people,dc=example,dc=com")),
            }
        );
        assert!(reverse
            .to_string()
            .ends_with("newsuperior: ou=people,dc=example,dc=com\n"));
    }
}

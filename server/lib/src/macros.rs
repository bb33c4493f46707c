/// Build an [`Entry`](crate::entry::Entry) from a DN and a list of
/// `(Attribute, value)` pairs.
///
/// ```ignore
/// let e = entry_init!(
///     dn,
///     (Attribute::ObjectClass, EntryClass::Person.as_ref()),
///     (Attribute::Cn, "william")
/// );
/// ```
#[macro_export]
macro_rules! entry_init {
    ($dn:expr) => {{
        $crate::entry::Entry::new($dn)
    }};
    ($dn:expr, $($ava:expr),+ $(,)?) => {{
        let mut e = $crate::entry::Entry::new($dn);
        $(
            let (attr, value) = $ava;
            e.add_ava(attr, value);
        )+
        e
    }};
}

/// Run a nested operation and convert a missing target into `None`.
macro_rules! optional_entry {
    ($res:expr) => {{
        match $res {
            Ok(e) => Ok(Some(e)),
            Err(OperationError::NoSuchObject(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }};
}

//! Operation contexts. Every directory operation travels the interceptor chain as an
//! [`OperationContext`]: a common header naming the target, carrying the request and
//! response controls, the interceptors to bypass and the referral policy, plus a payload
//! specific to the kind of operation.
//!
//! Operations issued while another is executing form a causation chain. Each context holds
//! an immutable [`OpFrame`] that points at the frame of the operation that spawned it, so the
//! first (user issued) operation is simply the one without a parent.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashSet;

use crate::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Add,
    Delete,
    Modify,
    Rename,
    Move,
    MoveAndRename,
    Lookup,
    HasEntry,
    Search,
    List,
    Compare,
    Bind,
    Unbind,
    RootDse,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

static NEXT_OPERATION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(u64);

impl OperationId {
    fn next() -> Self {
        OperationId(NEXT_OPERATION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op-{}", self.0)
    }
}

/// One link of the causation chain. Frames are never mutated once built, so the chain
/// can't form a cycle.
#[derive(Debug)]
pub struct OpFrame {
    id: OperationId,
    kind: OperationKind,
    dn: Dn,
    parent: Option<Arc<OpFrame>>,
}

impl OpFrame {
    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    pub fn parent(&self) -> Option<&Arc<OpFrame>> {
        self.parent.as_ref()
    }

    /// How many operations sit above this one. First operations have depth 0.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent.as_ref();
        while let Some(p) = current {
            depth += 1;
            current = p.parent.as_ref();
        }
        depth
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Control {
    pub oid: String,
    pub critical: bool,
    pub value: Option<String>,
}

impl Control {
    pub fn new(oid: &str) -> Self {
        Control {
            oid: oid.to_string(),
            critical: false,
            value: None,
        }
    }
}

/// Controls keyed by OID. There is at most one control per OID.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Controls {
    inner: BTreeMap<String, Control>,
}

impl Controls {
    /// Insert a control, returning the one it replaced.
    pub fn insert(&mut self, control: Control) -> Option<Control> {
        self.inner.insert(control.oid.clone(), control)
    }

    pub fn get(&self, oid: &str) -> Option<&Control> {
        self.inner.get(oid)
    }

    pub fn contains(&self, oid: &str) -> bool {
        self.inner.contains_key(oid)
    }

    pub fn remove(&mut self, oid: &str) -> Option<Control> {
        self.inner.remove(oid)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Control> {
        self.inner.values()
    }
}

/// The names of interceptors an operation skips. `"*"` skips all of them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bypass {
    names: HashSet<String>,
}

impl Bypass {
    pub const ALL: &'static str = "*";

    pub fn none() -> Self {
        Bypass::default()
    }

    pub fn all() -> Self {
        Self::from_names(&[Self::ALL])
    }

    pub fn from_names(names: &[&str]) -> Self {
        Bypass {
            names: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn insert(&mut self, name: &str) {
        self.names.insert(name.to_string());
    }

    pub fn skips(&self, name: &str) -> bool {
        self.names.contains(Self::ALL) || self.names.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Which attributes a read returns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttrSelection {
    pub all_user: bool,
    pub all_operational: bool,
    pub named: Vec<Attribute>,
}

impl Default for AttrSelection {
    fn default() -> Self {
        AttrSelection {
            all_user: true,
            all_operational: false,
            named: Vec::new(),
        }
    }
}

impl AttrSelection {
    /// Every user and operational attribute.
    pub fn all() -> Self {
        AttrSelection {
            all_user: true,
            all_operational: true,
            named: Vec::new(),
        }
    }

    /// Build a selection from a requested attribute list: `*` selects the user attributes,
    /// `+` the operational ones, `1.1` nothing, anything else is an attribute name. An empty
    /// list selects every user attribute.
    pub fn from_requested(requested: &[&str]) -> Self {
        if requested.is_empty() {
            return Self::default();
        }
        let mut sel = AttrSelection {
            all_user: false,
            all_operational: false,
            named: Vec::new(),
        };
        for r in requested {
            match r.trim() {
                "*" => sel.all_user = true,
                "+" => sel.all_operational = true,
                "1.1" => {}
                name => sel.named.push(Attribute::from_str(name)),
            }
        }
        sel
    }

    pub fn includes(&self, attr: &Attribute, operational: bool) -> bool {
        self.named.contains(attr)
            || if operational {
                self.all_operational
            } else {
                self.all_user
            }
    }
}

pub trait OperationPayload {
    const KIND: OperationKind;
}

macro_rules! payload {
    ($ty:ident, $kind:ident) => {
        impl OperationPayload for $ty {
            const KIND: OperationKind = OperationKind::$kind;
        }
    };
}

#[derive(Clone, Debug)]
pub struct AddOp {
    pub entry: Entry,
}

#[derive(Clone, Debug, Default)]
pub struct DeleteOp;

#[derive(Clone, Debug)]
pub struct ModifyOp {
    pub mods: ModifyList,
    /// The entry as the partition stored it.
    pub altered: Option<Entry>,
}

#[derive(Clone, Debug)]
pub struct RenameOp {
    pub new_rdn: Rdn,
    pub delete_old_rdn: bool,
}

#[derive(Clone, Debug)]
pub struct MoveOp {
    pub new_superior: Dn,
}

#[derive(Clone, Debug)]
pub struct MoveAndRenameOp {
    pub new_superior: Dn,
    pub new_rdn: Rdn,
    pub delete_old_rdn: bool,
}

#[derive(Clone, Debug, Default)]
pub struct LookupOp {
    pub attrs: AttrSelection,
}

#[derive(Clone, Debug, Default)]
pub struct HasEntryOp;

#[derive(Clone, Debug)]
pub struct SearchOp {
    pub scope: Scope,
    pub filter: Filter,
    pub attrs: AttrSelection,
}

#[derive(Clone, Debug, Default)]
pub struct ListOp;

#[derive(Clone, Debug)]
pub struct CompareOp {
    pub attr: Attribute,
    pub value: String,
}

#[derive(Clone, Debug)]
pub struct BindOp {
    pub credentials: String,
    /// Set once the credentials are verified.
    pub principal: Option<Principal>,
}

#[derive(Clone, Debug, Default)]
pub struct UnbindOp;

#[derive(Clone, Debug, Default)]
pub struct RootDseOp {
    pub attrs: AttrSelection,
}

payload!(AddOp, Add);
payload!(DeleteOp, Delete);
payload!(ModifyOp, Modify);
payload!(RenameOp, Rename);
payload!(MoveOp, Move);
payload!(MoveAndRenameOp, MoveAndRename);
payload!(LookupOp, Lookup);
payload!(HasEntryOp, HasEntry);
payload!(SearchOp, Search);
payload!(ListOp, List);
payload!(CompareOp, Compare);
payload!(BindOp, Bind);
payload!(UnbindOp, Unbind);
payload!(RootDseOp, RootDse);

/// The rename and move family. Each computes where the target ends up.
pub trait ModDnPayload: OperationPayload {
    fn new_dn(&self, dn: &Dn) -> Result<Dn, OperationError>;

    /// The new RDN and whether the old RDN values are dropped, when the RDN changes.
    fn rename(&self) -> Option<(&Rdn, bool)>;
}

fn parent_of(dn: &Dn) -> Result<Dn, OperationError> {
    dn.parent()
        .ok_or_else(|| OperationError::UnwillingToPerform("can't rename the root dse".to_string()))
}

impl ModDnPayload for RenameOp {
    fn new_dn(&self, dn: &Dn) -> Result<Dn, OperationError> {
        Ok(parent_of(dn)?.with_rdn(self.new_rdn.clone()))
    }

    fn rename(&self) -> Option<(&Rdn, bool)> {
        Some((&self.new_rdn, self.delete_old_rdn))
    }
}

impl ModDnPayload for MoveOp {
    fn new_dn(&self, dn: &Dn) -> Result<Dn, OperationError> {
        let rdn = dn.rdn().cloned().ok_or_else(|| {
            OperationError::UnwillingToPerform("can't move the root dse".to_string())
        })?;
        Ok(self.new_superior.with_rdn(rdn))
    }

    fn rename(&self) -> Option<(&Rdn, bool)> {
        None
    }
}

impl ModDnPayload for MoveAndRenameOp {
    fn new_dn(&self, dn: &Dn) -> Result<Dn, OperationError> {
        parent_of(dn)?;
        Ok(self.new_superior.with_rdn(self.new_rdn.clone()))
    }

    fn rename(&self) -> Option<(&Rdn, bool)> {
        Some((&self.new_rdn, self.delete_old_rdn))
    }
}

pub struct OperationContext<O> {
    /// The target of the operation.
    pub dn: Dn,
    /// A snapshot of the target as it was when the operation started.
    pub entry: Option<Entry>,
    pub request_controls: Controls,
    pub response_controls: Controls,
    pub bypass: Bypass,
    pub throw_referral: bool,
    session: CoreSession,
    frame: Arc<OpFrame>,
    pub op: O,
}

impl<O: OperationPayload> OperationContext<O> {
    /// A context for an operation issued on `session`. If the session is already executing
    /// an operation, the new one is linked beneath it.
    pub fn new(session: &CoreSession, dn: Dn, op: O) -> Self {
        let parent = session.last_operation();
        Self::with_parent(session.clone(), parent, dn, op, Bypass::none(), true)
    }

    fn with_parent(
        session: CoreSession,
        parent: Option<Arc<OpFrame>>,
        dn: Dn,
        op: O,
        bypass: Bypass,
        throw_referral: bool,
    ) -> Self {
        let frame = Arc::new(OpFrame {
            id: OperationId::next(),
            kind: O::KIND,
            dn: dn.clone(),
            parent,
        });
        OperationContext {
            dn,
            entry: None,
            request_controls: Controls::default(),
            response_controls: Controls::default(),
            bypass,
            throw_referral,
            session,
            frame,
            op,
        }
    }

    pub fn with_bypass(mut self, bypass: Bypass) -> Self {
        self.bypass = bypass;
        self
    }

    pub fn with_control(mut self, control: Control) -> Self {
        self.request_controls.insert(control);
        self
    }

    pub fn kind(&self) -> OperationKind {
        O::KIND
    }

    pub fn session(&self) -> &CoreSession {
        &self.session
    }

    pub fn frame(&self) -> &Arc<OpFrame> {
        &self.frame
    }

    pub fn id(&self) -> OperationId {
        self.frame.id
    }

    pub fn is_first_operation(&self) -> bool {
        self.frame.parent.is_none()
    }

    /// The frame of the operation that spawned this one.
    pub fn previous(&self) -> Option<&Arc<OpFrame>> {
        self.frame.parent.as_ref()
    }

    /// The frame of the user issued operation at the root of this causation chain.
    pub fn first_operation(&self) -> Arc<OpFrame> {
        let mut current = &self.frame;
        while let Some(p) = current.parent.as_ref() {
            current = p;
        }
        current.clone()
    }

    pub fn has_request_control(&self, oid: &str) -> bool {
        self.request_controls.contains(oid)
    }

    /// The snapshot of the target, which the operation manager loads for every operation on
    /// an existing entry.
    pub fn target_entry(&self) -> Result<&Entry, OperationError> {
        self.entry.as_ref().ok_or_else(|| {
            OperationError::IllegalState(format!("no snapshot of {} was loaded", self.dn))
        })
    }

    /// A context for a nested operation caused by this one. Nested operations never throw
    /// referrals.
    pub fn nested<P: OperationPayload>(&self, dn: Dn, op: P, bypass: Bypass) -> OperationContext<P> {
        OperationContext::with_parent(
            self.session.clone(),
            Some(self.frame.clone()),
            dn,
            op,
            bypass,
            false,
        )
    }

    pub fn add(&self, entry: Entry, bypass: Bypass) -> Result<(), OperationError> {
        let mut ctx = self.nested(entry.dn().clone(), AddOp { entry }, bypass);
        self.session.service().operation_manager().add(&mut ctx)
    }

    pub fn delete(&self, dn: Dn, bypass: Bypass) -> Result<(), OperationError> {
        let mut ctx = self.nested(dn, DeleteOp, bypass);
        self.session.service().operation_manager().delete(&mut ctx)
    }

    /// Modify an entry, returning it as stored.
    pub fn modify(&self, dn: Dn, mods: ModifyList, bypass: Bypass) -> Result<Entry, OperationError> {
        let mut ctx = self.nested(dn, ModifyOp { mods, altered: None }, bypass);
        self.session.service().operation_manager().modify(&mut ctx)?;
        ctx.op
            .altered
            .ok_or_else(|| OperationError::IllegalState("modify returned no entry".to_string()))
    }

    pub fn lookup(&self, dn: Dn, attrs: AttrSelection, bypass: Bypass) -> Result<Entry, OperationError> {
        let mut ctx = self.nested(dn, LookupOp { attrs }, bypass);
        self.session.service().operation_manager().lookup(&mut ctx)
    }

    /// Like [`lookup`](Self::lookup) but a missing entry is `None`.
    pub fn try_lookup(
        &self,
        dn: Dn,
        attrs: AttrSelection,
        bypass: Bypass,
    ) -> Result<Option<Entry>, OperationError> {
        optional_entry!(self.lookup(dn, attrs, bypass))
    }

    pub fn has_entry(&self, dn: Dn, bypass: Bypass) -> Result<bool, OperationError> {
        let mut ctx = self.nested(dn, HasEntryOp, bypass);
        self.session.service().operation_manager().has_entry(&mut ctx)
    }

    pub fn search(
        &self,
        base: Dn,
        scope: Scope,
        filter: Filter,
        attrs: AttrSelection,
        bypass: Bypass,
    ) -> Result<EntryCursor, OperationError> {
        let mut ctx = self.nested(
            base,
            SearchOp {
                scope,
                filter,
                attrs,
            },
            bypass,
        );
        self.session.service().operation_manager().search(&mut ctx)
    }
}

impl<O: fmt::Debug> fmt::Debug for OperationContext<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationContext")
            .field("id", &self.frame.id)
            .field("dn", &self.dn)
            .field("bypass", &self.bypass)
            .field("throw_referral", &self.throw_referral)
            .field("principal", self.session.principal())
            .field("op", &self.op)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{AttrSelection, Bypass, Control, Controls};
    use crate::prelude::*;

    #[test]
    fn test_controls_unique_per_oid() {
        let mut c = Controls::default();
        assert!(c.insert(Control::new(OID_SUBENTRIES_CONTROL)).is_none());
        let mut critical = Control::new(OID_SUBENTRIES_CONTROL);
        critical.critical = true;
        assert!(c.insert(critical).is_some());
        assert_eq!(c.len(), 1);
        assert_eq!(c.get(OID_SUBENTRIES_CONTROL).map(|c| c.critical), Some(true));
    }

    #[test]
    fn test_bypass() {
        let b = Bypass::from_names(&["normalizationInterceptor"]);
        assert!(b.skips("normalizationInterceptor"));
        assert!(!b.skips("schemaInterceptor"));
        assert!(Bypass::all().skips("schemaInterceptor"));
        assert!(!Bypass::none().skips("schemaInterceptor"));
    }

    #[test]
    fn test_attr_selection() {
        let all_user = AttrSelection::from_requested(&[]);
        assert!(all_user.includes(&Attribute::Cn, false));
        assert!(!all_user.includes(&Attribute::CreateTimestamp, true));

        let plus = AttrSelection::from_requested(&["+", "cn"]);
        assert!(plus.includes(&Attribute::Cn, false));
        assert!(!plus.includes(&Attribute::Sn, false));
        assert!(plus.includes(&Attribute::CreateTimestamp, true));

        let none = AttrSelection::from_requested(&["1.1"]);
        assert!(!none.includes(&Attribute::Cn, false));
        assert!(AttrSelection::all().includes(&Attribute::EntryUuid, true));
    }

    #[ds_test]
    fn test_context_causation_chain(server: &Arc<DirectoryService>) {
        let session = server.admin_session();
        let dn = Dn::parse("dc=example,dc=com").expect("dn");
        let outer = OperationContext::new(&session, dn.clone(), LookupOp::default());
        assert!(outer.is_first_operation());
        assert_eq!(outer.first_operation().id(), outer.id());

        let inner = outer.nested(dn.clone(), HasEntryOp, Bypass::none());
        assert!(!inner.is_first_operation());
        assert!(!inner.throw_referral);
        assert_eq!(inner.previous().map(|f| f.id()), Some(outer.id()));
        let innermost = inner.nested(dn, HasEntryOp, Bypass::none());
        assert_eq!(innermost.first_operation().id(), outer.id());
        assert_eq!(innermost.frame().depth(), 2);
    }
}

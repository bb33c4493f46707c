//! Sessions. A [`CoreSession`] binds a [`Principal`] to the service and tracks the stack of
//! operations currently executing on its behalf. Its convenience methods each issue one
//! first level operation through the operation manager.

use std::fmt;
use std::sync::Mutex;

use crate::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Principal {
    Anonymous,
    Admin,
    User(Dn),
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        matches!(self, Principal::Admin)
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }

    /// The name recorded in `creatorsName` and `modifiersName`.
    pub fn dn(&self) -> Result<Dn, OperationError> {
        match self {
            Principal::Anonymous => Ok(Dn::root()),
            Principal::Admin => Dn::parse(ADMIN_DN),
            Principal::User(dn) => Ok(dn.clone()),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Anonymous => write!(f, "anonymous"),
            Principal::Admin => write!(f, "{}", ADMIN_DN),
            Principal::User(dn) => write!(f, "{}", dn),
        }
    }
}

struct SessionInner {
    service: Arc<DirectoryService>,
    principal: Principal,
    frames: Mutex<Vec<Arc<OpFrame>>>,
}

#[derive(Clone)]
pub struct CoreSession {
    inner: Arc<SessionInner>,
}

impl CoreSession {
    pub fn new(service: Arc<DirectoryService>, principal: Principal) -> Self {
        CoreSession {
            inner: Arc::new(SessionInner {
                service,
                principal,
                frames: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn service(&self) -> &Arc<DirectoryService> {
        &self.inner.service
    }

    pub fn principal(&self) -> &Principal {
        &self.inner.principal
    }

    /// The operation this session is executing most deeply, if any.
    pub fn last_operation(&self) -> Option<Arc<OpFrame>> {
        self.inner
            .frames
            .lock()
            .ok()
            .and_then(|frames| frames.last().cloned())
    }

    pub(crate) fn push_frame(&self, frame: Arc<OpFrame>) -> Result<(), OperationError> {
        let mut frames = self.inner.frames.lock().map_err(|_| {
            admin_error!("session frame stack poisoned");
            OperationError::IllegalState("session frame stack poisoned".to_string())
        })?;
        frames.push(frame);
        Ok(())
    }

    /// Complete an operation. Only the most recent operation may complete.
    pub(crate) fn pop_frame(&self, frame: &Arc<OpFrame>) -> Result<(), OperationError> {
        let mut frames = self.inner.frames.lock().map_err(|_| {
            admin_error!("session frame stack poisoned");
            OperationError::IllegalState("session frame stack poisoned".to_string())
        })?;
        match frames.last() {
            Some(top) if Arc::ptr_eq(top, frame) => {
                frames.pop();
                Ok(())
            }
            _ => {
                admin_error!(operation = %frame.id(), "completed operation is not the most recent");
                Err(OperationError::IllegalState(format!(
                    "operation {} is not the most recent on this session",
                    frame.id()
                )))
            }
        }
    }

    /// Build a context for a first level operation on this session.
    pub fn context<O: OperationPayload>(&self, dn: Dn, op: O) -> OperationContext<O> {
        OperationContext::new(self, dn, op)
    }

    pub fn add(&self, entry: Entry) -> Result<(), OperationError> {
        let mut ctx = self.context(entry.dn().clone(), AddOp { entry });
        self.service().operation_manager().add(&mut ctx)
    }

    pub fn delete(&self, dn: &Dn) -> Result<(), OperationError> {
        let mut ctx = self.context(dn.clone(), DeleteOp);
        self.service().operation_manager().delete(&mut ctx)
    }

    pub fn modify(&self, dn: &Dn, mods: ModifyList) -> Result<Entry, OperationError> {
        let mut ctx = self.context(dn.clone(), ModifyOp { mods, altered: None });
        self.service().operation_manager().modify(&mut ctx)?;
        ctx.op
            .altered
            .ok_or_else(|| OperationError::IllegalState("modify returned no entry".to_string()))
    }

    pub fn rename(&self, dn: &Dn, new_rdn: Rdn, delete_old_rdn: bool) -> Result<(), OperationError> {
        let mut ctx = self.context(
            dn.clone(),
            RenameOp {
                new_rdn,
                delete_old_rdn,
            },
        );
        self.service().operation_manager().rename(&mut ctx)
    }

    pub fn move_entry(&self, dn: &Dn, new_superior: Dn) -> Result<(), OperationError> {
        let mut ctx = self.context(dn.clone(), MoveOp { new_superior });
        self.service().operation_manager().move_entry(&mut ctx)
    }

    pub fn move_and_rename(
        &self,
        dn: &Dn,
        new_superior: Dn,
        new_rdn: Rdn,
        delete_old_rdn: bool,
    ) -> Result<(), OperationError> {
        let mut ctx = self.context(
            dn.clone(),
            MoveAndRenameOp {
                new_superior,
                new_rdn,
                delete_old_rdn,
            },
        );
        self.service().operation_manager().move_and_rename(&mut ctx)
    }

    pub fn lookup(&self, dn: &Dn, attrs: AttrSelection) -> Result<Entry, OperationError> {
        let mut ctx = self.context(dn.clone(), LookupOp { attrs });
        self.service().operation_manager().lookup(&mut ctx)
    }

    pub fn has_entry(&self, dn: &Dn) -> Result<bool, OperationError> {
        let mut ctx = self.context(dn.clone(), HasEntryOp);
        self.service().operation_manager().has_entry(&mut ctx)
    }

    pub fn search(
        &self,
        base: &Dn,
        scope: Scope,
        filter: Filter,
        attrs: AttrSelection,
    ) -> Result<Vec<Entry>, OperationError> {
        let mut ctx = self.context(
            base.clone(),
            SearchOp {
                scope,
                filter,
                attrs,
            },
        );
        self.service()
            .operation_manager()
            .search(&mut ctx)?
            .collect_entries()
    }

    pub fn list(&self, dn: &Dn) -> Result<Vec<Entry>, OperationError> {
        let mut ctx = self.context(dn.clone(), ListOp);
        self.service().operation_manager().list(&mut ctx)?.collect_entries()
    }

    pub fn compare(&self, dn: &Dn, attr: Attribute, value: &str) -> Result<bool, OperationError> {
        let mut ctx = self.context(
            dn.clone(),
            CompareOp {
                attr,
                value: value.to_string(),
            },
        );
        self.service().operation_manager().compare(&mut ctx)
    }

    /// Authenticate as `dn`, returning a new session for the bound principal.
    pub fn bind(&self, dn: &Dn, password: &str) -> Result<CoreSession, OperationError> {
        let mut ctx = self.context(
            dn.clone(),
            BindOp {
                credentials: password.to_string(),
                principal: None,
            },
        );
        self.service().operation_manager().bind(&mut ctx)?;
        let principal = ctx.op.principal.ok_or(OperationError::InvalidCredentials)?;
        security_info!(%principal, "bind succeeded");
        Ok(CoreSession::new(self.service().clone(), principal))
    }

    pub fn unbind(&self) -> Result<(), OperationError> {
        let mut ctx = self.context(Dn::root(), UnbindOp);
        self.service().operation_manager().unbind(&mut ctx)
    }

    pub fn root_dse(&self, attrs: AttrSelection) -> Result<Entry, OperationError> {
        let mut ctx = self.context(Dn::root(), RootDseOp { attrs });
        self.service().operation_manager().root_dse(&mut ctx)
    }
}

impl fmt::Debug for CoreSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreSession")
            .field("principal", &self.inner.principal)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Principal;
    use crate::prelude::*;

    #[ds_test]
    fn test_session_frame_stack(server: &Arc<DirectoryService>) {
        let session = server.admin_session();
        assert!(session.last_operation().is_none());

        let dn = Dn::parse("dc=example,dc=com").expect("dn");
        let a = session.context(dn.clone(), HasEntryOp);
        let b = session.context(dn, HasEntryOp);
        assert!(session.push_frame(a.frame().clone()).is_ok());
        assert!(session.push_frame(b.frame().clone()).is_ok());
        assert_eq!(session.last_operation().map(|f| f.id()), Some(b.id()));

        // Completing out of order is a contract violation.
        assert!(matches!(
            session.pop_frame(a.frame()),
            Err(OperationError::IllegalState(_))
        ));
        assert!(session.pop_frame(b.frame()).is_ok());
        assert!(session.pop_frame(a.frame()).is_ok());
        assert!(session.last_operation().is_none());
    }

    #[test]
    fn test_principal_dn() {
        assert_eq!(
            Principal::Admin.dn().map(|d| d.norm_string()),
            Ok("uid=admin,ou=system".to_string())
        );
        assert!(Principal::Anonymous.dn().map(|d| d.is_empty()).unwrap_or(false));
    }
}

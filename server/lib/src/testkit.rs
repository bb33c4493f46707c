use crate::interceptor::{Interceptor, CHANGELOG_INTERCEPTOR};
use crate::partition::MemoryPartition;
use crate::prelude::*;

/// The test suffix every fixture holds, along with `ou=people` and `ou=groups` beneath it.
pub const TEST_SUFFIX: &str = "dc=example,dc=com";

pub struct TestConfiguration {
    pub changelog: bool,
    pub allow_anonymous_access: bool,
    pub admin_password: &'static str,
    /// Replaces the built in chain.
    pub interceptors: Option<Vec<Box<dyn Interceptor>>>,
}

impl Default for TestConfiguration {
    fn default() -> Self {
        TestConfiguration {
            changelog: false,
            allow_anonymous_access: true,
            admin_password: DEFAULT_ADMIN_PASSWORD,
            interceptors: None,
        }
    }
}

#[allow(clippy::expect_used)]
pub fn setup_test(config: TestConfiguration) -> Arc<DirectoryService> {
    sketching::test_init();

    let mut ds_config = DirectoryServiceConfig {
        suffixes: vec![Dn::parse(TEST_SUFFIX).expect("Invalid test suffix")],
        changelog: config.changelog,
        admin_password: Some(config.admin_password.to_string()),
        allow_anonymous_access: config.allow_anonymous_access,
        ..Default::default()
    };
    if let Some(interceptors) = config.interceptors {
        ds_config.interceptors = interceptors;
    }
    let suffixes = ds_config
        .partition_suffixes()
        .expect("Failed to build the partition suffixes");
    let partition = Arc::new(MemoryPartition::new(suffixes));

    let test_server =
        DirectoryService::new(ds_config, partition).expect("Failed to setup the directory service");
    test_server.startup().expect("startup failed!");

    // The fixtures aren't part of what a test changes.
    let admin = test_server.admin_session();
    for ou in ["people", "groups"] {
        let dn = Dn::parse(&format!("ou={},{}", ou, TEST_SUFFIX)).expect("Invalid test dn");
        let entry = entry_init!(
            dn.clone(),
            (Attribute::ObjectClass, EntryClass::Top.as_ref()),
            (Attribute::ObjectClass, EntryClass::OrganizationalUnit.as_ref()),
            (Attribute::Ou, ou)
        );
        let mut ctx = admin
            .context(dn, AddOp { entry })
            .with_bypass(Bypass::from_names(&[CHANGELOG_INTERCEPTOR]));
        test_server
            .operation_manager()
            .add(&mut ctx)
            .expect("Failed to add the test fixtures");
    }

    test_server
}

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use boot_migrate::config::ConnectionDescriptor;
use boot_migrate::infra::db::{ConnectionFactory, ConnectionHandle};
use migration::{
    DatabaseConnection, DbErr, MigrateError, MigrateResult, MigrationConfig, MigrationEngine,
};

#[ctor::ctor]
fn init_logging() {
    test_support::logging::init();
}

/// Shared record of what the fakes were asked to do.
#[derive(Default)]
pub struct Recorder {
    pub opened: AtomicU32,
    pub closed: AtomicU32,
    pub migrated: AtomicU32,
    pub descriptors: Mutex<Vec<ConnectionDescriptor>>,
    pub configs: Mutex<Vec<MigrationConfig>>,
}

impl Recorder {
    pub fn opened(&self) -> u32 {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> u32 {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn migrated(&self) -> u32 {
        self.migrated.load(Ordering::SeqCst)
    }

    pub fn last_descriptor(&self) -> Option<ConnectionDescriptor> {
        self.descriptors.lock().unwrap().last().cloned()
    }

    pub fn last_config(&self) -> Option<MigrationConfig> {
        self.configs.lock().unwrap().last().cloned()
    }
}

/// Factory whose first `fail_opens` calls are refused.
pub struct FakeFactory {
    pub recorder: Arc<Recorder>,
    pub fail_opens: u32,
    pub valid: bool,
    pub close_fails: bool,
}

impl FakeFactory {
    pub fn healthy(recorder: &Arc<Recorder>) -> Self {
        Self {
            recorder: Arc::clone(recorder),
            fail_opens: 0,
            valid: true,
            close_fails: false,
        }
    }
}

pub struct FakeHandle {
    conn: DatabaseConnection,
    valid: bool,
    close_fails: bool,
    recorder: Arc<Recorder>,
}

#[async_trait]
impl ConnectionFactory for FakeFactory {
    type Handle = FakeHandle;

    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<FakeHandle, DbErr> {
        let attempt = self.recorder.opened.fetch_add(1, Ordering::SeqCst) + 1;
        self.recorder
            .descriptors
            .lock()
            .unwrap()
            .push(descriptor.clone());

        if attempt <= self.fail_opens {
            return Err(DbErr::Custom(format!("connection refused (attempt {attempt})")));
        }

        Ok(FakeHandle {
            conn: DatabaseConnection::Disconnected,
            valid: self.valid,
            close_fails: self.close_fails,
            recorder: Arc::clone(&self.recorder),
        })
    }
}

#[async_trait]
impl ConnectionHandle for FakeHandle {
    fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    async fn is_valid(&self, _timeout: Duration) -> bool {
        self.valid
    }

    async fn close(self) -> Result<(), DbErr> {
        self.recorder.closed.fetch_add(1, Ordering::SeqCst);
        if self.close_fails {
            Err(DbErr::Custom("close failed".into()))
        } else {
            Ok(())
        }
    }
}

pub enum EngineBehavior {
    Apply { count: usize, version: Option<&'static str> },
    RejectChecksum,
}

pub struct FakeEngine {
    pub recorder: Arc<Recorder>,
    pub behavior: EngineBehavior,
}

impl FakeEngine {
    pub fn applying(recorder: &Arc<Recorder>, count: usize, version: Option<&'static str>) -> Self {
        Self {
            recorder: Arc::clone(recorder),
            behavior: EngineBehavior::Apply { count, version },
        }
    }

    pub fn rejecting(recorder: &Arc<Recorder>) -> Self {
        Self {
            recorder: Arc::clone(recorder),
            behavior: EngineBehavior::RejectChecksum,
        }
    }
}

#[async_trait]
impl MigrationEngine for FakeEngine {
    async fn migrate(
        &self,
        _db: &DatabaseConnection,
        config: &MigrationConfig,
    ) -> Result<MigrateResult, MigrateError> {
        self.recorder.migrated.fetch_add(1, Ordering::SeqCst);
        self.recorder.configs.lock().unwrap().push(config.clone());

        match &self.behavior {
            EngineBehavior::Apply { count, version } => Ok(MigrateResult {
                migrations_executed: *count,
                target_schema_version: version.map(str::to_string),
            }),
            EngineBehavior::RejectChecksum => Err(MigrateError::ChecksumMismatch {
                version: "2".into(),
                applied: Some(1),
                resolved: 2,
            }),
        }
    }
}

pub fn postgres_descriptor() -> ConnectionDescriptor {
    ConnectionDescriptor::new("jdbc:postgresql://localhost:5432/app", "app", "secret")
}

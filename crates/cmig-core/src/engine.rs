//! Migration engine
//!
//! Ties export and import to one store, one configuration and one audit
//! trail. Each import runs inside a single store transaction: it commits only
//! when every directive resolved and the call is not a dry run.

use crate::audit::AuditTrail;
use crate::config::MigrationConfig;
use crate::error::MigrationResult;
use crate::options::ImportOptions;
use crate::report::ImportReport;
use cmig_graph::{build, Export, ExportOptions, RootSelector};
use cmig_model::{Bundle, EntityKey, ResolvedMapping};
use cmig_resolver::MappingResolver;
use cmig_store::{Transaction, TransactionalStore};
use tracing::{debug, info, warn};

/// Export and import over one store
#[derive(Debug)]
pub struct MigrationEngine<S: TransactionalStore> {
    store: S,
    config: MigrationConfig,
    audit: AuditTrail,
}

impl<S: TransactionalStore> MigrationEngine<S> {
    /// Engine over `store`
    #[must_use]
    pub fn new(store: S, config: MigrationConfig) -> Self {
        Self {
            store,
            config,
            audit: AuditTrail::new(),
        }
    }

    /// Export options seeded from the configuration
    #[must_use]
    pub fn export_options(&self) -> ExportOptions {
        self.config.export_options()
    }

    /// Import options seeded from the configuration
    #[must_use]
    pub fn import_options(&self) -> ImportOptions {
        ImportOptions::new().with_activate(self.config.activate_by_default)
    }

    /// Export `root` and its dependencies, dependencies first
    ///
    /// When sealing is requested without a passphrase, the configured
    /// environment variable supplies one.
    ///
    /// # Errors
    ///
    /// Missing root, missing passphrase, store failures.
    pub fn export(&self, root: &RootSelector, mut options: ExportOptions) -> MigrationResult<Export> {
        if options.encrypt_secrets && options.passphrase.is_none() {
            options.passphrase = self.config.passphrase();
        }
        debug!(root = ?root, options = ?options, "export requested");
        let export = build(&self.store, root, options)?;
        export.verify()?;
        debug!(
            references = export.bundle.references.len(),
            directives = export.bundle.mappings.len(),
            cyclic = export.dag.is_cyclic(),
            "export verified"
        );
        Ok(export)
    }

    /// Import `bundle` into the store
    ///
    /// Conflicts are reported per directive and roll the whole import back.
    ///
    /// # Errors
    ///
    /// Malformed bundle, unopenable secrets, store failures other than
    /// unique-key violations.
    pub fn import(&self, bundle: &Bundle, options: ImportOptions) -> MigrationResult<ImportReport> {
        let mut bundle = bundle.clone();
        bundle.validate()?;
        let passphrase = options.passphrase.clone().or_else(|| self.config.passphrase());
        bundle.open_secrets(passphrase.as_deref())?;

        info!(
            directives = bundle.mappings.len(),
            test = options.test,
            activate = options.activate,
            "import started"
        );
        let mut txn = self.store.begin()?;
        let resolution = MappingResolver::new(&mut txn, options.write_options()).resolve(&bundle)?;

        if resolution.has_errors() {
            txn.rollback();
            let report = ImportReport::new(resolution.mappings, false, options.test);
            warn!(summary = %report.summary(), "import conflicted; rolled back");
            return Ok(report);
        }
        if options.test {
            txn.rollback();
            let report = ImportReport::new(resolution.mappings, false, true);
            info!(summary = %report.summary(), "test import finished; rolled back");
            return Ok(report);
        }

        txn.commit()?;
        let report = ImportReport::new(resolution.mappings, true, false);
        if self.config.audit_enabled {
            self.record(&report.results, &options);
        }
        info!(summary = %report.summary(), "import committed");
        Ok(report)
    }

    fn record(&self, results: &[ResolvedMapping], options: &ImportOptions) {
        for mapping in results {
            let Some(action) = mapping.action_taken else {
                continue;
            };
            let directive = &mapping.directive;
            let target = mapping.target_id().unwrap_or(&directive.src_id).clone();
            let subject = EntityKey::new(directive.entity_type, target);
            let detail = match &options.version_comment {
                Some(comment) => format!("src={} comment={comment}", directive.src_id),
                None => format!("src={}", directive.src_id),
            };
            let sequence = self.audit.append(action.to_string(), subject.to_string(), detail);
            debug!(sequence, subject = %subject, "audit record appended");
        }
    }

    /// The store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Records of committed imports
    #[inline]
    #[must_use]
    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    /// Give the store back
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }
}

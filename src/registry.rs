//! Schema registry: record descriptors and custom decoders in one namespace.
//!
//! Entries are immutable once inserted and handed out as `Arc`s, so readers
//! holding a descriptor are never affected by later registrations. The table
//! itself sits behind a read-write lock; registration takes the write side,
//! lookups the read side.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, OnceLock},
};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::{
    codec::CustomDecoder,
    descriptor::{FieldDescriptor, RecordDescriptor},
    errors::SchemaError,
    record::{RecordDef, Schema},
};

/// A registered name: either a record layout or a custom decoder.
#[derive(Clone)]
pub enum Entry {
    Record(Arc<RecordDescriptor>),
    Decoder(Arc<dyn CustomDecoder>),
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Record(record) => f.debug_tuple("Record").field(&record.name).finish(),
            Entry::Decoder(_) => f.write_str("Decoder"),
        }
    }
}

/// What to do with a record declaration containing unusable fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchemaPolicy {
    /// Reject the record; nothing is inserted.
    #[default]
    Strict,
    /// Insert the record and skip the unusable fields when decoding.
    Lenient,
}

/// Outcome of a successful registration call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Inserted; `unusable` counts fields a lenient registry will skip.
    Added { unusable: usize },
    /// The name was already taken; nothing changed.
    AlreadyRegistered,
}

#[derive(Debug, Default)]
pub struct Registry {
    policy: SchemaPolicy,
    entries: RwLock<HashMap<String, Entry>>,
    diagnostics: Mutex<Vec<SchemaError>>,
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: SchemaPolicy) -> Self {
        Registry {
            policy,
            ..Default::default()
        }
    }

    /// Process-wide strict registry, created on first use.
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(Registry::new)
    }

    pub fn policy(&self) -> SchemaPolicy {
        self.policy
    }

    /// Registers a custom decoder under `name`. Must happen before any record
    /// referring to it is registered.
    pub fn register_decoder<D>(&self, name: &str, decoder: D) -> Registration
    where
        D: CustomDecoder + 'static,
    {
        let mut entries = self.entries.write();
        if entries.contains_key(name) {
            debug!(name, "already registered");
            return Registration::AlreadyRegistered;
        }

        entries.insert(name.to_string(), Entry::Decoder(Arc::new(decoder)));
        debug!(name, "decoder registered");
        Registration::Added { unusable: 0 }
    }

    /// Compiles and registers a record declaration. Nested records and
    /// decoders it names must be registered already.
    pub fn register_record(&self, def: &RecordDef) -> Result<Registration, SchemaError> {
        let mut entries = self.entries.write();
        if entries.contains_key(&def.name) {
            debug!(record = %def.name, "already registered");
            return Ok(Registration::AlreadyRegistered);
        }

        let descriptor = RecordDescriptor::compile(def, &entries);
        let errors: Vec<SchemaError> = descriptor.unusable().map(|(_, e)| e.clone()).collect();

        // A rejected record can be declared again; report each problem once.
        let mut diagnostics = self.diagnostics.lock();
        for error in &errors {
            if !diagnostics.contains(error) {
                warn!(record = error.record(), field = error.field(), "{error}");
                diagnostics.push(error.clone());
            }
        }
        drop(diagnostics);

        if let (SchemaPolicy::Strict, Some(first)) = (self.policy, errors.first()) {
            return Err(first.clone());
        }

        debug!(
            record = %def.name,
            fields = descriptor.field_count(),
            unusable = errors.len(),
            "record registered"
        );
        entries.insert(def.name.clone(), Entry::Record(Arc::new(descriptor)));

        Ok(Registration::Added {
            unusable: errors.len(),
        })
    }

    /// Registers the layout of a typed record.
    pub fn register<S: Schema>(&self) -> Result<Registration, SchemaError> {
        self.register_record(&S::record_def())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Entry> {
        self.entries.read().get(name).cloned()
    }

    pub fn record(&self, name: &str) -> Option<Arc<RecordDescriptor>> {
        match self.get(name)? {
            Entry::Record(record) => Some(record),
            Entry::Decoder(_) => None,
        }
    }

    pub fn decoder(&self, name: &str) -> Option<Arc<dyn CustomDecoder>> {
        match self.get(name)? {
            Entry::Decoder(decoder) => Some(decoder),
            Entry::Record(_) => None,
        }
    }

    /// Descriptor of field `index` of record `name`, `None` for unusable fields.
    pub fn field(&self, name: &str, index: usize) -> Option<FieldDescriptor> {
        self.record(name)?.field(index).cloned()
    }

    /// Every schema problem reported so far, in registration order.
    pub fn diagnostics(&self) -> Vec<SchemaError> {
        self.diagnostics.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use tracing_test::traced_test;

    use crate::{codec::DomainName, descriptor::FieldKind};

    use super::*;

    fn question() -> RecordDef {
        RecordDef::new("question")
            .decoded("qname", DomainName::NAME)
            .uint("qtype", 16)
            .uint("qclass", 16)
    }

    #[test]
    fn test_register_decoder_then_record() {
        let registry = Registry::new();
        assert_eq!(
            registry.register_decoder(DomainName::NAME, DomainName),
            Registration::Added { unusable: 0 }
        );
        assert_eq!(
            registry.register_record(&question()),
            Ok(Registration::Added { unusable: 0 })
        );

        let qtype = registry.field("question", 1).unwrap();
        assert!(matches!(qtype.kind, FieldKind::Uint { bits: 16, .. }));
        assert!(registry.decoder(DomainName::NAME).is_some());
        assert!(registry.record(DomainName::NAME).is_none());
        assert!(registry.diagnostics().is_empty());
    }

    #[test]
    fn test_strict_rejects_forward_reference() {
        let registry = Registry::new();
        let err = registry.register_record(&question()).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnregisteredDecoder {
                record: "question".to_string(),
                field: "qname".to_string(),
                decoder: DomainName::NAME.to_string(),
            }
        );
        assert!(!registry.contains("question"));
        assert_eq!(registry.diagnostics(), vec![err]);

        // Registering in the right order afterwards succeeds.
        registry.register_decoder(DomainName::NAME, DomainName);
        assert!(registry.register_record(&question()).is_ok());
    }

    #[test]
    fn test_lenient_keeps_unusable_fields() {
        let registry = Registry::with_policy(SchemaPolicy::Lenient);
        assert_eq!(
            registry.register_record(&question()),
            Ok(Registration::Added { unusable: 1 })
        );

        let record = registry.record("question").unwrap();
        assert_eq!(record.unusable().map(|(i, _)| i).collect::<Vec<_>>(), vec![0]);
        assert!(registry.field("question", 0).is_none());
        assert!(registry.field("question", 2).is_some());
    }

    #[test]
    #[traced_test]
    fn test_registration_is_idempotent() {
        let registry = Registry::with_policy(SchemaPolicy::Lenient);
        registry.register_record(&question()).unwrap();
        let before = registry.record("question").unwrap();

        assert_eq!(
            registry.register_record(&RecordDef::new("question").uint("other", 3)),
            Ok(Registration::AlreadyRegistered)
        );
        assert_eq!(
            registry.register_decoder("question", DomainName),
            Registration::AlreadyRegistered
        );

        let after = registry.record("question").unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(registry.diagnostics().len(), 1);
        assert!(logs_contain("needs to be registered before question"));
    }

    #[test]
    #[traced_test]
    fn test_rejected_registration_retried() {
        let registry = Registry::new();
        let def = RecordDef::new("q").decoded("qname", "nope");

        for _ in 0..2 {
            assert!(matches!(
                registry.register_record(&def),
                Err(SchemaError::UnregisteredDecoder { .. })
            ));
        }

        assert!(!registry.contains("q"));
        assert_eq!(registry.diagnostics().len(), 1);
        logs_assert(|lines: &[&str]| {
            match lines
                .iter()
                .filter(|line| line.contains("decoder nope needs to be registered before q"))
                .count()
            {
                1 => Ok(()),
                n => Err(format!("expected one warning, got {n}")),
            }
        });
    }

    #[test]
    fn test_nested_requires_prior_registration() {
        let registry = Registry::new();
        let header = RecordDef::new("header").uint("id", 16);
        let message = RecordDef::new("message").nested("header", "header");

        assert!(matches!(
            registry.register_record(&message),
            Err(SchemaError::UnregisteredRecord { .. })
        ));
        registry.register_record(&header).unwrap();
        registry.register_record(&message).unwrap();
        assert!(matches!(
            registry.field("message", 0).unwrap().kind,
            FieldKind::Nested(_)
        ));
    }

    #[test]
    fn test_concurrent_first_registration() {
        let registry = Arc::new(Registry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    registry
                        .register_record(&RecordDef::new("shared").uint("a", 8))
                        .unwrap()
                })
            })
            .collect();

        let added = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| matches!(r, Registration::Added { .. }))
            .count();
        assert_eq!(added, 1);
    }

    #[test]
    fn test_global_registry_is_shared() {
        Registry::global().register_decoder("global-test-decoder", DomainName);
        assert!(Registry::global().contains("global-test-decoder"));
    }
}

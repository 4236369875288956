//! Target identification.
//!
//! A [`Catalog`] is an ordered list of [`TargetVariant`]s. Each variant pairs a
//! [`Predicate`] telling whether a debug session shows that chip with a constructor
//! building the [`Target`]. [`Catalog::identify`] evaluates the predicates in order
//! and constructs the first variant that matches.

mod fingerprint;

pub use fingerprint::{ApTopology, AuxiliaryIdentity, ComponentIdentity, CpuCount, Fingerprint};

use crate::{
    architecture::arm::{AccessPortKind, ComponentKind},
    probe::AccessError,
    vendor, Error, Session, Target,
};

/// Why a session does not show a particular chip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, docsplay::Display)]
pub enum Mismatch {
    /// Access port {0} is missing.
    MissingAccessPort(u8),

    /// Expected exactly the access ports {expected:?}, found {found:?}.
    UnexpectedAccessPorts {
        /// The expected access ports.
        expected: &'static [u8],
        /// The access ports of the session.
        found: Vec<u8>,
    },

    /// Access port {access_port} is an {found}, expected an {expected}.
    WrongAccessPortKind {
        /// Index of the access port.
        access_port: u8,
        /// The expected kind.
        expected: AccessPortKind,
        /// The actual kind.
        found: AccessPortKind,
    },

    /// Access port {0} has no base component.
    MissingBaseComponent(u8),

    /// The base component of access port {access_port} has CIDR {cidr:#010x} and PIDR {pidr:#018x}.
    ComponentIdentity {
        /// Index of the access port.
        access_port: u8,
        /// The actual CIDR.
        cidr: u32,
        /// The actual PIDR.
        pidr: u64,
    },

    /// Expected {expected} CPUs, found {found}.
    CpuCount {
        /// The bound on the number of CPUs.
        expected: CpuCount,
        /// The number of CPUs of the session.
        found: usize,
    },

    /// Expected one {component}, found {found}.
    AuxiliaryComponent {
        /// The component searched for.
        component: ComponentKind,
        /// The number of matching components.
        found: usize,
    },

    /// The identification register at {address:#010x} reads {value:#010x}.
    AuxiliaryIdentity {
        /// Address of the register.
        address: u64,
        /// The value read.
        value: u32,
    },
}

/// The outcome of a predicate that does not match.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum ProbeError {
    /// The session does not match: {0}
    Mismatch(#[from] Mismatch),

    /// Probing was inconclusive.
    Inconclusive(#[from] Error),
}

impl From<AccessError> for ProbeError {
    fn from(error: AccessError) -> Self {
        ProbeError::Inconclusive(error.into())
    }
}

/// Decides whether a session shows a particular chip.
///
/// A predicate may read through the access ports of the session. A failing bus
/// transaction is reported as [`ProbeError::Inconclusive`], never as a mismatch.
pub trait Predicate: Send + Sync {
    /// Evaluates the predicate.
    fn evaluate(&self, session: &mut Session) -> Result<(), ProbeError>;
}

impl<F> Predicate for F
where
    F: Fn(&mut Session) -> Result<(), ProbeError> + Send + Sync,
{
    fn evaluate(&self, session: &mut Session) -> Result<(), ProbeError> {
        self(session)
    }
}

type Constructor = dyn Fn(Session) -> Result<Target, Error> + Send + Sync;

/// A chip variant the catalog can identify.
pub struct TargetVariant {
    name: &'static str,
    predicate: Box<dyn Predicate>,
    constructor: Box<Constructor>,
}

impl std::fmt::Debug for TargetVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetVariant")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl TargetVariant {
    /// Creates a variant.
    ///
    /// The constructor only runs after the predicate matched. It takes over the
    /// session and reads the chip identification through it.
    pub fn new<P, C>(name: &'static str, predicate: P, constructor: C) -> Self
    where
        P: Predicate + 'static,
        C: Fn(Session) -> Result<Target, Error> + Send + Sync + 'static,
    {
        TargetVariant {
            name,
            predicate: Box::new(predicate),
            constructor: Box::new(constructor),
        }
    }

    /// The name of the variant.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// A variant that did not match, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantMismatch {
    /// Name of the variant.
    pub variant: &'static str,
    /// The first predicate step that failed.
    pub reason: Mismatch,
}

/// The outcome of probing a session.
#[derive(Debug)]
pub enum Identification {
    /// A variant matched and was constructed.
    Identified(Target),
    /// No variant matched. This is not an error: the chip may simply be unsupported
    /// or unpowered.
    NoTargetIdentified {
        /// The session, handed back unchanged.
        session: Session,
        /// The reason each variant was rejected, in catalog order.
        mismatches: Vec<VariantMismatch>,
    },
}

impl Identification {
    /// The identified target, if any.
    pub fn target(self) -> Option<Target> {
        match self {
            Identification::Identified(target) => Some(target),
            Identification::NoTargetIdentified { .. } => None,
        }
    }
}

/// An ordered list of target variants, matched first to last.
#[derive(Default)]
pub struct Catalog {
    variants: Vec<TargetVariant>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.variants.iter().map(TargetVariant::name))
            .finish()
    }
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog of all built-in variants.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for vendor in vendor::vendors() {
            tracing::trace!("Adding the variants of {}", vendor);
            for variant in vendor.variants() {
                catalog.push(variant);
            }
        }
        catalog
    }

    /// Adds a variant with the lowest priority.
    pub fn push(&mut self, variant: TargetVariant) {
        self.variants.push(variant);
    }

    /// Adds a variant with the highest priority, so it can override built-in ones.
    pub fn register(&mut self, variant: TargetVariant) {
        self.variants.insert(0, variant);
    }

    /// The variants, in priority order.
    pub fn variants(&self) -> impl Iterator<Item = &TargetVariant> {
        self.variants.iter()
    }

    /// Identifies the chip behind `session`.
    ///
    /// The first variant whose predicate matches is constructed, later variants are
    /// not looked at. A transport failure while evaluating a predicate is returned as
    /// an error instead of being taken for a mismatch.
    pub fn identify(&self, mut session: Session) -> Result<Identification, Error> {
        let mut mismatches = Vec::new();

        for variant in &self.variants {
            match variant.predicate.evaluate(&mut session) {
                Ok(()) => {
                    tracing::info!("Identified {}", variant.name);
                    let target = (variant.constructor)(session)?;
                    return Ok(Identification::Identified(target));
                }
                Err(ProbeError::Mismatch(reason)) => {
                    tracing::debug!("Not a {}: {}", variant.name, reason);
                    mismatches.push(VariantMismatch {
                        variant: variant.name,
                        reason,
                    });
                }
                Err(ProbeError::Inconclusive(error)) => {
                    tracing::warn!("Probing for {} failed: {}", variant.name, error);
                    return Err(error);
                }
            }
        }

        tracing::info!("No target identified");
        Ok(Identification::NoTargetIdentified {
            session,
            mismatches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        target::ChipIdentity,
        test::{MockAccessPort, MockProbe},
    };
    use pretty_assertions::assert_eq;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn session() -> Session {
        Session::new(Box::new(MockProbe::new()))
            .with_access_port(0, Box::new(MockAccessPort::ahb()))
    }

    fn always(_: &mut Session) -> Result<(), ProbeError> {
        Ok(())
    }

    fn never(_: &mut Session) -> Result<(), ProbeError> {
        Err(Mismatch::MissingAccessPort(7).into())
    }

    fn counting_variant(name: &'static str, calls: &Arc<AtomicUsize>) -> TargetVariant {
        let calls = Arc::clone(calls);
        TargetVariant::new(name, always, move |session| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Target::new(name, 1_000_000, ChipIdentity::default(), session))
        })
    }

    #[test]
    fn first_match_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut catalog = Catalog::new();
        catalog.push(counting_variant("first", &first));
        catalog.push(counting_variant("second", &second));

        let target = catalog.identify(session()).unwrap().target().unwrap();

        assert_eq!(target.name(), "first");
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn registered_variants_take_precedence() {
        let builtin = Arc::new(AtomicUsize::new(0));
        let custom = Arc::new(AtomicUsize::new(0));
        let mut catalog = Catalog::new();
        catalog.push(counting_variant("builtin", &builtin));
        catalog.register(counting_variant("custom", &custom));

        let names: Vec<&str> = catalog.variants().map(TargetVariant::name).collect();
        assert_eq!(names, vec!["custom", "builtin"]);

        let target = catalog.identify(session()).unwrap().target().unwrap();
        assert_eq!(target.name(), "custom");
        assert_eq!(builtin.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn no_match_is_not_an_error() {
        let mut catalog = Catalog::new();
        catalog.push(TargetVariant::new("never", never, |_| {
            unreachable!("constructor of a variant that never matches")
        }));

        match catalog.identify(session()).unwrap() {
            Identification::NoTargetIdentified {
                session,
                mismatches,
            } => {
                assert!(session.has_access_port(0));
                assert_eq!(
                    mismatches,
                    vec![VariantMismatch {
                        variant: "never",
                        reason: Mismatch::MissingAccessPort(7),
                    }]
                );
            }
            Identification::Identified(target) => panic!("identified {target}"),
        }
    }

    #[test]
    fn inconclusive_probing_stops_identification() {
        let later = Arc::new(AtomicUsize::new(0));
        let mut catalog = Catalog::new();
        catalog.push(TargetVariant::new(
            "faulty",
            |session: &mut Session| -> Result<(), ProbeError> {
                let port = session
                    .access_port_mut(0)
                    .ok_or(Mismatch::MissingAccessPort(0))?;
                port.read_word_32(0xE004_2000)?;
                Ok(())
            },
            |_| unreachable!("constructor of a variant that never matches"),
        ));
        catalog.push(counting_variant("later", &later));

        let port = MockAccessPort::ahb();
        port.fail_at(0xE004_2000);
        let session =
            Session::new(Box::new(MockProbe::new())).with_access_port(0, Box::new(port));

        assert!(matches!(
            catalog.identify(session),
            Err(Error::Access(AccessError::Fault(0xE004_2000)))
        ));
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn constructor_errors_are_returned() {
        let mut catalog = Catalog::new();
        catalog.push(TargetVariant::new("broken", always, |_| {
            Err(anyhow::anyhow!("flash size register is blank").into())
        }));

        assert!(matches!(
            catalog.identify(session()),
            Err(Error::Other(_))
        ));
    }

    #[test]
    fn builtin_catalog_order() {
        let names: Vec<&str> = Catalog::builtin()
            .variants()
            .map(TargetVariant::name)
            .collect();

        assert_eq!(names, vec!["STM32H7xx DP", "STM32G4", "STM32WB55"]);
    }
}

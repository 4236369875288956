use super::{Mismatch, Predicate, ProbeError};
use crate::{
    architecture::arm::{AccessPortKind, ComponentKind},
    Session,
};

/// Which access ports a chip exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApTopology {
    /// Exactly these access ports, no more and no less.
    Exactly(&'static [u8]),
    /// At least these access ports.
    Includes(&'static [u8]),
}

/// The expected identification registers of the root component behind an access port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentIdentity {
    /// The access port to look behind.
    pub access_port: u8,
    /// Expected CIDR.
    pub cidr: u32,
    /// Expected PIDR.
    pub pidr: u64,
}

/// A bound on the number of CPUs found on the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, docsplay::Display)]
pub enum CpuCount {
    /// exactly {0}
    Exactly(usize),
    /// at most {0}
    AtMost(usize),
}

impl CpuCount {
    /// Returns `true` if `count` CPUs satisfy the bound.
    pub fn admits(&self, count: usize) -> bool {
        match *self {
            CpuCount::Exactly(expected) => count == expected,
            CpuCount::AtMost(max) => count <= max,
        }
    }
}

/// A masked identification register behind a component of the component tree.
///
/// Used to tell chips apart that look the same from the outside, by reading for
/// example the DBGMCU IDCODE through the system debug bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxiliaryIdentity {
    /// The access port whose component tree is searched.
    pub access_port: u8,
    /// The component to search for. Exactly one must be present, the root included.
    pub component: ComponentKind,
    /// Offset of the register from the base address of the component.
    pub register_offset: u64,
    /// Bits of the register to compare.
    pub mask: u32,
    /// Expected value of the masked register.
    pub value: u32,
}

/// The identifying traits of a chip family, checked in a fixed order.
///
/// 1. the access port topology,
/// 2. the kinds of specific access ports,
/// 3. CIDR and PIDR of the root component behind an access port,
/// 4. the number of CPUs,
/// 5. optionally, an auxiliary identification register.
///
/// Only the last step touches the bus, all others work on what the transport found
/// while opening the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    /// Required access ports.
    pub topology: ApTopology,
    /// Required kinds of individual access ports.
    pub access_port_kinds: &'static [(u8, AccessPortKind)],
    /// Identification of a root component.
    pub identity: ComponentIdentity,
    /// Bound on the number of CPUs.
    pub cpus: CpuCount,
    /// Optional auxiliary identification register.
    pub auxiliary: Option<AuxiliaryIdentity>,
}

impl Fingerprint {
    fn check_topology(&self, session: &Session) -> Result<(), Mismatch> {
        let required = match self.topology {
            ApTopology::Exactly(required) | ApTopology::Includes(required) => required,
        };

        if let Some(&missing) = required.iter().find(|&&ap| !session.has_access_port(ap)) {
            return Err(Mismatch::MissingAccessPort(missing));
        }

        if let ApTopology::Exactly(expected) = self.topology {
            let found: Vec<u8> = session.access_port_indices().collect();
            if found.len() != expected.len() {
                return Err(Mismatch::UnexpectedAccessPorts { expected, found });
            }
        }

        Ok(())
    }

    fn check_kinds(&self, session: &Session) -> Result<(), Mismatch> {
        for &(index, expected) in self.access_port_kinds {
            let port = session
                .access_port(index)
                .ok_or(Mismatch::MissingAccessPort(index))?;

            if port.kind() != expected {
                return Err(Mismatch::WrongAccessPortKind {
                    access_port: index,
                    expected,
                    found: port.kind(),
                });
            }
        }

        Ok(())
    }

    fn check_identity(&self, session: &Session) -> Result<(), Mismatch> {
        let ComponentIdentity {
            access_port,
            cidr,
            pidr,
        } = self.identity;

        let component = session
            .access_port(access_port)
            .ok_or(Mismatch::MissingAccessPort(access_port))?
            .base_component()
            .ok_or(Mismatch::MissingBaseComponent(access_port))?;

        if component.cidr() != cidr || component.pidr() != pidr {
            return Err(Mismatch::ComponentIdentity {
                access_port,
                cidr: component.cidr(),
                pidr: component.pidr(),
            });
        }

        Ok(())
    }

    fn check_auxiliary(
        &self,
        session: &mut Session,
        auxiliary: &AuxiliaryIdentity,
    ) -> Result<(), ProbeError> {
        let address = {
            let root = session
                .access_port(auxiliary.access_port)
                .ok_or(Mismatch::MissingAccessPort(auxiliary.access_port))?
                .base_component()
                .ok_or(Mismatch::MissingBaseComponent(auxiliary.access_port))?;

            match root.find_components_by_type(auxiliary.component).as_slice() {
                [component] => component.address() + auxiliary.register_offset,
                found => {
                    return Err(Mismatch::AuxiliaryComponent {
                        component: auxiliary.component,
                        found: found.len(),
                    }
                    .into())
                }
            }
        };

        let port = session
            .access_port_mut(auxiliary.access_port)
            .ok_or(Mismatch::MissingAccessPort(auxiliary.access_port))?;
        let value = port.read_word_32(address)?;

        if value & auxiliary.mask != auxiliary.value {
            return Err(Mismatch::AuxiliaryIdentity { address, value }.into());
        }

        Ok(())
    }
}

impl Predicate for Fingerprint {
    fn evaluate(&self, session: &mut Session) -> Result<(), ProbeError> {
        self.check_topology(session)?;
        self.check_kinds(session)?;
        self.check_identity(session)?;

        if !self.cpus.admits(session.cpu_count()) {
            return Err(Mismatch::CpuCount {
                expected: self.cpus,
                found: session.cpu_count(),
            }
            .into());
        }

        if let Some(auxiliary) = &self.auxiliary {
            self.check_auxiliary(session, auxiliary)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        architecture::arm::Component,
        test::{MockAccessPort, MockCpu, MockProbe, Transaction},
        AccessError,
    };
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    const ROM_TABLE: u32 = 0xB105_100D;

    const FINGERPRINT: Fingerprint = Fingerprint {
        topology: ApTopology::Exactly(&[0, 1]),
        access_port_kinds: &[(1, AccessPortKind::Apb)],
        identity: ComponentIdentity {
            access_port: 1,
            cidr: ROM_TABLE,
            pidr: 0xA0450,
        },
        cpus: CpuCount::AtMost(1),
        auxiliary: Some(AuxiliaryIdentity {
            access_port: 1,
            component: ComponentKind::StRomTable { part: 0x450 },
            register_offset: 0x1000,
            mask: 0xFFF,
            value: 0x450,
        }),
    };

    fn session(aps: &[u8], kind: AccessPortKind, pidr: u64, cpus: usize) -> Session {
        let mut session = Session::new(Box::new(MockProbe::new()));
        for &index in aps {
            let port = MockAccessPort::new(kind)
                .with_base_component(Component::new(0xE00E_0000, ROM_TABLE, pidr));
            port.set_word(0xE00E_1000, 0x1003_6450);
            session = session.with_access_port(index, Box::new(port));
        }
        for _ in 0..cpus {
            session = session.with_cpu(Box::new(MockCpu::new()));
        }
        session
    }

    fn evaluate(session: &mut Session) -> Result<(), Mismatch> {
        match FINGERPRINT.evaluate(session) {
            Ok(()) => Ok(()),
            Err(ProbeError::Mismatch(mismatch)) => Err(mismatch),
            Err(ProbeError::Inconclusive(error)) => panic!("unexpected error: {error}"),
        }
    }

    #[test]
    fn matching_session() {
        let mut session = session(&[0, 1], AccessPortKind::Apb, 0xA0450, 1);
        assert_eq!(evaluate(&mut session), Ok(()));
    }

    #[test_case(&[0], Mismatch::MissingAccessPort(1); "missing port")]
    #[test_case(&[0, 1, 2], Mismatch::UnexpectedAccessPorts { expected: &[0, 1], found: vec![0, 1, 2] }; "extra port")]
    fn topology_mismatches(aps: &[u8], expected: Mismatch) {
        let mut session = session(aps, AccessPortKind::Apb, 0xA0450, 1);
        assert_eq!(evaluate(&mut session), Err(expected));
    }

    #[test]
    fn wrong_access_port_kind() {
        let mut session = session(&[0, 1], AccessPortKind::Ahb, 0xA0450, 1);

        assert_eq!(
            evaluate(&mut session),
            Err(Mismatch::WrongAccessPortKind {
                access_port: 1,
                expected: AccessPortKind::Apb,
                found: AccessPortKind::Ahb,
            })
        );
    }

    #[test]
    fn wrong_identity() {
        let mut session = session(&[0, 1], AccessPortKind::Apb, 0xA0483, 1);

        assert_eq!(
            evaluate(&mut session),
            Err(Mismatch::ComponentIdentity {
                access_port: 1,
                cidr: ROM_TABLE,
                pidr: 0xA0483,
            })
        );
    }

    #[test]
    fn missing_base_component() {
        let mut session = Session::new(Box::new(MockProbe::new()))
            .with_access_port(0, Box::new(MockAccessPort::apb()))
            .with_access_port(1, Box::new(MockAccessPort::apb()));

        assert_eq!(
            evaluate(&mut session),
            Err(Mismatch::MissingBaseComponent(1))
        );
    }

    #[test]
    fn too_many_cpus() {
        let mut session = session(&[0, 1], AccessPortKind::Apb, 0xA0450, 2);

        assert_eq!(
            evaluate(&mut session),
            Err(Mismatch::CpuCount {
                expected: CpuCount::AtMost(1),
                found: 2,
            })
        );
    }

    #[test]
    fn auxiliary_register_is_read_through_the_component() {
        let port = MockAccessPort::apb()
            .with_base_component(Component::new(0xE00E_0000, ROM_TABLE, 0xA0450));
        let handle = port.handle();
        handle.set_word(0xE00E_1000, 0x2001_6483);
        let mut session = Session::new(Box::new(MockProbe::new()))
            .with_access_port(0, Box::new(MockAccessPort::ahb()))
            .with_access_port(1, Box::new(port));

        assert_eq!(
            evaluate(&mut session),
            Err(Mismatch::AuxiliaryIdentity {
                address: 0xE00E_1000,
                value: 0x2001_6483,
            })
        );
        assert_eq!(handle.transactions(), vec![Transaction::Read(0xE00E_1000)]);
    }

    #[test]
    fn auxiliary_component_must_be_unique() {
        let root = Component::new(0xE00E_0000, ROM_TABLE, 0xA0450).with_children(vec![
            Component::new(0xE00F_0000, ROM_TABLE, 0xA0450),
        ]);
        let mut session = Session::new(Box::new(MockProbe::new()))
            .with_access_port(0, Box::new(MockAccessPort::ahb()))
            .with_access_port(1, Box::new(MockAccessPort::apb().with_base_component(root)));

        assert_eq!(
            evaluate(&mut session),
            Err(Mismatch::AuxiliaryComponent {
                component: ComponentKind::StRomTable { part: 0x450 },
                found: 2,
            })
        );
    }

    #[test]
    fn bus_faults_are_inconclusive() {
        let port = MockAccessPort::apb()
            .with_base_component(Component::new(0xE00E_0000, ROM_TABLE, 0xA0450));
        port.fail_at(0xE00E_1000);
        let mut session = Session::new(Box::new(MockProbe::new()))
            .with_access_port(0, Box::new(MockAccessPort::ahb()))
            .with_access_port(1, Box::new(port));

        assert!(matches!(
            FINGERPRINT.evaluate(&mut session),
            Err(ProbeError::Inconclusive(crate::Error::Access(
                AccessError::Fault(0xE00E_1000)
            )))
        ));
    }

    #[test]
    fn cpu_bounds() {
        assert!(CpuCount::Exactly(1).admits(1));
        assert!(!CpuCount::Exactly(1).admits(0));
        assert!(CpuCount::AtMost(2).admits(0));
        assert!(!CpuCount::AtMost(2).admits(3));
    }
}

//! CoreSight component identification.
//!
//! Every CoreSight component carries a component ID (CIDR) and a peripheral ID (PIDR)
//! in the last words of its 4 KiB block. The transport reads them while it walks the
//! ROM tables behind an access port and hands the resulting tree to chipmap as a
//! [`Component`].

use jep106::JEP106Code;

/// The CIDR bits that are fixed for every CoreSight component.
const CIDR_PREAMBLE_MASK: u32 = 0xFFFF_0FFF;
const CIDR_PREAMBLE: u32 = 0xB105_000D;

/// JEP106 code of ARM Ltd.
const ARM: JEP106Code = JEP106Code { cc: 0x04, id: 0x3B };
/// JEP106 code of STMicroelectronics.
const ST: JEP106Code = JEP106Code { cc: 0x00, id: 0x20 };

/// The component class, as encoded in CIDR1.
///
/// Described in section D1.2.1 of the ADIv5.2 spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, docsplay::Display)]
pub enum ComponentClass {
    /// Generic verification component
    GenericVerification,
    /// ROM table
    RomTable,
    /// CoreSight component
    CoreSight,
    /// Peripheral test block
    PeripheralTestBlock,
    /// Generic IP component
    GenericIp,
    /// CoreLink, PrimeCell or system component
    CoreLinkOrPrimeCell,
    /// Unknown component class {0:#x}
    Unknown(u8),
}

impl From<u8> for ComponentClass {
    fn from(value: u8) -> Self {
        match value {
            0x0 => ComponentClass::GenericVerification,
            0x1 => ComponentClass::RomTable,
            0x9 => ComponentClass::CoreSight,
            0xB => ComponentClass::PeripheralTestBlock,
            0xE => ComponentClass::GenericIp,
            0xF => ComponentClass::CoreLinkOrPrimeCell,
            other => ComponentClass::Unknown(other),
        }
    }
}

/// Peripheral ID information for a CoreSight component.
///
/// Described in section D1.2.2 of the ADIv5.2 spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeripheralId {
    part: u16,
    designer: Option<JEP106Code>,
    revision: u8,
    modification: u8,
    revand: u8,
    size_log2: u8,
}

impl PeripheralId {
    /// Decodes the eight PIDR bytes, PIDR0 in the lowest byte.
    pub fn from_raw(pidr: u64) -> Self {
        let jep106_id = ((pidr >> 12) & 0x7F) as u8;
        let continuation_code = ((pidr >> 32) & 0x0F) as u8;
        let uses_jep106 = pidr & (1 << 19) != 0;

        PeripheralId {
            part: (pidr & 0xFFF) as u16,
            designer: uses_jep106.then(|| JEP106Code::new(continuation_code, jep106_id)),
            revision: ((pidr >> 20) & 0x0F) as u8,
            modification: ((pidr >> 24) & 0x0F) as u8,
            revand: ((pidr >> 28) & 0x0F) as u8,
            size_log2: ((pidr >> 36) & 0x0F) as u8,
        }
    }

    /// The part number, unique for the designer.
    pub fn part(&self) -> u16 {
        self.part
    }

    /// The JEP106 code of the designer.
    ///
    /// `None` for legacy components that predate JEP106 identification.
    pub fn designer(&self) -> Option<JEP106Code> {
        self.designer
    }

    /// The name of the designer, if it is a known JEP106 manufacturer.
    pub fn designer_name(&self) -> Option<&'static str> {
        self.designer.and_then(|code| code.get())
    }

    /// Major revision of the component.
    pub fn revision(&self) -> u8 {
        self.revision
    }

    /// Modifications made by the implementor, 0 if there are none.
    pub fn modification(&self) -> u8 {
        self.modification
    }

    /// Minor errata fixes of the component.
    pub fn revand(&self) -> u8 {
        self.revand
    }

    /// The number of 4 KiB blocks the component occupies.
    pub fn size_in_blocks(&self) -> u32 {
        1 << self.size_log2
    }
}

/// The kinds of components that can be searched for in a component tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, docsplay::Display)]
pub enum ComponentKind {
    /// any ROM table
    RomTable,
    /// ARM System Control Space
    Scs,
    /// ARM Data Watchpoint and Trace unit
    Dwt,
    /// ARM Flash Patch and Breakpoint unit
    Fpb,
    /// ARM Instrumentation Trace Macrocell
    Itm,
    /// ARM Trace Port Interface Unit
    Tpiu,
    /// ARM Embedded Trace Macrocell
    Etm,
    /// ARM trace funnel
    TraceFunnel,
    /// ST ROM table with part number {part:#05x}
    #[ignore_extra_doc_attributes]
    ///
    /// ST places the DBGMCU block of a chip right behind this ROM table.
    StRomTable {
        /// The part number, which matches the DEV_ID of the chip.
        part: u16,
    },
}

impl ComponentKind {
    fn arm_parts(&self) -> &'static [u16] {
        match self {
            ComponentKind::Scs => &[0x000, 0x008, 0x00C, 0xD21],
            ComponentKind::Dwt => &[0x002, 0x00A, 0xD02],
            ComponentKind::Fpb => &[0x003, 0x00B, 0x00E, 0xD03],
            ComponentKind::Itm => &[0x001, 0xD01],
            ComponentKind::Tpiu => &[0x923, 0x9A1, 0x9A9, 0xD31],
            ComponentKind::Etm => &[0x924, 0x925, 0x975, 0xD41],
            ComponentKind::TraceFunnel => &[0x908, 0x9EB],
            ComponentKind::RomTable | ComponentKind::StRomTable { .. } => &[],
        }
    }

    /// Returns `true` if `component` is of this kind.
    pub fn matches(&self, component: &Component) -> bool {
        let id = component.peripheral_id();

        match self {
            ComponentKind::RomTable => component.class() == ComponentClass::RomTable,
            ComponentKind::StRomTable { part } => {
                component.class() == ComponentClass::RomTable
                    && id.designer() == Some(ST)
                    && id.part() == *part
            }
            arm => id.designer() == Some(ARM) && arm.arm_parts().contains(&id.part()),
        }
    }
}

/// A CoreSight component and the components listed in its ROM table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    address: u64,
    cidr: u32,
    pidr: u64,
    children: Vec<Component>,
}

impl Component {
    /// Creates a component without children.
    pub fn new(address: u64, cidr: u32, pidr: u64) -> Self {
        Component {
            address,
            cidr,
            pidr,
            children: Vec::new(),
        }
    }

    /// Attaches the components found in the ROM table of this component.
    pub fn with_children(mut self, children: Vec<Component>) -> Self {
        self.children = children;
        self
    }

    /// The base address of the component.
    pub fn address(&self) -> u64 {
        self.address
    }

    /// The raw component ID.
    pub fn cidr(&self) -> u32 {
        self.cidr
    }

    /// The raw peripheral ID.
    pub fn pidr(&self) -> u64 {
        self.pidr
    }

    /// Components listed in the ROM table of this component.
    pub fn children(&self) -> &[Component] {
        &self.children
    }

    /// Returns `true` if the fixed preamble bits of the CIDR are correct.
    pub fn has_valid_preamble(&self) -> bool {
        self.cidr & CIDR_PREAMBLE_MASK == CIDR_PREAMBLE
    }

    /// The class of the component.
    pub fn class(&self) -> ComponentClass {
        ComponentClass::from(((self.cidr >> 12) & 0x0F) as u8)
    }

    /// The decoded peripheral ID.
    pub fn peripheral_id(&self) -> PeripheralId {
        PeripheralId::from_raw(self.pidr)
    }

    /// Iterates over this component and all of its descendants, depth first.
    pub fn iter(&self) -> ComponentIter<'_> {
        ComponentIter { stack: vec![self] }
    }

    /// Returns all components in this tree, this one included, of the given kind.
    ///
    /// Components with a broken CIDR preamble are skipped.
    pub fn find_components_by_type(&self, kind: ComponentKind) -> Vec<&Component> {
        self.iter()
            .filter(|component| {
                if !component.has_valid_preamble() {
                    tracing::warn!(
                        "Skipping component at {:#010x} with invalid CIDR {:#010x}",
                        component.address,
                        component.cidr
                    );
                    return false;
                }
                kind.matches(component)
            })
            .collect()
    }
}

/// Depth-first iterator over a component tree, parents before their children.
pub struct ComponentIter<'a> {
    stack: Vec<&'a Component>,
}

impl<'a> Iterator for ComponentIter<'a> {
    type Item = &'a Component;

    fn next(&mut self) -> Option<Self::Item> {
        let component = self.stack.pop()?;
        // Reversed, so the first child is visited first.
        self.stack.extend(component.children.iter().rev());
        Some(component)
    }
}

use super::component::Component;
use crate::probe::AccessError;

/// The bus an access port bridges to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, docsplay::Display)]
pub enum AccessPortKind {
    /// AHB-AP
    Ahb,
    /// APB-AP
    Apb,
    /// other access port
    Other,
}

/// A memory access port reached through the debug transport.
///
/// Addresses are byte addresses on the bus behind the port. Every call is one or
/// more blocking bus transactions, and a failed transaction is reported as is:
/// implementations must not retry behind the back of the caller.
pub trait AccessPort {
    /// The bus this port bridges to.
    fn kind(&self) -> AccessPortKind;

    /// The root component found behind this port, if the port has a ROM table.
    fn base_component(&self) -> Option<&Component>;

    /// Reads a 32-bit word. `address` must be 4-byte aligned.
    fn read_word_32(&mut self, address: u64) -> Result<u32, AccessError>;

    /// Writes a 32-bit word. `address` must be 4-byte aligned.
    fn write_word_32(&mut self, address: u64, value: u32) -> Result<(), AccessError>;

    /// Reads a block of bytes of any alignment and length.
    ///
    /// The default implementation is built on aligned word reads, so every word
    /// touching the requested range is read exactly once.
    fn read_8(&mut self, address: u64, data: &mut [u8]) -> Result<(), AccessError> {
        let mut word_address = address & !0x3;
        let mut skip = (address - word_address) as usize;
        let mut filled = 0;

        while filled < data.len() {
            let word = self.read_word_32(word_address)?.to_le_bytes();
            let available = &word[skip..];
            let count = available.len().min(data.len() - filled);

            data[filled..filled + count].copy_from_slice(&available[..count]);

            filled += count;
            skip = 0;
            word_address += 4;
        }

        Ok(())
    }

    /// Reads `len` bytes starting at `address`.
    fn read_bulk(&mut self, address: u64, len: usize) -> Result<Vec<u8>, AccessError> {
        let mut data = vec![0; len];
        self.read_8(address, &mut data)?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{MockAccessPort, Transaction};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn port() -> MockAccessPort {
        let port = MockAccessPort::ahb();
        port.set_bytes(0x2000_0000, &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
        port
    }

    #[test_case(0x2000_0000, 4, &[0, 1, 2, 3]; "aligned word")]
    #[test_case(0x2000_0001, 2, &[1, 2]; "inside a word")]
    #[test_case(0x2000_0003, 6, &[3, 4, 5, 6, 7, 8]; "across words")]
    #[test_case(0x2000_0004, 0, &[]; "empty")]
    fn read_bulk(address: u64, len: usize, expected: &[u8]) {
        let mut port = port();

        assert_eq!(port.read_bulk(address, len).unwrap(), expected);
    }

    #[test]
    fn every_word_is_read_once() {
        let mut port = port();
        let mut data = [0; 9];

        port.read_8(0x2000_0002, &mut data).unwrap();

        assert_eq!(data, [2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(
            port.transactions(),
            vec![
                Transaction::Read(0x2000_0000),
                Transaction::Read(0x2000_0004),
                Transaction::Read(0x2000_0008),
            ]
        );
    }

    #[test]
    fn faults_are_passed_on() {
        let mut port = port();
        port.fail_at(0x2000_0004);

        assert!(matches!(
            port.read_bulk(0x2000_0000, 8),
            Err(AccessError::Fault(0x2000_0004))
        ));
    }
}

//! Persistent network credentials
//!
//! Settings block kept in flash/EEPROM by the device's setup page:
//!
//! | offset | size | field                                   |
//! |--------|------|-----------------------------------------|
//! | 0      | 4    | CRC-32 of bytes 4.., little-endian      |
//! | 4      | 64   | network name, NUL-terminated            |
//! | 68     | 64   | network passphrase, NUL-terminated      |
//!
//! An erased block (all `0xFF`) fails the checksum. Reading and writing the
//! backing storage is the board's job; this module only handles the image.

use heapless::String;

use crate::error::StorageError;

/// Size of one string entry, terminator included
pub const STRING_SIZE: usize = 64;

const CHECKSUM_SIZE: usize = 4;

/// Total size of the settings block
pub const BLOCK_SIZE: usize = CHECKSUM_SIZE + 2 * STRING_SIZE;

/// Longest value an entry holds
pub type EntryValue = String<{ STRING_SIZE - 1 }>;

/// String entries of the settings block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Entry {
    NetworkName,
    Passphrase,
}

impl Entry {
    const fn offset(self) -> usize {
        match self {
            Self::NetworkName => CHECKSUM_SIZE,
            Self::Passphrase => CHECKSUM_SIZE + STRING_SIZE,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::NetworkName => "network_name",
            Self::Passphrase => "network_passphrase",
        }
    }
}

/// In-memory image of the settings block
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialBlock {
    bytes: [u8; BLOCK_SIZE],
}

impl CredentialBlock {
    /// Image of freshly erased storage
    pub const fn erased() -> Self {
        Self {
            bytes: [0xFF; BLOCK_SIZE],
        }
    }

    /// Wrap bytes read back from storage
    pub const fn from_bytes(bytes: [u8; BLOCK_SIZE]) -> Self {
        Self { bytes }
    }

    /// Bytes to write back to storage
    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.bytes
    }

    fn stored_checksum(&self) -> u32 {
        u32::from_le_bytes([self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]])
    }

    fn computed_checksum(&self) -> u32 {
        crc32fast::hash(&self.bytes[CHECKSUM_SIZE..])
    }

    /// Ok if the stored checksum matches the entries
    pub fn verify(&self) -> Result<(), StorageError> {
        let stored = self.stored_checksum();
        let computed = self.computed_checksum();
        if stored == computed {
            Ok(())
        } else {
            Err(StorageError::Checksum { stored, computed })
        }
    }

    /// Value of an entry, up to its terminator
    ///
    /// Does not check the checksum; see [`CredentialBlock::verify`].
    pub fn get(&self, entry: Entry) -> Result<EntryValue, StorageError> {
        let start = entry.offset();
        let raw = &self.bytes[start..start + STRING_SIZE - 1];
        let len = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
        let value = core::str::from_utf8(&raw[..len]).map_err(|_| StorageError::Encoding(entry))?;
        String::try_from(value).map_err(|_| StorageError::TooLong(entry))
    }

    /// Store a value and its terminator
    ///
    /// The checksum is stale until [`CredentialBlock::commit`].
    pub fn set(&mut self, entry: Entry, value: &str) -> Result<(), StorageError> {
        if value.len() >= STRING_SIZE {
            return Err(StorageError::TooLong(entry));
        }
        let start = entry.offset();
        self.bytes[start..start + value.len()].copy_from_slice(value.as_bytes());
        self.bytes[start + value.len()] = 0;
        Ok(())
    }

    /// Recompute the checksum over the entries
    pub fn commit(&mut self) {
        let checksum = self.computed_checksum().to_le_bytes();
        self.bytes[..CHECKSUM_SIZE].copy_from_slice(&checksum);
    }

    /// Wipe all entries
    pub fn clear(&mut self) {
        *self = Self::erased();
    }
}

impl Default for CredentialBlock {
    fn default() -> Self {
        Self::erased()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provisioned() -> CredentialBlock {
        let mut block = CredentialBlock::erased();
        block.set(Entry::NetworkName, "civic-lab").unwrap();
        block.set(Entry::Passphrase, "hunter22").unwrap();
        block.commit();
        block
    }

    #[test]
    fn test_layout() {
        let block = provisioned();
        let bytes = block.as_bytes();
        assert_eq!(bytes.len(), 132);
        assert_eq!(&bytes[4..14], b"civic-lab\0");
        assert_eq!(&bytes[68..77], b"hunter22\0");
        // CRC-32/ISO-HDLC, as the device firmware computes it
        let crc = crc32fast::hash(&bytes[4..]);
        assert_eq!(&bytes[..4], &crc.to_le_bytes());
    }

    #[test]
    fn test_read_back() {
        let block = CredentialBlock::from_bytes(*provisioned().as_bytes());
        assert!(block.verify().is_ok());
        assert_eq!(block.get(Entry::NetworkName).unwrap().as_str(), "civic-lab");
        assert_eq!(block.get(Entry::Passphrase).unwrap().as_str(), "hunter22");
    }

    #[test]
    fn test_erased_block_is_invalid() {
        let block = CredentialBlock::default();
        assert!(matches!(
            block.verify(),
            Err(StorageError::Checksum { stored: 0xFFFF_FFFF, .. })
        ));
    }

    #[test]
    fn test_uncommitted_change_is_invalid() {
        let mut block = provisioned();
        block.set(Entry::Passphrase, "changed").unwrap();
        assert!(block.verify().is_err());
        block.commit();
        assert!(block.verify().is_ok());
    }

    #[test]
    fn test_corruption_detected() {
        let mut bytes = *provisioned().as_bytes();
        bytes[6] ^= 0x01;
        assert!(CredentialBlock::from_bytes(bytes).verify().is_err());
    }

    #[test]
    fn test_value_limits() {
        let mut block = CredentialBlock::erased();
        let longest = "x".repeat(STRING_SIZE - 1);
        block.set(Entry::NetworkName, &longest).unwrap();
        assert_eq!(block.get(Entry::NetworkName).unwrap().len(), STRING_SIZE - 1);

        let too_long = "x".repeat(STRING_SIZE);
        assert_eq!(
            block.set(Entry::Passphrase, &too_long),
            Err(StorageError::TooLong(Entry::Passphrase))
        );
    }

    #[test]
    fn test_clear() {
        let mut block = provisioned();
        block.clear();
        assert_eq!(block.as_bytes(), &[0xFF; BLOCK_SIZE]);
    }

    #[test]
    fn test_invalid_text() {
        let mut bytes = *provisioned().as_bytes();
        bytes[4] = 0xFF;
        let block = CredentialBlock::from_bytes(bytes);
        assert_eq!(
            block.get(Entry::NetworkName),
            Err(StorageError::Encoding(Entry::NetworkName))
        );
    }
}

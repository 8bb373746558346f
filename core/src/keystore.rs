// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Persistent account storage
//!
//! Accounts are held in fixed-size slots within a byte-addressable
//! [`Storage`] region, laid out as contiguous arrays of each field:
//!
//! ```text
//! [ sk * MAX_ACCOUNTS | pk * MAX_ACCOUNTS | msk * MAX_ACCOUNTS | salt * MAX_ACCOUNTS | ssid | password ]
//! ```
//!
//! Erased storage reads as `0xFF`, so an account whose public key is all
//! `0xFF` (or all `0x00`) has never been generated.

use static_assertions::const_assert_eq;
use zeroize::Zeroize;

use keychain_proto::{MAX_ACCOUNTS, MSK_LEN, PK_LEN, SALT_LEN, SETTING_LEN, SK_LEN};

use crate::{
    engine::Error,
    settings::DeviceSettings,
    signer::{KeyPair, PublicKey},
};

/// Offset of secret key slots
pub const SK_OFFSET: usize = 0;
/// Offset of public key slots
pub const PK_OFFSET: usize = SK_OFFSET + SK_LEN * MAX_ACCOUNTS;
/// Offset of derived secret slots
pub const MSK_OFFSET: usize = PK_OFFSET + PK_LEN * MAX_ACCOUNTS;
/// Offset of salt slots
pub const SALT_OFFSET: usize = MSK_OFFSET + MSK_LEN * MAX_ACCOUNTS;
/// Offset of the settings region
pub const SETTINGS_OFFSET: usize = SALT_OFFSET + SALT_LEN * MAX_ACCOUNTS;
/// Length of the settings region (SSID then password)
pub const SETTINGS_LEN: usize = SETTING_LEN * 2;
/// Total storage length required by the [`Keystore`]
pub const STORAGE_LEN: usize = SETTINGS_OFFSET + SETTINGS_LEN;

/// Value of erased storage
pub const ERASED: u8 = 0xFF;

const_assert_eq!(SETTINGS_OFFSET, 160 * MAX_ACCOUNTS);

/// [`Storage`] trait provides platform persistence for [`Keystore`] instances
pub trait Storage {
    /// Read bytes from `offset` into `buff`
    fn read_bytes(&self, offset: usize, buff: &mut [u8]);

    /// Write `data` to storage at `offset`
    ///
    /// Writes may be buffered until [`Storage::commit`] is called.
    fn write_bytes(&mut self, offset: usize, data: &[u8]);

    /// Persist any buffered writes
    fn commit(&mut self);

    /// Length of the stored proving artifact
    fn artifact_len(&self) -> usize;

    /// Read artifact bytes from `offset` into `buff`, returning the number of bytes read
    fn read_artifact(&self, offset: usize, buff: &mut [u8]) -> usize;
}

impl<T: Storage> Storage for &mut T {
    fn read_bytes(&self, offset: usize, buff: &mut [u8]) {
        T::read_bytes(self, offset, buff)
    }

    fn write_bytes(&mut self, offset: usize, data: &[u8]) {
        T::write_bytes(self, offset, data)
    }

    fn commit(&mut self) {
        T::commit(self)
    }

    fn artifact_len(&self) -> usize {
        T::artifact_len(self)
    }

    fn read_artifact(&self, offset: usize, buff: &mut [u8]) -> usize {
        T::read_artifact(self, offset, buff)
    }
}

/// Validated account slot index, in the range `0..MAX_ACCOUNTS`
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct AccountIndex(u8);

impl AccountIndex {
    /// Create an [`AccountIndex`], returning `None` if out of range
    pub const fn new(index: usize) -> Option<Self> {
        if index < MAX_ACCOUNTS {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    /// Fetch the slot index
    pub const fn get(&self) -> usize {
        self.0 as usize
    }

    /// Iterate over all account slots
    pub fn iter() -> impl Iterator<Item = Self> {
        (0..MAX_ACCOUNTS as u8).map(Self)
    }
}

impl TryFrom<i32> for AccountIndex {
    type Error = Error;

    fn try_from(index: i32) -> Result<Self, Self::Error> {
        usize::try_from(index)
            .ok()
            .and_then(Self::new)
            .ok_or(Error::InvalidIndex)
    }
}

impl From<AccountIndex> for i32 {
    fn from(index: AccountIndex) -> Self {
        index.0 as i32
    }
}

impl core::fmt::Display for AccountIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account material held in a single slot
#[derive(Clone, PartialEq)]
pub struct AccountRecord {
    pub key_pair: KeyPair,
    pub msk: [u8; MSK_LEN],
    pub salt: [u8; SALT_LEN],
}

impl AccountRecord {
    /// Check whether this record holds a generated account
    pub fn is_initialized(&self) -> bool {
        is_initialized(&self.key_pair.pk)
    }
}

impl core::fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccountRecord")
            .field("key_pair", &self.key_pair)
            .finish_non_exhaustive()
    }
}

impl Drop for AccountRecord {
    fn drop(&mut self) {
        self.msk.zeroize();
        self.salt.zeroize();
    }
}

/// Check whether a stored public key belongs to a generated account
pub fn is_initialized(pk: &PublicKey) -> bool {
    !(pk.iter().all(|b| *b == ERASED) || pk.iter().all(|b| *b == 0x00))
}

/// [`Keystore`] maps account slots and settings onto a [`Storage`] region
pub struct Keystore<S: Storage> {
    storage: S,
}

impl<S: Storage> Keystore<S> {
    /// Create a new [`Keystore`] over the provided storage
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Read the account record for the provided slot
    pub fn read(&self, index: AccountIndex) -> AccountRecord {
        let i = index.get();

        let mut r = AccountRecord {
            key_pair: KeyPair::default(),
            msk: [0u8; MSK_LEN],
            salt: [0u8; SALT_LEN],
        };

        self.storage
            .read_bytes(SK_OFFSET + i * SK_LEN, &mut r.key_pair.sk);
        self.storage
            .read_bytes(PK_OFFSET + i * PK_LEN, &mut r.key_pair.pk);
        self.storage
            .read_bytes(MSK_OFFSET + i * MSK_LEN, &mut r.msk);
        self.storage
            .read_bytes(SALT_OFFSET + i * SALT_LEN, &mut r.salt);

        r
    }

    /// Read the public key for the provided slot
    pub fn public_key(&self, index: AccountIndex) -> PublicKey {
        let mut pk = [0u8; PK_LEN];
        self.storage
            .read_bytes(PK_OFFSET + index.get() * PK_LEN, &mut pk);
        pk
    }

    /// Check whether the provided slot holds a generated account
    pub fn is_initialized(&self, index: AccountIndex) -> bool {
        is_initialized(&self.public_key(index))
    }

    /// Write (and commit) an account record to the provided slot
    pub fn write(&mut self, index: AccountIndex, record: &AccountRecord) {
        let i = index.get();

        self.storage
            .write_bytes(SK_OFFSET + i * SK_LEN, &record.key_pair.sk);
        self.storage
            .write_bytes(PK_OFFSET + i * PK_LEN, &record.key_pair.pk);
        self.storage
            .write_bytes(MSK_OFFSET + i * MSK_LEN, &record.msk);
        self.storage
            .write_bytes(SALT_OFFSET + i * SALT_LEN, &record.salt);

        self.storage.commit();
    }

    /// Read stored settings, returning `None` if settings have never been written
    pub fn settings(&self) -> Option<DeviceSettings> {
        let mut buff = [0u8; SETTINGS_LEN];
        self.storage.read_bytes(SETTINGS_OFFSET, &mut buff);

        DeviceSettings::from_bytes(&buff)
    }

    /// Write (and commit) device settings
    pub fn write_settings(&mut self, settings: &DeviceSettings) {
        let mut buff = settings.to_bytes();

        self.storage.write_bytes(SETTINGS_OFFSET, &buff);
        self.storage.commit();

        buff.zeroize();
    }

    /// Length of the stored proving artifact
    pub fn artifact_len(&self) -> usize {
        self.storage.artifact_len()
    }

    /// Read artifact bytes from `offset`, returning the number of bytes read
    pub fn read_artifact(&self, offset: usize, buff: &mut [u8]) -> usize {
        self.storage.read_artifact(offset, buff)
    }

    /// Access the underlying storage
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Mutably access the underlying storage
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::MemStorage;

    #[test]
    fn layout() {
        assert_eq!(PK_OFFSET, 160);
        assert_eq!(MSK_OFFSET, 480);
        assert_eq!(SALT_OFFSET, 640);
        assert_eq!(SETTINGS_OFFSET, 800);
        assert_eq!(STORAGE_LEN, 864);
    }

    #[test]
    fn account_index_bounds() {
        assert_eq!(AccountIndex::try_from(0).map(|i| i.get()), Ok(0));
        assert_eq!(
            AccountIndex::try_from(MAX_ACCOUNTS as i32 - 1).map(|i| i.get()),
            Ok(MAX_ACCOUNTS - 1)
        );
        assert_eq!(
            AccountIndex::try_from(MAX_ACCOUNTS as i32),
            Err(Error::InvalidIndex)
        );
        assert_eq!(AccountIndex::try_from(-1), Err(Error::InvalidIndex));
        assert_eq!(AccountIndex::iter().count(), MAX_ACCOUNTS);
    }

    #[test]
    fn erased_storage_is_uninitialized() {
        let ks = Keystore::new(MemStorage::default());

        for i in AccountIndex::iter() {
            assert!(!ks.is_initialized(i));
            assert!(!ks.read(i).is_initialized());
        }

        assert_eq!(ks.settings(), None);
    }

    #[test]
    fn zeroed_key_is_uninitialized() {
        assert!(!is_initialized(&[0u8; PK_LEN]));

        let mut pk = [0u8; PK_LEN];
        pk[PK_LEN - 1] = 1;
        assert!(is_initialized(&pk));
    }

    #[test]
    fn write_read_slot() {
        let mut ks = Keystore::new(MemStorage::default());
        let i = AccountIndex::new(3).unwrap();

        let r = AccountRecord {
            key_pair: KeyPair {
                sk: [0x11; SK_LEN],
                pk: [0x22; PK_LEN],
            },
            msk: [0x33; MSK_LEN],
            salt: [0x44; SALT_LEN],
        };

        ks.write(i, &r);

        assert_eq!(ks.read(i), r);
        assert_eq!(ks.storage().commits, 1);

        // Neighbouring slots are untouched
        for j in AccountIndex::iter().filter(|j| *j != i) {
            assert!(!ks.is_initialized(j), "slot {j} modified");
        }
    }
}

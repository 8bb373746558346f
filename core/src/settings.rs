// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Provisioning access point settings

use heapless::String;
use zeroize::Zeroize;

use keychain_proto::SETTING_LEN;

use crate::{engine::Error, keystore::ERASED};

/// SSID reported while settings have never been written
pub const DEFAULT_SSID: &str = "Aztec keychain";

/// Minimum password length for a provisioned access point
pub const MIN_PASSWORD_LEN: usize = 8;

/// Access point settings for the provisioning interface
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DeviceSettings {
    ssid: String<SETTING_LEN>,
    password: String<SETTING_LEN>,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        let mut ssid = String::new();
        // DEFAULT_SSID is shorter than SETTING_LEN
        let _ = ssid.push_str(DEFAULT_SSID);

        Self {
            ssid,
            password: String::new(),
        }
    }
}

impl DeviceSettings {
    /// Create validated settings
    ///
    /// SSIDs must be 1 to 32 bytes, passwords 8 to 32 bytes, and neither
    /// may contain NUL characters (used as padding in storage).
    pub fn new(ssid: &str, password: &str) -> Result<Self, Error> {
        if ssid.is_empty() || password.len() < MIN_PASSWORD_LEN {
            return Err(Error::InvalidLength);
        }

        if ssid.contains('\0') || password.contains('\0') {
            return Err(Error::InvalidArgument);
        }

        let ssid = String::try_from(ssid).map_err(|_| Error::InvalidLength)?;
        let password = String::try_from(password).map_err(|_| Error::InvalidLength)?;

        Ok(Self { ssid, password })
    }

    /// Access point SSID
    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    /// Access point password
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Check whether an access point password has been configured
    pub fn is_provisioned(&self) -> bool {
        self.password.len() >= MIN_PASSWORD_LEN
    }

    /// Encode settings to their zero-padded storage form
    pub(crate) fn to_bytes(&self) -> [u8; SETTING_LEN * 2] {
        let mut buff = [0u8; SETTING_LEN * 2];

        buff[..self.ssid.len()].copy_from_slice(self.ssid.as_bytes());
        buff[SETTING_LEN..][..self.password.len()].copy_from_slice(self.password.as_bytes());

        buff
    }

    /// Decode settings from storage, `None` if erased or corrupt
    pub(crate) fn from_bytes(buff: &[u8; SETTING_LEN * 2]) -> Option<Self> {
        let (ssid, password) = buff.split_at(SETTING_LEN);

        if ssid.iter().all(|b| *b == ERASED) {
            return None;
        }

        let ssid = read_padded(ssid)?;
        let password = read_padded(password)?;

        if ssid.is_empty() {
            return None;
        }

        Some(Self { ssid, password })
    }
}

impl Drop for DeviceSettings {
    fn drop(&mut self) {
        // heapless::String does not implement Zeroize
        let mut p = core::mem::take(&mut self.password).into_bytes();
        p.zeroize();
    }
}

/// Read a zero-padded UTF-8 field
fn read_padded(buff: &[u8]) -> Option<String<SETTING_LEN>> {
    let n = buff.iter().position(|b| *b == 0).unwrap_or(buff.len());

    let s = core::str::from_utf8(&buff[..n]).ok()?;

    String::try_from(s).ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let s = DeviceSettings::default();

        assert_eq!(s.ssid(), DEFAULT_SSID);
        assert_eq!(s.password(), "");
        assert!(!s.is_provisioned());
    }

    #[test]
    fn validation() {
        let tests: &[(&str, &str, Result<(), Error>)] = &[
            ("keychain", "hunter22", Ok(())),
            ("k", "12345678", Ok(())),
            ("", "12345678", Err(Error::InvalidLength)),
            ("keychain", "1234567", Err(Error::InvalidLength)),
            (
                "0123456789abcdef0123456789abcdef",
                "0123456789abcdef0123456789abcdef",
                Ok(()),
            ),
            (
                "0123456789abcdef0123456789abcdef!",
                "12345678",
                Err(Error::InvalidLength),
            ),
            ("key\0chain", "12345678", Err(Error::InvalidArgument)),
        ];

        for (ssid, password, expected) in tests {
            let r = DeviceSettings::new(ssid, password).map(|_| ());
            assert_eq!(&r, expected, "ssid: {ssid:?} password: {password:?}");
        }
    }

    #[test]
    fn storage_encoding() {
        let s = DeviceSettings::new("keychain", "correct horse").unwrap();
        let b = s.to_bytes();

        assert_eq!(&b[..8], b"keychain");
        assert!(b[8..SETTING_LEN].iter().all(|v| *v == 0));
        assert_eq!(&b[SETTING_LEN..][..13], b"correct horse");

        assert_eq!(DeviceSettings::from_bytes(&b), Some(s));
        assert_eq!(DeviceSettings::from_bytes(&[ERASED; SETTING_LEN * 2]), None);
    }
}

// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Keychain host API library (and CLI)
//!
//! Provides an async [`DeviceHandle`] for issuing commands to keychain
//! devices over the newline delimited JSON command channel, see
//! [`keychain_proto`] for message definitions.
//!
//! ```no_run
//! # async fn demo() -> Result<(), keychain::Error> {
//! let h = keychain::TcpHandle::connect(keychain::DEFAULT_ADDR).await?;
//!
//! match h.account(0).await? {
//!     Some(a) => println!("public key: {}", hex::encode(a.pk)),
//!     None => println!("account 0 not initialised"),
//! }
//! # Ok(())
//! # }
//! ```

use tokio::net::TcpStream;

/// Re-export `keychain-proto` for consumers
pub use keychain_proto::{self as proto};

mod handle;
pub use handle::{DeviceHandle, DEFAULT_REQUEST_TIMEOUT_S, DEFAULT_USER_TIMEOUT_S};

mod error;
pub use error::Error;

/// Default device (simulator) address
pub const DEFAULT_ADDR: &str = "127.0.0.1:1237";

/// Device handle over TCP
pub type TcpHandle = DeviceHandle<TcpStream>;

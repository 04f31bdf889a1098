#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! This crate provides the client side of SASL authentication for the
//! ANONYMOUS, PLAIN, CRAM-MD5, DIGEST-MD5 and GSSAPI mechanisms, including
//! the security layer negotiated by GSSAPI.
//!
//! # Examples
//!
//! ```rust
//! use sasl_negotiate::client::mechanisms::ClientMechanism;
//! use sasl_negotiate::client::Client;
//! use sasl_negotiate::common::Credentials;
//!
//! let creds = Credentials::default()
//!     .with_username("user")
//!     .with_password("pencil");
//!
//! let mechanism = ClientMechanism::from_name("PLAIN", creds).unwrap();
//! let mut client = Client::new("localhost", mechanism);
//!
//! let initial_data = client.start().unwrap().unwrap();
//!
//! assert_eq!(initial_data, b"\0user\0pencil");
//! assert!(client.is_complete());
//! ```
//!
//! Mechanisms where the server speaks first are fed its challenges:
//!
//! ```rust
//! use sasl_negotiate::client::mechanisms::DigestMd5;
//! use sasl_negotiate::client::Client;
//!
//! let mut client = Client::new("elwood.innosoft.com", DigestMd5::new("imap", "chris", "secret"));
//! assert_eq!(client.start().unwrap(), None);
//!
//! let challenge = br#"realm="elwood.innosoft.com",nonce="OA6MG9tEQGm2hh",qop="auth",algorithm=md5-sess,charset=utf-8"#;
//! let response = client.step(Some(challenge)).unwrap().unwrap();
//! assert!(response.starts_with(b"qop=auth,"));
//! ```
//!
//! GSSAPI runs on top of any [`SecurityContext`](client::mechanisms::SecurityContext);
//! enable the `kerberos` feature for one backed by the system Kerberos library.
//!
//! # Usage
//!
//! You can use this in your crate by adding this under `dependencies` in your `Cargo.toml`:
//!
//! ```toml,ignore
//! sasl-negotiate = "*"
//! ```

pub mod client;
pub mod common;

pub use crate::client::mechanisms::ClientMechanism;
pub use crate::client::{Client, Mechanism, MechanismConfig, MechanismError};
pub use crate::common::{Credentials, Identity, Qop, QopSet, Secret};

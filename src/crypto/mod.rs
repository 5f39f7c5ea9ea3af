//! Cryptographic primitives for license signing and at-rest protection.

pub mod canonical;
pub mod mac;
pub mod seal;

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! folio-security: password envelopes and document fingerprints.
//!
//! Envelopes are AES-256-GCM containers (`IV || ciphertext+tag`) layered on
//! top of a PDF's native password protection. Fingerprints are SHA-256 hex
//! digests.

pub mod envelope;
pub mod integrity;

pub use envelope::{
    ENVELOPE_EXTENSION, Envelope, NonceSource, SeededNonceSource, SystemNonceSource,
    decrypt_bytes, encrypt_bytes, open, seal,
};
pub use integrity::hash_bytes;

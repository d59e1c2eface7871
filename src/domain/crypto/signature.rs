use std::fmt;

/// Raw signature bytes returned by the custody service for one digest.
///
/// The encoding matches the key's signature scheme: PKCS#1 v1.5 for RSA,
/// ASN.1 DER Ecdsa-Sig-Value for ECDSA. Transient: copied into the platform
/// output blob and never retained past the callback invocation.
#[derive(Clone, Eq, PartialEq)]
pub struct SignatureBytes {
    bytes: Box<[u8]>,
}

impl SignatureBytes {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes.into()
    }
}

impl fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureBytes(len={})", self.bytes.len())
    }
}

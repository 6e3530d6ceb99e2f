//! Opaque handles to generated assets

use std::sync::Arc;

/// Encoded image bytes (sketch or enhanced render). Cheap to clone.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageHandle {
    bytes: Arc<[u8]>,
}

/// Binary mesh asset (glTF binary). Cheap to clone.
#[derive(Clone, PartialEq, Eq)]
pub struct MeshHandle {
    bytes: Arc<[u8]>,
}

macro_rules! byte_handle {
    ($name:ident) => {
        impl $name {
            pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
                Self { bytes: bytes.into() }
            }

            pub fn bytes(&self) -> &[u8] {
                &self.bytes
            }

            pub fn len(&self) -> usize {
                self.bytes.len()
            }

            pub fn is_empty(&self) -> bool {
                self.bytes.is_empty()
            }
        }

        impl From<Vec<u8>> for $name {
            fn from(bytes: Vec<u8>) -> Self {
                Self::new(bytes)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({} bytes)", stringify!($name), self.bytes.len())
            }
        }
    };
}

byte_handle!(ImageHandle);
byte_handle!(MeshHandle);

use std::borrow::Cow;

use byteorder::{ByteOrder, LittleEndian};

use crate::proof::AuditProofNode;

/// Canonical byte representation of an item fed into the tree.
///
/// Byte strings and text pass through unchanged, integers are encoded little endian with their
/// full width, and already-hashed values (audit proof nodes) contribute their hash as-is.
pub trait ByteCodec {
  fn encode(&self) -> Cow<'_, [u8]>;
}

impl<T: ByteCodec + ?Sized> ByteCodec for &T {
  fn encode(&self) -> Cow<'_, [u8]> {
    (**self).encode()
  }
}

impl ByteCodec for [u8] {
  fn encode(&self) -> Cow<'_, [u8]> {
    Cow::Borrowed(self)
  }
}

impl<const N: usize> ByteCodec for [u8; N] {
  fn encode(&self) -> Cow<'_, [u8]> {
    Cow::Borrowed(self.as_slice())
  }
}

impl ByteCodec for Vec<u8> {
  fn encode(&self) -> Cow<'_, [u8]> {
    Cow::Borrowed(self.as_slice())
  }
}

impl ByteCodec for str {
  fn encode(&self) -> Cow<'_, [u8]> {
    Cow::Borrowed(self.as_bytes())
  }
}

impl ByteCodec for String {
  fn encode(&self) -> Cow<'_, [u8]> {
    Cow::Borrowed(self.as_bytes())
  }
}

impl ByteCodec for AuditProofNode {
  fn encode(&self) -> Cow<'_, [u8]> {
    Cow::Borrowed(self.hash())
  }
}

impl ByteCodec for u8 {
  fn encode(&self) -> Cow<'_, [u8]> {
    Cow::Owned(vec![*self])
  }
}

macro_rules! impl_codec_for_int {
  ($($ty:ty => $write:ident),+ $(,)?) => {
    $(
      impl ByteCodec for $ty {
        fn encode(&self) -> Cow<'_, [u8]> {
          let mut buffer = vec![0u8; core::mem::size_of::<$ty>()];
          LittleEndian::$write(&mut buffer, *self);
          Cow::Owned(buffer)
        }
      }
    )+
  };
}

impl_codec_for_int!(
  u16 => write_u16,
  u32 => write_u32,
  u64 => write_u64,
  u128 => write_u128,
  i16 => write_i16,
  i32 => write_i32,
  i64 => write_i64,
  i128 => write_i128,
);

//! Sentinel instruction matching.

/// `movabs rax, 0xcafebabedeadbeef` on x86-64.
pub const X86_64_MAGIC: [u8; 10] = [0x48, 0xb8, 0xef, 0xbe, 0xad, 0xde, 0xbe, 0xba, 0xfe, 0xca];

/// Exact byte encoding of the instruction that toggles capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelPattern {
    bytes: Box<[u8]>,
}

impl SentinelPattern {
    /// Build a pattern from its encoding. Returns `None` for an empty encoding.
    pub fn new(bytes: impl Into<Box<[u8]>>) -> Option<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return None;
        }
        Some(Self { bytes })
    }

    /// True iff `insn` is exactly the sentinel encoding: same length, same bytes.
    #[inline]
    #[must_use]
    pub fn matches(&self, insn: &[u8]) -> bool {
        *insn == *self.bytes
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
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
}

impl Default for SentinelPattern {
    fn default() -> Self {
        Self {
            bytes: Box::new(X86_64_MAGIC),
        }
    }
}

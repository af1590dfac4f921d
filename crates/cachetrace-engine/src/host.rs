//! Types exchanged with the host runtime that decodes and executes guest code.

/// One decoded instruction of a translation block.
#[derive(Debug, Clone, Copy)]
pub struct InstructionRecord<'a> {
    bytes: &'a [u8],
    accesses_memory: bool,
}

impl<'a> InstructionRecord<'a> {
    #[must_use]
    pub const fn new(bytes: &'a [u8], accesses_memory: bool) -> Self {
        Self {
            bytes,
            accesses_memory,
        }
    }

    #[must_use]
    pub const fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    #[must_use]
    pub const fn byte_length(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub const fn is_memory_access(&self) -> bool {
        self.accesses_memory
    }
}

/// Which accesses a record hook fires on.
///
/// Values match `enum qemu_plugin_mem_rw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum MemAccess {
    Read = 1,
    Write = 2,
    #[default]
    ReadWrite = 3,
}

impl MemAccess {
    /// Decode the raw `qemu_plugin_mem_rw` value.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Self::Read),
            2 => Some(Self::Write),
            3 => Some(Self::ReadWrite),
            _ => None,
        }
    }
}

/// Physical target of a memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    /// Ordinary memory at this physical address.
    Ram(u64),
    /// Device-backed I/O region.
    Io,
}

/// A memory access performed by an executing instruction.
///
/// Resolution is lazy: the engine only calls [`MemoryTransaction::resolve`] while
/// capture is active.
pub trait MemoryTransaction {
    /// Guest virtual address presented by the instruction.
    fn vaddr(&self) -> u64;

    /// Translate to a physical target. `None` if the access cannot be resolved.
    fn resolve(&self) -> Option<Resolved>;
}

/// A memory transaction whose resolution is already known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction {
    pub vaddr: u64,
    pub target: Option<Resolved>,
}

impl Transaction {
    #[must_use]
    pub const fn ram(vaddr: u64, paddr: u64) -> Self {
        Self {
            vaddr,
            target: Some(Resolved::Ram(paddr)),
        }
    }

    #[must_use]
    pub const fn io(vaddr: u64) -> Self {
        Self {
            vaddr,
            target: Some(Resolved::Io),
        }
    }

    #[must_use]
    pub const fn unresolved(vaddr: u64) -> Self {
        Self {
            vaddr,
            target: None,
        }
    }
}

impl MemoryTransaction for Transaction {
    fn vaddr(&self) -> u64 {
        self.vaddr
    }

    fn resolve(&self) -> Option<Resolved> {
        self.target
    }
}

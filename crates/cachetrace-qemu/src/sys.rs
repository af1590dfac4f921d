//! Bindings to the QEMU TCG plugin API (`qemu-plugin.h`, API version 3).
//!
//! Only the subset the tracer uses. The symbols are resolved against the QEMU binary
//! when it loads the plugin.

#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_int, c_uint, c_void};

pub type qemu_plugin_id_t = u64;
pub type qemu_plugin_meminfo_t = u32;

/// Plugin API version this library is built against.
pub const QEMU_PLUGIN_VERSION: c_int = 3;

/// `enum qemu_plugin_cb_flags`
pub const QEMU_PLUGIN_CB_NO_REGS: c_int = 0;

/// Opaque `struct qemu_plugin_tb`.
#[repr(C)]
pub struct qemu_plugin_tb {
    _private: [u8; 0],
}

/// Opaque `struct qemu_plugin_insn`.
#[repr(C)]
pub struct qemu_plugin_insn {
    _private: [u8; 0],
}

/// Opaque `struct qemu_plugin_hwaddr`.
#[repr(C)]
pub struct qemu_plugin_hwaddr {
    _private: [u8; 0],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct qemu_info_version {
    pub min: c_int,
    pub cur: c_int,
}

/// System-emulation arm of the anonymous union in `qemu_info_t`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct qemu_info_system {
    pub smp_vcpus: c_int,
    pub max_vcpus: c_int,
}

/// Matches C's `qemu_info_t`.
#[repr(C)]
pub struct qemu_info_t {
    pub target_name: *const c_char,
    pub version: qemu_info_version,
    pub system_emulation: bool,
    pub system: qemu_info_system,
}

pub type qemu_plugin_vcpu_simple_cb_t = extern "C" fn(id: qemu_plugin_id_t, vcpu_index: c_uint);
pub type qemu_plugin_udata_cb_t = extern "C" fn(id: qemu_plugin_id_t, userdata: *mut c_void);
pub type qemu_plugin_vcpu_tb_trans_cb_t =
    extern "C" fn(id: qemu_plugin_id_t, tb: *mut qemu_plugin_tb);
pub type qemu_plugin_vcpu_udata_cb_t = extern "C" fn(vcpu_index: c_uint, userdata: *mut c_void);
pub type qemu_plugin_vcpu_mem_cb_t = extern "C" fn(
    vcpu_index: c_uint,
    info: qemu_plugin_meminfo_t,
    vaddr: u64,
    userdata: *mut c_void,
);

unsafe extern "C" {
    pub fn qemu_plugin_register_vcpu_init_cb(
        id: qemu_plugin_id_t,
        cb: qemu_plugin_vcpu_simple_cb_t,
    );
    pub fn qemu_plugin_register_vcpu_tb_trans_cb(
        id: qemu_plugin_id_t,
        cb: qemu_plugin_vcpu_tb_trans_cb_t,
    );
    pub fn qemu_plugin_register_atexit_cb(
        id: qemu_plugin_id_t,
        cb: qemu_plugin_udata_cb_t,
        userdata: *mut c_void,
    );

    pub fn qemu_plugin_tb_n_insns(tb: *const qemu_plugin_tb) -> usize;
    pub fn qemu_plugin_tb_get_insn(tb: *const qemu_plugin_tb, idx: usize) -> *mut qemu_plugin_insn;
    pub fn qemu_plugin_insn_data(insn: *const qemu_plugin_insn, dest: *mut c_void, len: usize)
    -> usize;
    pub fn qemu_plugin_insn_size(insn: *const qemu_plugin_insn) -> usize;

    pub fn qemu_plugin_register_vcpu_insn_exec_cb(
        insn: *mut qemu_plugin_insn,
        cb: qemu_plugin_vcpu_udata_cb_t,
        flags: c_int,
        userdata: *mut c_void,
    );
    pub fn qemu_plugin_register_vcpu_mem_cb(
        insn: *mut qemu_plugin_insn,
        cb: qemu_plugin_vcpu_mem_cb_t,
        flags: c_int,
        rw: c_int,
        userdata: *mut c_void,
    );

    pub fn qemu_plugin_get_hwaddr(
        info: qemu_plugin_meminfo_t,
        vaddr: u64,
    ) -> *mut qemu_plugin_hwaddr;
    pub fn qemu_plugin_hwaddr_is_io(haddr: *const qemu_plugin_hwaddr) -> bool;
    pub fn qemu_plugin_hwaddr_phys_addr(haddr: *const qemu_plugin_hwaddr) -> u64;

    pub fn qemu_plugin_outs(string: *const c_char);
}

//! QEMU TCG plugin that records physical addresses of memory traffic between
//! executions of a sentinel instruction.
//!
//! ```text
//! qemu-system-x86_64 -smp 1 -plugin ./libcachetrace_qemu.so,dump=trace.bin -d plugin ...
//! ```
//!
//! # Safety
//!
//! QEMU calls every exported function and callback on the single vCPU thread the
//! plugin accepts, and all pointers it passes are valid for the duration of the call.

mod outs;
mod sys;

use std::ffi::{CStr, c_char, c_int, c_uint, c_void};
use std::ptr;

use cachetrace_engine::{
    CaptureEngine, EngineConfig, Hook, HostInfo, InstructionRecord, MemAccess, MemoryTransaction,
    Resolved, install,
};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use sys::{qemu_info_t, qemu_plugin_id_t, qemu_plugin_meminfo_t, qemu_plugin_tb};

/// Engine slot shared by the C callbacks. Filled by install, emptied at exit.
static ENGINE: Mutex<Option<CaptureEngine>> = Mutex::new(None);

#[allow(non_upper_case_globals)]
#[unsafe(no_mangle)]
pub static qemu_plugin_version: c_int = sys::QEMU_PLUGIN_VERSION;

/// Plugin entry point, called once when QEMU loads the library.
///
/// # Safety
/// `info` must point to a valid `qemu_info_t` and `argv` to `argc` C strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn qemu_plugin_install(
    id: qemu_plugin_id_t,
    info: *const qemu_info_t,
    argc: c_int,
    argv: *mut *mut c_char,
) -> c_int {
    outs::init_logging();

    let args = unsafe { collect_args(argc, argv) };
    let host = unsafe { host_info(&*info) };

    let engine = match install(&args, &host, EngineConfig::default()) {
        Ok(engine) => engine,
        Err(e) => {
            error!(error = %e, "failed to install cache trace plugin");
            return -1;
        }
    };
    *ENGINE.lock() = Some(engine);

    unsafe {
        sys::qemu_plugin_register_vcpu_init_cb(id, on_vcpu_init);
        sys::qemu_plugin_register_vcpu_tb_trans_cb(id, on_tb_trans);
        sys::qemu_plugin_register_atexit_cb(id, on_exit, ptr::null_mut());
    }
    0
}

unsafe fn collect_args(argc: c_int, argv: *mut *mut c_char) -> Vec<String> {
    let argc = usize::try_from(argc).unwrap_or(0);
    (0..argc)
        .map(|i| {
            let arg = unsafe { CStr::from_ptr(*argv.add(i)) };
            arg.to_string_lossy().into_owned()
        })
        .collect()
}

unsafe fn host_info(info: &qemu_info_t) -> HostInfo {
    let target_name = if info.target_name.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(info.target_name) }
            .to_string_lossy()
            .into_owned()
    };
    // The union only holds system fields in system mode.
    let max_vcpus = if info.system_emulation {
        u32::try_from(info.system.max_vcpus).unwrap_or(0)
    } else {
        0
    };
    HostInfo {
        target_name,
        system_emulation: info.system_emulation,
        max_vcpus,
    }
}

extern "C" fn on_vcpu_init(_id: qemu_plugin_id_t, vcpu_index: c_uint) {
    debug!(vcpu = vcpu_index, "vCPU initialized");
}

extern "C" fn on_tb_trans(_id: qemu_plugin_id_t, tb: *mut qemu_plugin_tb) {
    let n = unsafe { sys::qemu_plugin_tb_n_insns(tb) };
    let insns: Vec<_> = (0..n)
        .map(|i| unsafe { sys::qemu_plugin_tb_get_insn(tb, i) })
        .collect();
    let bytes: Vec<Vec<u8>> = insns.iter().map(|&insn| unsafe { insn_bytes(insn) }).collect();
    // QEMU only fires memory callbacks for instructions that actually access memory,
    // so every instruction is a candidate.
    let block: Vec<InstructionRecord<'_>> = bytes
        .iter()
        .map(|b| InstructionRecord::new(b, true))
        .collect();

    let hooks = match ENGINE.lock().as_ref() {
        Some(engine) => engine.plan(&block),
        None => return,
    };

    for planned in hooks {
        let insn = insns[planned.index];
        unsafe {
            match planned.hook {
                Hook::Toggle => sys::qemu_plugin_register_vcpu_insn_exec_cb(
                    insn,
                    on_sentinel_exec,
                    sys::QEMU_PLUGIN_CB_NO_REGS,
                    ptr::null_mut(),
                ),
                // The planned access kind rides in the userdata word.
                Hook::Record(access) => sys::qemu_plugin_register_vcpu_mem_cb(
                    insn,
                    on_mem_access,
                    sys::QEMU_PLUGIN_CB_NO_REGS,
                    access as c_int,
                    ptr::without_provenance_mut(access as usize),
                ),
            }
        }
    }
}

unsafe fn insn_bytes(insn: *const sys::qemu_plugin_insn) -> Vec<u8> {
    let size = unsafe { sys::qemu_plugin_insn_size(insn) };
    let mut buf = vec![0u8; size];
    let copied = unsafe { sys::qemu_plugin_insn_data(insn, buf.as_mut_ptr().cast(), size) };
    buf.truncate(copied);
    buf
}

/// A memory access as QEMU reports it; translated on demand.
struct QemuAccess {
    info: qemu_plugin_meminfo_t,
    vaddr: u64,
}

impl MemoryTransaction for QemuAccess {
    fn vaddr(&self) -> u64 {
        self.vaddr
    }

    fn resolve(&self) -> Option<Resolved> {
        let hwaddr = unsafe { sys::qemu_plugin_get_hwaddr(self.info, self.vaddr) };
        if hwaddr.is_null() {
            return None;
        }
        if unsafe { sys::qemu_plugin_hwaddr_is_io(hwaddr) } {
            return Some(Resolved::Io);
        }
        Some(Resolved::Ram(unsafe { sys::qemu_plugin_hwaddr_phys_addr(hwaddr) }))
    }
}

extern "C" fn on_sentinel_exec(vcpu_index: c_uint, _userdata: *mut c_void) {
    fire(vcpu_index, Hook::Toggle, None);
}

extern "C" fn on_mem_access(
    vcpu_index: c_uint,
    info: qemu_plugin_meminfo_t,
    vaddr: u64,
    userdata: *mut c_void,
) {
    let planned = u32::try_from(userdata.addr())
        .ok()
        .and_then(MemAccess::from_raw)
        .unwrap_or_default();
    let access = QemuAccess { info, vaddr };
    fire(vcpu_index, Hook::Record(planned), Some(&access));
}

fn fire(vcpu: c_uint, hook: Hook, access: Option<&dyn MemoryTransaction>) {
    let mut slot = ENGINE.lock();
    let Some(engine) = slot.as_mut() else {
        return;
    };
    if let Err(e) = engine.fire(vcpu, hook, access) {
        // Leave the header at zero so the trace reads as incomplete.
        error!(error = %e, "failed to write cache trace");
        std::process::abort();
    }
}

extern "C" fn on_exit(_id: qemu_plugin_id_t, _userdata: *mut c_void) {
    let Some(engine) = ENGINE.lock().take() else {
        return;
    };
    match engine.finish() {
        Ok(summary) => info!(
            transactions = summary.recorded,
            active = summary.active_at_exit,
            "{summary}"
        ),
        Err(e) => error!(error = %e, "failed to finalize cache trace"),
    }
}

//! Runtime-resolved `ntdll` entry points.
//!
//! The handle and heap routines used here are undocumented and not exposed
//! by the `windows` crate, and any of them may be missing on a given build of
//! Windows. They are looked up once per process with `GetProcAddress` into a
//! table of optional function pointers; a missing export becomes a
//! capability gap rather than a crash.
use crate::error::ArenaError;
use crate::kernel::{Capability, FileType, NtApi, RawHandle};
use crate::status::NtStatus;
use std::ffi::c_void;
use std::mem::size_of;
use std::sync::OnceLock;
use windows::core::{s, w, PWSTR};
use windows::Win32::Foundation::HANDLE;
use windows::Win32::Storage::FileSystem::{
    GetFileType, FILE_TYPE_CHAR, FILE_TYPE_DISK, FILE_TYPE_PIPE, FILE_TYPE_REMOTE,
};
use windows::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};
use windows::Win32::System::Threading::{
    GetCurrentProcessId, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
};

type NtQuerySystemInformationFn =
    unsafe extern "system" fn(class: u32, info: *mut c_void, len: u32, ret: *mut u32) -> i32;
type NtQueryObjectFn = unsafe extern "system" fn(
    handle: isize,
    class: u32,
    info: *mut c_void,
    len: u32,
    ret: *mut u32,
) -> i32;
type NtOpenProcessFn = unsafe extern "system" fn(
    process: *mut isize,
    access: u32,
    attributes: *const ObjectAttributes,
    client_id: *const ClientId,
) -> i32;
type NtDuplicateObjectFn = unsafe extern "system" fn(
    source_process: isize,
    source_handle: isize,
    target_process: isize,
    target_handle: *mut isize,
    access: u32,
    attributes: u32,
    options: u32,
) -> i32;
type NtCloseFn = unsafe extern "system" fn(handle: isize) -> i32;

pub(crate) type RtlCreateHeapFn = unsafe extern "system" fn(
    flags: u32,
    base: *mut c_void,
    reserve: usize,
    commit: usize,
    lock: *mut c_void,
    parameters: *mut c_void,
) -> *mut c_void;
pub(crate) type RtlAllocateHeapFn =
    unsafe extern "system" fn(heap: *mut c_void, flags: u32, size: usize) -> *mut c_void;
pub(crate) type RtlFreeHeapFn =
    unsafe extern "system" fn(heap: *mut c_void, flags: u32, base: *mut c_void) -> u8;
pub(crate) type RtlDestroyHeapFn = unsafe extern "system" fn(heap: *mut c_void) -> *mut c_void;

#[repr(C)]
struct ObjectAttributes {
    length: u32,
    root_directory: isize,
    object_name: *const c_void,
    attributes: u32,
    security_descriptor: *const c_void,
    security_quality_of_service: *const c_void,
}

#[repr(C)]
struct ClientId {
    unique_process: isize,
    unique_thread: isize,
}

/// The four heap routines backing the search arena.
#[derive(Clone, Copy)]
pub(crate) struct HeapApi {
    pub create: RtlCreateHeapFn,
    pub allocate: RtlAllocateHeapFn,
    pub free: RtlFreeHeapFn,
    pub destroy: RtlDestroyHeapFn,
}

/// `ntdll` capability table. Every entry point is optional.
#[derive(Default)]
pub struct NtDll {
    query_system_information: Option<NtQuerySystemInformationFn>,
    query_object: Option<NtQueryObjectFn>,
    open_process: Option<NtOpenProcessFn>,
    duplicate_object: Option<NtDuplicateObjectFn>,
    close: Option<NtCloseFn>,
    create_heap: Option<RtlCreateHeapFn>,
    allocate_heap: Option<RtlAllocateHeapFn>,
    free_heap: Option<RtlFreeHeapFn>,
    destroy_heap: Option<RtlDestroyHeapFn>,
}

static NTDLL: OnceLock<NtDll> = OnceLock::new();

macro_rules! export {
    ($module:expr, $name:literal) => {
        // SAFETY: the field type the result is assigned to is the documented
        // signature of this export; both are plain function pointers.
        unsafe { GetProcAddress($module, s!($name)).map(|f| std::mem::transmute(f)) }
    };
}

impl NtDll {
    /// The process-wide table, resolved on first use.
    pub fn get() -> &'static NtDll {
        NTDLL.get_or_init(Self::resolve)
    }

    fn resolve() -> Self {
        // SAFETY: ntdll is mapped into every Windows process.
        let module = match unsafe { GetModuleHandleW(w!("ntdll.dll")) } {
            Ok(module) => module,
            Err(e) => {
                tracing::warn!("ntdll.dll is not loaded: {e}");
                return Self::default();
            }
        };

        let table = Self {
            query_system_information: export!(module, "NtQuerySystemInformation"),
            query_object: export!(module, "NtQueryObject"),
            open_process: export!(module, "NtOpenProcess"),
            duplicate_object: export!(module, "NtDuplicateObject"),
            close: export!(module, "NtClose"),
            create_heap: export!(module, "RtlCreateHeap"),
            allocate_heap: export!(module, "RtlAllocateHeap"),
            free_heap: export!(module, "RtlFreeHeap"),
            destroy_heap: export!(module, "RtlDestroyHeap"),
        };

        for capability in [
            Capability::QuerySystemInformation,
            Capability::QueryObject,
            Capability::OpenProcess,
            Capability::DuplicateObject,
            Capability::Close,
        ] {
            if !table.has(capability) {
                tracing::warn!("{} is not available on this system", capability.entry_point());
            }
        }
        table
    }

    pub(crate) fn heap_api(&self) -> Result<HeapApi, ArenaError> {
        Ok(HeapApi {
            create: self.create_heap.ok_or(ArenaError::Unavailable("RtlCreateHeap"))?,
            allocate: self
                .allocate_heap
                .ok_or(ArenaError::Unavailable("RtlAllocateHeap"))?,
            free: self.free_heap.ok_or(ArenaError::Unavailable("RtlFreeHeap"))?,
            destroy: self
                .destroy_heap
                .ok_or(ArenaError::Unavailable("RtlDestroyHeap"))?,
        })
    }
}

fn win32_handle(handle: RawHandle) -> HANDLE {
    HANDLE(handle.0 as *mut c_void)
}

fn buffer_len(buffer: &[u8]) -> u32 {
    u32::try_from(buffer.len()).unwrap_or(u32::MAX)
}

impl NtApi for NtDll {
    fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::QuerySystemInformation => self.query_system_information.is_some(),
            Capability::QueryObject => self.query_object.is_some(),
            Capability::OpenProcess => self.open_process.is_some(),
            Capability::DuplicateObject => self.duplicate_object.is_some(),
            Capability::Close => self.close.is_some(),
        }
    }

    fn current_process_id(&self) -> usize {
        // SAFETY: no preconditions.
        unsafe { GetCurrentProcessId() as usize }
    }

    fn query_system_information(
        &self,
        class: u32,
        buffer: &mut [u8],
        return_length: &mut u32,
    ) -> NtStatus {
        let Some(query) = self.query_system_information else {
            return NtStatus::PROCEDURE_NOT_FOUND;
        };
        // SAFETY: the kernel writes at most `len` bytes into `buffer`.
        NtStatus(unsafe {
            query(
                class,
                buffer.as_mut_ptr().cast(),
                buffer_len(buffer),
                return_length,
            )
        })
    }

    fn query_object(
        &self,
        handle: RawHandle,
        class: u32,
        buffer: &mut [u8],
        return_length: &mut u32,
    ) -> NtStatus {
        let Some(query) = self.query_object else {
            return NtStatus::PROCEDURE_NOT_FOUND;
        };
        // SAFETY: as above; an invalid handle only yields a failure status.
        NtStatus(unsafe {
            query(
                handle.0,
                class,
                buffer.as_mut_ptr().cast(),
                buffer_len(buffer),
                return_length,
            )
        })
    }

    fn open_process(&self, pid: usize, access: u32, process: &mut RawHandle) -> NtStatus {
        let Some(open) = self.open_process else {
            return NtStatus::PROCEDURE_NOT_FOUND;
        };
        let attributes = ObjectAttributes {
            length: size_of::<ObjectAttributes>() as u32,
            root_directory: 0,
            object_name: std::ptr::null(),
            attributes: 0,
            security_descriptor: std::ptr::null(),
            security_quality_of_service: std::ptr::null(),
        };
        let client_id = ClientId {
            unique_process: pid as isize,
            unique_thread: 0,
        };
        let mut raw = 0isize;
        // SAFETY: all pointers refer to live locals for the duration of the call.
        let status = NtStatus(unsafe { open(&mut raw, access, &attributes, &client_id) });
        *process = RawHandle(raw);
        status
    }

    fn duplicate_object(
        &self,
        source_process: RawHandle,
        source_handle: usize,
        target: &mut RawHandle,
    ) -> NtStatus {
        let Some(duplicate) = self.duplicate_object else {
            return NtStatus::PROCEDURE_NOT_FOUND;
        };
        let mut raw = 0isize;
        // SAFETY: `raw` is a live local; the source values are plain integers.
        let status = NtStatus(unsafe {
            duplicate(
                source_process.0,
                source_handle as isize,
                RawHandle::CURRENT_PROCESS.0,
                &mut raw,
                0,
                0,
                0,
            )
        });
        *target = RawHandle(raw);
        status
    }

    fn close(&self, handle: RawHandle) -> NtStatus {
        let Some(close) = self.close else {
            return NtStatus::PROCEDURE_NOT_FOUND;
        };
        // SAFETY: closing an invalid handle only yields a failure status.
        NtStatus(unsafe { close(handle.0) })
    }

    fn file_type(&self, handle: RawHandle) -> FileType {
        // SAFETY: GetFileType tolerates any handle value.
        let kind = unsafe { GetFileType(win32_handle(handle)) };
        if kind == FILE_TYPE_DISK {
            FileType::Disk
        } else if kind == FILE_TYPE_CHAR {
            FileType::Char
        } else if kind == FILE_TYPE_PIPE {
            FileType::Pipe
        } else if kind == FILE_TYPE_REMOTE {
            FileType::Remote
        } else {
            FileType::Unknown
        }
    }

    fn image_path(&self, process: RawHandle) -> Option<String> {
        let mut buffer = vec![0u16; 32_768];
        let mut len = buffer.len() as u32;
        // SAFETY: `len` is the capacity of `buffer` in UTF-16 units.
        unsafe {
            QueryFullProcessImageNameW(
                win32_handle(process),
                PROCESS_NAME_WIN32,
                PWSTR(buffer.as_mut_ptr()),
                &mut len,
            )
        }
        .ok()?;
        buffer.truncate(len as usize);
        Some(String::from_utf16_lossy(&buffer))
    }
}

//! In-memory kernel for unit tests.
//!
//! Models a handle table, a set of processes and the objects behind their
//! handles, and counts every call the search makes so tests can assert on
//! open attempts, live handles and buffer growth.
use super::{name, snapshot, Capability, FileType, HandleRecord, NtApi, RawHandle};
use crate::status::NtStatus;
use parking_lot::Mutex;
use std::collections::HashMap;

/// FILE_GENERIC_READ | FILE_GENERIC_WRITE.
const FILE_ACCESS: u32 = 0x0012_019F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Process(usize),
    Object(usize, usize),
}

struct FakeObject {
    file_type: FileType,
    name: Option<Vec<u16>>,
}

struct FakeProcess {
    image: Option<String>,
    open_status: NtStatus,
}

#[derive(Default)]
struct State {
    missing: Vec<Capability>,
    records: Vec<HandleRecord>,
    objects: HashMap<(usize, usize), FakeObject>,
    processes: HashMap<usize, FakeProcess>,
    handles: HashMap<isize, Target>,
    next_handle: isize,
    peak_live: usize,
    open_attempts: HashMap<usize, usize>,
    enumeration_sizes: Vec<usize>,
    enumeration_failure: Option<NtStatus>,
    name_lies: usize,
    name_queries: usize,
    name_queried: Vec<(usize, usize)>,
    duplications: usize,
    pseudo_closes: usize,
    bad_closes: usize,
}

impl State {
    fn issue(&mut self, target: Target) -> RawHandle {
        self.next_handle += 4;
        let raw = 0x1000 + self.next_handle;
        self.handles.insert(raw, target);
        self.peak_live = self.peak_live.max(self.handles.len());
        RawHandle(raw)
    }

    /// Resolve a handle valid in the caller: either one the fake issued, or a
    /// raw value belonging to the caller's own process.
    fn object_for(&self, self_pid: usize, handle: RawHandle) -> Option<(usize, usize)> {
        match self.handles.get(&handle.0) {
            Some(Target::Object(pid, value)) => Some((*pid, *value)),
            Some(Target::Process(_)) => None,
            None => Some((self_pid, handle.0 as usize)),
        }
    }
}

pub(crate) struct FakeKernel {
    self_pid: usize,
    state: Mutex<State>,
}

impl FakeKernel {
    pub(crate) fn new(self_pid: usize) -> Self {
        let kernel = Self {
            self_pid,
            state: Mutex::new(State::default()),
        };
        kernel.add_process(self_pid, Some(r"C:\Program Files\LockSleuth\locksleuth.exe"));
        kernel
    }

    pub(crate) fn add_process(&self, pid: usize, image: Option<&str>) {
        self.state.lock().processes.insert(
            pid,
            FakeProcess {
                image: image.map(str::to_string),
                open_status: NtStatus::SUCCESS,
            },
        );
    }

    pub(crate) fn deny_process(&self, pid: usize) {
        self.fail_process(pid, NtStatus::ACCESS_DENIED);
    }

    pub(crate) fn fail_process(&self, pid: usize, status: NtStatus) {
        let mut state = self.state.lock();
        let process = state.processes.entry(pid).or_insert(FakeProcess {
            image: None,
            open_status: NtStatus::SUCCESS,
        });
        process.open_status = status;
    }

    /// Append a handle-table entry for `pid` and the object behind it.
    pub(crate) fn add_handle(
        &self,
        pid: usize,
        value: usize,
        file_type: FileType,
        name: Option<&str>,
    ) {
        let mut state = self.state.lock();
        state.records.push(HandleRecord {
            pid,
            handle_value: value,
            granted_access: FILE_ACCESS,
        });
        state.objects.insert(
            (pid, value),
            FakeObject {
                file_type,
                name: name.map(|n| n.encode_utf16().collect()),
            },
        );
    }

    pub(crate) fn fail_enumeration(&self, status: NtStatus) {
        self.state.lock().enumeration_failure = Some(status);
    }

    pub(crate) fn remove_capability(&self, capability: Capability) {
        self.state.lock().missing.push(capability);
    }

    /// Answer the next `times` name queries with a length mismatch and a
    /// useless required length. `usize::MAX` lies forever.
    pub(crate) fn misreport_name_length(&self, times: usize) {
        self.state.lock().name_lies = times;
    }

    pub(crate) fn open_attempts(&self, pid: usize) -> usize {
        self.state.lock().open_attempts.get(&pid).copied().unwrap_or(0)
    }

    pub(crate) fn enumeration_sizes(&self) -> Vec<usize> {
        self.state.lock().enumeration_sizes.clone()
    }

    pub(crate) fn live_handles(&self) -> usize {
        self.state.lock().handles.len()
    }

    pub(crate) fn peak_live_handles(&self) -> usize {
        self.state.lock().peak_live
    }

    pub(crate) fn pseudo_handle_closes(&self) -> usize {
        self.state.lock().pseudo_closes
    }

    pub(crate) fn bad_closes(&self) -> usize {
        self.state.lock().bad_closes
    }

    pub(crate) fn duplications(&self) -> usize {
        self.state.lock().duplications
    }

    pub(crate) fn name_queries(&self) -> usize {
        self.state.lock().name_queries
    }

    pub(crate) fn was_name_queried(&self, pid: usize, value: usize) -> bool {
        self.state.lock().name_queried.contains(&(pid, value))
    }
}

impl NtApi for FakeKernel {
    fn has(&self, capability: Capability) -> bool {
        !self.state.lock().missing.contains(&capability)
    }

    fn current_process_id(&self) -> usize {
        self.self_pid
    }

    fn query_system_information(
        &self,
        _class: u32,
        buffer: &mut [u8],
        return_length: &mut u32,
    ) -> NtStatus {
        let mut state = self.state.lock();
        state.enumeration_sizes.push(buffer.len());
        if let Some(status) = state.enumeration_failure {
            return status;
        }
        let required = snapshot::required_size(state.records.len());
        if buffer.len() < required {
            *return_length = required as u32;
            return NtStatus::INFO_LENGTH_MISMATCH;
        }
        snapshot::encode(&state.records, buffer);
        *return_length = required as u32;
        NtStatus::SUCCESS
    }

    fn query_object(
        &self,
        handle: RawHandle,
        _class: u32,
        buffer: &mut [u8],
        return_length: &mut u32,
    ) -> NtStatus {
        let mut state = self.state.lock();
        state.name_queries += 1;
        let Some(key) = state.object_for(self.self_pid, handle) else {
            return NtStatus::OBJECT_TYPE_MISMATCH;
        };
        state.name_queried.push(key);

        if state.name_lies > 0 {
            if state.name_lies != usize::MAX {
                state.name_lies -= 1;
            }
            *return_length = 0;
            return NtStatus::INFO_LENGTH_MISMATCH;
        }

        let Some(object) = state.objects.get(&key) else {
            return NtStatus::INVALID_HANDLE;
        };
        let Some(text) = object.name.as_deref() else {
            return NtStatus::NOT_SUPPORTED;
        };
        let required = name::required_size(text);
        *return_length = required as u32;
        if buffer.len() < required {
            return NtStatus::BUFFER_OVERFLOW;
        }
        name::encode(text, buffer);
        NtStatus::SUCCESS
    }

    fn open_process(&self, pid: usize, _access: u32, process: &mut RawHandle) -> NtStatus {
        let mut state = self.state.lock();
        *state.open_attempts.entry(pid).or_insert(0) += 1;
        let status = match state.processes.get(&pid) {
            Some(p) => p.open_status,
            None => NtStatus::INVALID_PARAMETER,
        };
        if !status.is_success() {
            return status;
        }
        *process = state.issue(Target::Process(pid));
        NtStatus::SUCCESS
    }

    fn duplicate_object(
        &self,
        source_process: RawHandle,
        source_handle: usize,
        target: &mut RawHandle,
    ) -> NtStatus {
        let mut state = self.state.lock();
        let Some(Target::Process(pid)) = state.handles.get(&source_process.0).copied() else {
            return NtStatus::INVALID_HANDLE;
        };
        if !state.objects.contains_key(&(pid, source_handle)) {
            return NtStatus::INVALID_HANDLE;
        }
        state.duplications += 1;
        *target = state.issue(Target::Object(pid, source_handle));
        NtStatus::SUCCESS
    }

    fn close(&self, handle: RawHandle) -> NtStatus {
        let mut state = self.state.lock();
        if handle.is_current_process() {
            state.pseudo_closes += 1;
            return NtStatus::SUCCESS;
        }
        if state.handles.remove(&handle.0).is_none() {
            state.bad_closes += 1;
            return NtStatus::INVALID_HANDLE;
        }
        NtStatus::SUCCESS
    }

    fn file_type(&self, handle: RawHandle) -> FileType {
        let state = self.state.lock();
        state
            .object_for(self.self_pid, handle)
            .and_then(|key| state.objects.get(&key))
            .map_or(FileType::Unknown, |o| o.file_type)
    }

    fn image_path(&self, process: RawHandle) -> Option<String> {
        let state = self.state.lock();
        let pid = if process.is_current_process() {
            self.self_pid
        } else {
            match state.handles.get(&process.0) {
                Some(Target::Process(pid)) => *pid,
                _ => return None,
            }
        };
        state.processes.get(&pid).and_then(|p| p.image.clone())
    }
}

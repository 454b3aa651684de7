//! Runtime adapter (C9).
//!
//! Loads and calls guest modules inside whatever sandbox the deployment
//! provides (WASM engine, process isolate, ...). The kernel ships no real
//! engine — out of scope per spec's Non-goals — only the trait and an
//! in-memory double the orchestrator's own tests drive, mirroring how the
//! teacher's `enterprise::marketplace::sandbox` consumes a pluggable
//! resource tracker rather than owning process isolation itself.

use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Outcome of a single guest-module call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// Call returned normally, carrying an opaque result payload.
    Completed(Vec<u8>),
    /// Call exceeded its deadline and was terminated.
    Terminated,
    /// Call exceeded a resource limit (memory, CPU) before completing.
    LimitExceeded,
    /// Call attempted a privileged operation the broker denied.
    Denied,
}

/// Per-module configuration handed to `Load`.
#[derive(Debug, Clone, Default)]
pub struct ModuleConfig {
    /// Initial memory ceiling in bytes, if the engine supports pre-sizing.
    pub initial_memory_limit_bytes: Option<u64>,
}

/// Opaque handle to a loaded guest module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleHandle(pub Uuid);

/// Runtime adapter contract. Implementations must invoke the permission
/// broker's `Validate*` for each privileged operation the guest module
/// attempts, and must push counter updates to the resource monitor at
/// least once per tick period — the kernel does not and cannot enforce
/// either obligation on the adapter's behalf.
pub trait RuntimeAdapter: Send + Sync {
    /// Load module bytes, returning an opaque handle.
    fn load(&self, bytes: &[u8], config: ModuleConfig) -> Result<ModuleHandle, String>;

    /// Invoke an exported function on a loaded module with a deadline.
    fn call(
        &self,
        handle: ModuleHandle,
        function: &str,
        args: &[u8],
        deadline: Duration,
    ) -> CallOutcome;

    /// Terminate a loaded module, releasing its resources.
    fn terminate(&self, handle: ModuleHandle);

    /// Current memory usage of a loaded module, in bytes.
    fn memory_usage(&self, handle: ModuleHandle) -> u64;

    /// Adjust a module's memory limit. Fails if `bytes` exceeds whatever
    /// ceiling the adapter itself enforces.
    fn set_memory_limit(&self, handle: ModuleHandle, bytes: u64) -> Result<(), String>;
}

struct LoadedModule {
    memory_used: u64,
    memory_limit: u64,
    terminated: bool,
}

/// In-memory test double. Calls always "complete" with an empty payload
/// unless the caller pre-arms a different outcome via
/// [`InMemoryRuntimeAdapter::arm_outcome`]; there is no real execution.
pub struct InMemoryRuntimeAdapter {
    modules: parking_lot::RwLock<HashMap<ModuleHandle, LoadedModule>>,
    armed_outcomes: parking_lot::RwLock<HashMap<ModuleHandle, CallOutcome>>,
}

impl InMemoryRuntimeAdapter {
    /// Create an adapter with no loaded modules.
    pub fn new() -> Self {
        Self {
            modules: parking_lot::RwLock::new(HashMap::new()),
            armed_outcomes: parking_lot::RwLock::new(HashMap::new()),
        }
    }

    /// Force the next `call` against `handle` to return `outcome`, for
    /// exercising orchestrator paths that react to termination/limits/denial.
    pub fn arm_outcome(&self, handle: ModuleHandle, outcome: CallOutcome) {
        self.armed_outcomes.write().insert(handle, outcome);
    }

    /// Directly set a module's simulated memory usage, for resource-monitor
    /// integration tests that don't want to drive it through `call`.
    pub fn set_memory_usage(&self, handle: ModuleHandle, bytes: u64) {
        if let Some(m) = self.modules.write().get_mut(&handle) {
            m.memory_used = bytes;
        }
    }
}

impl Default for InMemoryRuntimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeAdapter for InMemoryRuntimeAdapter {
    fn load(&self, _bytes: &[u8], config: ModuleConfig) -> Result<ModuleHandle, String> {
        let handle = ModuleHandle(Uuid::new_v4());
        self.modules.write().insert(
            handle,
            LoadedModule {
                memory_used: 0,
                memory_limit: config.initial_memory_limit_bytes.unwrap_or(u64::MAX),
                terminated: false,
            },
        );
        Ok(handle)
    }

    fn call(
        &self,
        handle: ModuleHandle,
        _function: &str,
        _args: &[u8],
        _deadline: Duration,
    ) -> CallOutcome {
        if let Some(outcome) = self.armed_outcomes.write().remove(&handle) {
            return outcome;
        }
        match self.modules.read().get(&handle) {
            Some(m) if m.terminated => CallOutcome::Terminated,
            Some(_) => CallOutcome::Completed(Vec::new()),
            None => CallOutcome::Terminated,
        }
    }

    fn terminate(&self, handle: ModuleHandle) {
        if let Some(m) = self.modules.write().get_mut(&handle) {
            m.terminated = true;
        }
    }

    fn memory_usage(&self, handle: ModuleHandle) -> u64 {
        self.modules
            .read()
            .get(&handle)
            .map(|m| m.memory_used)
            .unwrap_or(0)
    }

    fn set_memory_limit(&self, handle: ModuleHandle, bytes: u64) -> Result<(), String> {
        let mut modules = self.modules.write();
        let m = modules
            .get_mut(&handle)
            .ok_or_else(|| "unknown module handle".to_string())?;
        if bytes > m.memory_limit {
            return Err("requested limit exceeds ceiling".to_string());
        }
        m.memory_limit = bytes;
        Ok(())
    }
}

/// Outcome of probing whether a pid belongs to a running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    Dead,
    Indeterminate,
}

impl Liveness {
    /// Indeterminate counts as alive.
    pub fn is_alive(self) -> bool {
        !matches!(self, Liveness::Dead)
    }
}

pub fn probe(pid: u32) -> Liveness {
    if pid == 0 {
        return Liveness::Dead;
    }
    if pid == std::process::id() {
        return Liveness::Alive;
    }
    probe_platform(pid)
}

#[cfg(unix)]
fn probe_platform(pid: u32) -> Liveness {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return Liveness::Dead;
    };
    unsafe {
        if libc::kill(pid, 0) == 0 {
            return Liveness::Alive;
        }
    }
    match std::io::Error::last_os_error().raw_os_error() {
        Some(libc::EPERM) => Liveness::Alive,
        Some(libc::ESRCH) => Liveness::Dead,
        _ => Liveness::Indeterminate,
    }
}

#[cfg(windows)]
fn probe_platform(pid: u32) -> Liveness {
    use windows_sys::Win32::Foundation::{
        CloseHandle, GetLastError, ERROR_ACCESS_DENIED, ERROR_INVALID_PARAMETER, STILL_ACTIVE,
    };
    use windows_sys::Win32::System::Threading::{
        GetExitCodeProcess, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
    };

    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
        if handle == 0 {
            return match GetLastError() {
                ERROR_INVALID_PARAMETER => Liveness::Dead,
                ERROR_ACCESS_DENIED => Liveness::Alive,
                _ => Liveness::Indeterminate,
            };
        }
        let mut code: u32 = 0;
        let ok = GetExitCodeProcess(handle, &mut code);
        CloseHandle(handle);
        if ok == 0 {
            return Liveness::Indeterminate;
        }
        if code == STILL_ACTIVE as u32 {
            Liveness::Alive
        } else {
            Liveness::Dead
        }
    }
}

#[cfg(not(any(unix, windows)))]
fn probe_platform(_pid: u32) -> Liveness {
    Liveness::Indeterminate
}

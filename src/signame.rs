use std::{borrow::Cow, ffi::CStr};

use libc::c_int;

const SIGNALS: &[(c_int, &str)] = &[
    (libc::SIGHUP, "SIGHUP"),
    (libc::SIGINT, "SIGINT"),
    (libc::SIGQUIT, "SIGQUIT"),
    (libc::SIGILL, "SIGILL"),
    (libc::SIGTRAP, "SIGTRAP"),
    (libc::SIGABRT, "SIGABRT"),
    (libc::SIGBUS, "SIGBUS"),
    (libc::SIGFPE, "SIGFPE"),
    (libc::SIGKILL, "SIGKILL"),
    (libc::SIGUSR1, "SIGUSR1"),
    (libc::SIGSEGV, "SIGSEGV"),
    (libc::SIGUSR2, "SIGUSR2"),
    (libc::SIGPIPE, "SIGPIPE"),
    (libc::SIGALRM, "SIGALRM"),
    (libc::SIGTERM, "SIGTERM"),
    (libc::SIGSTKFLT, "SIGSTKFLT"),
    (libc::SIGCHLD, "SIGCHLD"),
    (libc::SIGCONT, "SIGCONT"),
    (libc::SIGSTOP, "SIGSTOP"),
    (libc::SIGTSTP, "SIGTSTP"),
    (libc::SIGTTIN, "SIGTTIN"),
    (libc::SIGTTOU, "SIGTTOU"),
    (libc::SIGURG, "SIGURG"),
    (libc::SIGXCPU, "SIGXCPU"),
    (libc::SIGXFSZ, "SIGXFSZ"),
    (libc::SIGVTALRM, "SIGVTALRM"),
    (libc::SIGPROF, "SIGPROF"),
    (libc::SIGWINCH, "SIGWINCH"),
    (libc::SIGIO, "SIGIO"),
    (libc::SIGPWR, "SIGPWR"),
    (libc::SIGSYS, "SIGSYS"),
];

/// Symbolic name of `signal`, e.g. `SIGTERM`.
///
/// Real-time signals are named relative to `SIGRTMIN`; anything else that is
/// unknown on this platform degrades to `signal N`.
pub fn signame(signal: c_int) -> Cow<'static, str> {
    if let Some((_, name)) = SIGNALS.iter().find(|(n, _)| *n == signal) {
        return Cow::Borrowed(name);
    }

    let (rtmin, rtmax) = (libc::SIGRTMIN(), libc::SIGRTMAX());
    match signal {
        s if s == rtmin => Cow::Borrowed("SIGRTMIN"),
        s if s == rtmax => Cow::Borrowed("SIGRTMAX"),
        s if s > rtmin && s < rtmax => Cow::Owned(format!("SIGRTMIN+{}", s - rtmin)),
        s => Cow::Owned(format!("signal {s}")),
    }
}

/// Human readable description of `signal`, as printed by `strsignal(3)`.
pub fn describe(signal: c_int) -> Option<String> {
    // SAFETY: strsignal returns a pointer to a NUL terminated string that
    // stays valid until the next call; it is copied out immediately
    let ptr = unsafe { libc::strsignal(signal) };
    if ptr.is_null() {
        return None;
    }

    // SAFETY: non-null, points at the string described above
    let desc = unsafe { CStr::from_ptr(ptr) };
    Some(desc.to_string_lossy().into_owned())
}

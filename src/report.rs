use std::{
    fmt,
    io::{self, Write},
};

/// Writes one status line per observed transition when verbose.
///
/// Lines are prefixed with the PID only when more than one target is being
/// waited on.
pub struct Reporter {
    out: Box<dyn Write>,
    verbose: bool,
    prefix: bool,
}

impl Reporter {
    pub fn new(out: impl Write + 'static, verbose: bool) -> Self {
        Self {
            out: Box::new(out),
            verbose,
            prefix: false,
        }
    }

    pub fn stdout(verbose: bool) -> Self {
        Self::new(io::stdout(), verbose)
    }

    pub(crate) fn set_target_count(&mut self, count: usize) {
        self.prefix = count > 1;
    }

    pub fn info(&mut self, pid: i32, args: fmt::Arguments<'_>) {
        if !self.verbose {
            return;
        }

        let ret = if self.prefix {
            writeln!(self.out, "{pid}: {args}")
        } else {
            writeln!(self.out, "{args}")
        };

        if let Err(e) = ret.and_then(|_| self.out.flush()) {
            tracing::warn!(error = %e, "cannot write status line");
        }
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("verbose", &self.verbose)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod capture {
    use std::{
        cell::RefCell,
        io::{self, Write},
        rc::Rc,
    };

    /// In-memory sink that stays readable after being handed to a `Reporter`.
    #[derive(Clone, Default)]
    pub(crate) struct Captured(Rc<RefCell<Vec<u8>>>);

    impl Captured {
        pub(crate) fn lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.borrow())
                .lines()
                .map(str::to_owned)
                .collect()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{capture::Captured, Reporter};

    #[test]
    fn silent_unless_verbose() {
        let buf = Captured::default();
        let mut r = Reporter::new(buf.clone(), false);
        r.info(1, format_args!("process attached"));
        assert!(buf.lines().is_empty());
    }

    #[test]
    fn single_target_lines_have_no_prefix() {
        let buf = Captured::default();
        let mut r = Reporter::new(buf.clone(), true);
        r.set_target_count(1);
        r.info(12, format_args!("exited with status {}", 4));
        assert_eq!(buf.lines(), ["exited with status 4"]);
    }

    #[test]
    fn multiple_targets_are_prefixed_with_pid() {
        let buf = Captured::default();
        let mut r = Reporter::new(buf.clone(), true);
        r.set_target_count(2);
        r.info(12, format_args!("process attached"));
        r.info(34, format_args!("killed by SIGTERM"));
        assert_eq!(buf.lines(), ["12: process attached", "34: killed by SIGTERM"]);
    }
}

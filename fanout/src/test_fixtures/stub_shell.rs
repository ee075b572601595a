// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A tiny in-memory remote shell. Understands just enough of what sessions send (the
//! init string, `PS1=`, `echo`, `true`, `false`, `exit`, `$?`) to drive the state
//! machine end to end.

use crate::{HostSpec, ShellSpawner, ShellTransport, TermSize};
use std::{cell::RefCell,
          collections::{HashMap, HashSet, VecDeque},
          io::{self, ErrorKind, Read, Write},
          os::fd::RawFd,
          rc::Rc};

const CTRL_C: u8 = 0x03;
const CTRL_D: u8 = 0x04;
const KILLED_EXIT_CODE: i32 = 137;
const DEFAULT_PROMPT: &[u8] = b"$ ";

#[derive(Debug)]
struct StubShellState {
    hostname: String,
    pid: u32,
    greeting: Vec<u8>,
    prompt: Vec<u8>,
    vars: HashMap<String, String>,
    started: bool,
    password: Option<String>,
    awaiting_password: bool,
    exit_on_start: Option<i32>,
    /// Output not read yet.
    output: VecDeque<u8>,
    /// Every byte written to the shell.
    received: Vec<u8>,
    partial_input: Vec<u8>,
    /// A `sleep` or `cat` is running: no prompt until it is released or interrupted.
    busy: bool,
    exit_code: Option<i32>,
    /// `$?`.
    last_status: i32,
    killed: bool,
    writes_blocked: bool,
    size: Option<TermSize>,
}

/// In-memory [`ShellTransport`]. Clones share the same shell, so a test keeps one clone
/// to look at what the session sent and to inject output.
#[derive(Debug, Clone)]
pub struct StubShell {
    state: Rc<RefCell<StubShellState>>,
}

impl StubShell {
    pub fn new(hostname: &str) -> Self { Self::with_pid(hostname, 4242) }

    pub fn with_pid(hostname: &str, pid: u32) -> Self {
        Self {
            state: Rc::new(RefCell::new(StubShellState {
                hostname: hostname.to_string(),
                pid,
                greeting: b"Last login: Mon Oct 19 10:21:07 2026\n".to_vec(),
                prompt: DEFAULT_PROMPT.to_vec(),
                vars: HashMap::new(),
                started: false,
                password: None,
                awaiting_password: false,
                exit_on_start: None,
                output: VecDeque::new(),
                received: Vec::new(),
                partial_input: Vec::new(),
                busy: false,
                exit_code: None,
                last_status: 0,
                killed: false,
                writes_blocked: false,
                size: None,
            })),
        }
    }

    pub fn set_greeting(&self, greeting: &[u8]) { self.state.borrow_mut().greeting = greeting.to_vec(); }

    /// Asks for `password` before showing the greeting.
    pub fn require_password(&self, password: &str) {
        self.state.borrow_mut().password = Some(password.to_string());
    }

    /// Prints the greeting, then exits with `code` (like ssh failing to connect).
    pub fn exit_immediately(&self, code: i32) { self.state.borrow_mut().exit_on_start = Some(code); }

    /// Output that shows up without any command, as from a running program.
    pub fn push_output(&self, bytes: &[u8]) {
        self.start();
        self.state.borrow_mut().output.extend(bytes);
    }

    /// Ends the running `sleep`/`cat` and shows the prompt again.
    pub fn finish_command(&self) {
        let mut state = self.state.borrow_mut();
        if state.busy {
            state.busy = false;
            state.show_prompt();
        }
    }

    /// Every `write()` would block until unblocked.
    pub fn block_writes(&self, blocked: bool) { self.state.borrow_mut().writes_blocked = blocked; }

    pub fn received(&self) -> Vec<u8> { self.state.borrow().received.clone() }

    pub fn received_text(&self) -> String { String::from_utf8_lossy(&self.state.borrow().received).into_owned() }

    pub fn was_killed(&self) -> bool { self.state.borrow().killed }

    pub fn size(&self) -> Option<TermSize> { self.state.borrow().size }

    pub fn hostname(&self) -> String { self.state.borrow().hostname.clone() }

    fn start(&self) {
        let mut state = self.state.borrow_mut();
        if state.started {
            return;
        }
        state.started = true;
        if state.password.is_some() {
            state.awaiting_password = true;
            let ask = format!("{}'s password: ", state.hostname);
            state.output.extend(ask.as_bytes());
            return;
        }
        state.greet();
    }
}

impl StubShellState {
    fn greet(&mut self) {
        let greeting = self.greeting.clone();
        self.output.extend(greeting);
        if let Some(code) = self.exit_on_start {
            self.exit_code = Some(code);
            return;
        }
        self.show_prompt();
    }

    fn show_prompt(&mut self) {
        if self.exit_code.is_none() {
            let prompt = self.prompt.clone();
            self.output.extend(prompt);
        }
    }

    fn receive(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if self.exit_code.is_some() {
                return;
            }
            match byte {
                CTRL_C => {
                    self.partial_input.clear();
                    self.busy = false;
                    self.output.extend(b"^C\n");
                    self.show_prompt();
                }
                CTRL_D if self.partial_input.is_empty() && !self.busy => {
                    self.exit_code = Some(0);
                }
                b'\n' => {
                    let line = std::mem::take(&mut self.partial_input);
                    self.receive_line(&String::from_utf8_lossy(&line));
                }
                _ => self.partial_input.push(byte),
            }
        }
    }

    fn receive_line(&mut self, line: &str) {
        if self.awaiting_password {
            if Some(line) == self.password.as_deref() {
                self.awaiting_password = false;
                self.output.push_back(b'\n');
                self.greet();
            } else {
                let ask = format!("\nPermission denied, please try again.\n{}'s password: ", self.hostname);
                self.output.extend(ask.as_bytes());
            }
            return;
        }
        if self.busy {
            // Typed while a command runs: read by it.
            return;
        }

        for statement in split_statements(line) {
            self.run_statement(statement.trim());
            if self.exit_code.is_some() || self.busy {
                return;
            }
        }
        self.show_prompt();
    }

    fn run_statement(&mut self, statement: &str) {
        let statement = statement.split(" 2>").next().unwrap_or_default().trim();
        let (program, args) = statement.split_once(' ').unwrap_or((statement, ""));
        let mut status = 0;
        match program {
            "" => return,
            "unsetopt" | "stty" | "unset" | "true" => {}
            "false" => status = 1,
            "echo" | "/bin/echo" => {
                let words: Vec<String> =
                    split_words(args).iter().map(|word| self.expand(word)).collect();
                let mut line = words.join(" ");
                line.push('\n');
                self.output.extend(line.as_bytes());
            }
            "export" => {
                for word in split_words(args) {
                    self.assign(&word);
                }
            }
            "exit" => {
                let code = self.expand(args.trim());
                self.exit_code = Some(code.parse().unwrap_or(self.last_status));
            }
            "sleep" | "cat" => self.busy = true,
            _ if program.contains('=') => self.assign(statement),
            _ => {
                let msg = format!("sh: {program}: command not found\n");
                self.output.extend(msg.as_bytes());
                status = 127;
            }
        }
        self.last_status = status;
    }

    fn assign(&mut self, word: &str) {
        let Some((name, value)) = word.split_once('=') else {
            return;
        };
        let value = self.expand(value);
        if name == "PS1" {
            self.prompt = value.replace("\\n", "\n").into_bytes();
        } else {
            self.vars.insert(name.to_string(), value);
        }
    }

    /// Removes quotes and expands `$NAME` outside single quotes.
    fn expand(&self, word: &str) -> String {
        let mut acc = String::new();
        let mut chars = word.chars().peekable();
        let mut quote = None;
        while let Some(ch) = chars.next() {
            match (ch, quote) {
                ('"' | '\'', None) => quote = Some(ch),
                (_, Some(open)) if ch == open => quote = None,
                ('$', None | Some('"')) if chars.peek() == Some(&'?') => {
                    chars.next();
                    acc.push_str(&self.last_status.to_string());
                }
                ('$', None | Some('"')) => {
                    let mut name = String::new();
                    while let Some(&next) = chars.peek() {
                        if next.is_ascii_alphanumeric() || next == '_' {
                            name.push(next);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    if name == "HOSTNAME" {
                        acc.push_str(&self.hostname);
                    } else if let Some(value) = self.vars.get(&name) {
                        acc.push_str(value);
                    }
                }
                _ => acc.push(ch),
            }
        }
        acc
    }
}

/// Splits on `;` outside quotes.
fn split_statements(line: &str) -> Vec<&str> {
    let mut acc = Vec::new();
    let mut quote = None;
    let mut start = 0;
    for (index, ch) in line.char_indices() {
        match (ch, quote) {
            ('"' | '\'', None) => quote = Some(ch),
            (_, Some(open)) if ch == open => quote = None,
            (';', None) => {
                acc.push(&line[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    acc.push(&line[start..]);
    acc
}

/// Splits on whitespace outside quotes, keeping the quotes.
fn split_words(args: &str) -> Vec<String> {
    let mut acc = Vec::new();
    let mut word = String::new();
    let mut quote = None;
    for ch in args.chars() {
        match (ch, quote) {
            ('"' | '\'', None) => {
                quote = Some(ch);
                word.push(ch);
            }
            (_, Some(open)) if ch == open => {
                quote = None;
                word.push(ch);
            }
            (_, None) if ch.is_whitespace() => {
                if !word.is_empty() {
                    acc.push(std::mem::take(&mut word));
                }
            }
            _ => word.push(ch),
        }
    }
    if !word.is_empty() {
        acc.push(word);
    }
    acc
}

impl Read for StubShell {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.start();
        let mut state = self.state.borrow_mut();
        if state.output.is_empty() {
            return if state.exit_code.is_some() {
                Ok(0)
            } else {
                Err(ErrorKind::WouldBlock.into())
            };
        }
        let count = buf.len().min(state.output.len());
        for (slot, byte) in buf.iter_mut().zip(state.output.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }
}

impl Write for StubShell {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.start();
        let mut state = self.state.borrow_mut();
        if state.writes_blocked {
            return Err(ErrorKind::WouldBlock.into());
        }
        if state.exit_code.is_some() {
            return Err(io::Error::from_raw_os_error(rustix::io::Errno::IO.raw_os_error()));
        }
        state.received.extend_from_slice(buf);
        state.receive(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

impl ShellTransport for StubShell {
    fn raw_fd(&self) -> Option<RawFd> { None }

    fn pid(&self) -> Option<u32> { Some(self.state.borrow().pid) }

    fn resize(&mut self, size: TermSize) -> io::Result<()> {
        self.state.borrow_mut().size = Some(size);
        Ok(())
    }

    fn kill_process_group(&mut self) {
        let mut state = self.state.borrow_mut();
        state.killed = true;
        state.started = true;
        state.output.clear();
        state.exit_code.get_or_insert(KILLED_EXIT_CODE);
    }

    fn reap(&mut self) -> i32 { self.state.borrow().exit_code.unwrap_or(KILLED_EXIT_CODE) }
}

/// Hands out [`StubShell`]s and remembers them so tests can reach each one.
#[derive(Debug, Clone, Default)]
pub struct StubShellSpawner {
    spawned: Rc<RefCell<Vec<StubShell>>>,
    failing_hosts: Rc<RefCell<HashSet<String>>>,
}

impl StubShellSpawner {
    pub fn new() -> Self { Self::default() }

    /// Spawning `hostname` fails, as if the pty could not be opened.
    pub fn fail_for(&self, hostname: &str) { self.failing_hosts.borrow_mut().insert(hostname.to_string()); }

    /// Most recently spawned shell for `hostname`.
    pub fn shell(&self, hostname: &str) -> Option<StubShell> {
        self.spawned
            .borrow()
            .iter()
            .rev()
            .find(|shell| shell.hostname() == hostname)
            .cloned()
    }
}

impl ShellSpawner for StubShellSpawner {
    fn spawn(&mut self, host: &HostSpec, _size: TermSize) -> miette::Result<Box<dyn ShellTransport>> {
        if self.failing_hosts.borrow().contains(&host.hostname) {
            miette::bail!("no pty left for {}", host.hostname);
        }
        let pid = 1000 + u32::try_from(self.spawned.borrow().len()).unwrap_or(0);
        let shell = StubShell::with_pid(&host.hostname, pid);
        self.spawned.borrow_mut().push(shell.clone());
        Ok(Box::new(shell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn read_all(shell: &mut StubShell) -> String {
        let mut acc = Vec::new();
        let mut buf = [0_u8; 64];
        while let Ok(count) = shell.read(&mut buf) {
            if count == 0 {
                break;
            }
            acc.extend_from_slice(&buf[..count]);
        }
        String::from_utf8(acc).unwrap()
    }

    #[test]
    fn test_stub_shell_understands_the_basics() {
        let mut shell = StubShell::new("web1");
        assert_eq!(read_all(&mut shell), "Last login: Mon Oct 19 10:21:07 2026\n$ ");

        shell.write_all(b"stty -echo;PS1=\"P\"\"S\\n\"\n").unwrap();
        assert_eq!(read_all(&mut shell), "PS\n");

        shell.write_all(b"export X=1; echo \"$HOSTNAME\"-$X '$X'\n").unwrap();
        assert_eq!(read_all(&mut shell), "web1-1 $X\nPS\n");

        shell.write_all(b"exit 2>/dev/null\n").unwrap();
        assert_eq!(read_all(&mut shell), "");
        assert_eq!(shell.reap(), 0);
    }
}

//! Keystroke state machine reconciling local history recall with a remote
//! shell that owns the authoritative input buffer and echo.
//!
//! Time is partitioned into two regimes. In [`Mode::Normal`] every keystroke
//! goes straight to the shell and the shell's echo paints the screen. Up
//! arrow enters [`Mode::Recall`]: the prompt line is repainted locally with a
//! recalled command the shell has never seen, and every edit until Enter
//! stays local so the shell's (empty) buffer and the screen never fight over
//! echo. Enter erases the local paint and ships the whole line at once.

use webterm_protocol::{
    ARROW_DOWN, ARROW_UP, BACKSPACE, CR, CTRL_C, DELETE, erase_sequence,
};

/// What the caller must do in response to a keystroke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Paint text on the local terminal surface.
    Echo(String),
    /// Send a message over the session socket.
    Send(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// The shell buffer mirrors what was typed; shell echo paints.
    Normal,
    /// The prompt line was painted locally with the history entry `offset`
    /// steps back from the most recent; the shell buffer is empty.
    Recall { offset: usize },
}

/// Per-tab line editor. Tabs own their editor by value, so a hidden tab's
/// in-flight recall state survives tab switches untouched.
pub struct LineEditor {
    mode: Mode,
    current: String,
    history: Vec<String>,
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl LineEditor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: Mode::Normal,
            current: String::new(),
            history: Vec::new(),
        }
    }

    /// Previously submitted commands, oldest first.
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// The text currently on the prompt line, as the editor believes it.
    #[must_use]
    pub fn current_line(&self) -> &str {
        &self.current
    }

    #[must_use]
    pub fn is_recalling(&self) -> bool {
        matches!(self.mode, Mode::Recall { .. })
    }

    /// Process one keystroke (or pasted run of keystrokes) and return the
    /// actions to apply, in order.
    pub fn key(&mut self, data: &str) -> Vec<Action> {
        match data {
            ARROW_UP => self.recall_older(),
            ARROW_DOWN => self.recall_newer(),
            CR => self.submit(),
            BACKSPACE | DELETE => self.backspace(data),
            CTRL_C => self.interrupt(),
            printable if is_printable(printable) => self.insert(printable),
            other => vec![Action::Send(other.replace('\x7f', BACKSPACE))],
        }
    }

    /// Up arrow: repaint the prompt with the next-older entry. Saturates at
    /// the oldest entry; never forwarded to the shell.
    fn recall_older(&mut self) -> Vec<Action> {
        if self.history.is_empty() {
            return vec![];
        }
        let offset = match self.mode {
            Mode::Normal => 0,
            Mode::Recall { offset } => (offset + 1).min(self.history.len() - 1),
        };
        if self.mode == (Mode::Recall { offset }) {
            return vec![];
        }
        self.repaint_with(offset)
    }

    /// Down arrow: step back toward the empty draft. In `Normal` it is
    /// consumed with no effect.
    fn recall_newer(&mut self) -> Vec<Action> {
        match self.mode {
            Mode::Normal => vec![],
            Mode::Recall { offset: 0 } => {
                let actions = self.erase_current();
                self.current.clear();
                self.mode = Mode::Normal;
                actions
            }
            Mode::Recall { offset } => self.repaint_with(offset - 1),
        }
    }

    fn repaint_with(&mut self, offset: usize) -> Vec<Action> {
        let entry = self.history[self.history.len() - 1 - offset].clone();
        let mut actions = self.erase_current();
        if !entry.is_empty() {
            actions.push(Action::Echo(entry.clone()));
        }
        self.current = entry;
        self.mode = Mode::Recall { offset };
        actions
    }

    /// Enter. Records the command, then commits: a recalled line was never
    /// sent to the shell, so it is erased locally and shipped whole; a
    /// normally typed line is already in the shell's buffer, so only the
    /// carriage return goes out.
    fn submit(&mut self) -> Vec<Action> {
        let command = self.current.trim();
        if !command.is_empty() && self.history.last().map(String::as_str) != Some(command) {
            self.history.push(command.to_string());
        }

        let mut actions = Vec::new();
        match self.mode {
            Mode::Recall { .. } => {
                actions.extend(self.erase_current());
                actions.push(Action::Send(format!("{}{CR}", self.current)));
            }
            Mode::Normal => actions.push(Action::Send(CR.to_string())),
        }
        self.mode = Mode::Normal;
        self.current.clear();
        actions
    }

    /// Backspace/Delete. While recalling, the shell's buffer does not hold
    /// the painted text, so the edit stays local; otherwise the byte is
    /// forwarded verbatim and the shell erases its own echo.
    fn backspace(&mut self, data: &str) -> Vec<Action> {
        match self.mode {
            Mode::Recall { .. } => {
                if self.current.pop().is_some() {
                    vec![Action::Echo(erase_sequence(1))]
                } else {
                    vec![]
                }
            }
            Mode::Normal => {
                self.current.pop();
                vec![Action::Send(data.to_string())]
            }
        }
    }

    /// Ctrl-C aborts the current line shell-side; mirror that locally.
    fn interrupt(&mut self) -> Vec<Action> {
        self.current.clear();
        self.mode = Mode::Normal;
        vec![Action::Send(CTRL_C.to_string())]
    }

    fn insert(&mut self, data: &str) -> Vec<Action> {
        self.current.push_str(data);
        match self.mode {
            // The shell knows nothing of this line until Enter: echo
            // locally, send nothing.
            Mode::Recall { .. } => vec![Action::Echo(data.to_string())],
            // Shell echo paints; no local echo.
            Mode::Normal => vec![Action::Send(data.to_string())],
        }
    }

    fn erase_current(&mut self) -> Vec<Action> {
        let len = self.current.chars().count();
        if len == 0 {
            vec![]
        } else {
            vec![Action::Echo(erase_sequence(len))]
        }
    }
}

fn is_printable(data: &str) -> bool {
    !data.is_empty() && data.chars().all(|c| (' '..='~').contains(&c))
}

//! Line-oriented command shell over a [`Session`].
//!
//! Drag gestures are typed as container IDs and indices, the same
//! identifiers `show` prints:
//!
//! ```text
//! move list-<id> 0 list-<id> 2        reorder within a list
//! move list-<a> 0 list-<b> 1          move to another list
//! move list-<id> 0                    drag cancelled, nothing happens
//! priority list-<id> 1 Low            drop on the list's Low zone
//! ```

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use taskboard_proto::document::Timestamp;
use taskboard_proto::list::ListId;
use taskboard_proto::task::{ParsePriorityError, Priority};

use crate::auth::{AuthError, IdentityProvider, LocalIdentity};
use crate::session::Session;
use crate::store::DocumentStore;
use crate::tasks::reorder::ParseContainerError;
use crate::tasks::{Board, BoardError, Container, DragEvent, DragOutcome, Location, SyncState};

/// How long the shell waits for snapshots to stop arriving after a change.
const SETTLE: Duration = Duration::from_millis(50);

const HELP: &str = "\
commands:
  signup <email> <password>          create an account and sign in
  login <email> <password>           sign in
  logout                             sign out
  add-list <name>                    create a list
  add-task <list> <title> [--priority High|Medium|Low] [--due YYYY-MM-DD]
                                     append a task (<list> is a name or list-<id>)
  move <container> <index> [<container> <index>]
                                     drag a task; omit the target to cancel
  priority <container> <index> <High|Medium|Low>
                                     drop a task on a priority zone
  show                               print lists and tasks
  help                               this text
  quit                               save and exit";

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create an account.
    SignUp {
        /// Account email.
        email: String,
        /// Account password.
        password: String,
    },
    /// Sign in.
    Login {
        /// Account email.
        email: String,
        /// Account password.
        password: String,
    },
    /// Sign out.
    Logout,
    /// Create a list.
    AddList {
        /// List name.
        name: String,
    },
    /// Append a task.
    AddTask {
        /// List name or `list-<id>` container.
        list: String,
        /// Task title.
        title: String,
        /// Explicit priority.
        priority: Option<Priority>,
        /// Due day.
        due: Option<Timestamp>,
    },
    /// Drag a task.
    Move {
        /// Drag origin.
        source: Location,
        /// Drop target, `None` for a cancelled drag.
        destination: Option<Location>,
    },
    /// Drop a task on its list's priority zone.
    SetPriority {
        /// Drag origin.
        source: Location,
        /// Zone dropped on.
        priority: Priority,
    },
    /// Print the board.
    Show,
    /// Print usage.
    Help,
    /// Leave the shell.
    Quit,
}

/// Errors from parsing a command line.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    /// Unrecognised command word.
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    /// Wrong arguments for a known command.
    #[error("usage: {0}")]
    Usage(&'static str),
    /// Bad container ID.
    #[error(transparent)]
    Container(#[from] ParseContainerError),
    /// Bad priority label.
    #[error(transparent)]
    Priority(#[from] ParsePriorityError),
    /// Index is not a non-negative number.
    #[error("invalid index `{0}`")]
    Index(String),
    /// Date is not `YYYY-MM-DD` on or after 1970-01-01.
    #[error("invalid date `{0}` (expected YYYY-MM-DD)")]
    Date(String),
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(Self::Help);
        };
        let args: Vec<&str> = words.collect();
        match head {
            "signup" | "login" => {
                let [email, password] = args.as_slice() else {
                    return Err(ParseError::Usage("signup|login <email> <password>"));
                };
                let (email, password) = ((*email).to_string(), (*password).to_string());
                Ok(if head == "signup" {
                    Self::SignUp { email, password }
                } else {
                    Self::Login { email, password }
                })
            }
            "logout" => Ok(Self::Logout),
            "add-list" => {
                if args.is_empty() {
                    return Err(ParseError::Usage("add-list <name>"));
                }
                Ok(Self::AddList {
                    name: args.join(" "),
                })
            }
            "add-task" => parse_add_task(&args),
            "move" => match args.as_slice() {
                [c, i] => Ok(Self::Move {
                    source: location(c, i)?,
                    destination: None,
                }),
                [c, i, dc, di] => Ok(Self::Move {
                    source: location(c, i)?,
                    destination: Some(location(dc, di)?),
                }),
                _ => Err(ParseError::Usage("move <container> <index> [<container> <index>]")),
            },
            "priority" => {
                let [c, i, p] = args.as_slice() else {
                    return Err(ParseError::Usage("priority <container> <index> <High|Medium|Low>"));
                };
                Ok(Self::SetPriority {
                    source: location(c, i)?,
                    priority: p.parse()?,
                })
            }
            "show" | "ls" => Ok(Self::Show),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}

fn parse_add_task(args: &[&str]) -> Result<Command, ParseError> {
    const USAGE: &str = "add-task <list> <title> [--priority P] [--due YYYY-MM-DD]";
    let Some((list, rest)) = args.split_first() else {
        return Err(ParseError::Usage(USAGE));
    };
    let mut title = Vec::new();
    let mut priority = None;
    let mut due = None;
    let mut rest = rest.iter();
    while let Some(word) = rest.next() {
        match *word {
            "--priority" => {
                let value = rest.next().ok_or(ParseError::Usage(USAGE))?;
                priority = Some(value.parse()?);
            }
            "--due" => {
                let value = rest.next().ok_or(ParseError::Usage(USAGE))?;
                due = Some(parse_due(value)?);
            }
            other => title.push(other),
        }
    }
    if title.is_empty() {
        return Err(ParseError::Usage(USAGE));
    }
    Ok(Command::AddTask {
        list: (*list).to_string(),
        title: title.join(" "),
        priority,
        due,
    })
}

fn location(container: &str, index: &str) -> Result<Location, ParseError> {
    Ok(Location {
        container: container.parse()?,
        index: index
            .parse()
            .map_err(|_| ParseError::Index(index.to_string()))?,
    })
}

/// Midnight UTC of the given day.
fn parse_due(value: &str) -> Result<Timestamp, ParseError> {
    let invalid = || ParseError::Date(value.to_string());
    let day = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?;
    let millis = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(invalid)?
        .and_utc()
        .timestamp_millis();
    u64::try_from(millis)
        .map(Timestamp::from_millis)
        .map_err(|_| invalid())
}

fn format_day(ts: Timestamp) -> String {
    i64::try_from(ts.as_millis())
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map_or_else(|| ts.to_string(), |dt| dt.format("%Y-%m-%d").to_string())
}

/// Errors from running a command.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// The line did not parse.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The identity provider refused.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// A board operation failed.
    #[error(transparent)]
    Board(#[from] BoardError),
    /// The command needs a signed-in user.
    #[error("not signed in (use `login` or `signup`)")]
    NotSignedIn,
    /// No list matches the name or ID.
    #[error("no list named `{0}`")]
    NoSuchList(String),
    /// The drag origin holds no task.
    #[error("no task at {container} index {index}")]
    NoTaskAt {
        /// Container that was named.
        container: Container,
        /// Index that was named.
        index: usize,
    },
}

/// What the caller should do after a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Print the text and keep reading.
    Text(String),
    /// Stop reading.
    Quit,
}

/// Command interpreter bound to one identity provider and session.
pub struct Shell<S> {
    identity: Arc<LocalIdentity<S>>,
    session: Session<S>,
}

impl<S: DocumentStore> Shell<S> {
    /// Creates a shell.
    #[must_use]
    pub const fn new(identity: Arc<LocalIdentity<S>>, session: Session<S>) -> Self {
        Self { identity, session }
    }

    /// The session driven by this shell.
    #[must_use]
    pub const fn session(&self) -> &Session<S> {
        &self.session
    }

    /// Parses and runs one line. Errors come back as text.
    pub async fn run_line(&mut self, line: &str) -> Reply {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => return Reply::Text(e.to_string()),
        };
        if command == Command::Quit {
            return Reply::Quit;
        }
        match self.execute(command).await {
            Ok(text) => Reply::Text(text),
            Err(e) => {
                tracing::debug!(error = %e, "command failed");
                Reply::Text(e.to_string())
            }
        }
    }

    /// Runs a parsed command, returning what to print.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError`] for anything the user should see as a failure.
    pub async fn execute(&mut self, command: Command) -> Result<String, ShellError> {
        match command {
            Command::SignUp { email, password } => {
                self.identity.sign_up(&email, &password).await?;
                self.after_auth_change().await?;
                Ok(format!("signed up and signed in as {email}"))
            }
            Command::Login { email, password } => {
                self.identity.sign_in(&email, &password).await?;
                self.after_auth_change().await?;
                Ok(format!("signed in as {email}"))
            }
            Command::Logout => {
                self.identity.sign_out();
                self.after_auth_change().await?;
                Ok("signed out".to_string())
            }
            Command::AddList { name } => {
                let board = self.board()?;
                let id = board.add_list(&name).await?;
                board.settle(SETTLE).await?;
                Ok(format!("created {}", Container::List(id)))
            }
            Command::AddTask {
                list,
                title,
                priority,
                due,
            } => {
                let board = self.board()?;
                board.drain_pending()?;
                let list_id = resolve_list(board, &list)?;
                let mut draft = board.new_draft(title);
                if let Some(priority) = priority {
                    draft.priority = priority;
                }
                draft.due_date = due;
                board.add_task(&list_id, draft).await?;
                board.settle(SETTLE).await?;
                Ok(format!("added to {}", Container::List(list_id)))
            }
            Command::Move {
                source,
                destination,
            } => self.drag(source, destination).await,
            Command::SetPriority { source, priority } => {
                let list_id = match &source.container {
                    Container::List(id) | Container::PriorityZone { list_id: id, .. } => id.clone(),
                };
                let zone = Location {
                    container: Container::PriorityZone { list_id, priority },
                    index: 0,
                };
                self.drag(source, Some(zone)).await
            }
            Command::Show => {
                let board = self.board()?;
                board.drain_pending()?;
                Ok(render(board))
            }
            Command::Help => Ok(HELP.to_string()),
            Command::Quit => Ok(String::new()),
        }
    }

    async fn drag(
        &mut self,
        source: Location,
        destination: Option<Location>,
    ) -> Result<String, ShellError> {
        let board = self.board()?;
        board.drain_pending()?;
        let task_id = match &source.container {
            Container::List(list_id) => board
                .mirror()
                .tasks(list_id)
                .get(source.index)
                .map(|t| t.id.clone()),
            Container::PriorityZone { .. } => None,
        }
        .ok_or_else(|| ShellError::NoTaskAt {
            container: source.container.clone(),
            index: source.index,
        })?;

        let outcome = board
            .on_drag_end(&DragEvent {
                task_id,
                source,
                destination,
            })
            .await?;
        board.settle(SETTLE).await?;
        Ok(match outcome {
            DragOutcome::NoOp => "nothing to do".to_string(),
            DragOutcome::Applied { writes } => format!("saved ({writes} writes)"),
        })
    }

    async fn after_auth_change(&mut self) -> Result<(), ShellError> {
        self.session.refresh()?;
        if let Some(board) = self.session.board_mut() {
            board.settle(SETTLE).await?;
        }
        Ok(())
    }

    fn board(&mut self) -> Result<&mut Board<S>, ShellError> {
        self.session.refresh()?;
        self.session.board_mut().ok_or(ShellError::NotSignedIn)
    }
}

fn resolve_list<S: DocumentStore>(board: &Board<S>, arg: &str) -> Result<ListId, ShellError> {
    if let Ok(Container::List(id)) = arg.parse::<Container>() {
        if board.mirror().list(&id).is_some() {
            return Ok(id);
        }
    }
    board
        .find_list(arg)
        .map(|l| l.id.clone())
        .ok_or_else(|| ShellError::NoSuchList(arg.to_string()))
}

fn render<S: DocumentStore>(board: &Board<S>) -> String {
    let mirror = board.mirror();
    if mirror.lists().is_empty() {
        return "no lists yet (use `add-list <name>`)".to_string();
    }
    let mut lines = Vec::new();
    for list in mirror.lists() {
        let state = match mirror.sync_state(&list.id) {
            Some(SyncState::Pending) => " (pending)",
            _ => "",
        };
        lines.push(format!("{}  [{}]{state}", list.name, Container::List(list.id.clone())));
        for (index, task) in mirror.tasks(&list.id).iter().enumerate() {
            let due = task
                .due_date
                .map(|due| format!("  due {}", format_day(due)))
                .unwrap_or_default();
            lines.push(format!("  {index}. {}  <{}>{due}", task.title, task.priority));
        }
    }
    lines.join("\n")
}

use std::io::{BufRead, Write};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tasklist_core::config::{Palette, Settings};
use tasklist_core::error::AppError;
use tasklist_core::model::TaskStatus;
use tasklist_core::storage::{SkippedLine, TaskStorage};
use tasklist_core::task_store::{ClearOutcome, StatusChange, StoreLoad, TaskStore, TaskView};
use tracing::debug;

const MENU_RULE: usize = 50;
const VIEW_RULE: usize = 60;
const STATS_RULE: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Add,
    Remove,
    ViewAll,
    MarkCompleted,
    MarkPending,
    Statistics,
    ViewPending,
    ViewCompleted,
    ClearCompleted,
    Exit,
}

const MENU_ENTRIES: [(&str, MenuChoice, &str); 10] = [
    ("1", MenuChoice::Add, "Add Task"),
    ("2", MenuChoice::Remove, "Remove Task"),
    ("3", MenuChoice::ViewAll, "View All Tasks"),
    ("4", MenuChoice::MarkCompleted, "Mark Task as Completed"),
    ("5", MenuChoice::MarkPending, "Mark Task as Pending"),
    ("6", MenuChoice::Statistics, "View Statistics"),
    ("7", MenuChoice::ViewPending, "View Pending Tasks"),
    ("8", MenuChoice::ViewCompleted, "View Completed Tasks"),
    ("9", MenuChoice::ClearCompleted, "Clear All Completed Tasks"),
    ("0", MenuChoice::Exit, "Exit"),
];

impl MenuChoice {
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim();
        MENU_ENTRIES
            .iter()
            .find(|(entry_key, _, _)| *entry_key == key)
            .map(|(_, choice, _)| *choice)
    }
}

#[derive(Debug, Clone)]
pub struct MenuSettings {
    pub palette: Palette,
    pub pause_after_action: bool,
}

impl MenuSettings {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            palette: settings.theme.palette(),
            pause_after_action: settings.pause_after_action,
        }
    }
}

/// What the loop does after one handled choice.
enum Flow {
    Continue,
    EndOfInput,
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Task")]
    text: String,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Added")]
    added: String,
}

pub fn write_farewell<W: Write>(output: &mut W, interrupted: bool) -> std::io::Result<()> {
    if interrupted {
        writeln!(output, "\n\nProgram interrupted by user.")?;
    } else {
        writeln!(output)?;
    }
    writeln!(output, "Thank you for using the To-Do Application!")?;
    writeln!(output, "Goodbye!")?;
    output.flush()
}

pub struct Menu<S: TaskStorage, R: BufRead, W: Write> {
    store: TaskStore<S>,
    skipped: Vec<SkippedLine>,
    load_error: Option<AppError>,
    input: R,
    output: W,
    settings: MenuSettings,
}

impl<S: TaskStorage, R: BufRead, W: Write> Menu<S, R, W> {
    pub fn new(loaded: StoreLoad<S>, input: R, output: W, settings: MenuSettings) -> Self {
        Self {
            store: loaded.store,
            skipped: loaded.skipped,
            load_error: loaded.error,
            input,
            output,
            settings,
        }
    }

    pub fn store(&self) -> &TaskStore<S> {
        &self.store
    }

    /// Runs until the user exits or input ends. Only failures to write to the
    /// output escape. Store errors are reported and the loop goes on; a failed
    /// read from the input is reported and ends the session like closed input.
    pub fn run(&mut self) -> Result<(), AppError> {
        self.welcome()?;

        loop {
            self.render_menu()?;
            let line = match self.prompt("\nEnter your choice (0-9): ") {
                Ok(Some(line)) => line,
                Ok(None) => return self.farewell(true),
                Err(err) => return self.input_failed(&err),
            };

            match MenuChoice::parse(&line) {
                Some(MenuChoice::Exit) => return self.farewell(false),
                Some(choice) => {
                    debug!(?choice, "menu choice");
                    match self.handle(choice) {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::EndOfInput) => return self.farewell(true),
                        Err(err) => writeln!(self.output, "ERROR: {err}")?,
                    }
                }
                None => writeln!(
                    self.output,
                    "ERROR: invalid choice, enter a number between 0 and 9"
                )?,
            }

            if self.settings.pause_after_action {
                match self.prompt("\nPress Enter to continue...") {
                    Ok(Some(_)) => {}
                    Ok(None) => return self.farewell(true),
                    Err(err) => return self.input_failed(&err),
                }
            }
        }
    }

    fn input_failed(&mut self, err: &AppError) -> Result<(), AppError> {
        writeln!(self.output, "ERROR: {err}")?;
        self.farewell(true)
    }

    fn handle(&mut self, choice: MenuChoice) -> Result<Flow, AppError> {
        match choice {
            MenuChoice::Add => {
                let Some(description) = self.prompt("Enter task description: ")? else {
                    return Ok(Flow::EndOfInput);
                };
                let added = self.store.add(&description)?;
                self.report_save_error(added.save_error.as_ref())?;
                writeln!(
                    self.output,
                    "Task added successfully: '{}'",
                    added.value.text
                )?;
            }
            MenuChoice::Remove => {
                let Some(index) = self.pick_task("remove")? else {
                    return Ok(Flow::EndOfInput);
                };
                if let Some(index) = index {
                    let removed = self.store.remove(&index)?;
                    self.report_save_error(removed.save_error.as_ref())?;
                    writeln!(self.output, "Task removed: '{}'", removed.value.text)?;
                }
            }
            MenuChoice::MarkCompleted | MenuChoice::MarkPending => {
                let (target, verb) = if choice == MenuChoice::MarkCompleted {
                    (TaskStatus::Completed, "mark as completed")
                } else {
                    (TaskStatus::Pending, "mark as pending")
                };
                let Some(index) = self.pick_task(verb)? else {
                    return Ok(Flow::EndOfInput);
                };
                if let Some(index) = index {
                    let change = match target {
                        TaskStatus::Completed => self.store.mark_completed(&index)?,
                        TaskStatus::Pending => self.store.mark_pending(&index)?,
                    };
                    let label = target.label().to_ascii_lowercase();
                    match change {
                        StatusChange::Updated(updated) => {
                            self.report_save_error(updated.save_error.as_ref())?;
                            writeln!(
                                self.output,
                                "Task marked as {label}: '{}'",
                                updated.value.text
                            )?;
                        }
                        StatusChange::Unchanged(_) => {
                            writeln!(self.output, "Task is already marked as {label}!")?
                        }
                    }
                }
            }
            MenuChoice::ViewAll => self.render_view(None)?,
            MenuChoice::ViewPending => self.render_view(Some(TaskStatus::Pending))?,
            MenuChoice::ViewCompleted => self.render_view(Some(TaskStatus::Completed))?,
            MenuChoice::Statistics => self.render_statistics()?,
            MenuChoice::ClearCompleted => {
                let Some(answer) =
                    self.prompt("Are you sure you want to clear all completed tasks? (y/n): ")?
                else {
                    return Ok(Flow::EndOfInput);
                };
                let answer = answer.trim();
                if answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes") {
                    match self.store.clear_completed() {
                        ClearOutcome::NothingToClear => {
                            writeln!(self.output, "No completed tasks to clear!")?
                        }
                        ClearOutcome::Cleared(cleared) => {
                            self.report_save_error(cleared.save_error.as_ref())?;
                            writeln!(
                                self.output,
                                "Cleared {} completed task(s)!",
                                cleared.value
                            )?;
                        }
                    }
                } else {
                    writeln!(self.output, "Operation cancelled!")?;
                }
            }
            MenuChoice::Exit => {}
        }

        Ok(Flow::Continue)
    }

    /// Shows all tasks and asks for a number. The outer `None` means input
    /// ended; the inner `None` means there was nothing to pick from.
    fn pick_task(&mut self, verb: &str) -> Result<Option<Option<String>>, AppError> {
        if self.store.is_empty() {
            writeln!(self.output, "No tasks to {verb}!")?;
            return Ok(Some(None));
        }

        self.render_view(None)?;
        let index = self.prompt(&format!("Enter task number to {verb}: "))?;
        Ok(index.map(Some))
    }

    /// Reads one line. Bytes that are not UTF-8 are replaced rather than
    /// rejected, so a stray byte never costs the rest of the line.
    fn prompt(&mut self, message: &str) -> Result<Option<String>, AppError> {
        write!(self.output, "{message}")?;
        self.output.flush()?;

        let mut raw = Vec::new();
        let read = self
            .input
            .read_until(b'\n', &mut raw)
            .map_err(|err| AppError::io(format!("could not read input: {err}")))?;
        if read == 0 {
            return Ok(None);
        }

        let line = String::from_utf8_lossy(&raw);
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }

    fn welcome(&mut self) -> Result<(), AppError> {
        writeln!(self.output, "Welcome to the To-Do Application!")?;
        writeln!(
            self.output,
            "Tasks are stored in: {}",
            self.store.storage().location()
        )?;

        if let Some(err) = self.load_error.take() {
            writeln!(self.output, "ERROR: could not load tasks: {err}")?;
        }
        if !self.skipped.is_empty() {
            writeln!(
                self.output,
                "Skipped {} unreadable line(s) in the task file.",
                self.skipped.len()
            )?;
        }

        Ok(())
    }

    fn render_menu(&mut self) -> Result<(), AppError> {
        let rule = "=".repeat(MENU_RULE);
        writeln!(self.output, "\n{rule}")?;
        writeln!(
            self.output,
            "{}",
            self.settings.palette.heading("              TO-DO APPLICATION")
        )?;
        writeln!(self.output, "{rule}")?;
        for (key, _, label) in MENU_ENTRIES {
            writeln!(self.output, "{key}. {label}")?;
        }
        writeln!(self.output, "{rule}")?;
        Ok(())
    }

    fn render_view(&mut self, filter: Option<TaskStatus>) -> Result<(), AppError> {
        let rendered = match self.store.view(filter) {
            TaskView::NoTasks => {
                "No tasks found! Add some tasks to get started.".to_string()
            }
            TaskView::NoMatches(status) => {
                format!("No {} tasks found!", status.label().to_ascii_lowercase())
            }
            TaskView::Rows(rows) => {
                let title = match filter {
                    Some(status) => format!("{} TASKS", status.label()),
                    None => "ALL TASKS".to_string(),
                };
                let table_rows: Vec<TaskRow> = rows
                    .iter()
                    .map(|row| TaskRow {
                        position: row.position,
                        text: row.task.text.clone(),
                        status: row.task.status.label(),
                        added: row.task.timestamp.clone(),
                    })
                    .collect();
                let mut table = Table::new(table_rows);
                table.with(Style::psql());

                let rule = "=".repeat(VIEW_RULE);
                format!(
                    "\n{rule}\n{}\n{rule}\n{}",
                    self.settings.palette.heading(&title),
                    self.settings.palette.detail(&table.to_string())
                )
            }
        };

        writeln!(self.output, "{rendered}")?;
        Ok(())
    }

    fn render_statistics(&mut self) -> Result<(), AppError> {
        let stats = self.store.statistics();
        let rule = "=".repeat(STATS_RULE);

        writeln!(self.output, "\n{rule}")?;
        writeln!(
            self.output,
            "{}",
            self.settings.palette.heading("           TASK STATISTICS")
        )?;
        writeln!(self.output, "{rule}")?;
        writeln!(self.output, "Total Tasks:     {}", stats.total)?;
        writeln!(self.output, "Completed:       {}", stats.completed)?;
        writeln!(self.output, "Pending:         {}", stats.pending)?;
        if let Some(rate) = stats.completion_rate() {
            writeln!(self.output, "Completion Rate: {rate:.1}%")?;
        }
        writeln!(self.output, "{rule}")?;
        Ok(())
    }

    fn report_save_error(&mut self, err: Option<&AppError>) -> Result<(), AppError> {
        if let Some(err) = err {
            writeln!(self.output, "ERROR: could not save tasks: {err}")?;
        }
        Ok(())
    }

    fn farewell(&mut self, interrupted: bool) -> Result<(), AppError> {
        write_farewell(&mut self.output, interrupted)?;
        Ok(())
    }
}

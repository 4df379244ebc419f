use crate::error::StoreError;
use crate::menu::MenuCommand;
use crate::prompt::LinePrompter;
use crate::task::{parse_due_date, Task};
use crate::todo_manager::{LoadOutcome, TaskPatch, TodoManager};
use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Row, Table},
    Frame, Terminal,
};
use std::io::{self, BufRead, Stdout, Write};
use tracing::debug;

/// Which subset of tasks the table shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    All,
    DueOn(NaiveDate),
    Search(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Info(String),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct App {
    pub manager: TodoManager,
    pub view: View,
    pub rows: Vec<Task>,
    pub status: Option<Status>,
    pub selected: usize,
}

impl App {
    pub fn new(manager: TodoManager) -> Self {
        let status = match manager.load_outcome() {
            LoadOutcome::Corrupt(reason) => Some(Status::Error(format!(
                "Could not read {} ({reason}); starting with an empty list",
                manager.storage_path().display()
            ))),
            _ => None,
        };
        let mut app = Self {
            manager,
            view: View::All,
            rows: Vec::new(),
            status,
            selected: 0,
        };
        app.refresh();
        app
    }

    pub fn selected_command(&self) -> MenuCommand {
        MenuCommand::ALL[self.selected]
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < MenuCommand::ALL.len() {
            self.selected += 1;
        }
    }

    /// Maps a key press to a menu command; navigation keys only move the selection.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<MenuCommand> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return matches!(key.code, KeyCode::Char('c' | 'd')).then_some(MenuCommand::Exit);
        }
        match key.code {
            KeyCode::Char(c) => {
                let command = MenuCommand::from_key(c);
                if command.is_none() {
                    self.status = Some(Status::Error(format!("Unknown choice {c:?}")));
                }
                command
            }
            KeyCode::Esc => Some(MenuCommand::Exit),
            KeyCode::Up => {
                self.select_previous();
                None
            }
            KeyCode::Down => {
                self.select_next();
                None
            }
            KeyCode::Enter => Some(self.selected_command()),
            _ => None,
        }
    }

    /// Recomputes the table rows for the current view.
    pub fn refresh(&mut self) {
        self.rows = match &self.view {
            View::All => self.manager.all(),
            View::DueOn(date) => self.manager.due_on(*date),
            View::Search(keyword) => self.manager.search(keyword),
        };
    }

    pub fn table_title(&self) -> String {
        let count = self.rows.len();
        match &self.view {
            View::All => format!("To-Do List ({count})"),
            View::DueOn(date) => format!("Due on {} ({count})", date.format("%Y-%m-%d")),
            View::Search(keyword) => format!("Search \"{keyword}\" ({count})"),
        }
    }

    pub fn execute<R: BufRead, W: Write>(
        &mut self,
        command: MenuCommand,
        prompter: &mut LinePrompter<R, W>,
    ) -> io::Result<Flow> {
        debug!(?command, "menu command");
        let status = match command {
            MenuCommand::List => {
                self.view = View::All;
                None
            }
            MenuCommand::Add => self.add_task(prompter)?,
            MenuCommand::Edit => self.edit_task(prompter)?,
            MenuCommand::Delete => self.delete_task(prompter)?,
            MenuCommand::Toggle => self.toggle_task(prompter)?,
            MenuCommand::FilterDue => self.filter_due(prompter)?,
            MenuCommand::Search => self.search_tasks(prompter)?,
            MenuCommand::Exit => return Ok(Flow::Exit),
        };
        self.status = status;
        self.refresh();
        Ok(Flow::Continue)
    }

    fn add_task<R: BufRead, W: Write>(
        &mut self,
        prompter: &mut LinePrompter<R, W>,
    ) -> io::Result<Option<Status>> {
        let Some(title) = prompter.ask("Title", None)? else {
            return Ok(Some(cancelled()));
        };
        let Some(description) = prompter.ask("Description", Some(""))? else {
            return Ok(Some(cancelled()));
        };
        let Some(due) = prompter.ask("Due date (YYYY-MM-DD, blank for none)", Some(""))? else {
            return Ok(Some(cancelled()));
        };

        Ok(Some(match self.manager.add(title, description, Some(&due)) {
            Ok(task) => Status::Info(format!("Added #{} {}", task.id, task.title)),
            Err(err) => store_error(err),
        }))
    }

    fn edit_task<R: BufRead, W: Write>(
        &mut self,
        prompter: &mut LinePrompter<R, W>,
    ) -> io::Result<Option<Status>> {
        let id = match ask_id(prompter, "ID to edit")? {
            Ok(id) => id,
            Err(status) => return Ok(Some(status)),
        };
        let Some(current) = self.manager.get(id).cloned() else {
            return Ok(Some(not_found(id)));
        };

        let Some(title) = prompter.ask("New title (Enter keeps)", Some(&current.title))? else {
            return Ok(Some(cancelled()));
        };
        let Some(description) =
            prompter.ask("New description (Enter keeps)", Some(&current.description))?
        else {
            return Ok(Some(cancelled()));
        };
        let Some(due) = prompter.ask(
            "New due date (YYYY-MM-DD, '-' clears, Enter keeps)",
            Some(current.due.as_deref().unwrap_or_default()),
        )?
        else {
            return Ok(Some(cancelled()));
        };
        let due = if due == "-" { String::new() } else { due };

        let patch = TaskPatch {
            title: Some(title),
            description: Some(description),
            due: Some(due),
        };
        Ok(Some(match self.manager.edit(id, patch) {
            Ok(Some(task)) => Status::Info(format!("Updated #{} {}", task.id, task.title)),
            Ok(None) => not_found(id),
            Err(err) => store_error(err),
        }))
    }

    fn delete_task<R: BufRead, W: Write>(
        &mut self,
        prompter: &mut LinePrompter<R, W>,
    ) -> io::Result<Option<Status>> {
        let id = match ask_id(prompter, "ID to delete")? {
            Ok(id) => id,
            Err(status) => return Ok(Some(status)),
        };
        let Some(title) = self.manager.get(id).map(|t| t.title.clone()) else {
            return Ok(Some(not_found(id)));
        };
        if !prompter.confirm(&format!("Really delete #{id} {title}?"))? {
            return Ok(Some(cancelled()));
        }

        Ok(Some(match self.manager.delete(id) {
            Ok(true) => Status::Info(format!("Deleted #{id}")),
            Ok(false) => Status::Error(format!("Failed to delete #{id}")),
            Err(err) => store_error(err),
        }))
    }

    fn toggle_task<R: BufRead, W: Write>(
        &mut self,
        prompter: &mut LinePrompter<R, W>,
    ) -> io::Result<Option<Status>> {
        let id = match ask_id(prompter, "ID to toggle")? {
            Ok(id) => id,
            Err(status) => return Ok(Some(status)),
        };

        Ok(Some(match self.manager.toggle(id) {
            Ok(Some(task)) => Status::Info(format!(
                "#{} -> {}",
                task.id,
                if task.done { "done" } else { "not done" }
            )),
            Ok(None) => not_found(id),
            Err(err) => store_error(err),
        }))
    }

    fn filter_due<R: BufRead, W: Write>(
        &mut self,
        prompter: &mut LinePrompter<R, W>,
    ) -> io::Result<Option<Status>> {
        let Some(text) = prompter.ask("Date to filter (YYYY-MM-DD)", None)? else {
            return Ok(Some(cancelled()));
        };
        let Some(date) = parse_due_date(&text) else {
            return Ok(Some(Status::Error(format!(
                "Invalid date {text:?}, expected YYYY-MM-DD"
            ))));
        };
        self.view = View::DueOn(date);
        Ok(None)
    }

    fn search_tasks<R: BufRead, W: Write>(
        &mut self,
        prompter: &mut LinePrompter<R, W>,
    ) -> io::Result<Option<Status>> {
        let Some(keyword) = prompter.ask("Keyword", None)? else {
            return Ok(Some(cancelled()));
        };
        self.view = View::Search(keyword);
        Ok(None)
    }
}

fn ask_id<R: BufRead, W: Write>(
    prompter: &mut LinePrompter<R, W>,
    message: &str,
) -> io::Result<Result<u32, Status>> {
    let Some(text) = prompter.ask(message, None)? else {
        return Ok(Err(cancelled()));
    };
    Ok(text
        .parse::<u32>()
        .map_err(|_| Status::Error(format!("{text:?} is not a valid task ID"))))
}

fn not_found(id: u32) -> Status {
    Status::Error(format!("No task with ID {id}"))
}

fn cancelled() -> Status {
    Status::Info("Cancelled".to_string())
}

fn store_error(err: StoreError) -> Status {
    Status::Error(err.to_string())
}

/// Only commands that ask questions need the terminal handed back to the shell.
fn needs_input(command: MenuCommand) -> bool {
    !matches!(command, MenuCommand::List | MenuCommand::Exit)
}

pub fn draw(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3)])
        .split(f.area());
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(40)])
        .split(rows[0]);

    let items: Vec<ListItem> = MenuCommand::ALL
        .iter()
        .map(|cmd| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", cmd.key()), Style::default().fg(Color::Cyan)),
                Span::raw(cmd.label()),
            ]))
        })
        .collect();
    let menu = List::new(items)
        .block(
            Block::default()
                .title("To-Do Manager")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));
    let mut menu_state = ListState::default().with_selected(Some(app.selected));
    f.render_stateful_widget(menu, columns[0], &mut menu_state);

    let header = Row::new(["ID", "Title", "Due (YYYY-MM-DD)", "Done", "Created At"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let body: Vec<Row> = app
        .rows
        .iter()
        .map(|t| {
            Row::new(vec![
                t.id.to_string(),
                t.title.clone(),
                t.due_label().to_string(),
                t.done_glyph().to_string(),
                t.created_at.clone(),
            ])
        })
        .collect();
    let table = Table::new(
        body,
        [
            Constraint::Length(5),
            Constraint::Min(12),
            Constraint::Length(16),
            Constraint::Length(4),
            Constraint::Length(19),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(app.table_title())
            .borders(Borders::ALL),
    );
    f.render_widget(table, columns[1]);

    let status = match &app.status {
        Some(Status::Info(text)) => Span::styled(text.as_str(), Style::default().fg(Color::Green)),
        Some(Status::Error(text)) => Span::styled(text.as_str(), Style::default().fg(Color::Red)),
        None => Span::raw(format!(
            "{} tasks in {}",
            app.manager.len(),
            app.manager.storage_path().display()
        )),
    };
    let footer = Paragraph::new(Line::from(status)).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, rows[1]);
}

pub fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        let Some(command) = app.handle_key(key) else {
            continue;
        };

        let flow = if needs_input(command) {
            suspend_terminal(terminal)?;
            let result = app.execute(command, &mut LinePrompter::stdio());
            resume_terminal(terminal)?;
            result?
        } else {
            app.execute(command, &mut LinePrompter::stdio())?
        };
        if flow == Flow::Exit {
            return Ok(());
        }
    }
}

fn suspend_terminal<B: Backend + Write>(terminal: &mut Terminal<B>) -> io::Result<()> {
    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    Ok(())
}

fn resume_terminal<B: Backend + Write>(terminal: &mut Terminal<B>) -> io::Result<()> {
    execute!(terminal.backend_mut(), EnterAlternateScreen)?;
    enable_raw_mode()?;
    terminal.clear()?;
    terminal.hide_cursor()?;
    Ok(())
}

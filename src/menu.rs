/// Every action the main menu offers, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    List,
    Add,
    Edit,
    Delete,
    Toggle,
    FilterDue,
    Search,
    Exit,
}

impl MenuCommand {
    pub const ALL: [MenuCommand; 8] = [
        MenuCommand::List,
        MenuCommand::Add,
        MenuCommand::Edit,
        MenuCommand::Delete,
        MenuCommand::Toggle,
        MenuCommand::FilterDue,
        MenuCommand::Search,
        MenuCommand::Exit,
    ];

    pub fn key(self) -> char {
        match self {
            MenuCommand::List => '1',
            MenuCommand::Add => '2',
            MenuCommand::Edit => '3',
            MenuCommand::Delete => '4',
            MenuCommand::Toggle => '5',
            MenuCommand::FilterDue => '6',
            MenuCommand::Search => '7',
            MenuCommand::Exit => '0',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MenuCommand::List => "List all",
            MenuCommand::Add => "Add",
            MenuCommand::Edit => "Edit",
            MenuCommand::Delete => "Delete",
            MenuCommand::Toggle => "Toggle done",
            MenuCommand::FilterDue => "Filter by due date",
            MenuCommand::Search => "Search",
            MenuCommand::Exit => "Exit",
        }
    }

    /// `q` is accepted as an alias for exit.
    pub fn from_key(key: char) -> Option<Self> {
        if key == 'q' {
            return Some(MenuCommand::Exit);
        }
        Self::ALL.into_iter().find(|cmd| cmd.key() == key)
    }
}

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use circle::repository::CountKind;
use circle::tracker::IssueSort;
use circle::types::Priority;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Compact,
}

#[derive(Parser)]
#[command(name = "circle")]
#[command(about = "A local-first issue tracker for teams", version)]
#[command(after_help = "EXAMPLES:
    circle db seed                     Load the demo workspace
    circle issues --status done        List finished issues
    circle issue create -t \"Title\"     Create a new issue
    circle issue move ENG-4 --top      Reorder inside a column
    circle board                       Show issues grouped by status")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json, compact)
    #[arg(long, short = 'o', global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Output as JSON (alias for --format json)
    #[arg(long, global = true, hide = true)]
    pub json: bool,

    /// Suppress success messages
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Show detailed error information
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Get the effective output format, considering --json flag
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage issues
    #[command(
        alias = "i",
        after_help = "EXAMPLES:
    circle issue list --team ENG
    circle issue show ENG-12
    circle issue create -t \"Bug fix\" -d \"Description\" --priority high
    circle issue update ENG-12 --status \"In Progress\"
    circle issue move ENG-12 --status done --after ENG-3"
    )]
    Issue {
        #[command(subcommand)]
        action: IssueCommands,
    },
    /// List issues (alias for 'issue list')
    #[command(
        alias = "is",
        after_help = "EXAMPLES:
    circle issues --assignee mira
    circle issues --team ENG --status \"In Progress\"
    circle issues --sort priority --limit 10"
    )]
    Issues(IssueListArgs),
    /// Show issues grouped by status, in board order
    #[command(
        alias = "b",
        after_help = "EXAMPLES:
    circle board
    circle board --team DES --format json"
    )]
    Board(BoardArgs),
    /// List teams
    #[command(
        alias = "t",
        after_help = "EXAMPLES:
    circle teams
    circle teams --format json"
    )]
    Teams,
    /// List projects
    #[command(
        alias = "p",
        after_help = "EXAMPLES:
    circle projects
    circle projects --team ENG"
    )]
    Projects {
        /// Filter by team key (e.g., ENG)
        #[arg(long)]
        team: Option<String>,
    },
    /// List labels
    #[command(alias = "l")]
    Labels,
    /// List users
    #[command(
        alias = "u",
        after_help = "EXAMPLES:
    circle users
    circle users --team DES"
    )]
    Users {
        /// Filter by team key (e.g., ENG)
        #[arg(long)]
        team: Option<String>,
    },
    /// List workflow statuses in board order
    Statuses,
    /// List priority levels in sort order
    Priorities,
    /// Count issues grouped by a field
    #[command(after_help = "EXAMPLES:
    circle counts status
    circle counts assignee --format json")]
    Counts {
        /// Field to group by
        #[arg(value_enum)]
        kind: CountKind,
    },
    /// Manage the local database
    #[command(after_help = "EXAMPLES:
    circle db status
    circle db migrate
    circle db seed")]
    Db {
        #[command(subcommand)]
        action: DbCommands,
    },
    /// Generate shell completions
    #[command(after_help = "EXAMPLES:
    circle completions bash > ~/.bash_completion.d/circle
    circle completions zsh > ~/.zfunc/_circle
    circle completions fish > ~/.config/fish/completions/circle.fish")]
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
    /// Initialize configuration file interactively
    #[command(after_help = "EXAMPLES:
    circle init")]
    Init,
}

#[derive(Subcommand)]
pub enum IssueCommands {
    /// List issues
    #[command(
        alias = "ls",
        after_help = "EXAMPLES:
    circle issue list --label bug
    circle issue list --team ENG --status \"In Progress\""
    )]
    List(IssueListArgs),
    /// Show issue details
    #[command(
        alias = "v",
        alias = "view",
        after_help = "EXAMPLES:
    circle issue show ENG-12"
    )]
    Show {
        /// Issue identifier (e.g., ENG-12) or id
        id: String,
    },
    /// Create a new issue
    #[command(
        alias = "c",
        after_help = "EXAMPLES:
    circle issue create -t \"Fix login bug\"
    circle issue create -t \"New feature\" --team DES --label design --priority urgent"
    )]
    Create(IssueCreateArgs),
    /// Update an existing issue
    #[command(
        alias = "u",
        after_help = "EXAMPLES:
    circle issue update ENG-12 --status done
    circle issue update ENG-12 --assignee none
    circle issue update ENG-12 --label bug --label ui"
    )]
    Update(IssueUpdateArgs),
    /// Move an issue within or across status columns
    #[command(
        alias = "mv",
        after_help = "EXAMPLES:
    circle issue move ENG-12 --top
    circle issue move ENG-12 --before ENG-4
    circle issue move ENG-12 --status done --bottom"
    )]
    Move(IssueMoveArgs),
    /// Delete an issue
    #[command(
        alias = "rm",
        after_help = "EXAMPLES:
    circle issue delete ENG-12"
    )]
    Delete {
        /// Issue identifier (e.g., ENG-12) or id
        id: String,
    },
    /// Set the parent of an issue (creates sub-issue)
    #[command(after_help = "EXAMPLES:
    circle issue parent ENG-12 ENG-10")]
    Parent {
        /// Issue to modify
        id: String,
        /// Parent issue identifier
        parent_id: String,
    },
    /// Remove the parent from an issue
    #[command(after_help = "EXAMPLES:
    circle issue unparent ENG-12")]
    Unparent {
        /// Issue identifier
        id: String,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// List applied and pending migrations
    Status,
    /// Insert default statuses, priorities and a demo workspace
    Seed,
}

#[derive(Args, Clone)]
pub struct IssueListArgs {
    /// Filter by team key (e.g., ENG)
    #[arg(long)]
    pub team: Option<String>,

    /// Filter by status id or name
    #[arg(long)]
    pub status: Option<String>,

    /// Filter by priority
    #[arg(long, value_enum)]
    pub priority: Option<Priority>,

    /// Filter by project id or name
    #[arg(long)]
    pub project: Option<String>,

    /// Filter by assignee id, name or email
    #[arg(long)]
    pub assignee: Option<String>,

    /// Filter by label id or name
    #[arg(long)]
    pub label: Option<String>,

    /// Match identifier, title or description
    #[arg(long, short)]
    pub search: Option<String>,

    /// Sort order
    #[arg(long, value_enum, default_value = "created")]
    pub sort: IssueSort,

    /// Maximum number of issues to show
    #[arg(long, short, default_value = "50")]
    pub limit: usize,

    /// Show every matching issue
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Clone)]
pub struct BoardArgs {
    /// Filter by team key (e.g., ENG)
    #[arg(long)]
    pub team: Option<String>,

    /// Filter by project id or name
    #[arg(long)]
    pub project: Option<String>,

    /// Filter by assignee id, name or email
    #[arg(long)]
    pub assignee: Option<String>,

    /// Filter by label id or name
    #[arg(long)]
    pub label: Option<String>,

    /// Match identifier, title or description
    #[arg(long, short)]
    pub search: Option<String>,
}

#[derive(Args)]
pub struct IssueCreateArgs {
    /// Issue title
    #[arg(long, short)]
    pub title: String,

    /// Issue description
    #[arg(long, short)]
    pub description: Option<String>,

    /// Team key (uses default if not specified)
    #[arg(long)]
    pub team: Option<String>,

    /// Initial status (defaults to the first column)
    #[arg(long)]
    pub status: Option<String>,

    /// Priority level
    #[arg(long, value_enum)]
    pub priority: Option<Priority>,

    /// Assignee id, name or email
    #[arg(long)]
    pub assignee: Option<String>,

    /// Project id or name
    #[arg(long)]
    pub project: Option<String>,

    /// Label id or name (repeatable)
    #[arg(long = "label")]
    pub labels: Vec<String>,

    /// Parent issue identifier
    #[arg(long)]
    pub parent: Option<String>,
}

#[derive(Args)]
pub struct IssueUpdateArgs {
    /// Issue identifier (e.g., ENG-12) or id
    pub id: String,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New description
    #[arg(long)]
    pub description: Option<String>,

    /// New status; the issue moves to the end of that column
    #[arg(long)]
    pub status: Option<String>,

    /// New priority level
    #[arg(long, value_enum)]
    pub priority: Option<Priority>,

    /// Assignee id, name or email ("none" to unassign)
    #[arg(long)]
    pub assignee: Option<String>,

    /// Project id or name ("none" to detach)
    #[arg(long)]
    pub project: Option<String>,

    /// Replace labels (repeatable)
    #[arg(long = "label", conflicts_with = "clear_labels")]
    pub labels: Vec<String>,

    /// Remove every label
    #[arg(long)]
    pub clear_labels: bool,
}

#[derive(Args)]
pub struct IssueMoveArgs {
    /// Issue identifier (e.g., ENG-12) or id
    pub id: String,

    /// Target status (defaults to the current one)
    #[arg(long)]
    pub status: Option<String>,

    /// Place directly before this issue
    #[arg(long, group = "position")]
    pub before: Option<String>,

    /// Place directly after this issue
    #[arg(long, group = "position")]
    pub after: Option<String>,

    /// Place at the top of the column
    #[arg(long, group = "position")]
    pub top: bool,

    /// Place at the bottom of the column (default)
    #[arg(long, group = "position")]
    pub bottom: bool,
}

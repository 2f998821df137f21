use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "stint")]
#[command(about = "Track a work timer against a timesheet backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a timer on a new timesheet record
    Start {
        /// What you are working on
        description: String,
        /// Project to book the time on
        #[arg(long)]
        project: i64,
        /// Optional task within the project
        #[arg(long)]
        task: Option<i64>,
    },
    /// Stop the running timer
    Stop,
    /// Show the current timer
    Status {
        /// Print the state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reconcile with the timer the backend reports as running
    Sync,
    /// Follow the running timer for a while
    Watch {
        /// How long to follow, in seconds
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
    /// Print config path and create default file if missing
    ConfigPath,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_with_task() {
        let cli = Cli::try_parse_from(["stint", "start", "Fix login", "--project", "5", "--task", "10"])
            .unwrap();
        match cli.command {
            Commands::Start {
                description,
                project,
                task,
            } => {
                assert_eq!(description, "Fix login");
                assert_eq!(project, 5);
                assert_eq!(task, Some(10));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn start_requires_a_project() {
        assert!(Cli::try_parse_from(["stint", "start", "No project"]).is_err());
    }
}

//! Task names and composite entry points.

use std::fmt;
use std::str::FromStr;

/// Every task the pipeline defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskId {
    Clean,
    FileInclude,
    HtmlHint,
    Sass,
    Minify,
    ImageMin,
    CopyFonts,
    Prettify,
    ConnectDev,
    ConnectProd,
    Stream,
}

impl TaskId {
    pub const ALL: [TaskId; 11] = [
        TaskId::Clean,
        TaskId::FileInclude,
        TaskId::HtmlHint,
        TaskId::Sass,
        TaskId::Minify,
        TaskId::ImageMin,
        TaskId::CopyFonts,
        TaskId::Prettify,
        TaskId::ConnectDev,
        TaskId::ConnectProd,
        TaskId::Stream,
    ];

    /// Canonical task name.
    pub fn name(self) -> &'static str {
        match self {
            TaskId::Clean => "clean",
            TaskId::FileInclude => "fileinclude",
            TaskId::HtmlHint => "htmlhint",
            TaskId::Sass => "sass",
            TaskId::Minify => "minify",
            TaskId::ImageMin => "imagemin",
            TaskId::CopyFonts => "copy:fonts",
            TaskId::Prettify => "prettify",
            TaskId::ConnectDev => "connect:dev",
            TaskId::ConnectProd => "connect:prod",
            TaskId::Stream => "stream",
        }
    }

    /// One-line summary for task listings.
    pub fn description(self) -> &'static str {
        match self {
            TaskId::Clean => "Remove the distribution and temporary roots",
            TaskId::FileInclude => "Assemble pages from includes",
            TaskId::HtmlHint => "Lint assembled pages",
            TaskId::Sass => "Compile stylesheets",
            TaskId::Minify => "Bundle and minify page scripts and styles",
            TaskId::ImageMin => "Optimize images",
            TaskId::CopyFonts => "Copy fonts",
            TaskId::Prettify => "Beautify built pages",
            TaskId::ConnectDev => "Start the development server",
            TaskId::ConnectProd => "Start the production server",
            TaskId::Stream => "Watch sources and re-run their tasks",
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task '{0}'")]
pub struct UnknownTask(pub String);

impl FromStr for TaskId {
    type Err = UnknownTask;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskId::ALL
            .into_iter()
            .find(|id| id.name() == s)
            .ok_or_else(|| UnknownTask(s.to_string()))
    }
}

/// Composite entry points, each a fixed sequence of tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Build,
    RunDev,
    RunProd,
}

const BUILD_STEPS: &[TaskId] = &[
    TaskId::Clean,
    TaskId::FileInclude,
    TaskId::HtmlHint,
    TaskId::Sass,
    TaskId::Minify,
    TaskId::ImageMin,
    TaskId::CopyFonts,
    TaskId::Prettify,
];

const DEV_STEPS: &[TaskId] = &[
    TaskId::Clean,
    TaskId::ConnectDev,
    TaskId::FileInclude,
    TaskId::Sass,
    TaskId::Stream,
];

impl Entry {
    pub fn name(self) -> &'static str {
        match self {
            Entry::Build => "build",
            Entry::RunDev => "run:dev",
            Entry::RunProd => "run:prod",
        }
    }

    /// Tasks in the order they run.
    pub fn steps(self) -> Vec<TaskId> {
        match self {
            Entry::Build => BUILD_STEPS.to_vec(),
            Entry::RunDev => DEV_STEPS.to_vec(),
            Entry::RunProd => BUILD_STEPS
                .iter()
                .copied()
                .chain([TaskId::ConnectProd])
                .collect(),
        }
    }

    /// Logged when every step succeeded.
    pub fn completion_message(self) -> &'static str {
        match self {
            Entry::Build => "Success!",
            Entry::RunDev => "Development version is running...",
            Entry::RunProd => "Production version is running...",
        }
    }

    /// Whether the entry leaves servers running after its steps finish.
    pub fn is_long_running(self) -> bool {
        !matches!(self, Entry::Build)
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for id in TaskId::ALL {
            assert_eq!(id.name().parse::<TaskId>(), Ok(id));
        }
    }

    #[test]
    fn rejects_unknown_names() {
        assert_eq!(
            "deploy".parse::<TaskId>(),
            Err(UnknownTask("deploy".to_string()))
        );
    }

    #[test]
    fn prod_runs_build_then_server() {
        let steps = Entry::RunProd.steps();

        assert_eq!(&steps[..steps.len() - 1], Entry::Build.steps().as_slice());
        assert_eq!(steps.last(), Some(&TaskId::ConnectProd));
    }

    #[test]
    fn dev_starts_server_before_assets() {
        assert_eq!(
            Entry::RunDev.steps(),
            vec![
                TaskId::Clean,
                TaskId::ConnectDev,
                TaskId::FileInclude,
                TaskId::Sass,
                TaskId::Stream
            ]
        );
    }
}

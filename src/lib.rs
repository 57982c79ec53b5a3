use clap::ValueEnum;

pub mod benches;
pub mod harness;
pub mod schema;
pub mod sources;

/// How the file-copy primitive is invoked.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum CopyMode {
    /// In-process `fs::copy`, one call per file.
    #[default]
    Local,
    /// One `sh -c "cp SRC DST"` interpreter process per file.
    Shell,
}

/// How the process-spawn primitive is invoked.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum SpawnMode {
    /// Launch the executable directly, once per operation.
    #[default]
    Direct,
    /// Launch the executable through `sh -c`.
    Shell,
    /// As `shell`, with stdout appended to a per-operation file.
    ShellRedirect,
}

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Extraction binaries the worker knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum ExtractorKind {
    /// Info-ZIP `unzip`, ZIP archives only
    #[serde(rename = "unzip")]
    #[value(name = "unzip")]
    Unzip,
    /// 7-Zip (`7zz`, `7z`), any format 7-Zip can read
    #[serde(rename = "7zip")]
    #[value(name = "7zip", alias = "7z")]
    SevenZip,
}

impl ExtractorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ExtractorKind::Unzip => "unzip",
            ExtractorKind::SevenZip => "7zip",
        }
    }

    /// Extension an input must carry, if the binary only understands one format.
    pub fn required_extension(&self) -> Option<&'static str> {
        match self {
            ExtractorKind::Unzip => Some("zip"),
            ExtractorKind::SevenZip => None,
        }
    }

    /// Non-zero exit codes that mean "finished with warnings". Info-ZIP
    /// returns 1 for an empty zipfile, 7-Zip returns 1 for skipped files.
    pub fn warning_exit_codes(&self) -> &'static [i32] {
        match self {
            ExtractorKind::Unzip => &[1],
            ExtractorKind::SevenZip => &[1],
        }
    }

    pub fn is_warning_exit(&self, code: Option<i32>) -> bool {
        code.map_or(false, |code| self.warning_exit_codes().contains(&code))
    }

    fn leading_args(&self, overwrite: bool) -> Vec<&'static str> {
        match self {
            ExtractorKind::Unzip if overwrite => vec!["-o"],
            ExtractorKind::Unzip => vec![],
            ExtractorKind::SevenZip => vec!["x"],
        }
    }

    fn trailing_args(&self, overwrite: bool) -> Vec<&'static str> {
        match self {
            ExtractorKind::SevenZip if overwrite => vec!["-y"],
            _ => vec![],
        }
    }
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the invoker waits for the extractor to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WaitMode {
    /// Send output to a log file; exit code is advisory
    Poll,
    /// Wait without a log, capturing stderr; a non-zero exit other than a
    /// warning code is fatal
    Block,
}

/// One extractor invocation: binary, archive and destination.
#[derive(Debug, Clone)]
pub struct ExtractionCommand {
    kind: ExtractorKind,
    program: PathBuf,
    archive: PathBuf,
    destination: PathBuf,
    overwrite: bool,
}

impl ExtractionCommand {
    pub fn new<P, A, D>(kind: ExtractorKind, program: P, archive: A, destination: D) -> Self
    where
        P: Into<PathBuf>,
        A: Into<PathBuf>,
        D: Into<PathBuf>,
    {
        Self {
            kind,
            program: program.into(),
            archive: archive.into(),
            destination: destination.into(),
            overwrite: true,
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn kind(&self) -> ExtractorKind {
        self.kind
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn archive(&self) -> &Path {
        &self.archive
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = self
            .kind
            .leading_args(self.overwrite)
            .into_iter()
            .map(OsString::from)
            .collect();

        args.push(self.archive.clone().into_os_string());

        match self.kind {
            ExtractorKind::Unzip => {
                args.push(OsString::from("-d"));
                args.push(self.destination.clone().into_os_string());
            }
            ExtractorKind::SevenZip => {
                let mut flag = OsString::from("-o");
                flag.push(self.destination.as_os_str());
                args.push(flag);
            }
        }

        args.extend(
            self.kind
                .trailing_args(self.overwrite)
                .into_iter()
                .map(OsString::from),
        );
        args
    }

    /// Binary plus its fixed flags, reported in the task result.
    pub fn base_command_string(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(
            self.kind
                .leading_args(self.overwrite)
                .into_iter()
                .chain(self.kind.trailing_args(self.overwrite))
                .map(str::to_string),
        );
        parts.join(" ")
    }

    /// The full command line, for logs.
    pub fn invocation_string(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args().iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(self.args());
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(command: &ExtractionCommand) -> Vec<String> {
        command
            .args()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_unzip_arguments() {
        let command = ExtractionCommand::new(
            ExtractorKind::Unzip,
            "unzip",
            "/tmp/sample.zip",
            "/out/extract_x",
        );
        assert_eq!(
            args_of(&command),
            vec!["-o", "/tmp/sample.zip", "-d", "/out/extract_x"]
        );
        assert_eq!(command.base_command_string(), "unzip -o");
        assert_eq!(
            command.invocation_string(),
            "unzip -o /tmp/sample.zip -d /out/extract_x"
        );
    }

    #[test]
    fn test_sevenzip_arguments() {
        let command = ExtractionCommand::new(
            ExtractorKind::SevenZip,
            "/usr/local/bin/7zz",
            "/tmp/bundle.7z",
            "/out/extract_y",
        );
        assert_eq!(
            args_of(&command),
            vec!["x", "/tmp/bundle.7z", "-o/out/extract_y", "-y"]
        );
        assert_eq!(command.base_command_string(), "/usr/local/bin/7zz x -y");
    }

    #[test]
    fn test_without_overwrite() {
        let command = ExtractionCommand::new(ExtractorKind::Unzip, "unzip", "a.zip", "out")
            .with_overwrite(false);
        assert_eq!(args_of(&command), vec!["a.zip", "-d", "out"]);
        assert_eq!(command.base_command_string(), "unzip");

        let command = ExtractionCommand::new(ExtractorKind::SevenZip, "7zz", "a.rar", "out")
            .with_overwrite(false);
        assert_eq!(args_of(&command), vec!["x", "a.rar", "-oout"]);
    }

    #[test]
    fn test_required_extension() {
        assert_eq!(ExtractorKind::Unzip.required_extension(), Some("zip"));
        assert_eq!(ExtractorKind::SevenZip.required_extension(), None);
        assert_eq!(ExtractorKind::SevenZip.to_string(), "7zip");
    }

    #[test]
    fn test_warning_exit_codes() {
        assert!(ExtractorKind::Unzip.is_warning_exit(Some(1)));
        assert!(ExtractorKind::SevenZip.is_warning_exit(Some(1)));
        assert!(!ExtractorKind::Unzip.is_warning_exit(Some(9)));
        assert!(!ExtractorKind::SevenZip.is_warning_exit(Some(2)));
        assert!(!ExtractorKind::Unzip.is_warning_exit(None));
    }
}

use clap::Parser;
use log::{error, info, warn};
use std::error;
use std::error::Error;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use jp2::check_jp2;

mod report;

use report::{write_error, write_result, OutputFormat};

#[derive(Debug)]
enum CheckError {
    FileNotFound { path: String },
    FilesFailed { failed: usize, total: usize },
}

impl error::Error for CheckError {}
impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::FileNotFound { path } => {
                write!(f, "{} does not exist!", path)
            }
            Self::FilesFailed { failed, total } => {
                write!(f, "{} of {} files could not be checked", failed, total)
            }
        }
    }
}

/// Verify the top-level box structure of JP2 images.
///
/// Reports whether all required boxes are present and whether the codestream
/// ends with an end of codestream marker.
#[derive(Parser)]
#[clap(version)]
struct Opts {
    /// Paths to .jp2 files, wildcards are expanded (quote them to bypass the
    /// shell)
    #[clap(required = true)]
    patterns: Vec<String>,

    /// Report output in terse format
    #[clap(short, long)]
    terse: bool,
}

/// Expand a command line argument into the files it names.
///
/// Arguments without wildcards are taken literally so that a missing file is
/// reported as missing rather than as an empty match.
fn expand_pattern(pattern: &str) -> Vec<PathBuf> {
    if !pattern.contains(|c: char| c == '*' || c == '?' || c == '[') {
        return vec![PathBuf::from(pattern)];
    }

    match glob::glob(pattern) {
        Ok(entries) => entries
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("{}", e);
                    None
                }
            })
            .collect(),
        Err(e) => {
            warn!("invalid pattern {:?}: {}", pattern, e);
            vec![PathBuf::from(pattern)]
        }
    }
}

/// Check one file and write its report.
///
/// Returns false when the file was read but its box structure is malformed.
fn check_file<W: Write>(
    writer: &mut W,
    path: &Path,
    format: OutputFormat,
) -> Result<bool, Box<dyn Error>> {
    let filename = path.display().to_string();

    if !path.is_file() {
        return Err(CheckError::FileNotFound { path: filename }.into());
    }

    let data = fs::read(path)?;
    info!("checking {} ({} bytes)", filename, data.len());

    match check_jp2(&data) {
        Ok(result) => {
            write_result(writer, &filename, &result, format)?;
            Ok(true)
        }
        Err(jp2_error) => {
            write_error(writer, &filename, &jp2_error, format)?;
            Ok(false)
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let opts: Opts = Opts::parse();

    let format = if opts.terse {
        OutputFormat::Terse
    } else {
        OutputFormat::Verbose
    };

    let mut paths: Vec<PathBuf> = vec![];
    for pattern in &opts.patterns {
        let expanded = expand_pattern(pattern);
        if expanded.is_empty() {
            warn!("no images to check! {:?} matched no files", pattern);
        }
        paths.extend(expanded);
    }

    let stdout = io::stdout();
    let mut writer = stdout.lock();

    let mut failed = 0;
    for path in &paths {
        match check_file(&mut writer, path, format) {
            Ok(true) => {}
            Ok(false) => failed += 1,
            Err(e) => {
                error!("{}", e);
                failed += 1;
            }
        }
    }
    writer.flush()?;

    if failed > 0 {
        return Err(CheckError::FilesFailed {
            failed,
            total: paths.len(),
        }
        .into());
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    match run() {
        Err(e) => {
            return Err(e.to_string().into());
        }
        Ok(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_file_missing() {
        let mut output = Vec::new();
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("does-not-exist.jp2");
        let result = check_file(&mut output, &path, OutputFormat::Terse);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().ends_with("does not exist!"));
        assert!(output.is_empty());
    }

    #[test]
    fn test_check_file_fixtures() {
        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("jp2")
            .join("tests");

        let mut output = Vec::new();
        let ok = check_file(&mut output, &fixtures.join("minimal.jp2"), OutputFormat::Terse);
        assert_eq!(ok.unwrap(), true);
        assert!(String::from_utf8(output).unwrap().ends_with("minimal.jp2\",true,true\n"));

        let mut output = Vec::new();
        let ok = check_file(&mut output, &fixtures.join("truncated.jp2"), OutputFormat::Terse);
        assert_eq!(ok.unwrap(), false);
        assert!(String::from_utf8(output).unwrap().contains("truncated.jp2\",error,"));
    }

    #[test]
    fn test_opts() {
        let opts = Opts::try_parse_from(["jp2structcheck", "-t", "a.jp2", "b.jp2"]).unwrap();
        assert!(opts.terse);
        assert_eq!(opts.patterns, vec!["a.jp2", "b.jp2"]);

        let opts = Opts::try_parse_from(["jp2structcheck", "a.jp2"]).unwrap();
        assert!(!opts.terse);

        assert!(Opts::try_parse_from(["jp2structcheck"]).is_err());
    }

    fn fixtures_pattern(file_pattern: &str) -> String {
        let root = Path::new(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .expect("crate should be inside the workspace");
        format!(
            "{}/jp2/tests/{}",
            glob::Pattern::escape(&root.display().to_string()),
            file_pattern
        )
    }

    #[test]
    fn test_expand_pattern() {
        let paths = expand_pattern(&fixtures_pattern("*.jp2"));
        let names: Vec<String> = paths
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["incomplete.jp2", "minimal.jp2", "truncated.jp2"]);

        let paths = expand_pattern(&fixtures_pattern("m?nimal.jp2"));
        assert_eq!(paths.len(), 1);
        assert!(paths[0].is_file());
    }

    #[test]
    fn test_expand_pattern_no_matches() {
        assert!(expand_pattern(&fixtures_pattern("*.does-not-exist")).is_empty());
    }

    #[test]
    fn test_expand_pattern_literal() {
        assert_eq!(
            expand_pattern("does-not-exist.jp2"),
            vec![PathBuf::from("does-not-exist.jp2")]
        );
    }
}

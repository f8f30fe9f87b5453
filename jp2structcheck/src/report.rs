use std::io;

use jp2::{box_type_name, JP2Error, ValidationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One comma separated line per file.
    Terse,

    /// One block per file, listing missing boxes.
    Verbose,
}

pub fn write_result<W: io::Write>(
    writer: &mut W,
    filename: &str,
    result: &ValidationResult,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Terse => writeln!(
            writer,
            "\"{}\",{},{}",
            filename,
            result.all_required_boxes_found(),
            result.codestream_complete()
        ),
        OutputFormat::Verbose => {
            writeln!(writer, "File name: \"{}\"", filename)?;
            writeln!(
                writer,
                "Found all required boxes: {}",
                result.all_required_boxes_found()
            )?;
            writeln!(
                writer,
                "Found end of codestream marker: {}",
                result.codestream_complete()
            )?;
            for box_type in result.missing_boxes() {
                writeln!(writer, "Did not find {} box", box_type_name(*box_type))?;
            }
            Ok(())
        }
    }
}

pub fn write_error<W: io::Write>(
    writer: &mut W,
    filename: &str,
    error: &JP2Error,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Terse => writeln!(writer, "\"{}\",error,{}", filename, error),
        OutputFormat::Verbose => {
            writeln!(writer, "File name: \"{}\"", filename)?;
            writeln!(writer, "Structural error: {}", error)
        }
    }
}
